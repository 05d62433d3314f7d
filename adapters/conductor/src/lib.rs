#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick-loop driver that a host game embeds to run rhythm combat encounters.
//!
//! The conductor owns the world and every system. Each host interaction is
//! turned into commands that are applied to the world, and the resulting
//! events are broadcast to the systems until no system has anything left to
//! say. Hosts observe the encounter through [`rhythm_combat_world::query`],
//! transient feedback through [`Conductor::drain_feedback`] and the final
//! result through a completion callback that fires exactly once per
//! encounter.

mod config;

use std::{collections::VecDeque, fmt, time::Duration};

use log::{debug, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rhythm_combat_core::{
    Combatant, Command, ContentError, DifficultyProfile, EncounterError, EncounterKind,
    EncounterReport, Event, JudgmentConfig, LaneIndex, SessionId, Track,
};
use rhythm_combat_system_chart_generation::{ChartGeneration, TrackCatalog};
use rhythm_combat_system_judgment::InputJudgment;
use rhythm_combat_system_outcome::OutcomeResolution;
use rhythm_combat_system_spawning::Spawning;
use rhythm_combat_world::{self as world, query, World};
use thiserror::Error;

pub use config::ConductorConfig;

/// Stream selector separating outcome rolls from chart seeds.
const OUTCOME_STREAM: u64 = 0x6f75_7463_6f6d_6573;
/// Stream selector separating track selection from chart seeds.
const CATALOG_STREAM: u64 = 0x6361_7461_6c6f_6773;

type CompletionCallback = Box<dyn FnMut(&EncounterReport)>;

/// Reasons the conductor cannot start an encounter.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConductorError {
    /// The arbiter refused the encounter.
    #[error(transparent)]
    Rejected(#[from] EncounterError),
    /// No track could be selected.
    #[error(transparent)]
    NoContent(#[from] ContentError),
    /// The world accepted the command without opening a session.
    #[error("the world did not open a session")]
    NotStarted,
}

/// Owns a world plus its systems and pumps them to quiescence.
pub struct Conductor {
    world: World,
    charts: ChartGeneration,
    spawning: Spawning,
    judgment: InputJudgment,
    outcome: OutcomeResolution,
    catalog: TrackCatalog,
    catalog_rng: ChaCha8Rng,
    feedback: VecDeque<Event>,
    last_report: Option<EncounterReport>,
    on_complete: Option<CompletionCallback>,
}

impl Conductor {
    /// Most feedback events kept between two [`Conductor::drain_feedback`] calls.
    pub const FEEDBACK_CAPACITY: usize = 4096;

    /// Creates a conductor from a configuration.
    #[must_use]
    pub fn new(config: ConductorConfig) -> Self {
        let ConductorConfig {
            seed,
            world,
            catalog,
        } = config;
        Self {
            world: World::with_config(world),
            charts: ChartGeneration::new(seed),
            spawning: Spawning::new(),
            judgment: InputJudgment::new(),
            outcome: OutcomeResolution::new(seed ^ OUTCOME_STREAM),
            catalog,
            catalog_rng: ChaCha8Rng::seed_from_u64(seed ^ CATALOG_STREAM),
            feedback: VecDeque::new(),
            last_report: None,
            on_complete: None,
        }
    }

    /// Registers the callback that receives each encounter's final report.
    #[must_use]
    pub fn with_completion(mut self, callback: impl FnMut(&EncounterReport) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Read-only access to the world for [`rhythm_combat_world::query`].
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Report of the most recently resolved encounter.
    #[must_use]
    pub fn last_report(&self) -> Option<&EncounterReport> {
        self.last_report.as_ref()
    }

    /// Session currently holding the arbiter, if any.
    #[must_use]
    pub fn active_session(&self) -> Option<SessionId> {
        query::arbiter(&self.world).active_session()
    }

    /// Notes of `session` still waiting for their spawn deadline.
    #[must_use]
    pub fn pending_spawns(&self, session: SessionId) -> usize {
        self.spawning.pending(session)
    }

    /// Starts an encounter on an explicit track.
    pub fn begin_encounter(
        &mut self,
        track: Track,
        profile: DifficultyProfile,
        kind: EncounterKind,
        attacker: Combatant,
        defender: Combatant,
    ) -> Result<SessionId, ConductorError> {
        let events = self.pump(vec![Command::BeginEncounter {
            track,
            profile,
            kind,
            attacker,
            defender,
        }]);
        for event in &events {
            match event {
                Event::EncounterRejected { reason, .. } => return Err((*reason).into()),
                Event::ChartRequested { session, .. } => return Ok(*session),
                _ => {}
            }
        }
        Err(ConductorError::NotStarted)
    }

    /// Starts an encounter on a track picked from the catalog for `defender`.
    pub fn begin_from_catalog(
        &mut self,
        profile: DifficultyProfile,
        kind: EncounterKind,
        attacker: Combatant,
        defender: Combatant,
    ) -> Result<SessionId, ConductorError> {
        let track = self
            .catalog
            .select(defender.id(), &mut self.catalog_rng)?
            .clone();
        self.begin_encounter(track, profile, kind, attacker, defender)
    }

    /// Advances every clock by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        let _ = self.pump(vec![Command::Tick { dt }]);
    }

    /// Presses a lane at the current session time.
    pub fn press_lane(&mut self, lane: LaneIndex) {
        let _ = self.pump(vec![Command::PressLane { lane }]);
    }

    /// Tears down the running encounter without combat consequences.
    ///
    /// Returns `false` when no encounter was running.
    pub fn abort(&mut self) -> bool {
        let Some(session) = self.active_session() else {
            return false;
        };
        let _ = self.pump(vec![Command::AbortEncounter { session }]);
        true
    }

    /// Takes every event broadcast since the previous call.
    ///
    /// At most [`Conductor::FEEDBACK_CAPACITY`] events are buffered. Hosts
    /// that drain less often than that lose the oldest ones.
    pub fn drain_feedback(&mut self) -> Vec<Event> {
        self.feedback.drain(..).collect()
    }

    fn pump(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut broadcast = Vec::new();
        let mut pending = commands;
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }

            let lane_count = query::lane_layout(&self.world).lane_count();
            self.charts.handle(&events, lane_count, &mut pending);
            self.spawning.handle(&events, &mut pending);
            let judgment = query::judgment_config(&self.world);
            self.judgment.handle(
                &events,
                &query::active_notes(&self.world),
                judgment.as_ref().map(JudgmentConfig::windows),
                &mut pending,
            );
            self.outcome.handle(&events, &mut pending);

            for event in &events {
                if let Event::EncounterResolved { report } = event {
                    self.complete(report);
                }
            }
            broadcast.extend(events);
        }
        let buffered = self.feedback.len();
        self.feedback.extend(broadcast.iter().cloned());
        let overflow = self.feedback.len().saturating_sub(Self::FEEDBACK_CAPACITY);
        if overflow > 0 {
            if buffered < Self::FEEDBACK_CAPACITY {
                warn!("feedback is not being drained, dropping the oldest events");
            }
            drop(self.feedback.drain(..overflow));
        }
        broadcast
    }

    fn complete(&mut self, report: &EncounterReport) {
        debug!("session {} delivered to host", report.session);
        if let Some(callback) = self.on_complete.as_mut() {
            callback(report);
        }
        self.last_report = Some(report.clone());
    }
}

impl Default for Conductor {
    fn default() -> Self {
        Self::new(ConductorConfig::default())
    }
}

impl fmt::Debug for Conductor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conductor")
            .field("world", &self.world)
            .field("catalog", &self.catalog)
            .field("feedback", &self.feedback.len())
            .field("last_report", &self.last_report)
            .finish_non_exhaustive()
    }
}
