#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for rhythm combat encounters.
//!
//! The world owns the session arbiter, the single encounter it may host,
//! the notes travelling toward the hit line and the judgment tally. It is
//! mutated exclusively through [`apply`] and observed through [`query`].

mod arbiter;
mod encounter;
mod motion;

use std::{collections::BTreeMap, time::Duration};

use log::{debug, info, warn};
use rhythm_combat_core::{
    Chart, CombatOutcome, Combatant, Command, DifficultyProfile, EncounterKind, EncounterReport,
    EndReason, Event, Judgment, JudgmentSettings, LaneIndex, LaneLayout, LaneRejection, NoteId,
    PerformanceState, SessionId, Track, TuningTable,
};
use serde::{Deserialize, Serialize};

pub use arbiter::SessionArbiter;
pub use encounter::EncounterPhase;

use encounter::Encounter;
use motion::ActiveNote;

/// Static configuration of the arena the world simulates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Lane geometry shared by every encounter.
    #[serde(default)]
    pub lanes: LaneLayout,
    /// Base timing windows and note speed before density scaling.
    #[serde(default)]
    pub judgment: JudgmentSettings,
    /// Balance values per encounter kind.
    #[serde(default)]
    pub tuning: TuningTable,
}

/// Represents the authoritative rhythm combat world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    arbiter: SessionArbiter,
    uptime_secs: f64,
    encounter: Option<Encounter>,
}

impl World {
    /// Creates a world using the default arena configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates a world using the provided arena configuration.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            arbiter: SessionArbiter::default(),
            uptime_secs: 0.0,
            encounter: None,
        }
    }

    fn begin_encounter(
        &mut self,
        track: Track,
        profile: DifficultyProfile,
        kind: EncounterKind,
        attacker: Combatant,
        defender: Combatant,
        out_events: &mut Vec<Event>,
    ) {
        let session = match self.arbiter.try_acquire(defender.id(), self.uptime_secs) {
            Ok(session) => session,
            Err(reason) => {
                info!("encounter with {} rejected: {reason}", defender.name());
                out_events.push(Event::EncounterRejected {
                    defender: defender.id(),
                    reason,
                });
                return;
            }
        };

        let tuning = *self.config.tuning.for_kind(kind);
        let judgment = self
            .config
            .judgment
            .for_density(profile.density())
            .with_bad_margin(tuning.bad_margin_ms);
        info!(
            "session {session}: {} engages {} ({kind:?}) on track {} at density {}",
            attacker.name(),
            defender.name(),
            track.id(),
            profile.density().get()
        );

        out_events.push(Event::ChartRequested {
            session,
            track: track.clone(),
            profile,
        });
        self.encounter = Some(Encounter {
            session,
            kind,
            tuning,
            track,
            profile,
            judgment,
            attacker,
            defender,
            phase: EncounterPhase::AwaitingChart,
            clock_secs: 0.0,
            length_secs: 0.0,
            note_count: 0,
            pending: BTreeMap::new(),
            active: BTreeMap::new(),
            performance: PerformanceState::default(),
            chip_damage: 0,
        });
    }

    fn load_chart(&mut self, session: SessionId, chart: Chart, out_events: &mut Vec<Event>) {
        let lanes = &self.config.lanes;
        let Some(encounter) = self
            .encounter
            .as_mut()
            .filter(|encounter| {
                encounter.session == session && encounter.phase == EncounterPhase::AwaitingChart
            })
        else {
            debug!("ignoring chart for session {session} that is not awaiting one");
            return;
        };

        let mut accepted = Vec::with_capacity(chart.len());
        for entry in chart.entries() {
            if lanes.lane(entry.note.lane()).is_none() {
                warn!(
                    "session {session}: note {} targets lane {} outside the {}-lane layout, dropped",
                    entry.id.get(),
                    entry.note.lane().get(),
                    lanes.lane_count()
                );
                continue;
            }
            accepted.push(entry);
        }

        encounter.pending = accepted.iter().map(|entry| (entry.id, entry.note)).collect();
        encounter.note_count = u32::try_from(accepted.len()).unwrap_or(u32::MAX);
        encounter.length_secs = chart.end_secs() + encounter.judgment.windows().expiry_secs();
        let travel_secs = lanes
            .iter()
            .map(|geometry| encounter.judgment.travel_secs(geometry.travel_distance()))
            .collect();
        info!(
            "session {session}: loaded {} notes ({:?}), session length {:.2}s",
            encounter.note_count,
            chart.origin(),
            encounter.length_secs
        );
        out_events.push(Event::ChartLoaded {
            session,
            notes: accepted,
            travel_secs,
            origin: chart.origin(),
        });

        let intro_secs = encounter.tuning.intro_secs.max(0.0);
        if intro_secs > 0.0 {
            encounter.phase = EncounterPhase::Intro {
                remaining_secs: intro_secs,
            };
            out_events.push(Event::IntroStarted {
                session,
                intro_secs,
            });
        } else {
            start_playing(encounter, 0.0, out_events);
        }
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let dt_secs = dt.as_secs_f64();
        self.uptime_secs += dt_secs;

        let Some(encounter) = self.encounter.as_mut() else {
            return;
        };

        match encounter.phase {
            EncounterPhase::Intro { remaining_secs } => {
                let remaining_secs = remaining_secs - dt_secs;
                if remaining_secs > 0.0 {
                    encounter.phase = EncounterPhase::Intro { remaining_secs };
                    return;
                }
                start_playing(encounter, -remaining_secs, out_events);
            }
            EncounterPhase::Playing => encounter.clock_secs += dt_secs,
            EncounterPhase::AwaitingChart | EncounterPhase::Resolving { .. } => return,
        }

        encounter.advance_notes(&self.config.lanes);
        out_events.push(Event::ClockAdvanced {
            session: encounter.session,
            now_secs: encounter.clock_secs,
        });

        if encounter.clock_secs >= encounter.length_secs {
            encounter.end(EndReason::Completed, out_events);
        }
    }

    fn press_lane(&mut self, lane: LaneIndex, out_events: &mut Vec<Event>) {
        let Some(encounter) = self
            .encounter
            .as_ref()
            .filter(|encounter| encounter.phase == EncounterPhase::Playing)
        else {
            out_events.push(Event::LaneRejected {
                lane,
                reason: LaneRejection::NoActiveSession,
            });
            return;
        };

        if self.config.lanes.lane(lane).is_none() {
            warn!(
                "press on lane {} ignored, layout has {} lanes",
                lane.get(),
                self.config.lanes.lane_count()
            );
            out_events.push(Event::LaneRejected {
                lane,
                reason: LaneRejection::OutOfRange,
            });
            return;
        }

        out_events.push(Event::LanePressed {
            session: encounter.session,
            lane,
            at_secs: encounter.clock_secs,
        });
    }

    fn spawn_note(&mut self, session: SessionId, note: NoteId, out_events: &mut Vec<Event>) {
        let lanes = &self.config.lanes;
        let Some(encounter) = self
            .encounter
            .as_mut()
            .filter(|encounter| encounter.is_live(session))
        else {
            debug!("spawn of note {} skipped, session {session} is not live", note.get());
            return;
        };

        let Some(scheduled) = encounter.pending.get(&note).copied() else {
            debug!("note {} of session {session} is not awaiting spawn", note.get());
            return;
        };
        let Some(geometry) = lanes.lane(scheduled.lane()) else {
            warn!("note {} has no lane geometry", note.get());
            return;
        };

        let _ = encounter.pending.remove(&note);
        let travel_secs = encounter.judgment.travel_secs(geometry.travel_distance());
        let active = ActiveNote::launch(scheduled, travel_secs, geometry, encounter.clock_secs);
        let _ = encounter.active.insert(note, active);
        out_events.push(Event::NoteSpawned {
            session,
            note,
            lane: scheduled.lane(),
            target_time_secs: scheduled.target_time_secs(),
        });
    }

    fn resolve_note(
        &mut self,
        session: SessionId,
        note: NoteId,
        judgment: Judgment,
        delta_ms: f64,
        out_events: &mut Vec<Event>,
    ) {
        let Some(encounter) = self
            .encounter
            .as_mut()
            .filter(|encounter| encounter.is_live(session))
        else {
            debug!("resolution of note {} skipped, session {session} is not live", note.get());
            return;
        };

        let Some(chip) = encounter.judge(note, judgment, delta_ms, out_events) else {
            debug!("note {} of session {session} was already resolved", note.get());
            return;
        };

        if chip > 0 && encounter.chip_damage >= encounter.attacker.health() {
            warn!(
                "session {session}: {} knocked out by chip damage",
                encounter.attacker.name()
            );
            encounter.end(EndReason::Knockout, out_events);
        }
    }

    fn abort_encounter(&mut self, session: SessionId, out_events: &mut Vec<Event>) {
        let Some(encounter) = self
            .encounter
            .as_mut()
            .filter(|encounter| encounter.session == session)
        else {
            debug!("abort of unknown session {session} ignored");
            return;
        };

        encounter.end(EndReason::Aborted, out_events);
        self.finalize_encounter(session, None, out_events);
    }

    fn finalize_encounter(
        &mut self,
        session: SessionId,
        outcome: Option<CombatOutcome>,
        out_events: &mut Vec<Event>,
    ) {
        let ready = self
            .encounter
            .as_ref()
            .is_some_and(|encounter| encounter.session == session && encounter.is_resolving());
        if !ready {
            debug!("finalization of session {session} ignored, it is not awaiting an outcome");
            return;
        }
        let Some(mut encounter) = self.encounter.take() else {
            return;
        };
        let EncounterPhase::Resolving { reason, result } = encounter.phase else {
            return;
        };

        if let Some(outcome) = &outcome {
            let _ = encounter.defender.take_damage(outcome.damage_to_defender);
            let _ = encounter
                .attacker
                .take_damage(outcome.damage_to_attacker.saturating_add(outcome.chip_damage));
            encounter.attacker.add_gold(outcome.gold_awarded);
        }

        self.arbiter.release(
            session,
            encounter.defender.id(),
            self.uptime_secs,
            encounter.tuning.cooldown_secs,
        );
        info!(
            "session {session} resolved: {} at {} hp, {} at {} hp",
            encounter.attacker.name(),
            encounter.attacker.health(),
            encounter.defender.name(),
            encounter.defender.health()
        );

        out_events.push(Event::EncounterResolved {
            report: Box::new(EncounterReport {
                session,
                track: encounter.track.id().clone(),
                kind: encounter.kind,
                reason,
                note_count: encounter.note_count,
                performance: encounter.performance,
                result,
                outcome,
                attacker: encounter.attacker,
                defender: encounter.defender,
            }),
        });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn start_playing(encounter: &mut Encounter, clock_secs: f64, out_events: &mut Vec<Event>) {
    encounter.phase = EncounterPhase::Playing;
    encounter.clock_secs = clock_secs;
    out_events.push(Event::SessionStarted {
        session: encounter.session,
        note_count: encounter.note_count,
        length_secs: encounter.length_secs,
    });
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::BeginEncounter {
            track,
            profile,
            kind,
            attacker,
            defender,
        } => world.begin_encounter(track, profile, kind, attacker, defender, out_events),
        Command::LoadChart { session, chart } => world.load_chart(session, chart, out_events),
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::PressLane { lane } => world.press_lane(lane, out_events),
        Command::SpawnNote { session, note } => world.spawn_note(session, note, out_events),
        Command::ResolveNote {
            session,
            note,
            judgment,
            delta_ms,
        } => world.resolve_note(session, note, judgment, delta_ms, out_events),
        Command::AbortEncounter { session } => world.abort_encounter(session, out_events),
        Command::FinalizeEncounter { session, outcome } => {
            world.finalize_encounter(session, Some(outcome), out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{EncounterPhase, SessionArbiter, World, WorldConfig};
    use rhythm_combat_core::{
        ActiveNoteSnapshot, ActiveNoteView, DifficultyProfile, EncounterKind, JudgmentConfig,
        LaneLayout, PerformanceState, SessionId, TrackId,
    };

    /// Provides read-only access to the arena configuration.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Provides read-only access to the lane geometry.
    #[must_use]
    pub fn lane_layout(world: &World) -> &LaneLayout {
        &world.config.lanes
    }

    /// Exposes the shared session arbiter so callers can check availability.
    #[must_use]
    pub fn arbiter(world: &World) -> &SessionArbiter {
        &world.arbiter
    }

    /// Total simulated time since the world was created.
    #[must_use]
    pub fn uptime_secs(world: &World) -> f64 {
        world.uptime_secs
    }

    /// Captures the state of the hosted encounter, if any.
    #[must_use]
    pub fn encounter(world: &World) -> Option<EncounterStatus> {
        world.encounter.as_ref().map(|encounter| EncounterStatus {
            session: encounter.session,
            kind: encounter.kind,
            track: encounter.track.id().clone(),
            profile: encounter.profile,
            phase: encounter.phase,
            judgment: encounter.judgment,
            clock_secs: encounter.clock_secs,
            length_secs: encounter.length_secs,
            note_count: encounter.note_count,
            pending_notes: encounter.pending.len(),
            active_notes: encounter.active.len(),
            performance: encounter.performance,
            chip_damage: encounter.chip_damage,
        })
    }

    /// Timing windows and note speed of the hosted encounter.
    #[must_use]
    pub fn judgment_config(world: &World) -> Option<JudgmentConfig> {
        world.encounter.as_ref().map(|encounter| encounter.judgment)
    }

    /// Captures a read-only view of the notes travelling toward the hit line.
    #[must_use]
    pub fn active_notes(world: &World) -> ActiveNoteView {
        let Some(encounter) = world.encounter.as_ref() else {
            return ActiveNoteView::default();
        };
        let snapshots = encounter
            .active
            .iter()
            .map(|(id, active)| ActiveNoteSnapshot {
                session: encounter.session,
                id: *id,
                lane: active.note.lane(),
                target_time_secs: active.note.target_time_secs(),
                hold_secs: active.note.hold_secs(),
                progress: active.progress,
                position: active.position,
            })
            .collect();
        ActiveNoteView::from_snapshots(snapshots)
    }

    /// Immutable summary of the hosted encounter.
    #[derive(Clone, Debug, PartialEq)]
    pub struct EncounterStatus {
        /// Session identifier.
        pub session: SessionId,
        /// Kind of encounter.
        pub kind: EncounterKind,
        /// Track being played.
        pub track: TrackId,
        /// Difficulty parameters of the encounter.
        pub profile: DifficultyProfile,
        /// Lifecycle stage.
        pub phase: EncounterPhase,
        /// Timing windows and note speed in force.
        pub judgment: JudgmentConfig,
        /// Session clock.
        pub clock_secs: f64,
        /// Clock time at which the session ends.
        pub length_secs: f64,
        /// Notes in the loaded chart.
        pub note_count: u32,
        /// Notes not yet spawned.
        pub pending_notes: usize,
        /// Notes travelling toward the hit line.
        pub active_notes: usize,
        /// Judgment tally so far.
        pub performance: PerformanceState,
        /// Chip damage accumulated so far.
        pub chip_damage: u32,
    }
}
