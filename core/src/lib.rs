#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the rhythm combat engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! An encounter pits an attacker against a defender. The attacker plays a
//! chart of notes generated from a [`Track`] and a [`DifficultyProfile`];
//! every note is judged exactly once and the resulting [`PerformanceState`]
//! decides the [`CombatOutcome`].

mod chart;
mod combat;
mod judgment;
mod lanes;
mod performance;
mod profile;
mod track;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use chart::{Chart, ChartEntry, ChartOrigin, ChartStats, Note};
pub use combat::{
    CombatOutcome, CombatStats, Combatant, ContentError, EncounterError, EncounterKind,
    EncounterReport, EncounterTuning, EndReason, TuningTable, Verdict,
};
pub use judgment::{Judgment, JudgmentConfig, JudgmentSettings, JudgmentWindows, WindowError};
pub use lanes::{LaneGeometry, LaneLayout, Point2};
pub use performance::{Grade, PerformanceState, SessionResult};
pub use profile::{Density, DifficultyProfile, HoldNotes, PatternChances, Subdivisions};
pub use track::{Track, TrackError};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests a new encounter between an attacker and a defender.
    BeginEncounter {
        /// Track the chart should be generated from.
        track: Track,
        /// Difficulty parameters for chart generation and judgment.
        profile: DifficultyProfile,
        /// Kind of encounter, selecting its tuning.
        kind: EncounterKind,
        /// Side that plays the chart.
        attacker: Combatant,
        /// Side that is fought.
        defender: Combatant,
    },
    /// Supplies the chart for a session awaiting one.
    LoadChart {
        /// Session the chart belongs to.
        session: SessionId,
        /// Chart to play.
        chart: Chart,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports that the player pressed a lane.
    PressLane {
        /// Lane that was pressed.
        lane: LaneIndex,
    },
    /// Requests that a scheduled note become visible and start moving.
    SpawnNote {
        /// Session the note belongs to.
        session: SessionId,
        /// Note to spawn.
        note: NoteId,
    },
    /// Requests that a note be judged and removed.
    ResolveNote {
        /// Session the note belongs to.
        session: SessionId,
        /// Note being judged.
        note: NoteId,
        /// Verdict for the note.
        judgment: Judgment,
        /// Signed timing error in milliseconds, positive when late.
        delta_ms: f64,
    },
    /// Cancels a session without combat consequences.
    AbortEncounter {
        /// Session to cancel.
        session: SessionId,
    },
    /// Applies the combat outcome of an ended session and releases it.
    FinalizeEncounter {
        /// Session being finalized.
        session: SessionId,
        /// Consequences to apply to the participants.
        outcome: CombatOutcome,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Reports that an encounter could not begin.
    EncounterRejected {
        /// Defender that was requested.
        defender: CombatantId,
        /// Reason the request failed.
        reason: EncounterError,
    },
    /// Asks for a chart to be built for a freshly opened session.
    ChartRequested {
        /// Session waiting for the chart.
        session: SessionId,
        /// Track to build the chart from.
        track: Track,
        /// Difficulty parameters for generation.
        profile: DifficultyProfile,
    },
    /// Confirms that a chart was accepted for a session.
    ChartLoaded {
        /// Session the chart belongs to.
        session: SessionId,
        /// Accepted notes with their identifiers.
        notes: Vec<ChartEntry>,
        /// Travel time from spawn point to hit line, indexed by lane.
        travel_secs: Vec<f64>,
        /// How the chart was produced.
        origin: ChartOrigin,
    },
    /// Announces the lead-in before the session clock starts.
    IntroStarted {
        /// Session entering its intro.
        session: SessionId,
        /// Length of the intro.
        intro_secs: f64,
    },
    /// Announces that the session clock started.
    SessionStarted {
        /// Session that started.
        session: SessionId,
        /// Number of notes to be judged.
        note_count: u32,
        /// Clock time at which the session ends.
        length_secs: f64,
    },
    /// Indicates that the session clock advanced.
    ClockAdvanced {
        /// Session whose clock advanced.
        session: SessionId,
        /// Session time after the advance.
        now_secs: f64,
    },
    /// Confirms that a note started travelling toward the hit line.
    NoteSpawned {
        /// Session the note belongs to.
        session: SessionId,
        /// Spawned note.
        note: NoteId,
        /// Lane the note travels in.
        lane: LaneIndex,
        /// Session time at which the note reaches the hit line.
        target_time_secs: f64,
    },
    /// Relays an accepted lane press to the judgment system.
    LanePressed {
        /// Session the press belongs to.
        session: SessionId,
        /// Lane that was pressed.
        lane: LaneIndex,
        /// Session time of the press.
        at_secs: f64,
    },
    /// Reports that a lane press was ignored.
    LaneRejected {
        /// Lane that was pressed.
        lane: LaneIndex,
        /// Reason the press was ignored.
        reason: LaneRejection,
    },
    /// Confirms that a note was judged exactly once.
    NoteResolved {
        /// Session the note belonged to.
        session: SessionId,
        /// Judged note.
        note: NoteId,
        /// Lane the note travelled in.
        lane: LaneIndex,
        /// Verdict applied to the note.
        judgment: Judgment,
        /// Signed timing error in milliseconds.
        delta_ms: f64,
        /// Combo after the judgment.
        combo: u32,
        /// Score after the judgment.
        score: u32,
    },
    /// Announces that a session stopped and is awaiting its outcome.
    SessionEnded {
        /// Session that ended.
        session: SessionId,
        /// Kind of encounter.
        kind: EncounterKind,
        /// Why the session stopped.
        reason: EndReason,
        /// Final judgment tally.
        performance: PerformanceState,
        /// Derived summary of the tally.
        result: SessionResult,
        /// Balance values in force for the encounter.
        tuning: EncounterTuning,
        /// Attacker as it stood when the session ended.
        attacker: Combatant,
        /// Defender as it stood when the session ended.
        defender: Combatant,
        /// Chip damage accumulated during play.
        chip_damage: u32,
    },
    /// Announces that an encounter is fully resolved and its session released.
    EncounterResolved {
        /// Final report of the encounter.
        report: Box<EncounterReport>,
    },
}

/// Reasons a lane press may be ignored by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneRejection {
    /// No session is currently playing.
    NoActiveSession,
    /// The lane index exceeds the configured lane count.
    OutOfRange,
}

/// Unique identifier assigned to each session by the arbiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a new session identifier with the provided value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a note, unique within its chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(u32);

impl NoteId {
    /// Creates a new note identifier with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Zero-based lane index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneIndex(u8);

impl LaneIndex {
    /// Creates a new lane index.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the raw lane number.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Lane number usable as a slice index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a combatant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(u32);

impl CombatantId {
    /// Creates a new combatant identifier with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a track.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    /// Creates a new track identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable representation of a travelling note used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveNoteSnapshot {
    /// Session the note belongs to.
    pub session: SessionId,
    /// Identifier of the note.
    pub id: NoteId,
    /// Lane the note travels in.
    pub lane: LaneIndex,
    /// Session time at which the note reaches the hit line.
    pub target_time_secs: f64,
    /// Length of the hold, zero for taps.
    pub hold_secs: f64,
    /// Fraction of the path covered. Exceeds one once the note passes the hit line.
    pub progress: f64,
    /// Current position in world units.
    pub position: Point2,
}

/// Read-only snapshot describing all travelling notes.
#[derive(Clone, Debug, Default)]
pub struct ActiveNoteView {
    snapshots: Vec<ActiveNoteSnapshot>,
}

impl ActiveNoteView {
    /// Creates a new view, ordering notes by target time and identifier.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ActiveNoteSnapshot>) -> Self {
        snapshots.sort_by(|a, b| {
            a.target_time_secs
                .total_cmp(&b.target_time_secs)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { snapshots }
    }

    /// Iterator over the captured notes in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveNoteSnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over the notes travelling in a single lane.
    pub fn in_lane(&self, lane: LaneIndex) -> impl Iterator<Item = &ActiveNoteSnapshot> {
        self.snapshots.iter().filter(move |note| note.lane == lane)
    }

    /// Number of travelling notes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no note is travelling.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ActiveNoteSnapshot> {
        self.snapshots
    }
}
