use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CombatantId, PerformanceState, SessionId, SessionResult, TrackId};

/// Offensive and defensive attributes of a combatant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatStats {
    /// Scales damage dealt to the opposing side when this combatant wins.
    pub strength: u32,
    /// Flat reduction applied to incoming damage.
    pub defense: u32,
    /// Chance in percent that a winning exchange lands a critical hit.
    pub crit_chance_percent: u32,
    /// Damage multiplier of a critical hit, in percent.
    pub crit_damage_percent: u32,
}

impl CombatStats {
    /// Creates stats with the default critical hit settings.
    #[must_use]
    pub const fn new(strength: u32, defense: u32) -> Self {
        Self {
            strength,
            defense,
            crit_chance_percent: 5,
            crit_damage_percent: 150,
        }
    }

    /// Overrides the critical hit settings.
    #[must_use]
    pub fn with_crit(mut self, chance_percent: u32, damage_percent: u32) -> Self {
        self.crit_chance_percent = chance_percent;
        self.crit_damage_percent = damage_percent;
        self
    }
}

impl Default for CombatStats {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

/// Participant on either side of an encounter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combatant {
    id: CombatantId,
    name: String,
    stats: CombatStats,
    health: u32,
    max_health: u32,
    #[serde(default)]
    gold: u32,
    #[serde(default)]
    bounty: u32,
}

impl Combatant {
    /// Gold granted for defeating a combatant unless overridden.
    pub const DEFAULT_BOUNTY: u32 = 10;

    /// Creates a combatant at full health.
    #[must_use]
    pub fn new(id: CombatantId, name: impl Into<String>, max_health: u32, stats: CombatStats) -> Self {
        Self {
            id,
            name: name.into(),
            stats,
            health: max_health,
            max_health,
            gold: 0,
            bounty: Self::DEFAULT_BOUNTY,
        }
    }

    /// Sets the gold the combatant carries.
    #[must_use]
    pub fn with_gold(mut self, gold: u32) -> Self {
        self.gold = gold;
        self
    }

    /// Sets the base gold granted to whoever defeats the combatant.
    #[must_use]
    pub fn with_bounty(mut self, bounty: u32) -> Self {
        self.bounty = bounty;
        self
    }

    /// Sets the current health, capped at the maximum.
    #[must_use]
    pub fn with_health(mut self, health: u32) -> Self {
        self.health = health.min(self.max_health);
        self
    }

    /// Identifier of the combatant.
    #[must_use]
    pub const fn id(&self) -> CombatantId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Combat attributes.
    #[must_use]
    pub const fn stats(&self) -> &CombatStats {
        &self.stats
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Health at full strength.
    #[must_use]
    pub const fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Gold carried.
    #[must_use]
    pub const fn gold(&self) -> u32 {
        self.gold
    }

    /// Base gold granted to whoever defeats the combatant.
    #[must_use]
    pub const fn bounty(&self) -> u32 {
        self.bounty
    }

    /// Reports whether the combatant has no health left.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.health == 0
    }

    /// Subtracts health, returning the amount actually removed.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.health);
        self.health -= applied;
        applied
    }

    /// Adds gold to the purse.
    pub fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }
}

/// Flavour of an encounter, selecting its tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterKind {
    /// Ordinary enemy.
    Skirmish,
    /// Boss enemy with heavier damage and a bad timing band.
    Boss,
}

/// Balance values applied to one kind of encounter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncounterTuning {
    /// Damage dealt by a winning performance before any multiplier.
    pub base_damage: u32,
    /// Extra multiplier applied to outgoing damage.
    pub damage_scale: f64,
    /// Score at which the score bonus saturates.
    pub score_ceiling: u32,
    /// Minimum accuracy in percent required to win.
    pub win_threshold_percent: f64,
    /// Width of the bad band past the okay window, if any.
    pub bad_margin_ms: Option<f64>,
    /// Damage the attacker accrues for each timed-out note.
    pub miss_chip_damage: u32,
    /// Damage the attacker accrues for each bad press.
    pub bad_chip_damage: u32,
    /// Lead-in before the session clock starts.
    pub intro_secs: f64,
    /// Time before the same opponent can be engaged again.
    pub cooldown_secs: f64,
}

impl EncounterTuning {
    /// Tuning for ordinary enemies.
    pub const SKIRMISH: Self = Self {
        base_damage: 10,
        damage_scale: 1.0,
        score_ceiling: 10_000,
        win_threshold_percent: 60.0,
        bad_margin_ms: None,
        miss_chip_damage: 5,
        bad_chip_damage: 10,
        intro_secs: 1.0,
        cooldown_secs: 5.0,
    };

    /// Tuning for bosses.
    pub const BOSS: Self = Self {
        base_damage: 10,
        damage_scale: 25.0,
        score_ceiling: 10_000,
        win_threshold_percent: 60.0,
        bad_margin_ms: Some(60.0),
        miss_chip_damage: 5,
        bad_chip_damage: 10,
        intro_secs: 1.0,
        cooldown_secs: 5.0,
    };
}

/// Tuning for every encounter kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuningTable {
    /// Tuning used for [`EncounterKind::Skirmish`].
    pub skirmish: EncounterTuning,
    /// Tuning used for [`EncounterKind::Boss`].
    pub boss: EncounterTuning,
}

impl TuningTable {
    /// Looks up the tuning for an encounter kind.
    #[must_use]
    pub const fn for_kind(&self, kind: EncounterKind) -> &EncounterTuning {
        match kind {
            EncounterKind::Skirmish => &self.skirmish,
            EncounterKind::Boss => &self.boss,
        }
    }
}

impl Default for TuningTable {
    fn default() -> Self {
        Self {
            skirmish: EncounterTuning::SKIRMISH,
            boss: EncounterTuning::BOSS,
        }
    }
}

/// Why a session stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// The session clock ran past the end of the chart.
    Completed,
    /// Chip damage depleted the attacker before the chart finished.
    Knockout,
    /// The encounter was cancelled from outside.
    Aborted,
}

/// Which side won the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The attacker performed well enough to damage the defender.
    Victory,
    /// The defender retaliates against the attacker.
    Defeat,
}

/// Combat consequences computed for a finished session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatOutcome {
    /// Which side won the exchange.
    pub verdict: Verdict,
    /// Damage dealt to the defender.
    pub damage_to_defender: u32,
    /// Damage dealt to the attacker, excluding chip damage.
    pub damage_to_attacker: u32,
    /// Chip damage accumulated during play, applied to the attacker.
    pub chip_damage: u32,
    /// Whether the attack was a critical hit.
    pub critical: bool,
    /// Multiplier granted for combo quality.
    pub combo_multiplier: f64,
    /// Gold awarded to the attacker.
    pub gold_awarded: u32,
    /// Whether the defender falls to this outcome.
    pub finishing_blow: bool,
}

/// Final record of an encounter, emitted once it is resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncounterReport {
    /// Session the report covers.
    pub session: SessionId,
    /// Track the session was played to.
    pub track: TrackId,
    /// Kind of encounter.
    pub kind: EncounterKind,
    /// Why the session stopped.
    pub reason: EndReason,
    /// Number of notes in the loaded chart.
    pub note_count: u32,
    /// Final judgment tally.
    pub performance: PerformanceState,
    /// Derived summary of the tally.
    pub result: SessionResult,
    /// Applied combat outcome, absent when the encounter was aborted.
    pub outcome: Option<CombatOutcome>,
    /// Attacker after the outcome was applied.
    pub attacker: Combatant,
    /// Defender after the outcome was applied.
    pub defender: Combatant,
}

/// Reasons an encounter cannot begin.
#[derive(Clone, Copy, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum EncounterError {
    /// Another session holds the arbiter.
    #[error("session {session} is still in progress")]
    SessionActive {
        /// Session currently holding the arbiter.
        session: SessionId,
    },
    /// The opponent was engaged too recently.
    #[error("opponent {opponent} can be engaged again in {remaining_secs:.2}s")]
    Cooldown {
        /// Opponent that is still cooling down.
        opponent: CombatantId,
        /// Time until the opponent becomes available.
        remaining_secs: f64,
    },
}

/// Reasons content cannot be selected for an encounter.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    /// The catalog has no tracks at all.
    #[error("track catalog is empty")]
    EmptyCatalog,
    /// A track was requested by an identifier the catalog does not know.
    #[error("track {track} is not in the catalog")]
    UnknownTrack {
        /// Identifier that failed to resolve.
        track: TrackId,
    },
}
