#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combat outcome system that converts a finished session into damage and
//! rewards.
//!
//! A winning session damages the defender. Damage grows with score, with
//! combo quality (full combo and all-perfect runs multiply it) and with a
//! critical hit roll. A losing session lets the defender retaliate based on
//! the number of misses. Every damage value is at least one. Gold is only
//! awarded for the blow that defeats the defender.

use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rhythm_combat_core::{
    CombatOutcome, Combatant, Command, EncounterTuning, EndReason, Event, PerformanceState,
    SessionResult, Verdict,
};

/// Combo multiplier for a run where every note was perfect.
pub const ALL_PERFECT_MULTIPLIER: f64 = 5.0;
/// Combo multiplier for a run without misses.
pub const FULL_COMBO_MULTIPLIER: f64 = 2.0;
/// Strength that leaves damage unscaled.
const REFERENCE_STRENGTH: f64 = 10.0;
/// Damage the defender deals per missed note before strength scaling.
const RETALIATION_PER_MISS: f64 = 2.0;

/// Pure system that answers ended sessions with [`Command::FinalizeEncounter`].
#[derive(Debug)]
pub struct OutcomeResolution {
    rng: ChaCha8Rng,
}

impl OutcomeResolution {
    /// Creates an outcome system whose critical rolls follow `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Consumes `SessionEnded` events and emits the resulting outcome.
    ///
    /// Aborted sessions have no combat consequences and are skipped.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            let Event::SessionEnded {
                session,
                reason,
                performance,
                result,
                tuning,
                attacker,
                defender,
                chip_damage,
                ..
            } = event
            else {
                continue;
            };
            if *reason == EndReason::Aborted {
                continue;
            }

            let mut outcome = self.resolve(performance, result, tuning, attacker, defender);
            outcome.chip_damage = *chip_damage;
            info!(
                "session {session}: {:?}, {} damage to {}, {} damage to {}{}",
                outcome.verdict,
                outcome.damage_to_defender,
                defender.name(),
                outcome.damage_to_attacker.saturating_add(outcome.chip_damage),
                attacker.name(),
                if outcome.critical { " (critical)" } else { "" }
            );
            out.push(Command::FinalizeEncounter {
                session: *session,
                outcome,
            });
        }
    }

    /// Computes the outcome of a session, rolling for a critical hit on wins.
    pub fn resolve(
        &mut self,
        performance: &PerformanceState,
        result: &SessionResult,
        tuning: &EncounterTuning,
        attacker: &Combatant,
        defender: &Combatant,
    ) -> CombatOutcome {
        let combo = combo_multiplier(result);
        if !result.won() {
            return CombatOutcome {
                verdict: Verdict::Defeat,
                damage_to_defender: 0,
                damage_to_attacker: retaliation_damage(performance, defender, attacker),
                chip_damage: 0,
                critical: false,
                combo_multiplier: combo,
                gold_awarded: 0,
                finishing_blow: false,
            };
        }

        let stats = attacker.stats();
        let critical = self.rng.gen_range(0..100_u32) < stats.crit_chance_percent;
        let crit_multiplier = if critical {
            f64::from(stats.crit_damage_percent) / 100.0
        } else {
            1.0
        };
        let damage = attack_damage(tuning, performance, attacker, combo * crit_multiplier);
        let finishing_blow = damage >= defender.health();
        CombatOutcome {
            verdict: Verdict::Victory,
            damage_to_defender: damage,
            damage_to_attacker: 0,
            chip_damage: 0,
            critical,
            combo_multiplier: combo,
            gold_awarded: if finishing_blow {
                gold_reward(defender.bounty(), result.accuracy_percent())
            } else {
                0
            },
            finishing_blow,
        }
    }
}

/// Multiplier granted for combo quality.
#[must_use]
pub fn combo_multiplier(result: &SessionResult) -> f64 {
    if result.all_perfect() {
        ALL_PERFECT_MULTIPLIER
    } else if result.full_combo() {
        FULL_COMBO_MULTIPLIER
    } else {
        1.0
    }
}

/// Damage a winning attacker deals before the defender's health is considered.
///
/// The base damage gains up to 100% from score, saturating at the tuning's
/// score ceiling, and is scaled by `multiplier`, the attacker's strength and
/// the tuning's damage scale.
#[must_use]
pub fn attack_damage(
    tuning: &EncounterTuning,
    performance: &PerformanceState,
    attacker: &Combatant,
    multiplier: f64,
) -> u32 {
    let score_bonus = if tuning.score_ceiling == 0 {
        1.0
    } else {
        (f64::from(performance.score()) / f64::from(tuning.score_ceiling)).clamp(0.0, 1.0)
    };
    let strength = f64::from(attacker.stats().strength) / REFERENCE_STRENGTH;
    let raw = f64::from(tuning.base_damage)
        * (1.0 + score_bonus)
        * multiplier
        * strength
        * tuning.damage_scale;
    at_least_one(raw.round())
}

/// Damage a defender deals back after a lost session.
#[must_use]
pub fn retaliation_damage(
    performance: &PerformanceState,
    defender: &Combatant,
    attacker: &Combatant,
) -> u32 {
    let strength = f64::from(defender.stats().strength) / REFERENCE_STRENGTH;
    let raw = (f64::from(performance.miss_count()) * RETALIATION_PER_MISS * strength).round();
    at_least_one(raw - f64::from(attacker.stats().defense))
}

/// Gold for a finishing blow, from half the bounty at 0% accuracy up to
/// double at 100%.
#[must_use]
pub fn gold_reward(bounty: u32, accuracy_percent: f64) -> u32 {
    let t = (accuracy_percent / 100.0).clamp(0.0, 1.0);
    let factor = 0.5 + (2.0 - 0.5) * t;
    (f64::from(bounty) * factor).round() as u32
}

fn at_least_one(value: f64) -> u32 {
    if value.is_nan() || value < 1.0 {
        1
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhythm_combat_core::{CombatStats, CombatantId, Judgment};

    fn tally(judgments: &[Judgment]) -> PerformanceState {
        let mut state = PerformanceState::default();
        for judgment in judgments {
            state.record(*judgment);
        }
        state
    }

    fn hero(stats: CombatStats) -> Combatant {
        Combatant::new(CombatantId::new(1), "hero", 100, stats)
    }

    fn foe(health: u32) -> Combatant {
        Combatant::new(CombatantId::new(2), "foe", 200, CombatStats::new(5, 5)).with_health(health)
    }

    #[test]
    fn combo_quality_sets_the_multiplier() {
        let perfect = tally(&[Judgment::Perfect; 3]);
        let clean = tally(&[Judgment::Perfect, Judgment::Good]);
        let sloppy = tally(&[Judgment::Perfect, Judgment::Miss]);
        let multiplier = |state: &PerformanceState| {
            combo_multiplier(&SessionResult::evaluate(state, 60.0))
        };
        assert_eq!(multiplier(&perfect), 5.0);
        assert_eq!(multiplier(&clean), 2.0);
        assert_eq!(multiplier(&sloppy), 1.0);
    }

    #[test]
    fn attack_damage_scales_with_score_and_saturates() {
        let tuning = EncounterTuning::SKIRMISH;
        let attacker = hero(CombatStats::default());
        let mut state = PerformanceState::default();
        assert_eq!(attack_damage(&tuning, &state, &attacker, 1.0), 10);
        for _ in 0..50 {
            state.record(Judgment::Perfect);
        }
        assert_eq!(attack_damage(&tuning, &state, &attacker, 1.0), 15);
        for _ in 0..200 {
            state.record(Judgment::Perfect);
        }
        assert_eq!(attack_damage(&tuning, &state, &attacker, 1.0), 20);
    }

    #[test]
    fn boss_tuning_multiplies_damage() {
        let attacker = hero(CombatStats::default());
        let state = PerformanceState::default();
        let skirmish = attack_damage(&EncounterTuning::SKIRMISH, &state, &attacker, 1.0);
        let boss = attack_damage(&EncounterTuning::BOSS, &state, &attacker, 1.0);
        assert_eq!(boss, skirmish * 25);
    }

    #[test]
    fn damage_never_drops_below_one() {
        let tuning = EncounterTuning {
            base_damage: 0,
            ..EncounterTuning::SKIRMISH
        };
        let attacker = hero(CombatStats::default());
        assert_eq!(attack_damage(&tuning, &PerformanceState::default(), &attacker, 1.0), 1);

        let armoured = hero(CombatStats::new(10, 500));
        let state = tally(&[Judgment::Miss; 3]);
        assert_eq!(retaliation_damage(&state, &foe(50), &armoured), 1);
    }

    #[test]
    fn retaliation_grows_with_misses() {
        let attacker = hero(CombatStats::new(10, 2));
        let defender = foe(50);
        let few = retaliation_damage(&tally(&[Judgment::Miss; 4]), &defender, &attacker);
        let many = retaliation_damage(&tally(&[Judgment::Miss; 20]), &defender, &attacker);
        assert_eq!(few, 2);
        assert_eq!(many, 18);
    }

    #[test]
    fn gold_is_awarded_only_for_finishing_blows() {
        let mut system = OutcomeResolution::new(11);
        let attacker = hero(CombatStats::default().with_crit(0, 150));
        let state = tally(&[Judgment::Perfect, Judgment::Good]);
        let result = SessionResult::evaluate(&state, 60.0);

        let survivor = system.resolve(&state, &result, &EncounterTuning::SKIRMISH, &attacker, &foe(150));
        assert_eq!(survivor.verdict, Verdict::Victory);
        assert!(!survivor.finishing_blow);
        assert_eq!(survivor.gold_awarded, 0);

        let fragile = system.resolve(&state, &result, &EncounterTuning::SKIRMISH, &attacker, &foe(3));
        assert!(fragile.finishing_blow);
        assert_eq!(fragile.gold_awarded, gold_reward(Combatant::DEFAULT_BOUNTY, result.accuracy_percent()));
    }

    #[test]
    fn guaranteed_critical_hits_multiply_damage() {
        let mut system = OutcomeResolution::new(5);
        let attacker = hero(CombatStats::default().with_crit(100, 200));
        let state = tally(&[Judgment::Perfect, Judgment::Miss, Judgment::Perfect, Judgment::Perfect]);
        let result = SessionResult::evaluate(&state, 60.0);
        let outcome = system.resolve(&state, &result, &EncounterTuning::SKIRMISH, &attacker, &foe(200));
        assert!(outcome.critical);
        assert_eq!(outcome.damage_to_defender, 21);
    }

    #[test]
    fn losses_hurt_the_attacker() {
        let mut system = OutcomeResolution::new(5);
        let attacker = hero(CombatStats::new(10, 0));
        let state = tally(&[Judgment::Miss; 5]);
        let result = SessionResult::evaluate(&state, 60.0);
        let outcome = system.resolve(&state, &result, &EncounterTuning::SKIRMISH, &attacker, &foe(20));
        assert_eq!(outcome.verdict, Verdict::Defeat);
        assert_eq!(outcome.damage_to_defender, 0);
        assert_eq!(outcome.damage_to_attacker, 5);
    }

    #[test]
    fn gold_scales_with_accuracy() {
        assert_eq!(gold_reward(10, 0.0), 5);
        assert_eq!(gold_reward(10, 50.0), 13);
        assert_eq!(gold_reward(10, 100.0), 20);
    }
}
