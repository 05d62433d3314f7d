#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a simulated rhythm combat encounter.
//!
//! An auto-player with configurable timing spread presses the lanes while
//! the conductor runs the encounter at a fixed tick rate. The final report
//! is printed once the encounter resolves.

mod autoplay;

use std::{fmt::Write as _, path::PathBuf, time::Duration};

use anyhow::{bail, ensure, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use rhythm_combat_conductor::{Conductor, ConductorConfig};
use rhythm_combat_core::{
    CombatStats, Combatant, CombatantId, Density, DifficultyProfile, EncounterKind,
    EncounterReport, Track, TrackId,
};
use rhythm_combat_world::{query, EncounterPhase};

use autoplay::AutoPlayer;

/// Stream selector separating the auto-player from the engine's seeds.
const PLAYER_STREAM: u64 = 0x706c_6179_6572;
/// Simulated time allowed past the track length before giving up.
const GRACE_SECS: f64 = 30.0;

/// Kind of opponent to fight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    /// Regular enemy without a bad window.
    Skirmish,
    /// Boss with scaled damage and a bad window.
    Boss,
}

impl From<KindArg> for EncounterKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Skirmish => Self::Skirmish,
            KindArg::Boss => Self::Boss,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "rhythm-combat", version)]
#[command(about = "Plays a simulated rhythm combat encounter and prints the result")]
struct Args {
    /// Track tempo in beats per minute
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,

    /// Track length in seconds
    #[arg(long, default_value_t = 30.0)]
    duration: f64,

    /// Seconds before the first beat
    #[arg(long, default_value_t = 0.0)]
    offset: f64,

    /// Identifier reported for the generated track
    #[arg(long, default_value = "practice")]
    track_id: String,

    /// Pick the track from the config catalog instead of --bpm/--duration
    #[arg(long)]
    from_catalog: bool,

    /// Chart density from 1 (sparse) to 10 (dense)
    #[arg(long, default_value_t = 5)]
    #[arg(value_parser = clap::value_parser!(u8).range(1..=10))]
    density: u8,

    /// Opponent kind
    #[arg(long, value_enum, default_value_t = KindArg::Skirmish)]
    kind: KindArg,

    /// Seed overriding the one in the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Standard deviation of the auto-player's timing error, in milliseconds
    #[arg(long, default_value_t = 25.0)]
    skill_ms: f64,

    /// Fraction of notes the auto-player lets pass
    #[arg(long, default_value_t = 0.05)]
    miss_rate: f64,

    /// Simulation ticks per second
    #[arg(long, default_value_t = 120)]
    tick_hz: u32,

    /// Health of the player character
    #[arg(long, default_value_t = 100)]
    hero_health: u32,

    /// Health of the opponent
    #[arg(long, default_value_t = 60)]
    enemy_health: u32,

    /// Optional TOML file with conductor settings
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Entry point for the rhythm combat command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    ensure!(args.tick_hz > 0, "tick rate must be positive");

    let mut config = match &args.config {
        Some(path) => ConductorConfig::load(path)?,
        None => ConductorConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let seed = config.seed;
    let mut player = AutoPlayer::new(seed ^ PLAYER_STREAM, args.skill_ms, args.miss_rate)?;
    let mut conductor = Conductor::new(config);

    let kind = EncounterKind::from(args.kind);
    let profile = DifficultyProfile::for_density(Density::new(args.density));
    let hero = Combatant::new(
        CombatantId::new(1),
        "hero",
        args.hero_health,
        CombatStats::default(),
    );
    let enemy = opponent(kind, args.enemy_health);
    let session = if args.from_catalog {
        conductor.begin_from_catalog(profile, kind, hero, enemy)
    } else {
        let track = Track::new(TrackId::new(args.track_id.as_str()), args.bpm, args.duration)
            .with_beat_offset(args.offset);
        conductor.begin_encounter(track, profile, kind, hero, enemy)
    }
    .context("encounter could not start")?;
    info!("session {session} started with seed {seed}");

    let report = simulate(&mut conductor, &mut player, args.tick_hz)?;
    println!("{}", render_report(&report));
    Ok(())
}

/// Ticks the running encounter until it resolves, letting `player` press
/// the lanes while notes are in play.
///
/// The time limit follows the live session, so catalog tracks of any
/// length get to finish.
fn simulate(
    conductor: &mut Conductor,
    player: &mut AutoPlayer,
    tick_hz: u32,
) -> Result<EncounterReport> {
    let status = query::encounter(conductor.world()).context("no encounter is running")?;
    let intro_secs = query::config(conductor.world())
        .tuning
        .for_kind(status.kind)
        .intro_secs;
    let max_ticks = tick_budget(status.length_secs + intro_secs.max(0.0), tick_hz);
    let dt = Duration::from_secs_f64(1.0 / f64::from(tick_hz));

    let mut ticks = 0.0;
    loop {
        conductor.tick(dt);
        let _ = conductor.drain_feedback();
        if let Some(report) = conductor.last_report() {
            return Ok(report.clone());
        }
        ticks += 1.0;
        if ticks > max_ticks {
            bail!(
                "session {} did not resolve within the simulated time limit",
                status.session
            );
        }

        let Some(now) = query::encounter(conductor.world())
            .filter(|live| live.phase == EncounterPhase::Playing)
            .map(|live| live.clock_secs)
        else {
            continue;
        };
        for lane in player.presses(now, &query::active_notes(conductor.world())) {
            conductor.press_lane(lane);
        }
    }
}

/// Ticks allowed for a session lasting `session_secs`, grace included.
fn tick_budget(session_secs: f64, tick_hz: u32) -> f64 {
    ((session_secs.max(0.0) + GRACE_SECS) * f64::from(tick_hz)).ceil()
}

fn opponent(kind: EncounterKind, health: u32) -> Combatant {
    match kind {
        EncounterKind::Skirmish => Combatant::new(
            CombatantId::new(2),
            "goblin",
            health,
            CombatStats::new(8, 4),
        ),
        EncounterKind::Boss => Combatant::new(
            CombatantId::new(3),
            "warden",
            health,
            CombatStats::new(15, 8),
        )
        .with_bounty(50),
    }
}

fn render_report(report: &EncounterReport) -> String {
    let performance = &report.performance;
    let result = &report.result;
    let mut text = String::new();
    let _ = writeln!(
        text,
        "session {} on track {} ({:?}): {:?}",
        report.session, report.track, report.kind, report.reason
    );
    let _ = writeln!(
        text,
        "notes {} | perfect {} good {} okay {} bad {} miss {}",
        report.note_count,
        performance.perfect_count(),
        performance.good_count(),
        performance.okay_count(),
        performance.bad_count(),
        performance.miss_count()
    );
    let _ = writeln!(
        text,
        "score {} | max combo {} | accuracy {:.2}% | grade {}",
        performance.score(),
        performance.max_combo(),
        result.accuracy_percent(),
        result.grade()
    );
    match &report.outcome {
        Some(outcome) => {
            let _ = writeln!(
                text,
                "{:?}: {} damage to {}{}, {} damage and {} chip to {}, {} gold",
                outcome.verdict,
                outcome.damage_to_defender,
                report.defender.name(),
                if outcome.critical { " (critical)" } else { "" },
                outcome.damage_to_attacker,
                outcome.chip_damage,
                report.attacker.name(),
                outcome.gold_awarded
            );
        }
        None => {
            let _ = writeln!(text, "aborted without combat consequences");
        }
    }
    let _ = write!(
        text,
        "{} {}/{} hp, {} gold | {} {}/{} hp",
        report.attacker.name(),
        report.attacker.health(),
        report.attacker.max_health(),
        report.attacker.gold(),
        report.defender.name(),
        report.defender.health(),
        report.defender.max_health()
    );
    text
}

#[cfg(test)]
mod tests {
    use super::{opponent, render_report, simulate, tick_budget, AutoPlayer};
    use rhythm_combat_conductor::{Conductor, ConductorConfig};
    use rhythm_combat_core::{
        CombatOutcome, CombatStats, Combatant, CombatantId, Density, DifficultyProfile,
        EncounterKind, EncounterReport, EndReason, Judgment, PerformanceState, SessionId,
        SessionResult, TrackId, Verdict,
    };
    use rhythm_combat_world::query;

    #[test]
    fn report_lists_tally_and_outcome() {
        let mut performance = PerformanceState::default();
        for judgment in [Judgment::Perfect, Judgment::Perfect, Judgment::Good, Judgment::Miss] {
            performance.record(judgment);
        }
        let report = EncounterReport {
            session: SessionId::new(4),
            track: TrackId::new("practice"),
            kind: EncounterKind::Skirmish,
            reason: EndReason::Completed,
            note_count: 4,
            performance,
            result: SessionResult::evaluate(&performance, 60.0),
            outcome: Some(CombatOutcome {
                verdict: Verdict::Victory,
                damage_to_defender: 13,
                damage_to_attacker: 0,
                chip_damage: 5,
                critical: true,
                combo_multiplier: 1.0,
                gold_awarded: 0,
                finishing_blow: false,
            }),
            attacker: Combatant::new(CombatantId::new(1), "hero", 100, CombatStats::default())
                .with_health(95),
            defender: opponent(EncounterKind::Skirmish, 60).with_health(47),
        };

        let text = render_report(&report);

        assert!(text.starts_with("session #4 on track practice (Skirmish): Completed"));
        assert!(text.contains("perfect 2 good 1 okay 0 bad 0 miss 1"));
        assert!(text.contains("accuracy 68.75%"));
        assert!(text.contains("Victory: 13 damage to goblin (critical)"));
        assert!(text.ends_with("hero 95/100 hp, 0 gold | goblin 47/60 hp"));
    }

    #[test]
    fn bosses_carry_a_larger_bounty() {
        let boss = opponent(EncounterKind::Boss, 400);
        let grunt = opponent(EncounterKind::Skirmish, 40);
        assert!(boss.bounty() > grunt.bounty());
        assert!(boss.stats().strength > grunt.stats().strength);
    }

    #[test]
    fn tick_budget_covers_the_session_and_grace() {
        assert_eq!(tick_budget(91.5, 120), 14_580.0);
        assert_eq!(tick_budget(-3.0, 10), 300.0);
    }

    #[test]
    fn long_catalog_tracks_play_to_the_end() {
        let config = ConductorConfig::from_toml_str(
            r#"
            seed = 21

            [[catalog.entries]]

            [catalog.entries.track]
            id = "long-march"
            bpm = 96.0
            audio_duration_secs = 90.0
            "#,
        )
        .expect("valid config");
        let mut conductor = Conductor::new(config);
        let _ = conductor
            .begin_from_catalog(
                DifficultyProfile::for_density(Density::new(3)),
                EncounterKind::Skirmish,
                Combatant::new(CombatantId::new(1), "hero", 100, CombatStats::default()),
                opponent(EncounterKind::Skirmish, 500),
            )
            .expect("catalog track selected");
        let status = query::encounter(conductor.world()).expect("encounter running");
        assert_eq!(status.track, TrackId::new("long-march"));
        assert!(status.length_secs > 90.0);

        let mut player = AutoPlayer::new(21, 5.0, 0.0).expect("valid player");
        let report = simulate(&mut conductor, &mut player, 60).expect("session resolves");

        assert_eq!(report.reason, EndReason::Completed);
        assert_eq!(report.track, TrackId::new("long-march"));
        assert!(report.note_count > 0);
    }
}
