use std::time::Duration;

use rhythm_combat_core::{
    Chart, ChartOrigin, ChartStats, CombatStats, Combatant, CombatantId, Command, Density,
    DifficultyProfile, EncounterKind, Event, LaneIndex, Note, NoteId, SessionId, Track, TrackId,
};
use rhythm_combat_system_spawning::Spawning;
use rhythm_combat_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(50);

fn step(world: &mut World, spawning: &mut Spawning, commands: Vec<Command>) -> Vec<Event> {
    let mut all = Vec::new();
    let mut pending = commands;
    while !pending.is_empty() {
        let mut events = Vec::new();
        for command in pending.drain(..) {
            world::apply(world, command, &mut events);
        }
        spawning.handle(&events, &mut pending);
        all.extend(events);
    }
    all
}

fn start_session(world: &mut World, spawning: &mut Spawning, notes: Vec<Note>) -> SessionId {
    let _ = step(
        world,
        spawning,
        vec![Command::BeginEncounter {
            track: Track::new(TrackId::new("metronome"), 120.0, 6.0),
            profile: DifficultyProfile::for_density(Density::MIN),
            kind: EncounterKind::Skirmish,
            attacker: Combatant::new(CombatantId::new(1), "hero", 100, CombatStats::default()),
            defender: Combatant::new(CombatantId::new(2), "bat", 20, CombatStats::new(5, 5)),
        }],
    );
    let session = query::arbiter(world)
        .active_session()
        .expect("session granted");
    let chart = Chart::new(notes, 0.0, 6.0, ChartOrigin::Fallback, ChartStats::default());
    let _ = step(world, spawning, vec![Command::LoadChart { session, chart }]);
    session
}

fn clock_of(events: &[Event]) -> Option<f64> {
    events.iter().find_map(|event| match event {
        Event::ClockAdvanced { now_secs, .. } => Some(*now_secs),
        _ => None,
    })
}

#[test]
fn notes_spawn_one_travel_time_before_their_target() {
    let mut world = World::new();
    let mut spawning = Spawning::new();
    let notes = vec![
        Note::tap(LaneIndex::new(0), 2.0),
        Note::tap(LaneIndex::new(1), 2.5),
        Note::tap(LaneIndex::new(2), 4.0),
    ];
    let session = start_session(&mut world, &mut spawning, notes.clone());
    let travel = query::judgment_config(&world)
        .map(|config| config.travel_secs(600.0))
        .expect("judgment config");
    assert!((travel - 1.2).abs() < 1e-9);

    let mut spawned_at = Vec::new();
    for _ in 0..200 {
        let events = step(&mut world, &mut spawning, vec![Command::Tick { dt: TICK }]);
        let Some(now) = clock_of(&events) else {
            continue;
        };
        for event in &events {
            if let Event::NoteSpawned {
                note,
                target_time_secs,
                ..
            } = event
            {
                spawned_at.push((*note, now, *target_time_secs));
            }
        }
        if now >= 4.5 {
            break;
        }
    }

    assert_eq!(spawned_at.len(), notes.len());
    for (_, now, target) in &spawned_at {
        let deadline = target - travel;
        assert!(*now >= deadline - 1e-9, "spawned early at {now} for {target}");
        assert!(
            *now < deadline + TICK.as_secs_f64() + 1e-9,
            "spawned late at {now} for {target}"
        );
    }
    assert_eq!(spawning.pending(session), 0);
}

#[test]
fn notes_cross_the_hit_line_on_their_target_time() {
    let mut world = World::new();
    let mut spawning = Spawning::new();
    let _ = start_session(
        &mut world,
        &mut spawning,
        vec![Note::tap(LaneIndex::new(3), 2.0)],
    );

    loop {
        let events = step(&mut world, &mut spawning, vec![Command::Tick { dt: TICK }]);
        if clock_of(&events).is_some_and(|now| now >= 2.0) {
            break;
        }
    }

    let view = query::active_notes(&world);
    let note = view.iter().next().expect("note in flight");
    assert_eq!(note.id, NoteId::new(0));
    let overshoot = TICK.as_secs_f64() / 1.2;
    assert!(note.progress >= 1.0 - 1e-9 && note.progress <= 1.0 + overshoot + 1e-9);
    let hit = query::lane_layout(&world)
        .lane(LaneIndex::new(3))
        .map(|lane| lane.hit)
        .expect("lane geometry");
    assert!((note.position.x - hit.x).abs() < 1e-9);
    assert!(note.position.y >= hit.y - 1e-6);
}

#[test]
fn ended_sessions_cancel_pending_spawns() {
    let mut world = World::new();
    let mut spawning = Spawning::new();
    let session = start_session(
        &mut world,
        &mut spawning,
        vec![
            Note::tap(LaneIndex::new(0), 3.0),
            Note::tap(LaneIndex::new(1), 5.0),
        ],
    );
    assert_eq!(spawning.pending(session), 2);

    for _ in 0..30 {
        let _ = step(&mut world, &mut spawning, vec![Command::Tick { dt: TICK }]);
    }
    let events = step(&mut world, &mut spawning, vec![Command::AbortEncounter { session }]);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::SessionEnded { .. })));
    assert_eq!(spawning.pending(session), 0);

    let events = step(&mut world, &mut spawning, vec![Command::Tick { dt: TICK }]);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::NoteSpawned { .. })));
}
