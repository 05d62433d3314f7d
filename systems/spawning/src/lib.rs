#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Note scheduling system that spawns notes ahead of their target times.
//!
//! A note must appear exactly one travel time before it is due so that it
//! crosses the hit line on the beat. The system keeps a deadline queue per
//! session and releases every note whose deadline the session clock has
//! reached. Queues are discarded when their session ends, so no note is
//! ever spawned into a finished session.

use std::collections::{BTreeMap, VecDeque};

use log::{debug, warn};
use rhythm_combat_core::{ChartEntry, Command, Event, NoteId, SessionId};

/// Pure system that emits [`Command::SpawnNote`] as spawn deadlines pass.
#[derive(Debug, Default)]
pub struct Spawning {
    schedules: BTreeMap<SessionId, VecDeque<SpawnDeadline>>,
}

#[derive(Clone, Copy, Debug)]
struct SpawnDeadline {
    note: NoteId,
    spawn_at_secs: f64,
}

impl Spawning {
    /// Creates a spawning system with no schedules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes chart, clock and session events to emit spawn commands.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::ChartLoaded {
                    session,
                    notes,
                    travel_secs,
                    ..
                } => self.schedule(*session, notes, travel_secs),
                Event::ClockAdvanced { session, now_secs } => {
                    self.release_due(*session, *now_secs, out);
                }
                Event::SessionEnded { session, .. } => {
                    if let Some(cancelled) = self.schedules.remove(session) {
                        if !cancelled.is_empty() {
                            debug!(
                                "session {session} ended with {} unspawned notes",
                                cancelled.len()
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Number of notes still waiting to spawn for `session`.
    #[must_use]
    pub fn pending(&self, session: SessionId) -> usize {
        self.schedules.get(&session).map_or(0, VecDeque::len)
    }

    fn schedule(&mut self, session: SessionId, notes: &[ChartEntry], travel_secs: &[f64]) {
        let mut deadlines: Vec<SpawnDeadline> = Vec::with_capacity(notes.len());
        for entry in notes {
            let Some(travel) = travel_secs.get(entry.note.lane().index()) else {
                warn!(
                    "session {session}: note {} has no travel time for lane {}",
                    entry.id.get(),
                    entry.note.lane().get()
                );
                continue;
            };
            deadlines.push(SpawnDeadline {
                note: entry.id,
                spawn_at_secs: entry.note.target_time_secs() - travel,
            });
        }
        deadlines.sort_by(|a, b| {
            a.spawn_at_secs
                .total_cmp(&b.spawn_at_secs)
                .then_with(|| a.note.cmp(&b.note))
        });
        let _ = self.schedules.insert(session, deadlines.into());
    }

    fn release_due(&mut self, session: SessionId, now_secs: f64, out: &mut Vec<Command>) {
        let Some(queue) = self.schedules.get_mut(&session) else {
            return;
        };
        while let Some(deadline) = queue.front().copied() {
            if deadline.spawn_at_secs > now_secs {
                break;
            }
            let _ = queue.pop_front();
            out.push(Command::SpawnNote {
                session,
                note: deadline.note,
            });
        }
    }
}
