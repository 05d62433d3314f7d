#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Input judgment system that turns lane presses and elapsed time into
//! note resolutions.
//!
//! A press is matched against the nearest travelling note in its lane. The
//! signed timing error selects the judgment, and presses too far from any
//! note are ignored. Notes left unhit past their expiry are judged as
//! misses on the next clock advance.

use std::collections::HashSet;

use log::debug;
use rhythm_combat_core::{
    ActiveNoteSnapshot, ActiveNoteView, Command, Event, Judgment, JudgmentWindows, LaneIndex,
    NoteId, SessionId,
};

/// Pure system that emits [`Command::ResolveNote`] for presses and timeouts.
#[derive(Debug, Default)]
pub struct InputJudgment {
    claimed: HashSet<NoteId>,
}

impl InputJudgment {
    /// Creates a judgment system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes press and clock events against the travelling notes.
    ///
    /// `windows` are the timing windows of the live encounter; without them
    /// nothing can be judged and the batch is skipped.
    pub fn handle(
        &mut self,
        events: &[Event],
        notes: &ActiveNoteView,
        windows: Option<&JudgmentWindows>,
        out: &mut Vec<Command>,
    ) {
        self.claimed.clear();
        let Some(windows) = windows else {
            return;
        };

        for event in events {
            match event {
                Event::LanePressed {
                    session,
                    lane,
                    at_secs,
                } => self.judge_press(*session, *lane, *at_secs, notes, windows, out),
                Event::ClockAdvanced { session, now_secs } => {
                    self.expire(*session, *now_secs, notes, windows, out);
                }
                _ => {}
            }
        }
    }

    fn judge_press(
        &mut self,
        session: SessionId,
        lane: LaneIndex,
        at_secs: f64,
        notes: &ActiveNoteView,
        windows: &JudgmentWindows,
        out: &mut Vec<Command>,
    ) {
        let nearest = notes
            .in_lane(lane)
            .filter(|note| note.session == session && !self.claimed.contains(&note.id))
            .min_by(|a, b| {
                (at_secs - a.target_time_secs)
                    .abs()
                    .total_cmp(&(at_secs - b.target_time_secs).abs())
            });
        let Some(note) = nearest else {
            debug!("press on lane {} found no note", lane.get());
            return;
        };

        let delta_ms = (at_secs - note.target_time_secs) * 1000.0;
        match windows.judge_press(delta_ms) {
            Some(judgment) => self.resolve(note, judgment, delta_ms, out),
            None => debug!(
                "press on lane {} is {delta_ms:.1} ms from the nearest note, ignored",
                lane.get()
            ),
        }
    }

    fn expire(
        &mut self,
        session: SessionId,
        now_secs: f64,
        notes: &ActiveNoteView,
        windows: &JudgmentWindows,
        out: &mut Vec<Command>,
    ) {
        let expiry_secs = windows.expiry_secs();
        let expired: Vec<&ActiveNoteSnapshot> = notes
            .iter()
            .filter(|note| {
                note.session == session
                    && !self.claimed.contains(&note.id)
                    && now_secs - note.target_time_secs > expiry_secs
            })
            .collect();
        for note in expired {
            let delta_ms = (now_secs - note.target_time_secs) * 1000.0;
            self.resolve(note, Judgment::Miss, delta_ms, out);
        }
    }

    fn resolve(
        &mut self,
        note: &ActiveNoteSnapshot,
        judgment: Judgment,
        delta_ms: f64,
        out: &mut Vec<Command>,
    ) {
        let _ = self.claimed.insert(note.id);
        out.push(Command::ResolveNote {
            session: note.session,
            note: note.id,
            judgment,
            delta_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhythm_combat_core::Point2;

    const SESSION: SessionId = SessionId::new(1);

    fn view(notes: &[(u32, u8, f64)]) -> ActiveNoteView {
        ActiveNoteView::from_snapshots(
            notes
                .iter()
                .map(|(id, lane, target)| ActiveNoteSnapshot {
                    session: SESSION,
                    id: NoteId::new(*id),
                    lane: LaneIndex::new(*lane),
                    target_time_secs: *target,
                    hold_secs: 0.0,
                    progress: 0.5,
                    position: Point2::default(),
                })
                .collect(),
        )
    }

    fn press(lane: u8, at_secs: f64) -> Event {
        Event::LanePressed {
            session: SESSION,
            lane: LaneIndex::new(lane),
            at_secs,
        }
    }

    fn resolutions(commands: &[Command]) -> Vec<(u32, Judgment)> {
        commands
            .iter()
            .filter_map(|command| match command {
                Command::ResolveNote { note, judgment, .. } => Some((note.get(), *judgment)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn press_inside_perfect_window_is_perfect() {
        let mut judgment = InputJudgment::new();
        let mut commands = Vec::new();
        judgment.handle(
            &[press(0, 2.0 - 0.020)],
            &view(&[(0, 0, 2.0)]),
            Some(&JudgmentWindows::DEFAULT),
            &mut commands,
        );
        assert_eq!(resolutions(&commands), vec![(0, Judgment::Perfect)]);
        let Some(Command::ResolveNote { delta_ms, .. }) = commands.first() else {
            panic!("expected a resolution");
        };
        assert!((delta_ms + 20.0).abs() < 1e-6);
    }

    #[test]
    fn far_presses_change_nothing() {
        let mut judgment = InputJudgment::new();
        let mut commands = Vec::new();
        judgment.handle(
            &[press(0, 1.8)],
            &view(&[(0, 0, 2.0)]),
            Some(&JudgmentWindows::DEFAULT),
            &mut commands,
        );
        assert!(commands.is_empty());
    }

    #[test]
    fn press_picks_the_nearest_note_in_its_lane() {
        let mut judgment = InputJudgment::new();
        let mut commands = Vec::new();
        judgment.handle(
            &[press(1, 2.46)],
            &view(&[(0, 1, 2.0), (1, 1, 2.5), (2, 0, 2.46)]),
            Some(&JudgmentWindows::DEFAULT),
            &mut commands,
        );
        assert_eq!(resolutions(&commands), vec![(1, Judgment::Good)]);
    }

    #[test]
    fn a_note_is_claimed_by_one_press_only() {
        let mut judgment = InputJudgment::new();
        let mut commands = Vec::new();
        judgment.handle(
            &[press(0, 2.0), press(0, 2.01)],
            &view(&[(0, 0, 2.0)]),
            Some(&JudgmentWindows::DEFAULT),
            &mut commands,
        );
        assert_eq!(resolutions(&commands), vec![(0, Judgment::Perfect)]);
    }

    #[test]
    fn expired_notes_become_misses() {
        let mut judgment = InputJudgment::new();
        let mut commands = Vec::new();
        judgment.handle(
            &[Event::ClockAdvanced {
                session: SESSION,
                now_secs: 2.1,
            }],
            &view(&[(0, 0, 2.0), (1, 1, 2.05)]),
            Some(&JudgmentWindows::DEFAULT),
            &mut commands,
        );
        assert_eq!(resolutions(&commands), vec![(0, Judgment::Miss)]);
    }

    #[test]
    fn bad_band_delays_expiry_and_judges_late_presses() {
        let windows = JudgmentWindows::DEFAULT.with_bad_margin(Some(60.0));
        let mut judgment = InputJudgment::new();
        let mut commands = Vec::new();
        judgment.handle(
            &[
                Event::ClockAdvanced {
                    session: SESSION,
                    now_secs: 2.12,
                },
                press(0, 2.12),
            ],
            &view(&[(0, 0, 2.0)]),
            Some(&windows),
            &mut commands,
        );
        assert_eq!(resolutions(&commands), vec![(0, Judgment::Bad)]);
    }

    #[test]
    fn notes_of_other_sessions_are_left_alone() {
        let mut judgment = InputJudgment::new();
        let mut commands = Vec::new();
        judgment.handle(
            &[Event::LanePressed {
                session: SessionId::new(2),
                lane: LaneIndex::new(0),
                at_secs: 2.0,
            }],
            &view(&[(0, 0, 2.0)]),
            Some(&JudgmentWindows::DEFAULT),
            &mut commands,
        );
        assert!(commands.is_empty());
    }
}
