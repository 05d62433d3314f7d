use rhythm_combat_core::{ChartStats, LaneIndex, Note};

/// Tolerance for floating point drift when comparing note times.
const TIME_EPSILON: f64 = 1e-9;

/// Rewrites `notes` so that no lane receives a note before the previous one
/// in that lane (including its hold) plus `min_spacing_secs` has passed.
///
/// Conflicting notes move to the lowest free lane. When every lane is busy
/// the note is delayed within its own lane, and dropped if the delay pushes
/// it past `end_secs`. The result is sorted by time and lane.
pub(crate) fn enforce_lane_spacing(
    notes: &mut Vec<Note>,
    lane_count: usize,
    min_spacing_secs: f64,
    end_secs: f64,
    stats: &mut ChartStats,
) {
    notes.sort_by(Note::chronological);
    let mut free_at: Vec<f64> = vec![f64::NEG_INFINITY; lane_count];
    let mut kept = Vec::with_capacity(notes.len());

    for note in notes.drain(..) {
        let time = note.target_time_secs();
        let lane = note.lane().index();
        let fits = |lane: usize| free_at.get(lane).is_some_and(|free| time + TIME_EPSILON >= *free);

        let placed = if fits(lane) {
            note
        } else if let Some(other) = (0..lane_count).find(|candidate| fits(*candidate)) {
            stats.relocated += 1;
            note.in_lane(LaneIndex::new(other as u8))
        } else {
            let Some(delayed) = free_at.get(lane).copied() else {
                stats.dropped += 1;
                continue;
            };
            if delayed > end_secs + TIME_EPSILON {
                stats.dropped += 1;
                continue;
            }
            stats.delayed += 1;
            note.at(delayed.min(end_secs))
        };

        if let Some(slot) = free_at.get_mut(placed.lane().index()) {
            *slot = placed.target_time_secs() + placed.hold_secs() + min_spacing_secs;
        }
        kept.push(placed);
    }

    kept.sort_by(Note::chronological);
    *notes = kept;
}

#[cfg(test)]
mod tests {
    use super::enforce_lane_spacing;
    use rhythm_combat_core::{ChartStats, LaneIndex, Note};

    fn lanes_and_times(notes: &[Note]) -> Vec<(u8, f64)> {
        notes
            .iter()
            .map(|note| (note.lane().get(), note.target_time_secs()))
            .collect()
    }

    #[test]
    fn crowded_lane_relocates_to_a_free_one() {
        let mut notes = vec![
            Note::tap(LaneIndex::new(0), 1.0),
            Note::tap(LaneIndex::new(0), 1.1),
        ];
        let mut stats = ChartStats::default();
        enforce_lane_spacing(&mut notes, 4, 0.2, 10.0, &mut stats);
        assert_eq!(lanes_and_times(&notes), vec![(0, 1.0), (1, 1.1)]);
        assert_eq!(stats.relocated, 1);
    }

    #[test]
    fn single_lane_conflicts_are_delayed() {
        let mut notes = vec![
            Note::tap(LaneIndex::new(0), 1.0),
            Note::tap(LaneIndex::new(0), 1.05),
        ];
        let mut stats = ChartStats::default();
        enforce_lane_spacing(&mut notes, 1, 0.2, 10.0, &mut stats);
        assert_eq!(notes.len(), 2);
        assert!((notes[1].target_time_secs() - 1.2).abs() < 1e-9);
        assert_eq!(stats.delayed, 1);
    }

    #[test]
    fn delays_past_the_window_drop_the_note() {
        let mut notes = vec![
            Note::tap(LaneIndex::new(0), 9.9),
            Note::tap(LaneIndex::new(0), 9.95),
        ];
        let mut stats = ChartStats::default();
        enforce_lane_spacing(&mut notes, 1, 0.2, 10.0, &mut stats);
        assert_eq!(notes.len(), 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn holds_keep_their_lane_busy() {
        let mut notes = vec![
            Note::hold(LaneIndex::new(0), 1.0, 0.5),
            Note::tap(LaneIndex::new(0), 1.4),
        ];
        let mut stats = ChartStats::default();
        enforce_lane_spacing(&mut notes, 2, 0.2, 10.0, &mut stats);
        assert_eq!(lanes_and_times(&notes), vec![(0, 1.0), (1, 1.4)]);
    }
}
