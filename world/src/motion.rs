use rhythm_combat_core::{LaneGeometry, Note, Point2};

/// Note travelling from its spawn point toward the hit line.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ActiveNote {
    pub(crate) note: Note,
    pub(crate) spawn_time_secs: f64,
    pub(crate) travel_secs: f64,
    pub(crate) progress: f64,
    pub(crate) position: Point2,
}

impl ActiveNote {
    /// Starts a note so that it reaches the hit line exactly at its target time.
    pub(crate) fn launch(note: Note, travel_secs: f64, geometry: &LaneGeometry, now_secs: f64) -> Self {
        let mut active = Self {
            note,
            spawn_time_secs: note.target_time_secs() - travel_secs,
            travel_secs,
            progress: 0.0,
            position: geometry.spawn,
        };
        active.advance(now_secs, geometry);
        active
    }

    pub(crate) fn advance(&mut self, now_secs: f64, geometry: &LaneGeometry) {
        self.progress = progress_at(now_secs, self.spawn_time_secs, self.travel_secs);
        self.position = geometry.point_at(self.progress);
    }
}

/// Progress is never negative but may exceed one once the note overshoots.
fn progress_at(now_secs: f64, spawn_time_secs: f64, travel_secs: f64) -> f64 {
    if travel_secs <= 0.0 {
        return if now_secs >= spawn_time_secs { 1.0 } else { 0.0 };
    }
    ((now_secs - spawn_time_secs) / travel_secs).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::{progress_at, ActiveNote};
    use rhythm_combat_core::{LaneIndex, LaneLayout, Note};

    #[test]
    fn note_reaches_hit_line_at_target_time() {
        let layout = LaneLayout::default();
        let geometry = layout.lane(LaneIndex::new(0)).copied().expect("lane");
        let mut active = ActiveNote::launch(Note::tap(LaneIndex::new(0), 3.0), 1.2, &geometry, 1.8);
        assert!(active.progress.abs() < 1e-9);
        active.advance(3.0, &geometry);
        assert!((active.progress - 1.0).abs() < 1e-9);
        assert!((active.position.y - geometry.hit.y).abs() < 1e-6);
    }

    #[test]
    fn progress_is_clamped_below_but_not_above() {
        assert_eq!(progress_at(0.0, 1.0, 2.0), 0.0);
        assert!((progress_at(5.0, 1.0, 2.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_travel_time_snaps_to_hit_line() {
        assert_eq!(progress_at(1.0, 1.0, 0.0), 1.0);
        assert_eq!(progress_at(0.5, 1.0, 0.0), 0.0);
    }
}
