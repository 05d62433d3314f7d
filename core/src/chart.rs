use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{LaneIndex, NoteId};

/// Single scheduled note within a chart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    lane: LaneIndex,
    target_time_secs: f64,
    hold_secs: f64,
}

impl Note {
    /// Creates a tap note that should be hit at `target_time_secs`.
    #[must_use]
    pub const fn tap(lane: LaneIndex, target_time_secs: f64) -> Self {
        Self {
            lane,
            target_time_secs,
            hold_secs: 0.0,
        }
    }

    /// Creates a note that must be held for `hold_secs` after being hit.
    #[must_use]
    pub fn hold(lane: LaneIndex, target_time_secs: f64, hold_secs: f64) -> Self {
        Self {
            lane,
            target_time_secs,
            hold_secs: hold_secs.max(0.0),
        }
    }

    /// Lane the note travels in.
    #[must_use]
    pub const fn lane(&self) -> LaneIndex {
        self.lane
    }

    /// Song time at which the note should be hit.
    #[must_use]
    pub const fn target_time_secs(&self) -> f64 {
        self.target_time_secs
    }

    /// Length of the hold in seconds, zero for tap notes.
    #[must_use]
    pub const fn hold_secs(&self) -> f64 {
        self.hold_secs
    }

    /// Reports whether the note is a hold.
    #[must_use]
    pub fn is_hold(&self) -> bool {
        self.hold_secs > 0.0
    }

    /// Moves the note to another lane.
    #[must_use]
    pub fn in_lane(mut self, lane: LaneIndex) -> Self {
        self.lane = lane;
        self
    }

    /// Moves the note to another target time.
    #[must_use]
    pub fn at(mut self, target_time_secs: f64) -> Self {
        self.target_time_secs = target_time_secs;
        self
    }

    /// Ordering by target time, then by lane.
    #[must_use]
    pub fn chronological(&self, other: &Self) -> Ordering {
        self.target_time_secs
            .total_cmp(&other.target_time_secs)
            .then_with(|| self.lane.cmp(&other.lane))
    }
}

/// Note paired with the identifier assigned by its chart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    /// Identifier of the note, unique within its chart.
    pub id: NoteId,
    /// Scheduled note.
    pub note: Note,
}

/// Explains how a chart came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartOrigin {
    /// Produced by the procedural generator.
    Generated {
        /// Seed the generator ran with.
        seed: u64,
    },
    /// Evenly spaced fallback used when generation is not possible.
    Fallback,
}

/// Counters describing what the generator did while building a chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartStats {
    /// Grid positions inside the playable window.
    pub grid_slots: u32,
    /// Grid positions that received at least one note.
    pub filled_slots: u32,
    /// Plain single notes.
    pub singles: u32,
    /// Single notes repeating the previous lane.
    pub jacks: u32,
    /// Bursts started.
    pub bursts: u32,
    /// Chords placed.
    pub chords: u32,
    /// Notes promoted to holds.
    pub holds: u32,
    /// Notes moved to another lane to honour lane spacing.
    pub relocated: u32,
    /// Notes delayed within their lane to honour lane spacing.
    pub delayed: u32,
    /// Notes discarded because they no longer fit inside the window.
    pub dropped: u32,
}

/// Time-ordered list of notes covering a playable window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    notes: Vec<Note>,
    start_secs: f64,
    end_secs: f64,
    origin: ChartOrigin,
    stats: ChartStats,
}

impl Chart {
    /// Fallback length used when neither the chart nor the track has one.
    pub const FALLBACK_DURATION_SECS: f64 = 15.0;
    /// Notes per second placed by the fallback chart.
    pub const FALLBACK_NOTES_PER_SEC: f64 = 1.5;

    /// Assembles a chart, sorting the notes by target time and lane.
    #[must_use]
    pub fn new(
        mut notes: Vec<Note>,
        start_secs: f64,
        end_secs: f64,
        origin: ChartOrigin,
        stats: ChartStats,
    ) -> Self {
        notes.sort_by(Note::chronological);
        Self {
            notes,
            start_secs,
            end_secs: end_secs.max(start_secs),
            origin,
            stats,
        }
    }

    /// Builds the evenly spaced chart used when generation fails.
    ///
    /// Notes are placed at a constant rate across the window and cycle
    /// through the lanes in order.
    #[must_use]
    pub fn fallback(duration_secs: Option<f64>, start_secs: f64, lane_count: usize) -> Self {
        let duration = duration_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .unwrap_or(Self::FALLBACK_DURATION_SECS);
        let lanes = lane_count.clamp(1, usize::from(u8::MAX));
        let count = (duration * Self::FALLBACK_NOTES_PER_SEC).round() as usize;
        let step = if count == 0 { 0.0 } else { duration / count as f64 };

        let notes = (0..count)
            .map(|index| {
                let lane = LaneIndex::new((index % lanes) as u8);
                Note::tap(lane, start_secs + (index + 1) as f64 * step)
            })
            .collect();

        Self::new(
            notes,
            start_secs,
            start_secs + duration,
            ChartOrigin::Fallback,
            ChartStats::default(),
        )
    }

    /// Notes in chronological order.
    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Number of notes in the chart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Reports whether the chart contains no notes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Earliest time a note may be scheduled.
    #[must_use]
    pub const fn start_secs(&self) -> f64 {
        self.start_secs
    }

    /// Latest time a note may be scheduled.
    #[must_use]
    pub const fn end_secs(&self) -> f64 {
        self.end_secs
    }

    /// Length of the playable window.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// How the chart was produced.
    #[must_use]
    pub const fn origin(&self) -> ChartOrigin {
        self.origin
    }

    /// Generator counters, all zero for fallback charts.
    #[must_use]
    pub const fn stats(&self) -> ChartStats {
        self.stats
    }

    /// Iterates the notes together with their chart-local identifiers.
    pub fn entries(&self) -> impl Iterator<Item = ChartEntry> + '_ {
        self.notes.iter().enumerate().map(|(index, note)| ChartEntry {
            id: NoteId::new(index as u32),
            note: *note,
        })
    }
}
