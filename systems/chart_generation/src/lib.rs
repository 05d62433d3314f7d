#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic procedural chart generation system.
//!
//! Charts are laid out on a beat grid derived from the track tempo and the
//! finest subdivision the difficulty profile enables. Each grid slot is
//! filled with a probability that grows with density, and a filled slot may
//! turn into a single note, a jack, a burst or a chord. A final pass keeps
//! notes of the same lane apart and the result is sorted by time.

mod catalog;
mod spacing;

use log::{debug, warn};
use rand::{seq::index::sample, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rhythm_combat_core::{
    Chart, ChartOrigin, ChartStats, Command, DifficultyProfile, Event, LaneIndex, Note,
    SessionId, Track, TrackError, TrackId,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use catalog::{CatalogEntry, TrackCatalog};

/// Most lanes a chart can address.
const MAX_LANES: usize = u8::MAX as usize + 1;

/// Slots of drift from the target fill at which the quota overrides the
/// random draw. The realised fill stays strictly within one more slot.
const MAX_FILL_DRIFT: f64 = 1.0;

/// Fraction of a grid step that randomness may shift a note by.
const JITTER_SCALE: f64 = 0.25;

/// Pure system that answers chart requests with [`Command::LoadChart`].
#[derive(Debug)]
pub struct ChartGeneration {
    global_seed: u64,
}

impl ChartGeneration {
    /// Creates a chart generation system rooted at the provided seed.
    #[must_use]
    pub const fn new(global_seed: u64) -> Self {
        Self { global_seed }
    }

    /// Consumes `ChartRequested` events and emits a chart for each one.
    ///
    /// Tracks that cannot be generated from fall back to an evenly spaced
    /// chart so the session can always proceed.
    pub fn handle(&mut self, events: &[Event], lane_count: usize, out: &mut Vec<Command>) {
        for event in events {
            let Event::ChartRequested {
                session,
                track,
                profile,
            } = event
            else {
                continue;
            };

            let seed = derive_session_seed(self.global_seed, *session, track.id());
            let chart = match generate(track, profile, lane_count, seed) {
                Ok(chart) => {
                    debug!(
                        "session {session}: generated {} notes from track {} ({:?})",
                        chart.len(),
                        track.id(),
                        chart.stats()
                    );
                    chart
                }
                Err(error) => {
                    warn!("session {session}: {error}, using fallback chart");
                    Chart::fallback(
                        track.effective_duration_secs(),
                        track.beat_offset_secs(),
                        lane_count,
                    )
                }
            };
            out.push(Command::LoadChart {
                session: *session,
                chart,
            });
        }
    }
}

/// Reasons chart generation cannot proceed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ChartError {
    /// The track itself is unusable.
    #[error(transparent)]
    Track(#[from] TrackError),
    /// The arena has no lanes to place notes in.
    #[error("cannot generate a chart without lanes")]
    NoLanes,
}

/// Generates a chart for `track` shaped by `profile`.
///
/// The same inputs and seed always produce the same chart. Every note lands
/// inside `[offset, offset + duration]` of the track, in a lane below
/// `lane_count`, and never closer than the profile's minimum spacing to the
/// previous note of its lane.
pub fn generate(
    track: &Track,
    profile: &DifficultyProfile,
    lane_count: usize,
    seed: u64,
) -> Result<Chart, ChartError> {
    let duration_secs = track.validate()?;
    if lane_count == 0 {
        return Err(ChartError::NoLanes);
    }

    let beat_secs = track.beat_secs();
    let grid_step = beat_secs * profile.subdivisions().finest_beat_fraction();
    let start_secs = track.beat_offset_secs();
    let end_secs = start_secs + duration_secs;

    let mut composer = Composer {
        profile,
        rng: ChaCha8Rng::seed_from_u64(seed),
        lane_count: lane_count.min(MAX_LANES),
        beat_secs,
        grid_step,
        start_secs,
        end_secs,
        notes: Vec::new(),
        stats: ChartStats::default(),
        previous_lane: None,
    };
    let mut quota = FillQuota::new(profile.fill_rate());

    let mut slot: u32 = 0;
    loop {
        let time = start_secs + f64::from(slot) * grid_step;
        if time >= end_secs {
            break;
        }
        composer.stats.grid_slots += 1;
        let drawn = composer.rng.gen_bool(quota.rate);
        if quota.admit(slot, drawn) {
            composer.stats.filled_slots += 1;
            composer.fill_slot(time);
        }
        slot += 1;
    }

    let Composer {
        mut notes,
        mut stats,
        lane_count,
        ..
    } = composer;
    spacing::enforce_lane_spacing(
        &mut notes,
        lane_count,
        profile.min_lane_spacing_secs(),
        end_secs,
        &mut stats,
    );
    let notes = notes
        .into_iter()
        .map(|note| {
            let room = (end_secs - note.target_time_secs()).max(0.0);
            Note::hold(note.lane(), note.target_time_secs(), note.hold_secs().min(room))
        })
        .collect();

    Ok(Chart::new(
        notes,
        start_secs,
        end_secs,
        ChartOrigin::Generated { seed },
        stats,
    ))
}

/// Keeps the number of filled slots within a small drift of the target rate
/// while leaving the choice of individual slots to the random draw.
#[derive(Debug)]
struct FillQuota {
    rate: f64,
    filled: u32,
}

impl FillQuota {
    fn new(rate: f64) -> Self {
        Self {
            rate: probability(rate),
            filled: 0,
        }
    }

    fn admit(&mut self, slot: u32, drawn: bool) -> bool {
        let expected = self.rate * f64::from(slot + 1);
        let filled = f64::from(self.filled);
        let admit = if filled + 1.0 <= expected - MAX_FILL_DRIFT {
            true
        } else if filled >= expected + MAX_FILL_DRIFT {
            false
        } else {
            drawn
        };
        if admit {
            self.filled += 1;
        }
        admit
    }
}

/// Working state while notes are laid out on the grid.
struct Composer<'a> {
    profile: &'a DifficultyProfile,
    rng: ChaCha8Rng,
    lane_count: usize,
    beat_secs: f64,
    grid_step: f64,
    start_secs: f64,
    end_secs: f64,
    notes: Vec<Note>,
    stats: ChartStats,
    previous_lane: Option<usize>,
}

impl Composer<'_> {
    fn fill_slot(&mut self, time: f64) {
        let patterns = self.profile.patterns();
        let lane = self.rng.gen_range(0..self.lane_count);

        if self.previous_lane == Some(lane) && self.rng.gen_bool(probability(patterns.jack)) {
            self.stats.jacks += 1;
            let time = self.jitter(time);
            self.place_single(lane, time);
        } else if self.rng.gen_bool(probability(patterns.burst)) {
            self.place_burst(lane, time);
        } else if self.lane_count > 1 && self.rng.gen_bool(probability(patterns.chord)) {
            self.place_chord(time);
        } else {
            self.stats.singles += 1;
            let time = self.jitter(time);
            self.place_single(lane, time);
        }
    }

    fn place_single(&mut self, lane: usize, time: f64) {
        let holds = self.profile.holds();
        let promote = holds.duration_beats > 0.0 && self.rng.gen_bool(probability(holds.chance));
        let hold_secs = if promote {
            self.stats.holds += 1;
            holds.duration_beats * self.beat_secs
        } else {
            0.0
        };
        self.notes.push(Note::hold(lane_index(lane), time, hold_secs));
        self.previous_lane = Some(lane);
    }

    fn place_burst(&mut self, first_lane: usize, time: f64) {
        self.stats.bursts += 1;
        let length = self.rng.gen_range(3..=5_u32);
        let step = self.profile.burst_step_secs();
        let mut lane = first_lane;
        for index in 0..length {
            let at = time + f64::from(index) * step;
            if at > self.end_secs {
                break;
            }
            if index > 0 {
                lane = self.rng.gen_range(0..self.lane_count);
            }
            self.notes.push(Note::tap(lane_index(lane), at));
        }
        self.previous_lane = Some(lane);
    }

    fn place_chord(&mut self, time: f64) {
        self.stats.chords += 1;
        let size = self.rng.gen_range(2..=3_usize).min(self.lane_count);
        for lane in sample(&mut self.rng, self.lane_count, size).iter() {
            self.notes.push(Note::tap(lane_index(lane), time));
        }
        self.previous_lane = None;
    }

    fn jitter(&mut self, time: f64) -> f64 {
        let amplitude = self.profile.randomness() * self.grid_step * JITTER_SCALE;
        let offset = self.rng.gen_range(-1.0_f64..=1.0) * amplitude;
        (time + offset).clamp(self.start_secs, self.end_secs)
    }
}

fn probability(chance: f64) -> f64 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}

fn lane_index(lane: usize) -> LaneIndex {
    LaneIndex::new(u8::try_from(lane).unwrap_or(u8::MAX))
}

fn derive_session_seed(global_seed: u64, session: SessionId, track: &TrackId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(session.get().to_le_bytes());
    hasher.update(track.as_str().as_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::{derive_session_seed, generate, ChartError, ChartGeneration, FillQuota};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rhythm_combat_core::{
        ChartOrigin, Command, Density, DifficultyProfile, Event, SessionId, Track, TrackError,
        TrackId,
    };

    fn track() -> Track {
        Track::new(TrackId::new("pulse"), 120.0, 10.0)
    }

    #[test]
    fn fill_quota_stays_close_to_rate() {
        let mut always = FillQuota::new(0.3);
        let filled = (0..100).filter(|slot| always.admit(*slot, true)).count();
        assert!((29..=32).contains(&filled), "filled {filled}");

        let mut never = FillQuota::new(0.95);
        let filled = (0..100).filter(|slot| never.admit(*slot, false)).count();
        assert!((93..=96).contains(&filled), "filled {filled}");
    }

    #[test]
    fn fill_quota_never_drifts_two_slots() {
        for rate in [0.3, 0.5, 0.72, 0.95] {
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let mut quota = FillQuota::new(rate);
            for slot in 0..400_u32 {
                let _ = quota.admit(slot, rng.gen_bool(0.5));
                let drift = f64::from(quota.filled) - rate * f64::from(slot + 1);
                assert!(drift.abs() < 2.0, "rate {rate} slot {slot} drift {drift}");
            }
        }
    }

    #[test]
    fn generation_is_reproducible() {
        let profile = DifficultyProfile::for_density(Density::new(8));
        let first = generate(&track(), &profile, 4, 99);
        let second = generate(&track(), &profile, 4, 99);
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_produce_different_charts() {
        let profile = DifficultyProfile::for_density(Density::new(8));
        let first = generate(&track(), &profile, 4, 1).map(|chart| chart.notes().to_vec());
        let second = generate(&track(), &profile, 4, 2).map(|chart| chart.notes().to_vec());
        assert_ne!(first, second);
    }

    #[test]
    fn lane_count_of_zero_is_an_error() {
        let profile = DifficultyProfile::default();
        assert_eq!(generate(&track(), &profile, 0, 1), Err(ChartError::NoLanes));
    }

    #[test]
    fn invalid_tempo_propagates_track_error() {
        let track = Track::new(TrackId::new("broken"), -5.0, 10.0);
        let result = generate(&track, &DifficultyProfile::default(), 4, 1);
        assert!(matches!(
            result,
            Err(ChartError::Track(TrackError::InvalidTempo { .. }))
        ));
    }

    #[test]
    fn session_seeds_differ_per_session_and_track() {
        let base = derive_session_seed(7, SessionId::new(1), &TrackId::new("a"));
        assert_ne!(base, derive_session_seed(7, SessionId::new(2), &TrackId::new("a")));
        assert_ne!(base, derive_session_seed(7, SessionId::new(1), &TrackId::new("b")));
        assert_eq!(base, derive_session_seed(7, SessionId::new(1), &TrackId::new("a")));
    }

    #[test]
    fn missing_audio_falls_back_to_default_chart() {
        let mut system = ChartGeneration::new(3);
        let events = vec![Event::ChartRequested {
            session: SessionId::new(1),
            track: Track::without_audio(TrackId::new("silent"), 120.0),
            profile: DifficultyProfile::default(),
        }];
        let mut commands = Vec::new();
        system.handle(&events, 4, &mut commands);

        let [Command::LoadChart { session, chart }] = commands.as_slice() else {
            panic!("expected a single chart, got {commands:?}");
        };
        assert_eq!(*session, SessionId::new(1));
        assert_eq!(chart.origin(), ChartOrigin::Fallback);
        assert_eq!(chart.len(), 23);
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut system = ChartGeneration::new(3);
        let mut commands = Vec::new();
        system.handle(
            &[Event::IntroStarted {
                session: SessionId::new(1),
                intro_secs: 1.0,
            }],
            4,
            &mut commands,
        );
        assert!(commands.is_empty());
    }
}
