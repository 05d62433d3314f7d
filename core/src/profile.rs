use serde::{Deserialize, Serialize};

/// Note density on a one to ten scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Density(u8);

impl Density {
    /// Sparsest supported density.
    pub const MIN: Self = Self(1);
    /// Densest supported density.
    pub const MAX: Self = Self(10);

    /// Creates a density, clamping the value into the supported range.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value < Self::MIN.0 {
            Self::MIN
        } else if value > Self::MAX.0 {
            Self::MAX
        } else {
            Self(value)
        }
    }

    /// Retrieves the underlying density value.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Position of the density within its range, from `0.0` at the minimum to
    /// `1.0` at the maximum.
    #[must_use]
    pub fn progress(&self) -> f64 {
        f64::from(self.0 - Self::MIN.0) / f64::from(Self::MAX.0 - Self::MIN.0)
    }
}

impl Default for Density {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Rhythmic subdivisions that the chart grid may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subdivisions {
    /// One note per beat.
    pub quarter: bool,
    /// Two notes per beat.
    pub eighth: bool,
    /// Four notes per beat.
    pub sixteenth: bool,
    /// Three notes per beat.
    pub triplet: bool,
}

impl Subdivisions {
    /// Only quarter notes enabled.
    pub const QUARTER_ONLY: Self = Self {
        quarter: true,
        eighth: false,
        sixteenth: false,
        triplet: false,
    };

    /// Fraction of a beat covered by the finest enabled subdivision.
    ///
    /// Falls back to a whole beat when nothing is enabled.
    #[must_use]
    pub fn finest_beat_fraction(&self) -> f64 {
        [
            (self.quarter, 1.0),
            (self.eighth, 1.0 / 2.0),
            (self.triplet, 1.0 / 3.0),
            (self.sixteenth, 1.0 / 4.0),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, fraction)| fraction)
        .fold(1.0, f64::min)
    }
}

impl Default for Subdivisions {
    fn default() -> Self {
        Self::QUARTER_ONLY
    }
}

/// Per-slot probabilities for the multi-note patterns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternChances {
    /// Chance that a filled slot starts a short burst of notes.
    pub burst: f64,
    /// Chance that a note repeats the previous lane when the lane roll matches.
    pub jack: f64,
    /// Chance that a filled slot becomes a chord across several lanes.
    pub chord: f64,
}

impl PatternChances {
    /// No multi-note patterns at all.
    pub const NONE: Self = Self {
        burst: 0.0,
        jack: 0.0,
        chord: 0.0,
    };

    fn clamped(self) -> Self {
        Self {
            burst: clamp_probability(self.burst),
            jack: clamp_probability(self.jack),
            chord: clamp_probability(self.chord),
        }
    }
}

/// Controls how often notes become holds and for how long.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldNotes {
    /// Chance that a placed note is promoted to a hold.
    pub chance: f64,
    /// Hold length expressed in beats.
    pub duration_beats: f64,
}

impl HoldNotes {
    /// Holds disabled.
    pub const NONE: Self = Self {
        chance: 0.0,
        duration_beats: 0.0,
    };
}

/// Tunable parameters that shape a generated chart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    density: Density,
    randomness: f64,
    subdivisions: Subdivisions,
    patterns: PatternChances,
    holds: HoldNotes,
    min_lane_spacing_secs: f64,
}

impl DifficultyProfile {
    /// Minimum time between two notes sharing a lane used by the presets.
    pub const DEFAULT_MIN_LANE_SPACING_SECS: f64 = 0.2;

    /// Builds the preset profile for the provided density.
    ///
    /// Finer subdivisions unlock as density grows: eighths from 3, sixteenths
    /// from 5 and triplets from 7. Pattern chances start at zero and scale
    /// linearly with density.
    #[must_use]
    pub fn for_density(density: Density) -> Self {
        let t = density.progress();
        let level = density.get();
        Self {
            density,
            randomness: lerp(0.2, 0.05, t),
            subdivisions: Subdivisions {
                quarter: true,
                eighth: level >= 3,
                sixteenth: level >= 5,
                triplet: level >= 7,
            },
            patterns: PatternChances {
                burst: lerp(0.0, 0.25, t),
                jack: lerp(0.0, 0.15, t),
                chord: lerp(0.0, 0.25, t),
            },
            holds: HoldNotes {
                chance: 0.1,
                duration_beats: 0.5,
            },
            min_lane_spacing_secs: Self::DEFAULT_MIN_LANE_SPACING_SECS,
        }
    }

    /// Replaces the enabled subdivisions.
    #[must_use]
    pub fn with_subdivisions(mut self, subdivisions: Subdivisions) -> Self {
        self.subdivisions = subdivisions;
        self
    }

    /// Replaces the pattern chances, clamping each into `[0, 1]`.
    #[must_use]
    pub fn with_patterns(mut self, patterns: PatternChances) -> Self {
        self.patterns = patterns.clamped();
        self
    }

    /// Replaces the hold configuration.
    #[must_use]
    pub fn with_holds(mut self, holds: HoldNotes) -> Self {
        self.holds = HoldNotes {
            chance: clamp_probability(holds.chance),
            duration_beats: holds.duration_beats.max(0.0),
        };
        self
    }

    /// Replaces the timing jitter factor, clamped into `[0, 1]`.
    #[must_use]
    pub fn with_randomness(mut self, randomness: f64) -> Self {
        self.randomness = clamp_probability(randomness);
        self
    }

    /// Replaces the minimum spacing between notes of the same lane.
    #[must_use]
    pub fn with_min_lane_spacing(mut self, secs: f64) -> Self {
        self.min_lane_spacing_secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self
    }

    /// Density the profile was built for.
    #[must_use]
    pub const fn density(&self) -> Density {
        self.density
    }

    /// Timing jitter applied to grid-aligned notes, as a fraction of a grid step.
    #[must_use]
    pub const fn randomness(&self) -> f64 {
        self.randomness
    }

    /// Enabled grid subdivisions.
    #[must_use]
    pub const fn subdivisions(&self) -> Subdivisions {
        self.subdivisions
    }

    /// Multi-note pattern chances.
    #[must_use]
    pub const fn patterns(&self) -> PatternChances {
        self.patterns
    }

    /// Hold note configuration.
    #[must_use]
    pub const fn holds(&self) -> HoldNotes {
        self.holds
    }

    /// Minimum time between two notes sharing a lane.
    #[must_use]
    pub const fn min_lane_spacing_secs(&self) -> f64 {
        self.min_lane_spacing_secs
    }

    /// Target fraction of grid slots that receive a note.
    #[must_use]
    pub fn fill_rate(&self) -> f64 {
        lerp(0.3, 0.95, self.density.progress())
    }

    /// Time between consecutive notes of a burst, in seconds.
    #[must_use]
    pub fn burst_step_secs(&self) -> f64 {
        let t = self.density.progress();
        let min_interval = 0.12 - 0.06 * t;
        min_interval * lerp(1.0, 0.6, t)
    }
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self::for_density(Density::default())
    }
}

fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub(crate) fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}
