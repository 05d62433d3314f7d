use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::lerp;
use crate::Density;

/// Timing verdict assigned to a single note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Judgment {
    /// Hit inside the tightest window.
    Perfect,
    /// Hit inside the good window.
    Good,
    /// Hit inside the widest scoring window.
    Okay,
    /// Press just outside the scoring windows. Breaks combo and counts as a miss.
    Bad,
    /// Note was never hit.
    Miss,
}

impl Judgment {
    /// Score awarded for the judgment.
    #[must_use]
    pub const fn score(self) -> u32 {
        match self {
            Self::Perfect => 100,
            Self::Good => 75,
            Self::Okay => 50,
            Self::Bad => 5,
            Self::Miss => 0,
        }
    }

    /// Contribution to accuracy, in percent of a perfect hit.
    #[must_use]
    pub const fn accuracy_weight(self) -> u32 {
        match self {
            Self::Perfect => 100,
            Self::Good => 75,
            Self::Okay => 50,
            Self::Bad | Self::Miss => 0,
        }
    }

    /// Reports whether the judgment extends the current combo.
    #[must_use]
    pub const fn is_hit(self) -> bool {
        matches!(self, Self::Perfect | Self::Good | Self::Okay)
    }
}

/// Symmetric timing windows, in milliseconds from the target time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JudgmentWindows {
    perfect_ms: f64,
    good_ms: f64,
    okay_ms: f64,
    #[serde(default)]
    bad_margin_ms: Option<f64>,
}

impl JudgmentWindows {
    /// Windows used at the lowest density.
    pub const DEFAULT: Self = Self {
        perfect_ms: 30.0,
        good_ms: 60.0,
        okay_ms: 90.0,
        bad_margin_ms: None,
    };

    /// Tightest windows reachable at the highest density.
    pub const FLOOR: Self = Self {
        perfect_ms: 10.0,
        good_ms: 25.0,
        okay_ms: 40.0,
        bad_margin_ms: None,
    };

    /// Creates windows, requiring `0 < perfect < good < okay`.
    pub fn new(perfect_ms: f64, good_ms: f64, okay_ms: f64) -> Result<Self, WindowError> {
        let windows = Self {
            perfect_ms,
            good_ms,
            okay_ms,
            bad_margin_ms: None,
        };
        windows.validate()?;
        Ok(windows)
    }

    /// Adds a band beyond the okay window in which presses are judged [`Judgment::Bad`].
    #[must_use]
    pub fn with_bad_margin(mut self, margin_ms: Option<f64>) -> Self {
        self.bad_margin_ms = margin_ms.filter(|margin| margin.is_finite() && *margin > 0.0);
        self
    }

    /// Checks the ordering of the windows.
    pub fn validate(&self) -> Result<(), WindowError> {
        let all_finite = [self.perfect_ms, self.good_ms, self.okay_ms]
            .iter()
            .all(|value| value.is_finite());
        if !all_finite || self.perfect_ms <= 0.0 {
            return Err(WindowError::NonPositive {
                perfect_ms: self.perfect_ms,
            });
        }
        if self.perfect_ms >= self.good_ms || self.good_ms >= self.okay_ms {
            return Err(WindowError::Unordered {
                perfect_ms: self.perfect_ms,
                good_ms: self.good_ms,
                okay_ms: self.okay_ms,
            });
        }
        Ok(())
    }

    /// Perfect window half-width.
    #[must_use]
    pub const fn perfect_ms(&self) -> f64 {
        self.perfect_ms
    }

    /// Good window half-width.
    #[must_use]
    pub const fn good_ms(&self) -> f64 {
        self.good_ms
    }

    /// Okay window half-width.
    #[must_use]
    pub const fn okay_ms(&self) -> f64 {
        self.okay_ms
    }

    /// Width of the band past the okay window judged as bad, if enabled.
    #[must_use]
    pub const fn bad_margin_ms(&self) -> Option<f64> {
        self.bad_margin_ms
    }

    /// Okay window half-width in seconds.
    #[must_use]
    pub fn okay_secs(&self) -> f64 {
        self.okay_ms / 1000.0
    }

    /// Time after its target at which an unhit note times out.
    ///
    /// Equals the okay window, widened by the bad band when one is enabled
    /// so that late presses inside the band can still be judged.
    #[must_use]
    pub fn expiry_secs(&self) -> f64 {
        (self.okay_ms + self.bad_margin_ms.unwrap_or(0.0)) / 1000.0
    }

    /// Classifies a timing error against the windows.
    ///
    /// Anything outside the okay window (and outside the bad band, if
    /// enabled) is a [`Judgment::Miss`].
    #[must_use]
    pub fn classify(&self, delta_ms: f64) -> Judgment {
        self.judge_press(delta_ms).unwrap_or(Judgment::Miss)
    }

    /// Judges a lane press, returning `None` when the press is too far from
    /// the note to count at all.
    #[must_use]
    pub fn judge_press(&self, delta_ms: f64) -> Option<Judgment> {
        let distance = delta_ms.abs();
        if distance <= self.perfect_ms {
            Some(Judgment::Perfect)
        } else if distance <= self.good_ms {
            Some(Judgment::Good)
        } else if distance <= self.okay_ms {
            Some(Judgment::Okay)
        } else {
            self.bad_margin_ms
                .filter(|margin| distance <= self.okay_ms + margin)
                .map(|_| Judgment::Bad)
        }
    }

    /// Moves each window toward `floor` by `t` without ever loosening it.
    #[must_use]
    pub fn tightened_toward(&self, floor: &Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let toward = |base: f64, target: f64| base.min(lerp(base, target, t));
        Self {
            perfect_ms: toward(self.perfect_ms, floor.perfect_ms),
            good_ms: toward(self.good_ms, floor.good_ms),
            okay_ms: toward(self.okay_ms, floor.okay_ms),
            bad_margin_ms: self.bad_margin_ms,
        }
    }
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Reasons a set of judgment windows is unusable.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum WindowError {
    /// A window is zero, negative or not finite.
    #[error("judgment windows must be positive and finite (perfect window was {perfect_ms} ms)")]
    NonPositive {
        /// Perfect window that failed the check.
        perfect_ms: f64,
    },
    /// The windows do not widen from perfect to okay.
    #[error("judgment windows must widen: perfect {perfect_ms} ms, good {good_ms} ms, okay {okay_ms} ms")]
    Unordered {
        /// Perfect window half-width.
        perfect_ms: f64,
        /// Good window half-width.
        good_ms: f64,
        /// Okay window half-width.
        okay_ms: f64,
    },
}

/// Base timing and speed settings scaled per encounter by density.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JudgmentSettings {
    /// Windows used at the lowest density.
    pub base: JudgmentWindows,
    /// Tightest windows reached at the highest density.
    pub floor: JudgmentWindows,
    /// Note speed at the lowest density, in world units per second.
    pub base_note_speed: f64,
}

impl JudgmentSettings {
    /// Note speed at the lowest density.
    pub const DEFAULT_NOTE_SPEED: f64 = 500.0;

    /// Checks both window sets and the base speed.
    pub fn validate(&self) -> Result<(), WindowError> {
        self.base.validate()?;
        self.floor.validate()?;
        if !self.base_note_speed.is_finite() || self.base_note_speed <= 0.0 {
            return Err(WindowError::NonPositive {
                perfect_ms: self.base.perfect_ms,
            });
        }
        Ok(())
    }

    /// Derives the concrete windows and speed for an encounter density.
    ///
    /// Windows tighten linearly toward the floor and note speed grows up to
    /// twice its base value at the highest density.
    #[must_use]
    pub fn for_density(&self, density: Density) -> JudgmentConfig {
        let t = density.progress();
        JudgmentConfig {
            windows: self.base.tightened_toward(&self.floor, t),
            note_speed: self.base_note_speed * (1.0 + t),
        }
    }
}

impl Default for JudgmentSettings {
    fn default() -> Self {
        Self {
            base: JudgmentWindows::DEFAULT,
            floor: JudgmentWindows::FLOOR,
            base_note_speed: Self::DEFAULT_NOTE_SPEED,
        }
    }
}

/// Windows and note speed in force for one encounter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JudgmentConfig {
    windows: JudgmentWindows,
    note_speed: f64,
}

impl JudgmentConfig {
    /// Creates a configuration from explicit values.
    #[must_use]
    pub const fn new(windows: JudgmentWindows, note_speed: f64) -> Self {
        Self {
            windows,
            note_speed,
        }
    }

    /// Enables the bad band on the contained windows.
    #[must_use]
    pub fn with_bad_margin(mut self, margin_ms: Option<f64>) -> Self {
        self.windows = self.windows.with_bad_margin(margin_ms);
        self
    }

    /// Active timing windows.
    #[must_use]
    pub const fn windows(&self) -> &JudgmentWindows {
        &self.windows
    }

    /// Speed notes travel at, in world units per second.
    #[must_use]
    pub const fn note_speed(&self) -> f64 {
        self.note_speed
    }

    /// Time a note needs to cover `distance` world units.
    #[must_use]
    pub fn travel_secs(&self, distance: f64) -> f64 {
        if self.note_speed > 0.0 {
            distance / self.note_speed
        } else {
            0.0
        }
    }
}
