use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Judgment;

/// Running tally of judgments for one session.
///
/// Bad judgments are tracked separately for reporting but also count toward
/// the miss total, so the per-kind counts always sum to the number of judged
/// notes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerformanceState {
    score: u32,
    combo: u32,
    max_combo: u32,
    perfect: u32,
    good: u32,
    okay: u32,
    bad: u32,
    miss: u32,
}

impl PerformanceState {
    /// Folds a single judgment into the tally.
    pub fn record(&mut self, judgment: Judgment) {
        self.score = self.score.saturating_add(judgment.score());
        match judgment {
            Judgment::Perfect => self.perfect += 1,
            Judgment::Good => self.good += 1,
            Judgment::Okay => self.okay += 1,
            Judgment::Bad => {
                self.bad += 1;
                self.miss += 1;
            }
            Judgment::Miss => self.miss += 1,
        }

        if judgment.is_hit() {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        } else {
            self.combo = 0;
        }
    }

    /// Accumulated score.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Consecutive hits since the last miss.
    #[must_use]
    pub const fn combo(&self) -> u32 {
        self.combo
    }

    /// Longest combo reached during the session.
    #[must_use]
    pub const fn max_combo(&self) -> u32 {
        self.max_combo
    }

    /// Number of perfect judgments.
    #[must_use]
    pub const fn perfect_count(&self) -> u32 {
        self.perfect
    }

    /// Number of good judgments.
    #[must_use]
    pub const fn good_count(&self) -> u32 {
        self.good
    }

    /// Number of okay judgments.
    #[must_use]
    pub const fn okay_count(&self) -> u32 {
        self.okay
    }

    /// Number of bad judgments. Already included in [`Self::miss_count`].
    #[must_use]
    pub const fn bad_count(&self) -> u32 {
        self.bad
    }

    /// Number of notes that were missed or judged bad.
    #[must_use]
    pub const fn miss_count(&self) -> u32 {
        self.miss
    }

    /// Number of notes judged so far.
    #[must_use]
    pub const fn total_judged(&self) -> u32 {
        self.perfect + self.good + self.okay + self.miss
    }

    /// Weighted hit ratio in percent, zero when nothing has been judged.
    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        let total = self.total_judged();
        if total == 0 {
            return 0.0;
        }

        let weighted = u64::from(self.perfect) * u64::from(Judgment::Perfect.accuracy_weight())
            + u64::from(self.good) * u64::from(Judgment::Good.accuracy_weight())
            + u64::from(self.okay) * u64::from(Judgment::Okay.accuracy_weight());
        weighted as f64 / f64::from(total)
    }

    /// No judged note was missed. Holds vacuously before any judgment.
    #[must_use]
    pub const fn is_full_combo(&self) -> bool {
        self.miss == 0
    }

    /// Every judged note was perfect.
    #[must_use]
    pub const fn is_all_perfect(&self) -> bool {
        self.perfect == self.total_judged() && self.perfect > 0
    }
}

/// Letter grade derived from accuracy.
///
/// Variants are ordered from worst to best so that comparisons read
/// naturally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    /// Below 50%.
    F,
    /// At least 50%.
    D,
    /// At least 60%.
    C,
    /// At least 70%.
    B,
    /// At least 80%.
    A,
    /// At least 90%.
    APlus,
    /// At least 95% with no misses.
    S,
}

impl Grade {
    /// Grades an accuracy percentage.
    #[must_use]
    pub fn from_accuracy(accuracy_percent: f64, full_combo: bool) -> Self {
        match accuracy_percent {
            a if a >= 95.0 && full_combo => Self::S,
            a if a >= 90.0 => Self::APlus,
            a if a >= 80.0 => Self::A,
            a if a >= 70.0 => Self::B,
            a if a >= 60.0 => Self::C,
            a if a >= 50.0 => Self::D,
            _ => Self::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::F => "F",
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::APlus => "A+",
            Self::S => "S",
        };
        f.write_str(label)
    }
}

/// Summary of a finished session, computed once when it ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    accuracy_percent: f64,
    grade: Grade,
    won: bool,
    full_combo: bool,
    all_perfect: bool,
}

impl SessionResult {
    /// Evaluates a final tally against the win threshold.
    #[must_use]
    pub fn evaluate(performance: &PerformanceState, win_threshold_percent: f64) -> Self {
        let accuracy_percent = performance.accuracy_percent();
        let full_combo = performance.is_full_combo();
        Self {
            accuracy_percent,
            grade: Grade::from_accuracy(accuracy_percent, full_combo),
            won: performance.total_judged() > 0 && accuracy_percent >= win_threshold_percent,
            full_combo,
            all_perfect: performance.is_all_perfect(),
        }
    }

    /// Same result, but marked as lost regardless of accuracy.
    #[must_use]
    pub fn conceded(mut self) -> Self {
        self.won = false;
        self
    }

    /// Weighted hit ratio in percent.
    #[must_use]
    pub const fn accuracy_percent(&self) -> f64 {
        self.accuracy_percent
    }

    /// Letter grade.
    #[must_use]
    pub const fn grade(&self) -> Grade {
        self.grade
    }

    /// Whether the attacker won the exchange.
    #[must_use]
    pub const fn won(&self) -> bool {
        self.won
    }

    /// Whether no note was missed.
    #[must_use]
    pub const fn full_combo(&self) -> bool {
        self.full_combo
    }

    /// Whether every note was perfect.
    #[must_use]
    pub const fn all_perfect(&self) -> bool {
        self.all_perfect
    }
}

#[cfg(test)]
mod tests {
    use super::{Grade, PerformanceState, SessionResult};
    use crate::Judgment;

    fn tally(judgments: &[Judgment]) -> PerformanceState {
        let mut state = PerformanceState::default();
        for judgment in judgments {
            state.record(*judgment);
        }
        state
    }

    #[test]
    fn empty_session_has_zero_accuracy_and_grade_f() {
        let state = PerformanceState::default();
        let result = SessionResult::evaluate(&state, 60.0);
        assert_eq!(result.accuracy_percent(), 0.0);
        assert_eq!(result.grade(), Grade::F);
        assert!(!result.won());
        assert!(result.full_combo());
        assert!(!result.all_perfect());
    }

    #[test]
    fn combo_resets_on_miss_and_keeps_maximum() {
        use Judgment::{Good, Miss, Okay, Perfect};
        let state = tally(&[Perfect, Good, Okay, Miss, Perfect]);
        assert_eq!(state.combo(), 1);
        assert_eq!(state.max_combo(), 3);
        assert_eq!(state.score(), 325);
    }

    #[test]
    fn bad_counts_as_miss_and_breaks_combo() {
        let state = tally(&[Judgment::Perfect, Judgment::Bad]);
        assert_eq!(state.miss_count(), 1);
        assert_eq!(state.bad_count(), 1);
        assert_eq!(state.combo(), 0);
        assert_eq!(state.total_judged(), 2);
        assert_eq!(state.score(), 105);
    }

    #[test]
    fn accuracy_weights_each_judgment() {
        let state = tally(&[
            Judgment::Perfect,
            Judgment::Good,
            Judgment::Okay,
            Judgment::Miss,
        ]);
        assert!((state.accuracy_percent() - 56.25).abs() < 1e-9);
    }

    #[test]
    fn all_perfect_session_earns_s() {
        let state = tally(&[Judgment::Perfect; 8]);
        let result = SessionResult::evaluate(&state, 60.0);
        assert_eq!(result.grade(), Grade::S);
        assert!(result.won() && result.full_combo() && result.all_perfect());
    }

    #[test]
    fn a_single_miss_caps_the_grade_below_s() {
        let mut judgments = vec![Judgment::Perfect; 99];
        judgments.push(Judgment::Miss);
        let result = SessionResult::evaluate(&tally(&judgments), 60.0);
        assert_eq!(result.grade(), Grade::APlus);
    }

    #[test]
    fn grades_never_drop_as_accuracy_rises() {
        for full_combo in [false, true] {
            let grades: Vec<Grade> = (0..=1000)
                .map(|step| Grade::from_accuracy(f64::from(step) / 10.0, full_combo))
                .collect();
            assert!(grades.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[test]
    fn conceded_results_are_losses() {
        let state = tally(&[Judgment::Perfect; 4]);
        let result = SessionResult::evaluate(&state, 60.0).conceded();
        assert!(!result.won());
        assert_eq!(result.grade(), Grade::S);
    }

    #[test]
    fn grade_labels_match_convention() {
        assert_eq!(Grade::APlus.to_string(), "A+");
        assert_eq!(Grade::S.to_string(), "S");
    }
}
