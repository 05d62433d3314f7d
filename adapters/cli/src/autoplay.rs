use std::collections::BTreeMap;

use anyhow::{ensure, Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rhythm_combat_core::{ActiveNoteView, LaneIndex, NoteId};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Intent {
    Press { at_secs: f64 },
    Pressed,
    Ignore,
}

/// Simulated player that presses each note with a normally distributed
/// timing error and occasionally lets one pass.
#[derive(Debug)]
pub(crate) struct AutoPlayer {
    rng: ChaCha8Rng,
    timing: Normal<f64>,
    miss_rate: f64,
    intents: BTreeMap<NoteId, Intent>,
}

impl AutoPlayer {
    /// Creates a player whose presses deviate by `skill_ms` standard
    /// deviation and who ignores a `miss_rate` fraction of notes.
    pub(crate) fn new(seed: u64, skill_ms: f64, miss_rate: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&miss_rate),
            "miss rate {miss_rate} must lie between 0 and 1"
        );
        let timing = Normal::new(0.0, skill_ms / 1000.0)
            .with_context(|| format!("invalid timing spread of {skill_ms} ms"))?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            timing,
            miss_rate,
            intents: BTreeMap::new(),
        })
    }

    /// Lanes to press at `now_secs` given the notes currently travelling.
    pub(crate) fn presses(&mut self, now_secs: f64, notes: &ActiveNoteView) -> Vec<LaneIndex> {
        self.intents
            .retain(|id, _| notes.iter().any(|note| note.id == *id));

        let mut lanes = Vec::new();
        for note in notes.iter() {
            let intent = match self.intents.get(&note.id) {
                Some(intent) => *intent,
                None => {
                    let intent = if self.rng.gen_bool(self.miss_rate) {
                        Intent::Ignore
                    } else {
                        Intent::Press {
                            at_secs: note.target_time_secs + self.timing.sample(&mut self.rng),
                        }
                    };
                    let _ = self.intents.insert(note.id, intent);
                    intent
                }
            };
            if let Intent::Press { at_secs } = intent {
                if now_secs >= at_secs && !lanes.contains(&note.lane) {
                    lanes.push(note.lane);
                    let _ = self.intents.insert(note.id, Intent::Pressed);
                }
            }
        }
        lanes
    }
}
