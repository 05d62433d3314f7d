use std::collections::BTreeMap;

use log::{debug, info};
use rhythm_combat_core::{
    Combatant, DifficultyProfile, EncounterKind, EncounterTuning, EndReason, Event, Judgment,
    JudgmentConfig, LaneLayout, Note, NoteId, PerformanceState, SessionId, SessionResult, Track,
};

use crate::motion::ActiveNote;

/// Lifecycle stage of the current encounter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EncounterPhase {
    /// Session granted, waiting for its chart.
    AwaitingChart,
    /// Chart loaded, lead-in running before the session clock starts.
    Intro {
        /// Lead-in time left.
        remaining_secs: f64,
    },
    /// Session clock running and notes being judged.
    Playing,
    /// Session stopped, waiting for the combat outcome.
    Resolving {
        /// Why the session stopped.
        reason: EndReason,
        /// Summary computed when the session stopped.
        result: SessionResult,
    },
}

/// State of the single encounter the world may host.
#[derive(Debug)]
pub(crate) struct Encounter {
    pub(crate) session: SessionId,
    pub(crate) kind: EncounterKind,
    pub(crate) tuning: EncounterTuning,
    pub(crate) track: Track,
    pub(crate) profile: DifficultyProfile,
    pub(crate) judgment: JudgmentConfig,
    pub(crate) attacker: Combatant,
    pub(crate) defender: Combatant,
    pub(crate) phase: EncounterPhase,
    pub(crate) clock_secs: f64,
    pub(crate) length_secs: f64,
    pub(crate) note_count: u32,
    pub(crate) pending: BTreeMap<NoteId, Note>,
    pub(crate) active: BTreeMap<NoteId, ActiveNote>,
    pub(crate) performance: PerformanceState,
    pub(crate) chip_damage: u32,
}

impl Encounter {
    pub(crate) fn is_live(&self, session: SessionId) -> bool {
        self.session == session && self.phase == EncounterPhase::Playing
    }

    pub(crate) fn is_resolving(&self) -> bool {
        matches!(self.phase, EncounterPhase::Resolving { .. })
    }

    pub(crate) fn advance_notes(&mut self, lanes: &LaneLayout) {
        for active in self.active.values_mut() {
            if let Some(geometry) = lanes.lane(active.note.lane()) {
                active.advance(self.clock_secs, geometry);
            }
        }
    }

    /// Records a judgment and returns the chip damage it caused.
    pub(crate) fn judge(
        &mut self,
        note: NoteId,
        judgment: Judgment,
        delta_ms: f64,
        out_events: &mut Vec<Event>,
    ) -> Option<u32> {
        let lane = self.active.remove(&note)?.note.lane();
        self.performance.record(judgment);
        let chip = match judgment {
            Judgment::Miss => self.tuning.miss_chip_damage,
            Judgment::Bad => self.tuning.bad_chip_damage,
            Judgment::Perfect | Judgment::Good | Judgment::Okay => 0,
        };
        self.chip_damage = self.chip_damage.saturating_add(chip);
        out_events.push(Event::NoteResolved {
            session: self.session,
            note,
            lane,
            judgment,
            delta_ms,
            combo: self.performance.combo(),
            score: self.performance.score(),
        });
        Some(chip)
    }

    /// Stops the session, judging every outstanding note as a miss.
    pub(crate) fn end(&mut self, reason: EndReason, out_events: &mut Vec<Event>) {
        if self.is_resolving() {
            return;
        }

        let mut outstanding: Vec<(NoteId, Note)> = std::mem::take(&mut self.pending)
            .into_iter()
            .chain(
                std::mem::take(&mut self.active)
                    .into_iter()
                    .map(|(id, active)| (id, active.note)),
            )
            .collect();
        outstanding.sort_by_key(|(id, _)| *id);

        if !outstanding.is_empty() {
            debug!(
                "session {} flushing {} outstanding notes as misses",
                self.session,
                outstanding.len()
            );
        }
        for (id, note) in outstanding {
            self.performance.record(Judgment::Miss);
            out_events.push(Event::NoteResolved {
                session: self.session,
                note: id,
                lane: note.lane(),
                judgment: Judgment::Miss,
                delta_ms: (self.clock_secs - note.target_time_secs()) * 1000.0,
                combo: self.performance.combo(),
                score: self.performance.score(),
            });
        }

        let evaluated = SessionResult::evaluate(&self.performance, self.tuning.win_threshold_percent);
        let result = match reason {
            EndReason::Completed => evaluated,
            EndReason::Knockout | EndReason::Aborted => evaluated.conceded(),
        };
        self.phase = EncounterPhase::Resolving { reason, result };

        info!(
            "session {} ended ({:?}): accuracy {:.1}% grade {} score {}",
            self.session,
            reason,
            result.accuracy_percent(),
            result.grade(),
            self.performance.score()
        );

        out_events.push(Event::SessionEnded {
            session: self.session,
            kind: self.kind,
            reason,
            performance: self.performance,
            result,
            tuning: self.tuning,
            attacker: self.attacker.clone(),
            defender: self.defender.clone(),
            chip_damage: self.chip_damage,
        });
    }
}
