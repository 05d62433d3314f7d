use std::collections::HashMap;

use rhythm_combat_core::{CombatantId, EncounterError, SessionId};

/// Grants at most one live session at a time and enforces re-engagement
/// cooldowns per opponent.
#[derive(Debug, Default)]
pub struct SessionArbiter {
    active: Option<SessionId>,
    next_session: u64,
    ready_at: HashMap<CombatantId, f64>,
}

impl SessionArbiter {
    /// Session currently holding the arbiter, if any.
    #[must_use]
    pub const fn active_session(&self) -> Option<SessionId> {
        self.active
    }

    /// Reports whether a session is live or awaiting resolution.
    #[must_use]
    pub const fn is_engaged(&self) -> bool {
        self.active.is_some()
    }

    /// Time left before `opponent` may be engaged again.
    #[must_use]
    pub fn cooldown_remaining(&self, opponent: CombatantId, now_secs: f64) -> f64 {
        self.ready_at
            .get(&opponent)
            .map_or(0.0, |ready_at| (ready_at - now_secs).max(0.0))
    }

    /// Reports whether a new encounter against `opponent` would be granted.
    #[must_use]
    pub fn can_engage(&self, opponent: CombatantId, now_secs: f64) -> bool {
        !self.is_engaged() && self.cooldown_remaining(opponent, now_secs) <= 0.0
    }

    pub(crate) fn try_acquire(
        &mut self,
        opponent: CombatantId,
        now_secs: f64,
    ) -> Result<SessionId, EncounterError> {
        if let Some(session) = self.active {
            return Err(EncounterError::SessionActive { session });
        }

        let remaining_secs = self.cooldown_remaining(opponent, now_secs);
        if remaining_secs > 0.0 {
            return Err(EncounterError::Cooldown {
                opponent,
                remaining_secs,
            });
        }

        self.next_session = self.next_session.saturating_add(1);
        let session = SessionId::new(self.next_session);
        self.active = Some(session);
        Ok(session)
    }

    pub(crate) fn release(
        &mut self,
        session: SessionId,
        opponent: CombatantId,
        now_secs: f64,
        cooldown_secs: f64,
    ) {
        if self.active != Some(session) {
            return;
        }
        self.active = None;
        let _ = self
            .ready_at
            .insert(opponent, now_secs + cooldown_secs.max(0.0));
    }
}
