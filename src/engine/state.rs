use crate::types::ParticipantId;

use super::ledger::PenaltyLedger;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RevealState {
    /// `None` stands for the infinite past, i.e. hidden.
    visible_until_ms: Option<u64>,
}

impl RevealState {
    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn visible_until_ms(&self) -> Option<u64> {
        self.visible_until_ms
    }

    pub fn is_visible(&self, now_ms: u64) -> bool {
        self.visible_until_ms
            .is_some_and(|until| now_ms <= until)
    }

    /// Unconditional overwrite: a short window replaces a longer one still running.
    pub fn reveal_until(&mut self, until_ms: u64) {
        self.visible_until_ms = Some(until_ms);
    }

    pub fn hide(&mut self) {
        self.visible_until_ms = None;
    }
}

/// The single aggregate every handler reads and mutates.
#[derive(Clone, Debug, Default)]
pub struct ModeState {
    pub subject: Option<ParticipantId>,
    pub active: bool,
    pub reveal: RevealState,
    pub ledger: PenaltyLedger,
}

impl ModeState {
    pub fn running_subject(&self) -> Option<ParticipantId> {
        if self.active {
            self.subject
        } else {
            None
        }
    }

    pub fn assign(&mut self, subject: ParticipantId) {
        self.subject = Some(subject);
        self.active = true;
        self.reveal.hide();
        self.ledger.clear();
    }

    /// Drops pending reveal windows and credits while keeping the subject.
    pub fn reset_round(&mut self) {
        self.reveal.hide();
        self.ledger.clear();
    }

    pub fn clear(&mut self) {
        self.subject = None;
        self.active = false;
        self.reset_round();
    }
}
