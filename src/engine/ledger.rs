use std::collections::HashMap;

use crate::types::{ParticipantId, PendingCreditView};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PenaltyCredit {
    pub amount: i32,
    pub expires_at_ms: u64,
}

impl PenaltyCredit {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms < now_ms
    }
}

/// Per-shooter LIFO stacks of refundable health debits.
///
/// Expiry is lazy: a stack is swept whenever it is touched, never by a timer.
/// Empty stacks are dropped from the map.
#[derive(Clone, Debug, Default)]
pub struct PenaltyLedger {
    stacks: HashMap<ParticipantId, Vec<PenaltyCredit>>,
}

impl PenaltyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, shooter: ParticipantId, amount: i32, expires_at_ms: u64, now_ms: u64) {
        let stack = self.stacks.entry(shooter).or_default();
        sweep(stack, now_ms);
        stack.push(PenaltyCredit {
            amount,
            expires_at_ms,
        });
    }

    /// Pops the most recent live credit, if any. At most one per call.
    pub fn redeem(&mut self, shooter: ParticipantId, now_ms: u64) -> Option<PenaltyCredit> {
        let stack = self.stacks.get_mut(&shooter)?;
        sweep(stack, now_ms);
        let credit = stack.pop();
        if stack.is_empty() {
            self.stacks.remove(&shooter);
        }
        credit
    }

    pub fn forget(&mut self, shooter: ParticipantId) -> usize {
        self.stacks
            .remove(&shooter)
            .map(|stack| stack.len())
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.stacks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Credits held for `shooter`, top of stack last. Does not sweep.
    pub fn pending(&self, shooter: ParticipantId) -> &[PenaltyCredit] {
        self.stacks
            .get(&shooter)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn credit_count(&self) -> usize {
        self.stacks.values().map(Vec::len).sum()
    }

    /// Live credits only; expired ones still waiting for a sweep are skipped.
    pub fn views(&self, now_ms: u64) -> Vec<PendingCreditView> {
        let mut views: Vec<PendingCreditView> = self
            .stacks
            .iter()
            .flat_map(|(&shooter, stack)| {
                stack
                    .iter()
                    .filter(move |credit| !credit.is_expired(now_ms))
                    .map(move |credit| PendingCreditView {
                        shooter,
                        amount: credit.amount,
                        expires_at_ms: credit.expires_at_ms,
                    })
            })
            .collect();
        views.sort_by_key(|view| (view.shooter, view.expires_at_ms));
        views
    }
}

fn sweep(stack: &mut Vec<PenaltyCredit>, now_ms: u64) {
    // Not just the top: a miss window shortened by a reload can leave stale
    // credits under a live one.
    stack.retain(|credit| !credit.is_expired(now_ms));
}
