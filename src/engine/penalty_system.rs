use super::*;

impl StealthMode {
    pub(super) fn on_weapon_fire<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        shooter: ParticipantId,
        weapon: &str,
        now_ms: u64,
    ) {
        let Some(subject) = self.state.running_subject() else {
            return;
        };
        if registry.participant(shooter).is_none() {
            return;
        }
        if shooter == subject {
            self.trigger_reveal(TriggerKind::WeaponFire, now_ms);
            return;
        }
        self.tax_shot(registry, shooter, weapon, now_ms);
    }

    /// Charges a shot taken at the hidden subject and records a refundable credit.
    fn tax_shot<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        shooter: ParticipantId,
        weapon: &str,
        now_ms: u64,
    ) {
        let Some(subject) = self.state.subject else {
            return;
        };
        if registry.participant(subject).is_none() || self.subject_visible(registry, now_ms) {
            return;
        }
        let class = WeaponClass::classify(weapon);
        if class.is_area() {
            return;
        }
        let penalty = self.config.penalty_for(class);
        if penalty <= 0 {
            return;
        }
        if !self.apply_penalty(registry, shooter, penalty) {
            return;
        }
        let expires_at_ms = now_ms.saturating_add(window_ms(self.config.miss_window_seconds));
        self.state
            .ledger
            .push(shooter, penalty, expires_at_ms, now_ms);
        if self.config.debug_log {
            info!(%shooter, weapon, ?class, penalty, expires_at_ms, "shot taxed");
        }
    }

    pub(super) fn on_player_hurt<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        victim: ParticipantId,
        attacker: Option<ParticipantId>,
        now_ms: u64,
    ) {
        let Some(subject) = self.state.running_subject() else {
            return;
        };
        if victim != subject || registry.participant(victim).is_none() {
            return;
        }
        self.trigger_reveal(TriggerKind::Damage, now_ms);

        let Some(attacker) = attacker.filter(|attacker| *attacker != subject) else {
            return;
        };
        if registry.participant(attacker).is_none() {
            return;
        }
        if let Some(credit) = self.state.ledger.redeem(attacker, now_ms) {
            self.refund_penalty(registry, attacker, credit.amount);
        }
    }

    /// Returns false when the shooter has no body to charge.
    fn apply_penalty<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        shooter: ParticipantId,
        amount: i32,
    ) -> bool {
        let Some(participant) = registry.participant(shooter).filter(Participant::has_body) else {
            return false;
        };
        let mut health = participant.health.saturating_sub(amount);
        if !self.config.penalty_can_kill && health < 1 {
            health = 1;
        }
        let health = health.max(0);
        registry.set_health(shooter, health);
        registry.replicate(shooter, ReplicatedField::Health);

        if health == 0 && registry.kill(shooter) {
            info!(%shooter, "shooter killed by miss penalty");
        }
        true
    }

    fn refund_penalty<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        shooter: ParticipantId,
        amount: i32,
    ) {
        let Some(participant) = registry.participant(shooter).filter(Participant::has_body) else {
            return;
        };
        if amount <= 0 {
            return;
        }
        let max_health = if participant.max_health > 0 {
            participant.max_health
        } else {
            FALLBACK_MAX_HEALTH
        };
        let health = max_health.min(participant.health.saturating_add(amount));
        registry.set_health(shooter, health);
        registry.replicate(shooter, ReplicatedField::Health);
        if self.config.debug_log {
            info!(%shooter, amount, health, "miss penalty refunded");
        }
    }
}
