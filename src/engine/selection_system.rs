use super::*;

impl StealthMode {
    /// Makes the matching participant the subject. On failure nothing changes.
    pub fn select<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        selector: &TargetSelector,
        caller: Option<ParticipantId>,
    ) -> Result<ParticipantId, ModeError> {
        let target = find_target(registry, selector, caller)
            .ok_or_else(|| ModeError::TargetNotFound(selector.describe()))?;
        self.assign(registry, &target, "Stealth subject selected");
        Ok(target.id)
    }

    /// Uniform pick among participants that are alive and have a body.
    pub fn select_random<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
    ) -> Result<ParticipantId, ModeError> {
        let candidates: Vec<Participant> = registry
            .roster()
            .into_iter()
            .filter(|p| p.alive && p.has_body())
            .collect();
        if candidates.is_empty() {
            return Err(ModeError::NoEligibleParticipants);
        }
        let chosen = &candidates[self.rng.random_range(0..candidates.len())];
        self.assign(registry, chosen, "Random stealth subject");
        Ok(chosen.id)
    }

    pub fn start<R: ParticipantRegistry>(&mut self, registry: &mut R) {
        self.state.active = true;
        info!(subject = ?self.state.subject, "stealth mode started");
        self.broadcast("Stealth mode active.");
        self.recalc_bonus_health(registry);
    }

    /// Clears the subject, reveal window and every pending credit.
    pub fn stop(&mut self) {
        self.state.clear();
        info!("stealth mode stopped");
        self.broadcast("Stealth mode stopped.");
    }

    fn assign<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        target: &Participant,
        headline: &str,
    ) {
        self.state.assign(target.id);
        let name = display_name(&target.name).to_string();
        info!(subject = %target.id, name = %name, "stealth subject assigned");
        self.broadcast(&format!(
            "{headline}: {name}. They stay hidden except briefly on configured reveal events."
        ));
        self.recalc_bonus_health(registry);
    }
}

fn find_target<R: ParticipantRegistry>(
    registry: &R,
    selector: &TargetSelector,
    caller: Option<ParticipantId>,
) -> Option<Participant> {
    match selector {
        TargetSelector::Caller => caller.and_then(|id| registry.participant(id)),
        TargetSelector::Id(id) => registry.participant(ParticipantId(*id)),
        TargetSelector::Name(fragment) => {
            let needle = fragment.to_lowercase();
            registry.roster().into_iter().find(|p| {
                let name = p.name.trim();
                !name.is_empty() && name.to_lowercase().contains(&needle)
            })
        }
    }
}
