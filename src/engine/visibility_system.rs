use super::*;

impl StealthMode {
    /// Whether the subject is exposed right now: inside a reveal window, or
    /// moving fast enough on the ground plane to trip the run reveal.
    pub fn subject_visible<R: ParticipantRegistry>(&self, registry: &R, now_ms: u64) -> bool {
        if self.state.reveal.is_visible(now_ms) {
            return true;
        }
        if !self.config.run_reveal_enabled {
            return false;
        }
        let Some(subject) = self.state.subject.and_then(|id| registry.participant(id)) else {
            return false;
        };
        let speed = subject.velocity.horizontal_speed();
        let running = speed >= self.config.run_reveal_speed;
        if running && self.config.debug_log {
            info!(speed, threshold = self.config.run_reveal_speed, "speed reveal");
        }
        running
    }

    /// Removes the subject's body from every other observer's transmit list
    /// while the subject is hidden. Returns how many lists were filtered.
    pub fn filter_transmit<R: ParticipantRegistry>(
        &self,
        registry: &R,
        lists: &mut [TransmitList],
        now_ms: u64,
    ) -> usize {
        let Some(subject_id) = self.state.running_subject() else {
            return 0;
        };
        let Some(body) = registry.participant(subject_id).and_then(|p| p.body) else {
            return 0;
        };
        if self.subject_visible(registry, now_ms) {
            return 0;
        }

        let mut filtered = 0;
        for list in lists.iter_mut() {
            if list.observer == subject_id {
                continue;
            }
            let Some(observer) = registry.participant(list.observer) else {
                continue;
            };
            if self.config.spectators_see_subject
                && (observer.team == Team::Spectator || !observer.alive)
            {
                continue;
            }
            if list.entities.remove(&body) {
                filtered += 1;
            }
        }
        filtered
    }
}
