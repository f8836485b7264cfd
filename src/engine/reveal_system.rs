use super::*;

impl StealthMode {
    /// Reveals the subject for the trigger's configured duration if that
    /// trigger is enabled. Returns whether the window was (re)set.
    pub fn trigger_reveal(&mut self, kind: TriggerKind, now_ms: u64) -> bool {
        if !self.config.reveal_enabled(kind) {
            return false;
        }
        let seconds = self.config.reveal_seconds_for(kind);
        let until_ms = now_ms.saturating_add(window_ms(seconds));
        self.state.reveal.reveal_until(until_ms);
        if self.config.debug_log {
            info!(reason = kind.label(), seconds, until_ms, "subject revealed");
        } else {
            debug!(reason = kind.label(), until_ms, "subject revealed");
        }
        true
    }

    pub(super) fn on_subject_action<R: ParticipantRegistry>(
        &mut self,
        registry: &R,
        participant: ParticipantId,
        kind: TriggerKind,
        now_ms: u64,
    ) {
        if self.state.running_subject() != Some(participant) {
            return;
        }
        if registry.participant(participant).is_none() {
            return;
        }
        self.trigger_reveal(kind, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::tests_support::*;
    use crate::types::{GameEvent, TriggerKind};

    #[test]
    fn footstep_reveals_for_default_duration_then_hides() {
        let (mut mode, mut registry) = running_mode();
        mode.handle_event(
            &mut registry,
            &GameEvent::Footstep {
                participant: SUBJECT,
            },
            10_000,
        );
        assert_eq!(mode.state().reveal.visible_until_ms(), Some(10_300));
        assert!(mode.subject_visible(&registry, 10_300));
        assert!(!mode.subject_visible(&registry, 10_301));
    }

    #[test]
    fn each_subject_action_maps_to_its_trigger() {
        let actions = [
            GameEvent::Footstep {
                participant: SUBJECT,
            },
            GameEvent::Jump {
                participant: SUBJECT,
            },
            GameEvent::BombBeginPlant {
                participant: SUBJECT,
            },
            GameEvent::BombBeginDefuse {
                participant: SUBJECT,
            },
            GameEvent::GrenadeThrown {
                participant: SUBJECT,
            },
            GameEvent::WeaponFire {
                shooter: SUBJECT,
                weapon: "weapon_ak47".to_string(),
            },
        ];
        for action in actions {
            let (mut mode, mut registry) = running_mode();
            mode.handle_event(&mut registry, &action, 1_000);
            assert_eq!(
                mode.state().reveal.visible_until_ms(),
                Some(1_300),
                "{action:?}"
            );
        }
    }

    #[test]
    fn other_participants_never_reveal_the_subject() {
        let (mut mode, mut registry) = running_mode();
        mode.handle_event(
            &mut registry,
            &GameEvent::Jump {
                participant: ENEMY_A,
            },
            1_000,
        );
        assert_eq!(mode.state().reveal.visible_until_ms(), None);
    }

    #[test]
    fn disabled_toggle_suppresses_trigger() {
        let (mut mode, mut registry) = running_mode();
        mode.config_mut().reveal_on_jump_enabled = false;
        mode.handle_event(
            &mut registry,
            &GameEvent::Jump {
                participant: SUBJECT,
            },
            1_000,
        );
        assert_eq!(mode.state().reveal.visible_until_ms(), None);
        assert!(mode.trigger_reveal(TriggerKind::Footstep, 1_000));
    }

    #[test]
    fn later_short_trigger_overwrites_longer_window() {
        let (mut mode, mut registry) = running_mode();
        mode.config_mut().reveal_on_damage_seconds = 2.0;
        mode.handle_event(
            &mut registry,
            &GameEvent::PlayerHurt {
                victim: SUBJECT,
                attacker: None,
                damage: 10,
            },
            1_000,
        );
        assert_eq!(mode.state().reveal.visible_until_ms(), Some(3_000));
        mode.handle_event(
            &mut registry,
            &GameEvent::Footstep {
                participant: SUBJECT,
            },
            1_100,
        );
        assert_eq!(mode.state().reveal.visible_until_ms(), Some(1_400));
    }

    #[test]
    fn zero_duration_is_floored_to_minimum_window() {
        let (mut mode, _registry) = running_mode();
        mode.config_mut().reveal_seconds = 0.0;
        mode.trigger_reveal(TriggerKind::Footstep, 500);
        assert_eq!(mode.state().reveal.visible_until_ms(), Some(510));
    }

    #[test]
    fn huge_duration_saturates_instead_of_wrapping() {
        let (mut mode, registry) = running_mode();
        mode.config_mut().reveal_seconds = 1e30;
        assert!(mode.trigger_reveal(TriggerKind::Footstep, 1_000));
        assert_eq!(mode.state().reveal.visible_until_ms(), Some(u64::MAX));
        assert!(mode.subject_visible(&registry, 1_000_000));
    }

    #[test]
    fn inactive_mode_ignores_triggers() {
        let (mut mode, mut registry) = running_mode();
        mode.stop();
        mode.handle_event(
            &mut registry,
            &GameEvent::Footstep {
                participant: SUBJECT,
            },
            1_000,
        );
        assert_eq!(mode.state().reveal.visible_until_ms(), None);
    }
}
