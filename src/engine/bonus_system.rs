use super::*;

impl StealthMode {
    /// Scales the subject's health pool with the number of live enemies.
    /// Returns the applied total, or `None` when nothing was changed.
    pub fn recalc_bonus_health<R: ParticipantRegistry>(&mut self, registry: &mut R) -> Option<i32> {
        let subject_id = self.state.running_subject()?;
        if !self.config.bonus_health_per_enemy_enabled {
            return None;
        }
        let subject = registry
            .participant(subject_id)
            .filter(Participant::has_body)?;
        if !subject.team.is_combat() {
            return None;
        }

        let enemies = registry
            .roster()
            .iter()
            .filter(|p| p.alive && p.team.is_combat() && p.team != subject.team)
            .count();
        let total = bonus_health_total(self.config.bonus_health_per_enemy_amount, enemies);

        registry.set_max_health(subject_id, total);
        registry.set_health(subject_id, total);
        registry.replicate(subject_id, ReplicatedField::MaxHealth);
        registry.replicate(subject_id, ReplicatedField::Health);

        if self.config.debug_log {
            info!(enemies, total, "bonus health applied");
        }
        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::tests_support::*;
    use crate::registry::ParticipantRegistry;
    use crate::types::{GameEvent, Team};

    fn subject_health(registry: &impl ParticipantRegistry) -> (i32, i32) {
        let subject = registry.participant(SUBJECT).expect("subject");
        (subject.health, subject.max_health)
    }

    #[test]
    fn scenario_e_four_enemies_give_four_hundred() {
        let (mut mode, mut registry) = running_mode();
        registry.set_health(SUBJECT, 10);
        assert_eq!(mode.recalc_bonus_health(&mut registry), Some(400));
        assert_eq!(subject_health(&registry), (400, 400));
    }

    #[test]
    fn teammates_spectators_and_dead_enemies_do_not_count() {
        let (mut mode, mut registry) = running_mode();
        registry.get_mut(ENEMY_D).expect("enemy").alive = false;
        assert_eq!(mode.recalc_bonus_health(&mut registry), Some(300));
    }

    #[test]
    fn no_enemies_still_grants_one_share() {
        let (mut mode, mut registry) = running_mode();
        for enemy in [ENEMY_A, ENEMY_B, ENEMY_C, ENEMY_D] {
            registry.remove(enemy);
        }
        assert_eq!(mode.recalc_bonus_health(&mut registry), Some(100));
    }

    #[test]
    fn non_combat_subject_is_left_alone() {
        let (mut mode, mut registry) = running_mode();
        registry.get_mut(SUBJECT).expect("subject").team = Team::Spectator;
        registry.set_health(SUBJECT, 50);
        assert_eq!(mode.recalc_bonus_health(&mut registry), None);
        assert_eq!(subject_health(&registry).0, 50);
    }

    #[test]
    fn disabled_bonus_is_a_no_op() {
        let (mut mode, mut registry) = running_mode();
        mode.config_mut().bonus_health_per_enemy_enabled = false;
        registry.set_health(SUBJECT, 50);
        assert_eq!(mode.recalc_bonus_health(&mut registry), None);
        assert_eq!(subject_health(&registry).0, 50);
    }

    #[test]
    fn spawn_and_round_start_reapply_bonus() {
        let (mut mode, mut registry) = running_mode();
        registry.set_health(SUBJECT, 1);
        mode.handle_event(
            &mut registry,
            &GameEvent::PlayerSpawn {
                participant: SUBJECT,
            },
            1_000,
        );
        assert_eq!(subject_health(&registry).0, 400);

        registry.set_health(SUBJECT, 1);
        mode.handle_event(
            &mut registry,
            &GameEvent::PlayerSpawn {
                participant: ENEMY_A,
            },
            1_000,
        );
        assert_eq!(subject_health(&registry).0, 1);

        mode.handle_event(&mut registry, &GameEvent::RoundStart, 2_000);
        assert_eq!(subject_health(&registry).0, 400);
    }
}
