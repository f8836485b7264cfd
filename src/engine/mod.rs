use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::command::{ModeCommand, TargetSelector};
use crate::config::Config;
use crate::config_store::ConfigStore;
use crate::constants::{bonus_health_total, window_ms, CHAT_PREFIX, FALLBACK_MAX_HEALTH};
use crate::error::ModeError;
use crate::registry::ParticipantRegistry;
use crate::types::{
    Audience, GameEvent, ModeNotice, ModeSnapshot, Participant, ParticipantId, ReplicatedField,
    Team, TransmitList, TriggerKind,
};

mod bonus_system;
pub mod ledger;
mod penalty_system;
mod reveal_system;
mod selection_system;
pub mod state;
mod utils;
mod visibility_system;
pub mod weapons;

pub use self::utils::now_ms;
use self::utils::display_name;
use self::weapons::WeaponClass;

use self::state::ModeState;

/// Controller for one running stealth mode: owns the config snapshot, the
/// single `ModeState` aggregate and the queue of notices for the host.
pub struct StealthMode {
    config: Config,
    store: ConfigStore,
    state: ModeState,
    rng: StdRng,
    notices: Vec<ModeNotice>,
}

impl StealthMode {
    pub fn new(config: Config, store: ConfigStore, seed: u64) -> Self {
        Self {
            config,
            store,
            state: ModeState::default(),
            rng: StdRng::seed_from_u64(seed),
            notices: Vec::new(),
        }
    }

    /// Loads the persisted config, falling back to defaults on any failure.
    pub fn load(store: ConfigStore, seed: u64) -> Self {
        let config = store.load_or_default();
        Self::new(config, store, seed)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// For operator tooling between handler invocations.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ModeState {
        &mut self.state
    }

    pub fn is_subject(&self, participant: ParticipantId) -> bool {
        self.state.running_subject() == Some(participant)
    }

    pub fn handle_event<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        event: &GameEvent,
        now_ms: u64,
    ) {
        match event {
            GameEvent::WeaponFire { shooter, weapon } => {
                self.on_weapon_fire(registry, *shooter, weapon, now_ms)
            }
            GameEvent::Footstep { participant } => {
                self.on_subject_action(registry, *participant, TriggerKind::Footstep, now_ms)
            }
            GameEvent::Jump { participant } => {
                self.on_subject_action(registry, *participant, TriggerKind::Jump, now_ms)
            }
            GameEvent::BombBeginPlant { participant } => {
                self.on_subject_action(registry, *participant, TriggerKind::BombPlant, now_ms)
            }
            GameEvent::BombBeginDefuse { participant } => {
                self.on_subject_action(registry, *participant, TriggerKind::BombDefuse, now_ms)
            }
            GameEvent::GrenadeThrown { participant } => {
                self.on_subject_action(registry, *participant, TriggerKind::GrenadeThrow, now_ms)
            }
            GameEvent::PlayerHurt {
                victim, attacker, ..
            } => self.on_player_hurt(registry, *victim, *attacker, now_ms),
            GameEvent::PlayerSpawn { participant } => {
                if self.is_subject(*participant) {
                    self.recalc_bonus_health(registry);
                }
            }
            GameEvent::RoundStart => self.on_round_start(registry),
            GameEvent::MapStart => self.on_map_start(),
            GameEvent::PlayerDisconnect { participant } => self.on_disconnect(*participant),
        }
    }

    /// Runs an operator command. Failures become a notice for the caller.
    pub fn execute<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        caller: Option<ParticipantId>,
        command: ModeCommand,
    ) -> Result<(), ModeError> {
        let result = self.run_command(registry, caller, command);
        if let Err(err) = &result {
            self.reply(caller, &err.to_string());
        }
        result
    }

    fn run_command<R: ParticipantRegistry>(
        &mut self,
        registry: &mut R,
        caller: Option<ParticipantId>,
        command: ModeCommand,
    ) -> Result<(), ModeError> {
        match command {
            ModeCommand::Select(selector) => {
                self.select(registry, &selector, caller)?;
            }
            ModeCommand::Random => {
                self.select_random(registry)?;
            }
            ModeCommand::Start => self.start(registry),
            ModeCommand::Stop => self.stop(),
            ModeCommand::Reload => {
                self.reload_config()?;
                self.reply(caller, "Config reloaded.");
                self.recalc_bonus_health(registry);
            }
            ModeCommand::Save => {
                self.save_config()?;
                self.reply(caller, "Config saved.");
            }
        }
        Ok(())
    }

    pub fn reload_config(&mut self) -> Result<(), ModeError> {
        self.config = self.store.load()?;
        Ok(())
    }

    pub fn save_config(&self) -> Result<(), ModeError> {
        self.store.save(&self.config)?;
        info!(path = %self.store.path().display(), "config saved");
        Ok(())
    }

    pub fn drain_notices(&mut self) -> Vec<ModeNotice> {
        std::mem::take(&mut self.notices)
    }

    pub fn snapshot<R: ParticipantRegistry>(&self, registry: &R, now_ms: u64) -> ModeSnapshot {
        let subject_name = self
            .state
            .subject
            .and_then(|id| registry.participant(id))
            .map(|p| display_name(&p.name).to_string());
        ModeSnapshot {
            active: self.state.active,
            subject: self.state.subject,
            subject_name,
            visible_until_ms: self.state.reveal.visible_until_ms(),
            visible_now: self.state.running_subject().is_some()
                && self.subject_visible(registry, now_ms),
            pending_credits: self.state.ledger.views(now_ms),
        }
    }

    fn on_round_start<R: ParticipantRegistry>(&mut self, registry: &mut R) {
        if self.state.running_subject().is_none() {
            return;
        }
        self.state.reset_round();
        self.recalc_bonus_health(registry);
    }

    fn on_map_start(&mut self) {
        if self.state.subject.is_none() && !self.state.active {
            return;
        }
        info!("map changed, stealth mode reset");
        self.state.clear();
    }

    fn on_disconnect(&mut self, participant: ParticipantId) {
        if self.state.subject == Some(participant) {
            warn!(subject = %participant, "stealth subject disconnected");
            self.state.subject = None;
            self.state.reset_round();
            self.broadcast("Stealth subject left the server.");
            return;
        }
        let dropped = self.state.ledger.forget(participant);
        if dropped > 0 {
            debug!(shooter = %participant, dropped, "credits dropped on disconnect");
        }
    }

    fn broadcast(&mut self, message: &str) {
        self.notices.push(ModeNotice {
            audience: Audience::All,
            message: format!("{CHAT_PREFIX} {message}"),
        });
    }

    fn reply(&mut self, caller: Option<ParticipantId>, message: &str) {
        let audience = match caller {
            Some(id) => Audience::Participant(id),
            None => Audience::Console,
        };
        self.notices.push(ModeNotice {
            audience,
            message: format!("{CHAT_PREFIX} {message}"),
        });
    }
}


#[cfg(test)]
mod tests {
    use std::fs;

    use super::tests_support::*;
    use crate::command::{parse_line, ModeCommand, TargetSelector};
    use crate::error::ModeError;
    use crate::registry::ParticipantRegistry;
    use crate::types::{Audience, GameEvent, TransmitList};

    #[test]
    fn scenario_c_footstep_opens_short_window_for_all_observers() {
        let (mut mode, mut registry) = running_mode();
        let body = body_of(SUBJECT);
        let fresh_lists = || -> Vec<TransmitList> {
            [SUBJECT, ENEMY_A, ENEMY_B, SPECTATOR]
                .into_iter()
                .map(|observer| TransmitList {
                    observer,
                    entities: [body].into_iter().collect(),
                })
                .collect()
        };

        let mut lists = fresh_lists();
        assert_eq!(mode.filter_transmit(&registry, &mut lists, 1_000), 3);

        mode.handle_event(
            &mut registry,
            &GameEvent::Footstep {
                participant: SUBJECT,
            },
            1_000,
        );
        for now in [1_000, 1_150, 1_300] {
            let mut lists = fresh_lists();
            assert_eq!(mode.filter_transmit(&registry, &mut lists, now), 0);
        }

        let mut lists = fresh_lists();
        assert_eq!(mode.filter_transmit(&registry, &mut lists, 1_301), 3);
        assert!(lists[0].entities.contains(&body));
    }

    #[test]
    fn round_start_invalidates_credits_and_reveal() {
        let (mut mode, mut registry) = running_mode();
        mode.handle_event(
            &mut registry,
            &GameEvent::WeaponFire {
                shooter: ENEMY_A,
                weapon: "weapon_ak47".to_string(),
            },
            1_000,
        );
        mode.trigger_reveal(crate::types::TriggerKind::Jump, 1_050);
        mode.handle_event(&mut registry, &GameEvent::RoundStart, 1_100);
        assert!(mode.state().ledger.is_empty());
        assert_eq!(mode.state().reveal.visible_until_ms(), None);
        assert_eq!(mode.state().subject, Some(SUBJECT));
    }

    #[test]
    fn map_start_clears_everything() {
        let (mut mode, mut registry) = running_mode();
        mode.handle_event(&mut registry, &GameEvent::MapStart, 1_000);
        assert_eq!(mode.state().subject, None);
        assert!(!mode.state().active);
    }

    #[test]
    fn subject_disconnect_keeps_mode_active_without_subject() {
        let (mut mode, mut registry) = running_mode();
        registry.remove(SUBJECT);
        mode.handle_event(
            &mut registry,
            &GameEvent::PlayerDisconnect {
                participant: SUBJECT,
            },
            1_000,
        );
        assert!(mode.state().active);
        assert_eq!(mode.state().subject, None);
        assert_eq!(mode.drain_notices().len(), 1);
    }

    #[test]
    fn shooter_disconnect_drops_their_credits() {
        let (mut mode, mut registry) = running_mode();
        mode.handle_event(
            &mut registry,
            &GameEvent::WeaponFire {
                shooter: ENEMY_A,
                weapon: "weapon_ak47".to_string(),
            },
            1_000,
        );
        mode.handle_event(
            &mut registry,
            &GameEvent::PlayerDisconnect {
                participant: ENEMY_A,
            },
            1_010,
        );
        assert!(mode.state().ledger.is_empty());
    }

    #[test]
    fn vanished_subject_filters_nothing_and_taxes_nothing() {
        let (mut mode, mut registry) = running_mode();
        registry.remove(SUBJECT);
        let mut lists = vec![TransmitList {
            observer: ENEMY_A,
            entities: [body_of(SUBJECT)].into_iter().collect(),
        }];
        assert_eq!(mode.filter_transmit(&registry, &mut lists, 1_000), 0);
        mode.handle_event(
            &mut registry,
            &GameEvent::WeaponFire {
                shooter: ENEMY_A,
                weapon: "weapon_ak47".to_string(),
            },
            1_000,
        );
        assert_eq!(registry_health(&registry, ENEMY_A), 100);
    }

    #[test]
    fn failed_command_replies_to_caller_only() {
        let (mut mode, mut registry) = idle_mode();
        let result = mode.execute(
            &mut registry,
            Some(ENEMY_A),
            ModeCommand::Select(TargetSelector::Name("nobody".to_string())),
        );
        assert!(matches!(result, Err(ModeError::TargetNotFound(_))));
        let notices = mode.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].audience, Audience::Participant(ENEMY_A));
        assert!(notices[0].message.contains("No player found for 'nobody'."));
    }

    #[test]
    fn parsed_chat_line_drives_selection() {
        let (mut mode, mut registry) = idle_mode();
        let command = parse_line("!ghost @me")
            .expect("recognized")
            .expect("well formed");
        mode.execute(&mut registry, Some(ENEMY_D), command)
            .expect("caller exists");
        assert_eq!(mode.state().subject, Some(ENEMY_D));
        // Nash is a counter-terrorist facing two live terrorists.
        assert_eq!(registry_health(&registry, ENEMY_D), 200);
    }

    #[test]
    fn reload_picks_up_edited_document() {
        let path = std::env::temp_dir()
            .join(format!("stealth-mode-reload-{}", std::process::id()))
            .join("config.json");
        let store = store_at(path.clone());
        let mut mode = super::StealthMode::load(store, 1);
        assert!(path.is_file());
        let mut registry = registry();

        fs::write(&path, r#"{ "RevealSeconds": 1.5 }"#).expect("write config");
        mode.execute(&mut registry, None, ModeCommand::Reload)
            .expect("reload succeeds");
        assert_eq!(mode.config().reveal_seconds, 1.5);
        let notices = mode.drain_notices();
        assert_eq!(notices.last().map(|n| n.audience), Some(Audience::Console));
    }

    #[test]
    fn save_then_reload_round_trips_operator_changes() {
        let (mut mode, mut registry) = idle_mode();
        mode.config_mut().miss_window_seconds = 2.0;
        mode.execute(&mut registry, None, ModeCommand::Save)
            .expect("save succeeds");
        mode.config_mut().miss_window_seconds = 0.1;
        mode.execute(&mut registry, None, ModeCommand::Reload)
            .expect("reload succeeds");
        assert_eq!(mode.config().miss_window_seconds, 2.0);
    }

    #[test]
    fn snapshot_reports_subject_and_credits() {
        let (mut mode, mut registry) = running_mode();
        mode.handle_event(
            &mut registry,
            &GameEvent::WeaponFire {
                shooter: ENEMY_B,
                weapon: "weapon_awp".to_string(),
            },
            1_000,
        );
        let snapshot = mode.snapshot(&registry, 1_000);
        assert!(snapshot.active);
        assert_eq!(snapshot.subject, Some(SUBJECT));
        assert_eq!(snapshot.subject_name.as_deref(), Some("Ghost"));
        assert!(!snapshot.visible_now);
        assert_eq!(snapshot.pending_credits.len(), 1);
        assert_eq!(snapshot.pending_credits[0].shooter, ENEMY_B);
        assert_eq!(snapshot.pending_credits[0].amount, 5);
        assert_eq!(snapshot.pending_credits[0].expires_at_ms, 1_750);
    }
}
