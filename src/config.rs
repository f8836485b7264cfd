use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BONUS_HEALTH_PER_ENEMY, DEFAULT_DAMAGE_REVEAL_SECONDS, DEFAULT_FALLBACK_PENALTY_HP,
    DEFAULT_GRENADE_PENALTY_HP, DEFAULT_KNIFE_PENALTY_HP, DEFAULT_LMG_PENALTY_HP,
    DEFAULT_MISS_WINDOW_SECONDS, DEFAULT_PISTOL_PENALTY_HP, DEFAULT_REVEAL_SECONDS,
    DEFAULT_RIFLE_PENALTY_HP, DEFAULT_RUN_REVEAL_SPEED, DEFAULT_SHOTGUN_PENALTY_HP,
    DEFAULT_SMG_PENALTY_HP, DEFAULT_SNIPER_PENALTY_HP,
};
use crate::engine::weapons::WeaponClass;
use crate::types::TriggerKind;

/// Tunables for the stealth mode. Persisted as a flat JSON document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub reveal_seconds: f64,
    pub miss_window_seconds: f64,

    pub reveal_on_weapon_fire_enabled: bool,
    pub reveal_on_footstep_enabled: bool,
    pub reveal_on_jump_enabled: bool,
    pub reveal_on_plant_enabled: bool,
    pub reveal_on_defuse_enabled: bool,
    pub reveal_on_grenade_enabled: bool,

    pub run_reveal_enabled: bool,
    pub run_reveal_speed: f32,

    pub reveal_on_damage_enabled: bool,
    pub reveal_on_damage_seconds: f64,

    #[serde(rename = "ShotgunPenaltyHP")]
    pub shotgun_penalty_hp: i32,
    #[serde(rename = "SniperPenaltyHP")]
    pub sniper_penalty_hp: i32,
    #[serde(rename = "SMGPenaltyHP")]
    pub smg_penalty_hp: i32,
    #[serde(rename = "PistolPenaltyHP")]
    pub pistol_penalty_hp: i32,
    #[serde(rename = "RiflePenaltyHP")]
    pub rifle_penalty_hp: i32,
    #[serde(rename = "LMGPenaltyHP")]
    pub lmg_penalty_hp: i32,
    #[serde(rename = "GrenadePenaltyHP")]
    pub grenade_penalty_hp: i32,
    #[serde(rename = "KnifePenaltyHP")]
    pub knife_penalty_hp: i32,
    #[serde(rename = "DefaultPenaltyHP")]
    pub default_penalty_hp: i32,

    pub penalty_can_kill: bool,

    pub bonus_health_per_enemy_enabled: bool,
    pub bonus_health_per_enemy_amount: i32,

    /// Spectators and dead observers always receive the subject when set.
    pub spectators_see_subject: bool,

    pub debug_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reveal_seconds: DEFAULT_REVEAL_SECONDS,
            miss_window_seconds: DEFAULT_MISS_WINDOW_SECONDS,
            reveal_on_weapon_fire_enabled: true,
            reveal_on_footstep_enabled: true,
            reveal_on_jump_enabled: true,
            reveal_on_plant_enabled: true,
            reveal_on_defuse_enabled: true,
            reveal_on_grenade_enabled: true,
            run_reveal_enabled: true,
            run_reveal_speed: DEFAULT_RUN_REVEAL_SPEED,
            reveal_on_damage_enabled: true,
            reveal_on_damage_seconds: DEFAULT_DAMAGE_REVEAL_SECONDS,
            shotgun_penalty_hp: DEFAULT_SHOTGUN_PENALTY_HP,
            sniper_penalty_hp: DEFAULT_SNIPER_PENALTY_HP,
            smg_penalty_hp: DEFAULT_SMG_PENALTY_HP,
            pistol_penalty_hp: DEFAULT_PISTOL_PENALTY_HP,
            rifle_penalty_hp: DEFAULT_RIFLE_PENALTY_HP,
            lmg_penalty_hp: DEFAULT_LMG_PENALTY_HP,
            grenade_penalty_hp: DEFAULT_GRENADE_PENALTY_HP,
            knife_penalty_hp: DEFAULT_KNIFE_PENALTY_HP,
            default_penalty_hp: DEFAULT_FALLBACK_PENALTY_HP,
            penalty_can_kill: true,
            bonus_health_per_enemy_enabled: true,
            bonus_health_per_enemy_amount: DEFAULT_BONUS_HEALTH_PER_ENEMY,
            spectators_see_subject: false,
            debug_log: false,
        }
    }
}

impl Config {
    pub fn reveal_enabled(&self, kind: TriggerKind) -> bool {
        match kind {
            TriggerKind::WeaponFire => self.reveal_on_weapon_fire_enabled,
            TriggerKind::Footstep => self.reveal_on_footstep_enabled,
            TriggerKind::Jump => self.reveal_on_jump_enabled,
            TriggerKind::BombPlant => self.reveal_on_plant_enabled,
            TriggerKind::BombDefuse => self.reveal_on_defuse_enabled,
            TriggerKind::GrenadeThrow => self.reveal_on_grenade_enabled,
            TriggerKind::Damage => self.reveal_on_damage_enabled,
        }
    }

    pub fn reveal_seconds_for(&self, kind: TriggerKind) -> f64 {
        match kind {
            TriggerKind::Damage => self.reveal_on_damage_seconds,
            _ => self.reveal_seconds,
        }
    }

    pub fn penalty_for(&self, class: WeaponClass) -> i32 {
        match class {
            WeaponClass::Knife => self.knife_penalty_hp,
            WeaponClass::Shotgun => self.shotgun_penalty_hp,
            WeaponClass::Sniper => self.sniper_penalty_hp,
            WeaponClass::Smg => self.smg_penalty_hp,
            WeaponClass::Pistol => self.pistol_penalty_hp,
            WeaponClass::Rifle => self.rifle_penalty_hp,
            WeaponClass::Lmg => self.lmg_penalty_hp,
            WeaponClass::Grenade => self.grenade_penalty_hp,
            WeaponClass::Default => self.default_penalty_hp,
        }
    }

    /// Replaces values a hand-edited document can break with safe ones.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.reveal_seconds = sanitize_seconds(self.reveal_seconds, defaults.reveal_seconds);
        self.miss_window_seconds =
            sanitize_seconds(self.miss_window_seconds, defaults.miss_window_seconds);
        self.reveal_on_damage_seconds =
            sanitize_seconds(self.reveal_on_damage_seconds, defaults.reveal_on_damage_seconds);
        if !self.run_reveal_speed.is_finite() || self.run_reveal_speed < 0.0 {
            self.run_reveal_speed = defaults.run_reveal_speed;
        }
        for penalty in [
            &mut self.shotgun_penalty_hp,
            &mut self.sniper_penalty_hp,
            &mut self.smg_penalty_hp,
            &mut self.pistol_penalty_hp,
            &mut self.rifle_penalty_hp,
            &mut self.lmg_penalty_hp,
            &mut self.grenade_penalty_hp,
            &mut self.knife_penalty_hp,
            &mut self.default_penalty_hp,
        ] {
            *penalty = (*penalty).max(0);
        }
        self
    }
}

fn sanitize_seconds(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}
