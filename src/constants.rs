pub const TICK_RATE: u32 = 64;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const DEFAULT_REVEAL_SECONDS: f64 = 0.3;
pub const DEFAULT_MISS_WINDOW_SECONDS: f64 = 0.75;
pub const DEFAULT_DAMAGE_REVEAL_SECONDS: f64 = 0.35;
pub const MIN_WINDOW_SECONDS: f64 = 0.01;

pub const DEFAULT_RUN_REVEAL_SPEED: f32 = 131.0;

pub const DEFAULT_SHOTGUN_PENALTY_HP: i32 = 8;
pub const DEFAULT_SNIPER_PENALTY_HP: i32 = 5;
pub const DEFAULT_SMG_PENALTY_HP: i32 = 2;
pub const DEFAULT_PISTOL_PENALTY_HP: i32 = 2;
pub const DEFAULT_RIFLE_PENALTY_HP: i32 = 2;
pub const DEFAULT_LMG_PENALTY_HP: i32 = 2;
pub const DEFAULT_GRENADE_PENALTY_HP: i32 = 0;
pub const DEFAULT_KNIFE_PENALTY_HP: i32 = 2;
pub const DEFAULT_FALLBACK_PENALTY_HP: i32 = 2;

pub const DEFAULT_BONUS_HEALTH_PER_ENEMY: i32 = 100;

/// Used for refunds when the host reports no max health.
pub const FALLBACK_MAX_HEALTH: i32 = 100;

pub const CONFIG_PATH_ENV: &str = "STEALTH_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = ".data/stealth_mode.json";

pub const CHAT_PREFIX: &str = "[Stealth]";

/// Converts a configured duration to whole milliseconds, never below the minimum window.
pub fn window_ms(seconds: f64) -> u64 {
    let seconds = if seconds.is_finite() {
        seconds.max(MIN_WINDOW_SECONDS)
    } else {
        MIN_WINDOW_SECONDS
    };
    (seconds * 1000.0).round() as u64
}

pub fn bonus_health_total(per_enemy: i32, enemies: usize) -> i32 {
    let per = per_enemy.max(1);
    let enemies = i32::try_from(enemies.max(1)).unwrap_or(i32::MAX);
    per.max(per.saturating_mul(enemies))
}
