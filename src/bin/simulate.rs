use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use stealth_mode_rust_server::config::Config;
use stealth_mode_rust_server::config_store::ConfigStore;
use stealth_mode_rust_server::constants::{TICK_MS, TICK_RATE};
use stealth_mode_rust_server::engine::{now_ms, StealthMode};
use stealth_mode_rust_server::registry::{InMemoryRegistry, ParticipantRegistry};
use stealth_mode_rust_server::types::{
    EntityId, GameEvent, Participant, ParticipantId, Team, TransmitList, Vec3,
};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const WEAPONS: [&str; 10] = [
    "weapon_ak47",
    "weapon_m4a1",
    "weapon_awp",
    "weapon_nova",
    "weapon_mp9",
    "weapon_glock",
    "weapon_deagle",
    "weapon_negev",
    "weapon_knife",
    "weapon_hegrenade",
];

const ENEMY_FIRE_CHANCE: f64 = 0.06;
const HIT_CHANCE_HIDDEN: f64 = 0.12;
const HIT_CHANCE_VISIBLE: f64 = 0.45;
const SUBJECT_STEP_CHANCE: f64 = 0.03;
const SUBJECT_JUMP_CHANCE: f64 = 0.005;
const SUBJECT_FIRE_CHANCE: f64 = 0.01;
const SUBJECT_SPRINT_CHANCE: f64 = 0.15;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    /// Total participants, split evenly between the combat teams.
    #[arg(long, default_value_t = 10)]
    players: usize,
    #[arg(long, default_value_t = 120)]
    seconds: u64,
    /// Config document to run with. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Serialize)]
struct SkirmishStats {
    #[serde(rename = "shotsAtSubject")]
    shots_at_subject: u32,
    #[serde(rename = "shotsTaxed")]
    shots_taxed: u32,
    #[serde(rename = "hpTaxed")]
    hp_taxed: i64,
    refunds: u32,
    #[serde(rename = "hpRefunded")]
    hp_refunded: i64,
    #[serde(rename = "penaltyKills")]
    penalty_kills: usize,
    #[serde(rename = "subjectHits")]
    subject_hits: u32,
    rounds: u32,
    #[serde(rename = "visibleTicks")]
    visible_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    seed: u64,
    players: usize,
    subject: Option<ParticipantId>,
    ticks: u64,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "visibleFraction")]
    visible_fraction: f64,
    stats: SkirmishStats,
    anomalies: Vec<String>,
}

struct SkirmishResult {
    subject: Option<ParticipantId>,
    ticks: u64,
    stats: SkirmishStats,
    anomalies: Vec<String>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(now_ms);
    let players = cli.players.max(2);
    let config = match cli.config.as_ref() {
        Some(path) => ConfigStore::new(path.clone()).load_or_default(),
        None => Config::default(),
    };
    let store = ConfigStore::new(
        cli.config
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("stealth-simulate.json")),
    );

    let started_at_ms = now_ms();
    let run_id = default_run_id(seed, started_at_ms);
    info!(%run_id, seed, players, seconds = cli.seconds, "skirmish started");

    let mut mode = StealthMode::new(config, store, seed);
    let result = run_skirmish(&mut mode, seed, players, cli.seconds * u64::from(TICK_RATE));
    let summary = build_run_summary(run_id, seed, players, started_at_ms, now_ms(), result);

    for anomaly in &summary.anomalies {
        warn!(run_id = %summary.run_id, anomaly = %anomaly, "anomaly detected");
    }
    match serde_json::to_string(&summary) {
        Ok(line) => println!("{line}"),
        Err(err) => error!(error = %err, "failed to serialize summary"),
    }

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            error!(path = %path.display(), error = %err, "summary write failed");
            std::process::exit(2);
        }
        info!(path = %path.display(), "summary written");
    }

    info!(
        run_id = %summary.run_id,
        shots_taxed = summary.stats.shots_taxed,
        refunds = summary.stats.refunds,
        penalty_kills = summary.stats.penalty_kills,
        visible_fraction = summary.visible_fraction,
        "skirmish finished"
    );
    if !summary.anomalies.is_empty() {
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn build_roster(players: usize) -> Vec<Participant> {
    (1..=players)
        .map(|idx| {
            let id = ParticipantId(idx as u32);
            let team = if idx % 2 == 1 {
                Team::Terrorist
            } else {
                Team::CounterTerrorist
            };
            Participant {
                id,
                name: format!("Bot-{idx:02}"),
                team,
                alive: true,
                body: Some(EntityId(1_000 + idx as u32)),
                health: 100,
                max_health: 100,
                velocity: Vec3::ZERO,
            }
        })
        .collect()
}

fn run_skirmish(mode: &mut StealthMode, seed: u64, players: usize, ticks: u64) -> SkirmishResult {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut registry = InMemoryRegistry::new(build_roster(players));
    let mut stats = SkirmishStats::default();
    let mut anomalies = Vec::new();
    let mut anomaly_seen = HashSet::new();

    let subject = match mode.select_random(&mut registry) {
        Ok(id) => id,
        Err(err) => {
            anomalies.push(err.to_string());
            return SkirmishResult {
                subject: None,
                ticks: 0,
                stats,
                anomalies,
            };
        }
    };
    let subject_team = registry
        .participant(subject)
        .map(|p| p.team)
        .unwrap_or_default();
    stats.rounds = 1;

    for tick in 0..ticks {
        let now = tick * TICK_MS;
        drive_subject(mode, &mut registry, &mut rng, subject, now);

        let visible = mode.subject_visible(&registry, now);
        if visible {
            stats.visible_ticks += 1;
        }

        let shooters: Vec<ParticipantId> = registry
            .roster()
            .iter()
            .filter(|p| p.alive && p.team.is_combat() && p.team != subject_team)
            .map(|p| p.id)
            .collect();
        for shooter in shooters {
            if !rng.random_bool(ENEMY_FIRE_CHANCE) {
                continue;
            }
            enemy_volley(mode, &mut registry, &mut rng, &mut stats, shooter, subject, now);
        }

        check_filter(
            mode,
            &registry,
            subject,
            now,
            tick,
            &mut anomalies,
            &mut anomaly_seen,
        );
        mode.drain_notices();

        let subject_down = registry.participant(subject).map_or(true, |p| !p.alive);
        let enemies_down = registry
            .roster()
            .iter()
            .all(|p| !p.alive || p.team == subject_team || !p.team.is_combat());
        if subject_down || enemies_down {
            start_round(mode, &mut registry, now);
            stats.rounds += 1;
        }
    }

    stats.penalty_kills = registry.kills().len();
    SkirmishResult {
        subject: Some(subject),
        ticks,
        stats,
        anomalies,
    }
}

fn drive_subject(
    mode: &mut StealthMode,
    registry: &mut InMemoryRegistry,
    rng: &mut StdRng,
    subject: ParticipantId,
    now: u64,
) {
    let speed = if rng.random_bool(SUBJECT_SPRINT_CHANCE) {
        rng.random_range(130.0..250.0)
    } else {
        rng.random_range(0.0..120.0)
    };
    if let Some(participant) = registry.get_mut(subject) {
        participant.velocity = Vec3::new(speed, 0.0, 0.0);
    }

    let event = if rng.random_bool(SUBJECT_FIRE_CHANCE) {
        Some(GameEvent::WeaponFire {
            shooter: subject,
            weapon: "weapon_usp_silencer".to_string(),
        })
    } else if rng.random_bool(SUBJECT_JUMP_CHANCE) {
        Some(GameEvent::Jump {
            participant: subject,
        })
    } else if rng.random_bool(SUBJECT_STEP_CHANCE) {
        Some(GameEvent::Footstep {
            participant: subject,
        })
    } else {
        None
    };
    if let Some(event) = event {
        mode.handle_event(registry, &event, now);
    }
}

fn enemy_volley(
    mode: &mut StealthMode,
    registry: &mut InMemoryRegistry,
    rng: &mut StdRng,
    stats: &mut SkirmishStats,
    shooter: ParticipantId,
    subject: ParticipantId,
    now: u64,
) {
    let weapon = WEAPONS[rng.random_range(0..WEAPONS.len())];
    let visible = mode.subject_visible(registry, now);
    let before = health_of(registry, shooter);
    stats.shots_at_subject += 1;
    mode.handle_event(
        registry,
        &GameEvent::WeaponFire {
            shooter,
            weapon: weapon.to_string(),
        },
        now,
    );
    let after = health_of(registry, shooter);
    if after < before {
        stats.shots_taxed += 1;
        stats.hp_taxed += i64::from(before - after);
    }

    let hit_chance = if visible {
        HIT_CHANCE_VISIBLE
    } else {
        HIT_CHANCE_HIDDEN
    };
    if !rng.random_bool(hit_chance) {
        return;
    }
    let hit_at = now + rng.random_range(0..TICK_MS * 8);
    let damage = rng.random_range(8..40);
    let before = health_of(registry, shooter);
    mode.handle_event(
        registry,
        &GameEvent::PlayerHurt {
            victim: subject,
            attacker: Some(shooter),
            damage,
        },
        hit_at,
    );
    stats.subject_hits += 1;
    let after = health_of(registry, shooter);
    if after > before {
        stats.refunds += 1;
        stats.hp_refunded += i64::from(after - before);
    }

    if let Some(victim) = registry.get_mut(subject) {
        victim.health = (victim.health - damage).max(0);
        if victim.health == 0 {
            victim.alive = false;
        }
    }
}

fn start_round(mode: &mut StealthMode, registry: &mut InMemoryRegistry, now: u64) {
    let ids: Vec<ParticipantId> = registry.roster().iter().map(|p| p.id).collect();
    for id in ids {
        if let Some(participant) = registry.get_mut(id) {
            participant.alive = true;
            participant.health = 100;
            participant.max_health = 100;
        }
    }
    mode.handle_event(registry, &GameEvent::RoundStart, now);
}

fn check_filter(
    mode: &StealthMode,
    registry: &InMemoryRegistry,
    subject: ParticipantId,
    now: u64,
    tick: u64,
    anomalies: &mut Vec<String>,
    anomaly_seen: &mut HashSet<String>,
) {
    let Some(body) = registry.participant(subject).and_then(|p| p.body) else {
        return;
    };
    let mut lists: Vec<TransmitList> = registry
        .roster()
        .iter()
        .map(|observer| TransmitList {
            observer: observer.id,
            entities: [body].into_iter().collect(),
        })
        .collect();
    let visible = mode.subject_visible(registry, now);
    mode.filter_transmit(registry, &mut lists, now);

    for list in &lists {
        let sees = list.entities.contains(&body);
        let exempt = mode.config().spectators_see_subject
            && registry
                .participant(list.observer)
                .is_some_and(|p| !p.alive || p.team == Team::Spectator);
        let expected = visible || exempt || list.observer == subject;
        if sees != expected {
            push_anomaly(
                anomalies,
                anomaly_seen,
                tick,
                format!(
                    "observer {} sees subject={sees}, expected {expected}",
                    list.observer
                ),
            );
        }
    }
}

fn health_of(registry: &InMemoryRegistry, id: ParticipantId) -> i32 {
    registry.participant(id).map(|p| p.health).unwrap_or(0)
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    if anomaly_seen.insert(message.clone()) {
        warn!(tick, message = %message, "anomaly");
        anomalies.push(message);
    }
}

fn default_run_id(seed: u64, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    seed: u64,
    players: usize,
    started_at_ms: u64,
    finished_at_ms: u64,
    result: SkirmishResult,
) -> RunSummary {
    let visible_fraction = if result.ticks == 0 {
        0.0
    } else {
        result.stats.visible_ticks as f64 / result.ticks as f64
    };
    RunSummary {
        run_id,
        seed,
        players,
        subject: result.subject,
        ticks: result.ticks,
        started_at_ms,
        finished_at_ms,
        visible_fraction,
        stats: result.stats,
        anomalies: result.anomalies,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn fresh_mode(seed: u64) -> StealthMode {
        let store = ConfigStore::new(std::env::temp_dir().join("stealth-simulate-test.json"));
        StealthMode::new(Config::default(), store, seed)
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        assert_eq!(default_run_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn roster_alternates_combat_teams() {
        let roster = build_roster(4);
        let teams: Vec<Team> = roster.iter().map(|p| p.team).collect();
        assert_eq!(
            teams,
            vec![
                Team::Terrorist,
                Team::CounterTerrorist,
                Team::Terrorist,
                Team::CounterTerrorist
            ]
        );
        assert!(roster.iter().all(Participant::has_body));
    }

    #[test]
    fn same_seed_gives_same_skirmish() {
        let first = run_skirmish(&mut fresh_mode(9), 9, 8, 640);
        let second = run_skirmish(&mut fresh_mode(9), 9, 8, 640);
        assert_eq!(first.subject, second.subject);
        assert_eq!(first.stats.shots_taxed, second.stats.shots_taxed);
        assert_eq!(first.stats.refunds, second.stats.refunds);
        assert_eq!(first.stats.visible_ticks, second.stats.visible_ticks);
    }

    #[test]
    fn skirmish_reports_no_filter_anomalies() {
        let result = run_skirmish(&mut fresh_mode(3), 3, 10, 1_280);
        assert!(result.anomalies.is_empty(), "{:?}", result.anomalies);
        assert!(result.stats.shots_at_subject > 0);
        assert!(result.stats.refunds <= result.stats.shots_taxed);
    }

    #[test]
    fn summary_fraction_handles_empty_run() {
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            1,
            2,
            SkirmishResult {
                subject: None,
                ticks: 0,
                stats: SkirmishStats::default(),
                anomalies: Vec::new(),
            },
        );
        assert_eq!(summary.visible_fraction, 0.0);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let target = std::env::temp_dir()
            .join(format!("stealth-simulate-missing-{now}"))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            1,
            2,
            SkirmishResult {
                subject: None,
                ticks: 0,
                stats: SkirmishStats::default(),
                anomalies: Vec::new(),
            },
        );
        assert!(write_summary(&target, &summary).is_err());
    }
}
