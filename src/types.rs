use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Network entity handle of a participant's physical body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Unassigned,
    Spectator,
    Terrorist,
    CounterTerrorist,
}

impl Team {
    pub fn is_combat(self) -> bool {
        matches!(self, Self::Terrorist | Self::CounterTerrorist)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Ground-plane speed; the vertical component is ignored.
    pub fn horizontal_speed(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Point-in-time view of a participant as reported by the host registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default)]
    pub team: Team,
    #[serde(default)]
    pub alive: bool,
    #[serde(default)]
    pub body: Option<EntityId>,
    #[serde(default)]
    pub health: i32,
    #[serde(rename = "maxHealth", default)]
    pub max_health: i32,
    #[serde(default)]
    pub velocity: Vec3,
}

impl Participant {
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicatedField {
    Health,
    MaxHealth,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    WeaponFire,
    Footstep,
    Jump,
    BombPlant,
    BombDefuse,
    GrenadeThrow,
    Damage,
}

impl TriggerKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::WeaponFire => "weapon_fire",
            Self::Footstep => "footstep",
            Self::Jump => "jump",
            Self::BombPlant => "begin_plant",
            Self::BombDefuse => "begin_defuse",
            Self::GrenadeThrow => "grenade",
            Self::Damage => "damage",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    WeaponFire {
        shooter: ParticipantId,
        weapon: String,
    },
    Footstep {
        participant: ParticipantId,
    },
    Jump {
        participant: ParticipantId,
    },
    BombBeginPlant {
        participant: ParticipantId,
    },
    BombBeginDefuse {
        participant: ParticipantId,
    },
    GrenadeThrown {
        participant: ParticipantId,
    },
    PlayerHurt {
        victim: ParticipantId,
        #[serde(default)]
        attacker: Option<ParticipantId>,
        #[serde(default)]
        damage: i32,
    },
    PlayerSpawn {
        participant: ParticipantId,
    },
    RoundStart,
    MapStart,
    PlayerDisconnect {
        participant: ParticipantId,
    },
}

/// Entities scheduled for replication to one observer during a visibility refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmitList {
    pub observer: ParticipantId,
    pub entities: BTreeSet<EntityId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Audience {
    All,
    Participant(ParticipantId),
    Console,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModeNotice {
    pub audience: Audience,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PendingCreditView {
    pub shooter: ParticipantId,
    pub amount: i32,
    #[serde(rename = "expiresAtMs")]
    pub expires_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModeSnapshot {
    pub active: bool,
    pub subject: Option<ParticipantId>,
    #[serde(rename = "subjectName")]
    pub subject_name: Option<String>,
    #[serde(rename = "visibleUntilMs")]
    pub visible_until_ms: Option<u64>,
    #[serde(rename = "visibleNow")]
    pub visible_now: bool,
    #[serde(rename = "pendingCredits")]
    pub pending_credits: Vec<PendingCreditView>,
}
