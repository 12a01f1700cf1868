use serde::{Deserialize, Serialize};
use crate::domain::geometry::Vec2;
use crate::state::{PlayerId, WeaponId};
use crate::state::commands::{ContactKind, Intent};
use crate::state::replicated::{FieldTag, FieldValue, JournalEntry, Sequenced};
use crate::state::weapon::WeaponSnapshot;

/// Presentation-only notification; never rejected, safe to drop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectBroadcast {
    PlayMuzzleVfx,
    SpawnHitEffect { point: Vec2, normal: Vec2 },
    DrawTracer { start: Vec2, end: Vec2, direction: Vec2 },
    EjectCasing,
}

/// Server -> client datagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        player_id: PlayerId,
    },
    FieldChanged {
        weapon_id: WeaponId,
        seq: u64,
        field: FieldTag,
        old: FieldValue,
        new: FieldValue,
    },
    Effect {
        weapon_id: WeaponId,
        seq: u64,
        effect: EffectBroadcast,
    },
    WeaponSnapshot {
        snapshot: WeaponSnapshot,
    },
    WeaponDestroyed {
        weapon_id: WeaponId,
    },
}

impl ServerMessage {
    pub fn from_journal(weapon_id: WeaponId, item: &Sequenced) -> Self {
        match &item.entry {
            JournalEntry::Field(change) => ServerMessage::FieldChanged {
                weapon_id,
                seq: item.seq,
                field: change.field,
                old: change.old,
                new: change.new,
            },
            JournalEntry::Effect(effect) => ServerMessage::Effect {
                weapon_id,
                seq: item.seq,
                effect: *effect,
            },
        }
    }

    /// Weapon this message belongs to, if any
    pub fn weapon_id(&self) -> Option<WeaponId> {
        match self {
            ServerMessage::Welcome { .. } => None,
            ServerMessage::FieldChanged { weapon_id, .. }
            | ServerMessage::Effect { weapon_id, .. }
            | ServerMessage::WeaponDestroyed { weapon_id } => Some(*weapon_id),
            ServerMessage::WeaponSnapshot { snapshot } => Some(snapshot.weapon_id),
        }
    }
}

/// Client -> server datagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientPacket {
    Join {
        player_id: PlayerId,
        #[serde(default)]
        player_name: String,
    },
    Leave {
        player_id: PlayerId,
    },
    PositionUpdate {
        player_id: PlayerId,
        position: Vec2,
        facing: Vec2,
    },
    #[serde(alias = "keepalive")]
    Heartbeat {
        player_id: PlayerId,
    },
    Intent {
        player_id: PlayerId,
        weapon_id: WeaponId,
        intent: Intent,
    },
    /// Trigger-volume report from the physics host
    Contact {
        weapon_id: WeaponId,
        player_id: PlayerId,
        kind: ContactKind,
    },
}
