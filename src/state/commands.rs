use std::net::SocketAddr;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use crate::state::PlayerId;

/// Client -> authority request. Validated against server-held state; may be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    StartShoot,
    ExecuteShootLogic,
    FinishShoot,
    StartReload,
    FinishReload,
    SetAim { aiming: bool },
    Pickup,
    #[serde(alias = "drop")]
    ForceDiscard,
}

/// Who asked. Server-originated intents skip the holder check, never the state guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Client(PlayerId),
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Enter,
    Exit,
}

/// Command sent from network handlers and timers to a weapon's actor
#[derive(Debug, Clone)]
pub enum WeaponCommand {
    Intent {
        origin: Origin,
        intent: Intent,
    },
    Contact {
        player_id: PlayerId,
        kind: ContactKind,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    /// Periodic destruction countdown wakeup, stamped with the epoch it was scheduled in
    DestructionTick {
        epoch: u64,
    },
    /// Server-driven shoot/reload keyframe, stamped with the epoch it was scheduled in
    Keyframe {
        epoch: u64,
        intent: Intent,
    },
    /// Send the full replicated state to one client (late join)
    SendSnapshot {
        addr: SocketAddr,
    },
    Despawn,
}

impl WeaponCommand {
    pub fn client(player_id: PlayerId, intent: Intent) -> Self {
        WeaponCommand::Intent {
            origin: Origin::Client(player_id),
            intent,
        }
    }

    pub fn keyframe(epoch: u64, intent: Intent) -> Self {
        WeaponCommand::Keyframe { epoch, intent }
    }
}

/// Enqueue without waiting; a full queue drops the command
/// Returns false when the command was not delivered
pub fn try_enqueue(tx: &mpsc::Sender<WeaponCommand>, cmd: WeaponCommand) -> bool {
    match tx.try_send(cmd) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(cmd)) => {
            log::debug!("Weapon command queue full, dropping {:?}", cmd);
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}
