use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use crate::state::PlayerId;
use crate::state::commands::{try_enqueue, WeaponCommand};
use crate::state::messages::{ClientPacket, ServerMessage};
use crate::state::server_state::{JoinOutcome, ServerState};
use crate::utils::config::Config;

/// Ultra-thin UDP packet handler - no locks in hot path
/// Routes the packet to the player roster or to a weapon's command queue
pub async fn handle_udp_packet(
    packet: ClientPacket,
    addr: SocketAddr,
    state: &Arc<ServerState>,
    socket: &UdpSocket,
    config: &Config,
) {
    match packet {
        ClientPacket::Join { player_id, player_name } => {
            let name = if player_name.is_empty() { "Unknown".to_string() } else { player_name };
            match state.upsert_player(player_id, name, addr) {
                JoinOutcome::Joined => {
                    state.set_aim_bonuses(player_id, config.aim_bonuses);
                    log::info!("Player {} joined from {}", player_id, addr);
                }
                JoinOutcome::Refreshed => {}
                JoinOutcome::Refused => {
                    log::warn!("Join for live player {} from foreign address {}", player_id, addr);
                    return;
                }
            }
            send_welcome(socket, player_id, addr).await;

            // Late joiners catch up from snapshots
            for tx in state.weapon_senders() {
                try_enqueue(&tx, WeaponCommand::SendSnapshot { addr });
            }
        }
        ClientPacket::Leave { player_id } => {
            if !state.player_addr_matches(player_id, addr) {
                log::debug!("Leave for player {} from foreign address {}", player_id, addr);
                return;
            }
            if state.remove_player(player_id).is_some() {
                log::info!("Player {} left", player_id);
                notify_player_left(state, player_id);
            }
        }
        ClientPacket::PositionUpdate { player_id, position, facing } => {
            if !state.player_addr_matches(player_id, addr) {
                log::debug!("Position update for unknown player {} from {}", player_id, addr);
                return;
            }
            state.update_position(player_id, position, facing);
        }
        ClientPacket::Heartbeat { player_id } => {
            if !state.touch_player(player_id, addr) {
                log::debug!("Heartbeat for player {} from unknown address {}", player_id, addr);
            }
        }
        ClientPacket::Intent { player_id, weapon_id, intent } => {
            // The authority trusts "who is asking"; make sure it is really them
            if !state.player_addr_matches(player_id, addr) {
                log::debug!("Intent for player {} from foreign address {}", player_id, addr);
                return;
            }
            let Some(tx) = state.get_weapon_tx(weapon_id) else {
                log::debug!("Intent for unknown weapon {}", weapon_id);
                return;
            };
            // Non-blocking send - drop if queue is full (prevents backpressure)
            if !try_enqueue(&tx, WeaponCommand::client(player_id, intent)) {
                log::debug!("Command queue full for weapon {}, dropping intent", weapon_id);
            }
        }
        ClientPacket::Contact { weapon_id, player_id, kind } => {
            if !contact_allowed(config, addr) {
                log::warn!("Contact report from untrusted address {}", addr);
                return;
            }
            let Some(tx) = state.get_weapon_tx(weapon_id) else {
                log::debug!("Contact for unknown weapon {}", weapon_id);
                return;
            };
            try_enqueue(&tx, WeaponCommand::Contact { player_id, kind });
        }
    }
}

/// Parse a datagram; malformed packets are logged and dropped
pub fn parse_packet(data: &[u8]) -> Option<ClientPacket> {
    match serde_json::from_slice::<ClientPacket>(data) {
        Ok(packet) => Some(packet),
        Err(e) => {
            log::debug!("Unparseable packet: {}", e);
            None
        }
    }
}

/// Tell every weapon a player is gone
pub fn notify_player_left(state: &ServerState, player_id: PlayerId) {
    for tx in state.weapon_senders() {
        try_enqueue(&tx, WeaponCommand::PlayerLeft { player_id });
    }
}

/// Contacts come from the physics host; only its address is trusted when configured
pub fn contact_allowed(config: &Config, addr: SocketAddr) -> bool {
    match &config.contact_source {
        None => true,
        Some(source) => *source == addr.to_string() || *source == addr.ip().to_string(),
    }
}

async fn send_welcome(socket: &UdpSocket, player_id: PlayerId, addr: SocketAddr) {
    match serde_json::to_vec(&ServerMessage::Welcome { player_id }) {
        Ok(data) => {
            if let Err(e) = socket.send_to(&data, addr).await {
                log::debug!("Failed to send welcome to {}: {:?}", addr, e);
            }
        }
        Err(e) => log::error!("Failed to encode welcome: {}", e),
    }
}
