use axum::{
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use log::info;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};
use std::sync::Arc;
use crate::domain::authority::{Collaborators, WeaponAuthority};
use crate::domain::error::WeaponError;
use crate::domain::hitscan::RosterPhysics;
use crate::domain::scatter::scatter_rng;
use crate::handlers::http::{despawn_weapon, get_weapon, health, list_weapons, spawn_weapon, AppState};
use crate::handlers::udp::{handle_udp_packet, notify_player_left, parse_packet};
use crate::state::WeaponId;
use crate::state::commands::WeaponCommand;
use crate::state::server_state::{ServerState, WeaponHandle};
use crate::tick::weapon_tick::weapon_tick_loop;
use crate::utils::weapondb::WeaponDb;
use crate::utils::config::Config;

/// Start HTTP and UDP servers and the inactivity sweep
pub async fn start_servers(
    state: Arc<ServerState>,
    weapons: Arc<WeaponDb>,
    config: Arc<Config>,
    udp_socket: Arc<UdpSocket>,
    physics: Arc<RosterPhysics>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = AppState {
        state: state.clone(),
        weapons,
        config: config.clone(),
        udp_socket: udp_socket.clone(),
        physics,
    };
    let http_server = init_http_server(app_state);
    let udp_server = init_udp_server(state.clone(), udp_socket, config.clone());
    let sweeper = init_inactivity_sweep(state, config);

    tokio::try_join!(http_server, udp_server, sweeper)?;
    Ok(())
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/weapons", get(list_weapons).post(spawn_weapon))
        .route("/weapons/:id", get(get_weapon).delete(despawn_weapon))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Initialize HTTP server
fn init_http_server(app_state: AppState) -> tokio::task::JoinHandle<()> {
    let http_addr = format!("0.0.0.0:{}", app_state.config.http_port);
    let app = router(app_state);
    info!("Starting HTTP server on {}", http_addr);

    tokio::spawn(async move {
        let listener = match TcpListener::bind(&http_addr).await {
            Ok(listener) => {
                info!("HTTP server successfully bound to {}", http_addr);
                listener
            }
            Err(e) => {
                log::error!("Failed to bind HTTP server to {}: {}", http_addr, e);
                return;
            }
        };

        if let Err(e) = axum::serve(listener, app).await {
            log::error!("HTTP server error: {}", e);
        }
    })
}

/// Initialize UDP server
fn init_udp_server(
    state: Arc<ServerState>,
    socket: Arc<UdpSocket>,
    config: Arc<Config>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];

        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, addr)) => {
                    if let Some(packet) = parse_packet(&buf[..len]) {
                        handle_udp_packet(packet, addr, &state, &socket, &config).await;
                    }
                }
                Err(e) => {
                    log::error!("UDP recv error: {}", e);
                }
            }
        }
    })
}

/// Drop players that stopped talking; their weapons fall to the ground
fn init_inactivity_sweep(state: Arc<ServerState>, config: Arc<Config>) -> tokio::task::JoinHandle<()> {
    let timeout = Duration::from_secs(config.player_inactivity_timeout_secs);
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            for player_id in state.stale_players(timeout) {
                if state.remove_player(player_id).is_some() {
                    info!("Player {} timed out", player_id);
                    notify_player_left(&state, player_id);
                }
            }
        }
    })
}

/// Create a new weapon and spawn its actor
pub fn spawn_weapon_with_tick(
    state: Arc<ServerState>,
    kind: u32,
    weapons: &WeaponDb,
    config: Arc<Config>,
    physics: Arc<RosterPhysics>,
    socket: Arc<UdpSocket>,
) -> Result<WeaponId, WeaponError> {
    if !state.try_reserve_weapon_slot(config.max_weapons) {
        return Err(WeaponError::TooManyWeapons(config.max_weapons));
    }

    let weapon_id = state.next_weapon_id();
    let collaborators = Collaborators {
        combatants: state.clone(),
        physics,
        rights: state.rights(),
    };
    let seed = config.rng_seed.map(|seed| seed.wrapping_add(u64::from(weapon_id)));
    let authority = match WeaponAuthority::init(weapon_id, kind, weapons, collaborators, scatter_rng(seed)) {
        Ok(authority) => authority,
        Err(e) => {
            state.release_weapon_slot();
            return Err(e);
        }
    };

    // Create command channel
    let (tx, rx) = mpsc::channel::<WeaponCommand>(config.command_queue_capacity);
    let (snapshot_tx, snapshot_rx) = watch::channel(authority.snapshot());

    // Spawn tick loop
    let task_handle = tokio::spawn(weapon_tick_loop(
        authority,
        rx,
        tx.clone(),
        snapshot_tx,
        socket,
        state.clone(),
        config,
    ));

    state.insert_weapon(weapon_id, WeaponHandle {
        command_tx: tx,
        task_handle,
        snapshot: snapshot_rx,
    });

    Ok(weapon_id)
}
