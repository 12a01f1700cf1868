use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use crate::domain::error::WeaponError;
use crate::domain::hitscan::RosterPhysics;
use crate::handlers::models::{ErrorResponse, HealthResponse, SpawnWeaponRequest, WeaponInfo};
use crate::state::WeaponId;
use crate::state::commands::{try_enqueue, WeaponCommand};
use crate::state::server_state::ServerState;
use crate::state::weapon::WeaponSnapshot;
use crate::utils::weapondb::WeaponDb;
use crate::utils::config::Config;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// App state for HTTP handlers (includes server state and dependencies)
#[derive(Clone)]
pub struct AppState {
    pub state: Arc<ServerState>,
    pub weapons: Arc<WeaponDb>,
    pub config: Arc<Config>,
    pub udp_socket: Arc<UdpSocket>,
    pub physics: Arc<RosterPhysics>,
}

fn weapon_info(weapons: &WeaponDb, snapshot: WeaponSnapshot) -> WeaponInfo {
    let name = weapons
        .get(snapshot.kind)
        .map(|def| def.name.clone())
        .unwrap_or_default();
    WeaponInfo {
        weapon_id: snapshot.weapon_id,
        name,
        state: snapshot,
    }
}

/// Thin HTTP handler: Spawn weapon into the world
pub async fn spawn_weapon(
    State(app_state): State<AppState>,
    Json(request): Json<SpawnWeaponRequest>,
) -> Result<(StatusCode, Json<WeaponInfo>), (StatusCode, Json<ErrorResponse>)> {
    let kind = request.kind.unwrap_or_else(WeaponDb::default_weapon_id);

    let weapon_id = crate::server::spawn_weapon_with_tick(
        app_state.state.clone(),
        kind,
        &app_state.weapons,
        app_state.config.clone(),
        app_state.physics.clone(),
        app_state.udp_socket.clone(),
    )
    .map_err(|e| {
        log::warn!("Failed to spawn weapon kind {}: {}", kind, e);
        let status = match e {
            WeaponError::TooManyWeapons(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(ErrorResponse { error: e.to_string() }))
    })?;

    let snapshot = app_state
        .state
        .weapon_snapshot(weapon_id)
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: "weapon vanished after spawn".to_string() }),
            )
        })?;

    Ok((StatusCode::CREATED, Json(weapon_info(&app_state.weapons, snapshot))))
}

/// Thin HTTP handler: List all weapons
pub async fn list_weapons(
    State(app_state): State<AppState>,
) -> Json<Vec<WeaponInfo>> {
    let infos = app_state
        .state
        .weapon_snapshots()
        .into_iter()
        .map(|snapshot| weapon_info(&app_state.weapons, snapshot))
        .collect();
    Json(infos)
}

/// Thin HTTP handler: Get weapon state
pub async fn get_weapon(
    State(app_state): State<AppState>,
    Path(weapon_id): Path<WeaponId>,
) -> Result<Json<WeaponInfo>, StatusCode> {
    let snapshot = app_state.state.weapon_snapshot(weapon_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(weapon_info(&app_state.weapons, snapshot)))
}

/// Thin HTTP handler: Despawn weapon (asynchronous, the actor tears itself down)
pub async fn despawn_weapon(
    State(app_state): State<AppState>,
    Path(weapon_id): Path<WeaponId>,
) -> StatusCode {
    let Some(tx) = app_state.state.get_weapon_tx(weapon_id) else {
        return StatusCode::NOT_FOUND;
    };
    if try_enqueue(&tx, WeaponCommand::Despawn) {
        StatusCode::ACCEPTED
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn health(
    State(app_state): State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        weapons: app_state.state.weapon_count(),
        players: app_state.state.player_count(),
        udp_port: app_state.config.udp_port,
    })
}
