use serde::{Deserialize, Serialize};
use crate::state::WeaponId;
use crate::state::weapon::WeaponSnapshot;

/// HTTP Request/Response DTOs

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct SpawnWeaponRequest {
    /// Weapon definition id, the default weapon when absent
    pub kind: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WeaponInfo {
    pub weapon_id: WeaponId,
    pub name: String,
    pub state: WeaponSnapshot,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub weapons: usize,
    pub players: usize,
    pub udp_port: u16,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
