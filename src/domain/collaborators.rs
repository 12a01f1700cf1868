//! Narrow interfaces to the systems the weapon logic leans on but does not own.

use serde::{Deserialize, Serialize};
use crate::domain::geometry::Vec2;
use crate::state::{PlayerId, WeaponId};

/// Holder stat modifiers applied while aiming, as fractions (0.2 = 20%)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AimBonuses {
    pub recoil: f32,
    pub view_range: f32,
    pub accuracy: f32,
}

/// Player roster as seen by weapons
pub trait Combatants: Send + Sync {
    fn facing_direction(&self, player: PlayerId) -> Option<Vec2>;

    fn muzzle_origin(&self, player: PlayerId) -> Option<Vec2>;

    fn aim_stat_bonuses(&self, player: PlayerId) -> AimBonuses;

    /// False for disconnected or unknown players
    fn is_present(&self, player: PlayerId) -> bool;

    fn apply_damage(&self, target: PlayerId, amount: f32, point: Vec2, normal: Vec2, attacker: PlayerId);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec2,
    pub normal: Vec2,
    /// Damageable player that was hit, `None` for world geometry
    pub target: Option<PlayerId>,
}

pub trait Physics: Send + Sync {
    fn raycast(&self, origin: Vec2, direction: Vec2, range: f32, ignore: Option<PlayerId>) -> Option<RayHit>;

    /// Rigid-body simulation on/off (off while held)
    fn set_simulated(&self, weapon: WeaponId, simulated: bool);

    /// Pickup trigger volume on/off
    fn set_pickup_sensing(&self, weapon: WeaponId, enabled: bool);

    /// The weapon left the world for good
    fn forget(&self, _weapon: WeaponId) {}
}
