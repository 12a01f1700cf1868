//! Hitscan against the player roster, standing in for a full physics engine.
//!
//! Players are circles of `hit_radius` around their reported position and
//! the arena is an axis-aligned square of half extent `arena_half_extent`.
//! Whatever the ray meets first wins.

use std::sync::Arc;
use dashmap::DashMap;
use crate::domain::collaborators::{Physics, RayHit};
use crate::domain::geometry::Vec2;
use crate::state::{PlayerId, WeaponId};
use crate::state::server_state::ServerState;

/// Distance along a unit ray to the first crossing of a circle, if within `range`
pub fn ray_circle(origin: Vec2, direction: Vec2, range: f32, center: Vec2, radius: f32) -> Option<f32> {
    let m = origin - center;
    let b = m.dot(direction);
    let c = m.dot(m) - radius * radius;

    // Outside and pointing away
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()).max(0.0);
    (t <= range).then_some(t)
}

/// Distance along a unit ray to the arena wall and the wall's inward normal
pub fn ray_arena(origin: Vec2, direction: Vec2, half_extent: f32) -> Option<(f32, Vec2)> {
    let mut best: Option<(f32, Vec2)> = None;
    let mut consider = |t: f32, normal: Vec2| {
        if t >= 0.0 && best.map_or(true, |(bt, _)| t < bt) {
            best = Some((t, normal));
        }
    };

    if direction.x > 0.0 {
        consider((half_extent - origin.x) / direction.x, Vec2::new(-1.0, 0.0));
    } else if direction.x < 0.0 {
        consider((-half_extent - origin.x) / direction.x, Vec2::new(1.0, 0.0));
    }
    if direction.y > 0.0 {
        consider((half_extent - origin.y) / direction.y, Vec2::new(0.0, -1.0));
    } else if direction.y < 0.0 {
        consider((-half_extent - origin.y) / direction.y, Vec2::new(0.0, 1.0));
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyState {
    pub simulated: bool,
    pub pickup_sensing: bool,
}

pub struct RosterPhysics {
    roster: Arc<ServerState>,
    hit_radius: f32,
    arena_half_extent: f32,
    bodies: DashMap<WeaponId, BodyState>,
}

impl RosterPhysics {
    pub fn new(roster: Arc<ServerState>, hit_radius: f32, arena_half_extent: f32) -> Self {
        Self {
            roster,
            hit_radius,
            arena_half_extent,
            bodies: DashMap::new(),
        }
    }

    pub fn body(&self, weapon: WeaponId) -> Option<BodyState> {
        self.bodies.get(&weapon).map(|entry| *entry)
    }

    fn update_body(&self, weapon: WeaponId, update: impl FnOnce(&mut BodyState)) {
        let mut entry = self.bodies.entry(weapon).or_insert(BodyState {
            simulated: true,
            pickup_sensing: true,
        });
        update(entry.value_mut());
    }
}

impl Physics for RosterPhysics {
    fn raycast(&self, origin: Vec2, direction: Vec2, range: f32, ignore: Option<PlayerId>) -> Option<RayHit> {
        let direction = direction.try_normalize()?;

        let mut best: Option<(f32, RayHit)> = None;
        for (player, center) in self.roster.player_positions() {
            if Some(player) == ignore {
                continue;
            }
            let Some(t) = ray_circle(origin, direction, range, center, self.hit_radius) else {
                continue;
            };
            if best.as_ref().map_or(true, |(bt, _)| t < *bt) {
                let point = origin + direction * t;
                let normal = (point - center).try_normalize().unwrap_or(direction * -1.0);
                best = Some((t, RayHit { point, normal, target: Some(player) }));
            }
        }

        if let Some((t, normal)) = ray_arena(origin, direction, self.arena_half_extent) {
            if t <= range && best.as_ref().map_or(true, |(bt, _)| t < *bt) {
                best = Some((t, RayHit { point: origin + direction * t, normal, target: None }));
            }
        }

        best.map(|(_, hit)| hit)
    }

    fn set_simulated(&self, weapon: WeaponId, simulated: bool) {
        log::debug!("Weapon {} simulation {}", weapon, if simulated { "on" } else { "off" });
        self.update_body(weapon, |body| body.simulated = simulated);
    }

    fn set_pickup_sensing(&self, weapon: WeaponId, enabled: bool) {
        log::debug!("Weapon {} pickup sensing {}", weapon, if enabled { "on" } else { "off" });
        self.update_body(weapon, |body| body.pickup_sensing = enabled);
    }

    fn forget(&self, weapon: WeaponId) {
        self.bodies.remove(&weapon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9000)
    }

    #[test]
    fn test_ray_circle() {
        let hit = ray_circle(Vec2::ZERO, Vec2::RIGHT, 100.0, Vec2::new(10.0, 0.0), 1.0);
        assert_eq!(hit, Some(9.0));

        // behind the origin
        assert_eq!(ray_circle(Vec2::ZERO, Vec2::RIGHT, 100.0, Vec2::new(-10.0, 0.0), 1.0), None);
        // off to the side
        assert_eq!(ray_circle(Vec2::ZERO, Vec2::RIGHT, 100.0, Vec2::new(10.0, 5.0), 1.0), None);
        // out of range
        assert_eq!(ray_circle(Vec2::ZERO, Vec2::RIGHT, 5.0, Vec2::new(10.0, 0.0), 1.0), None);
    }

    #[test]
    fn test_ray_arena() {
        let (t, normal) = ray_arena(Vec2::ZERO, Vec2::RIGHT, 20.0).unwrap();
        assert_eq!(t, 20.0);
        assert_eq!(normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_nearest_player_wins_and_shooter_is_ignored() {
        let roster = Arc::new(ServerState::new());
        roster.upsert_player(1, "shooter".to_string(), addr());
        roster.upsert_player(2, "far".to_string(), addr());
        roster.upsert_player(3, "near".to_string(), addr());
        roster.update_position(1, Vec2::ZERO, Vec2::RIGHT);
        roster.update_position(2, Vec2::new(30.0, 0.0), Vec2::RIGHT);
        roster.update_position(3, Vec2::new(10.0, 0.0), Vec2::RIGHT);

        let physics = RosterPhysics::new(roster, 1.0, 100.0);
        let hit = physics.raycast(Vec2::ZERO, Vec2::RIGHT, 50.0, Some(1)).unwrap();

        assert_eq!(hit.target, Some(3));
        assert_eq!(hit.point, Vec2::new(9.0, 0.0));
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_wall_hit_has_no_target() {
        let roster = Arc::new(ServerState::new());
        let physics = RosterPhysics::new(roster, 1.0, 10.0);

        let hit = physics.raycast(Vec2::ZERO, Vec2::new(0.0, 1.0), 50.0, None).unwrap();
        assert_eq!(hit.target, None);
        assert_eq!(hit.point, Vec2::new(0.0, 10.0));

        assert!(physics.raycast(Vec2::ZERO, Vec2::new(0.0, 1.0), 5.0, None).is_none());
    }

    #[test]
    fn test_body_flags() {
        let physics = RosterPhysics::new(Arc::new(ServerState::new()), 1.0, 10.0);
        physics.set_simulated(4, false);
        assert_eq!(physics.body(4), Some(BodyState { simulated: false, pickup_sensing: true }));
        physics.set_pickup_sensing(4, false);
        assert_eq!(physics.body(4), Some(BodyState { simulated: false, pickup_sensing: false }));
        physics.forget(4);
        assert_eq!(physics.body(4), None);
    }
}
