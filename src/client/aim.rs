//! Client-local aim blending.
//!
//! Entering aim eases recoil down, view range and accuracy up toward the
//! holder's bonused values; leaving aim eases them back. Each stat has its
//! own tween, and retargeting starts from wherever the stat currently is.

use crate::domain::collaborators::AimBonuses;
use crate::utils::weapondb::WeaponData;

/// Default blend time in seconds
pub const AIM_BLEND_SECS: f32 = 0.3;

/// Ease-out cubic: fast start, slow finish
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0) - 1.0;
    t * t * t + 1.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimStats {
    pub recoil: f32,
    pub view_range: f32,
    pub accuracy: f32,
}

impl AimStats {
    pub fn from_weapon(def: &WeaponData) -> Self {
        Self {
            recoil: def.recoil,
            view_range: def.view_range,
            accuracy: def.accuracy,
        }
    }

    /// Stats while aiming with `bonuses` applied
    pub fn aimed(&self, bonuses: AimBonuses) -> Self {
        Self {
            recoil: self.recoil * (1.0 - bonuses.recoil),
            view_range: self.view_range * (1.0 + bonuses.view_range),
            accuracy: (self.accuracy * (1.0 + bonuses.accuracy)).min(100.0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tween {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

impl Tween {
    fn settled(value: f32) -> Self {
        Self { from: value, to: value, elapsed: 0.0, duration: 0.0 }
    }

    fn value(&self) -> f32 {
        if self.duration <= 0.0 || self.elapsed >= self.duration {
            return self.to;
        }
        let t = ease_out_cubic(self.elapsed / self.duration);
        self.from + (self.to - self.from) * t
    }

    fn retarget(&mut self, to: f32, duration: f32) {
        *self = Self { from: self.value(), to, elapsed: 0.0, duration };
    }

    fn advance(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt).min(self.duration.max(0.0));
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[derive(Debug, Clone)]
pub struct AimBlender {
    base: AimStats,
    duration: f32,
    aiming: bool,
    recoil: Tween,
    view_range: Tween,
    accuracy: Tween,
}

impl AimBlender {
    pub fn new(base: AimStats, duration: f32) -> Self {
        Self {
            base,
            duration,
            aiming: false,
            recoil: Tween::settled(base.recoil),
            view_range: Tween::settled(base.view_range),
            accuracy: Tween::settled(base.accuracy),
        }
    }

    pub fn is_aiming(&self) -> bool {
        self.aiming
    }

    /// React to an `is_enter_aim_state` change
    pub fn set_aiming(&mut self, aiming: bool, bonuses: AimBonuses) {
        self.aiming = aiming;
        let target = if aiming { self.base.aimed(bonuses) } else { self.base };
        self.recoil.retarget(target.recoil, self.duration);
        self.view_range.retarget(target.view_range, self.duration);
        self.accuracy.retarget(target.accuracy, self.duration);
    }

    pub fn advance(&mut self, dt: f32) {
        self.recoil.advance(dt);
        self.view_range.advance(dt);
        self.accuracy.advance(dt);
    }

    pub fn current(&self) -> AimStats {
        AimStats {
            recoil: self.recoil.value(),
            view_range: self.view_range.value(),
            accuracy: self.accuracy.value(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.recoil.is_done() && self.view_range.is_done() && self.accuracy.is_done()
    }
}
