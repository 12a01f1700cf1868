use crate::domain::geometry::Vec2;
use crate::state::WeaponId;
use crate::state::messages::EffectBroadcast;

/// Local rendering of fire-and-forget effects
pub trait Presentation {
    fn play_muzzle_vfx(&mut self, weapon: WeaponId);

    fn spawn_hit_effect(&mut self, weapon: WeaponId, point: Vec2, normal: Vec2);

    fn draw_tracer(&mut self, weapon: WeaponId, start: Vec2, end: Vec2, direction: Vec2);

    fn eject_casing(&mut self, weapon: WeaponId);
}

pub fn dispatch(presentation: &mut dyn Presentation, weapon: WeaponId, effect: EffectBroadcast) {
    match effect {
        EffectBroadcast::PlayMuzzleVfx => presentation.play_muzzle_vfx(weapon),
        EffectBroadcast::SpawnHitEffect { point, normal } => presentation.spawn_hit_effect(weapon, point, normal),
        EffectBroadcast::DrawTracer { start, end, direction } => presentation.draw_tracer(weapon, start, end, direction),
        EffectBroadcast::EjectCasing => presentation.eject_casing(weapon),
    }
}

/// Presentation that only logs, for headless clients
#[derive(Debug, Default)]
pub struct LogPresentation;

impl Presentation for LogPresentation {
    fn play_muzzle_vfx(&mut self, weapon: WeaponId) {
        log::trace!("weapon {} muzzle flash", weapon);
    }

    fn spawn_hit_effect(&mut self, weapon: WeaponId, point: Vec2, _normal: Vec2) {
        log::trace!("weapon {} hit at ({:.2}, {:.2})", weapon, point.x, point.y);
    }

    fn draw_tracer(&mut self, weapon: WeaponId, start: Vec2, end: Vec2, _direction: Vec2) {
        log::trace!(
            "weapon {} tracer ({:.2}, {:.2}) -> ({:.2}, {:.2})",
            weapon, start.x, start.y, end.x, end.y
        );
    }

    fn eject_casing(&mut self, weapon: WeaponId) {
        log::trace!("weapon {} casing", weapon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<&'static str>);

    impl Presentation for Recorder {
        fn play_muzzle_vfx(&mut self, _weapon: WeaponId) {
            self.0.push("muzzle");
        }

        fn spawn_hit_effect(&mut self, _weapon: WeaponId, _point: Vec2, _normal: Vec2) {
            self.0.push("hit");
        }

        fn draw_tracer(&mut self, _weapon: WeaponId, _start: Vec2, _end: Vec2, _direction: Vec2) {
            self.0.push("tracer");
        }

        fn eject_casing(&mut self, _weapon: WeaponId) {
            self.0.push("casing");
        }
    }

    #[test]
    fn test_dispatch_routes_each_effect() {
        let mut recorder = Recorder::default();
        for effect in [
            EffectBroadcast::PlayMuzzleVfx,
            EffectBroadcast::SpawnHitEffect { point: Vec2::ZERO, normal: Vec2::RIGHT },
            EffectBroadcast::DrawTracer { start: Vec2::ZERO, end: Vec2::RIGHT, direction: Vec2::RIGHT },
            EffectBroadcast::EjectCasing,
        ] {
            dispatch(&mut recorder, 1, effect);
        }
        assert_eq!(recorder.0, vec!["muzzle", "hit", "tracer", "casing"]);
    }
}
