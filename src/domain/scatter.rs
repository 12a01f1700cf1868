use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use crate::domain::geometry::Vec2;

/// Random source for bullet scatter, owned by one weapon
pub type ScatterRng = Box<dyn RngCore + Send>;

/// Fixed seed for reproducible runs, entropy otherwise
pub fn scatter_rng(seed: Option<u64>) -> ScatterRng {
    match seed {
        Some(seed) => Box::new(ChaCha8Rng::seed_from_u64(seed)),
        None => Box::new(ChaCha8Rng::from_entropy()),
    }
}

/// Half-width of the scatter cone in degrees
pub fn scatter_angle(base_angle: f32, accuracy: f32) -> f32 {
    (base_angle * (1.0 - accuracy.clamp(0.0, 100.0) / 100.0)).abs()
}

/// Rotate `facing` by a uniform offset in `[-scatter, +scatter]`
pub fn scatter_direction(facing: Vec2, base_angle: f32, accuracy: f32, rng: &mut dyn RngCore) -> Vec2 {
    let spread = scatter_angle(base_angle, accuracy);
    let offset = if spread > 0.0 {
        rng.gen_range(-spread..=spread)
    } else {
        0.0
    };
    facing.rotated(offset)
}
