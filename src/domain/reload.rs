use std::fmt;
use crate::utils::weapondb::ReloadKind;

/// Counts after one `FinishReload` keyframe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReloadStep {
    pub magazine: f32,
    pub reserve: f32,
    /// Reload is complete; the weapon may shoot again
    pub finished: bool,
}

/// Strategy consulted on every `FinishReload`
pub trait ReloadPolicy: Send + fmt::Debug {
    /// Called once when `StartReload` is accepted
    fn begin(&mut self, magazine: f32, reserve: f32, capacity: f32);

    fn step(&mut self, magazine: f32, reserve: f32, capacity: f32) -> ReloadStep;

    /// Reload was interrupted (discard / despawn)
    fn cancel(&mut self) {}
}

/// Everything that fits in one go
#[derive(Debug, Default)]
pub struct LumpReload;

impl ReloadPolicy for LumpReload {
    fn begin(&mut self, _magazine: f32, _reserve: f32, _capacity: f32) {}

    fn step(&mut self, magazine: f32, reserve: f32, capacity: f32) -> ReloadStep {
        let needed = (capacity - magazine).max(0.0);
        let moved = needed.min(reserve).max(0.0);
        ReloadStep {
            magazine: magazine + moved,
            reserve: reserve - moved,
            finished: true,
        }
    }
}

/// A few rounds per keyframe until the primed counter runs out
#[derive(Debug)]
pub struct PerRoundReload {
    rounds_per_step: f32,
    remaining: f32,
}

impl PerRoundReload {
    pub fn new(rounds_per_step: u32) -> Self {
        Self {
            rounds_per_step: rounds_per_step.max(1) as f32,
            remaining: 0.0,
        }
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

impl ReloadPolicy for PerRoundReload {
    fn begin(&mut self, magazine: f32, reserve: f32, capacity: f32) {
        self.remaining = (capacity - magazine).max(0.0).min(reserve.max(0.0));
    }

    fn step(&mut self, magazine: f32, reserve: f32, capacity: f32) -> ReloadStep {
        let moved = self
            .rounds_per_step
            .min(self.remaining)
            .min((capacity - magazine).max(0.0))
            .min(reserve)
            .max(0.0);

        // Nothing left to move ends the reload even if the counter disagrees
        self.remaining = if moved > 0.0 { self.remaining - moved } else { 0.0 };

        ReloadStep {
            magazine: magazine + moved,
            reserve: reserve - moved,
            finished: self.remaining <= 0.0,
        }
    }

    fn cancel(&mut self) {
        self.remaining = 0.0;
    }
}

pub fn policy_for(kind: ReloadKind) -> Box<dyn ReloadPolicy> {
    match kind {
        ReloadKind::Lump => Box::new(LumpReload),
        ReloadKind::PerRound { rounds_per_step } => Box::new(PerRoundReload::new(rounds_per_step)),
    }
}
