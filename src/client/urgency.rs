use std::f32::consts::TAU;

/// Fraction of the destroy budget below which the weapon starts flashing
pub const URGENCY_THRESHOLD: f32 = 0.5;

/// Flashing warning derived from the replicated remaining destroy time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UrgencySignal {
    /// Flash cycle in seconds at the threshold
    pub slow_period: f32,
    /// Flash cycle in seconds as time runs out
    pub fast_period: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Urgency {
    /// 0..=1
    pub intensity: f32,
    /// Seconds per flash, 0 when calm
    pub period: f32,
}

impl Urgency {
    pub const CALM: Urgency = Urgency { intensity: 0.0, period: 0.0 };
}

impl Default for UrgencySignal {
    fn default() -> Self {
        Self {
            slow_period: 1.0,
            fast_period: 0.2,
        }
    }
}

impl UrgencySignal {
    /// Cycle length for the given remaining fraction, `None` above the threshold
    pub fn period(&self, remaining: f32, budget: f32) -> Option<f32> {
        if budget <= 0.0 {
            return None;
        }
        let fraction = (remaining / budget).clamp(0.0, 1.0);
        if fraction >= URGENCY_THRESHOLD {
            return None;
        }
        let t = fraction / URGENCY_THRESHOLD;
        Some(self.fast_period + (self.slow_period - self.fast_period) * t)
    }
}

/// Running flash for one weapon. The phase advances by `dt / period` every frame,
/// so a shrinking period speeds the flash up without jumping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UrgencyFlasher {
    pub signal: UrgencySignal,
    /// Position in the current cycle, 0..1
    phase: f32,
}

impl UrgencyFlasher {
    pub fn new(signal: UrgencySignal) -> Self {
        Self { signal, phase: 0.0 }
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Step the flash by `dt` seconds and sample it
    pub fn advance(&mut self, dt: f32, remaining: f32, budget: f32) -> Urgency {
        match self.signal.period(remaining, budget) {
            Some(period) if period > 0.0 => {
                if dt.is_finite() && dt > 0.0 {
                    self.phase = (self.phase + dt / period).fract();
                }
                Urgency {
                    intensity: 0.5 * (1.0 - (TAU * self.phase).cos()),
                    period,
                }
            }
            _ => {
                self.phase = 0.0;
                Urgency::CALM
            }
        }
    }
}
