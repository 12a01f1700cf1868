/// Result of one countdown step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerTick {
    /// Not running (held, or already expired)
    Idle,
    Counting(f32),
    /// Reported exactly once
    Expired,
}

/// Countdown for a weapon lying unclaimed in the world
#[derive(Debug, Clone)]
pub struct DestructionTimer {
    budget: f32,
    remaining: f32,
    running: bool,
    expired: bool,
}

impl DestructionTimer {
    pub fn new(budget: f32) -> Self {
        Self {
            budget,
            remaining: budget,
            running: false,
            expired: false,
        }
    }

    /// Restart from the full budget (drop / spawn)
    pub fn start(&mut self) {
        if self.expired {
            return;
        }
        self.remaining = self.budget;
        self.running = true;
    }

    /// Halt and refill (pickup)
    pub fn stop(&mut self) {
        self.running = false;
        self.remaining = self.budget;
    }

    pub fn tick(&mut self, step: f32) -> TimerTick {
        if !self.running || self.expired {
            return TimerTick::Idle;
        }
        self.remaining = (self.remaining - step).max(0.0);
        if self.remaining <= 0.0 {
            self.running = false;
            self.expired = true;
            TimerTick::Expired
        } else {
            TimerTick::Counting(self.remaining)
        }
    }

    pub fn budget(&self) -> f32 {
        self.budget
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}
