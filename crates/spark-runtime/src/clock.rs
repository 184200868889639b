//! Frame clock that clamps stalls and drives systems

use crate::system::RuntimeSystem;
use spark_core::Result;
use std::time::Instant;

/// Hands out per-frame deltas and steps registered systems with them.
///
/// A frame delta never exceeds `max_delta`, so a long stall (debugger break,
/// window drag) reaches the particles as one bounded step. Time is also
/// banked in whole `fixed_timestep` slices for `RuntimeSystem::fixed_update`.
pub struct FrameClock {
    /// Simulated seconds since the clock started
    pub total_time: f64,
    /// Clamped delta of the latest frame
    pub delta_time: f64,
    pub max_delta: f64,
    pub fixed_timestep: f64,
    /// Frames advanced so far
    pub frame: u64,
    banked: f64,
    last_instant: Option<Instant>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            max_delta: 0.25,
            fixed_timestep: 1.0 / 60.0,
            frame: 0,
            banked: 0.0,
            last_instant: None,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock whose fixed step runs at `hz`
    pub fn with_fixed_rate(hz: f64) -> Self {
        Self {
            fixed_timestep: 1.0 / hz,
            ..Self::default()
        }
    }

    /// Measure the wall clock since the previous call. The first call only
    /// starts the measurement and yields a zero delta.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = self
            .last_instant
            .replace(now)
            .map_or(0.0, |last| now.duration_since(last).as_secs_f64());
        self.advance_by(elapsed);
    }

    /// Advance by an explicit elapsed time (headless hosts, tests)
    pub fn advance_by(&mut self, elapsed: f64) {
        self.delta_time = elapsed.clamp(0.0, self.max_delta);
        self.total_time += self.delta_time;
        self.banked += self.delta_time;
        self.frame += 1;
    }

    /// Run the fixed steps banked so far, then one variable update with the
    /// current delta. Returns how many fixed steps ran.
    pub fn drive(&mut self, system: &mut dyn RuntimeSystem) -> Result<u32> {
        let mut steps = 0;
        while self.banked >= self.fixed_timestep {
            system.fixed_update(self.fixed_timestep)?;
            self.banked -= self.fixed_timestep;
            steps += 1;
        }
        system.update(self.delta_time)?;
        Ok(steps)
    }
}
