//! Spark Runtime - Frame loop infrastructure
//!
//! Provides the building blocks a host frame loop uses to drive particles:
//! - `FrameClock` - stall-clamped frame deltas that drive fixed and per-frame updates
//! - `RuntimeSystem` - trait for systems ticked by the frame loop

mod clock;
mod system;

pub use clock::FrameClock;
pub use system::RuntimeSystem;
