//! Core traits and types for cycle-accurate emulation.
//!
//! Everything ticks at the master crystal frequency. All component timing
//! derives from this. No exceptions.

mod bus;
mod clock;
mod host;
mod tickable;
mod ticks;

pub use bus::Bus;
pub use clock::MasterClock;
pub use host::{AudioHost, DisplayHost, InputPoller};
pub use tickable::Tickable;
pub use ticks::Ticks;
