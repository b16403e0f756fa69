//! NES machine core.
//!
//! Wires a cycle-exact 2A03 CPU into the console's two address spaces:
//! a 64 KiB CPU bus and a 16 KiB PPU bus, each a table of per-address
//! read/write handler slots that the cartridge mapper overlays at
//! install time. A master-clock scheduler interleaves PPU dots, CPU
//! half-cycles, APU and mapper ticks at region-dependent divisors.
//!
//! The core neither renders pixels nor produces audio samples; those
//! cross the `emu_core` host traits. Loading is from bytes, never paths.

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod mapper;
pub mod ppu;
pub mod ppu_bus;
mod savestate;
pub mod system;

pub use bus::CpuBus;
pub use cartridge::{Mirroring, Rom};
pub use config::{NesConfig, Region};
pub use error::NesError;
pub use mapper::{Cartridge, Mapper};
pub use ppu::Ppu;
pub use ppu_bus::PpuBus;
pub use system::Nes;
