//! Top-level NES system and master-clock scheduler.
//!
//! The master crystal drives everything. Each master tick dispatches, in
//! order: the PPU (when its divisor comes up), then the CPU (PHI1
//! followed by PHI2 on the same edge), then the APU and the mapper at CPU
//! rate. OAM DMA stretches CPU time only; the PPU and APU keep running
//! through it.

use std::sync::atomic::{AtomicBool, Ordering};

use cpu_2a03::Cpu2A03;
use emu_core::{DisplayHost, InputPoller, MasterClock, Tickable, Ticks};
use log::debug;

use crate::bus::CpuBus;
use crate::cartridge::Rom;
use crate::config::{NesConfig, Region};
use crate::error::NesError;
use crate::mapper::Cartridge;

/// PPU dots per scanline, used for the exact frame length.
const DOTS_PER_SCANLINE: u64 = 341;

/// The NES core: CPU, buses (and through them PPU, APU, cartridge,
/// controllers), and the master clock.
pub struct Nes {
    pub(crate) cpu: Cpu2A03,
    pub(crate) bus: CpuBus,
    region: Region,
    pub(crate) master_clock: u64,
    ticks_per_frame: u64,
    pub(crate) frame_count: u64,
    display: Option<Box<dyn DisplayHost>>,
}

impl Nes {
    /// Build a system from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the ROM image is malformed or the mapper is
    /// not implemented.
    pub fn new(config: &NesConfig) -> Result<Self, NesError> {
        let rom = Rom::parse(&config.rom_data)?;
        let cart = Cartridge::new(rom)?;
        let bus = CpuBus::new(cart, config.region);

        let mut cpu = Cpu2A03::new();
        cpu.reset_cold();

        let scanlines = u64::from(config.region.scanlines_per_frame());
        let ticks_per_frame = DOTS_PER_SCANLINE * scanlines * config.region.ppu_divisor();

        debug!(
            "system: {:?}, {} master ticks per frame",
            config.region, ticks_per_frame
        );

        Ok(Self {
            cpu,
            bus,
            region: config.region,
            master_clock: 0,
            ticks_per_frame,
            frame_count: 0,
            display: None,
        })
    }

    /// Run one complete frame of master ticks. Returns the tick count.
    pub fn run_frame(&mut self) -> u64 {
        self.frame_count += 1;
        let target = self.master_clock + self.ticks_per_frame;
        while self.master_clock < target {
            self.tick();
        }
        self.ticks_per_frame
    }

    /// Run until the master clock reaches `deadline`.
    pub fn run_until(&mut self, deadline: Ticks) {
        while self.master_clock < deadline.get() {
            self.tick();
        }
    }

    /// Run until `alive` goes false, checked at master-tick boundaries.
    /// There is no mid-instruction cancellation.
    pub fn run_while(&mut self, alive: &AtomicBool) {
        while alive.load(Ordering::Relaxed) {
            self.tick();
        }
    }

    /// Warm reset, as from the console's reset button. RAM is preserved.
    pub fn reset(&mut self) {
        debug!("warm reset at master tick {}", self.master_clock);
        self.cpu.reset_warm();
    }

    /// Attach the display host that receives each frame at vblank.
    pub fn set_display_host(&mut self, host: Box<dyn DisplayHost>) {
        self.display = Some(host);
    }

    /// Attach the input poller behind the controller ports.
    pub fn set_input_poller(&mut self, poller: Box<dyn InputPoller>) {
        self.bus.set_input_poller(Some(poller));
    }

    /// Master clock configuration, for host pacing.
    #[must_use]
    pub fn clock(&self) -> MasterClock {
        MasterClock::new(self.region.crystal_hz())
    }

    /// Exact master ticks per frame for this region.
    #[must_use]
    pub fn ticks_per_frame(&self) -> u64 {
        self.ticks_per_frame
    }

    /// Master clock tick count.
    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    /// Completed frame count (from `run_frame`).
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Video region.
    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    /// Reference to the CPU.
    #[must_use]
    pub fn cpu(&self) -> &Cpu2A03 {
        &self.cpu
    }

    /// Mutable reference to the CPU.
    pub fn cpu_mut(&mut self) -> &mut Cpu2A03 {
        &mut self.cpu
    }

    /// Reference to the bus and the devices behind it.
    #[must_use]
    pub fn bus(&self) -> &CpuBus {
        &self.bus
    }

    /// Mutable reference to the bus.
    pub fn bus_mut(&mut self) -> &mut CpuBus {
        &mut self.bus
    }
}

impl Tickable for Nes {
    fn tick(&mut self) {
        self.master_clock += 1;

        // PPU first when both land on the same edge; the real chips
        // resolve the tie this way.
        if self.master_clock.is_multiple_of(self.region.ppu_divisor()) {
            self.bus.ppu.tick();
            if self.bus.ppu.take_frame_ready() {
                if let Some(display) = &mut self.display {
                    display.submit_frame(self.bus.ppu.framebuffer());
                }
            }
        }

        if self.master_clock.is_multiple_of(self.region.cpu_divisor()) {
            self.cpu.set_nmi_line(self.bus.ppu.nmi_line());
            self.cpu
                .set_irq_line(self.bus.apu.irq_line() || self.bus.cart.mapper.irq_pending());
            self.cpu.tick_phi1(&mut self.bus);
            self.cpu.tick_phi2(&mut self.bus);
            self.bus.apu.tick();
            self.bus.cart.mapper.tick();
        }
    }
}
