//! Cartridge hardware: the mapper framework and the boards it implements.
//!
//! A mapper is a tagged variant over concrete board records. At install
//! time it rewrites the bus slots it owns on both address spaces; at run
//! time register writes land on it through the `MapperRegister` handler
//! and bank switching is a matter of the PRG handlers consulting the
//! mapper's current bank. `tick()` is called once per CPU cycle for
//! boards that count cycles; neither board here needs it.

use log::trace;

use crate::bus::{ReadHandler, Slot, WriteHandler};
use crate::cartridge::Rom;
use crate::error::NesError;
use crate::ppu_bus::PpuBus;

/// PRG bank granularity used by the boards here.
const PRG_BANK: usize = 0x4000;

/// Cartridge work RAM size at $6000-$7FFF.
const PRG_RAM: usize = 0x2000;

/// The cartridge: parsed ROM, board logic, and work RAM.
pub struct Cartridge {
    pub rom: Rom,
    pub mapper: Mapper,
    prg_ram: Vec<u8>,
}

impl Cartridge {
    /// Pick the board implementation for the ROM's mapper id.
    ///
    /// # Errors
    ///
    /// Returns [`NesError::MapperUnsupported`] for unimplemented ids.
    pub fn new(rom: Rom) -> Result<Self, NesError> {
        let mapper = Mapper::create(&rom)?;
        Ok(Self {
            rom,
            mapper,
            prg_ram: vec![0; PRG_RAM],
        })
    }

    /// Overlay the cartridge regions on both buses. Called once after the
    /// default map is applied.
    pub fn install(&mut self, slots: &mut [Slot], ppu_bus: &mut PpuBus) {
        // Work RAM at $6000-$7FFF, common to both boards.
        for addr in 0x6000..0x8000usize {
            let param = (addr - 0x6000) as u16;
            slots[addr].read = ReadHandler::PrgRam;
            slots[addr].read_param = param;
            slots[addr].write = WriteHandler::PrgRam;
            slots[addr].write_param = param;
        }
        ppu_bus.load_pattern(&self.rom.chr);
        ppu_bus.set_mirroring(self.rom.mirroring);
        self.mapper.install(&self.rom, slots, ppu_bus);
    }

    /// A write reached a mapper register.
    pub fn write_register(&mut self, addr: u16, value: u8) {
        self.mapper.write_register(&self.rom, addr, value);
    }

    pub(crate) fn prg_rom_read(&self, param: u16) -> u8 {
        self.rom.prg[usize::from(param)]
    }

    pub(crate) fn prg_window_read(&self, param: u16) -> u8 {
        self.rom.prg[self.mapper.window_base() + usize::from(param)]
    }

    pub(crate) fn prg_fixed_read(&self, param: u16) -> u8 {
        self.rom.prg[self.mapper.fixed_base() + usize::from(param)]
    }

    pub(crate) fn prg_ram_read(&self, param: u16) -> u8 {
        self.prg_ram[usize::from(param)]
    }

    pub(crate) fn prg_ram_write(&mut self, param: u16, value: u8) {
        self.prg_ram[usize::from(param)] = value;
    }

    /// Serialize the mapper-private block: mapper id, version, length,
    /// then board state and work RAM.
    pub(crate) fn save_private(&self, out: &mut Vec<u8>) {
        out.push(self.mapper.id());
        out.push(1); // block version
        let mut body = Vec::new();
        self.mapper.save_private(&mut body);
        body.extend_from_slice(&self.prg_ram);
        out.extend_from_slice(&(body.len() as u16).to_le_bytes());
        out.extend_from_slice(&body);
    }

    /// Restore the block written by `save_private`. Returns the number of
    /// bytes consumed.
    pub(crate) fn restore_private(&mut self, bytes: &[u8]) -> Result<usize, NesError> {
        if bytes.len() < 4 {
            return Err(NesError::StateCorrupt("mapper block truncated"));
        }
        if bytes[0] != self.mapper.id() {
            return Err(NesError::StateCorrupt("mapper id mismatch"));
        }
        if bytes[1] != 1 {
            return Err(NesError::StateCorrupt("mapper block version"));
        }
        let len = usize::from(u16::from_le_bytes([bytes[2], bytes[3]]));
        let body = bytes
            .get(4..4 + len)
            .ok_or(NesError::StateCorrupt("mapper block truncated"))?;
        let consumed = self.mapper.restore_private(&self.rom, body)?;
        let ram = body
            .get(consumed..)
            .filter(|r| r.len() == PRG_RAM)
            .ok_or(NesError::StateCorrupt("work RAM size"))?;
        self.prg_ram.copy_from_slice(ram);
        Ok(4 + len)
    }
}

/// The supported boards.
pub enum Mapper {
    Nrom(Nrom),
    Mapper094(Mapper094),
}

impl Mapper {
    fn create(rom: &Rom) -> Result<Self, NesError> {
        match rom.mapper_id {
            0 => Ok(Self::Nrom(Nrom)),
            94 => Ok(Self::Mapper094(Mapper094::new(rom))),
            n => Err(NesError::MapperUnsupported(n)),
        }
    }

    /// iNES mapper number.
    #[must_use]
    pub fn id(&self) -> u8 {
        match self {
            Self::Nrom(_) => 0,
            Self::Mapper094(_) => 94,
        }
    }

    fn install(&mut self, rom: &Rom, slots: &mut [Slot], ppu_bus: &mut PpuBus) {
        match self {
            Self::Nrom(m) => m.install(rom, slots, ppu_bus),
            Self::Mapper094(m) => m.install(slots, ppu_bus),
        }
    }

    fn write_register(&mut self, rom: &Rom, addr: u16, value: u8) {
        match self {
            Self::Nrom(_) => {}
            Self::Mapper094(m) => m.select_bank(rom, addr, value),
        }
    }

    /// Once per CPU cycle. Neither implemented board counts cycles.
    pub fn tick(&mut self) {}

    /// Level of the cartridge IRQ line.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        false
    }

    fn window_base(&self) -> usize {
        match self {
            Self::Nrom(_) => 0,
            Self::Mapper094(m) => usize::from(m.bank) * PRG_BANK,
        }
    }

    fn fixed_base(&self) -> usize {
        match self {
            Self::Nrom(_) => 0,
            Self::Mapper094(m) => m.fixed_base,
        }
    }

    fn save_private(&self, out: &mut Vec<u8>) {
        match self {
            Self::Nrom(_) => {}
            Self::Mapper094(m) => out.push(m.bank),
        }
    }

    fn restore_private(&mut self, rom: &Rom, bytes: &[u8]) -> Result<usize, NesError> {
        match self {
            Self::Nrom(_) => Ok(0),
            Self::Mapper094(m) => {
                let &bank = bytes
                    .first()
                    .ok_or(NesError::StateCorrupt("mapper state truncated"))?;
                if usize::from(bank) >= rom.prg_bank_count() {
                    return Err(NesError::StateCorrupt("bank out of range"));
                }
                m.bank = bank;
                Ok(1)
            }
        }
    }
}

/// NROM (mapper 0): no banking. 16 KiB PRG is mirrored across
/// $8000-$FFFF; 32 KiB maps straight through.
pub struct Nrom;

impl Nrom {
    fn install(&mut self, rom: &Rom, slots: &mut [Slot], ppu_bus: &mut PpuBus) {
        for addr in 0x8000..0x10000usize {
            slots[addr].read = ReadHandler::PrgRom;
            slots[addr].read_param = ((addr - 0x8000) % rom.prg.len()) as u16;
        }
        if rom.chr.is_empty() {
            ppu_bus.set_pattern_writable();
        }
    }
}

/// Mapper 094 (UN1ROM): 128 KiB PRG in 16 KiB banks. $8000-$BFFF is a
/// selectable window, $C000-$FFFF is fixed to the last bank, and any
/// write to $8000-$FFFF selects `(value & %11100) >> 2`. CHR is RAM.
pub struct Mapper094 {
    bank: u8,
    mask: u8,
    fixed_base: usize,
}

impl Mapper094 {
    fn new(rom: &Rom) -> Self {
        Self {
            bank: 0,
            mask: 0b0001_1100,
            fixed_base: rom.prg.len().max(PRG_BANK) - PRG_BANK,
        }
    }

    fn install(&mut self, slots: &mut [Slot], ppu_bus: &mut PpuBus) {
        for addr in 0x8000..0xC000usize {
            slots[addr].read = ReadHandler::PrgWindow;
            slots[addr].read_param = (addr - 0x8000) as u16;
        }
        for addr in 0xC000..0x10000usize {
            slots[addr].read = ReadHandler::PrgFixed;
            slots[addr].read_param = (addr - 0xC000) as u16;
        }
        for addr in 0x8000..0x10000usize {
            slots[addr].write = WriteHandler::MapperRegister;
            slots[addr].write_param = 0;
        }
        ppu_bus.set_pattern_writable();
    }

    fn select_bank(&mut self, rom: &Rom, _addr: u16, value: u8) {
        self.bank = ((value & self.mask) >> 2) % rom.prg_bank_count() as u8;
        trace!("mapper 094: PRG window -> bank {}", self.bank);
    }
}
