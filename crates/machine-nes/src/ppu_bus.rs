//! PPU address space: a 16 KiB slot table over pattern, nametable, and
//! palette storage.
//!
//! Every PPU address is bound to a read and a write handler with a 16-bit
//! parameter, mirroring the CPU bus design. The mapper rewrites the
//! pattern-table and nametable slots at install time: CHR ROM is copied
//! into the pattern storage with writes left ignored, CHR RAM gets a
//! write handler, and nametable mirroring is baked into each slot's
//! parameter, so dispatch never branches on the mirroring mode.

use crate::cartridge::Mirroring;

/// Pattern-table span ($0000-$1FFF).
pub const PATTERN_SIZE: usize = 0x2000;
/// Nametable storage: 4 KiB to cover four-screen boards; two-screen
/// mirroring only uses the first 2 KiB.
pub const VRAM_SIZE: usize = 0x1000;
/// Palette RAM size.
pub const PALETTE_SIZE: usize = 32;

/// Read dispatch tag for one PPU bus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpuReadHandler {
    /// Pattern storage at the slot parameter.
    Pattern,
    /// Nametable RAM at the slot parameter (mirroring pre-resolved).
    Vram,
    /// Palette RAM at the slot parameter (mirroring pre-resolved).
    Palette,
}

/// Write dispatch tag for one PPU bus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpuWriteHandler {
    /// Writes ignored (CHR ROM).
    Ignore,
    /// Pattern storage is RAM.
    Pattern,
    Vram,
    Palette,
}

/// One address's bindings.
#[derive(Debug, Clone, Copy)]
struct PpuSlot {
    read: PpuReadHandler,
    read_param: u16,
    write: PpuWriteHandler,
    write_param: u16,
}

/// The 14-bit PPU bus.
pub struct PpuBus {
    slots: Vec<PpuSlot>,
    pattern: Box<[u8; PATTERN_SIZE]>,
    vram: Box<[u8; VRAM_SIZE]>,
    palette: [u8; PALETTE_SIZE],
}

impl PpuBus {
    #[must_use]
    pub fn new() -> Self {
        let mut bus = Self {
            slots: vec![
                PpuSlot {
                    read: PpuReadHandler::Pattern,
                    read_param: 0,
                    write: PpuWriteHandler::Ignore,
                    write_param: 0,
                };
                0x4000
            ],
            pattern: Box::new([0; PATTERN_SIZE]),
            vram: Box::new([0; VRAM_SIZE]),
            palette: [0; PALETTE_SIZE],
        };
        bus.apply_default_map();
        bus
    }

    /// Bind the power-on map: pattern tables read-only, nametables
    /// horizontally mirrored, palette with its mirror rule. The mapper
    /// overlays this during install.
    pub fn apply_default_map(&mut self) {
        for addr in 0..0x2000u16 {
            self.slots[usize::from(addr)] = PpuSlot {
                read: PpuReadHandler::Pattern,
                read_param: addr,
                write: PpuWriteHandler::Ignore,
                write_param: addr,
            };
        }
        self.set_mirroring(Mirroring::Horizontal);
        for addr in 0x3F00..0x4000u16 {
            let index = palette_index(addr);
            self.slots[usize::from(addr)] = PpuSlot {
                read: PpuReadHandler::Palette,
                read_param: index,
                write: PpuWriteHandler::Palette,
                write_param: index,
            };
        }
    }

    /// Rebind the nametable slots ($2000-$3EFF including the mirror) for
    /// the given arrangement by precomputing each slot's physical offset.
    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        for addr in 0x2000..0x3F00u16 {
            let offset = nametable_offset(mirroring, addr);
            self.slots[usize::from(addr)] = PpuSlot {
                read: PpuReadHandler::Vram,
                read_param: offset,
                write: PpuWriteHandler::Vram,
                write_param: offset,
            };
        }
    }

    /// Make the pattern-table region writable (CHR RAM boards).
    pub fn set_pattern_writable(&mut self) {
        for addr in 0..0x2000usize {
            self.slots[addr].write = PpuWriteHandler::Pattern;
        }
    }

    /// Copy CHR ROM into pattern storage.
    pub fn load_pattern(&mut self, chr: &[u8]) {
        let len = chr.len().min(PATTERN_SIZE);
        self.pattern[..len].copy_from_slice(&chr[..len]);
    }

    /// Read a byte. Addresses above $3FFF alias in by low-14-bit masking.
    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        let slot = self.slots[usize::from(addr & 0x3FFF)];
        let param = usize::from(slot.read_param);
        match slot.read {
            PpuReadHandler::Pattern => self.pattern[param],
            PpuReadHandler::Vram => self.vram[param],
            PpuReadHandler::Palette => self.palette[param],
        }
    }

    /// Write a byte, with the same aliasing as `read`.
    pub fn write(&mut self, addr: u16, value: u8) {
        let slot = self.slots[usize::from(addr & 0x3FFF)];
        let param = usize::from(slot.write_param);
        match slot.write {
            PpuWriteHandler::Ignore => {}
            PpuWriteHandler::Pattern => self.pattern[param] = value,
            PpuWriteHandler::Vram => self.vram[param] = value,
            PpuWriteHandler::Palette => self.palette[param] = value,
        }
    }

    /// Pattern storage contents.
    #[must_use]
    pub fn pattern(&self) -> &[u8; PATTERN_SIZE] {
        &self.pattern
    }

    /// Mutable pattern storage (save-state restore of CHR RAM).
    pub fn pattern_mut(&mut self) -> &mut [u8; PATTERN_SIZE] {
        &mut self.pattern
    }

    /// Nametable RAM contents.
    #[must_use]
    pub fn vram(&self) -> &[u8; VRAM_SIZE] {
        &self.vram
    }

    /// Mutable nametable RAM (save-state restore).
    pub fn vram_mut(&mut self) -> &mut [u8; VRAM_SIZE] {
        &mut self.vram
    }

    /// Palette RAM contents.
    #[must_use]
    pub fn palette(&self) -> &[u8; PALETTE_SIZE] {
        &self.palette
    }

    /// Mutable palette RAM (save-state restore).
    pub fn palette_mut(&mut self) -> &mut [u8; PALETTE_SIZE] {
        &mut self.palette
    }
}

impl Default for PpuBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Palette index with the $3F10/$3F14/$3F18/$3F1C mirror folded in.
fn palette_index(addr: u16) -> u16 {
    let index = addr & 0x1F;
    if index >= 0x10 && index & 0x03 == 0 {
        index - 0x10
    } else {
        index
    }
}

/// Physical nametable offset for an address under the given mirroring.
fn nametable_offset(mirroring: Mirroring, addr: u16) -> u16 {
    match mirroring {
        Mirroring::Vertical => addr & 0x07FF,
        Mirroring::Horizontal => ((addr & 0x0800) >> 1) | (addr & 0x03FF),
        Mirroring::FourScreen => addr & 0x0FFF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_rom_ignores_writes_until_made_ram() {
        let mut bus = PpuBus::new();
        bus.load_pattern(&[0xAB; 0x2000]);
        bus.write(0x0000, 0x55);
        assert_eq!(bus.read(0x0000), 0xAB);

        bus.set_pattern_writable();
        bus.write(0x0000, 0x55);
        assert_eq!(bus.read(0x0000), 0x55);
    }

    #[test]
    fn vertical_mirroring_folds_tables() {
        let mut bus = PpuBus::new();
        bus.set_mirroring(Mirroring::Vertical);
        bus.write(0x2000, 0x11);
        assert_eq!(bus.read(0x2800), 0x11);
        bus.write(0x2400, 0x22);
        assert_eq!(bus.read(0x2C00), 0x22);
        assert_ne!(bus.read(0x2400), bus.read(0x2000));
    }

    #[test]
    fn horizontal_mirroring_folds_tables() {
        let mut bus = PpuBus::new();
        bus.set_mirroring(Mirroring::Horizontal);
        bus.write(0x2000, 0x11);
        assert_eq!(bus.read(0x2400), 0x11);
        bus.write(0x2800, 0x22);
        assert_eq!(bus.read(0x2C00), 0x22);
        assert_ne!(bus.read(0x2800), bus.read(0x2000));
    }

    #[test]
    fn nametable_mirror_region_aliases() {
        let mut bus = PpuBus::new();
        bus.write(0x2005, 0x77);
        assert_eq!(bus.read(0x3005), 0x77);
    }

    #[test]
    fn palette_background_mirror() {
        let mut bus = PpuBus::new();
        bus.write(0x3F10, 0x2A);
        assert_eq!(bus.read(0x3F00), 0x2A);
        bus.write(0x3F04, 0x15);
        assert_eq!(bus.read(0x3F14), 0x15);
        // Non-multiple-of-four sprite entries are their own cells.
        bus.write(0x3F11, 0x01);
        assert_ne!(bus.read(0x3F01), 0x01);
    }

    #[test]
    fn addresses_alias_by_14_bits() {
        let mut bus = PpuBus::new();
        bus.set_mirroring(Mirroring::Vertical);
        bus.write(0x2000, 0x5A);
        assert_eq!(bus.read(0x6000), 0x5A);
    }
}
