//! Boot a minimal NOP-sled cartridge and check the frame plumbing.

use emu_core::{DisplayHost, Tickable, Ticks};
use machine_nes::{Nes, NesConfig, Region};

/// 32K NROM image: NOP sled with the reset vector at $8000.
fn nop_sled_rom() -> Vec<u8> {
    let prg = 32 * 1024;
    let mut data = vec![0u8; 16 + prg + 8 * 1024];
    data[0..4].copy_from_slice(b"NES\x1a");
    data[4] = 2;
    data[5] = 1;
    for byte in &mut data[16..16 + prg] {
        *byte = 0xEA;
    }
    data[16 + prg - 4] = 0x00; // reset vector low
    data[16 + prg - 3] = 0x80; // reset vector high
    data
}

fn make_nes(region: Region) -> Nes {
    Nes::new(&NesConfig {
        rom_data: nop_sled_rom(),
        region,
    })
    .expect("valid rom")
}

#[test]
fn boots_to_the_reset_vector() {
    let mut nes = make_nes(Region::Ntsc);
    // Enough for the reset sequence and a few instructions.
    nes.run_until(Ticks::new(12 * 32));
    let pc = nes.cpu().regs.pc;
    assert!((0x8001..0x8100).contains(&pc), "PC={pc:#06X}");
    assert!(!nes.cpu().is_jammed());
}

#[test]
fn frame_lengths_match_region_geometry() {
    let mut ntsc = make_nes(Region::Ntsc);
    assert_eq!(ntsc.run_frame(), 341 * 262 * 4);

    let mut pal = make_nes(Region::Pal);
    assert_eq!(pal.run_frame(), 341 * 312 * 5);

    let mut dendy = make_nes(Region::Dendy);
    assert_eq!(dendy.run_frame(), 341 * 312 * 5);
}

#[test]
fn display_host_receives_one_frame_per_run_frame() {
    struct CountingDisplay(std::rc::Rc<std::cell::Cell<u32>>);

    impl DisplayHost for CountingDisplay {
        fn submit_frame(&mut self, framebuffer: &[u32]) {
            assert_eq!(framebuffer.len(), 256 * 240);
            self.0.set(self.0.get() + 1);
        }
    }

    let frames = std::rc::Rc::new(std::cell::Cell::new(0));
    let mut nes = make_nes(Region::Ntsc);
    nes.set_display_host(Box::new(CountingDisplay(frames.clone())));

    nes.run_frame();
    nes.run_frame();
    assert_eq!(frames.get(), 2);
}

#[test]
fn warm_reset_restarts_the_sled() {
    let mut nes = make_nes(Region::Ntsc);
    nes.run_frame();
    nes.reset();
    let s_before = nes.cpu().regs.s;
    nes.run_until(Ticks::new(nes.master_clock() + 12 * 8));
    let pc = nes.cpu().regs.pc;
    assert!((0x8001..0x8100).contains(&pc), "PC={pc:#06X}");
    assert_eq!(nes.cpu().regs.s, s_before.wrapping_sub(3));
}

#[test]
fn tick_is_usable_directly() {
    let mut nes = make_nes(Region::Ntsc);
    nes.tick_n(Ticks::new(48));
    assert_eq!(nes.master_clock(), 48);
    assert_eq!(nes.cpu().cycle_count(), 4);
}
