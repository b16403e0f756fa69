//! Property-based tests for CPU invariants.
//!
//! These check the ALU flag laws and a handful of structural invariants
//! across the whole input space instead of hand-picked values.

use cpu_2a03::{Cpu2A03, Status, INSTRUCTIONS};
use emu_core::Bus;
use proptest::prelude::*;

/// Minimal flat bus; properties here don't inspect traces.
struct FlatBus {
    ram: Vec<u8>,
}

impl FlatBus {
    fn new() -> Self {
        Self { ram: vec![0; 0x10000] }
    }
}

impl Bus for FlatBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}

/// Run one complete instruction starting at $8000, then the trailing PHI1
/// that applies deferred register work.
fn run_one(cpu: &mut Cpu2A03, bus: &mut FlatBus, program: &[u8]) {
    for (i, &b) in program.iter().enumerate() {
        bus.ram[0x8000 + i] = b;
    }
    cpu.regs.pc = 0x8000;
    cpu.tick_phi1(bus);
    cpu.tick_phi2(bus);
    while !cpu.at_instruction_boundary() {
        cpu.tick_phi1(bus);
        cpu.tick_phi2(bus);
    }
    cpu.tick_phi1(bus);
}

fn cpu_with(a: u8, p: u8) -> Cpu2A03 {
    let mut cpu = Cpu2A03::new();
    cpu.regs.a = a;
    cpu.regs.s = 0xFD;
    cpu.regs.p = Status::from_bits(p);
    cpu
}

proptest! {
    /// ADC matches the wide-arithmetic reference, including C and V.
    #[test]
    fn adc_flag_laws(a in any::<u8>(), m in any::<u8>(), carry in any::<bool>()) {
        let mut cpu = cpu_with(a, if carry { 0x25 } else { 0x24 });
        let mut bus = FlatBus::new();
        run_one(&mut cpu, &mut bus, &[0x69, m]); // ADC #imm

        let wide = u16::from(a) + u16::from(m) + u16::from(carry);
        prop_assert_eq!(cpu.regs.a, wide as u8);
        prop_assert_eq!(cpu.regs.p.contains(0x01), wide > 0xFF);
        let expected_v = (!(a ^ m) & (a ^ wide as u8)) & 0x80 != 0;
        prop_assert_eq!(cpu.regs.p.contains(0x40), expected_v);
        prop_assert_eq!(cpu.regs.p.contains(0x02), wide as u8 == 0);
        prop_assert_eq!(cpu.regs.p.contains(0x80), wide as u8 & 0x80 != 0);
    }

    /// SBC is ADC of the inverted operand.
    #[test]
    fn sbc_is_adc_of_inverted_operand(a in any::<u8>(), m in any::<u8>(), carry in any::<bool>()) {
        let p = if carry { 0x25 } else { 0x24 };

        let mut sbc_cpu = cpu_with(a, p);
        let mut bus = FlatBus::new();
        run_one(&mut sbc_cpu, &mut bus, &[0xE9, m]); // SBC #imm

        let mut adc_cpu = cpu_with(a, p);
        let mut bus2 = FlatBus::new();
        run_one(&mut adc_cpu, &mut bus2, &[0x69, !m]); // ADC #!imm

        prop_assert_eq!(sbc_cpu.regs.a, adc_cpu.regs.a);
        prop_assert_eq!(sbc_cpu.regs.p, adc_cpu.regs.p);
    }

    /// CMP: C == (A >= M), Z == (A == M), N from the difference's bit 7.
    #[test]
    fn cmp_flag_laws(a in any::<u8>(), m in any::<u8>()) {
        let mut cpu = cpu_with(a, 0x24);
        let mut bus = FlatBus::new();
        run_one(&mut cpu, &mut bus, &[0xC9, m]); // CMP #imm

        prop_assert_eq!(cpu.regs.a, a, "CMP must not modify A");
        prop_assert_eq!(cpu.regs.p.contains(0x01), a >= m);
        prop_assert_eq!(cpu.regs.p.contains(0x02), a == m);
        prop_assert_eq!(cpu.regs.p.contains(0x80), a.wrapping_sub(m) & 0x80 != 0);
    }

    /// INC/DEC wrap and always leave N/Z consistent with the result.
    #[test]
    fn inc_dec_wrap_nz(value in any::<u8>()) {
        let mut cpu = cpu_with(0, 0x24);
        let mut bus = FlatBus::new();
        bus.ram[0x0010] = value;
        run_one(&mut cpu, &mut bus, &[0xE6, 0x10]); // INC $10
        let inc = value.wrapping_add(1);
        prop_assert_eq!(bus.ram[0x0010], inc);
        prop_assert_eq!(cpu.regs.p.contains(0x02), inc == 0);
        prop_assert_eq!(cpu.regs.p.contains(0x80), inc & 0x80 != 0);

        let mut cpu = cpu_with(0, 0x24);
        let mut bus = FlatBus::new();
        bus.ram[0x0010] = value;
        run_one(&mut cpu, &mut bus, &[0xC6, 0x10]); // DEC $10
        let dec = value.wrapping_sub(1);
        prop_assert_eq!(bus.ram[0x0010], dec);
        prop_assert_eq!(cpu.regs.p.contains(0x02), dec == 0);
        prop_assert_eq!(cpu.regs.p.contains(0x80), dec & 0x80 != 0);
    }

    /// The unused status bit reads 1 in every reachable state.
    #[test]
    fn unused_bit_stays_set(op in 0u8..=0xFF, a in any::<u8>(), x in any::<u8>(), y in any::<u8>()) {
        // Skip JAM opcodes; they never reach the next boundary.
        prop_assume!(INSTRUCTIONS[usize::from(op)].mnemonic != cpu_2a03::Mnemonic::Jam);
        // BRK needs a sane vector to come back from.
        let mut bus = FlatBus::new();
        bus.ram[0xFFFE] = 0x00;
        bus.ram[0xFFFF] = 0x90;

        let mut cpu = cpu_with(a, 0x24);
        cpu.regs.x = x;
        cpu.regs.y = y;
        run_one(&mut cpu, &mut bus, &[op, 0x10, 0x00]);
        prop_assert!(cpu.regs.p.contains(0x20), "U cleared by ${op:02X}");
    }

    /// Branch cycle counts: 2 not taken, 3 taken same page, 4 page cross.
    #[test]
    fn branch_cycle_counts(offset in any::<u8>(), zero in any::<bool>()) {
        let mut cpu = cpu_with(0, if zero { 0x26 } else { 0x24 });
        let mut bus = FlatBus::new();
        let start = cpu.cycle_count();
        run_one(&mut cpu, &mut bus, &[0xF0, offset]); // BEQ
        let elapsed = cpu.cycle_count() - start;

        if !zero {
            prop_assert_eq!(elapsed, 2);
            prop_assert_eq!(cpu.regs.pc, 0x8002);
        } else {
            let target = 0x8002u16.wrapping_add(i16::from(offset as i8) as u16);
            prop_assert_eq!(cpu.regs.pc, target);
            if target & 0xFF00 == 0x8000 {
                prop_assert_eq!(elapsed, 3);
            } else {
                prop_assert_eq!(elapsed, 4);
            }
        }
    }
}
