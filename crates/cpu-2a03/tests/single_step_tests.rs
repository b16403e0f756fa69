//! Integration tests using Tom Harte's `SingleStepTests` for the 6502.
//!
//! Runs 256 opcode files x 10,000 tests comparing CPU register state,
//! memory state, and the full bus-access trace after each instruction.
//!
//! Test data lives in `test-data/65x02/nes6502/v1/XX.json`.

use cpu_2a03::{Cpu2A03, Status};
use emu_core::Bus;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Flat 64KB RAM bus that records every access for trace comparison.
struct TestBus {
    ram: Vec<u8>,
    trace: Vec<(u16, u8, bool)>,
}

impl TestBus {
    fn new() -> Self {
        Self {
            ram: vec![0; 0x10000],
            trace: Vec::new(),
        }
    }

    fn load_ram(&mut self, entries: &[(u16, u8)]) {
        for &(addr, value) in entries {
            self.ram[usize::from(addr)] = value;
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        self.ram[usize::from(addr)]
    }
}

impl Bus for TestBus {
    fn read(&mut self, address: u16) -> u8 {
        let value = self.ram[usize::from(address)];
        self.trace.push((address, value, true));
        value
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
        self.trace.push((address, value, false));
    }
}

/// JSON test case format.
#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
    cycles: Vec<(u16, u8, String)>,
}

/// JSON CPU state format.
#[derive(Deserialize)]
struct CpuState {
    pc: u16,
    s: u8,
    a: u8,
    x: u8,
    y: u8,
    p: u8,
    ram: Vec<(u16, u8)>,
}

/// Set up the CPU and bus from the initial test state.
fn setup(cpu: &mut Cpu2A03, bus: &mut TestBus, state: &CpuState) {
    bus.load_ram(&state.ram);
    cpu.regs.pc = state.pc;
    cpu.regs.s = state.s;
    cpu.regs.a = state.a;
    cpu.regs.x = state.x;
    cpu.regs.y = state.y;
    cpu.regs.p = Status::from_bits(state.p);
}

/// Compare the CPU/bus state against expected, returning a list of mismatches.
fn compare(cpu: &Cpu2A03, bus: &TestBus, expected: &TestCase) -> Vec<String> {
    let mut errors = Vec::new();
    let want = &expected.final_state;

    if cpu.regs.pc != want.pc {
        errors.push(format!("PC: got ${:04X}, want ${:04X}", cpu.regs.pc, want.pc));
    }
    if cpu.regs.s != want.s {
        errors.push(format!("S: got ${:02X}, want ${:02X}", cpu.regs.s, want.s));
    }
    if cpu.regs.a != want.a {
        errors.push(format!("A: got ${:02X}, want ${:02X}", cpu.regs.a, want.a));
    }
    if cpu.regs.x != want.x {
        errors.push(format!("X: got ${:02X}, want ${:02X}", cpu.regs.x, want.x));
    }
    if cpu.regs.y != want.y {
        errors.push(format!("Y: got ${:02X}, want ${:02X}", cpu.regs.y, want.y));
    }

    // Status::from_bits() forces U; mirror that on the expected value.
    let actual_p = cpu.regs.p.0;
    let expected_p = want.p | 0x20;
    if actual_p != expected_p {
        errors.push(format!(
            "P: got ${actual_p:02X} ({actual_p:08b}), want ${expected_p:02X} ({expected_p:08b})"
        ));
    }

    for &(addr, expected_val) in &want.ram {
        let actual_val = bus.peek(addr);
        if actual_val != expected_val {
            errors.push(format!(
                "RAM[${addr:04X}]: got ${actual_val:02X}, want ${expected_val:02X}"
            ));
        }
    }

    if bus.trace.len() != expected.cycles.len() {
        errors.push(format!(
            "trace length: got {}, want {}",
            bus.trace.len(),
            expected.cycles.len()
        ));
    } else {
        for (i, (want_cycle, got)) in expected.cycles.iter().zip(&bus.trace).enumerate() {
            let want_read = want_cycle.2 == "read";
            if got.0 != want_cycle.0 || got.1 != want_cycle.1 || got.2 != want_read {
                errors.push(format!(
                    "cycle {i}: got (${:04X}, ${:02X}, {}), want (${:04X}, ${:02X}, {})",
                    got.0,
                    got.1,
                    if got.2 { "read" } else { "write" },
                    want_cycle.0,
                    want_cycle.1,
                    want_cycle.2,
                ));
            }
        }
    }

    errors
}

#[test]
#[ignore = "requires test-data/65x02 — run with --ignored"]
fn run_all() {
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("parent of crate dir")
        .parent()
        .expect("workspace root")
        .join("test-data/65x02/nes6502/v1");

    if !test_dir.exists() {
        eprintln!("Test data not found at {}", test_dir.display());
        eprintln!("Skipping SingleStepTests.");
        return;
    }

    let mut total_pass = 0u64;
    let mut total_fail = 0u64;
    let mut total_files = 0u32;

    for opcode in 0..=0xFF_u8 {
        let filename = format!("{opcode:02x}.json");
        let path = test_dir.join(&filename);
        if !path.exists() {
            continue;
        }

        let data = fs::read_to_string(&path).unwrap_or_else(|e| {
            panic!("Failed to read {}: {e}", path.display());
        });
        let tests: Vec<TestCase> = serde_json::from_str(&data).unwrap_or_else(|e| {
            panic!("Failed to parse {}: {e}", path.display());
        });

        let mut file_pass = 0u32;
        let mut file_fail = 0u32;
        let mut first_failures: Vec<String> = Vec::new();

        for test in &tests {
            let mut cpu = Cpu2A03::new();
            let mut bus = TestBus::new();

            setup(&mut cpu, &mut bus, &test.initial);

            // One PHI1/PHI2 pair per documented cycle, then a trailing PHI1
            // so deferred register work has been applied.
            for _ in 0..test.cycles.len() {
                cpu.tick_phi1(&mut bus);
                cpu.tick_phi2(&mut bus);
            }
            cpu.tick_phi1(&mut bus);

            let errors = compare(&cpu, &bus, test);
            if errors.is_empty() {
                file_pass += 1;
            } else {
                file_fail += 1;
                if first_failures.len() < 5 {
                    first_failures.push(format!("  FAIL [{}]: {}", test.name, errors.join(", ")));
                }
            }
        }

        let status = if file_fail == 0 { "PASS" } else { "FAIL" };
        println!(
            "Opcode ${opcode:02X} ({filename}): {status} — {file_pass}/{} passed",
            file_pass + file_fail
        );
        for msg in &first_failures {
            println!("{msg}");
        }

        total_pass += u64::from(file_pass);
        total_fail += u64::from(file_fail);
        total_files += 1;
    }

    println!();
    println!("=== SingleStepTests Summary ===");
    println!(
        "Files: {total_files}, Total: {}, Pass: {total_pass}, Fail: {total_fail}",
        total_pass + total_fail,
    );

    assert_eq!(total_fail, 0, "{total_fail} tests failed");
}
