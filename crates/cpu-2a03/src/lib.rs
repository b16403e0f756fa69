//! Cycle-accurate Ricoh 2A03 CPU core (NMOS 6502 without decimal mode).
//!
//! The CPU is stepped in half-cycles: `tick_phi1()` performs internal work,
//! `tick_phi2()` performs the cycle's one bus access. Instructions are
//! micro-op programs from a 258-entry table (256 opcodes plus the synthetic
//! NMI and IRQ sequences); each program entry covers one half-cycle.
//!
//! All 151 documented instructions and the stable/unstable undocumented
//! opcodes are implemented. JAM opcodes halt the CPU until reset.

mod cpu;
mod flags;
mod microcode;
mod registers;
mod table;

pub use cpu::{Cpu2A03, CPU_CONTEXT_LEN, VECTOR_IRQ, VECTOR_NMI, VECTOR_RESET};
pub use flags::Status;
pub use microcode::{AddrMode, Exec, Index, Instr, MicroOp, Mnemonic, RmwOp, ShTarget, Store};
pub use registers::Registers;
pub use table::{INSTRUCTIONS, OPCODE_IRQ, OPCODE_NMI};
