//! The Ricoh 2A03 CPU core.
//!
//! Execution is driven in half-cycles. `tick_phi1` runs internal work and
//! the interrupt-line latch chain; `tick_phi2` runs the cycle's single bus
//! access and samples the interrupt lines afterwards, so an edge landing on
//! the same half-cycle as a polling point is seen one instruction later,
//! as on hardware.
//!
//! The tick function is swappable state: normal fetch/execute, the OAM DMA
//! engine (which hijacks it and restores the saved copy when done), and the
//! jammed state reached through the JAM opcodes.

use emu_core::Bus;

use crate::flags::Status;
use crate::microcode::{Exec, Index, MicroOp, RmwOp, ShTarget, Store};
use crate::registers::Registers;
use crate::table::{INSTRUCTIONS, OPCODE_IRQ, OPCODE_NMI};

/// NMI vector address.
pub const VECTOR_NMI: u16 = 0xFFFA;
/// Reset vector address.
pub const VECTOR_RESET: u16 = 0xFFFC;
/// IRQ/BRK vector address.
pub const VECTOR_IRQ: u16 = 0xFFFE;

/// Serialized size of the CPU's private execution context, in bytes.
pub const CPU_CONTEXT_LEN: usize = 23;

/// Which routine the next half-cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickFn {
    /// Apply deferred work, then fetch and dispatch the next opcode.
    NextInstruction = 0,
    /// Step the current micro-op program.
    InstructionCycle = 1,
    /// OAM DMA: waiting for the read/write cadence to align.
    DmaAlign = 2,
    /// OAM DMA: read the next source byte.
    DmaRead = 3,
    /// OAM DMA: write the byte to the sprite port.
    DmaWrite = 4,
    /// JAM opcode executed; only reset leaves this state.
    Jammed = 5,
}

impl TickFn {
    fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::NextInstruction,
            1 => Self::InstructionCycle,
            2 => Self::DmaAlign,
            3 => Self::DmaRead,
            4 => Self::DmaWrite,
            5 => Self::Jammed,
            _ => return None,
        })
    }
}

/// The CPU core. See the crate docs for the execution model.
pub struct Cpu2A03 {
    /// Architectural registers, writable by test harnesses.
    pub regs: Registers,

    tick_fn: TickFn,
    /// Restored when a DMA transfer completes.
    tick_fn_copy: TickFn,

    /// Current opcode, including the synthetic entries $100/$101.
    opcode: u16,
    program: &'static [MicroOp],
    func_idx: usize,
    /// 1-based cycle within the instruction. Bookkeeping only.
    cycle: u8,

    operand: u8,
    pointer: u16,
    address: u16,
    target: u16,
    vector: u16,

    boundary_crossed: bool,
    take_jump: bool,
    /// Whether the interrupt sequence pushes P with B set (true for BRK).
    push_b: bool,
    /// False while the injected interrupt sequence is prefetching; PC is
    /// never advanced while this is false.
    allow_write_pc: bool,

    /// Deferred register work, applied at the next instruction's first PHI1.
    pending: Exec,

    nmi_line: bool,
    nmi_line_last: bool,
    detected_nmi: bool,
    handle_nmi: bool,
    irq_line: bool,
    irq_seen_low_phi2: bool,
    irq_phi1_flag: bool,
    handle_irq: bool,
    is_reset: bool,

    dma_counter: u16,
    dma_address: u16,
    dma_value: u8,

    cycle_count: u64,
}

impl Default for Cpu2A03 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu2A03 {
    /// Create a CPU with cleared registers and no reset pending. Call
    /// [`reset_cold`](Self::reset_cold) to run the power-on sequence;
    /// verification harnesses instead set `regs` directly.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            tick_fn: TickFn::NextInstruction,
            tick_fn_copy: TickFn::NextInstruction,
            opcode: 0xEA,
            program: INSTRUCTIONS[0xEA].program,
            func_idx: 0,
            cycle: 0,
            operand: 0,
            pointer: 0,
            address: 0,
            target: 0,
            vector: VECTOR_RESET,
            boundary_crossed: false,
            take_jump: false,
            push_b: false,
            allow_write_pc: true,
            pending: Exec::Nop,
            nmi_line: false,
            nmi_line_last: false,
            detected_nmi: false,
            handle_nmi: false,
            irq_line: false,
            irq_seen_low_phi2: false,
            irq_phi1_flag: false,
            handle_irq: false,
            is_reset: false,
            dma_counter: 0,
            dma_address: 0,
            dma_value: 0,
            cycle_count: 0,
        }
    }

    // =====================================================================
    // Half-cycle entry points
    // =====================================================================

    /// Run the PHI1 (internal) half of the current cycle.
    pub fn tick_phi1<B2: Bus>(&mut self, _bus: &mut B2) {
        // The IRQ level sampled during the previous PHI2 becomes visible to
        // polling now; this is the one-cycle IRQ recognition delay.
        self.irq_phi1_flag = self.irq_seen_low_phi2;
        self.irq_seen_low_phi2 = false;

        match self.tick_fn {
            TickFn::NextInstruction => self.begin_instruction_phi1(),
            TickFn::InstructionCycle => {
                self.cycle += 1;
                let op = self.program[self.func_idx];
                self.exec_phi1(op);
            }
            TickFn::DmaAlign | TickFn::DmaRead | TickFn::DmaWrite | TickFn::Jammed => {}
        }
    }

    /// Run the PHI2 (bus access) half of the current cycle.
    pub fn tick_phi2<B2: Bus>(&mut self, bus: &mut B2) {
        match self.tick_fn {
            TickFn::NextInstruction => self.fetch_opcode_phi2(bus),
            TickFn::InstructionCycle => {
                let op = self.program[self.func_idx];
                self.exec_phi2(op, bus);
            }
            TickFn::DmaAlign => {
                let _ = bus.read(self.regs.pc);
                if self.cycle_count & 1 == 1 {
                    self.tick_fn = TickFn::DmaRead;
                }
            }
            TickFn::DmaRead => {
                self.dma_value = bus.read(self.dma_address.wrapping_add(self.dma_counter));
                self.tick_fn = TickFn::DmaWrite;
            }
            TickFn::DmaWrite => {
                bus.write(0x2004, self.dma_value);
                self.dma_counter += 1;
                self.tick_fn = if self.dma_counter == 256 {
                    self.tick_fn_copy
                } else {
                    TickFn::DmaRead
                };
            }
            TickFn::Jammed => {
                let _ = bus.read(self.regs.pc);
            }
        }

        // Interrupt lines are sampled after the bus access, so an edge in
        // the same half-cycle as a poll is not seen until the next poll.
        if self.nmi_line && !self.nmi_line_last {
            self.detected_nmi = true;
        }
        self.nmi_line_last = self.nmi_line;
        self.irq_seen_low_phi2 |= self.irq_line;

        self.cycle_count += 1;

        if let Some(page) = bus.take_dma_request() {
            self.begin_dma(page);
        }
    }

    // =====================================================================
    // Resets, interrupt lines, DMA
    // =====================================================================

    /// Cold reset: registers cleared, then the 7-cycle reset sequence runs
    /// with stack writes suppressed, leaving S at $FD and PC at the reset
    /// vector. Memory is untouched; that is the bus's concern.
    pub fn reset_cold(&mut self) {
        self.regs = Registers::new();
        self.clear_transients();
        self.cycle_count = 0;
        self.is_reset = true;
    }

    /// Warm ("analog") reset: registers and memory keep their values, the
    /// reset sequence runs with pushes converted to reads, S ends three
    /// lower, I ends set.
    pub fn reset_warm(&mut self) {
        self.clear_transients();
        self.is_reset = true;
    }

    fn clear_transients(&mut self) {
        self.tick_fn = TickFn::NextInstruction;
        self.tick_fn_copy = TickFn::NextInstruction;
        self.opcode = 0xEA;
        self.program = INSTRUCTIONS[0xEA].program;
        self.func_idx = 0;
        self.cycle = 0;
        self.pending = Exec::Nop;
        self.allow_write_pc = true;
        self.boundary_crossed = false;
        self.take_jump = false;
        self.push_b = false;
        self.detected_nmi = false;
        self.handle_nmi = false;
        self.handle_irq = false;
        self.irq_seen_low_phi2 = false;
        self.irq_phi1_flag = false;
        self.dma_counter = 0;
        self.dma_address = 0;
        self.dma_value = 0;
    }

    /// Drive the NMI line low (asserted). Edge-detected.
    pub fn nmi_raise(&mut self) {
        self.nmi_line = true;
    }

    /// Release the NMI line.
    pub fn nmi_clear(&mut self) {
        self.nmi_line = false;
    }

    /// Set the NMI line level directly.
    pub fn set_nmi_line(&mut self, asserted: bool) {
        self.nmi_line = asserted;
    }

    /// Drive the IRQ line low (asserted). Level-sensitive.
    pub fn irq_raise(&mut self) {
        self.irq_line = true;
    }

    /// Release the IRQ line.
    pub fn irq_clear(&mut self) {
        self.irq_line = false;
    }

    /// Set the IRQ line level directly.
    pub fn set_irq_line(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// Begin an OAM DMA transfer from `page << 8`. Called when the bus
    /// reports a write to the DMA port; the transfer hijacks the tick
    /// function and restores the interrupted flow when the 256th byte has
    /// been written.
    pub fn begin_dma(&mut self, page: u8) {
        self.dma_address = u16::from(page) << 8;
        self.dma_counter = 0;
        self.tick_fn = TickFn::DmaAlign;
    }

    // =====================================================================
    // Accessors
    // =====================================================================

    /// Total CPU cycles executed.
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Overwrite the cycle counter (save-state restore).
    pub fn set_cycle_count(&mut self, count: u64) {
        self.cycle_count = count;
    }

    /// True after a JAM opcode has halted the CPU.
    #[must_use]
    pub fn is_jammed(&self) -> bool {
        self.tick_fn == TickFn::Jammed
    }

    /// True while an OAM DMA transfer owns the tick function.
    #[must_use]
    pub fn dma_active(&self) -> bool {
        matches!(
            self.tick_fn,
            TickFn::DmaAlign | TickFn::DmaRead | TickFn::DmaWrite
        )
    }

    /// The opcode currently executing (including $100/$101).
    #[must_use]
    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    /// True at an instruction boundary (the next cycle fetches an opcode).
    #[must_use]
    pub fn at_instruction_boundary(&self) -> bool {
        self.tick_fn == TickFn::NextInstruction
    }

    // =====================================================================
    // Fetch/dispatch
    // =====================================================================

    fn begin_instruction_phi1(&mut self) {
        let exec = core::mem::replace(&mut self.pending, Exec::Nop);
        self.apply_exec(exec);
        self.cycle = 1;
        // While an interrupt or reset is being injected the sequence
        // prefetches without touching PC.
        self.allow_write_pc = !(self.is_reset || self.handle_nmi || self.handle_irq);
    }

    fn fetch_opcode_phi2<B2: Bus>(&mut self, bus: &mut B2) {
        let value = bus.read(self.regs.pc);
        if self.is_reset || self.handle_nmi {
            // Reset borrows the NMI entry; the vector select sorts it out.
            self.opcode = OPCODE_NMI;
        } else if self.handle_irq {
            self.opcode = OPCODE_IRQ;
        } else {
            self.opcode = u16::from(value);
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
        let instr = &INSTRUCTIONS[self.opcode as usize];
        self.program = instr.program;
        self.func_idx = 0;
        self.push_b = self.opcode < 0x100;
        self.tick_fn = TickFn::InstructionCycle;
        self.tick_fn_copy = TickFn::InstructionCycle;
    }

    fn next(&mut self) {
        self.func_idx += 1;
    }

    fn finish(&mut self, poll: bool) {
        if poll {
            self.poll_interrupts();
        }
        self.tick_fn = TickFn::NextInstruction;
        self.tick_fn_copy = TickFn::NextInstruction;
    }

    fn poll_interrupts(&mut self) {
        if self.detected_nmi {
            self.handle_nmi = true;
        }
        if self.irq_phi1_flag && !self.regs.p.contains(Status::I) {
            self.handle_irq = true;
        }
    }

    fn index(&self, idx: Index) -> u8 {
        match idx {
            Index::X => self.regs.x,
            Index::Y => self.regs.y,
        }
    }

    // =====================================================================
    // PHI1 micro-ops
    // =====================================================================

    fn exec_phi1(&mut self, op: MicroOp) {
        match op {
            MicroOp::Decode => {}
            MicroOp::AddXToPointer => {
                self.pointer = u16::from((self.pointer as u8).wrapping_add(self.regs.x));
            }
            MicroOp::IndexAddressZp(idx) => {
                self.address = u16::from((self.address as u8).wrapping_add(self.index(idx)));
            }
            MicroOp::IndexAddressLow(idx) => {
                self.target = self.address.wrapping_add(u16::from(self.index(idx)));
                self.boundary_crossed = (self.target & 0xFF00) != (self.address & 0xFF00);
                self.address = (self.address & 0xFF00) | (self.target & 0x00FF);
            }
            MicroOp::FixAddressHigh => {
                self.address = self.target;
            }
            MicroOp::Rmw(rmw) => self.apply_rmw(rmw),
            MicroOp::Jam => {
                if self.allow_write_pc {
                    self.regs.pc = self.regs.pc.wrapping_sub(1);
                }
                self.tick_fn = TickFn::Jammed;
                self.tick_fn_copy = TickFn::Jammed;
            }
            MicroOp::SelectVector => self.select_vector(),
            MicroOp::SetInterruptFlags => {
                self.regs.p.insert(Status::I);
                self.allow_write_pc = true;
                self.is_reset = false;
            }
            MicroOp::BranchCheck { flag, expect_set } => {
                self.take_jump = self.regs.p.contains(flag) == expect_set;
            }
            _ => debug_assert!(false, "PHI2 micro-op scheduled on PHI1: {op:?}"),
        }
        if self.tick_fn == TickFn::InstructionCycle {
            self.next();
        }
    }

    fn select_vector(&mut self) {
        if self.is_reset {
            self.vector = VECTOR_RESET;
        } else if self.detected_nmi {
            // Hijack: an NMI edge seen before this half-cycle redirects a
            // BRK or IRQ already in flight. The pushed B bit stays as the
            // entered sequence chose it.
            self.vector = VECTOR_NMI;
        } else {
            self.vector = VECTOR_IRQ;
        }
        if self.detected_nmi {
            self.detected_nmi = false;
            self.handle_nmi = false;
        }
        self.handle_irq = false;
    }

    // =====================================================================
    // PHI2 micro-ops
    // =====================================================================

    fn exec_phi2<B2: Bus>(&mut self, op: MicroOp, bus: &mut B2) {
        match op {
            MicroOp::FetchOperand => {
                self.operand = bus.read(self.regs.pc);
                if self.allow_write_pc {
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                }
                self.next();
            }
            MicroOp::FetchOperandFinish(e) => {
                self.operand = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.pending = e;
                self.finish(true);
            }
            MicroOp::DummyPc => {
                let _ = bus.read(self.regs.pc);
                self.next();
            }
            MicroOp::DummyPcFinish(e) => {
                let _ = bus.read(self.regs.pc);
                self.pending = e;
                self.finish(true);
            }
            MicroOp::DummyPcIncFinish => {
                let _ = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.finish(true);
            }
            MicroOp::FetchZpAddress => {
                self.address = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.next();
            }
            MicroOp::FetchAddressLow => {
                self.address = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.next();
            }
            MicroOp::FetchAddressHigh => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.address = (u16::from(hi) << 8) | (self.address & 0x00FF);
                self.next();
            }
            MicroOp::FetchAddressHighSetPcFinish => {
                let hi = bus.read(self.regs.pc);
                self.address = (u16::from(hi) << 8) | (self.address & 0x00FF);
                self.regs.pc = self.address;
                self.finish(true);
            }
            MicroOp::FetchPointerZp => {
                self.pointer = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.next();
            }
            MicroOp::FetchPointerLow => {
                self.pointer = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.next();
            }
            MicroOp::FetchPointerHigh => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.pointer = (u16::from(hi) << 8) | (self.pointer & 0x00FF);
                self.next();
            }
            MicroOp::ReadPointerDiscard => {
                let _ = bus.read(self.pointer);
                self.next();
            }
            MicroOp::ReadPointerToAddressLow => {
                self.address = u16::from(bus.read(self.pointer));
                self.next();
            }
            MicroOp::ReadPointerToAddressHigh => {
                let hi = bus.read(self.pointer_plus_one_same_page());
                self.address = (u16::from(hi) << 8) | (self.address & 0x00FF);
                self.next();
            }
            MicroOp::ReadPointerToAddressHighSetPcFinish => {
                let hi = bus.read(self.pointer_plus_one_same_page());
                self.address = (u16::from(hi) << 8) | (self.address & 0x00FF);
                self.regs.pc = self.address;
                self.finish(true);
            }
            MicroOp::ReadAddressDiscard => {
                let _ = bus.read(self.address);
                self.next();
            }
            MicroOp::ReadAddressToOperand => {
                self.operand = bus.read(self.address);
                self.next();
            }
            MicroOp::ReadAddressToOperandFinish(e) => {
                self.operand = bus.read(self.address);
                self.pending = e;
                self.finish(true);
            }
            MicroOp::ReadCross(e) => {
                self.operand = bus.read(self.address);
                if self.boundary_crossed {
                    self.next();
                } else {
                    self.pending = e;
                    self.finish(true);
                }
            }
            MicroOp::WriteFinish(s) => {
                let value = self.store_value(s);
                bus.write(self.address, value);
                self.finish(true);
            }
            MicroOp::WriteOperand => {
                bus.write(self.address, self.operand);
                self.next();
            }
            MicroOp::WriteOperandFinish => {
                bus.write(self.address, self.operand);
                self.finish(true);
            }
            MicroOp::ShStoreFinish(t) => self.sh_store(t, bus),
            MicroOp::PushPch => {
                self.push(bus, (self.regs.pc >> 8) as u8);
                self.next();
            }
            MicroOp::PushPcl => {
                self.push(bus, self.regs.pc as u8);
                self.next();
            }
            MicroOp::PushStatusVector => {
                let value = self.regs.p.pushed(self.push_b);
                self.push(bus, value);
                self.next();
            }
            MicroOp::PushStatusPhpFinish => {
                let value = self.regs.p.pushed(true);
                self.push(bus, value);
                self.finish(true);
            }
            MicroOp::PushAFinish => {
                let value = self.regs.a;
                self.push(bus, value);
                self.finish(true);
            }
            MicroOp::StackDummy => {
                let _ = bus.read(self.regs.stack_addr());
                self.next();
            }
            MicroOp::StackDummyInc => {
                let _ = bus.read(self.regs.stack_addr());
                self.regs.s = self.regs.s.wrapping_add(1);
                self.next();
            }
            MicroOp::PullOperandFinish(e) => {
                self.operand = bus.read(self.regs.stack_addr());
                self.pending = e;
                self.finish(true);
            }
            MicroOp::PullStatusInc => {
                let value = bus.read(self.regs.stack_addr());
                self.regs.p = Status::from_pull(value);
                self.regs.s = self.regs.s.wrapping_add(1);
                self.next();
            }
            MicroOp::PullTargetLowInc => {
                let lo = bus.read(self.regs.stack_addr());
                self.target = (self.target & 0xFF00) | u16::from(lo);
                self.regs.s = self.regs.s.wrapping_add(1);
                self.next();
            }
            MicroOp::PullTargetHighSetPc => {
                let hi = bus.read(self.regs.stack_addr());
                self.target = (u16::from(hi) << 8) | (self.target & 0x00FF);
                self.regs.pc = self.target;
                self.next();
            }
            MicroOp::PullTargetHighSetPcFinish => {
                let hi = bus.read(self.regs.stack_addr());
                self.target = (u16::from(hi) << 8) | (self.target & 0x00FF);
                self.regs.pc = self.target;
                self.finish(true);
            }
            MicroOp::ReadVectorLow => {
                self.target = u16::from(bus.read(self.vector));
                self.next();
            }
            MicroOp::ReadVectorHighFinish => {
                let hi = bus.read(self.vector.wrapping_add(1));
                self.target = (u16::from(hi) << 8) | (self.target & 0x00FF);
                self.regs.pc = self.target;
                // The handler's first instruction always runs before the
                // next interrupt can be taken.
                self.finish(false);
            }
            MicroOp::BranchOperand => {
                self.operand = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                if self.take_jump {
                    let offset = i16::from(self.operand as i8);
                    self.address = self.regs.pc.wrapping_add(offset as u16);
                    self.boundary_crossed =
                        (self.address & 0xFF00) != (self.regs.pc & 0xFF00);
                    if !self.boundary_crossed {
                        // Branch quirk: a same-page taken branch polls here,
                        // before the cycle that fixes PCL.
                        self.poll_interrupts();
                    }
                    self.next();
                } else {
                    self.finish(true);
                }
            }
            MicroOp::BranchDummy => {
                let _ = bus.read(self.regs.pc);
                if self.boundary_crossed {
                    self.next();
                } else {
                    self.regs.pc = self.address;
                    self.finish(false);
                }
            }
            MicroOp::BranchFixFinish => {
                self.regs.pc = self.address;
                let _ = bus.read(self.regs.pc);
                self.finish(true);
            }
            _ => debug_assert!(false, "PHI1 micro-op scheduled on PHI2: {op:?}"),
        }
    }

    fn pointer_plus_one_same_page(&self) -> u16 {
        (self.pointer & 0xFF00) | (self.pointer.wrapping_add(1) & 0x00FF)
    }

    /// Stack push; during the reset sequence the write becomes a read, but
    /// S still decrements.
    fn push<B2: Bus>(&mut self, bus: &mut B2, value: u8) {
        let addr = self.regs.stack_addr();
        if self.is_reset {
            let _ = bus.read(addr);
        } else {
            bus.write(addr, value);
        }
        self.regs.s = self.regs.s.wrapping_sub(1);
    }

    fn store_value(&self, s: Store) -> u8 {
        match s {
            Store::A => self.regs.a,
            Store::X => self.regs.x,
            Store::Y => self.regs.y,
            Store::AX => self.regs.a & self.regs.x,
        }
    }

    /// The unstable SH* stores: value is the source register set ANDed with
    /// (effective high byte + 1); on a page crossing the AND drops the +1
    /// and the value replaces the high byte of the target address.
    fn sh_store<B2: Bus>(&mut self, t: ShTarget, bus: &mut B2) {
        let base = match t {
            ShTarget::AX | ShTarget::AXS => self.regs.a & self.regs.x,
            ShTarget::X => self.regs.x,
            ShTarget::Y => self.regs.y,
        };
        if t == ShTarget::AXS {
            self.regs.s = self.regs.a & self.regs.x;
        }
        let hi = (self.address >> 8) as u8;
        let (addr, value) = if self.boundary_crossed {
            let v = base & hi;
            ((u16::from(v) << 8) | (self.address & 0x00FF), v)
        } else {
            (self.address, base & hi.wrapping_add(1))
        };
        bus.write(addr, value);
        self.finish(true);
    }

    // =====================================================================
    // ALU
    // =====================================================================

    fn adc(&mut self, value: u8) {
        let a = u16::from(self.regs.a);
        let m = u16::from(value);
        let sum = a + m + u16::from(self.regs.p.carry());
        self.regs
            .p
            .assign(Status::V, (!(a ^ m) & (a ^ sum)) & 0x0080 != 0);
        self.regs.p.assign(Status::C, sum > 0xFF);
        self.regs.a = sum as u8;
        self.regs.p.set_nz(self.regs.a);
    }

    fn sbc(&mut self, value: u8) {
        // Binary-mode subtract is an add of the inverted operand; the 2A03
        // has no decimal mode, so this is the whole story.
        let a = u16::from(self.regs.a);
        let m = u16::from(value) ^ 0x00FF;
        let sum = a + m + u16::from(self.regs.p.carry());
        self.regs.p.assign(Status::V, ((a ^ sum) & (m ^ sum)) & 0x0080 != 0);
        self.regs.p.assign(Status::C, sum > 0xFF);
        self.regs.a = sum as u8;
        self.regs.p.set_nz(self.regs.a);
    }

    fn compare(&mut self, reg: u8, value: u8) {
        self.regs.p.assign(Status::C, reg >= value);
        self.regs.p.assign(Status::Z, reg == value);
        self.regs
            .p
            .assign(Status::N, reg.wrapping_sub(value) & 0x80 != 0);
    }

    fn apply_rmw(&mut self, op: RmwOp) {
        match op {
            RmwOp::Asl => {
                self.regs.p.assign(Status::C, self.operand & 0x80 != 0);
                self.operand <<= 1;
                self.regs.p.set_nz(self.operand);
            }
            RmwOp::Lsr => {
                self.regs.p.assign(Status::C, self.operand & 0x01 != 0);
                self.operand >>= 1;
                self.regs.p.set_nz(self.operand);
            }
            RmwOp::Rol => {
                let low = self.regs.p.carry();
                self.regs.p.assign(Status::C, self.operand & 0x80 != 0);
                self.operand = (self.operand << 1) | low;
                self.regs.p.set_nz(self.operand);
            }
            RmwOp::Ror => {
                let high = (self.regs.p.carry()) << 7;
                self.regs.p.assign(Status::C, self.operand & 0x01 != 0);
                self.operand = (self.operand >> 1) | high;
                self.regs.p.set_nz(self.operand);
            }
            RmwOp::Inc => {
                self.operand = self.operand.wrapping_add(1);
                self.regs.p.set_nz(self.operand);
            }
            RmwOp::Dec => {
                self.operand = self.operand.wrapping_sub(1);
                self.regs.p.set_nz(self.operand);
            }
            RmwOp::Slo => {
                self.regs.p.assign(Status::C, self.operand & 0x80 != 0);
                self.operand <<= 1;
                self.regs.a |= self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            RmwOp::Sre => {
                self.regs.p.assign(Status::C, self.operand & 0x01 != 0);
                self.operand >>= 1;
                self.regs.a ^= self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            RmwOp::Rla => {
                let low = self.regs.p.carry();
                self.regs.p.assign(Status::C, self.operand & 0x80 != 0);
                self.operand = (self.operand << 1) | low;
                self.regs.a &= self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            RmwOp::Rra => {
                let high = (self.regs.p.carry()) << 7;
                self.regs.p.assign(Status::C, self.operand & 0x01 != 0);
                self.operand = (self.operand >> 1) | high;
                self.adc(self.operand);
            }
            RmwOp::Dcp => {
                self.operand = self.operand.wrapping_sub(1);
                self.compare(self.regs.a, self.operand);
            }
            RmwOp::Isb => {
                self.operand = self.operand.wrapping_add(1);
                self.sbc(self.operand);
            }
        }
    }

    // =====================================================================
    // Deferred register work
    // =====================================================================

    #[allow(clippy::too_many_lines)]
    fn apply_exec(&mut self, e: Exec) {
        match e {
            Exec::Nop => {}
            Exec::Lda => {
                self.regs.a = self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Ldx => {
                self.regs.x = self.operand;
                self.regs.p.set_nz(self.regs.x);
            }
            Exec::Ldy => {
                self.regs.y = self.operand;
                self.regs.p.set_nz(self.regs.y);
            }
            Exec::Lax => {
                self.regs.a = self.operand;
                self.regs.x = self.operand;
                self.regs.p.set_nz(self.operand);
            }
            Exec::Las => {
                let value = self.operand & self.regs.s;
                self.regs.a = value;
                self.regs.x = value;
                self.regs.s = value;
                self.regs.p.set_nz(value);
            }
            Exec::Adc => self.adc(self.operand),
            Exec::Sbc => self.sbc(self.operand),
            Exec::And => {
                self.regs.a &= self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Ora => {
                self.regs.a |= self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Eor => {
                self.regs.a ^= self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Cmp => self.compare(self.regs.a, self.operand),
            Exec::Cpx => self.compare(self.regs.x, self.operand),
            Exec::Cpy => self.compare(self.regs.y, self.operand),
            Exec::Bit => {
                self.regs.p.assign(Status::V, self.operand & 0x40 != 0);
                self.regs.p.assign(Status::N, self.operand & 0x80 != 0);
                self.regs.p.assign(Status::Z, self.operand & self.regs.a == 0);
            }
            Exec::Anc => {
                self.regs.a &= self.operand;
                self.regs.p.set_nz(self.regs.a);
                self.regs.p.assign(Status::C, self.regs.a & 0x80 != 0);
            }
            Exec::Alr => {
                self.regs.a &= self.operand;
                self.regs.p.assign(Status::C, self.regs.a & 0x01 != 0);
                self.regs.a >>= 1;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Arr => {
                self.regs.a &= self.operand;
                let high = (self.regs.p.carry()) << 7;
                self.regs.a = (self.regs.a >> 1) | high;
                self.regs.p.set_nz(self.regs.a);
                self.regs.p.assign(Status::C, self.regs.a & 0x40 != 0);
                self.regs
                    .p
                    .assign(Status::V, ((self.regs.a >> 6) ^ (self.regs.a >> 5)) & 1 != 0);
            }
            Exec::Ane => {
                self.regs.a = (self.regs.a | 0xEE) & self.regs.x & self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Lxa => {
                self.regs.a = (self.regs.a | 0xEE) & self.operand;
                self.regs.x = self.regs.a;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Sbx => {
                let ax = self.regs.a & self.regs.x;
                self.regs.p.assign(Status::C, ax >= self.operand);
                self.regs.x = ax.wrapping_sub(self.operand);
                self.regs.p.set_nz(self.regs.x);
            }
            Exec::AslA => {
                self.regs.p.assign(Status::C, self.regs.a & 0x80 != 0);
                self.regs.a <<= 1;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::LsrA => {
                self.regs.p.assign(Status::C, self.regs.a & 0x01 != 0);
                self.regs.a >>= 1;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::RolA => {
                let low = self.regs.p.carry();
                self.regs.p.assign(Status::C, self.regs.a & 0x80 != 0);
                self.regs.a = (self.regs.a << 1) | low;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::RorA => {
                let high = (self.regs.p.carry()) << 7;
                self.regs.p.assign(Status::C, self.regs.a & 0x01 != 0);
                self.regs.a = (self.regs.a >> 1) | high;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.p.set_nz(self.regs.x);
            }
            Exec::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.p.set_nz(self.regs.y);
            }
            Exec::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.p.set_nz(self.regs.x);
            }
            Exec::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.p.set_nz(self.regs.y);
            }
            Exec::Tax => {
                self.regs.x = self.regs.a;
                self.regs.p.set_nz(self.regs.x);
            }
            Exec::Tay => {
                self.regs.y = self.regs.a;
                self.regs.p.set_nz(self.regs.y);
            }
            Exec::Txa => {
                self.regs.a = self.regs.x;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Tya => {
                self.regs.a = self.regs.y;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Tsx => {
                self.regs.x = self.regs.s;
                self.regs.p.set_nz(self.regs.x);
            }
            Exec::Txs => {
                self.regs.s = self.regs.x;
            }
            Exec::Clc => self.regs.p.remove(Status::C),
            Exec::Sec => self.regs.p.insert(Status::C),
            Exec::Cli => self.regs.p.remove(Status::I),
            Exec::Sei => self.regs.p.insert(Status::I),
            Exec::Cld => self.regs.p.remove(Status::D),
            Exec::Sed => self.regs.p.insert(Status::D),
            Exec::Clv => self.regs.p.remove(Status::V),
            Exec::Pla => {
                self.regs.a = self.operand;
                self.regs.p.set_nz(self.regs.a);
            }
            Exec::Plp => {
                self.regs.p = Status::from_pull(self.operand);
            }
        }
    }

    // =====================================================================
    // Save-state support
    // =====================================================================

    /// Append the private execution context (everything except the
    /// architectural registers and the cycle counter) to `out`. Exactly
    /// [`CPU_CONTEXT_LEN`] bytes.
    pub fn write_context(&self, out: &mut Vec<u8>) {
        out.push(self.tick_fn as u8);
        out.push(self.tick_fn_copy as u8);
        out.extend_from_slice(&self.opcode.to_le_bytes());
        out.push(self.func_idx as u8);
        out.push(self.cycle);
        out.push(self.operand);
        out.extend_from_slice(&self.pointer.to_le_bytes());
        out.extend_from_slice(&self.address.to_le_bytes());
        out.extend_from_slice(&self.target.to_le_bytes());
        let mut bits = 0u8;
        for (i, flag) in [
            self.boundary_crossed,
            self.take_jump,
            self.push_b,
            self.allow_write_pc,
            self.is_reset,
        ]
        .into_iter()
        .enumerate()
        {
            bits |= u8::from(flag) << i;
        }
        out.push(bits);
        let mut lines = 0u8;
        for (i, flag) in [
            self.nmi_line,
            self.nmi_line_last,
            self.detected_nmi,
            self.handle_nmi,
            self.irq_line,
            self.irq_seen_low_phi2,
            self.irq_phi1_flag,
            self.handle_irq,
        ]
        .into_iter()
        .enumerate()
        {
            lines |= u8::from(flag) << i;
        }
        out.push(lines);
        out.extend_from_slice(&self.dma_counter.to_le_bytes());
        out.extend_from_slice(&self.dma_address.to_le_bytes());
        out.push(self.dma_value);
        out.extend_from_slice(&self.vector.to_le_bytes());
        out.push(exec_to_u8(self.pending));
    }

    /// Restore the private execution context written by
    /// [`write_context`](Self::write_context). Returns `None` on malformed
    /// input.
    #[must_use]
    pub fn read_context(&mut self, bytes: &[u8]) -> Option<()> {
        if bytes.len() < CPU_CONTEXT_LEN {
            return None;
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let tick_fn = TickFn::from_u8(bytes[0])?;
        let tick_fn_copy = TickFn::from_u8(bytes[1])?;
        let opcode = u16_at(2);
        if opcode > OPCODE_IRQ {
            return None;
        }
        let program = INSTRUCTIONS[opcode as usize].program;
        let func_idx = usize::from(bytes[4]);
        if func_idx > program.len()
            || (tick_fn == TickFn::InstructionCycle && func_idx >= program.len())
        {
            return None;
        }
        self.tick_fn = tick_fn;
        self.tick_fn_copy = tick_fn_copy;
        self.opcode = opcode;
        self.program = program;
        self.func_idx = func_idx;
        self.cycle = bytes[5];
        self.operand = bytes[6];
        self.pointer = u16_at(7);
        self.address = u16_at(9);
        self.target = u16_at(11);
        let bits = bytes[13];
        self.boundary_crossed = bits & 0x01 != 0;
        self.take_jump = bits & 0x02 != 0;
        self.push_b = bits & 0x04 != 0;
        self.allow_write_pc = bits & 0x08 != 0;
        self.is_reset = bits & 0x10 != 0;
        let lines = bytes[14];
        self.nmi_line = lines & 0x01 != 0;
        self.nmi_line_last = lines & 0x02 != 0;
        self.detected_nmi = lines & 0x04 != 0;
        self.handle_nmi = lines & 0x08 != 0;
        self.irq_line = lines & 0x10 != 0;
        self.irq_seen_low_phi2 = lines & 0x20 != 0;
        self.irq_phi1_flag = lines & 0x40 != 0;
        self.handle_irq = lines & 0x80 != 0;
        self.dma_counter = u16_at(15);
        self.dma_address = u16_at(17);
        self.dma_value = bytes[19];
        self.vector = u16_at(20);
        self.pending = exec_from_u8(bytes[22])?;
        Some(())
    }
}

fn exec_to_u8(e: Exec) -> u8 {
    e as u8
}

fn exec_from_u8(value: u8) -> Option<Exec> {
    EXEC_ORDER.get(usize::from(value)).copied()
}

/// Declaration-order list used to map serialized discriminants back to
/// [`Exec`] values.
#[rustfmt::skip]
const EXEC_ORDER: [Exec; 44] = [
    Exec::Nop, Exec::Lda, Exec::Ldx, Exec::Ldy, Exec::Lax, Exec::Las,
    Exec::Adc, Exec::Sbc, Exec::And, Exec::Ora, Exec::Eor, Exec::Cmp,
    Exec::Cpx, Exec::Cpy, Exec::Bit, Exec::Anc, Exec::Alr, Exec::Arr,
    Exec::Ane, Exec::Lxa, Exec::Sbx, Exec::AslA, Exec::LsrA, Exec::RolA,
    Exec::RorA, Exec::Inx, Exec::Iny, Exec::Dex, Exec::Dey, Exec::Tax,
    Exec::Tay, Exec::Txa, Exec::Tya, Exec::Tsx, Exec::Txs, Exec::Clc,
    Exec::Sec, Exec::Cli, Exec::Sei, Exec::Cld, Exec::Sed, Exec::Clv,
    Exec::Pla, Exec::Plp,
];
