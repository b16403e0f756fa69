//! Micro-operation definitions for cycle-accurate 6502 execution.
//!
//! Each instruction is a program of micro-ops, one per half-cycle: even
//! program indices run on PHI1 (internal work), odd indices on PHI2 (the
//! cycle's one bus access). The opcode fetch cycle is not part of the
//! program; programs start at the second cycle of the instruction.
//!
//! Register-only work is carried as an [`Exec`] tag on the terminal
//! micro-op and applied at the next instruction's first PHI1, which is what
//! the real chip does (the ALU result lands while the next opcode is being
//! fetched). Interrupt polling points and the branch/CLI/SEI delay quirks
//! fall out of this ordering.

/// Index register selector for indexed addressing micro-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    X,
    Y,
}

/// Source of a store micro-op's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    /// STA.
    A,
    /// STX.
    X,
    /// STY.
    Y,
    /// SAX: A AND X.
    AX,
}

/// Target selector for the unstable SH* store family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShTarget {
    /// SHA: A AND X.
    AX,
    /// SHX.
    X,
    /// SHY.
    Y,
    /// SHS: A AND X, also copied into S.
    AXS,
}

/// Read-modify-write operations, applied to the operand latch on PHI1
/// between the dummy write and the final write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RmwOp {
    Asl,
    Lsr,
    Rol,
    Ror,
    Inc,
    Dec,
    /// ASL then ORA.
    Slo,
    /// LSR then EOR.
    Sre,
    /// ROL then AND.
    Rla,
    /// ROR then ADC.
    Rra,
    /// DEC then CMP.
    Dcp,
    /// INC then SBC.
    Isb,
}

/// Register-only instruction work, deferred to the next instruction's
/// first PHI1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exec {
    /// Nothing to apply (stores, jumps, official and unofficial NOPs).
    Nop,
    Lda,
    Ldx,
    Ldy,
    /// A and X from the operand.
    Lax,
    /// A, X and S from operand AND S.
    Las,
    Adc,
    Sbc,
    And,
    Ora,
    Eor,
    Cmp,
    Cpx,
    Cpy,
    Bit,
    /// AND, with C mirroring N.
    Anc,
    /// AND then LSR A.
    Alr,
    /// AND then ROR A with the C/V quirk.
    Arr,
    /// (A | $EE) AND X AND operand.
    Ane,
    /// (A | $EE) AND operand, into A and X.
    Lxa,
    /// X = (A AND X) - operand.
    Sbx,
    AslA,
    LsrA,
    RolA,
    RorA,
    Inx,
    Iny,
    Dex,
    Dey,
    Tax,
    Tay,
    Txa,
    Tya,
    Tsx,
    Txs,
    Clc,
    Sec,
    Cli,
    Sei,
    Cld,
    Sed,
    Clv,
    Pla,
    Plp,
}

/// One half-cycle of instruction execution.
///
/// PHI2 micro-ops perform exactly one bus access each. PHI1 micro-ops are
/// internal. Terminal micro-ops (`*Finish`) hand control back to the
/// instruction fetch, polling interrupts unless the variant says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroOp {
    // --- PHI1 ---
    /// Internal half-cycle, nothing observable.
    Decode,
    /// Pre-indexed pointer add: pointer = (pointer + X) mod 256.
    AddXToPointer,
    /// Zero-page indexing: address = (address + index) mod 256.
    IndexAddressZp(Index),
    /// Indexed low-byte add: keeps the unfixed high byte in `address`,
    /// records the full sum in `target`, and flags a page crossing.
    IndexAddressLow(Index),
    /// Copy the carried high byte from `target` into `address`.
    FixAddressHigh,
    /// Apply a read-modify-write operation to the operand latch.
    Rmw(RmwOp),
    /// Halt: back the PC up to the jam opcode and stop advancing.
    Jam,
    /// Pick the interrupt vector (reset > NMI > IRQ/BRK) and consume the
    /// NMI latch. This is the hijack point: an NMI edge seen before this
    /// half-cycle redirects a BRK or IRQ in flight.
    SelectVector,
    /// Set I, re-enable PC writes, finish reset special-casing.
    SetInterruptFlags,
    /// Decide whether a branch is taken from one status flag.
    BranchCheck { flag: u8, expect_set: bool },

    // --- PHI2 ---
    /// operand = read(PC); PC increments unless the injected interrupt
    /// sequence is prefetching.
    FetchOperand,
    /// Immediate-mode terminal: operand = read(PC++), then finish.
    FetchOperandFinish(Exec),
    /// Dummy read at PC without incrementing.
    DummyPc,
    /// Implied/accumulator terminal: dummy read at PC, then finish.
    DummyPcFinish(Exec),
    /// RTS terminal: dummy read at PC, increment PC, finish.
    DummyPcIncFinish,
    /// address = zero-page operand from read(PC++).
    FetchZpAddress,
    /// address low = read(PC++).
    FetchAddressLow,
    /// address high = read(PC++).
    FetchAddressHigh,
    /// JMP/JSR terminal: address high = read(PC), PC = address, finish.
    FetchAddressHighSetPcFinish,
    /// pointer = zero-page operand from read(PC++).
    FetchPointerZp,
    /// pointer low = read(PC++).
    FetchPointerLow,
    /// pointer high = read(PC++).
    FetchPointerHigh,
    /// Dummy read at the unindexed pointer.
    ReadPointerDiscard,
    /// address low = read(pointer).
    ReadPointerToAddressLow,
    /// address high = read(pointer + 1), wrapping within the pointer's
    /// page. This is the JMP ($xxFF) wrap and the zero-page wrap.
    ReadPointerToAddressHigh,
    /// JMP (ind) terminal: as above, then PC = address, finish.
    ReadPointerToAddressHighSetPcFinish,
    /// Dummy read at the (possibly unfixed) effective address.
    ReadAddressDiscard,
    /// operand = read(address).
    ReadAddressToOperand,
    /// Read terminal: operand = read(address), then finish.
    ReadAddressToOperandFinish(Exec),
    /// Indexed read: operand = read(address). Finishes early when no page
    /// was crossed; otherwise the fix-up cycle follows.
    ReadCross(Exec),
    /// Write terminal: store a register at the effective address.
    WriteFinish(Store),
    /// Dummy write of the unmodified operand (RMW).
    WriteOperand,
    /// RMW terminal: write the modified operand.
    WriteOperandFinish,
    /// Unstable SH* terminal: store masked by (address high + 1), with the
    /// high byte of the target corrupted by the mask on a page crossing.
    ShStoreFinish(ShTarget),
    /// Push PC high. During reset the stack writes become reads.
    PushPch,
    /// Push PC low.
    PushPcl,
    /// Push P for the interrupt sequence; B as the entered program set it.
    PushStatusVector,
    /// PHP terminal: push P with B and U set.
    PushStatusPhpFinish,
    /// PHA terminal.
    PushAFinish,
    /// Dummy stack read, S unchanged (JSR).
    StackDummy,
    /// Dummy stack read, then increment S (pull setup).
    StackDummyInc,
    /// Pull terminal: operand = read(stack), then finish.
    PullOperandFinish(Exec),
    /// P = pulled byte (B discarded), increment S.
    PullStatusInc,
    /// target low = read(stack), increment S.
    PullTargetLowInc,
    /// target high = read(stack), PC = target.
    PullTargetHighSetPc,
    /// RTI terminal: as above, then finish.
    PullTargetHighSetPcFinish,
    /// target low = read(vector), I already set.
    ReadVectorLow,
    /// Interrupt terminal: target high = read(vector + 1), PC = target.
    /// Does not poll (the handler's first instruction runs first).
    ReadVectorHighFinish,
    /// Branch cycle 2: fetch the offset, compute the target, and poll
    /// early when the branch stays on the same page (the branch quirk).
    BranchOperand,
    /// Branch cycle 3: dummy read; finishes without polling when no page
    /// was crossed.
    BranchDummy,
    /// Branch cycle 4: PC high fixed, dummy read at the final target.
    BranchFixFinish,
}

/// Addressing mode tag. Advisory: used for disassembly and diagnostics,
/// never consulted during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Imp,
    Acc,
    Imm,
    Zpg,
    ZpX,
    ZpY,
    Abs,
    AbX,
    AbY,
    Ind,
    IzX,
    IzY,
    Rel,
}

/// Instruction mnemonic tag. Advisory, like [`AddrMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Mnemonic {
    Adc, Alr, Anc, And, Ane, Arr, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl,
    Brk, Bvc, Bvs, Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dcp, Dec, Dex, Dey,
    Eor, Inc, Inx, Iny, Isb, Jam, Jmp, Jsr, Las, Lax, Lda, Ldx, Ldy, Lsr,
    Lxa, Nop, Ora, Pha, Php, Pla, Plp, Rla, Rol, Ror, Rra, Rti, Rts, Sax,
    Sbc, Sbx, Sec, Sed, Sei, Sha, Shs, Shx, Shy, Slo, Sre, Sta, Stx, Sty,
    Tax, Tay, Tsx, Txa, Txs, Tya, Nmi, Irq,
}

/// One instruction-table entry: the micro-op program plus advisory
/// metadata. The program alone drives execution.
#[derive(Debug, Clone, Copy)]
pub struct Instr {
    /// Micro-ops for cycles 2..N, one per half-cycle, PHI1 first.
    pub program: &'static [MicroOp],
    /// Documented cycle count, excluding page-cross penalties.
    pub cycles: u8,
    /// Addressing mode tag.
    pub mode: AddrMode,
    /// Mnemonic tag.
    pub mnemonic: Mnemonic,
}
