//! The 258-entry instruction table: 256 opcodes plus the synthetic NMI and
//! IRQ sequences.
//!
//! Each entry's program lists one micro-op per half-cycle starting at the
//! instruction's second cycle (the fetch cycle is handled by the tick
//! function). Optional cycles are skipped subtractively: the indexed-read
//! micro-op finishes early when no page is crossed instead of a separate
//! table entry per timing outcome.

use crate::flags::Status;
use crate::microcode::{AddrMode, Exec, Index, Instr, MicroOp, Mnemonic, RmwOp, ShTarget, Store};

use AddrMode as M;
use Exec as E;
use MicroOp::*;
use Mnemonic as N;
use RmwOp as R;

/// Table index of the synthetic NMI sequence.
pub const OPCODE_NMI: u16 = 0x100;

/// Table index of the synthetic IRQ sequence.
pub const OPCODE_IRQ: u16 = 0x101;

/// The 7-cycle interrupt sequence, shared by BRK ($00) and the synthetic
/// NMI/IRQ entries. For the injected sequences `allow_write_pc` is false,
/// so the cycle-2 fetch does not advance PC; for software BRK it does,
/// which is why BRK skips its padding byte.
const INTERRUPT: &[MicroOp] = &[
    Decode,
    FetchOperand,
    Decode,
    PushPch,
    Decode,
    PushPcl,
    SelectVector,
    PushStatusVector,
    SetInterruptFlags,
    ReadVectorLow,
    Decode,
    ReadVectorHighFinish,
];

macro_rules! instr {
    ($mn:ident, $mode:ident, $cycles:expr, $prog:expr) => {
        Instr {
            program: $prog,
            cycles: $cycles,
            mode: M::$mode,
            mnemonic: N::$mn,
        }
    };
}

/// Implied or accumulator mode: dummy read at PC, work deferred.
macro_rules! imp {
    ($mn:ident, $e:ident) => {
        instr!($mn, Imp, 2, &[Decode, DummyPcFinish(E::$e)])
    };
}

macro_rules! acc {
    ($mn:ident, $e:ident) => {
        instr!($mn, Acc, 2, &[Decode, DummyPcFinish(E::$e)])
    };
}

macro_rules! imm {
    ($mn:ident, $e:ident) => {
        instr!($mn, Imm, 2, &[Decode, FetchOperandFinish(E::$e)])
    };
}

macro_rules! zp_read {
    ($mn:ident, $e:ident) => {
        instr!(
            $mn,
            Zpg,
            3,
            &[Decode, FetchZpAddress, Decode, ReadAddressToOperandFinish(E::$e)]
        )
    };
}

macro_rules! zp_write {
    ($mn:ident, $s:ident) => {
        instr!($mn, Zpg, 3, &[Decode, FetchZpAddress, Decode, WriteFinish(Store::$s)])
    };
}

macro_rules! zp_rmw {
    ($mn:ident, $r:ident) => {
        instr!(
            $mn,
            Zpg,
            5,
            &[
                Decode,
                FetchZpAddress,
                Decode,
                ReadAddressToOperand,
                Decode,
                WriteOperand,
                Rmw(R::$r),
                WriteOperandFinish,
            ]
        )
    };
}

macro_rules! zpi_read {
    ($mn:ident, $mode:ident, $i:ident, $e:ident) => {
        instr!(
            $mn,
            $mode,
            4,
            &[
                Decode,
                FetchZpAddress,
                Decode,
                ReadAddressDiscard,
                IndexAddressZp(Index::$i),
                ReadAddressToOperandFinish(E::$e),
            ]
        )
    };
}

macro_rules! zpi_write {
    ($mn:ident, $mode:ident, $i:ident, $s:ident) => {
        instr!(
            $mn,
            $mode,
            4,
            &[
                Decode,
                FetchZpAddress,
                Decode,
                ReadAddressDiscard,
                IndexAddressZp(Index::$i),
                WriteFinish(Store::$s),
            ]
        )
    };
}

macro_rules! zpx_rmw {
    ($mn:ident, $r:ident) => {
        instr!(
            $mn,
            ZpX,
            6,
            &[
                Decode,
                FetchZpAddress,
                Decode,
                ReadAddressDiscard,
                IndexAddressZp(Index::X),
                ReadAddressToOperand,
                Decode,
                WriteOperand,
                Rmw(R::$r),
                WriteOperandFinish,
            ]
        )
    };
}

macro_rules! abs_read {
    ($mn:ident, $e:ident) => {
        instr!(
            $mn,
            Abs,
            4,
            &[
                Decode,
                FetchAddressLow,
                Decode,
                FetchAddressHigh,
                Decode,
                ReadAddressToOperandFinish(E::$e),
            ]
        )
    };
}

macro_rules! abs_write {
    ($mn:ident, $s:ident) => {
        instr!(
            $mn,
            Abs,
            4,
            &[
                Decode,
                FetchAddressLow,
                Decode,
                FetchAddressHigh,
                Decode,
                WriteFinish(Store::$s),
            ]
        )
    };
}

macro_rules! abs_rmw {
    ($mn:ident, $r:ident) => {
        instr!(
            $mn,
            Abs,
            6,
            &[
                Decode,
                FetchAddressLow,
                Decode,
                FetchAddressHigh,
                Decode,
                ReadAddressToOperand,
                Decode,
                WriteOperand,
                Rmw(R::$r),
                WriteOperandFinish,
            ]
        )
    };
}

/// Indexed absolute read: 4 cycles, or 5 with the page-cross fix-up.
macro_rules! absi_read {
    ($mn:ident, $mode:ident, $i:ident, $e:ident) => {
        instr!(
            $mn,
            $mode,
            4,
            &[
                Decode,
                FetchAddressLow,
                Decode,
                FetchAddressHigh,
                IndexAddressLow(Index::$i),
                ReadCross(E::$e),
                FixAddressHigh,
                ReadAddressToOperandFinish(E::$e),
            ]
        )
    };
}

/// Indexed absolute write: the fix-up dummy read always happens.
macro_rules! absi_write {
    ($mn:ident, $mode:ident, $i:ident, $s:ident) => {
        instr!(
            $mn,
            $mode,
            5,
            &[
                Decode,
                FetchAddressLow,
                Decode,
                FetchAddressHigh,
                IndexAddressLow(Index::$i),
                ReadAddressDiscard,
                FixAddressHigh,
                WriteFinish(Store::$s),
            ]
        )
    };
}

macro_rules! absi_rmw {
    ($mn:ident, $mode:ident, $i:ident, $r:ident) => {
        instr!(
            $mn,
            $mode,
            7,
            &[
                Decode,
                FetchAddressLow,
                Decode,
                FetchAddressHigh,
                IndexAddressLow(Index::$i),
                ReadAddressDiscard,
                FixAddressHigh,
                ReadAddressToOperand,
                Decode,
                WriteOperand,
                Rmw(R::$r),
                WriteOperandFinish,
            ]
        )
    };
}

macro_rules! izx_read {
    ($mn:ident, $e:ident) => {
        instr!(
            $mn,
            IzX,
            6,
            &[
                Decode,
                FetchPointerZp,
                Decode,
                ReadPointerDiscard,
                AddXToPointer,
                ReadPointerToAddressLow,
                Decode,
                ReadPointerToAddressHigh,
                Decode,
                ReadAddressToOperandFinish(E::$e),
            ]
        )
    };
}

macro_rules! izx_write {
    ($mn:ident, $s:ident) => {
        instr!(
            $mn,
            IzX,
            6,
            &[
                Decode,
                FetchPointerZp,
                Decode,
                ReadPointerDiscard,
                AddXToPointer,
                ReadPointerToAddressLow,
                Decode,
                ReadPointerToAddressHigh,
                Decode,
                WriteFinish(Store::$s),
            ]
        )
    };
}

macro_rules! izx_rmw {
    ($mn:ident, $r:ident) => {
        instr!(
            $mn,
            IzX,
            8,
            &[
                Decode,
                FetchPointerZp,
                Decode,
                ReadPointerDiscard,
                AddXToPointer,
                ReadPointerToAddressLow,
                Decode,
                ReadPointerToAddressHigh,
                Decode,
                ReadAddressToOperand,
                Decode,
                WriteOperand,
                Rmw(R::$r),
                WriteOperandFinish,
            ]
        )
    };
}

/// Post-indexed read: 5 cycles, or 6 with the page-cross fix-up.
macro_rules! izy_read {
    ($mn:ident, $e:ident) => {
        instr!(
            $mn,
            IzY,
            5,
            &[
                Decode,
                FetchPointerZp,
                Decode,
                ReadPointerToAddressLow,
                Decode,
                ReadPointerToAddressHigh,
                IndexAddressLow(Index::Y),
                ReadCross(E::$e),
                FixAddressHigh,
                ReadAddressToOperandFinish(E::$e),
            ]
        )
    };
}

macro_rules! izy_write {
    ($mn:ident, $s:ident) => {
        instr!(
            $mn,
            IzY,
            6,
            &[
                Decode,
                FetchPointerZp,
                Decode,
                ReadPointerToAddressLow,
                Decode,
                ReadPointerToAddressHigh,
                IndexAddressLow(Index::Y),
                ReadAddressDiscard,
                FixAddressHigh,
                WriteFinish(Store::$s),
            ]
        )
    };
}

macro_rules! izy_rmw {
    ($mn:ident, $r:ident) => {
        instr!(
            $mn,
            IzY,
            8,
            &[
                Decode,
                FetchPointerZp,
                Decode,
                ReadPointerToAddressLow,
                Decode,
                ReadPointerToAddressHigh,
                IndexAddressLow(Index::Y),
                ReadAddressDiscard,
                FixAddressHigh,
                ReadAddressToOperand,
                Decode,
                WriteOperand,
                Rmw(R::$r),
                WriteOperandFinish,
            ]
        )
    };
}

macro_rules! branch {
    ($mn:ident, $flag:ident, $expect:expr) => {
        instr!(
            $mn,
            Rel,
            2,
            &[
                BranchCheck { flag: Status::$flag, expect_set: $expect },
                BranchOperand,
                Decode,
                BranchDummy,
                Decode,
                BranchFixFinish,
            ]
        )
    };
}

macro_rules! sh_aby {
    ($mn:ident, $t:ident) => {
        instr!(
            $mn,
            AbY,
            5,
            &[
                Decode,
                FetchAddressLow,
                Decode,
                FetchAddressHigh,
                IndexAddressLow(Index::Y),
                ReadAddressDiscard,
                FixAddressHigh,
                ShStoreFinish(ShTarget::$t),
            ]
        )
    };
}

macro_rules! jam {
    () => {
        instr!(Jam, Imp, 2, &[Jam])
    };
}

/// The instruction set, indexed by opcode. Entries $100 and $101 are the
/// synthetic NMI and IRQ sequences injected at the fetch cycle.
#[rustfmt::skip]
pub static INSTRUCTIONS: [Instr; 258] = [
    // $00-$07
    instr!(Brk, Imp, 7, INTERRUPT),
    izx_read!(Ora, Ora),
    jam!(),
    izx_rmw!(Slo, Slo),
    zp_read!(Nop, Nop),
    zp_read!(Ora, Ora),
    zp_rmw!(Asl, Asl),
    zp_rmw!(Slo, Slo),
    // $08-$0F
    instr!(Php, Imp, 3, &[Decode, DummyPc, Decode, PushStatusPhpFinish]),
    imm!(Ora, Ora),
    acc!(Asl, AslA),
    imm!(Anc, Anc),
    abs_read!(Nop, Nop),
    abs_read!(Ora, Ora),
    abs_rmw!(Asl, Asl),
    abs_rmw!(Slo, Slo),
    // $10-$17
    branch!(Bpl, N, false),
    izy_read!(Ora, Ora),
    jam!(),
    izy_rmw!(Slo, Slo),
    zpi_read!(Nop, ZpX, X, Nop),
    zpi_read!(Ora, ZpX, X, Ora),
    zpx_rmw!(Asl, Asl),
    zpx_rmw!(Slo, Slo),
    // $18-$1F
    imp!(Clc, Clc),
    absi_read!(Ora, AbY, Y, Ora),
    imp!(Nop, Nop),
    absi_rmw!(Slo, AbY, Y, Slo),
    absi_read!(Nop, AbX, X, Nop),
    absi_read!(Ora, AbX, X, Ora),
    absi_rmw!(Asl, AbX, X, Asl),
    absi_rmw!(Slo, AbX, X, Slo),
    // $20-$27
    instr!(Jsr, Abs, 6, &[
        Decode, FetchAddressLow,
        Decode, StackDummy,
        Decode, PushPch,
        Decode, PushPcl,
        Decode, FetchAddressHighSetPcFinish,
    ]),
    izx_read!(And, And),
    jam!(),
    izx_rmw!(Rla, Rla),
    zp_read!(Bit, Bit),
    zp_read!(And, And),
    zp_rmw!(Rol, Rol),
    zp_rmw!(Rla, Rla),
    // $28-$2F
    instr!(Plp, Imp, 4, &[Decode, DummyPc, Decode, StackDummyInc, Decode, PullOperandFinish(E::Plp)]),
    imm!(And, And),
    acc!(Rol, RolA),
    imm!(Anc, Anc),
    abs_read!(Bit, Bit),
    abs_read!(And, And),
    abs_rmw!(Rol, Rol),
    abs_rmw!(Rla, Rla),
    // $30-$37
    branch!(Bmi, N, true),
    izy_read!(And, And),
    jam!(),
    izy_rmw!(Rla, Rla),
    zpi_read!(Nop, ZpX, X, Nop),
    zpi_read!(And, ZpX, X, And),
    zpx_rmw!(Rol, Rol),
    zpx_rmw!(Rla, Rla),
    // $38-$3F
    imp!(Sec, Sec),
    absi_read!(And, AbY, Y, And),
    imp!(Nop, Nop),
    absi_rmw!(Rla, AbY, Y, Rla),
    absi_read!(Nop, AbX, X, Nop),
    absi_read!(And, AbX, X, And),
    absi_rmw!(Rol, AbX, X, Rol),
    absi_rmw!(Rla, AbX, X, Rla),
    // $40-$47
    instr!(Rti, Imp, 6, &[
        Decode, DummyPc,
        Decode, StackDummyInc,
        Decode, PullStatusInc,
        Decode, PullTargetLowInc,
        Decode, PullTargetHighSetPcFinish,
    ]),
    izx_read!(Eor, Eor),
    jam!(),
    izx_rmw!(Sre, Sre),
    zp_read!(Nop, Nop),
    zp_read!(Eor, Eor),
    zp_rmw!(Lsr, Lsr),
    zp_rmw!(Sre, Sre),
    // $48-$4F
    instr!(Pha, Imp, 3, &[Decode, DummyPc, Decode, PushAFinish]),
    imm!(Eor, Eor),
    acc!(Lsr, LsrA),
    imm!(Alr, Alr),
    instr!(Jmp, Abs, 3, &[Decode, FetchAddressLow, Decode, FetchAddressHighSetPcFinish]),
    abs_read!(Eor, Eor),
    abs_rmw!(Lsr, Lsr),
    abs_rmw!(Sre, Sre),
    // $50-$57
    branch!(Bvc, V, false),
    izy_read!(Eor, Eor),
    jam!(),
    izy_rmw!(Sre, Sre),
    zpi_read!(Nop, ZpX, X, Nop),
    zpi_read!(Eor, ZpX, X, Eor),
    zpx_rmw!(Lsr, Lsr),
    zpx_rmw!(Sre, Sre),
    // $58-$5F
    imp!(Cli, Cli),
    absi_read!(Eor, AbY, Y, Eor),
    imp!(Nop, Nop),
    absi_rmw!(Sre, AbY, Y, Sre),
    absi_read!(Nop, AbX, X, Nop),
    absi_read!(Eor, AbX, X, Eor),
    absi_rmw!(Lsr, AbX, X, Lsr),
    absi_rmw!(Sre, AbX, X, Sre),
    // $60-$67
    instr!(Rts, Imp, 6, &[
        Decode, DummyPc,
        Decode, StackDummyInc,
        Decode, PullTargetLowInc,
        Decode, PullTargetHighSetPc,
        Decode, DummyPcIncFinish,
    ]),
    izx_read!(Adc, Adc),
    jam!(),
    izx_rmw!(Rra, Rra),
    zp_read!(Nop, Nop),
    zp_read!(Adc, Adc),
    zp_rmw!(Ror, Ror),
    zp_rmw!(Rra, Rra),
    // $68-$6F
    instr!(Pla, Imp, 4, &[Decode, DummyPc, Decode, StackDummyInc, Decode, PullOperandFinish(E::Pla)]),
    imm!(Adc, Adc),
    acc!(Ror, RorA),
    imm!(Arr, Arr),
    instr!(Jmp, Ind, 5, &[
        Decode, FetchPointerLow,
        Decode, FetchPointerHigh,
        Decode, ReadPointerToAddressLow,
        Decode, ReadPointerToAddressHighSetPcFinish,
    ]),
    abs_read!(Adc, Adc),
    abs_rmw!(Ror, Ror),
    abs_rmw!(Rra, Rra),
    // $70-$77
    branch!(Bvs, V, true),
    izy_read!(Adc, Adc),
    jam!(),
    izy_rmw!(Rra, Rra),
    zpi_read!(Nop, ZpX, X, Nop),
    zpi_read!(Adc, ZpX, X, Adc),
    zpx_rmw!(Ror, Ror),
    zpx_rmw!(Rra, Rra),
    // $78-$7F
    imp!(Sei, Sei),
    absi_read!(Adc, AbY, Y, Adc),
    imp!(Nop, Nop),
    absi_rmw!(Rra, AbY, Y, Rra),
    absi_read!(Nop, AbX, X, Nop),
    absi_read!(Adc, AbX, X, Adc),
    absi_rmw!(Ror, AbX, X, Ror),
    absi_rmw!(Rra, AbX, X, Rra),
    // $80-$87
    imm!(Nop, Nop),
    izx_write!(Sta, A),
    imm!(Nop, Nop),
    izx_write!(Sax, AX),
    zp_write!(Sty, Y),
    zp_write!(Sta, A),
    zp_write!(Stx, X),
    zp_write!(Sax, AX),
    // $88-$8F
    imp!(Dey, Dey),
    imm!(Nop, Nop),
    imp!(Txa, Txa),
    imm!(Ane, Ane),
    abs_write!(Sty, Y),
    abs_write!(Sta, A),
    abs_write!(Stx, X),
    abs_write!(Sax, AX),
    // $90-$97
    branch!(Bcc, C, false),
    izy_write!(Sta, A),
    jam!(),
    instr!(Sha, IzY, 6, &[
        Decode, FetchPointerZp,
        Decode, ReadPointerToAddressLow,
        Decode, ReadPointerToAddressHigh,
        IndexAddressLow(Index::Y), ReadAddressDiscard,
        FixAddressHigh, ShStoreFinish(ShTarget::AX),
    ]),
    zpi_write!(Sty, ZpX, X, Y),
    zpi_write!(Sta, ZpX, X, A),
    zpi_write!(Stx, ZpY, Y, X),
    zpi_write!(Sax, ZpY, Y, AX),
    // $98-$9F
    imp!(Tya, Tya),
    absi_write!(Sta, AbY, Y, A),
    imp!(Txs, Txs),
    sh_aby!(Shs, AXS),
    instr!(Shy, AbX, 5, &[
        Decode, FetchAddressLow,
        Decode, FetchAddressHigh,
        IndexAddressLow(Index::X), ReadAddressDiscard,
        FixAddressHigh, ShStoreFinish(ShTarget::Y),
    ]),
    absi_write!(Sta, AbX, X, A),
    sh_aby!(Shx, X),
    sh_aby!(Sha, AX),
    // $A0-$A7
    imm!(Ldy, Ldy),
    izx_read!(Lda, Lda),
    imm!(Ldx, Ldx),
    izx_read!(Lax, Lax),
    zp_read!(Ldy, Ldy),
    zp_read!(Lda, Lda),
    zp_read!(Ldx, Ldx),
    zp_read!(Lax, Lax),
    // $A8-$AF
    imp!(Tay, Tay),
    imm!(Lda, Lda),
    imp!(Tax, Tax),
    imm!(Lxa, Lxa),
    abs_read!(Ldy, Ldy),
    abs_read!(Lda, Lda),
    abs_read!(Ldx, Ldx),
    abs_read!(Lax, Lax),
    // $B0-$B7
    branch!(Bcs, C, true),
    izy_read!(Lda, Lda),
    jam!(),
    izy_read!(Lax, Lax),
    zpi_read!(Ldy, ZpX, X, Ldy),
    zpi_read!(Lda, ZpX, X, Lda),
    zpi_read!(Ldx, ZpY, Y, Ldx),
    zpi_read!(Lax, ZpY, Y, Lax),
    // $B8-$BF
    imp!(Clv, Clv),
    absi_read!(Lda, AbY, Y, Lda),
    imp!(Tsx, Tsx),
    absi_read!(Las, AbY, Y, Las),
    absi_read!(Ldy, AbX, X, Ldy),
    absi_read!(Lda, AbX, X, Lda),
    absi_read!(Ldx, AbY, Y, Ldx),
    absi_read!(Lax, AbY, Y, Lax),
    // $C0-$C7
    imm!(Cpy, Cpy),
    izx_read!(Cmp, Cmp),
    imm!(Nop, Nop),
    izx_rmw!(Dcp, Dcp),
    zp_read!(Cpy, Cpy),
    zp_read!(Cmp, Cmp),
    zp_rmw!(Dec, Dec),
    zp_rmw!(Dcp, Dcp),
    // $C8-$CF
    imp!(Iny, Iny),
    imm!(Cmp, Cmp),
    imp!(Dex, Dex),
    imm!(Sbx, Sbx),
    abs_read!(Cpy, Cpy),
    abs_read!(Cmp, Cmp),
    abs_rmw!(Dec, Dec),
    abs_rmw!(Dcp, Dcp),
    // $D0-$D7
    branch!(Bne, Z, false),
    izy_read!(Cmp, Cmp),
    jam!(),
    izy_rmw!(Dcp, Dcp),
    zpi_read!(Nop, ZpX, X, Nop),
    zpi_read!(Cmp, ZpX, X, Cmp),
    zpx_rmw!(Dec, Dec),
    zpx_rmw!(Dcp, Dcp),
    // $D8-$DF
    imp!(Cld, Cld),
    absi_read!(Cmp, AbY, Y, Cmp),
    imp!(Nop, Nop),
    absi_rmw!(Dcp, AbY, Y, Dcp),
    absi_read!(Nop, AbX, X, Nop),
    absi_read!(Cmp, AbX, X, Cmp),
    absi_rmw!(Dec, AbX, X, Dec),
    absi_rmw!(Dcp, AbX, X, Dcp),
    // $E0-$E7
    imm!(Cpx, Cpx),
    izx_read!(Sbc, Sbc),
    imm!(Nop, Nop),
    izx_rmw!(Isb, Isb),
    zp_read!(Cpx, Cpx),
    zp_read!(Sbc, Sbc),
    zp_rmw!(Inc, Inc),
    zp_rmw!(Isb, Isb),
    // $E8-$EF
    imp!(Inx, Inx),
    imm!(Sbc, Sbc),
    imp!(Nop, Nop),
    imm!(Sbc, Sbc),
    abs_read!(Cpx, Cpx),
    abs_read!(Sbc, Sbc),
    abs_rmw!(Inc, Inc),
    abs_rmw!(Isb, Isb),
    // $F0-$F7
    branch!(Beq, Z, true),
    izy_read!(Sbc, Sbc),
    jam!(),
    izy_rmw!(Isb, Isb),
    zpi_read!(Nop, ZpX, X, Nop),
    zpi_read!(Sbc, ZpX, X, Sbc),
    zpx_rmw!(Inc, Inc),
    zpx_rmw!(Isb, Isb),
    // $F8-$FF
    imp!(Sed, Sed),
    absi_read!(Sbc, AbY, Y, Sbc),
    imp!(Nop, Nop),
    absi_rmw!(Isb, AbY, Y, Isb),
    absi_read!(Nop, AbX, X, Nop),
    absi_read!(Sbc, AbX, X, Sbc),
    absi_rmw!(Inc, AbX, X, Inc),
    absi_rmw!(Isb, AbX, X, Isb),
    // $100: synthetic NMI sequence, $101: synthetic IRQ sequence.
    instr!(Nmi, Imp, 7, INTERRUPT),
    instr!(Irq, Imp, 7, INTERRUPT),
];
