//! The CB-prefix extension table: 256 rotate/shift/bit/set/reset
//! operations, decoded as a pure function of the second byte's coarse bit
//! fields rather than as an enumerated lookup array (no per-opcode
//! arithmetic table is in scope; only the classification is).

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CbOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CbGroup {
    Rotate { op: CbOp, operand: u8 },
    Bit { index: u8, operand: u8 },
    Res { index: u8, operand: u8 },
    Set { index: u8, operand: u8 },
}

const ROTATE_KINDS: [CbOp; 8] = [
    CbOp::Rlc,
    CbOp::Rrc,
    CbOp::Rl,
    CbOp::Rr,
    CbOp::Sla,
    CbOp::Sra,
    CbOp::Swap,
    CbOp::Srl,
];

/// Decodes the byte following a `0xCB` prefix. `operand` is a 3-bit
/// register-or-(HL) selector index (B,C,D,E,H,L,(HL),A), matching the
/// ordering the primary table's `r` field already uses.
pub fn decode_cb(op: u8) -> CbGroup {
    let operand = op & 0x07;
    let field = (op >> 3) & 0x07;
    match op & 0xC0 {
        0x00 => CbGroup::Rotate { op: ROTATE_KINDS[field as usize], operand },
        0x40 => CbGroup::Bit { index: field, operand },
        0x80 => CbGroup::Res { index: field, operand },
        0xC0 => CbGroup::Set { index: field, operand },
        _ => unreachable!("op & 0xC0 only has four possible values"),
    }
}
