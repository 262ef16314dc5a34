//! The CPU core's error taxonomy (see the error handling design notes).
//!
//! `DecodeMissing` and `InvariantBreach` are fatal by policy: a handler
//! hitting either one indicates a programming error, so callers are
//! expected to log and abort rather than recover. `BusFailure` names what a
//! richer `Memory` implementation (one backed by a real cartridge/mapper
//! rather than a flat array) would report from a speculative console read or
//! write that lands on an unmapped or write-protected region; the bundled
//! `Memory` implementations are flat 64KiB arrays indexed by `u16`, so no
//! access can fail and this variant is not raised by them today.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuError {
    DecodeMissing { opcode: u8, pc: u16 },
    BusFailure { addr: u16, detail: String },
    InvariantBreach { detail: String },
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuError::DecodeMissing { opcode, pc } => {
                write!(f, "no decoder rule matched opcode {opcode:#04X} at PC {pc:#06X}")
            }
            CpuError::BusFailure { addr, detail } => {
                write!(f, "bus access at {addr:#06X} failed: {detail}")
            }
            CpuError::InvariantBreach { detail } => {
                write!(f, "invariant breach: {detail}")
            }
        }
    }
}

impl std::error::Error for CpuError {}
