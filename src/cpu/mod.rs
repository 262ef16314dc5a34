//! The fetch/execute engine, the interrupt controller client, and the
//! opcode-group handlers. Everything here operates through `&mut impl
//! Memory` rather than a back-reference to the owning `Machine`: the CPU
//! never stores a handle to the thing that owns it.

mod alu;
mod cb;
mod decode;

pub use cb::{decode_cb, CbGroup, CbOp};
pub use decode::{decode, OpcodeGroup};

use std::fmt;

use log::{debug, trace};

use crate::error::CpuError;
use crate::mmu::{highest_priority, vector_for_index, Memory};
use crate::registers::Registers;

pub struct Cpu {
    pub regs: Registers,
    pub cycles_total: u64,
    pub cur_opcode: u8,
    pub running: bool,
    pub asleep: bool,
    pub halt_bug_skip: u8,
    pub ime: bool,
    pub ime_pending: i8,
    pub last_flags: u8,
    /// Not named in the core's register-level data model but required to
    /// carry out the engine's verbose instruction logging; toggled by the
    /// debug console (`v`, `s`, `r`/`c`).
    pub verbose: bool,
}

impl Cpu {
    pub fn new() -> Self {
        let regs = Registers::new();
        let last_flags = regs.f();
        Self {
            regs,
            cycles_total: 0,
            cur_opcode: 0,
            running: true,
            asleep: false,
            halt_bug_skip: 0,
            ime: false,
            ime_pending: 0,
            last_flags,
            verbose: false,
        }
    }

    pub fn reset(&mut self, bootstrap_present: bool) {
        self.regs.reset(bootstrap_present);
        self.cycles_total = 0;
        self.cur_opcode = 0;
        self.running = true;
        self.asleep = false;
        self.halt_bug_skip = 0;
        self.ime = false;
        self.ime_pending = 0;
        self.last_flags = self.regs.f();
    }

    pub fn enable_interrupts(&mut self) {
        self.ime_pending = 2;
    }

    pub fn disable_interrupts(&mut self) {
        self.ime_pending = -2;
    }

    /// One simulated step: fetch/execute (or quiescent tick), then the
    /// interrupt controller client. Returns the number of T-states added to
    /// `cycles_total` by this call. Breakpoint/console handling is the
    /// caller's responsibility — see `crate::machine::Machine`.
    pub fn step(&mut self, bus: &mut impl Memory) -> u8 {
        let instr_cycles = if !self.asleep {
            self.fetch_and_execute(bus)
        } else {
            4
        };
        self.cycles_total += instr_cycles as u64;

        let interrupt_cycles = self.service_interrupts(bus);
        self.cycles_total += interrupt_cycles as u64;

        if !self.asleep && self.halt_bug_skip > 0 {
            self.halt_bug_skip -= 1;
        }

        instr_cycles + interrupt_cycles
    }

    /// Decode, optionally log, advance PC (or suppress it under the HALT
    /// bug), dispatch, and log flag changes.
    pub fn fetch_and_execute(&mut self, bus: &mut impl Memory) -> u8 {
        let pc = self.regs.pc;
        let op = bus.read8(pc);
        self.cur_opcode = op;
        let group = decode(op);

        if self.verbose {
            trace!("PC:{pc:04X} op:{op:02X} group:{group:?} cycles:{}", self.cycles_total);
        }

        if self.halt_bug_skip > 0 {
            // PC stays put; this opcode byte will be re-fetched next step.
        } else {
            self.regs.pc = pc.wrapping_add(1);
        }

        let cycles = self.dispatch_group(group, op, bus);

        if self.verbose && self.regs.f() != self.last_flags {
            debug!("flags changed: {:02X} -> {:02X}", self.last_flags, self.regs.f());
        }
        self.last_flags = self.regs.f();

        cycles
    }

    /// IME countdown, then priority-ordered interrupt dispatch. Returns any
    /// extra T-states consumed servicing an interrupt.
    fn service_interrupts(&mut self, bus: &mut impl Memory) -> u8 {
        if self.ime_pending > 0 {
            self.ime_pending -= 1;
            if self.ime_pending == 0 {
                self.ime = true;
            }
        } else if self.ime_pending < 0 {
            self.ime_pending += 1;
            if self.ime_pending == 0 {
                self.ime = false;
            }
        }

        let mask = bus.interrupt_mask();
        if self.ime && mask != 0 {
            self.asleep = false;
            self.ime = false;
            self.ime_pending = 0;
            match highest_priority(mask) {
                Some((bit, vector)) => {
                    bus.clear_interrupt_flag(bit);
                    self.push_and_jump(vector, bus)
                }
                None => {
                    debug!("interrupt mask {mask:#04X} set but no bit matched a vector");
                    0
                }
            }
        } else {
            0
        }
    }

    /// Forces servicing of interrupt `index` (0..=4, VBlank..Joypad)
    /// regardless of IME or IF, clearing its IF bit and jumping unconditionally.
    /// Used by the debug console's `debug` command.
    pub fn interrupt(&mut self, index: u8, bus: &mut impl Memory) -> u8 {
        match vector_for_index(index) {
            Some((bit, vector)) => {
                bus.clear_interrupt_flag(bit);
                self.push_and_jump(vector, bus)
            }
            None => 0,
        }
    }

    /// Decrement SP by 2, push PC little-endian, jump to `vector`.
    pub fn push_and_jump(&mut self, vector: u16, bus: &mut impl Memory) -> u8 {
        self.push_u16(self.regs.pc, bus);
        self.regs.pc = vector;
        8
    }

    fn push_u16(&mut self, value: u16, bus: &mut impl Memory) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        bus.write16(self.regs.sp, value);
    }

    fn pop_u16(&mut self, bus: &mut impl Memory) -> u16 {
        let value = bus.read16(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }

    fn fetch_imm8(&mut self, bus: &mut impl Memory) -> u8 {
        let value = bus.read8(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch_imm16(&mut self, bus: &mut impl Memory) -> u16 {
        let value = bus.read16(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(2);
        value
    }

    fn read_r8(&self, code: u8, bus: &impl Memory) -> u8 {
        match code {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => bus.read8(self.regs.hl()),
            7 => self.regs.a,
            _ => unreachable!("register code is masked to 3 bits"),
        }
    }

    fn write_r8(&mut self, code: u8, value: u8, bus: &mut impl Memory) {
        match code {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            6 => bus.write8(self.regs.hl(), value),
            7 => self.regs.a = value,
            _ => unreachable!("register code is masked to 3 bits"),
        }
    }

    fn read_rr(&self, code: u8) -> u16 {
        match code & 0x03 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            3 => self.regs.sp,
            _ => unreachable!(),
        }
    }

    fn write_rr(&mut self, code: u8, value: u16) {
        match code & 0x03 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            3 => self.regs.sp = value,
            _ => unreachable!(),
        }
    }

    fn read_rr_stk(&self, code: u8) -> u16 {
        match code & 0x03 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            3 => self.regs.af(),
            _ => unreachable!(),
        }
    }

    fn write_rr_stk(&mut self, code: u8, value: u16) {
        match code & 0x03 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            // AF's low nibble of F is always masked to zero on write.
            3 => self.regs.set_af(value & 0xFFF0),
            _ => unreachable!(),
        }
    }

    fn condition_met(&self, code: u8) -> bool {
        match code & 0x03 {
            0 => !self.regs.zero(),
            1 => self.regs.zero(),
            2 => !self.regs.carry(),
            3 => self.regs.carry(),
            _ => unreachable!(),
        }
    }

    /// Dispatches a decoded opcode group: an immutable match over the tag,
    /// not a mutable table of function-pointer singletons.
    fn dispatch_group(&mut self, group: OpcodeGroup, op: u8, bus: &mut impl Memory) -> u8 {
        use OpcodeGroup::*;
        match group {
            Nop => 4,
            LdAddrNnSp => {
                let addr = self.fetch_imm16(bus);
                bus.write16(addr, self.regs.sp);
                20
            }
            LdRR => {
                let dst = (op >> 3) & 0x07;
                let src = op & 0x07;
                let value = self.read_r8(src, bus);
                self.write_r8(dst, value, bus);
                if dst == 6 || src == 6 { 8 } else { 4 }
            }
            Halt => self.halt(bus),
            LdRrNn => {
                let value = self.fetch_imm16(bus);
                self.write_rr((op >> 4) & 0x03, value);
                12
            }
            LdIndirectA => {
                let rr_code = (op >> 4) & 0x03;
                let to_a = op & 0x08 != 0;
                let addr = match rr_code {
                    0 => self.regs.bc(),
                    1 => self.regs.de(),
                    _ => self.regs.hl(),
                };
                if to_a {
                    self.regs.a = bus.read8(addr);
                } else {
                    bus.write8(addr, self.regs.a);
                }
                8
            }
            AddHlRr => {
                let rr = self.read_rr((op >> 4) & 0x03);
                let (value, h, c) = alu::add16(self.regs.hl(), rr);
                self.regs.set_hl(value);
                self.regs.set_subtract(false);
                self.regs.set_half_carry(h);
                self.regs.set_carry(c);
                8
            }
            IncDecRr => {
                let code = (op >> 4) & 0x03;
                let value = self.read_rr(code);
                let is_dec = op & 0x08 != 0;
                self.write_rr(code, if is_dec { value.wrapping_sub(1) } else { value.wrapping_add(1) });
                8
            }
            IncDecR => {
                let reg = (op >> 3) & 0x07;
                let value = self.read_r8(reg, bus);
                let is_dec = op & 0x01 != 0;
                let out = if is_dec { alu::dec8(value) } else { alu::inc8(value) };
                self.write_r8(reg, out.value, bus);
                self.regs.set_zero(out.z);
                self.regs.set_subtract(out.n);
                self.regs.set_half_carry(out.h);
                if reg == 6 { 12 } else { 4 }
            }
            RotateA => {
                let out = match (op >> 3) & 0x03 {
                    0 => alu::rlc(self.regs.a),
                    1 => alu::rrc(self.regs.a),
                    2 => alu::rl(self.regs.a, self.regs.carry()),
                    _ => alu::rr(self.regs.a, self.regs.carry()),
                };
                self.regs.a = out.value;
                self.regs.set_zero(false);
                self.regs.set_subtract(false);
                self.regs.set_half_carry(false);
                self.regs.set_carry(out.c);
                4
            }
            Stop => {
                self.asleep = true;
                self.regs.pc = self.regs.pc.wrapping_add(1); // STOP consumes a padding byte
                4
            }
            Jr => {
                let offset = self.fetch_imm8(bus) as i8;
                let taken = op == 0x18 || self.condition_met((op >> 3) & 0x03);
                if taken {
                    self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
                    12
                } else {
                    8
                }
            }
            LdRN => {
                let reg = (op >> 3) & 0x07;
                let value = self.fetch_imm8(bus);
                self.write_r8(reg, value, bus);
                if reg == 6 { 12 } else { 8 }
            }
            LdiLddHlA => {
                let to_a = op & 0x08 != 0;
                let increment = op & 0x10 == 0;
                let addr = self.regs.hl();
                if to_a {
                    self.regs.a = bus.read8(addr);
                } else {
                    bus.write8(addr, self.regs.a);
                }
                self.regs.set_hl(if increment { addr.wrapping_add(1) } else { addr.wrapping_sub(1) });
                8
            }
            Daa => {
                let out = alu::daa(self.regs.a, self.regs.subtract(), self.regs.half_carry(), self.regs.carry());
                self.regs.a = out.value;
                self.regs.set_zero(out.z);
                self.regs.set_half_carry(false);
                self.regs.set_carry(out.c);
                4
            }
            Cpl => {
                self.regs.a = !self.regs.a;
                self.regs.set_subtract(true);
                self.regs.set_half_carry(true);
                4
            }
            ScfCcf => {
                let is_ccf = op & 0x08 != 0;
                self.regs.set_subtract(false);
                self.regs.set_half_carry(false);
                self.regs.set_carry(if is_ccf { !self.regs.carry() } else { true });
                4
            }
            AluAR => self.alu_a(op, bus),
            PushPop => {
                let code = (op >> 4) & 0x03;
                if op & 0x04 != 0 {
                    let value = self.read_rr_stk(code);
                    self.push_u16(value, bus);
                    16
                } else {
                    let value = self.pop_u16(bus);
                    self.write_rr_stk(code, value);
                    12
                }
            }
            Ret => self.ret(op, bus),
            Rst => {
                let vector = (op & 0x38) as u16;
                self.push_u16(self.regs.pc, bus);
                self.regs.pc = vector;
                16
            }
            Jp => {
                let addr = self.fetch_imm16(bus);
                let taken = op == 0xC3 || self.condition_met((op >> 3) & 0x03);
                if taken {
                    self.regs.pc = addr;
                    16
                } else {
                    12
                }
            }
            Call => {
                let addr = self.fetch_imm16(bus);
                let taken = op == 0xCD || self.condition_met((op >> 3) & 0x03);
                if taken {
                    self.push_u16(self.regs.pc, bus);
                    self.regs.pc = addr;
                    24
                } else {
                    12
                }
            }
            AddSpN => {
                let offset = self.fetch_imm8(bus) as i8;
                let (value, h, c) = alu::add16_signed(self.regs.sp, offset);
                self.regs.sp = value;
                self.regs.set_zero(false);
                self.regs.set_subtract(false);
                self.regs.set_half_carry(h);
                self.regs.set_carry(c);
                16
            }
            LdAddrNnA => {
                let addr = self.fetch_imm16(bus);
                if op & 0x10 != 0 {
                    self.regs.a = bus.read8(addr);
                } else {
                    bus.write8(addr, self.regs.a);
                }
                16
            }
            LdhIndirect => {
                let via_c = op & 0x02 != 0;
                let to_a = op & 0x10 != 0;
                let addr = if via_c {
                    0xFF00 + self.regs.c as u16
                } else {
                    0xFF00 + self.fetch_imm8(bus) as u16
                };
                if to_a {
                    self.regs.a = bus.read8(addr);
                } else {
                    bus.write8(addr, self.regs.a);
                }
                if via_c { 8 } else { 12 }
            }
            LdHlSpN => {
                let offset = self.fetch_imm8(bus) as i8;
                let (value, h, c) = alu::add16_signed(self.regs.sp, offset);
                self.regs.set_hl(value);
                self.regs.set_zero(false);
                self.regs.set_subtract(false);
                self.regs.set_half_carry(h);
                self.regs.set_carry(c);
                12
            }
            JpHl => {
                self.regs.pc = self.regs.hl();
                4
            }
            DiEi => {
                if op == 0xF3 {
                    self.disable_interrupts();
                } else {
                    self.enable_interrupts();
                }
                4
            }
            CbPrefix => self.execute_cb(bus),
            Unused => 4,
            Missing => {
                let err = CpuError::DecodeMissing { opcode: op, pc: self.regs.pc.wrapping_sub(1) };
                panic!("{err}");
            }
        }
    }

    fn alu_a(&mut self, op: u8, bus: &mut impl Memory) -> u8 {
        let (operand, cycles) = if op & 0xC0 == 0xC0 {
            (self.fetch_imm8(bus), 8)
        } else {
            let reg = op & 0x07;
            (self.read_r8(reg, bus), if reg == 6 { 8 } else { 4 })
        };
        let kind = (op >> 3) & 0x07;
        let out = match kind {
            0 => alu::add(self.regs.a, operand, false),
            1 => alu::add(self.regs.a, operand, self.regs.carry()),
            2 => alu::sub(self.regs.a, operand, false),
            3 => alu::sub(self.regs.a, operand, self.regs.carry()),
            4 => alu::and(self.regs.a, operand),
            5 => alu::xor(self.regs.a, operand),
            6 => alu::or(self.regs.a, operand),
            _ => alu::sub(self.regs.a, operand, false), // CP: result discarded below
        };
        self.regs.set_zero(out.z);
        self.regs.set_subtract(out.n);
        self.regs.set_half_carry(out.h);
        self.regs.set_carry(out.c);
        if kind != 7 {
            self.regs.a = out.value;
        }
        cycles
    }

    fn ret(&mut self, op: u8, bus: &mut impl Memory) -> u8 {
        if op == 0xC9 || op == 0xD9 {
            let addr = self.pop_u16(bus);
            self.regs.pc = addr;
            if op == 0xD9 {
                self.ime = true;
                self.ime_pending = 0;
            }
            16
        } else {
            let taken = self.condition_met((op >> 3) & 0x03);
            if taken {
                let addr = self.pop_u16(bus);
                self.regs.pc = addr;
                20
            } else {
                8
            }
        }
    }

    /// HALT: the documented post-HALT fetch anomaly triggers only when IME
    /// is off and an interrupt is already pending and enabled; otherwise
    /// this is a genuine halt.
    fn halt(&mut self, bus: &mut impl Memory) -> u8 {
        if !self.ime && bus.pending_interrupt() {
            self.halt_bug_skip = 2;
        } else {
            self.asleep = true;
        }
        4
    }

    fn execute_cb(&mut self, bus: &mut impl Memory) -> u8 {
        let op = self.fetch_imm8(bus);
        let group = decode_cb(op);
        let indirect = matches!(
            group,
            CbGroup::Rotate { operand: 6, .. }
                | CbGroup::Bit { operand: 6, .. }
                | CbGroup::Res { operand: 6, .. }
                | CbGroup::Set { operand: 6, .. }
        );
        match group {
            CbGroup::Rotate { op: kind, operand } => {
                let value = self.read_r8(operand, bus);
                let out = match kind {
                    CbOp::Rlc => alu::rlc(value),
                    CbOp::Rrc => alu::rrc(value),
                    CbOp::Rl => alu::rl(value, self.regs.carry()),
                    CbOp::Rr => alu::rr(value, self.regs.carry()),
                    CbOp::Sla => alu::sla(value),
                    CbOp::Sra => alu::sra(value),
                    CbOp::Swap => alu::swap(value),
                    CbOp::Srl => alu::srl(value),
                };
                self.write_r8(operand, out.value, bus);
                self.regs.set_zero(out.z);
                self.regs.set_subtract(false);
                self.regs.set_half_carry(false);
                self.regs.set_carry(out.c);
            }
            CbGroup::Bit { index, operand } => {
                let value = self.read_r8(operand, bus);
                self.regs.set_zero(alu::bit(value, index));
                self.regs.set_subtract(false);
                self.regs.set_half_carry(true);
            }
            CbGroup::Res { index, operand } => {
                let value = self.read_r8(operand, bus);
                self.write_r8(operand, alu::res(value, index), bus);
            }
            CbGroup::Set { index, operand } => {
                let value = self.read_r8(operand, bus);
                self.write_r8(operand, alu::set(value, index), bus);
            }
        }
        match group {
            CbGroup::Bit { .. } if indirect => 12,
            CbGroup::Bit { .. } => 8,
            _ if indirect => 16,
            _ => 8,
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} IME:{} asleep:{} halt_bug_skip:{} cycles:{}",
            self.regs, self.ime as u8, self.asleep, self.halt_bug_skip, self.cycles_total
        )
    }
}
