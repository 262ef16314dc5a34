use lr35902_core::cpu::Cpu;
use lr35902_core::debug::command::{resolve, DebugCommand};
use lr35902_core::error::CpuError;
use lr35902_core::mmu::Memory;

const NOP: u8 = 0x00;
const HALT: u8 = 0x76;
const INC_A: u8 = 0x3C;
const EI: u8 = 0xFB;

struct StubBus {
    bytes: [u8; 0x1_0000],
}

impl StubBus {
    fn new() -> Self {
        Self { bytes: [0; 0x1_0000] }
    }

    fn load(&mut self, addr: u16, program: &[u8]) {
        for (i, b) in program.iter().enumerate() {
            self.bytes[addr as usize + i] = *b;
        }
    }
}

impl Memory for StubBus {
    fn read8(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    fn write8(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize] = value;
    }
}

fn bootstrap() -> (Cpu, StubBus) {
    (Cpu::new(), StubBus::new())
}

#[test]
fn nop_leaves_pc_advanced_by_one_and_costs_four_t_states() {
    let (mut cpu, mut bus) = bootstrap();
    cpu.regs.pc = 0x0100;
    bus.load(0x0100, &[NOP]);
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs.pc, 0x0101);
}

#[test]
fn ei_is_deferred_one_instruction_then_vblank_is_serviced() {
    let (mut cpu, mut bus) = bootstrap();
    cpu.regs.pc = 0x0100;
    bus.load(0x0100, &[EI, NOP]);
    bus.write_ie(0x01);
    bus.write_if(0x01);

    cpu.step(&mut bus);
    assert!(!cpu.ime);
    assert_eq!(cpu.regs.pc, 0x0101);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0040);
    assert_eq!(cpu.regs.sp, 0xFFFC);
    assert_eq!(bus.read16(cpu.regs.sp), 0x0102);
    assert!(!cpu.ime);
    assert_eq!(bus.read_if() & 0x01, 0);
}

#[test]
fn halt_with_pending_interrupt_and_ime_disabled_does_not_sleep_forever() {
    let (mut cpu, mut bus) = bootstrap();
    cpu.regs.pc = 0x0100;
    bus.load(0x0100, &[HALT, INC_A, INC_A]);
    bus.write_ie(0x01);
    bus.write_if(0x01);
    cpu.ime = false;

    cpu.step(&mut bus);
    assert!(!cpu.asleep);
    assert_eq!(cpu.halt_bug_skip, 1, "one decrement has already happened within this step");

    let a0 = cpu.regs.a;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, a0.wrapping_add(1));
    assert_eq!(cpu.regs.pc, 0x0101, "the halt-bug byte re-executes without advancing PC");

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, a0.wrapping_add(2));
    assert_eq!(cpu.regs.pc, 0x0102);

    let before = cpu.cycles_total;
    cpu.step(&mut bus); // the cycle count keeps advancing; nothing wedges
    assert!(cpu.cycles_total > before);
}

#[test]
fn breakpoint_arms_a_break_one_step_after_the_installed_address() {
    use lr35902_core::debug::{Breakpoint, Debugger};

    let (mut cpu, mut bus) = bootstrap();
    cpu.regs.pc = 0x014F;
    bus.load(0x014F, &[NOP, NOP]);
    let mut debugger = Debugger::new();
    debugger.install(0x0150, Breakpoint::default());

    // Step at 0x014F: no breakpoint here yet, no break.
    assert!(!debugger.break_time());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0150);

    // Step at 0x0150: break_time() is still false this step; arriving here
    // only adopts the breakpoint's period for the step that follows.
    assert!(!debugger.break_time());
    debugger.adopt_breakpoint_at(0x0150, &mut cpu);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0151);

    // The adopted period=1 now fires exactly once.
    assert!(debugger.break_time());
    assert!(!debugger.break_time());
}

#[test]
fn decoder_group_checks_for_0x47_0x76_0xd3() {
    use lr35902_core::cpu::{decode, OpcodeGroup};
    assert_eq!(decode(0x47), OpcodeGroup::LdRR);
    assert_eq!(decode(0x76), OpcodeGroup::Halt);
    assert_eq!(decode(0xD3), OpcodeGroup::Unused);

    let (mut cpu, mut bus) = bootstrap();
    cpu.regs.pc = 0x0100;
    bus.load(0x0100, &[0xD3]);
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs.pc, 0x0101);
}

#[test]
fn register_f_masking_round_trips_through_direct_write() {
    let mut cpu = Cpu::new();
    cpu.regs.set_f(0xFF);
    assert_eq!(cpu.regs.f(), 0xF0);
}

#[test]
fn ei_then_di_before_the_next_instruction_cancels_out() {
    let (mut cpu, mut bus) = bootstrap();
    cpu.regs.pc = 0x0100;
    bus.load(0x0100, &[EI, 0xF3, NOP]);
    let starting_ime = cpu.ime;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.ime, starting_ime);
    assert_eq!(cpu.ime_pending, 0);
}

#[test]
fn push_pop_identity_restores_the_stack_pointer() {
    let (mut cpu, mut bus) = bootstrap();
    cpu.regs.set_bc(0xBEEF);
    let sp0 = cpu.regs.sp;
    cpu.regs.pc = 0x0100;
    bus.load(0x0100, &[0xC5, 0xD1]); // PUSH BC, POP DE
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.de(), 0xBEEF);
    assert_eq!(cpu.regs.sp, sp0);
}

#[test]
fn cb_table_classifies_a_rotate_a_bit_test_and_a_set() {
    use lr35902_core::cpu::{decode_cb, CbGroup, CbOp};
    assert_eq!(decode_cb(0x00), CbGroup::Rotate { op: CbOp::Rlc, operand: 0 });
    assert_eq!(decode_cb(0x7F), CbGroup::Bit { index: 7, operand: 7 });
    assert_eq!(decode_cb(0xC0), CbGroup::Set { index: 0, operand: 0 });
}

#[test]
fn cpu_error_display_names_the_offending_opcode_and_pc() {
    let err = CpuError::DecodeMissing { opcode: 0xD3, pc: 0x0150 };
    assert!(err.to_string().contains("0xD3"));
    assert!(err.to_string().contains("0x0150"));
}

#[test]
fn debug_console_aliases_resolve_to_the_same_command() {
    assert_eq!(resolve("c"), Some(DebugCommand::Continue));
    assert_eq!(resolve("c"), resolve("continue"));
    assert_eq!(resolve("s"), resolve("step"));
    assert_eq!(resolve("q"), resolve("quit"));
    assert_eq!(resolve("q"), resolve("exit"));
}
