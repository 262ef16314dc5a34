//! The breakpoint table and interactive console. Owned by `Machine`, not by
//! `Cpu` itself — the CPU core has no notion of breaking.

pub mod command;

use std::collections::HashMap;
use std::io::{self, BufRead, Write as _};

use log::info;

use crate::cpu::Cpu;
use crate::gpu::Gpu;
use crate::mmu::Memory;
use command::{resolve, DebugCommand};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BreakpointAction {
    None,
    Print,
    Custom(u32),
}

#[derive(Debug, Copy, Clone)]
pub struct Breakpoint {
    pub action: BreakpointAction,
    pub break_on_steps: u32,
    pub verbose_instr: bool,
}

impl Default for Breakpoint {
    fn default() -> Self {
        Self { action: BreakpointAction::None, break_on_steps: 1, verbose_instr: true }
    }
}

pub struct Debugger {
    breakpoints: HashMap<u16, Breakpoint>,
    period: u32,
    remaining: u32,
    break_now: bool,
}

impl Debugger {
    pub fn new() -> Self {
        Self { breakpoints: HashMap::new(), period: 0, remaining: 0, break_now: false }
    }

    pub fn install(&mut self, pc: u16, bp: Breakpoint) {
        self.breakpoints.insert(pc, bp);
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }

    pub fn arm_immediate(&mut self) {
        self.break_now = true;
    }

    pub fn has_breakpoint_at(&self, pc: u16) -> bool {
        self.breakpoints.contains_key(&pc)
    }

    /// Consumes the arming state for this step and reports whether the
    /// console should be entered.
    pub fn break_time(&mut self) -> bool {
        if self.break_now {
            self.break_now = false;
            return true;
        }
        if self.period != 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.remaining = self.period;
                return true;
            }
        }
        false
    }

    /// Adopts the breakpoint registered at `pc`, if any, folding its step
    /// period and verbose flag into the live state.
    pub fn adopt_breakpoint_at(&mut self, pc: u16, cpu: &mut Cpu) {
        if let Some(bp) = self.breakpoints.get(&pc) {
            self.period = bp.break_on_steps;
            self.remaining = bp.break_on_steps;
            cpu.verbose = bp.verbose_instr;
            if bp.action == BreakpointAction::Print {
                info!("breakpoint hit at {pc:#06X}");
            }
        }
    }

    /// Runs the interactive console loop until a command resumes execution.
    /// Returns `false` if the user asked to quit the machine.
    pub fn run_console(&mut self, cpu: &mut Cpu, bus: &mut impl Memory, gpu: &mut impl Gpu) -> bool {
        self.print_diagnostic(cpu, bus);
        let stdin = io::stdin();
        loop {
            print!("> ");
            let _ = io::stdout().flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                return false; // EOF: treat like quit
            }
            let line = line.trim();
            if line.is_empty() {
                return true;
            }
            let mut parts = line.split_whitespace();
            let keyword = parts.next().unwrap_or("").to_ascii_lowercase();
            let args: Vec<&str> = parts.collect();
            match resolve(&keyword) {
                Some(DebugCommand::Continue) => {
                    self.period = 0;
                    return true;
                }
                Some(DebugCommand::Step) => {
                    let n: u32 = args.first().and_then(|s| s.parse().ok()).unwrap_or(1);
                    self.period = n.max(1);
                    self.remaining = self.period;
                    cpu.verbose = true;
                    return true;
                }
                Some(DebugCommand::Verbose) => {
                    cpu.verbose = !cpu.verbose;
                    println!("verbose: {}", cpu.verbose);
                }
                Some(DebugCommand::Break) => {
                    if let Some(addr) = args.first().and_then(|s| u16::from_str_radix(s.trim_start_matches("0x"), 16).ok()) {
                        self.install(addr, Breakpoint::default());
                        println!("breakpoint set at {addr:#06X}");
                    } else {
                        println!("usage: break <hex-addr>");
                    }
                }
                Some(DebugCommand::Clear) => {
                    self.clear();
                    println!("breakpoints cleared");
                }
                Some(DebugCommand::Run) => {
                    cpu.verbose = false;
                    self.period = 0;
                    return true;
                }
                Some(DebugCommand::Quit) => {
                    cpu.running = false;
                    return false;
                }
                Some(DebugCommand::Reset) => {
                    cpu.reset(true);
                    self.arm_immediate();
                    println!("machine reset");
                }
                Some(DebugCommand::Read) => {
                    let Some(addr) = args.first().and_then(|s| u16::from_str_radix(s.trim_start_matches("0x"), 16).ok()) else {
                        println!("usage: read <hex-addr> [len]");
                        continue;
                    };
                    let len: u16 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
                    dump_bytes(bus, addr, len);
                }
                Some(DebugCommand::Write) => {
                    let addr = args.first().and_then(|s| u16::from_str_radix(s.trim_start_matches("0x"), 16).ok());
                    let value: Option<u8> = args.get(1).and_then(|s| s.parse().ok());
                    match (addr, value) {
                        (Some(addr), Some(value)) => bus.write8(addr, value),
                        _ => println!("usage: write <hex-addr> <dec-value>"),
                    }
                }
                Some(DebugCommand::Vblank) => {
                    gpu.render_and_vblank();
                    let flags = bus.read_if();
                    bus.write_if(flags | crate::mmu::INT_VBLANK);
                    println!("vblank triggered");
                }
                Some(DebugCommand::DebugInterrupt) => {
                    cpu.interrupt(0, bus);
                    println!("debug interrupt vector invoked");
                }
                Some(DebugCommand::Help) => print_help(),
                None => println!("unrecognised command: {keyword} (try `help`)"),
            }
        }
    }

    fn print_diagnostic(&self, cpu: &Cpu, bus: &impl Memory) {
        println!("{cpu}");
        let hl_str = safe_read(bus, cpu.regs.hl());
        let sp_str = safe_read(bus, cpu.regs.sp);
        let group = crate::cpu::decode(cpu.cur_opcode);
        println!(
            "op:{:02X} ({group:?}) (HL):{hl_str} (SP):{sp_str} IF:{:02X} IE:{:02X}",
            cpu.cur_opcode,
            bus.read_if(),
            bus.read_ie()
        );
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

fn safe_read(bus: &impl Memory, addr: u16) -> String {
    format!("{:02X}", bus.read8(addr))
}

fn dump_bytes(bus: &impl Memory, addr: u16, len: u16) {
    for row_start in (0..len).step_by(4) {
        let mut line = format!("{:04X}:", addr.wrapping_add(row_start));
        for i in 0..4.min(len - row_start) {
            line.push_str(&format!(" {:02X}", bus.read8(addr.wrapping_add(row_start + i))));
        }
        println!("{line}");
    }
}

fn print_help() {
    println!("c/continue s/step[n] v/verbose b/break<addr> clear r/run q/quit reset read/ld write vblank debug ?/help");
}
