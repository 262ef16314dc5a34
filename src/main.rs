use std::fs;

use clap::Parser;
use log::info;

use lr35902_core::args::Args;
use lr35902_core::gpu::NullGpu;
use lr35902_core::machine::Machine;
use lr35902_core::mmu::Memory;

/// A flat 64KiB address space: ROM bytes loaded at 0x0000, everything else
/// zeroed including the dedicated IE/IF cells at their real addresses. Lives
/// here, not in the library, since the core's `Memory` trait is deliberately
/// narrow and a fuller bus is out of scope.
struct StubBus {
    bytes: [u8; 0x1_0000],
}

impl StubBus {
    fn from_rom(rom: &[u8]) -> Self {
        let mut bytes = [0u8; 0x1_0000];
        let len = rom.len().min(bytes.len());
        bytes[..len].copy_from_slice(&rom[..len]);
        Self { bytes }
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

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = &args.log_path {
        info!("logging additionally configured for {path:?} is not wired up; using stderr");
    }
    builder.init();

    let rom = fs::read(&args.load_rom).expect("failed to read ROM file");
    let bus = StubBus::from_rom(&rom);
    let mut machine = Machine::new(bus, NullGpu::default());
    machine.headless = args.test;

    if let Some(addr) = &args.break_at {
        match u16::from_str_radix(addr.trim_start_matches("0x"), 16) {
            Ok(pc) => machine.break_at(pc),
            Err(_) => eprintln!("invalid --break-at address: {addr}"),
        }
    }

    if args.test {
        while machine.cpu.running && !machine.cpu.asleep {
            machine.simulate();
        }
    } else {
        machine.run_until_halted_or_stopped();
    }
}
