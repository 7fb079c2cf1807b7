use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use gbemu_core::{Bus, Cpu, Flag, Machine, Memory, ADDRESS_SPACE};

/// Game Boy (LR35902) CPU interpreter.
///
/// Loads a ROM image at address 0 of a flat 64 KiB memory, executes
/// instructions until STOP, and optionally dumps the final machine state.
#[derive(Parser)]
#[command(name = "gbemu", version)]
struct Args {
    /// Input ROM to execute in the emulator
    input_rom: PathBuf,

    /// Enables verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dumps the contents of CPU registers after execution
    #[arg(long)]
    dump_registers: bool,

    /// Dumps the contents of memory after execution
    #[arg(long)]
    dump_memory: bool,
}

fn load_rom(path: &Path, memory: &mut Memory) -> Result<()> {
    let rom = std::fs::read(path)
        .with_context(|| format!("failed to read ROM file {}", path.display()))?;
    if rom.len() > memory.size() {
        bail!(
            "ROM is {} bytes but memory holds only {}",
            rom.len(),
            memory.size()
        );
    }

    log::info!(
        "reading {} bytes from {} into memory",
        rom.len(),
        path.display()
    );
    memory.load(0, &rom);
    Ok(())
}

fn flags_to_string(cpu: &Cpu) -> String {
    let mut out = String::with_capacity(4);
    for flag in [Flag::Z, Flag::N, Flag::H, Flag::C] {
        out.push(if cpu.get_flag(flag) { '1' } else { '-' });
    }
    out
}

fn dump_registers(cpu: &Cpu) {
    println!(
        "AF: 0x{:04x} BC: 0x{:04x} DE: 0x{:04x} HL: 0x{:04x} SP: 0x{:04x} PC: 0x{:04x} F: {}",
        cpu.regs.af(),
        cpu.regs.bc(),
        cpu.regs.de(),
        cpu.regs.hl(),
        cpu.regs.sp,
        cpu.regs.pc,
        flags_to_string(cpu),
    );
}

fn dump_memory(memory: &mut Memory) {
    const CHUNK_SIZE: usize = 8;

    for base in (0..memory.size()).step_by(CHUNK_SIZE) {
        print!("0x{base:04x}    ");
        for offset in 0..CHUNK_SIZE.min(memory.size() - base) {
            print!(" {:02x}", memory.read8((base + offset) as u16));
        }
        println!();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let mut machine = Machine::new(Memory::new(ADDRESS_SPACE));
    load_rom(&args.input_rom, &mut machine.bus)?;

    machine.run_to_stop();
    log::info!("STOP instruction encountered");

    if args.dump_registers {
        dump_registers(&machine.cpu);
    }
    if args.dump_memory {
        dump_memory(&mut machine.bus);
    }

    Ok(())
}
