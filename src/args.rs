use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// ROM image to load into the stub bus.
    #[arg(long)]
    pub load_rom: PathBuf,

    /// Run non-interactively: never enter the debug console.
    #[arg(long)]
    pub test: bool,

    /// Optional log path; if none given, logs go to stderr only.
    #[arg(long)]
    pub log_path: Option<PathBuf>,

    /// Arm an immediate breakpoint at this hex address (e.g. "0150") before
    /// the first step.
    #[arg(long)]
    pub break_at: Option<String>,
}
