//! pagesim command line entry point
//!
//! Each invocation loads the saved state, runs one operation and saves the
//! state again:
//!
//! ```text
//! pagesim read 4096
//! pagesim write 0x1000 65
//! pagesim sync
//! pagesim status
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;

use pagesim::config::Config;
use pagesim::error::ConfigError;
use pagesim::{logging, Access, DirectoryPager, PhysicalAddress, VirtualAddress, VmError, VmSystem};

#[derive(Parser)]
#[command(name = "pagesim")]
#[command(version, about = "Demand-paged virtual memory simulator", long_about = None)]
struct Cli {
    /// Config file (default: ./pagesim.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the snapshot files
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the byte at a virtual address
    Read {
        /// Virtual address, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_address)]
        address: VirtualAddress,
    },

    /// Store a byte at a virtual address
    Write {
        /// Virtual address, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_address)]
        address: VirtualAddress,

        /// Value to store (0-255)
        value: u8,
    },

    /// Write every resident page back to its backing page
    Sync,

    /// Show resident pages and free frames
    Status,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Vm(#[from] VmError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn parse_address(text: &str) -> Result<VirtualAddress, String> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed
        .map(VirtualAddress)
        .map_err(|e| format!("invalid address '{}': {}", text, e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.state_dir {
        config = config.with_state_dir(dir);
    }

    let level = logging::resolve_level(cli.log_level.as_deref(), config.log_level.as_deref())?;
    logging::init(level);

    let pager = DirectoryPager::open(config.backing_path())?;
    let files = config.snapshot_files();
    let mut vm = files.load(pager)?;

    match cli.command {
        Command::Read { address } => {
            let physical = translate_reporting_faults(&mut vm, address, Access::Read)?;
            let value = vm.read_byte(address)?;
            println!("reading data from virtual address {}", address);
            println!("-> physical address {}, value {}", physical, value);
            files.save(&vm)?;
        }
        Command::Write { address, value } => {
            let physical = translate_reporting_faults(&mut vm, address, Access::Write)?;
            vm.write_byte(address, value)?;
            println!(
                "-> virtual address {}, wrote {} to physical address {}",
                address, value, physical
            );
            files.save(&vm)?;
        }
        Command::Sync => {
            let written = vm.sync_all()?;
            println!("synced {} resident pages", written);
        }
        Command::Status => print_status(&vm)?,
    }

    Ok(())
}

fn translate_reporting_faults(
    vm: &mut VmSystem<DirectoryPager>,
    address: VirtualAddress,
    access: Access,
) -> Result<PhysicalAddress, VmError> {
    let faults = vm.stats().total;
    let physical = vm.translate(address, access)?;
    if vm.stats().total > faults {
        println!(
            "page fault: {} loaded into {}",
            address.page(),
            physical.frame()
        );
    }
    Ok(physical)
}

fn print_status(vm: &VmSystem<DirectoryPager>) -> Result<(), VmError> {
    let status = vm.status();
    println!("resident pages: {}", status.resident_pages);
    println!(
        "free frames:    {} of {}",
        status.free_frames, status.total_frames
    );
    println!("backing pages:  {}", vm.pager().page_count()?);

    for (page, frame) in vm.page_table().resident() {
        println!("  {} -> {}", page, frame);
    }
    Ok(())
}
