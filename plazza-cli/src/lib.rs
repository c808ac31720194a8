//! Plazza CLI
//!
//! Entry wiring for the `plazza` binary: argument parsing, the process-wide
//! log sink, signal handling, and the reception loop. Use
//! [`run`] from `main` and exit with its status.

pub mod logging;
mod manager;
mod reception;

pub use manager::KitchenManager;
pub use reception::Reception;

use clap::error::ErrorKind;
use clap::Parser;
use logging::LogSink;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Exit status for any initialization failure.
const EXIT_USAGE: i32 = 84;
const PARENT_LOG: &str = "plazza.log";

#[derive(Parser, Debug)]
#[command(name = "plazza", version, about = "Multi-process pizza cooking fleet")]
pub struct Cli {
    /// Cooking time multiplier (values below 1 cook faster)
    pub multiplier: f64,

    /// Number of cooks per kitchen
    pub cooks_per_kitchen: u32,

    /// Ingredient restock period in milliseconds
    pub restock_time_ms: u64,
}

/// Parse arguments, wire up the process, and run the reception console.
/// Returns the process exit status.
pub fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return 0;
        }
        Err(_) => {
            print_usage();
            return EXIT_USAGE;
        }
    };

    // NaN fails the comparison too.
    if !(cli.multiplier > 0.0) || !cli.multiplier.is_finite() {
        eprintln!("Error: multiplier must be a positive number");
        print_usage();
        return EXIT_USAGE;
    }
    if cli.cooks_per_kitchen == 0 || cli.restock_time_ms == 0 {
        eprintln!("Error: all parameters must be positive");
        print_usage();
        return EXIT_USAGE;
    }

    install_signal_handlers();

    let log = match LogSink::new(Path::new(PARENT_LOG), true) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error: cannot open {PARENT_LOG}: {e}");
            return EXIT_USAGE;
        }
    };
    if let Err(e) = log.install() {
        eprintln!("Error: {e}");
        return EXIT_USAGE;
    }

    info!(
        "starting plazza with multiplier={}, cooks={}, restock={}ms",
        cli.multiplier, cli.cooks_per_kitchen, cli.restock_time_ms
    );

    let reception = Reception::new(
        cli.multiplier,
        cli.cooks_per_kitchen,
        Duration::from_millis(cli.restock_time_ms),
        log,
    );
    match reception.run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_USAGE
        }
    }
}

fn print_usage() {
    eprintln!("Usage: plazza <multiplier> <cooks_per_kitchen> <restock_time_ms>");
    eprintln!("  multiplier: cooking time multiplier (values between 0 and 1 cook faster)");
    eprintln!("  cooks_per_kitchen: number of cooks per kitchen");
    eprintln!("  restock_time_ms: ingredient restock period in milliseconds");
}

/// Handler body is restricted to async-signal-safe calls, hence `_exit`
/// rather than a normal exit path.
extern "C" fn exit_on_signal(_signal: libc::c_int) {
    // SAFETY: _exit is async-signal-safe.
    unsafe { libc::_exit(0) }
}

fn install_signal_handlers() {
    let handler = exit_on_signal as extern "C" fn(libc::c_int);
    // SAFETY: installing a handler that only calls _exit.
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}
