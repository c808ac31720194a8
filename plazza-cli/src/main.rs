//! Plazza - Reception Entry Point
//!
//! The parent process that hosts the reception console and forks kitchens.

fn main() {
    std::process::exit(plazza_cli::run());
}
