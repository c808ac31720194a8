//! Reception
//!
//! The interactive order counter: a read-eval-print loop that parses order
//! lines, hands individual pizzas to the kitchen manager, answers the
//! reserved verbs, and triggers the idle sweep every few commands.

use crate::logging::LogSink;
use crate::manager::KitchenManager;
use plazza_core::{parse_order_line, PizzaJob};
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// Idle-sweep cadence, in processed commands.
const SWEEP_EVERY: u32 = 10;
/// Pause after a batch of orders so fresh kitchens settle before the next
/// prompt.
const ORDER_SETTLE: Duration = Duration::from_millis(200);

pub struct Reception {
    manager: KitchenManager,
    multiplier: f64,
    cooks_per_kitchen: u32,
    restock_interval: Duration,
}

impl Reception {
    pub fn new(
        multiplier: f64,
        cooks_per_kitchen: u32,
        restock_interval: Duration,
        log: LogSink,
    ) -> Self {
        Self {
            manager: KitchenManager::new(cooks_per_kitchen, restock_interval, log),
            multiplier,
            cooks_per_kitchen,
            restock_interval,
        }
    }

    /// Run the console until `quit`, `exit`, or end of input, then shut the
    /// fleet down. Command failures are reported and the loop resumes.
    pub fn run(&self) -> anyhow::Result<()> {
        self.print_welcome();
        print_help();

        let stdin = io::stdin();
        let mut input = String::new();
        let mut processed = 0u32;

        loop {
            print!("plazza> ");
            io::stdout().flush()?;

            input.clear();
            if stdin.lock().read_line(&mut input)? == 0 {
                break;
            }
            let line = input.trim();
            if line.is_empty() {
                continue;
            }

            match line {
                "status" => self.manager.display_status(),
                "help" => print_help(),
                "quit" | "exit" => break,
                order => self.handle_order(order),
            }

            processed += 1;
            if processed >= SWEEP_EVERY {
                self.manager.sweep_idle();
                processed = 0;
            }
        }

        info!("reception shutting down");
        self.manager.shutdown();
        Ok(())
    }

    fn handle_order(&self, line: &str) {
        let orders = match parse_order_line(line) {
            Ok(orders) => orders,
            Err(e) => {
                println!("Invalid order format. {e}");
                println!("Example: regina XXL x2; fantasia M x3; margarita S x1");
                return;
            }
        };

        let total: u32 = orders.iter().map(|o| o.quantity).sum();
        println!("Processing {total} pizza(s)...");

        // Each unit pizza is dispatched on its own so the load balancer can
        // spread one order across the fleet.
        for order in &orders {
            for _ in 0..order.quantity {
                let job = PizzaJob::new(order.pizza_type, order.size, self.multiplier);
                match self.manager.distribute(&job) {
                    Ok(()) => {
                        println!("Ordered: {}", job.name());
                        info!("pizza ordered: {}", job.name());
                    }
                    Err(e) => {
                        println!("Failed to order: {} ({e})", job.name());
                        error!("failed to order {}: {e}", job.name());
                    }
                }
            }
        }

        thread::sleep(ORDER_SETTLE);
        println!();
    }

    fn print_welcome(&self) {
        println!();
        println!("Welcome to Plazza - The Ultimate Pizza Ordering System!");
        println!("WHO SAID ANYTHING ABOUT PIZZAS?");
        println!();
        println!("Configuration:");
        println!("  Cooking multiplier: {}", self.multiplier);
        println!("  Cooks per kitchen: {}", self.cooks_per_kitchen);
        println!("  Restock time: {}ms", self.restock_interval.as_millis());
    }
}

fn print_help() {
    println!();
    println!("=== PLAZZA HELP ===");
    println!("Commands:");
    println!("  status          - Show kitchen status");
    println!("  help            - Show this help message");
    println!("  quit/exit       - Exit the program");
    println!();
    println!("Pizza ordering format:");
    println!("  TYPE SIZE xQUANTITY [; TYPE SIZE xQUANTITY]*");
    println!();
    println!("Available pizza types:");
    println!("  regina, margarita, americana, fantasia");
    println!();
    println!("Available sizes:");
    println!("  S, M, L, XL, XXL");
    println!();
    println!("Example:");
    println!("  regina XXL x2; fantasia M x3; margarita S x1");
    println!("===================");
}
