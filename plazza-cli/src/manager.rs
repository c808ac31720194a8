//! Kitchen Manager
//!
//! Parent-side dispatcher for the fleet: owns the kitchen registry, forks
//! kitchens on demand under the per-kitchen capacity ceiling, load-balances
//! pizzas over the pipes, reaps dead children, and retires the long idle.
//!
//! The registry lives under a single mutex taken at every public entry
//! point; pipe writes for a kitchen are deliberately serialized with
//! registry mutation by sending while the lock is held.

use crate::logging::LogSink;
use plazza_core::{Ingredient, Kitchen, KitchenConfig, KitchenStatus, PizzaJob, PlazzaError};
use plazza_ipc::{Message, PipeChannel};
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Parent-side idleness threshold before a kitchen is retired.
const RETIRE_TIMEOUT: Duration = Duration::from_secs(10);
/// SIGTERM grace: poll the child this often, this many times, then SIGKILL.
const TERM_POLL_INTERVAL: Duration = Duration::from_millis(100);
const TERM_POLL_ROUNDS: u32 = 10;
/// Status pull: poll the reply this often, this many times, then fall back.
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(10);
const STATUS_POLL_ROUNDS: u32 = 50;
/// Pause after a fork so the child attaches its event loop before the
/// first frame.
const SPAWN_SETTLE: Duration = Duration::from_millis(100);

/// Parent-side view of one forked kitchen.
struct KitchenRecord {
    id: u32,
    pid: libc::pid_t,
    channel: PipeChannel,
    /// Dispatched-but-uncredited jobs; the kitchen's own queued + active
    /// count is authoritative, this estimate drifts at most by pipe latency.
    in_flight: u32,
    last_activity: Instant,
    active: bool,
}

struct Registry {
    kitchens: Vec<KitchenRecord>,
    next_id: u32,
}

pub struct KitchenManager {
    registry: Mutex<Registry>,
    cooks_per_kitchen: u32,
    restock_interval: Duration,
    log: LogSink,
}

impl KitchenManager {
    pub fn new(cooks_per_kitchen: u32, restock_interval: Duration, log: LogSink) -> Self {
        Self {
            registry: Mutex::new(Registry {
                kitchens: Vec::new(),
                next_id: 1,
            }),
            cooks_per_kitchen,
            restock_interval,
            log,
        }
    }

    fn max_capacity(&self) -> u32 {
        2 * self.cooks_per_kitchen
    }

    /// Hand one pizza to exactly one kitchen, forking a new one when no
    /// live kitchen has headroom. A failed pipe send fails the job; it is
    /// never re-dispatched, since the kitchen may have read part of the
    /// frame already.
    pub fn distribute(&self, job: &PizzaJob) -> Result<(), PlazzaError> {
        let mut registry = self.registry.lock().unwrap();
        reap_dead(&mut registry);
        drain_completions(&mut registry);

        let selected = match select_target(&registry.kitchens, self.max_capacity()) {
            Some(index) => index,
            None => self.fork_kitchen(&mut registry)?,
        };
        let selected = if registry.kitchens[selected].in_flight >= self.max_capacity() {
            self.fork_kitchen(&mut registry)?
        } else {
            selected
        };

        let record = &mut registry.kitchens[selected];
        let frame = Message::Pizza(job.encode()).encode();
        if let Err(e) = record.channel.send(&frame) {
            error!("failed to send {} to kitchen {}: {e}", job.name(), record.id);
            return Err(e.into());
        }

        record.in_flight += 1;
        record.last_activity = Instant::now();
        debug!(
            "dispatched {} to kitchen {} (in flight: {})",
            job.name(),
            record.id,
            record.in_flight
        );
        Ok(())
    }

    /// Reap kitchens whose process already exited and retire the ones with
    /// nothing in flight that have been idle past the threshold.
    pub fn sweep_idle(&self) {
        let mut registry = self.registry.lock().unwrap();
        reap_dead(&mut registry);
        drain_completions(&mut registry);

        let mut index = 0;
        while index < registry.kitchens.len() {
            let retirable = {
                let record = &registry.kitchens[index];
                record.in_flight == 0 && record.last_activity.elapsed() > RETIRE_TIMEOUT
            };
            if retirable {
                let mut record = registry.kitchens.remove(index);
                info!("retiring idle kitchen {}", record.id);
                terminate(&mut record);
            } else {
                index += 1;
            }
        }
    }

    /// Pull a status report from every kitchen and print the fleet view.
    /// A kitchen that misses the reply deadline gets a synthetic row.
    pub fn display_status(&self) {
        let mut registry = self.registry.lock().unwrap();
        reap_dead(&mut registry);

        println!("\n=== KITCHEN STATUS ===");
        println!("Total kitchens: {}", registry.kitchens.len());
        if registry.kitchens.is_empty() {
            println!("No active kitchens");
            println!("=====================");
            return;
        }

        let cooks = self.cooks_per_kitchen;
        for record in registry.kitchens.iter_mut() {
            let status = poll_status(record).unwrap_or_else(|| {
                warn!("kitchen {}: no status reply, using fallback", record.id);
                KitchenStatus::placeholder(record.id, cooks)
            });
            print_kitchen_block(record.pid, &status);
        }
        println!("=====================");
    }

    /// Terminate and reap the whole fleet. Idempotent.
    pub fn shutdown(&self) {
        let mut registry = self.registry.lock().unwrap();
        for record in registry.kitchens.iter_mut() {
            if !record.active {
                continue;
            }
            // SAFETY: signalling then blocking-waiting on a child this
            // registry forked.
            unsafe {
                libc::kill(record.pid, libc::SIGTERM);
                let mut status: libc::c_int = 0;
                libc::waitpid(record.pid, &mut status, 0);
            }
            record.channel.close();
            info!("cleaned up kitchen {}", record.id);
        }
        registry.kitchens.clear();
    }

    pub fn kitchen_count(&self) -> usize {
        self.registry.lock().unwrap().kitchens.len()
    }

    /// Fork one kitchen. The child swaps its log sink, attaches its side of
    /// the channel, runs the kitchen event loop, and exits; it never
    /// returns from this function. The parent records the child and gives
    /// it a moment to come up.
    fn fork_kitchen(&self, registry: &mut Registry) -> Result<usize, PlazzaError> {
        let id = registry.next_id;
        let mut channel = PipeChannel::new()?;

        // SAFETY: the child branch only runs the kitchen loop and exits;
        // the parent is single-threaded at fork time apart from this call.
        let pid = unsafe { libc::fork() };
        if pid < 0 {
            return Err(PlazzaError::Worker(
                "failed to fork kitchen process".to_string(),
            ));
        }

        if pid == 0 {
            let log_path = PathBuf::from(format!("kitchen_{id}.log"));
            let _ = self.log.redirect(&log_path, false);
            channel.setup_child();

            let config = KitchenConfig::new(id, self.cooks_per_kitchen, self.restock_interval);
            Kitchen::new(config, channel).run();
            std::process::exit(0);
        }

        registry.next_id += 1;
        channel.setup_parent();
        registry.kitchens.push(KitchenRecord {
            id,
            pid,
            channel,
            in_flight: 0,
            last_activity: Instant::now(),
            active: true,
        });
        info!("created kitchen {id} with pid {pid}");

        thread::sleep(SPAWN_SETTLE);
        Ok(registry.kitchens.len() - 1)
    }
}

impl Drop for KitchenManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Pick a dispatch target: skip inactive kitchens and those at the ceiling,
/// return the first completely idle one, otherwise the least loaded.
/// Ties break by insertion order.
fn select_target(kitchens: &[KitchenRecord], max_capacity: u32) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, kitchen) in kitchens.iter().enumerate() {
        if !kitchen.active || kitchen.in_flight >= max_capacity {
            continue;
        }
        if kitchen.in_flight == 0 {
            return Some(index);
        }
        if best.map_or(true, |b| kitchen.in_flight < kitchens[b].in_flight) {
            best = Some(index);
        }
    }
    best
}

/// Remove records whose child already exited (non-blocking wait).
fn reap_dead(registry: &mut Registry) {
    registry.kitchens.retain_mut(|record| {
        let mut status: libc::c_int = 0;
        // SAFETY: WNOHANG wait on a child this registry forked.
        let reaped = unsafe { libc::waitpid(record.pid, &mut status, libc::WNOHANG) };
        if reaped == record.pid {
            info!("kitchen {} process exited, removing record", record.id);
            record.channel.close();
            false
        } else {
            true
        }
    });
}

/// Credit any completion notices sitting in the reverse pipes against the
/// in-flight estimates. Stale status replies are discarded.
fn drain_completions(registry: &mut Registry) {
    for record in registry.kitchens.iter_mut() {
        while let Some(raw) = record.channel.receive() {
            match Message::parse(&raw) {
                Some(Message::Completed(payload)) => credit_completion(record, &payload),
                Some(Message::Status(_)) => {
                    debug!("kitchen {}: discarding stale status reply", record.id)
                }
                _ => debug!("kitchen {}: unexpected frame: {raw}", record.id),
            }
        }
    }
}

fn credit_completion(record: &mut KitchenRecord, payload: &str) {
    record.in_flight = record.in_flight.saturating_sub(1);
    match PizzaJob::decode(payload) {
        Ok(job) => info!(
            "kitchen {}: {} ready (in flight: {})",
            record.id,
            job.name(),
            record.in_flight
        ),
        Err(e) => warn!("kitchen {}: bad completion payload: {e}", record.id),
    }
}

/// SIGTERM with a bounded grace window, then SIGKILL, then reap.
fn terminate(record: &mut KitchenRecord) {
    // SAFETY: signalling a child this registry forked.
    if unsafe { libc::kill(record.pid, libc::SIGTERM) } == 0 {
        let mut status: libc::c_int = 0;
        let mut reaped = false;
        for _ in 0..TERM_POLL_ROUNDS {
            // SAFETY: non-blocking wait on the same child.
            if unsafe { libc::waitpid(record.pid, &mut status, libc::WNOHANG) } == record.pid {
                reaped = true;
                break;
            }
            thread::sleep(TERM_POLL_INTERVAL);
        }
        if !reaped {
            warn!("kitchen {} ignored SIGTERM, killing it", record.id);
            // SAFETY: SIGKILL then blocking reap of the same child.
            unsafe {
                libc::kill(record.pid, libc::SIGKILL);
                libc::waitpid(record.pid, &mut status, 0);
            }
        }
    }
    record.channel.close();
    record.active = false;
}

/// Send a status request and poll for the reply up to the deadline.
/// Completions observed while waiting are credited on the spot.
fn poll_status(record: &mut KitchenRecord) -> Option<KitchenStatus> {
    let request = Message::StatusRequest.encode();
    if let Err(e) = record.channel.send(&request) {
        error!("kitchen {}: failed to send status request: {e}", record.id);
        return None;
    }

    for _ in 0..STATUS_POLL_ROUNDS {
        while let Some(raw) = record.channel.receive() {
            match Message::parse(&raw) {
                Some(Message::Status(payload)) => match KitchenStatus::decode(&payload) {
                    Ok(status) => return Some(status),
                    Err(e) => warn!("kitchen {}: bad status payload: {e}", record.id),
                },
                Some(Message::Completed(payload)) => credit_completion(record, &payload),
                _ => debug!("kitchen {}: unexpected frame: {raw}", record.id),
            }
        }
        thread::sleep(STATUS_POLL_INTERVAL);
    }
    None
}

fn print_kitchen_block(pid: libc::pid_t, status: &KitchenStatus) {
    println!("\nKitchen {} (PID {}):", status.kitchen_id, pid);
    println!(
        "  Active cooks: {}/{}",
        status.active_cooks, status.total_cooks
    );
    println!(
        "  Pizzas in queue: {}/{}",
        status.queued_jobs, status.max_capacity
    );
    let counts: Vec<String> = Ingredient::ALL
        .iter()
        .zip(status.ingredients.iter())
        .map(|(ingredient, count)| format!("{ingredient}:{count}"))
        .collect();
    println!("  Ingredients: {}", counts.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Registry rows for selection tests; the pids are never signalled.
    fn record(id: u32, in_flight: u32, active: bool) -> KitchenRecord {
        KitchenRecord {
            id,
            pid: 0,
            channel: PipeChannel::new().expect("pipe allocation"),
            in_flight,
            last_activity: Instant::now(),
            active,
        }
    }

    #[test]
    fn selection_on_an_empty_registry_finds_nothing() {
        assert_eq!(select_target(&[], 4), None);
    }

    #[test]
    fn selection_prefers_a_completely_idle_kitchen() {
        let kitchens = vec![record(1, 2, true), record(2, 0, true), record(3, 0, true)];
        // Early exit: the first idle kitchen wins, in insertion order.
        assert_eq!(select_target(&kitchens, 4), Some(1));
    }

    #[test]
    fn selection_takes_the_least_loaded_kitchen() {
        let kitchens = vec![record(1, 3, true), record(2, 1, true), record(3, 2, true)];
        assert_eq!(select_target(&kitchens, 4), Some(1));
    }

    #[test]
    fn selection_ties_break_by_insertion_order() {
        let kitchens = vec![record(1, 2, true), record(2, 2, true)];
        assert_eq!(select_target(&kitchens, 4), Some(0));
    }

    #[test]
    fn selection_skips_kitchens_at_the_ceiling() {
        let kitchens = vec![record(1, 4, true), record(2, 3, true)];
        assert_eq!(select_target(&kitchens, 4), Some(1));

        let saturated = vec![record(1, 4, true), record(2, 5, true)];
        assert_eq!(select_target(&saturated, 4), None);
    }

    #[test]
    fn selection_skips_inactive_kitchens() {
        let kitchens = vec![record(1, 0, false), record(2, 1, true)];
        assert_eq!(select_target(&kitchens, 4), Some(1));
    }

    #[test]
    fn crediting_a_completion_never_underflows() {
        let mut rec = record(1, 0, true);
        credit_completion(&mut rec, "2|1|1000|1");
        assert_eq!(rec.in_flight, 0);

        rec.in_flight = 2;
        credit_completion(&mut rec, "2|1|1000|1");
        assert_eq!(rec.in_flight, 1);
    }
}
