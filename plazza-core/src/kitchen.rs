//! Kitchen Runtime
//!
//! One kitchen per forked child process. The kitchen owns its ingredient
//! stock, a fixed cook pool, a restock ticker, and the pipe event loop that
//! accepts jobs and answers status pulls until the idle predicate retires it.

use crate::{CookPool, KitchenStatus, PizzaJob, Stock};
use plazza_ipc::{Message, PipeChannel};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long a kitchen sits idle before it retires itself.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Event-loop tick right after handling a message.
const BUSY_TICK: Duration = Duration::from_millis(10);
/// Event-loop tick while the pipe is quiet.
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Tunables for one kitchen process.
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    pub id: u32,
    pub cooks: u32,
    pub restock_interval: Duration,
    pub idle_timeout: Duration,
}

impl KitchenConfig {
    pub fn new(id: u32, cooks: u32, restock_interval: Duration) -> Self {
        Self {
            id,
            cooks,
            restock_interval,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Most jobs this kitchen will hold at once, queued plus cooking.
    pub fn max_capacity(&self) -> u32 {
        2 * self.cooks
    }
}

/// State shared between the event loop, the cook tasks, and the ticker.
///
/// Lock discipline: the job queue and the stock each have their own mutex
/// and are never held together except in [`snapshot`](KitchenState::snapshot),
/// which takes queue before stock.
struct KitchenState {
    config: KitchenConfig,
    channel: Mutex<PipeChannel>,
    /// Jobs accepted but not yet completed; a cook pops the front only when
    /// its pizza is done, so the length counts queued plus cooking.
    queue: Mutex<VecDeque<PizzaJob>>,
    stock: Mutex<Stock>,
    active_cooks: AtomicU32,
    last_activity: Mutex<Instant>,
}

impl KitchenState {
    fn touch(&self) {
        *self.last_activity.lock().unwrap() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity.lock().unwrap().elapsed()
    }

    fn snapshot(&self) -> KitchenStatus {
        let queue = self.queue.lock().unwrap();
        let stock = self.stock.lock().unwrap();
        let active_cooks = self.active_cooks.load(Ordering::SeqCst);

        KitchenStatus {
            kitchen_id: self.config.id,
            active_cooks,
            total_cooks: self.config.cooks,
            queued_jobs: (queue.len() as u32).saturating_sub(active_cooks),
            max_capacity: self.config.max_capacity(),
            ingredients: stock.counts(),
        }
    }

    fn send(&self, message: &Message) {
        if let Err(e) = self.channel.lock().unwrap().send(&message.encode()) {
            warn!("kitchen {}: send failed: {e}", self.config.id);
        }
    }
}

pub struct Kitchen {
    state: Arc<KitchenState>,
    pool: CookPool,
    ticker: RestockTicker,
}

impl Kitchen {
    pub fn new(config: KitchenConfig, channel: PipeChannel) -> Self {
        let pool = CookPool::new(config.cooks);
        let state = Arc::new(KitchenState {
            channel: Mutex::new(channel),
            queue: Mutex::new(VecDeque::new()),
            stock: Mutex::new(Stock::new()),
            active_cooks: AtomicU32::new(0),
            last_activity: Mutex::new(Instant::now()),
            config,
        });
        let ticker = RestockTicker::start(Arc::clone(&state));

        info!(
            "kitchen {} started with {} cooks",
            state.config.id, state.config.cooks
        );

        Self { state, pool, ticker }
    }

    /// Run the event loop until the idle predicate trips, then shut down
    /// cleanly: drain the cooks, join the ticker, close the channel.
    pub fn run(mut self) {
        loop {
            let frame = self.state.channel.lock().unwrap().receive();
            let handled = match frame {
                Some(raw) => {
                    self.dispatch(&raw);
                    true
                }
                None => false,
            };

            if !handled && self.should_retire() {
                info!(
                    "kitchen {} closing after {:?} of inactivity",
                    self.state.config.id, self.state.config.idle_timeout
                );
                break;
            }

            thread::sleep(if handled { BUSY_TICK } else { IDLE_TICK });
        }

        self.pool.stop();
        self.ticker.stop();
        self.state.channel.lock().unwrap().close();
        info!("kitchen {} stopped", self.state.config.id);
    }

    fn dispatch(&self, raw: &str) {
        match Message::parse(raw) {
            Some(Message::Pizza(payload)) => self.handle_pizza(&payload),
            Some(Message::StatusRequest) => self.handle_status_request(),
            Some(other) => debug!(
                "kitchen {}: ignoring unexpected frame: {other:?}",
                self.state.config.id
            ),
            None => warn!(
                "kitchen {}: unrecognized frame: {raw}",
                self.state.config.id
            ),
        }
    }

    fn handle_pizza(&self, payload: &str) {
        let job = match PizzaJob::decode(payload) {
            Ok(job) => job,
            Err(e) => {
                warn!("kitchen {}: bad pizza payload: {e}", self.state.config.id);
                return;
            }
        };

        {
            let mut queue = self.state.queue.lock().unwrap();
            if queue.len() as u32 >= self.state.config.max_capacity() {
                warn!(
                    "kitchen {}: at capacity, dropping {}",
                    self.state.config.id,
                    job.name()
                );
                return;
            }
            queue.push_back(job.clone());
        }
        debug!("kitchen {}: accepted {}", self.state.config.id, job.name());

        let state = Arc::clone(&self.state);
        self.pool.execute(move || cook(&state, job));
        self.state.touch();
    }

    fn handle_status_request(&self) {
        let status = self.state.snapshot();
        self.state.send(&Message::Status(status.encode()));
        self.state.touch();
    }

    /// Retirable only with no cook busy, nothing queued, and the idle
    /// timeout elapsed.
    fn should_retire(&self) -> bool {
        if self.state.active_cooks.load(Ordering::SeqCst) > 0 {
            return false;
        }
        if !self.state.queue.lock().unwrap().is_empty() {
            return false;
        }
        self.state.idle_for() > self.state.config.idle_timeout
    }
}

/// One cook cycle: take the ingredients, sleep the cook time, report back.
/// Runs on a pool thread, so at most `cooks` of these are live at once.
fn cook(state: &Arc<KitchenState>, mut job: PizzaJob) {
    state.active_cooks.fetch_add(1, Ordering::SeqCst);
    state.touch();

    let fed = state.stock.lock().unwrap().consume(job.pizza_type.ingredients());
    if !fed {
        warn!(
            "kitchen {}: missing ingredients for {}, dropping the job",
            state.config.id,
            job.name()
        );
        let _ = state.queue.lock().unwrap().pop_front();
        state.active_cooks.fetch_sub(1, Ordering::SeqCst);
        return;
    }

    thread::sleep(job.cook_time());
    job.cooked = true;

    state.send(&Message::Completed(job.encode()));
    info!("kitchen {}: {} ready", state.config.id, job.name());

    let _ = state.queue.lock().unwrap().pop_front();
    state.active_cooks.fetch_sub(1, Ordering::SeqCst);
    state.touch();
}

/// Periodic +1 restock of every ingredient, capped at the stock ceiling.
/// Runs until the kitchen shuts down; the stop flag rides a condvar so a
/// retiring kitchen never waits out a full interval to join it.
struct RestockTicker {
    stop: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RestockTicker {
    fn start(state: Arc<KitchenState>) -> Self {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let shared_stop = Arc::clone(&stop);
        let interval = state.config.restock_interval;

        let handle = thread::Builder::new()
            .name(format!("restock-{}", state.config.id))
            .spawn(move || {
                let (flag, signal) = &*shared_stop;
                let mut stopped = flag.lock().unwrap();
                loop {
                    let (guard, timeout) = signal.wait_timeout(stopped, interval).unwrap();
                    stopped = guard;
                    if *stopped {
                        break;
                    }
                    if timeout.timed_out() {
                        state.stock.lock().unwrap().restock();
                        debug!("kitchen {}: restocked ingredients", state.config.id);
                    }
                }
            })
            .expect("restock thread spawn");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        *self.stop.0.lock().unwrap() = true;
        self.stop.1.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RestockTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
