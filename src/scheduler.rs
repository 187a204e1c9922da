use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, sleep_until};
use tracing::{debug, info, warn};
use crate::cache::{CacheStore, make_cache_key};
use crate::config::{ConfigUpdate, SchedulerConfig};
use crate::error::{CallError, TransportError};
use crate::metrics::{
    ACTIVE_CALLS, CACHE_HITS, CACHE_MISSES, CACHE_SIZE, COALESCED_TOTAL, QUEUED_CALLS,
    SUBMISSIONS_TOTAL, TRANSPORT_CALLS, TRANSPORT_FAILURES, TRANSPORT_LATENCY,
};
use crate::models::{CallDescriptor, Stats};
use crate::throttle::ThrottleTracker;
use crate::transport::Transport;

type Reply = oneshot::Sender<Result<Value, CallError>>;
type Outcome = (Result<Value, TransportError>, Duration);

// How often stale cache entries and throttle records are dropped
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);

enum Command {
    Submit {
        descriptor: CallDescriptor,
        reply: Reply,
    },
    UpdateConfig(ConfigUpdate),
    ClearCache,
    Stats(oneshot::Sender<Stats>),
}

// One deferred call; its callers wait in Dispatcher::waiters under (epoch, key)
struct AdmissionUnit {
    epoch: u64,
    key: String,
    descriptor: CallDescriptor,
    submitted_at: Instant,
}

/// Handle to the call scheduler.
///
/// Cloning is cheap; every clone talks to the same task, which owns the
/// queue, the in-flight set, the cache and the throttle records. The task
/// ends once all handles are dropped and nothing is in flight.
#[derive(Clone)]
pub struct Scheduler {
    commands: mpsc::UnboundedSender<Command>,
}

impl Scheduler {
    /// Start the scheduler on the current tokio runtime.
    pub fn spawn<T: Transport>(transport: T, config: SchedulerConfig) -> Self {
        Self::spawn_shared(Arc::new(transport), config)
    }

    pub fn spawn_shared<T: Transport>(transport: Arc<T>, config: SchedulerConfig) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(transport, config);
        tokio::spawn(dispatcher.run(rx));
        Self { commands }
    }

    /// Queue a call. The returned future settles with the call's value or
    /// error; dropping it does not stop the call.
    ///
    /// Admission order follows the order of `submit` calls, not the order
    /// the futures are awaited in.
    pub fn submit(
        &self,
        descriptor: CallDescriptor,
    ) -> impl Future<Output = Result<Value, CallError>> + Send + 'static {
        let (reply, rx) = oneshot::channel();
        // a closed channel drops `reply`, which the receiver reports below
        let _ = self.commands.send(Command::Submit { descriptor, reply });
        async move { rx.await.map_err(|_| CallError::Closed)? }
    }

    pub fn update_config(&self, update: ConfigUpdate) -> Result<(), CallError> {
        self.commands
            .send(Command::UpdateConfig(update))
            .map_err(|_| CallError::Closed)
    }

    /// Forget every cached value. Calls already queued or in flight still
    /// settle their callers, but their results are not cached and later
    /// identical calls are not joined onto them.
    pub fn clear_cache(&self) -> Result<(), CallError> {
        self.commands
            .send(Command::ClearCache)
            .map_err(|_| CallError::Closed)
    }

    pub async fn stats(&self) -> Result<Stats, CallError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Stats(tx))
            .map_err(|_| CallError::Closed)?;
        rx.await.map_err(|_| CallError::Closed)
    }
}

struct Dispatcher<T> {
    transport: Arc<T>,
    config: SchedulerConfig,
    cache: CacheStore,
    throttle: ThrottleTracker,
    queue: VecDeque<AdmissionUnit>,
    // bumped by clear_cache; units from older epochs are neither joined nor cached
    epoch: u64,
    // callers per (epoch, cache key), for queued and in-flight units alike
    waiters: HashMap<(u64, String), Vec<Reply>>,
    active: HashMap<Id, AdmissionUnit>,
    in_flight: JoinSet<Outcome>,
}

impl<T: Transport> Dispatcher<T> {
    fn new(transport: Arc<T>, config: SchedulerConfig) -> Self {
        Self {
            transport,
            config,
            cache: CacheStore::new(),
            throttle: ThrottleTracker::new(),
            queue: VecDeque::new(),
            epoch: 0,
            waiters: HashMap::new(),
            active: HashMap::new(),
            in_flight: JoinSet::new(),
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!(
            max_concurrent = self.config.max_concurrent,
            min_interval = ?self.config.min_interval,
            cache_ttl = ?self.config.cache_ttl,
            "Scheduler started"
        );
        let mut open = true;
        let mut housekeeping = interval(HOUSEKEEPING_INTERVAL);
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv(), if open => match command {
                    Some(command) => self.handle(command),
                    None => open = false,
                },
                Some(joined) = self.in_flight.join_next_with_id() => {
                    self.settle(joined);
                }
                _ = housekeeping.tick(), if open => self.housekeep(),
                else => break,
            }
        }

        if !self.queue.is_empty() {
            warn!(queued = self.queue.len(), "Scheduler stopped with calls still queued");
        }
        info!("Scheduler stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Submit { descriptor, reply } => self.submit(descriptor, reply),
            Command::UpdateConfig(update) => {
                self.config.apply(update);
                info!(
                    max_concurrent = self.config.max_concurrent,
                    min_interval = ?self.config.min_interval,
                    cache_ttl = ?self.config.cache_ttl,
                    "Scheduler config updated"
                );
                self.drain();
            }
            Command::ClearCache => {
                self.cache.clear();
                self.epoch += 1;
                CACHE_SIZE.set(0.0);
                info!(epoch = self.epoch, "Cache cleared");
            }
            Command::Stats(tx) => {
                let _ = tx.send(self.stats());
            }
        }
    }

    fn submit(&mut self, descriptor: CallDescriptor, reply: Reply) {
        SUBMISSIONS_TOTAL.inc();
        let now = Instant::now();
        let key = make_cache_key(&descriptor);

        // check cache first
        if let Some(value) = self.cache.get(&key, self.config.cache_ttl, now) {
            CACHE_HITS.inc();
            debug!(endpoint = %descriptor.endpoint_key(), "Cache HIT");
            let _ = reply.send(Ok(value));
            return;
        }

        // an identical call is already queued or running
        if let Some(waiting) = self.waiters.get_mut(&(self.epoch, key.clone())) {
            COALESCED_TOTAL.inc();
            debug!(endpoint = %descriptor.endpoint_key(), callers = waiting.len() + 1, "Joined pending call");
            waiting.push(reply);
            return;
        }
        CACHE_MISSES.inc();

        self.waiters.insert((self.epoch, key.clone()), vec![reply]);
        self.queue.push_back(AdmissionUnit {
            epoch: self.epoch,
            key,
            descriptor,
            submitted_at: now,
        });
        self.drain();
    }

    fn drain(&mut self) {
        while self.active.len() < self.config.max_concurrent {
            let Some(unit) = self.queue.pop_front() else {
                break;
            };
            self.admit(unit);
        }
        self.update_gauges();
    }

    fn admit(&mut self, unit: AdmissionUnit) {
        let now = Instant::now();
        let endpoint = unit.descriptor.endpoint_key();
        let dispatch_at = self.throttle.reserve(endpoint.clone(), now, self.config.min_interval);
        debug!(
            %endpoint,
            waited = ?now.saturating_duration_since(unit.submitted_at),
            throttle = ?dispatch_at.saturating_duration_since(now),
            "Admitting call"
        );

        let transport = Arc::clone(&self.transport);
        let descriptor = unit.descriptor.clone();
        let handle = self.in_flight.spawn(async move {
            sleep_until(dispatch_at).await;
            TRANSPORT_CALLS.inc();
            let started = Instant::now();
            let result = transport.invoke(&descriptor).await;
            (result, started.elapsed())
        });
        self.active.insert(handle.id(), unit);
    }

    fn settle(&mut self, joined: Result<(Id, Outcome), JoinError>) {
        let (id, result) = match joined {
            Ok((id, (result, elapsed))) => {
                TRANSPORT_LATENCY.observe(elapsed.as_secs_f64());
                (id, result.map_err(CallError::from))
            }
            Err(e) => {
                warn!(error = %e, "Call execution did not finish");
                (e.id(), Err(CallError::Aborted))
            }
        };

        if let Some(unit) = self.active.remove(&id) {
            match &result {
                Ok(value) => {
                    debug!(endpoint = %unit.descriptor.endpoint_key(), "Call succeeded");
                    if unit.epoch == self.epoch {
                        self.cache.put(unit.key.clone(), value.clone(), Instant::now());
                    }
                }
                Err(e) => {
                    TRANSPORT_FAILURES.inc();
                    warn!(endpoint = %unit.descriptor.endpoint_key(), error = %e, "Call failed");
                }
            }
            for reply in self.waiters.remove(&(unit.epoch, unit.key)).unwrap_or_default() {
                let _ = reply.send(result.clone());
            }
        }

        self.drain();
    }

    fn housekeep(&mut self) {
        let now = Instant::now();
        let purged = self.cache.purge_expired(self.config.cache_ttl, now);
        self.throttle.prune(now, self.config.min_interval);
        CACHE_SIZE.set(self.cache.len() as f64);
        if purged > 0 {
            debug!(purged, endpoints = self.throttle.len(), "Dropped expired cache entries");
        }
    }

    fn stats(&mut self) -> Stats {
        self.housekeep();
        Stats {
            active_count: self.active.len(),
            queued_count: self.queue.len(),
            cached_count: self.cache.len(),
        }
    }

    fn update_gauges(&self) {
        ACTIVE_CALLS.set(self.active.len() as f64);
        QUEUED_CALLS.set(self.queue.len() as f64);
    }
}
