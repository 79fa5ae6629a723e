//! Polling scheduler: detects externally-driven slot drift.
//!
//! While any slot is in a transient state the scheduler re-fetches
//! authoritative per-prospect state on a fixed cadence, reconciles it
//! into the store, and publishes change events for drift. One fetch per
//! distinct prospect per tick bounds outbound volume to O(prospects),
//! not O(slots). Sessions are bounded: after `max_poll_ticks` unresolved
//! ticks the scheduler gives up and publishes a timeout so the operator
//! can refresh manually.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, SequenceEvent};
use crate::config::CoordinatorConfig;
use crate::remote::RemoteApi;
use crate::sequence::{SlotKey, SlotStore};

/// Snapshot of the scheduler for host diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Whether the interval task is running.
    pub active: bool,
    pub paused: bool,
    pub tick_count: u32,
    pub pending_keys: usize,
}

/// Process-wide poll session. Created on the first transient key,
/// destroyed when every key resolves or the tick budget runs out.
struct PollSession {
    tick_count: u32,
    active_keys: HashSet<SlotKey>,
    paused: bool,
    /// Bumped whenever the current interval task should stand down.
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

impl PollSession {
    fn new() -> Self {
        Self {
            tick_count: 0,
            active_keys: HashSet::new(),
            paused: false,
            epoch: 0,
            task: None,
        }
    }

    /// End the session: drop keys, reset the budget, stop the task.
    fn clear(&mut self) {
        self.active_keys.clear();
        self.tick_count = 0;
        self.epoch += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Adaptive background poller over the remote fetch-states operation.
pub struct PollScheduler {
    config: CoordinatorConfig,
    store: Arc<SlotStore>,
    remote: Arc<dyn RemoteApi>,
    bus: Arc<EventBus>,
    session: Mutex<PollSession>,
    /// Handle to self for spawning the interval task.
    weak_self: Weak<PollScheduler>,
}

impl PollScheduler {
    pub fn new(
        config: CoordinatorConfig,
        store: Arc<SlotStore>,
        remote: Arc<dyn RemoteApi>,
        bus: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            config,
            store,
            remote,
            bus,
            session: Mutex::new(PollSession::new()),
            weak_self: weak.clone(),
        })
    }

    /// Add a key to the active set, starting the interval task if the
    /// session is idle. Keys are only ever removed by the scheduler
    /// itself, once remote state is observed as no longer transient.
    pub async fn register(&self, key: SlotKey) {
        {
            let mut session = self.session.lock().await;
            if session.active_keys.insert(key.clone()) {
                debug!(key = %key, "Registered slot for polling");
            }
        }
        self.start_if_idle().await;
    }

    /// Is the key currently awaiting resolution?
    pub async fn is_watching(&self, key: &SlotKey) -> bool {
        self.session.lock().await.active_keys.contains(key)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let session = self.session.lock().await;
        SchedulerStatus {
            active: session.task.is_some(),
            paused: session.paused,
            tick_count: session.tick_count,
            pending_keys: session.active_keys.len(),
        }
    }

    /// Run one tick immediately, regardless of cadence.
    pub async fn force_check(&self) {
        self.run_tick().await;
    }

    /// Host UI went hidden: stop the interval but keep the session so
    /// the tick budget is not burned while nobody is looking.
    pub async fn pause(&self) {
        let mut session = self.session.lock().await;
        if session.paused {
            return;
        }
        session.paused = true;
        session.epoch += 1;
        if let Some(task) = session.task.take() {
            task.abort();
        }
        info!(
            pending = session.active_keys.len(),
            tick = session.tick_count,
            "Polling paused"
        );
    }

    /// Host UI is visible again: run an immediate catch-up tick, then
    /// resume the cadence if anything is still unresolved.
    pub async fn resume(&self) {
        {
            let mut session = self.session.lock().await;
            if !session.paused {
                return;
            }
            session.paused = false;
            if session.active_keys.is_empty() {
                return;
            }
            info!(pending = session.active_keys.len(), "Polling resumed");
        }
        self.run_tick().await;
        self.start_if_idle().await;
    }

    async fn start_if_idle(&self) {
        let mut session = self.session.lock().await;
        if session.paused || session.active_keys.is_empty() || session.task.is_some() {
            return;
        }
        let Some(scheduler) = self.weak_self.upgrade() else {
            return;
        };
        session.epoch += 1;
        session.task = Some(Self::spawn_interval(scheduler, session.epoch));
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "Poll session started"
        );
    }

    fn spawn_interval(scheduler: Arc<Self>, epoch: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.config.poll_interval);
            // The first interval tick completes immediately; skip it so
            // the cadence starts one full interval after registration.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !scheduler.epoch_is(epoch).await {
                    return;
                }
                scheduler.run_tick().await;
                if !scheduler.epoch_is(epoch).await {
                    return;
                }
            }
        })
    }

    async fn epoch_is(&self, epoch: u64) -> bool {
        self.session.lock().await.epoch == epoch
    }

    /// One poll tick: batch-fetch per prospect, reconcile drift into the
    /// store, retire resolved keys, and enforce the tick budget.
    async fn run_tick(&self) {
        let (keys, tick) = {
            let mut session = self.session.lock().await;
            if session.active_keys.is_empty() {
                session.clear();
                return;
            }
            session.tick_count += 1;
            let keys: Vec<SlotKey> = session.active_keys.iter().cloned().collect();
            (keys, session.tick_count)
        };

        debug!(tick, pending = keys.len(), "Poll tick");

        let mut by_prospect: HashMap<String, Vec<u8>> = HashMap::new();
        for key in &keys {
            by_prospect
                .entry(key.prospect_id.clone())
                .or_default()
                .push(key.slot_number);
        }

        // One fetch per distinct prospect, issued concurrently.
        let fetches = by_prospect.iter().map(|(prospect_id, slots)| {
            let remote = Arc::clone(&self.remote);
            async move {
                let result = remote.fetch_states(prospect_id).await;
                (prospect_id.clone(), slots.clone(), result)
            }
        });
        let results = futures::future::join_all(fetches).await;

        let mut resolved: Vec<SlotKey> = Vec::new();
        for (prospect_id, watched_slots, result) in results {
            let rows = match result {
                Ok(rows) => rows,
                Err(e) => {
                    // Partial-failure tolerance: one prospect's fetch
                    // failing must not abort the rest of the tick.
                    warn!(prospect = %prospect_id, error = %e, "Poll fetch failed; retrying next tick");
                    continue;
                }
            };

            for row in rows {
                if !watched_slots.contains(&row.slot_number) {
                    continue;
                }
                let key = SlotKey::new(&prospect_id, row.slot_number);

                match self
                    .store
                    .reconcile(&key, row.status, row.tracking_id.as_deref())
                    .await
                {
                    Ok(Some(change)) => {
                        info!(
                            key = %key,
                            from = %change.old_state,
                            to = %change.new_state,
                            "Detected slot drift"
                        );
                        self.bus.publish_change(change);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(key = %key, error = %e, "Ignoring invalid poll row");
                        continue;
                    }
                }

                if !row.status.is_transient() {
                    resolved.push(key);
                }
            }
        }

        let mut session = self.session.lock().await;
        for key in &resolved {
            if session.active_keys.remove(key) {
                debug!(key = %key, "Slot resolved; removed from poll set");
            }
        }

        if session.active_keys.is_empty() {
            info!(ticks = session.tick_count, "All polled slots resolved");
            session.clear();
            return;
        }

        if tick >= self.config.max_poll_ticks {
            warn!(
                ticks = tick,
                unresolved = session.active_keys.len(),
                "Poll budget exhausted; giving up"
            );
            session.clear();
            drop(session);
            self.bus.publish(SequenceEvent::PollingTimeout);
        }
    }
}
