//! Shared test support: a scripted mock remote and a wired component stack.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use outreach_core::bus::EventBus;
use outreach_core::config::CoordinatorConfig;
use outreach_core::coordinator::GenerationCoordinator;
use outreach_core::dispatch::Dispatcher;
use outreach_core::error::RemoteError;
use outreach_core::poll::PollScheduler;
use outreach_core::recorder::TrackingRecorder;
use outreach_core::remote::{
    ConfirmCopyRequest, GenerateRequest, GenerateResponse, RemoteApi, SlotStatusRow,
};
use outreach_core::sequence::{SlotState, SlotStore};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Scripted remote: queued generate/confirm results, per-prospect state
/// tables, and call accounting.
#[derive(Default)]
pub struct MockRemote {
    generate_results: Mutex<VecDeque<Result<GenerateResponse, RemoteError>>>,
    confirm_results: Mutex<VecDeque<Result<(), RemoteError>>>,
    states: Mutex<HashMap<String, Vec<SlotStatusRow>>>,
    failing_fetches: Mutex<Vec<String>>,
    generate_calls: AtomicUsize,
    confirm_calls: AtomicUsize,
    generate_log: Mutex<Vec<GenerateRequest>>,
    fetch_log: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue_generate_ok(&self, tracking_id: &str) {
        self.generate_results
            .lock()
            .unwrap()
            .push_back(Ok(GenerateResponse {
                success: true,
                subject: Some("Your stay at the Grand".into()),
                body_html: Some("<p>Hello!</p>".into()),
                tracking_id: Some(tracking_id.into()),
                ..Default::default()
            }));
    }

    pub fn queue_generate_transport_error(&self) {
        self.generate_results
            .lock()
            .unwrap()
            .push_back(Err(RemoteError::Transport {
                endpoint: "/emails/generate".into(),
                reason: "connection refused".into(),
            }));
    }

    pub fn queue_generate_rejection(&self, reason: &str) {
        self.generate_results
            .lock()
            .unwrap()
            .push_back(Ok(GenerateResponse {
                success: false,
                error: Some(reason.into()),
                ..Default::default()
            }));
    }

    pub fn queue_confirm_ok(&self) {
        self.confirm_results.lock().unwrap().push_back(Ok(()));
    }

    pub fn queue_confirm_failure(&self) {
        self.confirm_results
            .lock()
            .unwrap()
            .push_back(Err(RemoteError::Status {
                endpoint: "/emails/confirm-copy".into(),
                status: 500,
            }));
    }

    /// Script the authoritative states returned for a prospect.
    pub fn set_states(&self, prospect_id: &str, rows: &[(u8, SlotState, Option<&str>)]) {
        let rows = rows
            .iter()
            .map(|(slot_number, status, tracking)| SlotStatusRow {
                slot_number: *slot_number,
                status: *status,
                tracking_id: tracking.map(str::to_owned),
            })
            .collect();
        self.states
            .lock()
            .unwrap()
            .insert(prospect_id.to_string(), rows);
    }

    /// Make fetch-states fail for a prospect.
    pub fn fail_fetches_for(&self, prospect_id: &str) {
        self.failing_fetches
            .lock()
            .unwrap()
            .push(prospect_id.to_string());
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    pub fn generate_log(&self) -> Vec<GenerateRequest> {
        self.generate_log.lock().unwrap().clone()
    }

    /// Prospect ids fetched, in call order.
    pub fn fetch_log(&self) -> Vec<String> {
        self.fetch_log.lock().unwrap().clone()
    }

    pub fn fetches_for(&self, prospect_id: &str) -> usize {
        self.fetch_log
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == prospect_id)
            .count()
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, RemoteError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.generate_log.lock().unwrap().push(request.clone());
        self.generate_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RemoteError::Transport {
                    endpoint: "/emails/generate".into(),
                    reason: "no scripted response".into(),
                })
            })
    }

    async fn confirm_copy(&self, _request: &ConfirmCopyRequest) -> Result<(), RemoteError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        self.confirm_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RemoteError::Transport {
                    endpoint: "/emails/confirm-copy".into(),
                    reason: "no scripted response".into(),
                })
            })
    }

    async fn fetch_states(&self, prospect_id: &str) -> Result<Vec<SlotStatusRow>, RemoteError> {
        self.fetch_log.lock().unwrap().push(prospect_id.to_string());

        if self
            .failing_fetches
            .lock()
            .unwrap()
            .iter()
            .any(|p| p == prospect_id)
        {
            return Err(RemoteError::Status {
                endpoint: format!("/prospects/{prospect_id}/email-states"),
                status: 503,
            });
        }

        Ok(self
            .states
            .lock()
            .unwrap()
            .get(prospect_id)
            .cloned()
            .unwrap_or_else(|| {
                // Unscripted prospects look untouched server-side.
                (1..=5)
                    .map(|n| SlotStatusRow {
                        slot_number: n,
                        status: SlotState::Pending,
                        tracking_id: None,
                    })
                    .collect()
            }))
    }
}

/// The fully wired component stack under test.
pub struct Stack {
    pub store: Arc<SlotStore>,
    pub bus: Arc<EventBus>,
    pub remote: Arc<MockRemote>,
    pub scheduler: Arc<PollScheduler>,
    pub coordinator: Arc<GenerationCoordinator>,
    pub recorder: Arc<TrackingRecorder>,
    pub dispatcher: Arc<Dispatcher>,
}

pub fn stack(config: CoordinatorConfig) -> Stack {
    let store = SlotStore::new();
    let bus = EventBus::from_config(&config);
    let remote = MockRemote::new();
    let scheduler = PollScheduler::new(
        config.clone(),
        Arc::clone(&store),
        remote.clone() as Arc<dyn RemoteApi>,
        Arc::clone(&bus),
    );
    let coordinator = GenerationCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&bus),
        remote.clone() as Arc<dyn RemoteApi>,
        Arc::clone(&scheduler),
    );
    let recorder = TrackingRecorder::new(
        Arc::clone(&store),
        Arc::clone(&bus),
        remote.clone() as Arc<dyn RemoteApi>,
    );
    let dispatcher = Dispatcher::new(
        config,
        Arc::clone(&store),
        Arc::clone(&coordinator),
        Arc::clone(&scheduler),
    );

    Stack {
        store,
        bus,
        remote,
        scheduler,
        coordinator,
        recorder,
        dispatcher,
    }
}

/// Test config: enormous poll interval so cadence never fires on its
/// own; ticks are driven explicitly through `force_check`.
pub fn manual_tick_config() -> CoordinatorConfig {
    CoordinatorConfig {
        poll_interval: Duration::from_secs(3600),
        ..Default::default()
    }
}

/// Same, with debouncing disabled for tests that click in quick succession.
pub fn no_debounce_config() -> CoordinatorConfig {
    CoordinatorConfig {
        debounce_window: Duration::ZERO,
        ..manual_tick_config()
    }
}
