// Tiered polling coordinator - merges independently aged feeds into snapshots
use crate::application::device_api::{ApiError, HomevoltApi};
use crate::domain::ems::EmsResponse;
use crate::domain::snapshot::{detect_changes, ChangeEvent, NodeMetricsMap, Snapshot, Tiered};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

pub const STATUS_POLL_INTERVAL: u64 = 10;
pub const ERROR_REPORT_POLL_INTERVAL: u64 = 4;
pub const NODES_POLL_INTERVAL: u64 = 10;
pub const SCHEDULE_POLL_INTERVAL: u64 = 10;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Status,
    ErrorReport,
    /// Node inventory plus per-node metrics
    Nodes,
    Schedule,
}

/// What a failed fetch does to the rest of the tick. Authentication
/// failures always abort, whatever the tier says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    AbortTick,
    KeepPrevious,
}

#[derive(Debug, Clone, Copy)]
pub struct TierSpec {
    pub tier: Tier,
    pub name: &'static str,
    pub period: u64,
    pub on_failure: OnFailure,
}

impl TierSpec {
    /// Fetch when nothing has been published yet, then on every multiple of
    /// the period.
    pub fn is_due(&self, poll_count: u64, has_previous: bool) -> bool {
        !has_previous || poll_count % self.period == 0
    }
}

/// Slow tiers, in fetch order. Telemetry is fetched before these on every
/// tick.
pub const TIERS: [TierSpec; 4] = [
    TierSpec {
        tier: Tier::Status,
        name: "status",
        period: STATUS_POLL_INTERVAL,
        on_failure: OnFailure::AbortTick,
    },
    TierSpec {
        tier: Tier::ErrorReport,
        name: "error_report",
        period: ERROR_REPORT_POLL_INTERVAL,
        on_failure: OnFailure::AbortTick,
    },
    TierSpec {
        tier: Tier::Nodes,
        name: "nodes",
        period: NODES_POLL_INTERVAL,
        on_failure: OnFailure::AbortTick,
    },
    TierSpec {
        tier: Tier::Schedule,
        name: "schedule",
        period: SCHEDULE_POLL_INTERVAL,
        on_failure: OnFailure::KeepPrevious,
    },
];

#[derive(Debug, Error)]
pub enum PollError {
    /// Credentials were rejected. Polling should stop until reconfigured.
    #[error("Invalid credentials")]
    AuthFailed(#[source] ApiError),

    /// The device could not be reached or answered badly; try again next
    /// interval.
    #[error("Error communicating with Homevolt: {0}")]
    UpdateFailed(#[source] ApiError),
}

impl From<ApiError> for PollError {
    fn from(err: ApiError) -> Self {
        if err.is_auth() {
            PollError::AuthFailed(err)
        } else {
            PollError::UpdateFailed(err)
        }
    }
}

/// Read side of a coordinator, cheap to clone and safe to hand to any
/// number of consumers.
#[derive(Clone)]
pub struct CoordinatorHandle {
    snapshots: watch::Receiver<Option<Arc<Snapshot>>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl CoordinatorHandle {
    pub fn get_latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}

/// Polls one device. Ticks take `&mut self`, so two ticks can never overlap.
pub struct Coordinator {
    api: Arc<dyn HomevoltApi>,
    poll_count: u64,
    previous: Option<Arc<Snapshot>>,
    latest: watch::Sender<Option<Arc<Snapshot>>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Coordinator {
    pub fn new(api: Arc<dyn HomevoltApi>) -> Self {
        let (latest, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            poll_count: 0,
            previous: None,
            latest,
            events,
        }
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            snapshots: self.latest.subscribe(),
            events: self.events.clone(),
        }
    }

    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    /// Run one poll. On error the previously published snapshot stays in
    /// place; only the poll counter moves.
    pub async fn tick(&mut self) -> Result<Arc<Snapshot>, PollError> {
        self.poll_count += 1;
        let poll = self.poll_count;

        let result = self.build_snapshot(poll).await;
        let next = match result {
            Ok(next) => next,
            Err(e) => {
                let err = PollError::from(e);
                error!(poll, error = %err, "poll failed");
                return Err(err);
            }
        };

        let events = self
            .previous
            .as_ref()
            .map(|previous| detect_changes(&previous.telemetry, &next.telemetry, poll))
            .unwrap_or_default();

        // The snapshot is visible before any of its events go out.
        let snapshot = Arc::new(next);
        self.previous = Some(Arc::clone(&snapshot));
        self.latest.send_replace(Some(Arc::clone(&snapshot)));
        debug!(poll, "snapshot published");

        for event in events {
            info!(
                event = event.kind.event_name(),
                previous = ?event.previous,
                current = ?event.current,
                "flag list changed"
            );
            // nobody listening is fine
            let _ = self.events.send(event);
        }
        Ok(snapshot)
    }

    async fn build_snapshot(&self, poll: u64) -> Result<Snapshot, ApiError> {
        let telemetry = self.api.ems_data().await?;
        let previous = self.previous.as_deref();

        // Start from the carried values; due tiers overwrite their slot.
        let mut next = Snapshot {
            poll_count: poll,
            telemetry: Arc::new(telemetry),
            status: previous.and_then(|p| p.status.clone()),
            error_report: previous.and_then(|p| p.error_report.clone()),
            node_inventory: previous.and_then(|p| p.node_inventory.clone()),
            node_metrics: previous.and_then(|p| p.node_metrics.clone()),
            schedule: previous.and_then(|p| p.schedule.clone()),
        };

        for spec in &TIERS {
            if !spec.is_due(poll, previous.is_some()) {
                continue;
            }
            debug!(poll, tier = spec.name, "refreshing tier");
            match self.refresh(spec.tier, poll, &mut next).await {
                Ok(()) => {}
                Err(e) if e.is_auth() || spec.on_failure == OnFailure::AbortTick => return Err(e),
                Err(e) => {
                    warn!(poll, tier = spec.name, error = %e, "fetch failed, keeping previous value");
                }
            }
        }

        Ok(next)
    }

    async fn refresh(&self, tier: Tier, poll: u64, next: &mut Snapshot) -> Result<(), ApiError> {
        match tier {
            Tier::Status => {
                next.status = Some(Tiered::new(self.api.status().await?, poll));
            }
            Tier::ErrorReport => {
                next.error_report = Some(Tiered::new(self.api.error_report().await?, poll));
            }
            Tier::Nodes => {
                let inventory = self.api.nodes().await?;
                let metrics = self.collect_node_metrics(&next.telemetry).await?;
                next.node_inventory = Some(Tiered::new(inventory, poll));
                next.node_metrics = Some(Tiered::new(metrics, poll));
            }
            Tier::Schedule => {
                next.schedule = Some(Tiered::new(self.api.schedule().await?, poll));
            }
        }
        Ok(())
    }

    /// Metrics for every configured CT clamp. A node that cannot be read is
    /// left out; only a credentials failure stops the collection.
    async fn collect_node_metrics(&self, telemetry: &EmsResponse) -> Result<NodeMetricsMap, ApiError> {
        let mut metrics = NodeMetricsMap::new();
        for node_id in telemetry.metrics_node_ids() {
            match self.api.node_metrics(node_id).await {
                Ok(m) => {
                    metrics.insert(node_id, m);
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => warn!(node_id, error = %e, "failed to fetch node_metrics"),
            }
        }
        Ok(metrics)
    }
}
