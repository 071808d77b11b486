// Combined result of one poll and the change notifications derived from it
use super::ems::EmsResponse;
use super::nodes::{NodeInfo, NodeMetrics};
use super::schedule::ScheduleData;
use super::status::{ErrorReportEntry, StatusResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A tier value together with the poll on which it was fetched.
///
/// Carrying a tier forward clones the `Arc`, so an unrefreshed value is
/// both pointer-equal to and has the same `fetched_at` as the one in the
/// previous snapshot.
#[derive(Debug, Serialize)]
pub struct Tiered<T> {
    pub data: Arc<T>,
    pub fetched_at: u64,
}

impl<T> Tiered<T> {
    pub fn new(data: T, fetched_at: u64) -> Self {
        Self {
            data: Arc::new(data),
            fetched_at,
        }
    }

    pub fn is_same(&self, other: &Tiered<T>) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn refreshed_on(&self, poll: u64) -> bool {
        self.fetched_at == poll
    }
}

impl<T> Clone for Tiered<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> std::ops::Deref for Tiered<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

pub type NodeMetricsMap = BTreeMap<u32, NodeMetrics>;

/// Immutable view of the device after a successful poll.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub poll_count: u64,
    pub telemetry: Arc<EmsResponse>,
    pub status: Option<Tiered<StatusResponse>>,
    pub error_report: Option<Tiered<Vec<ErrorReportEntry>>>,
    pub node_inventory: Option<Tiered<Vec<NodeInfo>>>,
    pub node_metrics: Option<Tiered<NodeMetricsMap>>,
    pub schedule: Option<Tiered<ScheduleData>>,
}

impl Snapshot {
    pub fn node_metrics_for(&self, node_id: u32) -> Option<&NodeMetrics> {
        self.node_metrics.as_ref()?.get(&node_id)
    }

    pub fn node_info_for(&self, node_id: u32) -> Option<&NodeInfo> {
        super::nodes::find_node(self.node_inventory.as_ref()?, node_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Alarm,
    Warning,
    Info,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Alarm, ChangeKind::Warning, ChangeKind::Info];

    /// Event name published to consumers.
    pub fn event_name(self) -> &'static str {
        match self {
            ChangeKind::Alarm => "homevolt_alarm",
            ChangeKind::Warning => "homevolt_warning",
            ChangeKind::Info => "homevolt_info",
        }
    }

    /// The aggregated flag list this kind tracks.
    pub fn select(self, telemetry: &EmsResponse) -> &[String] {
        let data = &telemetry.aggregated.ems_data;
        match self {
            ChangeKind::Alarm => &data.alarm_str,
            ChangeKind::Warning => &data.warning_str,
            ChangeKind::Info => &data.info_str,
        }
    }
}

/// Edge-triggered notification raised when a flag list differs from the
/// previous poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub poll_count: u64,
    pub previous: Vec<String>,
    pub current: Vec<String>,
}

/// Compare the watched flag lists of two telemetry documents.
pub fn detect_changes(previous: &EmsResponse, current: &EmsResponse, poll_count: u64) -> Vec<ChangeEvent> {
    ChangeKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let before = kind.select(previous);
            let after = kind.select(current);
            (before != after).then(|| ChangeEvent {
                kind,
                poll_count,
                previous: before.to_vec(),
                current: after.to_vec(),
            })
        })
        .collect()
}
