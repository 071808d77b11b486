// Port to the Homevolt local HTTP API
use crate::domain::ems::EmsResponse;
use crate::domain::nodes::{NodeInfo, NodeMetrics};
use crate::domain::schedule::ScheduleData;
use crate::domain::status::{ErrorReportEntry, StatusResponse};
use async_trait::async_trait;
use thiserror::Error;

pub const ENDPOINT_EMS: &str = "/ems.json";
pub const ENDPOINT_STATUS: &str = "/status.json";
pub const ENDPOINT_ERROR_REPORT: &str = "/error_report.json";
pub const ENDPOINT_NODES: &str = "/nodes.json";
pub const ENDPOINT_NODE_METRICS: &str = "/node_metrics.json";
pub const ENDPOINT_SCHEDULE: &str = "/schedule.json";

/// Failure of a single API call, after any retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Invalid credentials")]
    Auth,

    #[error("Connection error to {host}: {message}")]
    Connection { host: String, message: String },

    /// 502/503/504 on every attempt.
    #[error("Server error {status} from {endpoint}")]
    ServerBusy { endpoint: String, status: u16 },

    #[error("Unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Invalid JSON from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth)
    }

    /// Whether another attempt of the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Connection { .. } | ApiError::ServerBusy { .. })
    }
}

#[async_trait]
pub trait HomevoltApi: Send + Sync {
    /// Primary telemetry, polled on every tick
    async fn ems_data(&self) -> Result<EmsResponse, ApiError>;

    async fn status(&self) -> Result<StatusResponse, ApiError>;

    async fn error_report(&self) -> Result<Vec<ErrorReportEntry>, ApiError>;

    /// Inventory of paired CT clamp nodes
    async fn nodes(&self) -> Result<Vec<NodeInfo>, ApiError>;

    /// Battery, temperature and uptime of a single CT clamp node
    async fn node_metrics(&self, node_id: u32) -> Result<NodeMetrics, ApiError>;

    async fn schedule(&self) -> Result<ScheduleData, ApiError>;

    /// Check that the device is reachable and accepts our credentials.
    async fn validate_connection(&self) -> Result<EmsResponse, ApiError> {
        self.ems_data().await
    }
}
