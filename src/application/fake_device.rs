// In-memory HomevoltApi serving the recorded fixtures
use crate::application::device_api::{
    ApiError, HomevoltApi, ENDPOINT_EMS, ENDPOINT_ERROR_REPORT, ENDPOINT_NODES,
    ENDPOINT_NODE_METRICS, ENDPOINT_SCHEDULE, ENDPOINT_STATUS,
};
use crate::domain::decode::{decode_list, Decode};
use crate::domain::ems::EmsResponse;
use crate::domain::fixtures;
use crate::domain::nodes::{NodeInfo, NodeMetrics};
use crate::domain::schedule::ScheduleData;
use crate::domain::status::{ErrorReportEntry, StatusResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct FakeDevice {
    ems: Mutex<EmsResponse>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    node_failures: Mutex<HashMap<u32, ApiError>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            ems: Mutex::new(EmsResponse::decode(fixtures::ems())),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            node_failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make every call to `endpoint` fail with `err` until cleared.
    pub fn fail(&self, endpoint: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(endpoint, err);
    }

    pub fn clear_failure(&self, endpoint: &'static str) {
        self.failures.lock().unwrap().remove(endpoint);
    }

    pub fn fail_node(&self, node_id: u32, err: ApiError) {
        self.node_failures.lock().unwrap().insert(node_id, err);
    }

    pub fn update_ems(&self, f: impl FnOnce(&mut EmsResponse)) {
        f(&mut self.ems.lock().unwrap());
    }

    fn record(&self, endpoint: &'static str) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(endpoint).or_insert(0) += 1;
        match self.failures.lock().unwrap().get(endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HomevoltApi for FakeDevice {
    async fn ems_data(&self) -> Result<EmsResponse, ApiError> {
        self.record(ENDPOINT_EMS)?;
        Ok(self.ems.lock().unwrap().clone())
    }

    async fn status(&self) -> Result<StatusResponse, ApiError> {
        self.record(ENDPOINT_STATUS)?;
        Ok(StatusResponse::decode(fixtures::status()))
    }

    async fn error_report(&self) -> Result<Vec<ErrorReportEntry>, ApiError> {
        self.record(ENDPOINT_ERROR_REPORT)?;
        Ok(decode_list(fixtures::error_report()))
    }

    async fn nodes(&self) -> Result<Vec<NodeInfo>, ApiError> {
        self.record(ENDPOINT_NODES)?;
        Ok(decode_list(fixtures::nodes()))
    }

    async fn node_metrics(&self, node_id: u32) -> Result<NodeMetrics, ApiError> {
        self.record(ENDPOINT_NODE_METRICS)?;
        if let Some(err) = self.node_failures.lock().unwrap().get(&node_id) {
            return Err(err.clone());
        }
        Ok(NodeMetrics::decode(fixtures::node_metrics(node_id)))
    }

    async fn schedule(&self) -> Result<ScheduleData, ApiError> {
        self.record(ENDPOINT_SCHEDULE)?;
        Ok(ScheduleData::decode(fixtures::schedule()))
    }
}
