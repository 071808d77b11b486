// reqwest implementation of the Homevolt local API
use crate::application::device_api::{
    ApiError, HomevoltApi, ENDPOINT_EMS, ENDPOINT_ERROR_REPORT, ENDPOINT_NODES,
    ENDPOINT_NODE_METRICS, ENDPOINT_SCHEDULE, ENDPOINT_STATUS,
};
use crate::domain::decode::{decode_list, Decode};
use crate::domain::ems::EmsResponse;
use crate::domain::nodes::{NodeInfo, NodeMetrics};
use crate::domain::schedule::ScheduleData;
use crate::domain::status::{ErrorReportEntry, StatusResponse};
use crate::infrastructure::config::DeviceSettings;
use crate::infrastructure::retry::{with_retry, RetryPolicy, Sleeper, TokioSleeper, RETRY_STATUS_CODES};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;

/// The device only knows one account.
const USERNAME: &str = "admin";

#[derive(Clone)]
pub struct HomevoltClient {
    client: reqwest::Client,
    host: String,
    base_url: String,
    password: Option<String>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl HomevoltClient {
    pub fn new(settings: &DeviceSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.read_timeout())
            .build()?;

        Ok(Self {
            client,
            host: settings.host.clone(),
            base_url: settings.base_url(),
            // an empty password means no auth, same as none
            password: settings.password.clone().filter(|p| !p.is_empty()),
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    #[cfg(test)]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, endpoint: &str, node_id: Option<u32>) -> Result<Value, ApiError> {
        let client = self;
        with_retry(&self.retry, self.sleeper.as_ref(), endpoint, move || {
            client.get_once(endpoint, node_id)
        })
        .await
    }

    async fn get_once(&self, endpoint: &str, node_id: Option<u32>) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.client.get(&url);
        if let Some(node_id) = node_id {
            request = request.query(&[("node_id", node_id)]);
        }
        if let Some(password) = &self.password {
            request = request.basic_auth(USERNAME, Some(password));
        }

        let response = request.send().await.map_err(|e| self.connection_error(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Auth);
        }
        if RETRY_STATUS_CODES.contains(&status.as_u16()) {
            return Err(ApiError::ServerBusy {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.connection_error(&e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    fn connection_error(&self, err: &reqwest::Error) -> ApiError {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        ApiError::Connection {
            host: self.host.clone(),
            message,
        }
    }
}

#[async_trait]
impl HomevoltApi for HomevoltClient {
    async fn ems_data(&self) -> Result<EmsResponse, ApiError> {
        Ok(EmsResponse::decode(self.get_json(ENDPOINT_EMS, None).await?))
    }

    async fn status(&self) -> Result<StatusResponse, ApiError> {
        Ok(StatusResponse::decode(self.get_json(ENDPOINT_STATUS, None).await?))
    }

    async fn error_report(&self) -> Result<Vec<ErrorReportEntry>, ApiError> {
        Ok(decode_list(self.get_json(ENDPOINT_ERROR_REPORT, None).await?))
    }

    async fn nodes(&self) -> Result<Vec<NodeInfo>, ApiError> {
        Ok(decode_list(self.get_json(ENDPOINT_NODES, None).await?))
    }

    async fn node_metrics(&self, node_id: u32) -> Result<NodeMetrics, ApiError> {
        Ok(NodeMetrics::decode(self.get_json(ENDPOINT_NODE_METRICS, Some(node_id)).await?))
    }

    async fn schedule(&self) -> Result<ScheduleData, ApiError> {
        Ok(ScheduleData::decode(self.get_json(ENDPOINT_SCHEDULE, None).await?))
    }
}
