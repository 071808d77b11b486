// HTTP request handlers
use crate::domain::redact::redact;
use crate::domain::summary::Summary;
use crate::infrastructure::ndjson_stream::stream_from_broadcast;
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

const NO_SNAPSHOT: &str = "no data received from the device yet";

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health.borrow().clone();
    let status = if health.is_online() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, health.to_string())
}

/// Latest snapshot as published by the coordinator
pub async fn latest_snapshot(State(state): State<Arc<AppState>>) -> Response {
    match state.coordinator.get_latest_snapshot() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, NO_SNAPSHOT).into_response(),
    }
}

pub async fn summary(State(state): State<Arc<AppState>>) -> Response {
    match state.coordinator.get_latest_snapshot() {
        Some(snapshot) => {
            let now = chrono::Utc::now().timestamp();
            Json(Summary::from_snapshot(&snapshot, now)).into_response()
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, NO_SNAPSHOT).into_response(),
    }
}

/// Snapshot, health and device settings with credentials and identifying
/// details masked. Served even before the first successful poll.
pub async fn diagnostics(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.coordinator.get_latest_snapshot();
    let health = state.health.borrow().clone();

    let mut doc = json!({
        "health": health,
        "config": { "device": &state.device },
        "snapshot": snapshot,
    });
    redact(&mut doc);

    Json(doc).into_response()
}

/// Stream alarm/warning/info change notifications as they happen
pub async fn stream_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut shutdown = state.shutdown.clone();
    stream_from_broadcast(state.coordinator.subscribe_events(), async move {
        // a dropped sender also means shutdown
        let _ = shutdown.wait_for(|stopping| *stopping).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::coordinator::Coordinator;
    use crate::application::fake_device::FakeDevice;
    use crate::application::poller::DeviceHealth;
    use crate::domain::redact::REDACTED;
    use crate::infrastructure::config::DeviceSettings;
    use serde_json::Value;
    use tokio::sync::watch;

    fn device_settings() -> DeviceSettings {
        DeviceSettings {
            host: "192.168.70.12".to_string(),
            port: 80,
            password: Some("secret".to_string()),
            use_ssl: false,
            connect_timeout_secs: 5,
            read_timeout_secs: 20,
        }
    }

    /// State backed by a fake device, optionally after one successful poll.
    async fn state(polled: bool, health: DeviceHealth) -> (Arc<AppState>, watch::Sender<DeviceHealth>) {
        let mut coordinator = Coordinator::new(Arc::new(FakeDevice::new()));
        if polled {
            coordinator.tick().await.unwrap();
        }
        let (health_tx, health_rx) = watch::channel(health);
        let (_, shutdown) = watch::channel(false);
        let state = Arc::new(AppState {
            coordinator: coordinator.handle(),
            health: health_rx,
            device: device_settings(),
            shutdown,
        });
        (state, health_tx)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_status() {
        let (state, health_tx) = state(false, DeviceHealth::Starting).await;

        let response = health_check(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        health_tx.send_replace(DeviceHealth::Online);
        let response = health_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"online");
    }

    #[tokio::test]
    async fn test_snapshot_unavailable_before_first_poll() {
        let (state, _health) = state(false, DeviceHealth::Starting).await;

        assert_eq!(latest_snapshot(State(state.clone())).await.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(summary(State(state)).await.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_snapshot_json() {
        let (state, _health) = state(true, DeviceHealth::Online).await;

        let response = latest_snapshot(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["poll_count"], 1);
        assert_eq!(body["telemetry"]["$type"], "ems_data");
        assert_eq!(body["status"]["fetched_at"], 1);
        assert_eq!(body["node_metrics"]["data"]["2"]["battery_voltage"], 2.73);
    }

    #[tokio::test]
    async fn test_summary_json() {
        let (state, _health) = state(true, DeviceHealth::Online).await;

        let body = json_body(summary(State(state)).await).await;

        assert_eq!(body["battery"]["soc_percent"], 8.15);
        assert_eq!(body["grid"]["frequency_hz"], 49.969);
        assert_eq!(body["ct_nodes"].as_array().unwrap().len(), 2);
        assert_eq!(body["schedule"]["entry_count"], 6);
    }

    #[tokio::test]
    async fn test_diagnostics_redacts_sensitive_keys() {
        let (state, _health) = state(true, DeviceHealth::Online).await;

        let body = json_body(diagnostics(State(state)).await).await;

        assert_eq!(body["health"]["state"], "online");
        assert_eq!(body["config"]["device"]["password"], REDACTED);
        assert_eq!(body["config"]["device"]["host"], "192.168.70.12");
        assert_eq!(body["snapshot"]["status"]["data"]["wifi_status"]["ssid"], REDACTED);
        assert_eq!(body["snapshot"]["status"]["data"]["wifi_status"]["ip"], REDACTED);
        assert_eq!(
            body["snapshot"]["telemetry"]["ems"][0]["bms_info"][0]["serial_number"],
            REDACTED
        );
    }

    #[tokio::test]
    async fn test_event_stream_until_shutdown() {
        let device = Arc::new(FakeDevice::new());
        let mut coordinator = Coordinator::new(device.clone());
        coordinator.tick().await.unwrap();
        let (_health_tx, health) = watch::channel(DeviceHealth::Online);
        let (shutdown_tx, shutdown) = watch::channel(false);
        let state = Arc::new(AppState {
            coordinator: coordinator.handle(),
            health,
            device: device_settings(),
            shutdown,
        });

        let response = stream_events(State(state)).await.into_response();
        device.update_ems(|ems| {
            ems.aggregated.ems_data.alarm_str = vec!["BMS_OVER_VOLTAGE".to_string()];
        });
        coordinator.tick().await.unwrap();
        shutdown_tx.send_replace(true);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["kind"], "alarm");
        assert_eq!(lines[0]["current"][0], "BMS_OVER_VOLTAGE");
        assert_eq!(lines[0]["poll_count"], 2);
    }

    #[tokio::test]
    async fn test_diagnostics_before_first_poll() {
        let (state, _health) = state(false, DeviceHealth::Starting).await;

        let body = json_body(diagnostics(State(state)).await).await;

        assert!(body["snapshot"].is_null());
        assert_eq!(body["health"]["state"], "starting");
    }
}
