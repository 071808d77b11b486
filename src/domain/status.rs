// System status (/status.json) and error report (/error_report.json)
use super::decode::{lenient, Decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiStatus {
    #[serde(deserialize_with = "lenient")]
    pub wifi_mode: String,
    #[serde(deserialize_with = "lenient")]
    pub ip: String,
    #[serde(deserialize_with = "lenient")]
    pub ssid: String,
    #[serde(deserialize_with = "lenient")]
    pub rssi: i64,
    #[serde(deserialize_with = "lenient")]
    pub connected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttStatus {
    #[serde(deserialize_with = "lenient")]
    pub connected: bool,
    #[serde(deserialize_with = "lenient")]
    pub subscribed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LteStatus {
    #[serde(deserialize_with = "lenient")]
    pub operator_name: String,
    #[serde(deserialize_with = "lenient")]
    pub band: String,
    #[serde(deserialize_with = "lenient")]
    pub rssi_db: i64,
    #[serde(deserialize_with = "lenient")]
    pub pdp_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareInfo {
    #[serde(deserialize_with = "lenient")]
    pub esp: String,
    #[serde(deserialize_with = "lenient")]
    pub efr: String,
}

/// Connectivity and firmware details of the EMS controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
    /// seconds
    #[serde(deserialize_with = "lenient")]
    pub up_time: i64,
    #[serde(deserialize_with = "lenient")]
    pub firmware: FirmwareInfo,
    #[serde(deserialize_with = "lenient")]
    pub wifi_status: WifiStatus,
    #[serde(deserialize_with = "lenient")]
    pub mqtt_status: MqttStatus,
    #[serde(deserialize_with = "lenient")]
    pub lte_status: LteStatus,
}

impl Decode for StatusResponse {}

/// One subsystem health line. `activated` is one of "ok", "warning",
/// "error" or "unknown".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorReportEntry {
    #[serde(deserialize_with = "lenient")]
    pub sub_system_id: i64,
    #[serde(deserialize_with = "lenient")]
    pub sub_system_name: String,
    #[serde(deserialize_with = "lenient")]
    pub error_id: i64,
    #[serde(deserialize_with = "lenient")]
    pub error_name: String,
    #[serde(deserialize_with = "lenient")]
    pub activated: String,
    #[serde(deserialize_with = "lenient")]
    pub message: String,
    #[serde(deserialize_with = "lenient")]
    pub details: Vec<String>,
}

impl Decode for ErrorReportEntry {}

/// Subsystem state, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl ErrorReportEntry {
    /// `None` for "unknown" and any state the device adds later.
    pub fn severity(&self) -> Option<Severity> {
        match self.activated.as_str() {
            "ok" => Some(Severity::Ok),
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}
