// EMS telemetry records decoded from /ems.json
//
// Scaled integers are kept as the device reports them: voltages in
// decivolts, currents in deciamps, frequency in millihertz (49969 = 49.969 Hz),
// state of charge in hundredths of a percent and temperatures in decicelsius.
use super::decode::{lenient, lenient_list, Decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsInfo {
    #[serde(deserialize_with = "lenient")]
    pub protocol_version: i64,
    #[serde(deserialize_with = "lenient")]
    pub fw_version: String,
    /// Wh
    #[serde(deserialize_with = "lenient")]
    pub rated_capacity: i64,
    /// W
    #[serde(deserialize_with = "lenient")]
    pub rated_power: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BmsInfo {
    #[serde(deserialize_with = "lenient")]
    pub fw_version: String,
    #[serde(deserialize_with = "lenient")]
    pub serial_number: String,
    /// Wh
    #[serde(deserialize_with = "lenient")]
    pub rated_cap: i64,
    #[serde(deserialize_with = "lenient")]
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvInfo {
    #[serde(deserialize_with = "lenient")]
    pub fw_version: String,
    #[serde(deserialize_with = "lenient")]
    pub serial_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsConfig {
    #[serde(deserialize_with = "lenient")]
    pub grid_code_preset: i64,
    #[serde(deserialize_with = "lenient")]
    pub grid_code_preset_str: String,
    #[serde(deserialize_with = "lenient")]
    pub control_timeout: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsControl {
    #[serde(deserialize_with = "lenient")]
    pub mode_sel: i64,
    #[serde(deserialize_with = "lenient")]
    pub mode_sel_str: String,
    #[serde(deserialize_with = "lenient")]
    pub pwr_ref: i64,
}

/// Real-time EMS state, including the alarm/warning/info flag lists the
/// coordinator watches for changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsData {
    #[serde(deserialize_with = "lenient")]
    pub timestamp_ms: i64,
    #[serde(deserialize_with = "lenient")]
    pub state: i64,
    #[serde(deserialize_with = "lenient")]
    pub state_str: String,
    #[serde(deserialize_with = "lenient")]
    pub info: i64,
    #[serde(deserialize_with = "lenient")]
    pub info_str: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub warning: i64,
    #[serde(deserialize_with = "lenient")]
    pub warning_str: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub alarm: i64,
    #[serde(deserialize_with = "lenient")]
    pub alarm_str: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub phase_angle: i64,
    /// mHz
    #[serde(deserialize_with = "lenient")]
    pub frequency: i64,
    #[serde(deserialize_with = "lenient")]
    pub phase_seq: i64,
    /// W, positive while discharging
    #[serde(deserialize_with = "lenient")]
    pub power: i64,
    #[serde(deserialize_with = "lenient")]
    pub apparent_power: i64,
    #[serde(deserialize_with = "lenient")]
    pub reactive_power: i64,
    /// Wh
    #[serde(deserialize_with = "lenient")]
    pub energy_produced: i64,
    /// Wh
    #[serde(deserialize_with = "lenient")]
    pub energy_consumed: i64,
    /// decicelsius
    #[serde(deserialize_with = "lenient")]
    pub sys_temp: i64,
    /// Wh
    #[serde(deserialize_with = "lenient")]
    pub avail_cap: i64,
    #[serde(deserialize_with = "lenient")]
    pub freq_res_state: i64,
    /// hundredths of a percent
    #[serde(deserialize_with = "lenient")]
    pub soc_avg: i64,
}

/// Per battery module state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BmsData {
    #[serde(deserialize_with = "lenient")]
    pub energy_avail: i64,
    #[serde(deserialize_with = "lenient")]
    pub cycle_count: i64,
    #[serde(deserialize_with = "lenient")]
    pub soc: i64,
    #[serde(deserialize_with = "lenient")]
    pub state: i64,
    #[serde(deserialize_with = "lenient")]
    pub state_str: String,
    #[serde(deserialize_with = "lenient")]
    pub alarm: i64,
    #[serde(deserialize_with = "lenient")]
    pub alarm_str: Vec<String>,
    /// decicelsius
    #[serde(deserialize_with = "lenient")]
    pub tmin: i64,
    /// decicelsius
    #[serde(deserialize_with = "lenient")]
    pub tmax: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsPrediction {
    #[serde(deserialize_with = "lenient")]
    pub avail_ch_pwr: i64,
    #[serde(deserialize_with = "lenient")]
    pub avail_di_pwr: i64,
    #[serde(deserialize_with = "lenient")]
    pub avail_ch_energy: i64,
    #[serde(deserialize_with = "lenient")]
    pub avail_di_energy: i64,
    #[serde(deserialize_with = "lenient")]
    pub avail_inv_ch_pwr: i64,
    #[serde(deserialize_with = "lenient")]
    pub avail_inv_di_pwr: i64,
    #[serde(deserialize_with = "lenient")]
    pub avail_group_fuse_ch_pwr: i64,
    #[serde(deserialize_with = "lenient")]
    pub avail_group_fuse_di_pwr: i64,
}

/// Phase and line-to-line voltages in decivolts (2303 = 230.3 V).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsVoltage {
    #[serde(deserialize_with = "lenient")]
    pub l1: i64,
    #[serde(deserialize_with = "lenient")]
    pub l2: i64,
    #[serde(deserialize_with = "lenient")]
    pub l3: i64,
    #[serde(deserialize_with = "lenient")]
    pub l1_l2: i64,
    #[serde(deserialize_with = "lenient")]
    pub l2_l3: i64,
    #[serde(deserialize_with = "lenient")]
    pub l3_l1: i64,
}

/// Phase currents in deciamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsCurrent {
    #[serde(deserialize_with = "lenient")]
    pub l1: i64,
    #[serde(deserialize_with = "lenient")]
    pub l2: i64,
    #[serde(deserialize_with = "lenient")]
    pub l3: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsAggregate {
    #[serde(deserialize_with = "lenient")]
    pub imported_kwh: f64,
    #[serde(deserialize_with = "lenient")]
    pub exported_kwh: f64,
}

/// One EMS unit (inverter plus battery modules). The `aggregated` entry of
/// the response uses the same layout with `ecu_id` 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsDevice {
    #[serde(deserialize_with = "lenient")]
    pub ecu_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub ecu_host: String,
    #[serde(deserialize_with = "lenient")]
    pub ecu_version: String,
    #[serde(deserialize_with = "lenient")]
    pub error: i64,
    #[serde(deserialize_with = "lenient")]
    pub error_str: String,
    #[serde(deserialize_with = "lenient")]
    pub op_state: i64,
    #[serde(deserialize_with = "lenient")]
    pub op_state_str: String,
    #[serde(deserialize_with = "lenient")]
    pub ems_info: EmsInfo,
    #[serde(deserialize_with = "lenient_list")]
    pub bms_info: Vec<BmsInfo>,
    #[serde(deserialize_with = "lenient")]
    pub inv_info: InvInfo,
    #[serde(deserialize_with = "lenient")]
    pub ems_config: EmsConfig,
    #[serde(deserialize_with = "lenient")]
    pub ems_control: EmsControl,
    #[serde(deserialize_with = "lenient")]
    pub ems_data: EmsData,
    #[serde(deserialize_with = "lenient_list")]
    pub bms_data: Vec<BmsData>,
    #[serde(deserialize_with = "lenient")]
    pub ems_prediction: EmsPrediction,
    #[serde(deserialize_with = "lenient")]
    pub ems_voltage: EmsVoltage,
    #[serde(deserialize_with = "lenient")]
    pub ems_current: EmsCurrent,
    #[serde(deserialize_with = "lenient")]
    pub ems_aggregate: EmsAggregate,
    #[serde(deserialize_with = "lenient")]
    pub error_cnt: i64,
}

/// Per-phase CT clamp measurement, already in physical units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseData {
    #[serde(deserialize_with = "lenient")]
    pub voltage: f64,
    #[serde(deserialize_with = "lenient")]
    pub amp: f64,
    #[serde(deserialize_with = "lenient")]
    pub power: f64,
    #[serde(deserialize_with = "lenient")]
    pub pf: f64,
}

/// CT clamp reading (grid, solar or load) as reported by the EMS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorData {
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: String,
    #[serde(deserialize_with = "lenient")]
    pub node_id: u32,
    #[serde(deserialize_with = "lenient")]
    pub euid: String,
    #[serde(deserialize_with = "lenient")]
    pub interface: i64,
    #[serde(deserialize_with = "lenient")]
    pub available: bool,
    #[serde(deserialize_with = "lenient")]
    pub rssi: f64,
    #[serde(deserialize_with = "lenient")]
    pub average_rssi: f64,
    /// packet delivery rate, percent
    #[serde(deserialize_with = "lenient")]
    pub pdr: f64,
    #[serde(deserialize_with = "lenient_list")]
    pub phase: Vec<PhaseData>,
    #[serde(deserialize_with = "lenient")]
    pub frequency: f64,
    #[serde(deserialize_with = "lenient")]
    pub total_power: i64,
    /// kWh
    #[serde(deserialize_with = "lenient")]
    pub energy_imported: f64,
    /// kWh
    #[serde(deserialize_with = "lenient")]
    pub energy_exported: f64,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: i64,
    #[serde(deserialize_with = "lenient")]
    pub timestamp_str: String,
}

impl SensorData {
    /// A clamp slot counts as configured once it carries a real EUI. Empty
    /// slots report all zeros.
    pub fn is_configured(&self) -> bool {
        !self.euid.is_empty() && !self.euid.chars().all(|c| c == '0')
    }

    /// Node whose metrics should be polled for this clamp, if any.
    pub fn metrics_node_id(&self) -> Option<u32> {
        (self.is_configured() && self.node_id != 0).then_some(self.node_id)
    }
}

/// Top-level /ems.json document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsResponse {
    #[serde(rename = "$type", deserialize_with = "lenient")]
    pub kind: String,
    #[serde(deserialize_with = "lenient")]
    pub ts: i64,
    #[serde(deserialize_with = "lenient_list")]
    pub ems: Vec<EmsDevice>,
    #[serde(deserialize_with = "lenient")]
    pub aggregated: EmsDevice,
    #[serde(deserialize_with = "lenient_list")]
    pub sensors: Vec<SensorData>,
}

impl Decode for EmsResponse {}

impl EmsResponse {
    /// Node ids of configured CT clamps, in sensor order, without repeats.
    pub fn metrics_node_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = Vec::new();
        for id in self.sensors.iter().filter_map(SensorData::metrics_node_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}
