// Human-facing read model derived from a snapshot, in physical units
use super::ems::{BmsData, EmsDevice, PhaseData, SensorData};
use super::nodes::battery_level;
use super::snapshot::Snapshot;
use super::status::{ErrorReportEntry, Severity};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub poll_count: u64,
    /// Device clock, unix seconds
    pub timestamp: i64,
    pub battery: BatterySummary,
    pub grid: GridSummary,
    pub alarms: Vec<String>,
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
    /// Absent until a non-empty error report has been fetched
    pub error_report: Option<ErrorReportSummary>,
    pub uptime_secs: Option<i64>,
    pub ct_nodes: Vec<CtNodeSummary>,
    pub schedule: Option<ScheduleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatterySummary {
    pub status: String,
    pub state: String,
    pub soc_percent: f64,
    pub power_w: i64,
    pub temperature_c: f64,
    pub rated_capacity_wh: i64,
    pub available_charge_power_w: i64,
    pub available_discharge_power_w: i64,
    pub modules: Vec<ModuleSummary>,
}

/// One battery module of the aggregated unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSummary {
    pub index: usize,
    pub state: String,
    pub soc_percent: f64,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
    pub cycle_count: i64,
    pub energy_available_wh: i64,
    pub alarms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    pub frequency_hz: f64,
    pub voltage_v: [f64; 3],
    pub line_voltage_v: [f64; 3],
    pub current_a: [f64; 3],
    pub imported_kwh: f64,
    pub exported_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CtNodeSummary {
    pub node_id: u32,
    pub kind: String,
    pub available: bool,
    pub power_w: i64,
    pub battery_level: Option<f64>,
    pub temperature_c: Option<f64>,
    pub firmware_update_available: Option<bool>,
    pub phases: Vec<PhaseSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub voltage_v: f64,
    pub current_a: f64,
    pub power_w: f64,
    pub power_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReportSummary {
    /// Worst known state; subsystems in an unknown state are not counted.
    pub status: Severity,
    pub ok_count: usize,
    pub warning_count: usize,
    pub error_count: usize,
    pub warnings: Vec<ReportLine>,
    pub errors: Vec<ReportLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub subsystem: String,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSummary {
    pub local_mode: bool,
    pub entry_count: usize,
    pub current_action: Option<String>,
    pub next_action: Option<String>,
}

fn deci(value: i64) -> f64 {
    value as f64 / 10.0
}

impl BatterySummary {
    fn from_device(agg: &EmsDevice) -> Self {
        Self {
            status: agg.op_state_str.clone(),
            state: agg.ems_data.state_str.clone(),
            soc_percent: agg.ems_data.soc_avg as f64 / 100.0,
            power_w: agg.ems_data.power,
            temperature_c: deci(agg.ems_data.sys_temp),
            rated_capacity_wh: agg.ems_info.rated_capacity,
            available_charge_power_w: agg.ems_prediction.avail_ch_pwr,
            available_discharge_power_w: agg.ems_prediction.avail_di_pwr,
            modules: agg.bms_data.iter().enumerate().map(ModuleSummary::new).collect(),
        }
    }
}

impl ModuleSummary {
    fn new((index, bms): (usize, &BmsData)) -> Self {
        Self {
            index,
            state: bms.state_str.clone(),
            soc_percent: bms.soc as f64 / 100.0,
            min_temperature_c: deci(bms.tmin),
            max_temperature_c: deci(bms.tmax),
            cycle_count: bms.cycle_count,
            energy_available_wh: bms.energy_avail,
            alarms: bms.alarm_str.clone(),
        }
    }
}

impl From<&PhaseData> for PhaseSummary {
    fn from(phase: &PhaseData) -> Self {
        Self {
            voltage_v: phase.voltage,
            current_a: phase.amp,
            power_w: phase.power,
            power_factor: phase.pf,
        }
    }
}

impl ErrorReportSummary {
    /// `None` for an empty report.
    pub fn from_entries(entries: &[ErrorReportEntry]) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }

        let lines = |severity: Severity| -> Vec<ReportLine> {
            entries
                .iter()
                .filter(|e| e.severity() == Some(severity))
                .map(|e| ReportLine {
                    subsystem: e.sub_system_name.clone(),
                    name: e.error_name.clone(),
                    message: e.message.clone(),
                })
                .collect()
        };
        let count = |severity: Severity| entries.iter().filter(|e| e.severity() == Some(severity)).count();

        Some(Self {
            status: entries
                .iter()
                .filter_map(ErrorReportEntry::severity)
                .max()
                .unwrap_or(Severity::Ok),
            ok_count: count(Severity::Ok),
            warning_count: count(Severity::Warning),
            error_count: count(Severity::Error),
            warnings: lines(Severity::Warning),
            errors: lines(Severity::Error),
        })
    }
}

impl GridSummary {
    fn from_device(agg: &EmsDevice) -> Self {
        let v = &agg.ems_voltage;
        let a = &agg.ems_current;
        Self {
            frequency_hz: agg.ems_data.frequency as f64 / 1000.0,
            voltage_v: [deci(v.l1), deci(v.l2), deci(v.l3)],
            line_voltage_v: [deci(v.l1_l2), deci(v.l2_l3), deci(v.l3_l1)],
            current_a: [deci(a.l1), deci(a.l2), deci(a.l3)],
            imported_kwh: agg.ems_aggregate.imported_kwh,
            exported_kwh: agg.ems_aggregate.exported_kwh,
        }
    }
}

impl CtNodeSummary {
    fn new(sensor: &SensorData, snapshot: &Snapshot) -> Self {
        let metrics = snapshot.node_metrics_for(sensor.node_id);
        Self {
            node_id: sensor.node_id,
            kind: sensor.kind.clone(),
            available: sensor.available,
            power_w: sensor.total_power,
            battery_level: battery_level(metrics),
            temperature_c: metrics.map(|m| m.temperature),
            firmware_update_available: snapshot
                .node_info_for(sensor.node_id)
                .map(|n| n.firmware_update_available()),
            phases: sensor.phase.iter().map(PhaseSummary::from).collect(),
        }
    }
}

impl Summary {
    /// `now` (unix seconds) selects the current and next schedule entries.
    pub fn from_snapshot(snapshot: &Snapshot, now: i64) -> Self {
        let agg = &snapshot.telemetry.aggregated;

        let ct_nodes = snapshot
            .telemetry
            .sensors
            .iter()
            .filter(|s| s.is_configured())
            .map(|s| CtNodeSummary::new(s, snapshot))
            .collect();

        let error_report = snapshot
            .error_report
            .as_ref()
            .and_then(|report| ErrorReportSummary::from_entries(report));

        let schedule = snapshot.schedule.as_ref().map(|s| ScheduleSummary {
            local_mode: s.local_mode,
            entry_count: s.entries.len(),
            current_action: s.current_action(now),
            next_action: s.next_action(now),
        });

        Self {
            poll_count: snapshot.poll_count,
            timestamp: snapshot.telemetry.ts,
            battery: BatterySummary::from_device(agg),
            grid: GridSummary::from_device(agg),
            alarms: agg.ems_data.alarm_str.clone(),
            warnings: agg.ems_data.warning_str.clone(),
            infos: agg.ems_data.info_str.clone(),
            error_report,
            uptime_secs: snapshot.status.as_ref().map(|s| s.up_time),
            ct_nodes,
            schedule,
        }
    }
}
