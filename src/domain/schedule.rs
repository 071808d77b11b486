// Future-action timeline from /schedule.json
use super::decode::{lenient, lenient_list, Decode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One planned action. The interval is half-open: `[from_ts, to_ts)`, unix
/// seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleEntry {
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: i64,
    #[serde(rename = "from", deserialize_with = "lenient")]
    pub from_ts: i64,
    #[serde(rename = "to", deserialize_with = "lenient")]
    pub to_ts: i64,
    /// W
    #[serde(deserialize_with = "lenient")]
    pub setpoint: i64,
}

impl ScheduleEntry {
    pub fn contains(&self, now: i64) -> bool {
        self.from_ts <= now && now < self.to_ts
    }

    pub fn type_name(&self) -> String {
        let name = match self.kind {
            0 => "Idle",
            1 => "Inverter Charge",
            2 => "Inverter Discharge",
            3 => "Grid Charge",
            4 => "Grid Discharge",
            5 => "Grid Charge/Discharge",
            6 => "Frequency Reserve",
            7 => "Solar Charge",
            8 => "Solar Charge/Discharge",
            9 => "Full Solar Export",
            other => return format!("Unknown ({other})"),
        };
        name.to_string()
    }

    fn same_action(&self, other: &ScheduleEntry) -> bool {
        self.kind == other.kind && self.setpoint == other.setpoint
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleData {
    #[serde(deserialize_with = "lenient")]
    pub local_mode: bool,
    #[serde(deserialize_with = "lenient")]
    pub schedule_id: String,
    #[serde(rename = "schedule", deserialize_with = "lenient_list")]
    pub entries: Vec<ScheduleEntry>,
}

impl Decode for ScheduleData {}

impl ScheduleData {
    /// Entry whose interval covers `now`.
    pub fn current_entry(&self, now: i64) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.contains(now))
    }

    /// Earliest entry starting at or after `now` that does something other
    /// than the current entry. With no current entry, the first upcoming
    /// entry qualifies.
    pub fn next_entry(&self, now: i64) -> Option<&ScheduleEntry> {
        let current = self.current_entry(now);
        self.entries
            .iter()
            .filter(|e| e.from_ts >= now)
            .filter(|e| current.is_none_or(|c| !e.same_action(c)))
            .min_by_key(|e| e.from_ts)
    }

    /// "Grid Charge (17250 W)", or just the type name without a setpoint.
    pub fn current_action(&self, now: i64) -> Option<String> {
        let entry = self.current_entry(now)?;
        if entry.setpoint != 0 {
            Some(format!("{} ({} W)", entry.type_name(), entry.setpoint))
        } else {
            Some(entry.type_name())
        }
    }

    /// "Grid Charge at 01:00", start time in UTC.
    pub fn next_action(&self, now: i64) -> Option<String> {
        let entry = self.next_entry(now)?;
        let start = DateTime::<Utc>::from_timestamp(entry.from_ts, 0)?;
        Some(format!("{} at {}", entry.type_name(), start.format("%H:%M")))
    }
}
