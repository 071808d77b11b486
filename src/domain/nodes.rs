// CT clamp node inventory (/nodes.json) and per-node metrics (/node_metrics.json)
use super::decode::{lenient, Decode};
use serde::{Deserialize, Serialize};

const BATTERY_EMPTY_VOLTS: f64 = 1.8;
const BATTERY_FULL_VOLTS: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    #[serde(deserialize_with = "lenient")]
    pub node_id: u32,
    #[serde(deserialize_with = "lenient")]
    pub eui: String,
    #[serde(deserialize_with = "lenient")]
    pub model: String,
    #[serde(deserialize_with = "lenient")]
    pub version: String,
    #[serde(deserialize_with = "lenient")]
    pub manifest_version: String,
    #[serde(deserialize_with = "lenient")]
    pub ota_distribute_status: String,
}

impl Decode for NodeInfo {}

impl NodeInfo {
    pub fn firmware_update_available(&self) -> bool {
        self.version != self.manifest_version
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetrics {
    #[serde(deserialize_with = "lenient")]
    pub node_id: u32,
    /// volts, two AA cells in series
    #[serde(deserialize_with = "lenient")]
    pub battery_voltage: f64,
    /// degrees Celsius
    #[serde(deserialize_with = "lenient")]
    pub temperature: f64,
    /// seconds
    #[serde(deserialize_with = "lenient")]
    pub node_uptime: i64,
    #[serde(deserialize_with = "lenient")]
    pub usb_power: bool,
}

impl Decode for NodeMetrics {}

impl NodeMetrics {
    /// Remaining charge of the node's alkaline pack, 1.8 V empty to 3.0 V
    /// full, rounded to one decimal.
    pub fn battery_level(&self) -> f64 {
        let level = (self.battery_voltage - BATTERY_EMPTY_VOLTS)
            / (BATTERY_FULL_VOLTS - BATTERY_EMPTY_VOLTS)
            * 100.0;
        (level.clamp(0.0, 100.0) * 10.0).round() / 10.0
    }
}

/// Battery level for a node, `None` when no metrics were collected for it.
pub fn battery_level(metrics: Option<&NodeMetrics>) -> Option<f64> {
    metrics.map(NodeMetrics::battery_level)
}

pub fn find_node(nodes: &[NodeInfo], node_id: u32) -> Option<&NodeInfo> {
    nodes.iter().find(|n| n.node_id == node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decode::decode_list;
    use crate::domain::fixtures;

    fn metrics(voltage: f64) -> NodeMetrics {
        NodeMetrics {
            node_id: 1,
            battery_voltage: voltage,
            ..Default::default()
        }
    }

    #[test]
    fn test_battery_level() {
        assert_eq!(metrics(2.73).battery_level(), 77.5);
        assert_eq!(metrics(3.0).battery_level(), 100.0);
        assert_eq!(metrics(2.4).battery_level(), 50.0);
    }

    #[test]
    fn test_battery_level_clamped() {
        assert_eq!(metrics(1.5).battery_level(), 0.0);
        assert_eq!(metrics(3.5).battery_level(), 100.0);
        assert_eq!(battery_level(None), None);
        assert_eq!(battery_level(Some(&metrics(1.8))), Some(0.0));
    }

    #[test]
    fn test_parse_node_metrics() {
        let m = NodeMetrics::decode(fixtures::node_metrics(2));
        assert_eq!(m.node_id, 2);
        assert_eq!(m.battery_voltage, 2.73);
        assert_eq!(m.temperature, -2.28);
        assert_eq!(m.node_uptime, 6552787);
        assert!(!m.usb_power);

        let m = NodeMetrics::decode(fixtures::node_metrics(3));
        assert_eq!(m.temperature, 17.19);
    }

    #[test]
    fn test_parse_nodes() {
        let nodes: Vec<NodeInfo> = decode_list(fixtures::nodes());
        assert_eq!(nodes.len(), 2);

        let grid = find_node(&nodes, 2).expect("node 2");
        assert_eq!(grid.version, "1200-373138d6");
        assert_eq!(grid.ota_distribute_status, "up2date");
        assert!(!grid.firmware_update_available());

        let solar = find_node(&nodes, 3).expect("node 3");
        assert!(solar.firmware_update_available());

        assert!(find_node(&nodes, 99).is_none());
    }
}
