// Recorded device payloads shared by the unit tests
use serde_json::Value;

macro_rules! fixture {
    ($name:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/", $name))
    };
}

fn parse(raw: &str) -> Value {
    serde_json::from_str(raw).expect("fixture is valid JSON")
}

pub fn ems() -> Value {
    parse(fixture!("ems_response.json"))
}

pub fn status() -> Value {
    parse(fixture!("status_response.json"))
}

pub fn error_report() -> Value {
    parse(fixture!("error_report_response.json"))
}

pub fn nodes() -> Value {
    parse(fixture!("nodes_response.json"))
}

pub fn node_metrics(node_id: u32) -> Value {
    match node_id {
        2 => parse(fixture!("node_metrics_2_response.json")),
        3 => parse(fixture!("node_metrics_3_response.json")),
        other => panic!("no node_metrics fixture for node {other}"),
    }
}

pub fn schedule() -> Value {
    parse(fixture!("schedule_response.json"))
}
