// Presentation layer - HTTP surface for snapshots, health and events
pub mod app_state;
pub mod handlers;
