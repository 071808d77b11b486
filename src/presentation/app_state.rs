// Application state for HTTP handlers
use crate::application::coordinator::CoordinatorHandle;
use crate::application::poller::DeviceHealth;
use crate::infrastructure::config::DeviceSettings;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: CoordinatorHandle,
    pub health: watch::Receiver<DeviceHealth>,
    /// Echoed, redacted, in diagnostics
    pub device: DeviceSettings,
    /// Flips to true when the server starts shutting down
    pub shutdown: watch::Receiver<bool>,
}
