// Drives the coordinator on a fixed interval and tracks device health
use crate::application::coordinator::{Coordinator, PollError};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeviceHealth {
    /// No poll has completed yet
    Starting,
    Online,
    Unavailable { reason: String },
    /// Credentials were rejected; polling has stopped.
    NeedsReconfiguration,
}

impl DeviceHealth {
    pub fn is_online(&self) -> bool {
        matches!(self, DeviceHealth::Online)
    }
}

impl fmt::Display for DeviceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceHealth::Starting => f.write_str("starting"),
            DeviceHealth::Online => f.write_str("online"),
            DeviceHealth::Unavailable { reason } => write!(f, "unavailable: {reason}"),
            DeviceHealth::NeedsReconfiguration => f.write_str("needs reconfiguration"),
        }
    }
}

pub struct Poller {
    coordinator: Coordinator,
    interval: Duration,
    health: watch::Sender<DeviceHealth>,
}

impl Poller {
    pub fn new(coordinator: Coordinator, interval: Duration) -> Self {
        let (health, _) = watch::channel(DeviceHealth::Starting);
        Self {
            coordinator,
            interval,
            health,
        }
    }

    pub fn health(&self) -> watch::Receiver<DeviceHealth> {
        self.health.subscribe()
    }

    /// Poll until credentials are rejected. The first tick runs at once; a
    /// tick that overruns the interval pushes the following ones back
    /// instead of bursting to catch up.
    pub async fn run(mut self) -> PollError {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "poller started");
        loop {
            ticker.tick().await;
            match self.coordinator.tick().await {
                Ok(_) => self.set_health(DeviceHealth::Online),
                Err(err @ PollError::AuthFailed(_)) => {
                    self.set_health(DeviceHealth::NeedsReconfiguration);
                    warn!(
                        poll = self.coordinator.poll_count(),
                        "authentication rejected, polling stopped until reconfigured"
                    );
                    return err;
                }
                Err(err) => self.set_health(DeviceHealth::Unavailable {
                    reason: err.to_string(),
                }),
            }
        }
    }

    fn set_health(&self, next: DeviceHealth) {
        self.health.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            info!(from = %current, to = %next, "device health changed");
            *current = next;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device_api::{ApiError, ENDPOINT_EMS};
    use crate::application::fake_device::FakeDevice;
    use std::sync::Arc;
    use tokio::time::sleep;

    const INTERVAL: Duration = Duration::from_secs(30);

    fn poller() -> (Arc<FakeDevice>, Poller) {
        let device = Arc::new(FakeDevice::new());
        let poller = Poller::new(Coordinator::new(device.clone()), INTERVAL);
        (device, poller)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_immediately_then_every_interval() {
        let (device, poller) = poller();
        let health = poller.health();
        assert_eq!(*health.borrow(), DeviceHealth::Starting);

        let task = tokio::spawn(poller.run());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(device.calls(ENDPOINT_EMS), 1);
        assert!(health.borrow().is_online());

        sleep(INTERVAL).await;
        assert_eq!(device.calls(ENDPOINT_EMS), 2);

        sleep(INTERVAL * 2).await;
        assert_eq!(device.calls(ENDPOINT_EMS), 4);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_stops_polling() {
        let (device, poller) = poller();
        let health = poller.health();
        device.fail(ENDPOINT_EMS, ApiError::Auth);

        let err = poller.run().await;

        assert!(matches!(err, PollError::AuthFailed(_)));
        assert_eq!(*health.borrow(), DeviceHealth::NeedsReconfiguration);
        assert_eq!(device.calls(ENDPOINT_EMS), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers() {
        let (device, poller) = poller();
        let health = poller.health();
        device.fail(
            ENDPOINT_EMS,
            ApiError::Connection {
                host: "192.168.70.12".into(),
                message: "Connection refused".into(),
            },
        );

        let task = tokio::spawn(poller.run());

        sleep(Duration::from_secs(1)).await;
        match &*health.borrow() {
            DeviceHealth::Unavailable { reason } => assert!(reason.contains("Connection refused")),
            other => panic!("unexpected health {other:?}"),
        }

        device.clear_failure(ENDPOINT_EMS);
        sleep(INTERVAL).await;
        assert!(health.borrow().is_online());

        task.abort();
    }

    #[test]
    fn test_health_display() {
        let health = DeviceHealth::Unavailable {
            reason: "timeout".into(),
        };
        assert_eq!(health.to_string(), "unavailable: timeout");
        assert_eq!(DeviceHealth::NeedsReconfiguration.to_string(), "needs reconfiguration");
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["state"], "unavailable");
        assert_eq!(json["reason"], "timeout");
    }
}
