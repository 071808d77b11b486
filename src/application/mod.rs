// Application layer - Device port and polling orchestration
pub mod coordinator;
pub mod device_api;
pub mod poller;

#[cfg(test)]
pub mod fake_device;
