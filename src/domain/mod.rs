// Domain layer - Device records and the combined snapshot
pub mod decode;
pub mod ems;
pub mod nodes;
pub mod redact;
pub mod schedule;
pub mod snapshot;
pub mod status;
pub mod summary;

#[cfg(test)]
pub mod fixtures;
