// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod homevolt_client;
pub mod ndjson_stream;
pub mod retry;
