// Chunked newline-delimited JSON streaming utilities
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use std::future::Future;
use tokio::sync::broadcast;
use tracing::warn;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Create a chunked response with one JSON document per line
pub fn ndjson_stream<S, T>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize,
{
    let byte_stream = stream.map(|item| serialize_line(&item));

    let body = Body::from_stream(byte_stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn serialize_line<T: Serialize>(item: &T) -> Result<Bytes, serde_json::Error> {
    let mut writer = BytesMut::new().writer();
    serde_json::to_writer(&mut writer, item)?;
    let mut line = writer.into_inner();
    line.put_u8(b'\n');
    Ok(line.freeze())
}

/// Stream every message published after subscription until the sender goes
/// away or `shutdown` completes. A consumer that falls behind skips the
/// overwritten messages.
pub fn stream_from_broadcast<T, F>(mut rx: broadcast::Receiver<T>, shutdown: F) -> impl IntoResponse
where
    T: Serialize + Clone + Send + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let stream = async_stream::stream! {
        tokio::pin!(shutdown);
        loop {
            // drain what is already queued before honouring shutdown
            let received = tokio::select! {
                biased;
                received = rx.recv() => received,
                _ = &mut shutdown => break,
            };
            match received {
                Ok(msg) => yield msg,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream consumer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    match ndjson_stream(stream) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
