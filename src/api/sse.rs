//! Server-Sent Events support

use crate::runtime::{SessionEvent, SessionSnapshot};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init: SessionSnapshot,
    broadcast_rx: broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with the snapshot then broadcasts
    let init = futures::stream::once(async move { Ok(init_event(&init)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(session_event_to_axum(&event))),
        Err(e) => {
            // Lagged: the client can resync from /api/session
            tracing::warn!(error = %e, "SSE subscriber lagged");
            None
        }
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_event(snapshot: &SessionSnapshot) -> Event {
    let data = json!({
        "type": "init",
        "session": snapshot,
    });
    Event::default().event("init").data(data.to_string())
}

fn session_event_to_axum(event: &SessionEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(data) => Event::default().event(event.event_type()).data(data),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize session event");
            Event::default().event("error").data(e.to_string())
        }
    }
}
