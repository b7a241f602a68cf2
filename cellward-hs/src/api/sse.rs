//! Server-Sent Events stream of ledger events

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::AppState;

/// GET /api/events
///
/// Streams every `LedgerEvent` as an SSE event named by its type with a
/// JSON payload. Slow clients that lag past the bus capacity miss the
/// oldest events and are told how many were skipped.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to occupancy events");
    let mut rx = state.events.subscribe();

    let stream = async_stream::stream! {
        // Initial connected status so UIs can show link state immediately
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        yield Ok(Event::default().event(event.event_type()).data(json));
                    }
                    Err(e) => warn!("Failed to serialize {}: {}", event.event_type(), e),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("SSE subscriber lagged, skipped {} events", skipped);
                    yield Ok(Event::default()
                        .event("Lagged")
                        .data(skipped.to_string()));
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
