//! Server-sent change notifications for the admin log viewers.

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::state::AppState;

/// Streams store change events as SSE. Each event carries the store
/// name, operation, and affected row id; clients coalesce bursts and
/// refetch rather than patching local state from the payload.
pub async fn change_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.change_feed.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(change) => match Event::default().event("change").json_data(&change) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                tracing::warn!(error = ?err, "failed to serialize change event");
                None
            }
        },
        // A lagged receiver missed some events; the next one that does
        // arrive still triggers a full refetch client-side.
        Err(err) => {
            tracing::debug!(error = ?err, "change stream receiver lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
