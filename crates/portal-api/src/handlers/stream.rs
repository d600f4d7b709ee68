//! Event-stream endpoint.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderName;
use axum::http::header::CACHE_CONTROL;
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use portal_realtime::{Channel, CloseReason, ConnectionRegistry, StreamEvent};

use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientOrigin};
use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// GET /api/notifications/stream: opens a server-sent event stream.
///
/// Admission failures return a JSON error instead of a stream: 401 without a
/// valid token, 429 with `Retry-After` when rate limited, 503 at capacity.
pub async fn open_stream(
    State(state): State<AppState>,
    auth: AuthUser,
    origin: ClientOrigin,
) -> Result<impl IntoResponse, ApiError> {
    let (channel, receiver) = state.engine.admit(&auth.user_id, origin.into_metadata())?;
    let guard = ChannelGuard {
        registry: state.engine.registry.clone(),
        channel_id: channel.id.clone(),
    };

    info!(
        channel_id = %channel.id,
        user_id = %auth.user_id,
        role = %auth.role,
        "Event stream opened"
    );

    queue(&channel, state.engine.connected_event(&channel));

    let unread = match state.store.unread_count(&auth.user_id).await {
        Ok(count) => count,
        Err(e) => {
            warn!(user_id = %auth.user_id, error = %e, "Unread count unavailable");
            0
        }
    };
    queue(&channel, StreamEvent::stats(unread));

    let stream = event_stream(guard, channel.close_token(), receiver);

    Ok((
        [
            (CACHE_CONTROL, "no-cache, no-transform"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Sse::new(stream),
    ))
}

fn queue(channel: &Channel, event: StreamEvent) {
    if let Err(e) = channel.send(event) {
        debug!(channel_id = %channel.id, error = %e, "Initial frame not queued");
    }
}

/// Deregisters the channel when dropped: with the response body once the
/// stream is running, or with the handler future if the client leaves first.
struct ChannelGuard {
    registry: Arc<ConnectionRegistry>,
    channel_id: String,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.registry
            .deregister(&self.channel_id, CloseReason::ClientClosed);
    }
}

struct StreamState {
    receiver: mpsc::Receiver<StreamEvent>,
    closed: CancellationToken,
    guard: ChannelGuard,
}

/// Drains the channel queue into SSE events until the channel closes.
///
/// Every frame pulled by the transport refreshes the channel's liveness.
fn event_stream(
    guard: ChannelGuard,
    closed: CancellationToken,
    receiver: mpsc::Receiver<StreamEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let state = StreamState {
        receiver,
        closed,
        guard,
    };

    futures::stream::unfold(state, |mut state| async move {
        let next = tokio::select! {
            biased;
            _ = state.closed.cancelled() => None,
            event = state.receiver.recv() => event,
        };

        match next {
            Some(event) => {
                state.guard.registry.touch(&state.guard.channel_id);
                Some((Ok::<_, Infallible>(to_sse(&event)), state))
            }
            None => None,
        }
    })
}

fn to_sse(event: &StreamEvent) -> Event {
    match Event::default().json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            warn!(kind = event.kind(), error = %e, "Failed to encode frame");
            Event::default().comment("encoding error")
        }
    }
}
