//! Server-to-client streaming channel
//!
//! Drains a session's pending-message queue into SSE `data:` frames. Idle
//! periods are covered by the keep-alive comment configured on the response.
//! The stream ends when the session is terminated; when the peer disconnects
//! the stream is simply dropped, which releases the queue. While a stream is
//! open the session counts as in use and is never reaped as idle.

use crate::mcp::session::{Session, StreamAttachment};
use axum::response::sse::{Event, KeepAlive};
use futures_util::Stream;
use std::convert::Infallible;
use std::time::Duration;

/// Keep-alive interval used when none is configured
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Comment text of a keep-alive frame; rendered as `: keep-alive`
pub const KEEP_ALIVE_TEXT: &str = " keep-alive";

pub fn keep_alive(interval: Duration) -> KeepAlive {
    KeepAlive::new().interval(interval).text(KEEP_ALIVE_TEXT)
}

/// Logs how a stream ended, including when it is dropped mid-wait
struct StreamGuard {
    session_id: String,
    finished: bool,
    _attachment: StreamAttachment,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.finished {
            tracing::debug!(session_id = %self.session_id, "SSE stream closed with session");
        } else {
            tracing::debug!(session_id = %self.session_id, "SSE stream cancelled by peer");
        }
    }
}

/// Event stream for one session
///
/// Holds the queue, the cancellation token and a stream attachment, not the
/// session itself, so a terminated session is freed even while a client is
/// still attached.
pub fn event_stream(session: &Session) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    let pending = session.pending();
    let ct = session.cancellation();
    let guard = StreamGuard {
        session_id: session.id().to_string(),
        finished: false,
        _attachment: session.attach_stream(),
    };

    async_stream::stream! {
        let mut guard = guard;
        tracing::debug!(session_id = %guard.session_id, "SSE stream opened");

        loop {
            let next = tokio::select! {
                biased;
                _ = ct.cancelled() => None,
                message = async { pending.lock().await.recv().await } => message,
            };

            match next {
                Some(message) => yield Ok(Event::default().data(message.to_string())),
                None => break,
            }
        }

        guard.finished = true;
    }
}
