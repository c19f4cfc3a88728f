//! Session store for the MCP HTTP transport
//!
//! A session is created by a successful `initialize` call and lives until it
//! is deleted (or, when idle expiry is enabled, reaped). Each session owns a
//! bound [`GatewayService`] and a queue of pending push messages that the
//! streaming channel drains.
//!
//! The store is a concurrent map shared by every request handler. Session
//! creation uses an insert-if-vacant entry so two racing `initialize` calls
//! can never land on the same id.

use crate::mcp::service::GatewayService;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::RngCore;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receiving half of a session's pending-message queue
pub type PendingMessages = Arc<Mutex<mpsc::UnboundedReceiver<Value>>>;

/// Generates an unguessable session id: 32 bytes from the OS CSPRNG, hex-encoded
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Last-use timestamp and attached stream count, shared with open streams
#[derive(Debug)]
struct Activity {
    last_seen_ms: AtomicI64,
    streams: AtomicUsize,
}

impl Activity {
    fn touch(&self) {
        self.last_seen_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

/// Marks a streaming channel as attached to a session until dropped
///
/// A session with an attachment is never treated as idle. Dropping the last
/// attachment restarts the idle clock.
#[derive(Debug)]
pub struct StreamAttachment {
    activity: Arc<Activity>,
}

impl Drop for StreamAttachment {
    fn drop(&mut self) {
        self.activity.touch();
        self.activity.streams.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One active client session
pub struct Session {
    id: String,
    service: GatewayService,
    created_at: DateTime<Utc>,
    activity: Arc<Activity>,
    outbound: mpsc::UnboundedSender<Value>,
    pending: PendingMessages,
    ct: CancellationToken,
}

impl Session {
    fn new(id: String, service: GatewayService) -> Self {
        let (outbound, pending) = mpsc::unbounded_channel();
        let now = Utc::now();

        Self {
            id,
            service,
            created_at: now,
            activity: Arc::new(Activity {
                last_seen_ms: AtomicI64::new(now.timestamp_millis()),
                streams: AtomicUsize::new(0),
            }),
            outbound,
            pending: Arc::new(Mutex::new(pending)),
            ct: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The dispatch target bound at creation
    pub fn service(&self) -> &GatewayService {
        &self.service
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.activity.last_seen_ms.load(Ordering::Relaxed))
            .unwrap_or(self.created_at)
    }

    pub fn touch(&self) {
        self.activity.touch();
    }

    /// Registers an open streaming channel for the lifetime of the returned guard
    pub fn attach_stream(&self) -> StreamAttachment {
        self.activity.streams.fetch_add(1, Ordering::AcqRel);
        StreamAttachment {
            activity: Arc::clone(&self.activity),
        }
    }

    pub fn has_stream(&self) -> bool {
        self.activity.streams.load(Ordering::Acquire) > 0
    }

    /// Queues a message for the streaming channel
    pub fn push(&self, message: Value) -> bool {
        !self.is_closed() && self.outbound.send(message).is_ok()
    }

    pub fn pending(&self) -> PendingMessages {
        Arc::clone(&self.pending)
    }

    /// Token cancelled when the session is terminated
    pub fn cancellation(&self) -> CancellationToken {
        self.ct.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.ct.is_cancelled()
    }

    fn close(&self) {
        self.ct.cancel();
    }
}

/// Concurrent map from session id to session
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
}

pub type SharedSessionStore = Arc<SessionStore>;

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh id and stores a new session bound to `service`
    pub fn create(&self, service: GatewayService) -> Arc<Session> {
        loop {
            let id = generate_session_id();
            if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
                let session = Arc::new(Session::new(id, service));
                slot.insert(Arc::clone(&session));
                tracing::info!(session_id = %session.id(), "Created new MCP session");
                return session;
            }
        }
    }

    /// Looks up an active session and marks it as used
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        session.touch();
        Some(session)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Terminates a session; its streaming channel ends
    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(id)?;
        session.close();
        tracing::info!(session_id = %id, "Terminated MCP session");
        Some(session)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Queues a push message for one session
    pub fn send(&self, id: &str, message: Value) -> bool {
        match self.sessions.get(id) {
            Some(session) => session.push(message),
            None => false,
        }
    }

    /// Queues a push message for every session, returning how many accepted it
    pub fn broadcast(&self, message: Value) -> usize {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        sessions
            .iter()
            .filter(|session| session.push(message.clone()))
            .count()
    }

    /// Removes sessions idle for longer than `ttl`
    ///
    /// Sessions with an attached streaming channel are never idle.
    pub fn purge_idle(&self, ttl: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            return 0;
        };

        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| {
                let session = entry.value();
                !session.has_stream() && session.last_seen() < cutoff
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in expired {
            if let Some((_, session)) = self.sessions.remove(&id) {
                session.close();
                tracing::info!(session_id = %id, "Expired idle MCP session");
                removed += 1;
            }
        }
        removed
    }

    /// Terminates every session, ending all open streams
    pub fn close_all(&self) {
        let ids = self.ids();
        for id in ids {
            self.remove(&id);
        }
    }
}

/// Periodically expires sessions idle for longer than `ttl`
pub fn spawn_idle_reaper(
    sessions: SharedSessionStore,
    ttl: Duration,
    ct: CancellationToken,
) -> JoinHandle<()> {
    let period = ttl.min(Duration::from_secs(60)).max(Duration::from_millis(10));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ct.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = sessions.purge_idle(ttl);
                    if removed > 0 {
                        tracing::debug!(removed, "Purged idle sessions");
                    }
                }
            }
        }
    })
}
