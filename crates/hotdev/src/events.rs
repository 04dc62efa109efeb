//! Server-sent event stream for build notifications.
//!
//! Every connected client owns a bounded channel of pre-formatted frames.
//! Publishing never blocks: a client whose channel is closed is dropped from
//! the registry, a client whose channel is full misses that frame.

use crate::stats::{BundleStats, CompileResult};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::AbortHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Frames buffered per client before new frames are skipped.
const CLIENT_BUFFER: usize = 100;

/// Comment frame sent on every heartbeat tick.
pub const HEARTBEAT_FRAME: &str = ":ping\n\n";

/// Headers written before the first frame of an event-stream response.
pub const PREAMBLE_HEADERS: [(&str, &str); 5] = [
    ("content-type", "text/event-stream;charset=utf-8"),
    ("cache-control", "no-cache, no-transform"),
    ("connection", "keep-alive"),
    ("access-control-allow-origin", "*"),
    ("x-accel-buffering", "no"),
];

/// Kind of build notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// A compile started
    Building,
    /// A compile finished
    Built,
    /// Catch-up summary sent to a client that connected after a build
    Sync,
}

/// JSON body of a `data:` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub action: Action,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Compile time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<BTreeMap<String, String>>,
}

impl Payload {
    /// Bare `building` notification.
    pub fn building() -> Self {
        Self {
            action: Action::Building,
            name: None,
            time: None,
            hash: None,
            warnings: None,
            errors: None,
            modules: None,
        }
    }

    /// Summary of one bundle.
    pub fn bundle(action: Action, stats: &BundleStats) -> Self {
        Self {
            action,
            name: stats.name.clone(),
            time: Some(stats.time_ms),
            hash: Some(stats.hash.clone()),
            warnings: Some(stats.warnings.clone()),
            errors: Some(stats.errors.clone()),
            modules: Some(stats.modules.clone()),
        }
    }

    /// Render as a `data:` frame.
    pub fn to_frame(&self) -> serde_json::Result<Bytes> {
        let json = serde_json::to_string(self)?;
        Ok(Bytes::from(format!("data: {}\n\n", json)))
    }
}

struct Inner {
    clients: RwLock<BTreeMap<usize, mpsc::Sender<Bytes>>>,
    next_id: AtomicUsize,
    latest: RwLock<Option<Arc<CompileResult>>>,
    heartbeat: Mutex<Option<AbortHandle>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.heartbeat.get_mut().take() {
            handle.abort();
        }
    }
}

/// Registry of connected event-stream clients.
#[derive(Clone)]
pub struct EventStream {
    inner: Arc<Inner>,
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStream {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                clients: RwLock::new(BTreeMap::new()),
                next_id: AtomicUsize::new(0),
                latest: RwLock::new(None),
                heartbeat: Mutex::new(None),
            }),
        }
    }

    /// Register a new client.
    ///
    /// The channel starts with a blank line, followed by one `sync` frame per
    /// bundle when a finished build is known.
    pub fn register(&self) -> (usize, mpsc::Receiver<Bytes>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);

        // Held until the client is in the registry, so a result published
        // meanwhile is either replayed here or broadcast to it.
        let mut clients = self.inner.clients.write();
        let _ = tx.try_send(Bytes::from_static(b"\n"));
        if let Some(result) = self.inner.latest.read().clone() {
            for stats in result.bundles() {
                match Payload::bundle(Action::Sync, stats).to_frame() {
                    Ok(frame) => {
                        let _ = tx.try_send(frame);
                    }
                    Err(e) => warn!("Failed to encode sync payload: {}", e),
                }
            }
        }
        clients.insert(id, tx);
        drop(clients);

        debug!(client = id, "event stream client connected");
        (id, rx)
    }

    /// Register a client and wrap its channel in a stream that unregisters
    /// itself when dropped.
    pub fn subscribe(&self) -> ClientStream {
        let (id, rx) = self.register();
        ClientStream {
            id,
            events: Arc::downgrade(&self.inner),
            receiver: ReceiverStream::new(rx),
        }
    }

    /// Remove a client. Unknown ids are ignored.
    pub fn unregister(&self, id: usize) {
        unregister(&self.inner, id);
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.read().len()
    }

    /// Send a heartbeat comment to every client.
    pub fn heartbeat(&self) {
        broadcast(&self.inner, Bytes::from_static(HEARTBEAT_FRAME.as_bytes()));
    }

    /// Send a heartbeat every `period` until the stream is dropped.
    ///
    /// Must be called from within a tokio runtime. Replaces any previously
    /// started heartbeat.
    pub fn start_heartbeat(&self, period: Duration) {
        let events = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticks = tokio::time::interval_at(start, period);
            loop {
                ticks.tick().await;
                let Some(inner) = events.upgrade() else {
                    break;
                };
                broadcast(&inner, Bytes::from_static(HEARTBEAT_FRAME.as_bytes()));
            }
        });

        if let Some(previous) = self.inner.heartbeat.lock().replace(task.abort_handle()) {
            previous.abort();
        }
    }

    /// Send one payload to every client, in registration order.
    pub fn publish(&self, payload: &Payload) {
        match payload.to_frame() {
            Ok(frame) => broadcast(&self.inner, frame),
            Err(e) => warn!("Failed to encode event payload: {}", e),
        }
    }

    /// Announce that a compile started and forget the previous result.
    pub fn publish_building(&self) {
        self.remember(None);
        self.publish(&Payload::building());
    }

    /// Publish one frame per bundle of `result`.
    ///
    /// A `built` result is remembered and replayed to clients that connect
    /// later.
    pub fn publish_result(&self, action: Action, result: &Arc<CompileResult>) {
        if action == Action::Built {
            self.remember(Some(Arc::clone(result)));
        }
        for stats in result.bundles() {
            self.publish(&Payload::bundle(action, stats));
        }
    }

    /// Replace the result replayed to new clients. Taken under the registry
    /// lock so it cannot slip between a registration's replay and insert.
    fn remember(&self, result: Option<Arc<CompileResult>>) {
        let _clients = self.inner.clients.write();
        *self.inner.latest.write() = result;
    }
}

fn unregister(inner: &Inner, id: usize) {
    if inner.clients.write().remove(&id).is_some() {
        debug!(client = id, "event stream client disconnected");
    }
}

fn broadcast(inner: &Inner, frame: Bytes) {
    let clients: Vec<(usize, mpsc::Sender<Bytes>)> = inner
        .clients
        .read()
        .iter()
        .map(|(id, tx)| (*id, tx.clone()))
        .collect();

    let mut closed = Vec::new();
    for (id, tx) in clients {
        match tx.try_send(frame.clone()) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => closed.push(id),
            Err(TrySendError::Full(_)) => {
                warn!(client = id, "event stream client is not keeping up, frame skipped");
            }
        }
    }

    for id in closed {
        unregister(inner, id);
    }
}

/// Frames for one client, as a body stream.
///
/// Dropping it (the peer went away) removes the client from the registry.
pub struct ClientStream {
    id: usize,
    events: Weak<Inner>,
    receiver: ReceiverStream<Bytes>,
}

impl ClientStream {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Stream for ClientStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx).map(|frame| frame.map(Ok))
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        if let Some(inner) = self.events.upgrade() {
            unregister(&inner, self.id);
        }
    }
}
