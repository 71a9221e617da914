use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::dom::dom_model::MutationKind;
use crate::dom::host_page::{HostPage, MutationBatch};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone)]
pub struct ObserverSettings {
    /// Quiet period that must follow the last relevant mutation before
    /// subscribers run (trailing edge).
    pub debounce: Duration,
    /// Attribute changes outside this list are ignored.
    pub observed_attributes: Vec<String>,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        ObserverSettings {
            debounce: DEFAULT_DEBOUNCE,
            observed_attributes: vec!["class".into(), "id".into(), "aria-label".into()],
        }
    }
}

struct ObserverShared {
    settings: ObserverSettings,
    subscribers: Mutex<Vec<(SubscriptionId, ChangeCallback)>>,
    next_id: AtomicU64,
    ticks: AtomicU64,
    // Held for the whole of a dispatch; disconnect takes it after cancelling so
    // that it returns only once no callback can still be running.
    dispatch: ReentrantMutex<()>,
}

struct Connection {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Coalescing "document changed" emitter over a [`HostPage`] mutation stream.
///
/// Child-list changes and allow-listed attribute changes open (or extend) a
/// debounce window. When the window closes with no further relevant mutation,
/// every subscriber runs once, in subscription order.
pub struct ChangeObserver {
    shared: Arc<ObserverShared>,
    connection: Mutex<Option<Connection>>,
}

impl ChangeObserver {
    pub fn new(settings: ObserverSettings) -> Self {
        ChangeObserver {
            shared: Arc::new(ObserverShared {
                settings,
                subscribers: Mutex::new(vec![]),
                next_id: AtomicU64::new(1),
                ticks: AtomicU64::new(0),
                dispatch: ReentrantMutex::new(()),
            }),
            connection: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ObserverSettings {
        &self.shared.settings
    }

    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        self.shared
            .subscribers
            .lock()
            .push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.shared.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Number of coalesced ticks delivered so far.
    pub fn tick_count(&self) -> u64 {
        self.shared.ticks.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Start observing `page`. Must be called inside a tokio runtime.
    /// A second call while connected is a no-op.
    pub fn connect(&self, page: &HostPage) {
        let mut connection = self.connection.lock();
        if connection.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let rx = page.subscribe();
        let handle = tokio::spawn(run(self.shared.clone(), rx, cancel.clone()));
        *connection = Some(Connection { cancel, handle });
        debug!(
            debounce_ms = self.shared.settings.debounce.as_millis() as u64,
            "change observer connected"
        );
    }

    /// Stop observing and drop all subscribers. Idempotent. Cancels any
    /// pending debounce window; no callback runs after this returns.
    pub fn disconnect(&self) {
        let connection = self.connection.lock().take();
        if let Some(connection) = connection {
            connection.cancel.cancel();
            connection.handle.abort();
            debug!("change observer disconnected");
        }
        // Wait out a dispatch that is already running on another thread.
        let _gate = self.shared.dispatch.lock();
        self.shared.subscribers.lock().clear();
    }
}

impl Drop for ChangeObserver {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.cancel.cancel();
            connection.handle.abort();
        }
    }
}

impl ObserverShared {
    fn is_relevant(&self, batch: &MutationBatch) -> bool {
        batch.records.iter().any(|r| match &r.kind {
            MutationKind::ChildList => true,
            MutationKind::Attributes { name } => {
                self.settings.observed_attributes.iter().any(|a| a == name)
            }
            MutationKind::CharacterData | MutationKind::Style => false,
        })
    }

    fn fire(&self, cancel: &CancellationToken) {
        let _gate = self.dispatch.lock();
        if cancel.is_cancelled() {
            return;
        }
        let callbacks: Vec<ChangeCallback> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(tick, subscribers = callbacks.len(), "dispatching coalesced change");

        for callback in callbacks {
            // A subscriber may disconnect the observer mid-dispatch.
            if cancel.is_cancelled() {
                return;
            }
            callback();
        }
    }
}

enum Signal {
    Relevant,
    Ignored,
    StreamClosed,
}

fn classify(shared: &ObserverShared, received: Result<MutationBatch, RecvError>) -> Signal {
    match received {
        Ok(batch) if shared.is_relevant(&batch) => Signal::Relevant,
        Ok(_) => Signal::Ignored,
        // Dropped records still mean the document changed.
        Err(RecvError::Lagged(_)) => Signal::Relevant,
        Err(RecvError::Closed) => Signal::StreamClosed,
    }
}

async fn run(
    shared: Arc<ObserverShared>,
    mut rx: broadcast::Receiver<MutationBatch>,
    cancel: CancellationToken,
) {
    let debounce = shared.settings.debounce;

    loop {
        // ---- Idle: wait for the first relevant mutation ----
        let signal = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            received = rx.recv() => classify(&shared, received),
        };
        match signal {
            Signal::Relevant => {}
            Signal::Ignored => continue,
            Signal::StreamClosed => return,
        }

        // ---- Window: every relevant mutation pushes the deadline out ----
        let mut deadline = Instant::now() + debounce;
        let mut stream_closed = false;
        while !stream_closed {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = sleep_until(deadline) => break,
                received = rx.recv() => match classify(&shared, received) {
                    Signal::Relevant => deadline = Instant::now() + debounce,
                    Signal::Ignored => {}
                    Signal::StreamClosed => stream_closed = true,
                },
            }
        }
        if stream_closed {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = sleep_until(deadline) => {}
            }
        }

        shared.fire(&cancel);

        if stream_closed {
            return;
        }
    }
}
