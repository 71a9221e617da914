use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};
use tokio::sync::broadcast;
use tracing::debug;

use crate::dom::dom_model::{Document, MutationKind, MutationRecord};

const MUTATION_CHANNEL_CAPACITY: usize = 1024;

/// Batch of mutation records published after one `mutate` call.
#[derive(Debug, Clone)]
pub struct MutationBatch {
    pub generation: u64,
    pub records: Vec<MutationRecord>,
}

/// Shared handle to the live host document.
///
/// The page is owned by a third party: scripts outside the engine mutate it
/// through [`HostPage::mutate`] and the engine observes those changes through
/// [`HostPage::subscribe`]. Cloning the handle shares the same document.
#[derive(Clone)]
pub struct HostPage {
    document: Arc<RwLock<Document>>,
    generation: Arc<AtomicU64>,
    mutations: broadcast::Sender<MutationBatch>,
}

impl Default for HostPage {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl HostPage {
    pub fn new(document: Document) -> Self {
        let (mutations, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        HostPage {
            document: Arc::new(RwLock::new(document)),
            generation: Arc::new(AtomicU64::new(0)),
            mutations,
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.document.read()
    }

    /// Incremented on every navigation; handles from older generations are stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Run `f` against the document and publish the resulting mutation records.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let (result, records) = {
            let mut doc = self.document.write();
            let result = f(&mut doc);
            (result, doc.take_records())
        };
        if !records.is_empty() {
            self.publish(records);
        }
        result
    }

    /// Replace the whole document, as a client-side navigation would.
    pub fn navigate(&self, document: Document) {
        let root = {
            let mut doc = self.document.write();
            *doc = document;
            doc.take_records();
            doc.root()
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "host page navigated");
        self.publish(vec![MutationRecord {
            target: root,
            kind: MutationKind::ChildList,
        }]);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MutationBatch> {
        self.mutations.subscribe()
    }

    fn publish(&self, records: Vec<MutationRecord>) {
        // No receivers simply means nobody is observing yet.
        let _ = self.mutations.send(MutationBatch {
            generation: self.generation(),
            records,
        });
    }
}
