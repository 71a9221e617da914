use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dom::dom_model::{Document, NodeId};
use crate::dom::host_page::HostPage;
use crate::engine::error::EngineError;
use crate::locator::wait::{WaitOutcome, poll_until};
use crate::registry::registry::SelectorRegistry;
use crate::registry::registry_model::{Predicate, RegionName};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_millis(5000);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A node that satisfied one of a region's predicates at a point in time.
///
/// Only valid for the document generation it was found in, and only while
/// the node stays attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedElement {
    pub node: NodeId,
    pub region: RegionName,
    pub predicate: String,
    pub generation: u64,
}

impl LocatedElement {
    pub fn is_live(&self, page: &HostPage) -> bool {
        page.generation() == self.generation && page.read().is_connected(self.node)
    }
}

#[derive(Debug, Clone)]
pub struct LocatorSettings {
    pub poll_interval: Duration,
    pub default_timeout: Duration,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        LocatorSettings {
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_timeout: DEFAULT_LOCATE_TIMEOUT,
        }
    }
}

/// Resolves region names to live elements, waiting a bounded time for
/// regions the host page renders asynchronously.
pub struct ElementLocator {
    page: HostPage,
    registry: Arc<SelectorRegistry>,
    settings: LocatorSettings,
    initialized: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl ElementLocator {
    pub fn new(page: HostPage, registry: Arc<SelectorRegistry>, settings: LocatorSettings) -> Self {
        ElementLocator {
            page,
            registry,
            settings,
            initialized: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn settings(&self) -> &LocatorSettings {
        &self.settings
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn mark_uninitialized(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Abort in-flight waits; they resolve as not found. Later calls wait normally.
    pub fn cancel_waits(&self) {
        let previous = std::mem::replace(&mut *self.cancel.lock(), CancellationToken::new());
        previous.cancel();
    }

    fn ensure_initialized(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(EngineError::Uninitialized { operation })
        }
    }

    /// First element, in predicate priority then document order, waiting up to
    /// `timeout` for it to appear. `Ok(None)` means the region is absent.
    pub async fn locate(
        &self,
        region: &RegionName,
        timeout: Duration,
    ) -> Result<Option<LocatedElement>, EngineError> {
        self.ensure_initialized("locate")?;

        let predicates = self.registry.predicates_for(region);
        if predicates.is_empty() {
            debug!(region = %region, "no predicates configured");
            return Ok(None);
        }

        let started = Instant::now();
        let deadline = started + timeout;
        let interval = self.settings.poll_interval.max(MIN_POLL_INTERVAL);
        let cancel = self.cancel.lock().clone();

        let found = poll_until(deadline, interval, &cancel, || {
            self.find_first(region, &predicates)
        })
        .await;

        match found {
            Ok(located) => {
                debug!(
                    region = %region,
                    predicate = %located.predicate,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "region located"
                );
                Ok(Some(located))
            }
            Err(WaitOutcome::TimedOut) => {
                debug!(region = %region, timeout_ms = timeout.as_millis() as u64, "region not found");
                Ok(None)
            }
            Err(WaitOutcome::Cancelled) => {
                debug!(region = %region, "locate cancelled");
                Ok(None)
            }
        }
    }

    /// [`locate`](Self::locate) with the configured default timeout.
    pub async fn locate_default(
        &self,
        region: &RegionName,
    ) -> Result<Option<LocatedElement>, EngineError> {
        self.locate(region, self.settings.default_timeout).await
    }

    /// Single probe in predicate priority order. Never waits.
    pub(crate) fn locate_now(
        &self,
        region: &RegionName,
    ) -> Result<Option<LocatedElement>, EngineError> {
        self.ensure_initialized("locate")?;
        let predicates = self.registry.predicates_for(region);
        Ok(self.find_first(region, &predicates))
    }

    /// Every element matching any of the region's predicates, deduplicated,
    /// in document order. Never waits.
    pub fn locate_all(&self, region: &RegionName) -> Result<Vec<LocatedElement>, EngineError> {
        self.ensure_initialized("locate_all")?;

        let predicates = self.registry.predicates_for(region);
        if predicates.is_empty() {
            return Ok(vec![]);
        }

        let generation = self.page.generation();
        let doc = self.page.read();
        let located = doc
            .elements()
            .filter_map(|node| {
                predicates
                    .iter()
                    .find(|p| p.matches(&doc, node))
                    .map(|p| LocatedElement {
                        node,
                        region: region.clone(),
                        predicate: p.to_string(),
                        generation,
                    })
            })
            .collect();
        Ok(located)
    }

    fn find_first(&self, region: &RegionName, predicates: &[Predicate]) -> Option<LocatedElement> {
        let generation = self.page.generation();
        let doc = self.page.read();
        first_match(&doc, predicates).map(|(node, predicate)| LocatedElement {
            node,
            region: region.clone(),
            predicate: predicate.to_string(),
            generation,
        })
    }
}

fn first_match<'p>(doc: &Document, predicates: &'p [Predicate]) -> Option<(NodeId, &'p Predicate)> {
    predicates
        .iter()
        .find_map(|p| p.first_match(doc).map(|node| (node, p)))
}
