use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::controller::controller::RegionController;
use crate::dom::host_page::HostPage;
use crate::engine::control::{ControlRequest, ControlResponse};
use crate::engine::error::EngineError;
use crate::ledger::ledger::{DEFAULT_PROMOTION_THRESHOLD, PatternLedger, PatternReport};
use crate::ledger::sink::ReportSink;
use crate::locator::locator::{ElementLocator, LocatorSettings};
use crate::observer::observer::{ChangeObserver, ObserverSettings};
use crate::registry::registry::{DEFAULT_RELOAD_INTERVAL, SelectorRegistry};
use crate::registry::registry_model::RegionName;
use crate::registry::source::ConfigSource;
use crate::signature::candidates::candidates_of;
use crate::signature::fingerprint::signature_of;
use crate::signature::signature_model::SignatureRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Hide the whole feed.
    #[default]
    Hide,
    /// Keep the feed but hide units that fail the keyword rules.
    Filter,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub locator: LocatorSettings,
    pub observer: ObserverSettings,
    pub promotion_threshold: u64,
    pub reload_interval: Duration,
    pub feed_mode: FeedMode,
    pub signature_rules: SignatureRules,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            locator: LocatorSettings::default(),
            observer: ObserverSettings::default(),
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
            reload_interval: DEFAULT_RELOAD_INTERVAL,
            feed_mode: FeedMode::default(),
            signature_rules: SignatureRules::default(),
        }
    }
}

/// Visibility the user last asked for; re-applied on every change tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Untouched,
    Hidden,
    Shown,
}

/// Outcome of applying hide/show to one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionResult {
    pub region: RegionName,
    pub applied: bool,
}

struct EngineInner {
    page: HostPage,
    settings: EngineSettings,
    registry: Arc<SelectorRegistry>,
    locator: Arc<ElementLocator>,
    controller: RegionController,
    observer: ChangeObserver,
    ledger: Mutex<PatternLedger>,
    initialized: AtomicBool,
    // Serializes overlapping initialize calls across the config load.
    init_lock: tokio::sync::Mutex<()>,
    visibility: Mutex<Visibility>,
}

/// Explicitly constructed context that owns one page's registry, locator,
/// observer, ledger and controller. Engines share nothing with each other.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(
        page: HostPage,
        settings: EngineSettings,
        source: Option<Arc<dyn ConfigSource>>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let registry = Arc::new(SelectorRegistry::new(source, settings.reload_interval));
        let locator = Arc::new(ElementLocator::new(
            page.clone(),
            registry.clone(),
            settings.locator.clone(),
        ));
        let controller = RegionController::new(page.clone(), locator.clone(), registry.clone());
        let observer = ChangeObserver::new(settings.observer.clone());
        let ledger = Mutex::new(PatternLedger::new(settings.promotion_threshold, sink));

        Engine {
            inner: Arc::new(EngineInner {
                page,
                settings,
                registry,
                locator,
                controller,
                observer,
                ledger,
                initialized: AtomicBool::new(false),
                init_lock: tokio::sync::Mutex::new(()),
                visibility: Mutex::new(Visibility::Untouched),
            }),
        }
    }

    pub fn page(&self) -> &HostPage {
        &self.inner.page
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub fn registry(&self) -> &SelectorRegistry {
        &self.inner.registry
    }

    pub fn locator(&self) -> &ElementLocator {
        &self.inner.locator
    }

    pub fn controller(&self) -> &RegionController {
        &self.inner.controller
    }

    pub fn observer(&self) -> &ChangeObserver {
        &self.inner.observer
    }

    pub fn visibility(&self) -> Visibility {
        *self.inner.visibility.lock()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Load configuration, then start watching the page. Idempotent.
    ///
    /// A missing or broken configuration source is not an error: the built-in
    /// selectors stay in use.
    pub async fn initialize(&self) {
        let _claim = self.inner.init_lock.lock().await;
        if self.is_initialized() {
            return;
        }

        let loaded = self.inner.registry.load().await;
        self.inner.locator.mark_initialized();

        // Subscribers run in this order on every coalesced tick.
        let weak = Arc::downgrade(&self.inner);
        self.inner.observer.subscribe(move || {
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.scan();
            }
        });
        let weak = Arc::downgrade(&self.inner);
        self.inner.observer.subscribe(move || {
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.reapply();
                inner.refresh_config_in_background();
            }
        });
        self.inner.observer.connect(&self.inner.page);

        self.inner.initialized.store(true, Ordering::SeqCst);
        info!(
            external_config = loaded,
            regions = self.inner.registry.regions().len(),
            "engine initialized"
        );
    }

    /// Stop observing the page and abort pending waits. Idempotent.
    pub fn shutdown(&self) {
        self.inner.observer.disconnect();
        self.inner.locator.mark_uninitialized();
        self.inner.locator.cancel_waits();
        if self.inner.initialized.swap(false, Ordering::SeqCst) {
            info!("engine shut down");
        }
    }

    /// One candidate → signature → ledger pass over the current document.
    pub fn scan(&self) -> Result<Vec<PatternReport>, EngineError> {
        if !self.inner.locator.is_initialized() {
            return Err(EngineError::Uninitialized { operation: "scan" });
        }
        Ok(self.inner.scan())
    }

    pub fn pattern_count(&self) -> usize {
        self.inner.ledger.lock().len()
    }

    pub fn confirmed_pattern_count(&self) -> usize {
        self.inner.ledger.lock().confirmed().count()
    }

    pub async fn hide_distractions(&self) -> Result<Vec<RegionResult>, EngineError> {
        let results = self.apply(Visibility::Hidden).await?;
        *self.inner.visibility.lock() = Visibility::Hidden;
        Ok(results)
    }

    pub async fn show_distractions(&self) -> Result<Vec<RegionResult>, EngineError> {
        let results = self.apply(Visibility::Shown).await?;
        *self.inner.visibility.lock() = Visibility::Shown;
        Ok(results)
    }

    async fn apply(&self, visibility: Visibility) -> Result<Vec<RegionResult>, EngineError> {
        let regions = self.inner.registry.regions();
        let feed_mode = self.inner.settings.feed_mode;
        let controller = &self.inner.controller;

        let outcomes = join_all(regions.iter().map(|region| async move {
            let applied = match visibility {
                Visibility::Shown => controller.show(region).await?,
                _ if region.supports_filter() && feed_mode == FeedMode::Filter => {
                    controller.filter(region).await?.is_some()
                }
                _ => controller.hide(region).await?,
            };
            Ok::<_, EngineError>(RegionResult {
                region: region.clone(),
                applied,
            })
        }))
        .await;

        outcomes.into_iter().collect()
    }

    /// Serve one control-channel request.
    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        let result = match request {
            ControlRequest::ToggleDistractions { show: true } => self.show_distractions().await,
            ControlRequest::ToggleDistractions { show: false } => self.hide_distractions().await,
        };
        match result {
            Ok(_) => ControlResponse::ok(),
            Err(e) => {
                warn!(error = %e, "control request failed");
                ControlResponse::failed(e)
            }
        }
    }

    /// JSON in, JSON out. Unknown or malformed requests get `success: false`.
    pub async fn handle_json(&self, request: &str) -> String {
        let response = match serde_json::from_str::<ControlRequest>(request) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                debug!(error = %e, "rejected control message");
                ControlResponse::failed(format!("unsupported request: {e}"))
            }
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|_| r#"{"success":false,"error":"serialization failed"}"#.to_string())
    }
}

impl EngineInner {
    fn scan(&self) -> Vec<PatternReport> {
        let keywords = self.registry.keywords_for_distraction();
        let rules = &self.settings.signature_rules;
        let doc = self.page.read();
        let mut ledger = self.ledger.lock();

        let mut scanned = 0usize;
        let reports: Vec<PatternReport> = candidates_of(&doc, &keywords)
            .filter_map(|node| {
                scanned += 1;
                let signature = signature_of(&doc, node, rules);
                ledger.observe(signature, &doc, node)
            })
            .collect();

        debug!(candidates = scanned, known = ledger.len(), promoted = reports.len(), "pattern scan");
        reports
    }

    /// Keep hidden regions hidden after the host page re-renders them.
    fn reapply(&self) {
        if *self.visibility.lock() != Visibility::Hidden {
            return;
        }
        for region in self.registry.regions() {
            if region.supports_filter() && self.settings.feed_mode == FeedMode::Filter {
                self.controller.refilter_present(&region);
            } else {
                let count = self.controller.rehide_present(&region);
                if count > 0 {
                    debug!(region = %region, count, "re-applied hidden state");
                }
            }
        }
    }

    fn refresh_config_in_background(&self) {
        if !self.registry.is_stale() {
            return;
        }
        let registry = self.registry.clone();
        tokio::spawn(async move {
            registry.refresh_if_stale().await;
        });
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.observer.disconnect();
        self.locator.cancel_waits();
    }
}
