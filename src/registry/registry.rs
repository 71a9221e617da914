use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::registry::defaults::default_snapshot;
use crate::registry::error::ConfigError;
use crate::registry::registry_model::{
    ConfigOrigin, KeywordCategory, KeywordSpec, Predicate, RegionName, RegistrySnapshot,
    SelectorDocument,
};
use crate::registry::source::ConfigSource;

pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Region → predicate mapping plus keyword sets, loaded from an external source.
///
/// Readers always get a complete snapshot. A reload fetches outside any lock
/// and swaps the snapshot in afterwards, so reads never wait on the source.
pub struct SelectorRegistry {
    source: Option<Arc<dyn ConfigSource>>,
    current: RwLock<Arc<RegistrySnapshot>>,
    last_refresh: Mutex<Option<Instant>>,
    reloading: AtomicBool,
    reload_interval: Duration,
}

impl SelectorRegistry {
    pub fn new(source: Option<Arc<dyn ConfigSource>>, reload_interval: Duration) -> Self {
        SelectorRegistry {
            source,
            current: RwLock::new(Arc::new(default_snapshot())),
            last_refresh: Mutex::new(None),
            reloading: AtomicBool::new(false),
            reload_interval,
        }
    }

    /// Registry that only ever serves the built-in defaults.
    pub fn with_defaults() -> Self {
        Self::new(None, DEFAULT_RELOAD_INTERVAL)
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().clone()
    }

    pub fn predicates_for(&self, region: &RegionName) -> Vec<Predicate> {
        self.snapshot()
            .predicates
            .get(region)
            .cloned()
            .unwrap_or_default()
    }

    pub fn keywords_for_distraction(&self) -> BTreeSet<String> {
        self.keywords(KeywordCategory::Distraction)
    }

    pub fn keywords(&self, category: KeywordCategory) -> BTreeSet<String> {
        self.snapshot().keywords(category)
    }

    pub fn regions(&self) -> Vec<RegionName> {
        self.snapshot().predicates.keys().cloned().collect()
    }

    pub fn origin(&self) -> ConfigOrigin {
        self.snapshot().origin.clone()
    }

    /// Fetch from the source now. Returns true when a new snapshot was installed.
    ///
    /// On failure the current snapshot stays in place.
    pub async fn load(&self) -> bool {
        *self.last_refresh.lock() = Some(Instant::now());

        let Some(source) = self.source.clone() else {
            debug!("no config source configured, using built-in selectors");
            return false;
        };

        let name = source.name();
        let result = source
            .fetch()
            .await
            .and_then(|doc| build_snapshot(&name, &doc));

        match result {
            Ok(snapshot) => {
                info!(
                    source = %name,
                    regions = snapshot.predicates.len(),
                    predicates = snapshot.predicate_count(),
                    "selector config loaded"
                );
                *self.current.write() = Arc::new(snapshot);
                true
            }
            Err(e) => {
                warn!(source = %name, error = %e, "config unavailable, keeping current selectors");
                false
            }
        }
    }

    /// Reload if the interval has elapsed since the last attempt and no other
    /// reload is in flight.
    pub async fn refresh_if_stale(&self) -> bool {
        if !self.is_stale() {
            return false;
        }
        if self
            .reloading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("config reload already in flight");
            return false;
        }
        let _release = ReloadClaim(&self.reloading);
        self.load().await
    }

    pub fn is_stale(&self) -> bool {
        match *self.last_refresh.lock() {
            None => true,
            Some(at) => at.elapsed() >= self.reload_interval,
        }
    }
}

/// Clears the in-flight flag even when the reload future is dropped mid-fetch.
struct ReloadClaim<'a>(&'a AtomicBool);

impl Drop for ReloadClaim<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Merge a configuration document over the built-in defaults.
///
/// Regions named in the document replace the default predicates for that
/// region; keyword categories present in the document replace the default set.
pub fn build_snapshot(
    origin: &str,
    doc: &SelectorDocument,
) -> Result<RegistrySnapshot, ConfigError> {
    let mut snapshot = default_snapshot();
    let mut loaded_predicates = 0;

    for (name, spec) in &doc.selectors {
        let region = RegionName::from(name.as_str());
        let mut predicates = Vec::new();
        for entry in spec.entries() {
            match entry.to_predicate() {
                Ok(p) => predicates.push(p),
                Err(e) => warn!(region = %region, error = %e, "skipping invalid predicate"),
            }
        }
        if predicates.is_empty() {
            continue;
        }
        loaded_predicates += predicates.len();
        snapshot.predicates.insert(region, predicates);
    }

    let categorized = match &doc.keywords {
        KeywordSpec::Flat(words) => vec![(KeywordCategory::Distraction, words.clone())],
        KeywordSpec::Categorized(map) => map
            .iter()
            .filter_map(|(name, words)| match KeywordCategory::parse(name) {
                Some(category) => Some((category, words.clone())),
                None => {
                    warn!(category = %name, "ignoring unknown keyword category");
                    None
                }
            })
            .collect(),
    };
    let mut loaded_keywords = 0;
    for (category, words) in categorized {
        let set: BTreeSet<String> = words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        if set.is_empty() {
            continue;
        }
        loaded_keywords += set.len();
        snapshot.keywords.insert(category, set);
    }

    if loaded_predicates == 0 && loaded_keywords == 0 {
        return Err(ConfigError::Empty(origin.to_string()));
    }

    snapshot.origin = ConfigOrigin::Loaded(origin.to_string());
    Ok(snapshot)
}
