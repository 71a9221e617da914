use std::sync::Arc;

use tracing::{debug, warn};

use crate::controller::filter::{FilterOutcome, UnitVerdict, classify_unit};
use crate::dom::dom_model::{Document, NodeId};
use crate::dom::host_page::HostPage;
use crate::engine::error::EngineError;
use crate::locator::locator::{ElementLocator, LocatedElement};
use crate::registry::registry::SelectorRegistry;
use crate::registry::registry_model::{KeywordCategory, RegionName};

const HIDDEN: &str = "none";

/// Hides, shows and filters named regions.
///
/// Nothing is cached between calls: every operation asks the locator again,
/// because the host page may have replaced the region's node since the last
/// call. Failures leave the region as it is (visible), with a warning.
pub struct RegionController {
    page: HostPage,
    locator: Arc<ElementLocator>,
    registry: Arc<SelectorRegistry>,
}

impl RegionController {
    pub fn new(
        page: HostPage,
        locator: Arc<ElementLocator>,
        registry: Arc<SelectorRegistry>,
    ) -> Self {
        RegionController {
            page,
            locator,
            registry,
        }
    }

    /// Hide every element of the region, waiting a bounded time for it to
    /// render. Returns whether anything was found.
    pub async fn hide(&self, region: &RegionName) -> Result<bool, EngineError> {
        let targets = self.resolve(region).await?;
        if targets.is_empty() {
            warn!(region = %region, "region not found, nothing hidden");
            return Ok(false);
        }
        let hidden = self.hide_now(&targets);
        debug!(region = %region, hidden, "region hidden");
        Ok(true)
    }

    /// Clear the inline display of every element of the region (and of feed
    /// units a filter pass hid). Never waits.
    pub async fn show(&self, region: &RegionName) -> Result<bool, EngineError> {
        let targets = fail_open(region, "show", self.locator.locate_all(region))?.unwrap_or_default();
        if targets.is_empty() {
            debug!(region = %region, "region not present, nothing to show");
            return Ok(false);
        }

        let filterable = region.supports_filter();
        self.page.mutate(|doc| {
            let nodes: Vec<NodeId> = live(doc, &targets).collect();
            for target in nodes {
                doc.set_display(target, None);
                if filterable {
                    let units = doc.element_children(target).to_vec();
                    for unit in units {
                        if doc.is_display_none(unit) {
                            doc.set_display(unit, None);
                        }
                    }
                }
            }
        });
        Ok(true)
    }

    /// True only when the region is present and every element of it is hidden.
    /// Never fails: anything that prevents the check reads as "not hidden".
    pub fn is_hidden(&self, region: &RegionName) -> bool {
        match self.locator.locate_all(region) {
            Ok(targets) if !targets.is_empty() => {
                let doc = self.page.read();
                targets.iter().all(|t| doc.is_display_none(t.node))
            }
            Ok(_) => false,
            Err(e) => {
                warn!(region = %region, error = %e, "hidden check failed");
                false
            }
        }
    }

    /// Keep or hide each post-like unit of the region by keyword rules.
    /// `Ok(None)` when the region cannot be filtered or was not found.
    pub async fn filter(&self, region: &RegionName) -> Result<Option<FilterOutcome>, EngineError> {
        if !region.supports_filter() {
            warn!(region = %region, "region does not support filtering");
            return Ok(None);
        }
        let timeout = self.locator.settings().default_timeout;
        let located = self.locator.locate(region, timeout).await?;
        let Some(container) = located else {
            warn!(region = %region, "region not found, nothing filtered");
            return Ok(None);
        };
        Ok(self.filter_now(&container))
    }

    /// Re-apply a hidden state from a coalesced change tick, without waiting.
    pub(crate) fn rehide_present(&self, region: &RegionName) -> usize {
        match fail_open(region, "rehide", self.locator.locate_all(region)) {
            Ok(Some(targets)) => self.hide_now(&targets),
            _ => 0,
        }
    }

    /// Re-apply a filter pass from a coalesced change tick, without waiting.
    pub(crate) fn refilter_present(&self, region: &RegionName) -> Option<FilterOutcome> {
        let container = fail_open(region, "refilter", self.locator.locate_now(region))
            .ok()
            .flatten()
            .flatten()?;
        self.filter_now(&container)
    }

    async fn resolve(&self, region: &RegionName) -> Result<Vec<LocatedElement>, EngineError> {
        let timeout = self.locator.settings().default_timeout;
        let Some(first) = self.locator.locate(region, timeout).await? else {
            return Ok(vec![]);
        };
        let mut all = fail_open(region, "resolve", self.locator.locate_all(region))?.unwrap_or_default();
        if all.is_empty() {
            all.push(first);
        }
        Ok(all)
    }

    fn hide_now(&self, targets: &[LocatedElement]) -> usize {
        self.page.mutate(|doc| {
            let nodes: Vec<NodeId> = live(doc, targets).collect();
            for node in &nodes {
                doc.set_display(*node, Some(HIDDEN));
            }
            nodes.len()
        })
    }

    fn filter_now(&self, container: &LocatedElement) -> Option<FilterOutcome> {
        if container.generation != self.page.generation() {
            return None;
        }
        let closeness = self.registry.keywords(KeywordCategory::Closeness);
        let suggested = self.registry.keywords(KeywordCategory::Suggested);

        self.page.mutate(|doc| {
            if !doc.is_connected(container.node) {
                return None;
            }
            doc.set_display(container.node, None);

            let mut outcome = FilterOutcome::default();
            let units = doc.element_children(container.node).to_vec();
            for unit in units {
                match classify_unit(&doc.text_content(unit), &closeness, &suggested) {
                    UnitVerdict::Keep => {
                        doc.set_display(unit, None);
                        outcome.kept += 1;
                    }
                    UnitVerdict::Hide => {
                        doc.set_display(unit, Some(HIDDEN));
                        outcome.hidden += 1;
                    }
                }
            }
            debug!(region = %container.region, kept = outcome.kept, hidden = outcome.hidden, "feed filtered");
            Some(outcome)
        })
    }
}

fn live<'a>(doc: &'a Document, targets: &'a [LocatedElement]) -> impl Iterator<Item = NodeId> + 'a {
    targets
        .iter()
        .map(|t| t.node)
        .filter(move |n| doc.is_connected(*n))
}

/// Let initialization-order errors through; turn anything else into "absent".
fn fail_open<T>(
    region: &RegionName,
    operation: &str,
    result: Result<T, EngineError>,
) -> Result<Option<T>, EngineError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_uninitialized() => Err(e),
        Err(e) => {
            warn!(region = %region, operation, error = %e, "region operation failed");
            Ok(None)
        }
    }
}
