#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bookcover::dom::dom_model::{Document, NodeId};
use bookcover::dom::host_page::HostPage;
use bookcover::dom::snapshot::NodeSnapshot;
use bookcover::engine::engine::{Engine, EngineSettings};
use bookcover::ledger::sink::MemorySink;
use bookcover::registry::error::ConfigError;
use bookcover::registry::registry_model::SelectorDocument;
use bookcover::registry::source::{ConfigSource, parse_document};

/// Feed container with one close-contact post and one suggested post.
pub fn feed_snapshot() -> NodeSnapshot {
    NodeSnapshot::new("div")
        .attr("role", "feed")
        .child(
            NodeSnapshot::new("div")
                .attr("data-pagelet", "FeedUnit_0")
                .text("Friend post"),
        )
        .child(
            NodeSnapshot::new("div")
                .attr("data-pagelet", "FeedUnit_1")
                .text("Suggested for you"),
        )
}

pub fn reels_snapshot() -> NodeSnapshot {
    NodeSnapshot::new("div")
        .attr("aria-label", "Reels")
        .child(NodeSnapshot::new("span").text("Watch reels"))
}

pub fn stories_snapshot() -> NodeSnapshot {
    NodeSnapshot::new("div")
        .attr("data-pagelet", "Stories")
        .child(NodeSnapshot::new("span").text("Create a story"))
}

/// A page with every built-in region present.
pub fn full_page() -> Document {
    NodeSnapshot::new("body")
        .child(stories_snapshot())
        .child(reels_snapshot())
        .child(feed_snapshot())
        .into_document()
}

/// Recurring "Suggested for you" block, rendered `count` times with different text.
pub fn suggested_blocks(count: usize) -> Document {
    let mut body = NodeSnapshot::new("body");
    for i in 0..count {
        body = body.child(
            NodeSnapshot::new("div")
                .attr("role", "article")
                .attr("class", "card promo")
                .child(NodeSnapshot::new("h3").text("Suggested for you"))
                .child(NodeSnapshot::new("span").attr("class", "name").text(&format!("Page {i}"))),
        );
    }
    body.into_document()
}

pub fn first(doc: &Document, selector: &str) -> NodeId {
    doc.query_selector(selector)
        .expect("valid selector")
        .expect("element present")
}

pub fn engine_on(page: HostPage) -> (Engine, Arc<MemorySink>) {
    engine_with(page, EngineSettings::default(), None)
}

pub fn engine_with(
    page: HostPage,
    settings: EngineSettings,
    source: Option<Arc<dyn ConfigSource>>,
) -> (Engine, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let engine = Engine::new(page, settings, source, sink.clone());
    (engine, sink)
}

/// Config source that takes `delay` to answer, counting fetches.
pub struct SlowSource {
    pub fetches: AtomicUsize,
    delay: Duration,
    content: String,
}

impl SlowSource {
    pub fn new(delay: Duration, content: &str) -> Self {
        SlowSource {
            fetches: AtomicUsize::new(0),
            delay,
            content: content.to_string(),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigSource for SlowSource {
    fn name(&self) -> String {
        "slow".into()
    }

    async fn fetch(&self) -> Result<SelectorDocument, ConfigError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        parse_document("slow", &self.content)
    }
}
