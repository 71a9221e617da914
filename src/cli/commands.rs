use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::cli::config::AppConfig;
use crate::dom::dom_model::Document;
use crate::dom::host_page::HostPage;
use crate::dom::snapshot::load_snapshot;
use crate::engine::engine::Engine;
use crate::ledger::sink::{FanoutSink, JsonlSink, ReportSink, TracingSink};
use crate::registry::registry_model::RegionName;
use crate::report::console::{
    format_filter_outcome, format_region_results, format_registry, format_scan_report,
};

/// Global options every subcommand shares.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub selectors: Option<String>,
    pub timeout_ms: Option<u64>,
}

// ============================================================================
// scan subcommand
// ============================================================================

/// Scan a snapshot `passes` times, re-rendering it between passes, and print
/// the patterns that crossed the promotion threshold.
pub async fn cmd_scan(
    config: &AppConfig,
    options: &RunOptions,
    snapshot: &str,
    passes: u32,
) -> anyhow::Result<()> {
    let engine = start_engine(config, options, read_snapshot(snapshot)?).await;

    let mut reports = Vec::new();
    for pass in 0..passes {
        if pass > 0 {
            engine.page().navigate(read_snapshot(snapshot)?);
        }
        reports.extend(engine.scan()?);
    }
    let tracked = engine.pattern_count();
    engine.shutdown();

    print!("{}", format_scan_report(passes, &reports, tracked));
    Ok(())
}

// ============================================================================
// filter subcommand
// ============================================================================

pub async fn cmd_filter(
    config: &AppConfig,
    options: &RunOptions,
    snapshot: &str,
    region: &str,
) -> anyhow::Result<()> {
    let region = RegionName::from(region);
    let engine = start_engine(config, options, read_snapshot(snapshot)?).await;

    let outcome = engine.controller().filter(&region).await?;
    engine.shutdown();

    print!("{}", format_filter_outcome(&region, outcome.as_ref()));
    Ok(())
}

// ============================================================================
// hide subcommand
// ============================================================================

pub async fn cmd_hide(config: &AppConfig, options: &RunOptions, snapshot: &str) -> anyhow::Result<()> {
    let engine = start_engine(config, options, read_snapshot(snapshot)?).await;

    let results = engine.hide_distractions().await?;
    let rows: Vec<_> = results
        .into_iter()
        .map(|r| {
            let hidden = engine.controller().is_hidden(&r.region);
            (r, hidden)
        })
        .collect();
    engine.shutdown();

    print!("{}", format_region_results(&rows));
    Ok(())
}

// ============================================================================
// control subcommand
// ============================================================================

/// Feed one JSON request through the control channel and print the JSON reply.
pub async fn cmd_control(
    config: &AppConfig,
    options: &RunOptions,
    snapshot: &str,
    request: &str,
) -> anyhow::Result<bool> {
    let engine = start_engine(config, options, read_snapshot(snapshot)?).await;

    let response = engine.handle_json(request).await;
    engine.shutdown();

    println!("{}", response);
    let success = serde_json::from_str::<serde_json::Value>(&response)
        .ok()
        .and_then(|v| v["success"].as_bool())
        .unwrap_or(false);
    Ok(success)
}

// ============================================================================
// regions subcommand
// ============================================================================

pub async fn cmd_regions(config: &AppConfig, options: &RunOptions) -> anyhow::Result<()> {
    let engine = start_engine(config, options, Document::new()).await;
    let snapshot = engine.registry().snapshot();
    engine.shutdown();

    print!("{}", format_registry(&snapshot));
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn read_snapshot(path: &str) -> anyhow::Result<Document> {
    load_snapshot(Path::new(path)).with_context(|| format!("loading page snapshot {path}"))
}

/// Build the report sink chain: structured logs always, JSON lines when configured.
pub fn build_sink(config: &AppConfig) -> Arc<dyn ReportSink> {
    let mut sinks: Vec<Arc<dyn ReportSink>> = vec![Arc::new(TracingSink)];
    if let Some(path) = &config.report.jsonl_path {
        let jsonl = JsonlSink::new(Path::new(path));
        if jsonl.is_enabled() {
            sinks.push(Arc::new(jsonl));
        }
    }
    Arc::new(FanoutSink::new(sinks))
}

async fn start_engine(config: &AppConfig, options: &RunOptions, document: Document) -> Engine {
    let settings = config.engine_settings(options.timeout_ms);
    let source = config.config_source(options.selectors.as_deref());
    if let Some(source) = &source {
        info!(source = %source.name(), "using external selector configuration");
    }

    let engine = Engine::new(HostPage::new(document), settings, source, build_sink(config));
    engine.initialize().await;
    engine
}
