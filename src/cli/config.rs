use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::engine::engine::{EngineSettings, FeedMode};
use crate::ledger::ledger::DEFAULT_PROMOTION_THRESHOLD;
use crate::locator::locator::LocatorSettings;
use crate::observer::observer::ObserverSettings;
use crate::registry::source::{ConfigSource, FileSource, HttpSource};
use crate::signature::signature_model::SignatureRules;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "bookcover",
    version,
    about = "Locate, hide and filter distracting regions of a social feed page"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: bookcover.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Selector document: a file path or an http(s) URL
    #[arg(long, global = true)]
    pub selectors: Option<String>,

    /// Override the locate timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a page snapshot for recurring unknown distraction patterns
    Scan {
        /// Page snapshot (JSON or YAML element tree)
        #[arg(long)]
        snapshot: String,

        /// Number of scan passes to simulate
        #[arg(long, default_value_t = 3)]
        passes: u32,
    },

    /// Filter the units of a region by keyword rules
    Filter {
        #[arg(long)]
        snapshot: String,

        /// Region to filter
        #[arg(long, default_value = "feed")]
        region: String,
    },

    /// Hide every configured region and report what was found
    Hide {
        #[arg(long)]
        snapshot: String,
    },

    /// Send one control-channel JSON request against a snapshot
    Control {
        #[arg(long)]
        snapshot: String,

        /// Request body, e.g. {"action":"toggleDistractions","show":false}
        #[arg(long)]
        request: String,
    },

    /// Print the resolved selector registry
    Regions,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `bookcover.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub selectors: SelectorSourceConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_locate_timeout_ms")]
    pub locate_timeout_ms: u64,

    #[serde(default = "default_threshold")]
    pub promotion_threshold: u64,

    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,

    #[serde(default)]
    pub feed_mode: FeedMode,

    #[serde(default = "default_observed_attributes")]
    pub observed_attributes: Vec<String>,

    #[serde(default = "default_signature_attributes")]
    pub signature_attributes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            locate_timeout_ms: default_locate_timeout_ms(),
            promotion_threshold: default_threshold(),
            reload_interval_secs: default_reload_interval_secs(),
            feed_mode: FeedMode::default(),
            observed_attributes: default_observed_attributes(),
            signature_attributes: default_signature_attributes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSourceConfig {
    pub path: Option<String>,
    pub url: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for SelectorSourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            url: None,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportConfig {
    /// Append confirmed patterns as JSON lines to this file
    pub jsonl_path: Option<String>,
}

// Serde default helpers
fn default_debounce_ms() -> u64 { 1000 }
fn default_poll_interval_ms() -> u64 { 100 }
fn default_locate_timeout_ms() -> u64 { 5000 }
fn default_threshold() -> u64 { DEFAULT_PROMOTION_THRESHOLD }
fn default_reload_interval_secs() -> u64 { 24 * 60 * 60 }
fn default_http_timeout_secs() -> u64 { 10 }
fn default_observed_attributes() -> Vec<String> {
    ObserverSettings::default().observed_attributes
}
fn default_signature_attributes() -> Vec<String> {
    SignatureRules::default().attributes
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("bookcover.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

impl AppConfig {
    pub fn engine_settings(&self, timeout_override_ms: Option<u64>) -> EngineSettings {
        let engine = &self.engine;
        EngineSettings {
            locator: LocatorSettings {
                poll_interval: Duration::from_millis(engine.poll_interval_ms),
                default_timeout: Duration::from_millis(
                    timeout_override_ms.unwrap_or(engine.locate_timeout_ms),
                ),
            },
            observer: ObserverSettings {
                debounce: Duration::from_millis(engine.debounce_ms),
                observed_attributes: engine
                    .observed_attributes
                    .iter()
                    .map(|a| a.to_ascii_lowercase())
                    .collect(),
            },
            promotion_threshold: engine.promotion_threshold,
            reload_interval: Duration::from_secs(engine.reload_interval_secs),
            feed_mode: engine.feed_mode,
            signature_rules: SignatureRules {
                attributes: engine
                    .signature_attributes
                    .iter()
                    .map(|a| a.to_ascii_lowercase())
                    .collect(),
            },
        }
    }

    /// Selector source: CLI value first, then config url, then config path.
    pub fn config_source(&self, cli_selectors: Option<&str>) -> Option<Arc<dyn ConfigSource>> {
        let timeout = Duration::from_secs(self.selectors.http_timeout_secs);
        let location = cli_selectors
            .map(str::to_string)
            .or_else(|| self.selectors.url.clone())
            .or_else(|| self.selectors.path.clone())?;

        if location.starts_with("http://") || location.starts_with("https://") {
            Some(Arc::new(HttpSource::new(&location, timeout)))
        } else {
            Some(Arc::new(FileSource::new(location)))
        }
    }
}
