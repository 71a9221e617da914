//! Drift-tolerant location, hiding and filtering of distracting regions on a
//! social feed page, plus discovery of recurring distraction patterns.

pub mod cli;
pub mod controller;
pub mod dom;
pub mod engine;
pub mod ledger;
pub mod locator;
pub mod observer;
pub mod registry;
pub mod report;
pub mod signature;

pub use dom::host_page::HostPage;
pub use engine::control::{ControlRequest, ControlResponse};
pub use engine::engine::{Engine, EngineSettings, FeedMode};
pub use engine::error::EngineError;
pub use registry::registry_model::RegionName;
