pub mod defaults;
pub mod error;
pub mod registry;
pub mod registry_model;
pub mod source;
