pub mod dom_model;
pub mod host_page;
pub mod selector;
pub mod snapshot;
