pub mod ledger;
pub mod selectors;
pub mod sink;
