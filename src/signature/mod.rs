pub mod candidates;
pub mod fingerprint;
pub mod signature_model;
