pub mod controller;
pub mod filter;
