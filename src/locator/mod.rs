pub mod locator;
pub mod wait;
