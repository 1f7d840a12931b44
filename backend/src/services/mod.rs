pub mod analytics;
pub mod cache;
pub mod coordinator;
pub mod progress;
pub mod source;
pub mod store;
