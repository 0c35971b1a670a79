pub mod metrics;
pub mod updates;
