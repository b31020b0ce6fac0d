pub mod metrics;
pub mod moltype;
