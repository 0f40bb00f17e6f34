//! Error types produced while composing workload specifications.

mod aggregate;
mod constructors;
mod conversions;
mod types;

pub use aggregate::AggregatedErrors;
pub use types::ComposeError;
