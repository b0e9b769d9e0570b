//! Counters, snapshots and the background aggregator.

mod aggregator;
mod counters;
mod sampler;
mod snapshot;

pub use aggregator::{Aggregator, StatsSources};
pub use counters::Counters;
pub use snapshot::StatsSnapshot;
