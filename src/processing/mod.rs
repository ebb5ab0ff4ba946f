//! Position sample processing

pub mod aggregator;

pub use aggregator::{aggregate, AggregatedPoint, AveragingWindow, SampleAggregator};
