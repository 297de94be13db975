pub mod aggregator;
pub mod line_filter;
pub mod pool;

pub use aggregator::{Aggregator, FileFailure, FilterResult, Fingerprint, RunResults};
pub use line_filter::LineFilter;
pub use pool::{process_task, WorkerPool};
