//! Analysis orchestration: stage wiring, progress protocol and the
//! aggregate report.

pub mod orchestrator;
pub mod progress;
pub mod report;

pub use orchestrator::Analyzer;
pub use progress::{CollectingSink, LogSink, NullSink, ProgressEvent, ProgressSink};
pub use report::{aggregate_feedback, build_result};
