pub mod analyzer;
pub mod collector;
pub mod dataset_writer;
pub mod progress;

pub use collector::{BatchCollector, CancelFlag};
pub use dataset_writer::DatasetWriter;
pub use progress::{LogReporter, ProgressReporter, SilentReporter};
