/// Command-line interface and batch request processing
pub mod cli;
/// Caller-side collection assembled from job updates
pub mod collection;
/// Generation constants and defaults
pub mod configuration;
/// Error types and result alias
pub mod error;
/// Logging setup
pub mod logging;
/// Messages streamed from a job to its caller
pub mod message;
/// Progress bars for request processing
pub mod progress;
/// Background generation jobs
pub mod worker;
