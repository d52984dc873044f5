//! Generation constants and runtime configuration defaults

// Batching amortizes channel traffic and bounds progress granularity
/// Number of accepted images collected before a batch is emitted
pub const FLUSH_THRESHOLD: usize = 1000;

/// Fixed seed for reproducible generation
pub const DEFAULT_SEED: u64 = 42;

/// Separator placed between piece identifiers in a canonical key string
pub const KEY_SEPARATOR: char = '\u{1f}';

// Progress bar display settings
/// Threshold for switching to batch progress mode
pub const MAX_INDIVIDUAL_PROGRESS_BARS: usize = 5;

// Output settings
/// Suffix added to output filenames
pub const OUTPUT_SUFFIX: &str = "_collection";
/// Extension of request and output files
pub const REQUEST_EXTENSION: &str = "json";

/// Default `tracing` level for the binary
pub const DEFAULT_LOG_LEVEL: &str = "warn";
