/// Shuffled output numbers handed to accepted images
pub mod allocator;
/// Fixed-width tag sets used for conflict checks
pub mod bitset;
/// Candidate assembly under tag constraints
pub mod builder;
/// Generation driver and run lifecycle
pub mod executor;
/// Canonical keys and the set of accepted keys
pub mod ledger;
/// Per-run usage limits and the forced-pick queue
pub mod quota;
