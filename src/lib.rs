//! Random greedy generation of unique layered collections
//!
//! A catalog of layers, each holding interchangeable pieces, is turned into a
//! collection of distinct images. Pieces and layers carry tags that may block
//! one another, usage limits that cap how often they appear, and required flags
//! that every image must satisfy. Favorites are emitted first and verbatim.

#![forbid(unsafe_code)]

/// Candidate building, quota tracking, uniqueness and the generation driver
pub mod algorithm;
/// Request payloads, the validated catalog and favorites
pub mod catalog;
/// Input/output, background jobs, configuration and error handling
pub mod io;

pub use io::error::{GenerationError, Result};
