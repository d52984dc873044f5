/// Favorite images that are emitted before any random candidate
pub mod favorites;
/// Validated, index-based catalog built from a request
pub mod model;
/// Request payload and its JSON form
pub mod request;
