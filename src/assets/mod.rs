//! Loading user photos and templates into rasters.

/// Decoding helpers built on the `image` crate.
pub mod decode;
/// Caller-facing image references.
pub mod source;
