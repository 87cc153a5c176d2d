//! Encoding composed rasters and writing them to durable gallery storage.

/// JPEG encoding.
pub mod encode;
/// Naming, encoding and committing artifacts.
pub mod persistor;
/// Gallery storage contract and built-in backends.
pub mod storage;
