//! Shared building blocks: pixel buffers, locators, errors and cancellation.

/// Cooperative cancellation token.
pub mod cancel;
/// Raster and locator types.
pub mod core;
/// Error taxonomy.
pub mod error;
