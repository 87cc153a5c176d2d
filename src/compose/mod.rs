//! Photo-on-template compositing.

/// Placement geometry and the pure `compose` operation.
pub mod compositor;
