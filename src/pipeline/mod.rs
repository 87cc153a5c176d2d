//! Session state machine coordinating composition, persistence and history.

/// The coordinator itself.
pub mod coordinator;
/// States, status snapshots and events.
pub mod state;
/// Awaitable, cancellable operation handles.
pub mod task;
