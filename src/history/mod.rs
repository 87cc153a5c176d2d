//! Durable, observable history of saved creations.

/// Record type and display ordering.
pub mod record;
/// Append-only log with live subscriptions.
pub mod store;
