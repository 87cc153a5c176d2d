//! Bounded feed of remote image descriptors.

/// Feed sources and the descriptor type.
pub mod source;

use std::sync::Arc;

use crate::foundation::error::LuminaResult;
use source::{ImageSource, RemoteImage};

/// Default number of entries a feed keeps.
pub const DEFAULT_FEED_LIMIT: usize = 20;

/// Holds the most recent successful fetch from an [`ImageSource`], truncated to `limit`.
#[derive(Debug)]
pub struct Feed<S> {
    source: S,
    limit: usize,
    entries: Arc<[RemoteImage]>,
}

impl<S: ImageSource> Feed<S> {
    /// Create an empty feed with the default limit.
    pub fn new(source: S) -> Self {
        Self::with_limit(source, DEFAULT_FEED_LIMIT)
    }

    /// Create an empty feed keeping at most `limit` entries.
    pub fn with_limit(source: S, limit: usize) -> Self {
        Self {
            source,
            limit,
            entries: Arc::from(Vec::new()),
        }
    }

    /// Maximum number of entries kept.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Entries from the last successful refresh, in source order.
    pub fn entries(&self) -> Arc<[RemoteImage]> {
        Arc::clone(&self.entries)
    }

    /// Fetch from the source and replace the entries.
    ///
    /// On failure the previous entries stay in place and the error is returned.
    #[tracing::instrument(skip(self), fields(limit = self.limit))]
    pub fn try_refresh(&mut self) -> LuminaResult<usize> {
        let mut fetched = self.source.fetch()?;
        fetched.truncate(self.limit);
        let n = fetched.len();
        self.entries = Arc::from(fetched);
        tracing::debug!(entries = n, "feed refreshed");
        Ok(n)
    }

    /// Like [`Feed::try_refresh`], but a failure is logged and swallowed.
    pub fn refresh(&mut self) -> Arc<[RemoteImage]> {
        if let Err(e) = self.try_refresh() {
            tracing::warn!(error = %e, kept = self.entries.len(), "feed refresh failed");
        }
        self.entries()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/feed/feed.rs"]
mod tests;
