//! Lumina composes a user photo onto a template image, persists the result to a gallery and
//! keeps an observable history of saved creations.
//!
//! The public API is session-oriented:
//!
//! - Build a [`PipelineCoordinator`] (directly, or from a [`LuminaConfig`])
//! - Select a photo and a template, then [`PipelineCoordinator::process_image`]
//! - [`PipelineCoordinator::save_result`] persists and records the composition
//! - [`HistoryStore::observe`] streams ordered history snapshots
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Image loading and caller-facing image references.
pub mod assets;
/// Photo-on-template compositing.
pub mod compose;
/// Runtime configuration.
pub mod config;
/// Remote image feed.
pub mod feed;
/// Rasters, locators, errors and cancellation.
pub mod foundation;
/// History of saved creations.
pub mod history;
/// JPEG encoding and gallery storage.
pub mod persist;
/// Creation session coordinator.
pub mod pipeline;

pub use crate::assets::decode::{decode_raster, load_raster};
pub use crate::assets::source::ImageRef;
pub use crate::compose::compositor::{Placement, compose, placement};
pub use crate::config::LuminaConfig;
pub use crate::feed::Feed;
pub use crate::feed::source::{ImageSource, JsonFileSource, RemoteImage};
pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Locator, RasterImage, Rect};
pub use crate::foundation::error::{LuminaError, LuminaResult};
pub use crate::history::record::HistoryRecord;
pub use crate::history::store::{HistorySnapshot, HistoryStore, HistorySubscription};
pub use crate::persist::persistor::{PersistOpts, Persistor};
pub use crate::persist::storage::{
    ArtifactWriter, FsGallery, GalleryEntry, GalleryStorage, MemoryGallery,
};
pub use crate::pipeline::coordinator::{PipelineCoordinator, PipelineOpts};
pub use crate::pipeline::state::{PipelineEvent, PipelineState, PipelineStatus};
pub use crate::pipeline::task::TaskHandle;
