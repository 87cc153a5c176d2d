//! Runtime configuration, loadable from JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::feed::DEFAULT_FEED_LIMIT;
use crate::foundation::error::{LuminaError, LuminaResult};
use crate::history::store::HistoryStore;
use crate::persist::encode::MAX_JPEG_QUALITY;
use crate::persist::persistor::{PersistOpts, Persistor};
use crate::persist::storage::{FsGallery, normalize_directory_hint};
use crate::pipeline::coordinator::{PipelineCoordinator, PipelineOpts};

/// Every knob of a Lumina installation. Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LuminaConfig {
    /// Root directory of the filesystem gallery.
    pub gallery_root: PathBuf,
    /// Collection directory under the gallery root.
    pub directory_hint: String,
    /// JSON-lines history log.
    pub history_path: PathBuf,
    /// Minimum processing time in milliseconds.
    pub min_latency_ms: u64,
    /// JPEG quality, `1..=100`.
    pub jpeg_quality: u8,
    /// Colour transparent pixels are flattened over before encoding.
    pub background_rgb: [u8; 3],
    /// Artifact file name prefix.
    pub filename_prefix: String,
    /// Template label recorded with every save.
    pub template_label: String,
    /// Maximum number of feed entries.
    pub feed_limit: usize,
}

impl Default for LuminaConfig {
    fn default() -> Self {
        let persist = PersistOpts::default();
        let pipeline = PipelineOpts::default();
        Self {
            gallery_root: PathBuf::from("lumina-gallery"),
            directory_hint: persist.directory_hint,
            history_path: PathBuf::from("lumina-history.jsonl"),
            min_latency_ms: pipeline.min_latency.as_millis() as u64,
            jpeg_quality: persist.quality,
            background_rgb: persist.background_rgb,
            filename_prefix: persist.filename_prefix,
            template_label: pipeline.template_label,
            feed_limit: DEFAULT_FEED_LIMIT,
        }
    }
}

impl LuminaConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> LuminaResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| LuminaError::config(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_path(path: &Path) -> LuminaResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LuminaError::config(format!("read config '{}': {e}", path.display())))?;
        Self::from_json_str(&text)
            .map_err(|e| LuminaError::config(format!("'{}': {e}", path.display())))
    }

    /// Check value ranges.
    pub fn validate(&self) -> LuminaResult<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > MAX_JPEG_QUALITY {
            return Err(LuminaError::config(format!(
                "jpeg_quality must be in 1..={MAX_JPEG_QUALITY}, got {}",
                self.jpeg_quality
            )));
        }
        normalize_directory_hint(&self.directory_hint)
            .map_err(|e| LuminaError::config(format!("directory_hint: {e}")))?;
        if self.filename_prefix.contains(['/', '\\']) {
            return Err(LuminaError::config(
                "filename_prefix must not contain path separators",
            ));
        }
        if self.template_label.trim().is_empty() {
            return Err(LuminaError::config("template_label must be non-empty"));
        }
        if self.feed_limit == 0 {
            return Err(LuminaError::config("feed_limit must be > 0"));
        }
        Ok(())
    }

    /// Coordinator options.
    pub fn pipeline_opts(&self) -> PipelineOpts {
        PipelineOpts {
            min_latency: Duration::from_millis(self.min_latency_ms),
            template_label: self.template_label.clone(),
            ..PipelineOpts::default()
        }
    }

    /// Persistor options.
    pub fn persist_opts(&self) -> PersistOpts {
        PersistOpts {
            quality: self.jpeg_quality,
            background_rgb: self.background_rgb,
            directory_hint: self.directory_hint.clone(),
            filename_prefix: self.filename_prefix.clone(),
        }
    }

    /// Open the history store at `history_path`.
    pub fn open_history(&self) -> LuminaResult<Arc<HistoryStore>> {
        Ok(Arc::new(HistoryStore::open(&self.history_path)?))
    }

    /// Wire a filesystem gallery, the history store and a coordinator from this config.
    pub fn open_pipeline(&self) -> LuminaResult<PipelineCoordinator> {
        self.validate()?;
        let gallery = FsGallery::new(&self.gallery_root)?;
        let persistor = Persistor::new(Arc::new(gallery), self.persist_opts())?;
        Ok(PipelineCoordinator::new(
            Arc::new(persistor),
            self.open_history()?,
            self.pipeline_opts(),
        ))
    }
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
