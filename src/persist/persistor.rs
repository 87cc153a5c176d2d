use std::io::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Locator, RasterImage};
use crate::foundation::error::{LuminaError, LuminaResult};
use crate::persist::encode::{JPEG_MIME, MAX_JPEG_QUALITY, encode_jpeg_into};
use crate::persist::storage::{GalleryEntry, GalleryStorage};

/// Encoding and naming options for [`Persistor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistOpts {
    /// JPEG quality, `1..=100`.
    pub quality: u8,
    /// Opaque colour that transparent pixels are flattened over.
    pub background_rgb: [u8; 3],
    /// Gallery collection directory.
    pub directory_hint: String,
    /// File name prefix, followed by the creation instant and a unique suffix.
    pub filename_prefix: String,
}

impl Default for PersistOpts {
    fn default() -> Self {
        Self {
            quality: MAX_JPEG_QUALITY,
            background_rgb: [0, 0, 0],
            directory_hint: "Pictures".to_string(),
            filename_prefix: "Lumina_AI_".to_string(),
        }
    }
}

/// Build an artifact file name: `<prefix><epoch_millis>_<seq>_<token>.jpg`.
pub fn artifact_filename(prefix: &str, epoch_millis: i64, seq: u64, token: &str) -> String {
    format!("{prefix}{epoch_millis}_{seq}_{token}.jpg")
}

/// Encodes rasters and writes them to a [`GalleryStorage`].
#[derive(Debug)]
pub struct Persistor {
    storage: Arc<dyn GalleryStorage>,
    opts: PersistOpts,
    seq: AtomicU64,
}

impl Persistor {
    /// Create a persistor writing into `storage`.
    pub fn new(storage: Arc<dyn GalleryStorage>, opts: PersistOpts) -> LuminaResult<Self> {
        if opts.quality == 0 || opts.quality > MAX_JPEG_QUALITY {
            return Err(LuminaError::config(format!(
                "jpeg quality must be in 1..={MAX_JPEG_QUALITY}, got {}",
                opts.quality
            )));
        }
        Ok(Self {
            storage,
            opts,
            seq: AtomicU64::new(0),
        })
    }

    /// Options in effect.
    pub fn opts(&self) -> &PersistOpts {
        &self.opts
    }

    /// Encode `img` and store it, returning the storage-assigned locator.
    pub fn persist(&self, img: &RasterImage) -> LuminaResult<Locator> {
        self.persist_with_cancel(img, &CancelToken::new())
    }

    /// Like [`Persistor::persist`], but abandons the artifact if `cancel` fires before commit.
    #[tracing::instrument(skip_all, fields(w = img.width(), h = img.height()))]
    pub fn persist_with_cancel(
        &self,
        img: &RasterImage,
        cancel: &CancelToken,
    ) -> LuminaResult<Locator> {
        let entry = GalleryEntry {
            filename: self.next_filename(),
            mime_type: JPEG_MIME.to_string(),
            directory_hint: self.opts.directory_hint.clone(),
        };

        // Any early return below drops the writer, which discards the partial artifact.
        let mut writer = self.storage.create(&entry).map_err(into_persist)?;
        encode_jpeg_into(
            &mut writer,
            img,
            self.opts.quality,
            self.opts.background_rgb,
        )?;
        writer
            .flush()
            .map_err(|e| LuminaError::persist(format!("flush '{}': {e}", entry.filename)))?;
        cancel.check("persist")?;

        let locator = writer.commit().map_err(into_persist)?;
        tracing::info!(%locator, "persisted artifact");
        Ok(locator)
    }

    /// Remove a previously persisted artifact.
    pub fn discard(&self, locator: &Locator) -> LuminaResult<()> {
        self.storage.remove(locator).map_err(into_persist)
    }

    fn next_filename(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let token = uuid::Uuid::new_v4().simple().to_string();
        artifact_filename(
            &self.opts.filename_prefix,
            chrono::Utc::now().timestamp_millis(),
            seq,
            &token[..8],
        )
    }
}

fn into_persist(e: LuminaError) -> LuminaError {
    match e {
        LuminaError::Persist(_) | LuminaError::Cancelled(_) => e,
        other => LuminaError::persist(other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/persist/persistor.rs"]
mod tests;
