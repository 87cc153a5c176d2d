use std::io::Write;

use super::*;
use crate::persist::storage::{ArtifactWriter, MemoryGallery};

#[derive(Debug)]
struct BrokenStorage;

impl GalleryStorage for BrokenStorage {
    fn create(&self, _entry: &GalleryEntry) -> LuminaResult<Box<dyn ArtifactWriter>> {
        Err(LuminaError::Other(anyhow::anyhow!("disk full")))
    }

    fn remove(&self, _locator: &Locator) -> LuminaResult<()> {
        Ok(())
    }
}

fn persistor(storage: Arc<dyn GalleryStorage>) -> Persistor {
    Persistor::new(storage, PersistOpts::default()).unwrap()
}

#[test]
fn filename_layout() {
    assert_eq!(
        artifact_filename("Lumina_AI_", 1700000000123, 7, "deadbeef"),
        "Lumina_AI_1700000000123_7_deadbeef.jpg"
    );
}

#[test]
fn persist_writes_jpeg_under_directory_hint() {
    let gallery = MemoryGallery::new();
    let p = persistor(Arc::new(gallery.clone()));
    let img = RasterImage::filled(8, 4, [10, 200, 30, 255]).unwrap();

    let loc = p.persist(&img).unwrap();
    assert!(loc.as_str().starts_with("memory://Pictures/Lumina_AI_"));
    assert!(loc.as_str().ends_with(".jpg"));

    let bytes = gallery.get(&loc).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (8, 4));
}

#[test]
fn persisting_same_image_twice_yields_distinct_locators() {
    let gallery = MemoryGallery::new();
    let p = persistor(Arc::new(gallery.clone()));
    let img = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();

    let a = p.persist(&img).unwrap();
    let b = p.persist(&img).unwrap();
    assert_ne!(a, b);
    assert_eq!(gallery.len(), 2);
}

#[test]
fn storage_failure_is_persist_error() {
    let p = persistor(Arc::new(BrokenStorage));
    let img = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
    let err = p.persist(&img).unwrap_err();
    assert!(matches!(err, LuminaError::Persist(_)), "{err}");
    assert!(err.to_string().contains("disk full"));
}

#[test]
fn encode_failure_leaves_no_artifact() {
    let gallery = MemoryGallery::new();
    let p = persistor(Arc::new(gallery.clone()));
    let empty = RasterImage::new(0, 0, Vec::new()).unwrap();
    assert!(matches!(p.persist(&empty), Err(LuminaError::Persist(_))));
    assert!(gallery.is_empty());
}

#[test]
fn cancelled_persist_leaves_no_artifact() {
    let gallery = MemoryGallery::new();
    let p = persistor(Arc::new(gallery.clone()));
    let img = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = p.persist_with_cancel(&img, &cancel).unwrap_err();
    assert!(err.is_cancelled());
    assert!(gallery.is_empty());
}

#[test]
fn discard_removes_artifact() {
    let gallery = MemoryGallery::new();
    let p = persistor(Arc::new(gallery.clone()));
    let img = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
    let loc = p.persist(&img).unwrap();
    p.discard(&loc).unwrap();
    assert!(gallery.is_empty());
    assert!(matches!(p.discard(&loc), Err(LuminaError::Persist(_))));
}

#[test]
fn invalid_quality_is_config_error() {
    let opts = PersistOpts {
        quality: 0,
        ..PersistOpts::default()
    };
    let err = Persistor::new(Arc::new(MemoryGallery::new()), opts).unwrap_err();
    assert!(matches!(err, LuminaError::Config(_)));
}

#[test]
fn writer_trait_objects_accept_io() {
    let gallery = MemoryGallery::new();
    let mut w = gallery
        .create(&GalleryEntry {
            filename: "x.jpg".to_string(),
            mime_type: JPEG_MIME.to_string(),
            directory_hint: String::new(),
        })
        .unwrap();
    w.write_all(b"abc").unwrap();
    assert_eq!(w.commit().unwrap().as_str(), "memory://x.jpg");
}
