use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;

use crate::foundation::core::Locator;
use crate::foundation::error::{LuminaError, LuminaResult};

/// Metadata describing an artifact about to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GalleryEntry {
    /// Display/file name, without directories.
    pub filename: String,
    /// MIME type of the encoded stream.
    pub mime_type: String,
    /// Relative collection directory (for example `Pictures`).
    pub directory_hint: String,
}

/// Gallery-equivalent durable storage.
///
/// Contract: `create` reserves an artifact and hands back a scoped writer. Only
/// [`ArtifactWriter::commit`] makes the artifact visible and yields its [`Locator`]; dropping an
/// uncommitted writer releases the handle and removes whatever was written.
pub trait GalleryStorage: Send + Sync + std::fmt::Debug {
    /// Reserve a new artifact and open a writer for its pixel stream.
    fn create(&self, entry: &GalleryEntry) -> LuminaResult<Box<dyn ArtifactWriter>>;
    /// Remove a committed artifact.
    fn remove(&self, locator: &Locator) -> LuminaResult<()>;
}

/// Scoped output handle for one artifact.
pub trait ArtifactWriter: Write + Send {
    /// Flush, make the artifact durable and visible, and return its locator.
    fn commit(self: Box<Self>) -> LuminaResult<Locator>;
}

/// Normalize a relative directory hint: `/` separators, no `.` segments, no absolute paths or
/// parent traversals.
pub fn normalize_directory_hint(hint: &str) -> LuminaResult<String> {
    let s = hint.replace('\\', "/");
    if s.starts_with('/') {
        return Err(LuminaError::persist("directory hint must be relative"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(LuminaError::persist("directory hint must not contain '..'"));
        }
        out.push(part);
    }
    Ok(out.join("/"))
}

fn validate_filename(name: &str) -> LuminaResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(LuminaError::persist(format!(
            "artifact filename '{name}' must be a plain file name"
        )));
    }
    Ok(())
}

/// Filesystem-backed gallery: artifacts live at `<root>/<directory_hint>/<filename>` and are
/// addressed by `file://` locators.
#[derive(Clone, Debug)]
pub struct FsGallery {
    root: PathBuf,
}

impl FsGallery {
    /// Create a gallery rooted at `root` (made absolute, created lazily on first write).
    pub fn new(root: impl AsRef<Path>) -> LuminaResult<Self> {
        let root = std::path::absolute(root.as_ref()).with_context(|| {
            format!("resolve gallery root '{}'", root.as_ref().display())
        })?;
        Ok(Self { root })
    }

    /// Absolute gallery root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a locator issued by this gallery back to its file path.
    pub fn path_of(&self, locator: &Locator) -> LuminaResult<PathBuf> {
        let url = url::Url::parse(locator.as_str())
            .map_err(|e| LuminaError::persist(format!("'{locator}' is not a URI: {e}")))?;
        if url.scheme() != "file" {
            return Err(LuminaError::persist(format!(
                "'{locator}' is not a file locator"
            )));
        }
        let path = url.to_file_path().map_err(|()| {
            LuminaError::persist(format!("'{locator}' does not name a local file"))
        })?;
        if !path.starts_with(&self.root) {
            return Err(LuminaError::persist(format!(
                "'{locator}' is outside gallery root '{}'",
                self.root.display()
            )));
        }
        Ok(path)
    }
}

/// `file://` URI for an absolute path, percent-encoded so any file name round-trips.
fn file_locator(path: &Path) -> LuminaResult<Locator> {
    let url = url::Url::from_file_path(path).map_err(|()| {
        LuminaError::persist(format!("'{}' is not an absolute path", path.display()))
    })?;
    Ok(Locator::new(String::from(url)))
}

impl GalleryStorage for FsGallery {
    fn create(&self, entry: &GalleryEntry) -> LuminaResult<Box<dyn ArtifactWriter>> {
        validate_filename(&entry.filename)?;
        let dir = self.root.join(normalize_directory_hint(&entry.directory_hint)?);
        std::fs::create_dir_all(&dir).map_err(|e| {
            LuminaError::persist(format!("create gallery dir '{}': {e}", dir.display()))
        })?;

        let path = dir.join(&entry.filename);
        if path.exists() {
            return Err(LuminaError::persist(format!(
                "artifact '{}' already exists",
                path.display()
            )));
        }
        let part = dir.join(format!(".{}.part", entry.filename));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part)
            .map_err(|e| {
                LuminaError::persist(format!("create artifact '{}': {e}", part.display()))
            })?;
        tracing::debug!(path = %part.display(), mime = %entry.mime_type, "opened artifact");

        Ok(Box::new(FsArtifactWriter {
            file: Some(BufWriter::new(file)),
            part,
            path,
        }))
    }

    fn remove(&self, locator: &Locator) -> LuminaResult<()> {
        let path = self.path_of(locator)?;
        std::fs::remove_file(&path).map_err(|e| {
            LuminaError::persist(format!("remove artifact '{}': {e}", path.display()))
        })
    }
}

/// Writes to a hidden `.<name>.part` sibling; commit renames it into place.
struct FsArtifactWriter {
    // `None` once committed.
    file: Option<BufWriter<File>>,
    part: PathBuf,
    path: PathBuf,
}

impl FsArtifactWriter {
    fn file_mut(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("artifact writer already committed"))
    }
}

impl Write for FsArtifactWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl ArtifactWriter for FsArtifactWriter {
    fn commit(mut self: Box<Self>) -> LuminaResult<Locator> {
        let locator = file_locator(&self.path)?;
        let writer = self
            .file
            .take()
            .ok_or_else(|| LuminaError::persist("artifact writer already committed"))?;
        let finish = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .and_then(|()| {
                if self.path.exists() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "destination already exists",
                    ));
                }
                std::fs::rename(&self.part, &self.path)
            });
        if let Err(e) = finish {
            discard_partial(&self.part);
            return Err(LuminaError::persist(format!(
                "finish artifact '{}': {e}",
                self.path.display()
            )));
        }
        Ok(locator)
    }
}

impl Drop for FsArtifactWriter {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            discard_partial(&self.part);
        }
    }
}

fn discard_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "discarded uncommitted artifact"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to discard artifact"),
    }
}

/// In-memory gallery for tests and debugging.
#[derive(Clone, Debug, Default)]
pub struct MemoryGallery {
    artifacts: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryGallery {
    /// Create an empty gallery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed artifacts.
    pub fn len(&self) -> usize {
        lock_artifacts(&self.artifacts).len()
    }

    /// Return `true` when nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of a committed artifact.
    pub fn get(&self, locator: &Locator) -> Option<Vec<u8>> {
        lock_artifacts(&self.artifacts)
            .get(locator.as_str())
            .cloned()
    }

    /// Locators of every committed artifact, sorted.
    pub fn locators(&self) -> Vec<Locator> {
        lock_artifacts(&self.artifacts)
            .keys()
            .map(Locator::new)
            .collect()
    }
}

fn lock_artifacts(
    artifacts: &Mutex<BTreeMap<String, Vec<u8>>>,
) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
    // Entries are inserted whole, so a poisoned map is still consistent.
    artifacts.lock().unwrap_or_else(|e| e.into_inner())
}

impl GalleryStorage for MemoryGallery {
    fn create(&self, entry: &GalleryEntry) -> LuminaResult<Box<dyn ArtifactWriter>> {
        validate_filename(&entry.filename)?;
        let hint = normalize_directory_hint(&entry.directory_hint)?;
        let key = if hint.is_empty() {
            format!("memory://{}", entry.filename)
        } else {
            format!("memory://{hint}/{}", entry.filename)
        };
        if lock_artifacts(&self.artifacts).contains_key(&key) {
            return Err(LuminaError::persist(format!("artifact '{key}' already exists")));
        }
        Ok(Box::new(MemoryArtifactWriter {
            artifacts: Arc::clone(&self.artifacts),
            key,
            buf: Vec::new(),
        }))
    }

    fn remove(&self, locator: &Locator) -> LuminaResult<()> {
        lock_artifacts(&self.artifacts)
            .remove(locator.as_str())
            .map(|_| ())
            .ok_or_else(|| LuminaError::persist(format!("no artifact at '{locator}'")))
    }
}

struct MemoryArtifactWriter {
    artifacts: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    key: String,
    buf: Vec<u8>,
}

impl Write for MemoryArtifactWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ArtifactWriter for MemoryArtifactWriter {
    fn commit(self: Box<Self>) -> LuminaResult<Locator> {
        let Self {
            artifacts,
            key,
            buf,
        } = *self;
        let mut map = lock_artifacts(&artifacts);
        if map.contains_key(&key) {
            return Err(LuminaError::persist(format!("artifact '{key}' already exists")));
        }
        map.insert(key.clone(), buf);
        Ok(Locator::new(key))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/persist/storage.rs"]
mod tests;
