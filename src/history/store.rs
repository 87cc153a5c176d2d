use std::fs::{File, OpenOptions};
use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::foundation::core::Locator;
use crate::foundation::error::{LuminaError, LuminaResult};
use crate::history::record::{HistoryRecord, newest_first};

/// Ordered (newest first) view of the whole history at one point in time.
pub type HistorySnapshot = Arc<[HistoryRecord]>;

/// Source of creation timestamps, in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Append-only, durable, observable log of saved creations.
///
/// Records are stored one JSON object per line. Appends are serialized by an internal lock that
/// also assigns `id` and `timestamp`; observers are registered separately so subscribing never
/// waits on disk I/O.
pub struct HistoryStore {
    path: PathBuf,
    clock: Clock,
    log: Mutex<LogState>,
    feed: Mutex<FeedState>,
}

struct LogState {
    file: File,
    len: u64,
    next_id: i64,
    last_timestamp: i64,
    // Set when a failed write could not be rolled back; the tail may hold a torn line.
    torn: bool,
}

struct FeedState {
    records: Vec<HistoryRecord>,
    snapshot: HistorySnapshot,
    subscribers: Vec<mpsc::UnboundedSender<HistorySnapshot>>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Open (or create) the log at `path` and replay it.
    pub fn open(path: impl AsRef<Path>) -> LuminaResult<Self> {
        Self::open_with_clock(path, Arc::new(|| chrono::Utc::now().timestamp_millis()))
    }

    /// Like [`HistoryStore::open`], with an explicit timestamp source.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: Clock) -> LuminaResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                LuminaError::history(format!("create history dir '{}': {e}", parent.display()))
            })?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| LuminaError::history(format!("open '{}': {e}", path.display())))?;

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)
            .map_err(|e| LuminaError::history(format!("read '{}': {e}", path.display())))?;
        let (mut records, valid_len) = replay(&raw, &path)?;

        if valid_len < raw.len() {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = raw.len() - valid_len,
                "discarding torn trailing history record"
            );
            file.set_len(valid_len as u64).map_err(|e| {
                LuminaError::history(format!("truncate '{}': {e}", path.display()))
            })?;
        }

        records.sort_by(newest_first);
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let last_timestamp = records.iter().map(|r| r.timestamp).max().unwrap_or(i64::MIN);
        tracing::debug!(path = %path.display(), records = records.len(), "opened history");

        Ok(Self {
            path,
            clock,
            log: Mutex::new(LogState {
                file,
                len: valid_len as u64,
                next_id,
                last_timestamp,
                torn: false,
            }),
            feed: Mutex::new(FeedState {
                snapshot: records.clone().into(),
                records,
                subscribers: Vec::new(),
            }),
        })
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.lock_feed().records.len()
    }

    /// Return `true` when no record has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current ordered snapshot.
    pub fn snapshot(&self) -> HistorySnapshot {
        Arc::clone(&self.lock_feed().snapshot)
    }

    /// Durably append a record and publish the new snapshot to every observer.
    ///
    /// `timestamp` never goes below the newest stored timestamp, so display order matches append
    /// order even if the wall clock steps backwards. On a failed write the file is truncated back
    /// to its previous length and nothing is published.
    pub fn append(&self, image_uri: Locator, template_name: &str) -> LuminaResult<HistoryRecord> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| LuminaError::history("history log lock poisoned"))?;
        if log.torn {
            return Err(LuminaError::history(format!(
                "'{}' has an unrecoverable partial write; reopen the store",
                self.path.display()
            )));
        }

        let record = HistoryRecord {
            id: log.next_id,
            image_uri,
            template_name: template_name.to_string(),
            timestamp: (self.clock)().max(log.last_timestamp),
        };
        let mut line = serde_json::to_vec(&record)
            .map_err(|e| LuminaError::persist(format!("serialize history record: {e}")))?;
        line.push(b'\n');

        let written = log
            .file
            .write_all(&line)
            .and_then(|()| log.file.sync_data());
        if let Err(e) = written {
            let restore = log.len;
            if let Err(te) = log.file.set_len(restore) {
                tracing::error!(error = %te, "failed to roll back partial history write");
                log.torn = true;
            }
            return Err(LuminaError::persist(format!(
                "write history record to '{}': {e}",
                self.path.display()
            )));
        }

        log.len += line.len() as u64;
        log.next_id += 1;
        log.last_timestamp = record.timestamp;

        // Publish while still holding the log lock so observers see snapshots in append order.
        let mut feed = self.lock_feed();
        feed.records.insert(0, record.clone());
        feed.snapshot = feed.records.clone().into();
        let snapshot = Arc::clone(&feed.snapshot);
        feed.subscribers
            .retain(|tx| tx.send(Arc::clone(&snapshot)).is_ok());
        drop(feed);
        drop(log);

        tracing::info!(id = record.id, uri = %record.image_uri, "appended history record");
        Ok(record)
    }

    /// Subscribe to the ordered history.
    ///
    /// The first delivery is the current snapshot; every successful append delivers the full
    /// updated snapshot. Dropping the subscription unregisters it.
    pub fn observe(&self) -> HistorySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut feed = self.lock_feed();
        // The receiver is alive, so the initial send cannot fail.
        let _ = tx.send(Arc::clone(&feed.snapshot));
        feed.subscribers.push(tx);
        HistorySubscription { rx }
    }

    /// Number of live subscriptions (closed ones are pruned on the next append).
    pub fn subscriber_count(&self) -> usize {
        self.lock_feed()
            .subscribers
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Swap the log handle for a read-only one so every write fails.
    #[cfg(test)]
    pub(crate) fn make_read_only(&self) {
        let file = File::open(&self.path).expect("reopen history read-only");
        self.log.lock().expect("history log lock").file = file;
    }

    fn lock_feed(&self) -> MutexGuard<'_, FeedState> {
        // Feed state is replaced wholesale under the lock, so a poisoned guard is still coherent.
        self.feed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Parse complete lines; return the records and the byte length of the valid prefix.
///
/// A final line without its terminating newline is a torn write and is excluded. Any complete
/// line that fails to parse is corruption and an error.
fn replay(raw: &[u8], path: &Path) -> LuminaResult<(Vec<HistoryRecord>, usize)> {
    let mut records = Vec::new();
    let mut valid_len = 0usize;
    let mut seen = std::collections::HashSet::new();

    for (lineno, chunk) in raw.split_inclusive(|b| *b == b'\n').enumerate() {
        if chunk.last() != Some(&b'\n') {
            break;
        }
        valid_len += chunk.len();
        let body = &chunk[..chunk.len() - 1];
        if body.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let record: HistoryRecord = serde_json::from_slice(body).map_err(|e| {
            LuminaError::history(format!(
                "'{}' line {}: malformed record: {e}",
                path.display(),
                lineno + 1
            ))
        })?;
        if !seen.insert(record.id) {
            return Err(LuminaError::history(format!(
                "'{}' line {}: duplicate record id {}",
                path.display(),
                lineno + 1,
                record.id
            )));
        }
        records.push(record);
    }
    Ok((records, valid_len))
}

/// Live, ordered view of a [`HistoryStore`].
#[derive(Debug)]
pub struct HistorySubscription {
    rx: mpsc::UnboundedReceiver<HistorySnapshot>,
}

impl HistorySubscription {
    /// Wait for the next snapshot; `None` once the store is gone.
    pub async fn next(&mut self) -> Option<HistorySnapshot> {
        self.rx.recv().await
    }

    /// Next snapshot if one is already queued.
    pub fn try_next(&mut self) -> Option<HistorySnapshot> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/history/store.rs"]
mod tests;
