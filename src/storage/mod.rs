//! Snapshot persistence for the entity graph.
//!
//! The whole graph is stored as one JSON document at
//! `<project>/00_Pipeline/pipeline.json`. A commit never leaves a partially
//! written snapshot behind:
//!
//! 1. serialize into a temp file in the same directory and fsync it
//! 2. re-read and validate the temp file
//! 3. copy the current snapshot into `backups/`
//! 4. atomically rename the temp file over the snapshot
//! 5. prune old backups
//!
//! A crash at any point leaves either the previous or the new snapshot in
//! place. If the snapshot is unreadable on load, the newest valid backup is
//! used instead and a [`LoadWarning`] is reported.
//!
//! Writers from different processes are serialized by an advisory lock on
//! `00_Pipeline/.lock` ([`Storage::lock_exclusive`]). `commit` itself does
//! not take the lock; callers hold it across read-modify-write.

use crate::concurrency::{retry_with_backoff, RetryPolicy};
use crate::models::EntityGraph;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Metadata directory at the project root.
pub const PIPELINE_DIR: &str = "00_Pipeline";
/// Snapshot file name inside [`PIPELINE_DIR`].
pub const SNAPSHOT_FILE: &str = "pipeline.json";
/// Backup directory inside [`PIPELINE_DIR`].
pub const BACKUP_DIR: &str = "backups";
/// Advisory writer lock inside [`PIPELINE_DIR`].
pub const LOCK_FILE: &str = ".lock";
/// Current snapshot envelope version.
pub const SCHEMA_VERSION: u32 = 1;

const BACKUP_PREFIX: &str = "pipeline-";
const TEMP_PREFIX: &str = ".pipeline.";
const TEMP_SUFFIX: &str = ".tmp";

/// The persisted form of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub graph: EntityGraph,
}

impl Snapshot {
    pub fn new(graph: EntityGraph) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            graph,
        }
    }

    /// Parse and fully validate a serialized snapshot.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        if snapshot.schema_version > SCHEMA_VERSION {
            return Err(Error::Validation(format!(
                "Snapshot schema version {} is newer than supported version {}",
                snapshot.schema_version, SCHEMA_VERSION
            )));
        }
        snapshot.graph.validate()?;
        Ok(snapshot)
    }
}

/// Envelope fields read without materializing the graph.
#[derive(Deserialize)]
struct Stamp {
    saved_at: DateTime<Utc>,
}

/// Exclusive writer lock on one project. Released on drop.
#[derive(Debug)]
pub struct WriteLock {
    file: fs::File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Non-fatal conditions found while loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum LoadWarning {
    /// The primary snapshot was unusable and a backup was loaded instead.
    RecoveredFromBackup { backup: PathBuf, reason: String },
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadWarning::RecoveredFromBackup { backup, reason } => write!(
                f,
                "snapshot unreadable ({}); recovered from {}",
                reason,
                backup.display()
            ),
        }
    }
}

/// Result of [`Storage::load`].
#[derive(Debug)]
pub struct Loaded {
    pub snapshot: Snapshot,
    pub warnings: Vec<LoadWarning>,
}

/// File-backed snapshot store for one project.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    backup_count: usize,
    retry: RetryPolicy,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, backup_count: usize, retry: RetryPolicy) -> Self {
        Self {
            root: root.into(),
            backup_count,
            retry,
        }
    }

    /// Project root this store belongs to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pipeline_dir(&self) -> PathBuf {
        self.root.join(PIPELINE_DIR)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.pipeline_dir().join(SNAPSHOT_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.pipeline_dir().join(BACKUP_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.pipeline_dir().join(LOCK_FILE)
    }

    fn open_lock_file(&self) -> Result<fs::File> {
        let dir = self.pipeline_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::io_at(&dir, e))?;
        let path = self.lock_path();
        fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io_at(&path, e))
    }

    /// Block until this handle holds the project's writer lock.
    ///
    /// The lock is per open file, so a second call from the same process
    /// blocks as well. Never call it while already holding a [`WriteLock`].
    pub fn lock_exclusive(&self) -> Result<WriteLock> {
        let file = self.open_lock_file()?;
        FileExt::lock_exclusive(&file).map_err(|e| Error::io_at(&self.lock_path(), e))?;
        Ok(WriteLock { file })
    }

    /// Take the writer lock only if nobody else holds it.
    pub fn try_lock_exclusive(&self) -> Result<Option<WriteLock>> {
        let file = self.open_lock_file()?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(WriteLock { file })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(Error::io_at(&self.lock_path(), e)),
        }
    }

    /// `saved_at` of the primary snapshot on disk.
    pub fn saved_at(&self) -> Result<DateTime<Utc>> {
        let path = self.snapshot_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotInitialized),
            Err(e) => return Err(Error::io_at(&path, e)),
        };
        let stamp: Stamp = serde_json::from_slice(&bytes)?;
        Ok(stamp.saved_at)
    }

    /// Whether `root` holds a project (snapshot or at least one backup).
    pub fn exists(root: &Path) -> bool {
        let store = Storage::new(root, 0, RetryPolicy::default());
        store.snapshot_path().exists() || store.list_backups().is_ok_and(|b| !b.is_empty())
    }

    /// Load the snapshot, falling back to the newest valid backup.
    pub fn load(&self) -> Result<Loaded> {
        let path = self.snapshot_path();
        let primary = match fs::read(&path) {
            Ok(bytes) => Snapshot::from_slice(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotInitialized),
            Err(e) => Err(Error::io_at(&path, e)),
        };

        let primary_err = match primary {
            Ok(snapshot) => {
                debug!(path = %path.display(), "Loaded snapshot");
                return Ok(Loaded {
                    snapshot,
                    warnings: Vec::new(),
                });
            }
            Err(e) => e,
        };

        for backup in self.list_backups()? {
            let loaded = fs::read(&backup)
                .map_err(|e| Error::io_at(&backup, e))
                .and_then(|bytes| Snapshot::from_slice(&bytes));
            match loaded {
                Ok(snapshot) => {
                    warn!(
                        backup = %backup.display(),
                        error = %primary_err,
                        "Snapshot unusable, recovered from backup"
                    );
                    return Ok(Loaded {
                        snapshot,
                        warnings: vec![LoadWarning::RecoveredFromBackup {
                            backup,
                            reason: primary_err.to_string(),
                        }],
                    });
                }
                Err(e) => {
                    debug!(backup = %backup.display(), error = %e, "Skipping invalid backup");
                }
            }
        }

        Err(primary_err)
    }

    /// Validate and durably write `graph` as the new snapshot.
    ///
    /// Transient I/O failures are retried per the configured policy.
    pub fn commit(&self, graph: &EntityGraph) -> Result<Snapshot> {
        graph.validate()?;
        let snapshot = Snapshot::new(graph.clone());
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        retry_with_backoff(self.retry, "commit", || self.write_snapshot(&bytes))?;
        Ok(snapshot)
    }

    fn write_snapshot(&self, bytes: &[u8]) -> Result<()> {
        let dir = self.pipeline_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::io_at(&dir, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&dir)
            .map_err(|e| Error::io_at(&dir, e))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.flush())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::io_at(tmp.path(), e))?;

        // What reaches disk must parse and validate before it replaces anything
        let written = fs::read(tmp.path()).map_err(|e| Error::io_at(tmp.path(), e))?;
        Snapshot::from_slice(&written)?;

        let target = self.snapshot_path();
        if target.exists() && self.backup_count > 0 {
            self.backup_current(&target)?;
        }

        tmp.persist(&target)
            .map_err(|e| Error::io_at(&target, e.error))?;
        sync_dir(&dir);
        debug!(path = %target.display(), bytes = bytes.len(), "Committed snapshot");

        if let Err(e) = self.prune_backups() {
            warn!(error = %e, "Failed to prune old backups");
        }
        Ok(())
    }

    fn backup_current(&self, current: &Path) -> Result<PathBuf> {
        let dir = self.backup_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::io_at(&dir, e))?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%6fZ");
        let mut seq = 0u32;
        let path = loop {
            let candidate = dir.join(format!("{}{}-{:04}.json", BACKUP_PREFIX, stamp, seq));
            if !candidate.exists() {
                break candidate;
            }
            seq += 1;
        };

        fs::copy(current, &path).map_err(|e| Error::io_at(&path, e))?;
        Ok(path)
    }

    /// Backup files, newest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>> {
        let dir = self.backup_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io_at(&dir, e)),
        };

        let mut backups: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(".json"))
            })
            .collect();
        // Timestamped names sort chronologically
        backups.sort();
        backups.reverse();
        Ok(backups)
    }

    fn prune_backups(&self) -> Result<()> {
        for stale in self.list_backups()?.into_iter().skip(self.backup_count) {
            fs::remove_file(&stale).map_err(|e| Error::io_at(&stale, e))?;
            debug!(path = %stale.display(), "Pruned backup");
        }
        Ok(())
    }

    /// Remove temp files left behind by interrupted commits.
    ///
    /// Only safe while holding the writer lock; otherwise a live commit's
    /// temp file may be removed.
    pub fn clean_stray_temps(&self) -> usize {
        let Ok(entries) = fs::read_dir(self.pipeline_dir()) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(TEMP_PREFIX)
                && name.ends_with(TEMP_SUFFIX)
                && fs::remove_file(entry.path()).is_ok()
            {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "Removed stray snapshot temp files");
        }
        removed
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
