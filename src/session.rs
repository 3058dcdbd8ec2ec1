//! The project session: one open project and its shared state.
//!
//! A session owns the last committed graph behind an `Arc`. Readers take a
//! cheap clone of that `Arc` and never see a partially applied change.
//! Writers go through [`ProjectSession::mutate`], which runs one logical
//! operation against a private copy of the graph while holding the write
//! section, validates and commits the copy, and only then publishes it to
//! readers.
//!
//! The write section spans processes: `mutate` holds the project's file
//! lock and first adopts any snapshot another process committed since this
//! session last loaded or wrote one.
//!
//! Sessions are cheap to clone; clones share all state.

use crate::concurrency::KeyedLocks;
use crate::config::ResolvedConfig;
use crate::events::{diff_graphs, entity_record, ChangeKind, EventSink, RemoteBackend};
use crate::hierarchy::HierarchyManager;
use crate::layout;
use crate::models::{EntityGraph, EntityKind, ProjectInfo, ProjectSummary};
use crate::storage::{LoadWarning, Storage};
use crate::sync::Synchronizer;
use crate::tasks::TaskManager;
use crate::versions::VersionManager;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct SessionInner {
    root: PathBuf,
    storage: Storage,
    config: ResolvedConfig,
    actor: String,
    current: RwLock<Arc<EntityGraph>>,
    /// `saved_at` of the snapshot `current` was loaded from or committed as
    saved_at: Mutex<DateTime<Utc>>,
    write_section: Mutex<()>,
    product_locks: KeyedLocks,
    version_locks: KeyedLocks,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    remote: RwLock<Option<Arc<dyn RemoteBackend>>>,
    load_warnings: Vec<LoadWarning>,
}

/// Handle to an open project.
#[derive(Clone)]
pub struct ProjectSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for ProjectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectSession")
            .field("root", &self.inner.root)
            .field("actor", &self.inner.actor)
            .finish()
    }
}

impl ProjectSession {
    fn from_parts(
        root: &Path,
        graph: EntityGraph,
        config: ResolvedConfig,
        actor: &str,
        saved_at: DateTime<Utc>,
        load_warnings: Vec<LoadWarning>,
    ) -> Self {
        let storage = Storage::new(root, config.backup_count.value, config.retry_policy());
        Self {
            inner: Arc::new(SessionInner {
                root: root.to_path_buf(),
                storage,
                config,
                actor: actor.to_string(),
                current: RwLock::new(Arc::new(graph)),
                saved_at: Mutex::new(saved_at),
                write_section: Mutex::new(()),
                product_locks: KeyedLocks::new(),
                version_locks: KeyedLocks::new(),
                sinks: RwLock::new(Vec::new()),
                remote: RwLock::new(None),
                load_warnings,
            }),
        }
    }

    /// Create a new project at `root`: directory layout plus an empty snapshot.
    pub fn init(
        root: &Path,
        project: ProjectInfo,
        config: ResolvedConfig,
        actor: &str,
    ) -> Result<Self> {
        if Storage::exists(root) {
            return Err(Error::Validation(format!(
                "Project already initialized at {}",
                root.display()
            )));
        }
        project.validate()?;
        layout::ensure_layout(root)?;

        let graph = EntityGraph::new(project);
        let session = Self::from_parts(root, graph, config, actor, Utc::now(), Vec::new());
        {
            let _lock = session.inner.storage.lock_exclusive()?;
            let snapshot = session.inner.storage.commit(&session.snapshot())?;
            *session.inner.saved_at.lock() = snapshot.saved_at;
        }
        info!(root = %root.display(), name = %session.snapshot().project.name, "Initialized project");
        Ok(session)
    }

    /// Open an existing project, recovering from backup if needed.
    pub fn open(root: &Path, config: ResolvedConfig, actor: &str) -> Result<Self> {
        let storage = Storage::new(root, config.backup_count.value, config.retry_policy());
        let loaded = storage.load()?;
        // Temp files are only stray when no writer is active
        match storage.try_lock_exclusive() {
            Ok(Some(_lock)) => {
                storage.clean_stray_temps();
            }
            Ok(None) => debug!(root = %root.display(), "Writer active, leaving temp files alone"),
            Err(e) => debug!(root = %root.display(), error = %e, "Cannot take writer lock"),
        }
        for warning in &loaded.warnings {
            warn!(root = %root.display(), "{}", warning);
        }
        Ok(Self::from_parts(
            root,
            loaded.snapshot.graph,
            config,
            actor,
            loaded.snapshot.saved_at,
            loaded.warnings,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.inner.config
    }

    /// User recorded as `created_by`/`updated_by` on changes.
    pub fn actor(&self) -> &str {
        &self.inner.actor
    }

    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    /// Conditions reported while loading (e.g. recovery from backup).
    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.inner.load_warnings
    }

    /// The last committed graph.
    pub fn snapshot(&self) -> Arc<EntityGraph> {
        self.inner.current.read().clone()
    }

    pub fn add_event_sink(&self, sink: Arc<dyn EventSink>) {
        self.inner.sinks.write().push(sink);
    }

    pub fn set_remote_backend(&self, backend: Arc<dyn RemoteBackend>) {
        *self.inner.remote.write() = Some(backend);
    }

    pub fn hierarchy(&self) -> HierarchyManager {
        HierarchyManager::new(self.clone())
    }

    pub fn versions(&self) -> VersionManager {
        VersionManager::new(self.clone())
    }

    pub fn tasks(&self) -> TaskManager {
        TaskManager::new(self.clone())
    }

    pub fn synchronizer(&self) -> Synchronizer {
        Synchronizer::new(self.clone())
    }

    pub(crate) fn product_locks(&self) -> &KeyedLocks {
        &self.inner.product_locks
    }

    pub(crate) fn version_locks(&self) -> &KeyedLocks {
        &self.inner.version_locks
    }

    /// Run one logical write operation.
    ///
    /// `op` edits a private copy of the latest committed graph, including
    /// commits made by other processes. If it returns `Ok` and changed
    /// anything, the copy is validated, checked against frozen versions,
    /// committed to disk and then made visible to readers. If any step fails
    /// the snapshot on disk is untouched.
    pub fn mutate<T>(
        &self,
        operation: &str,
        op: impl FnOnce(&mut EntityGraph) -> Result<T>,
    ) -> Result<T> {
        let _section = self.inner.write_section.lock();
        let _lock = self.inner.storage.lock_exclusive()?;
        let before = self.refresh()?;
        let mut graph = (*before).clone();

        let out = op(&mut graph)?;
        if graph == *before {
            return Ok(out);
        }

        graph.check_frozen_versions(&before)?;
        let snapshot = self.inner.storage.commit(&graph)?;

        let after = Arc::new(graph);
        *self.inner.current.write() = after.clone();
        *self.inner.saved_at.lock() = snapshot.saved_at;
        info!(operation, actor = %self.inner.actor, "Committed");

        self.notify(&before, &after, operation);
        Ok(out)
    }

    /// Adopt the on-disk snapshot if someone else committed since this
    /// session last loaded or wrote. Caller holds the writer lock.
    ///
    /// An unreadable primary snapshot keeps the in-memory graph; the next
    /// commit replaces the damaged file.
    fn refresh(&self) -> Result<Arc<EntityGraph>> {
        let known = *self.inner.saved_at.lock();
        let on_disk = match self.inner.storage.saved_at() {
            Ok(stamp) => stamp,
            Err(e) => {
                debug!(error = %e, "Snapshot stamp unreadable, keeping session graph");
                return Ok(self.snapshot());
            }
        };
        if on_disk == known {
            return Ok(self.snapshot());
        }

        let loaded = self.inner.storage.load()?;
        if !loaded.warnings.is_empty() {
            return Ok(self.snapshot());
        }
        debug!(saved_at = %loaded.snapshot.saved_at, "Reloaded snapshot written by another session");
        let graph = Arc::new(loaded.snapshot.graph);
        *self.inner.current.write() = graph.clone();
        *self.inner.saved_at.lock() = loaded.snapshot.saved_at;
        Ok(graph)
    }

    fn notify(&self, before: &EntityGraph, after: &EntityGraph, operation: &str) {
        let sinks = self.inner.sinks.read().clone();
        let remote = self.inner.remote.read().clone();
        if sinks.is_empty() && remote.is_none() {
            return;
        }

        for event in diff_graphs(before, after, operation, &self.inner.actor) {
            for sink in &sinks {
                if let Err(e) = sink.entity_changed(&event) {
                    warn!(entity = %event.id, error = %e, "Event sink failed");
                }
            }
            if let Some(remote) = &remote {
                let pushed = match event.change {
                    ChangeKind::Deleted => remote.delete(event.kind, &event.id),
                    _ => entity_record(after, event.kind, &event.id)
                        .and_then(|record| remote.upsert(event.kind, &event.id, &record)),
                };
                if let Err(e) = pushed {
                    warn!(
                        backend = remote.name(),
                        entity = %event.id,
                        error = %e,
                        "Remote backend update failed"
                    );
                }
            }
        }
    }

    /// Aggregate counts for the project.
    pub fn summary(&self) -> ProjectSummary {
        self.snapshot().summary()
    }

    /// Look up any entity by id, returning its kind and serialized record.
    pub fn describe(&self, id: &str) -> Result<(EntityKind, serde_json::Value)> {
        let kind = EntityKind::from_id(id)
            .ok_or_else(|| Error::NotFound(format!("Unrecognized id: {}", id)))?;
        let graph = self.snapshot();
        let mut record = entity_record(&graph, kind, id)?;
        if let Some(obj) = record.as_object_mut() {
            obj.insert("kind".to_string(), serde_json::json!(kind.as_str()));
            if let Some(flag) = graph.sync_flags.get(id) {
                obj.insert("sync".to_string(), serde_json::to_value(flag)?);
            }
            if kind == EntityKind::Folder {
                obj.insert("path".to_string(), serde_json::json!(graph.folder_path(id)?));
            }
        }
        Ok((kind, record))
    }
}
