//! Version allocation and the publish state machine.
//!
//! Version numbers are allocated per product under that product's lock: the
//! highest number ever allocated is read, and the commit only goes through
//! if it is still the highest when the write section is entered. A lost race
//! surfaces as [`Error::ConcurrencyConflict`] and is retried a bounded number
//! of times. Numbers of deleted versions are never reused.
//!
//! State machine: `Draft -> Published -> Archived`. Only Draft versions
//! accept new representations and files, and only Draft versions can be
//! deleted. The product's current pointer moves on publish and rollback and
//! every move is recorded in its pointer history.

use crate::concurrency::CancelToken;
use crate::dcc::{self, mime_type_for, DccApp, DccBridge};
use crate::layout::{absolute_path, relative_path};
use crate::models::graph::require_live;
use crate::models::{
    version_label, FileInfo, Product, Representation, Version, VersionStatus,
};
use crate::publish::PublishPipeline;
use crate::session::ProjectSession;
use crate::sync::{hash_file, is_scanned_path};
use crate::sync::naming::{workfile_path, WorkfileName};
use crate::worker::{JobHandle, WorkerPool};
use crate::{Error, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Optional fields for a new version.
#[derive(Debug, Clone, Default)]
pub struct NewVersion {
    /// Falls back to the configured default author, then the acting user
    pub author: Option<String>,
    pub comment: String,
    pub task_id: Option<String>,
    pub dcc_app: Option<String>,
}

impl NewVersion {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            ..Default::default()
        }
    }
}

fn immutable(version: &Version) -> Error {
    Error::ImmutableVersion {
        version_id: version.base.id.clone(),
        status: version.status.to_string(),
    }
}

/// Allocates, publishes, archives and rolls back versions.
#[derive(Debug, Clone)]
pub struct VersionManager {
    session: ProjectSession,
}

impl VersionManager {
    pub fn new(session: ProjectSession) -> Self {
        Self { session }
    }

    /// Create the next Draft version of a product.
    pub fn create_version(
        &self,
        product_id: &str,
        author: Option<&str>,
        comment: &str,
    ) -> Result<Version> {
        self.create_version_with(
            product_id,
            NewVersion {
                author: author.map(String::from),
                ..NewVersion::new(comment)
            },
        )
    }

    /// Create the next Draft version with task and application context.
    pub fn create_version_with(&self, product_id: &str, new: NewVersion) -> Result<Version> {
        let attempts = self.session.config().version_retries.value.max(1);
        let mut attempt = 1;
        loop {
            match self.try_allocate(product_id, &new) {
                Err(Error::ConcurrencyConflict { reason, .. }) if attempt < attempts => {
                    debug!(product = product_id, attempt, %reason, "Version allocation conflict, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn try_allocate(&self, product_id: &str, new: &NewVersion) -> Result<Version> {
        let actor = self.session.actor().to_string();
        let author = match &new.author {
            Some(author) => author.clone(),
            None => self.session.config().author_or(&actor).to_string(),
        };
        if author.trim().is_empty() {
            return Err(Error::Validation("Version author cannot be empty".to_string()));
        }

        let version = self.session.product_locks().with(product_id, || {
            let expected = self.session.snapshot().highest_allocated(product_id);
            self.session.mutate("version.create", |g| {
                require_live(g.product(product_id)?)?;
                if let Some(task_id) = &new.task_id {
                    require_live(g.task(task_id)?)?;
                }
                let highest = g.highest_allocated(product_id);
                if highest != expected {
                    return Err(Error::ConcurrencyConflict {
                        entity_id: product_id.to_string(),
                        reason: format!("expected highest version {}, found {}", expected, highest),
                    });
                }

                let mut version = Version::new(
                    expected + 1,
                    product_id,
                    author.clone(),
                    new.comment.clone(),
                    &actor,
                );
                version.task_id = new.task_id.clone();
                version.dcc_app = new.dcc_app.clone();
                g.versions.insert(version.base.id.clone(), version.clone());

                let latest = g.compute_latest(product_id);
                let product = g.product_mut(product_id)?;
                product.latest_version = latest;
                product.base.touch(&actor);
                Ok(version)
            })
        })?;

        info!(
            product = product_id,
            version = %version.label(),
            id = %version.base.id,
            "Created version"
        );
        Ok(version)
    }

    /// Run the publishing pipeline on a Draft version.
    ///
    /// On success the version is Published and becomes the product's
    /// current version. On failure it stays Draft and unchanged.
    pub fn publish(
        &self,
        version_id: &str,
        pipeline: &PublishPipeline,
        token: &CancelToken,
    ) -> Result<Version> {
        let version = self
            .session
            .version_locks()
            .with(version_id, || pipeline.run(&self.session, version_id, token))?;
        info!(version = version_id, label = %version.label(), "Published version");
        Ok(version)
    }

    /// Run [`VersionManager::publish`] on a worker pool.
    pub fn publish_in_background(
        &self,
        pool: &WorkerPool,
        version_id: &str,
        pipeline: Arc<PublishPipeline>,
        token: CancelToken,
    ) -> JobHandle<Version> {
        let this = self.clone();
        let version_id = version_id.to_string();
        pool.spawn(move || this.publish(&version_id, &pipeline, &token))
    }

    /// Move a Published version to Archived.
    pub fn archive(&self, version_id: &str) -> Result<Version> {
        let actor = self.session.actor().to_string();
        self.session.version_locks().with(version_id, || {
            self.session.mutate("version.archive", |g| {
                let current = require_live(g.version(version_id)?)?.status;
                if current != VersionStatus::Published {
                    return Err(Error::InvalidTransition {
                        entity_id: version_id.to_string(),
                        from: current.to_string(),
                        to: VersionStatus::Archived.to_string(),
                    });
                }
                let version = g.version_mut(version_id)?;
                version.status = VersionStatus::Archived;
                version.base.touch(&actor);
                Ok(version.clone())
            })
        })
    }

    /// Point a product's current version at an earlier non-Draft version.
    ///
    /// Nothing is deleted; the move is appended to the pointer history.
    pub fn rollback(&self, product_id: &str, to_version: u32) -> Result<Product> {
        let actor = self.session.actor().to_string();
        let product = self.session.product_locks().with(product_id, || {
            self.session.mutate("version.rollback", |g| {
                let product = require_live(g.product(product_id)?)?;
                let target = g
                    .version_by_number(product_id, to_version)
                    .filter(|v| !v.base.deleted)
                    .ok_or_else(|| {
                        Error::NotFound(format!(
                            "version {} of product {}",
                            version_label(to_version),
                            product_id
                        ))
                    })?;
                if target.status == VersionStatus::Draft {
                    return Err(Error::Validation(format!(
                        "Cannot roll back to draft version {}; publish it first",
                        target.label()
                    )));
                }
                if product.current_version == Some(to_version) {
                    return Ok(product.clone());
                }
                let product = g.product_mut(product_id)?;
                product.set_current(to_version, &actor, "rollback");
                Ok(product.clone())
            })
        })?;
        info!(product = product_id, to = %version_label(to_version), "Rolled back current version");
        Ok(product)
    }

    /// Soft-delete a Draft version with its representations and files.
    pub fn delete_version(&self, version_id: &str) -> Result<()> {
        let actor = self.session.actor().to_string();
        self.session.version_locks().with(version_id, || {
            self.session.mutate("version.delete", |g| {
                let version = require_live(g.version(version_id)?)?;
                if version.status.is_immutable() {
                    return Err(immutable(version));
                }
                let product_id = version.product_id.clone();
                let rep_ids: Vec<String> = g
                    .representations_of(version_id)
                    .iter()
                    .map(|r| r.base.id.clone())
                    .collect();

                for rep_id in &rep_ids {
                    let file_ids: Vec<String> =
                        g.files_of(rep_id).iter().map(|f| f.base.id.clone()).collect();
                    for file_id in file_ids {
                        g.sync_flags.remove(&file_id);
                        let file = g.file_mut(&file_id)?;
                        file.base.deleted = true;
                        file.base.touch(&actor);
                    }
                    let rep = g.representation_mut(rep_id)?;
                    rep.base.deleted = true;
                    rep.base.touch(&actor);
                }

                let version = g.version_mut(version_id)?;
                version.base.deleted = true;
                version.base.touch(&actor);

                let latest = g.compute_latest(&product_id);
                let product = g.product_mut(&product_id)?;
                product.latest_version = latest;
                product.base.touch(&actor);
                Ok(())
            })
        })?;
        info!(version = version_id, "Deleted version");
        Ok(())
    }

    /// Attach a file-format representation to a Draft version.
    pub fn add_representation(&self, version_id: &str, format: &str) -> Result<Representation> {
        let format = format.trim().trim_start_matches('.').to_lowercase();
        if format.is_empty() || format.contains(['/', '\\']) {
            return Err(Error::Validation(format!(
                "Invalid representation format: '{}'",
                format
            )));
        }
        let actor = self.session.actor().to_string();
        self.session.version_locks().with(version_id, || {
            self.session.mutate("representation.create", |g| {
                let version = require_live(g.version(version_id)?)?;
                if version.status.is_immutable() {
                    return Err(immutable(version));
                }
                let exists = g
                    .representations_of(version_id)
                    .iter()
                    .any(|r| !r.base.deleted && r.base.name == format);
                if exists {
                    return Err(Error::Validation(format!(
                        "Representation '{}' already exists on {}",
                        format, version_id
                    )));
                }
                let rep = Representation::new(format.clone(), version_id, &actor);
                g.representations.insert(rep.base.id.clone(), rep.clone());
                Ok(rep)
            })
        })
    }

    /// Hash a file under the project root and register it on a Draft
    /// version's representation. Relative paths resolve against the root.
    pub fn add_file(&self, representation_id: &str, path: &Path) -> Result<FileInfo> {
        let root = self.session.root();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        let rel = relative_path(root, &absolute).ok_or_else(|| {
            Error::Validation(format!("{} is outside the project", absolute.display()))
        })?;
        if !is_scanned_path(&rel) {
            return Err(Error::Validation(format!(
                "{} is in a reserved or hidden directory and cannot be tracked",
                rel
            )));
        }
        let (size, hash) = hash_file(&absolute)?;
        let extension = absolute
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let mime = mime_type_for(extension);

        let version_id = self
            .session
            .snapshot()
            .representation(representation_id)?
            .version_id
            .clone();
        let actor = self.session.actor().to_string();

        let file = self.session.version_locks().with(&version_id, || {
            self.session.mutate("file.create", |g| {
                require_live(g.representation(representation_id)?)?;
                let version = require_live(g.version(&version_id)?)?;
                if version.status.is_immutable() {
                    return Err(immutable(version));
                }
                if let Some(existing) = g.file_by_path(&rel) {
                    return Err(Error::Validation(format!(
                        "{} is already tracked as {}",
                        rel, existing.base.id
                    )));
                }
                let file = FileInfo::new(rel.clone(), size, hash.clone(), representation_id, mime, &actor);
                g.files.insert(file.base.id.clone(), file.clone());
                Ok(file)
            })
        })?;
        debug!(file = %file.base.id, path = %file.path, "Registered file");
        Ok(file)
    }

    /// Save the scene open in a DCC application as the next version.
    ///
    /// The scene is copied to its canonical working-file path under the
    /// product's folder and registered as a representation named after its
    /// extension. If anything after allocation fails the new Draft is
    /// deleted again.
    pub fn create_from_dcc(
        &self,
        bridge: &mut dyn DccBridge,
        product_id: &str,
        task_id: Option<&str>,
        comment: &str,
    ) -> Result<Version> {
        let scene = dcc::save_current_scene(bridge)?;
        let app_id = bridge.app_id().to_string();
        let extension = scene
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .or_else(|| DccApp::by_id(&app_id).map(|app| app.default_extension().to_string()))
            .ok_or_else(|| Error::Dcc {
                app: app_id.clone(),
                reason: format!("scene {} has no extension", scene.display()),
            })?;

        let graph = self.session.snapshot();
        let product = require_live(graph.product(product_id)?)?;
        let folder = graph.folder(&product.folder_id)?;
        let folder_path = graph.folder_path(&folder.base.id)?;
        let segment = match task_id {
            Some(id) => require_live(graph.task(id)?)?.base.name.clone(),
            None => product.base.name.clone(),
        };

        let version = self.create_version_with(
            product_id,
            NewVersion {
                task_id: task_id.map(String::from),
                dcc_app: Some(app_id.clone()),
                ..NewVersion::new(comment)
            },
        )?;
        let name = WorkfileName::new(&folder.base.name, &segment, version.version, &extension);
        let rel = workfile_path(&folder_path, &name);

        if let Err(e) = self.attach_scene(&version, &scene, &rel) {
            if let Err(cleanup) = self.delete_version(&version.base.id) {
                warn!(version = %version.base.id, error = %cleanup, "Failed to remove incomplete version");
            }
            return Err(e);
        }
        info!(app = %app_id, version = %version.base.id, path = %rel, "Captured scene");
        Ok(version)
    }

    fn attach_scene(&self, version: &Version, scene: &Path, rel: &str) -> Result<()> {
        let dest = absolute_path(self.session.root(), rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }
        if scene != dest {
            fs::copy(scene, &dest).map_err(|e| Error::io_at(scene, e))?;
        }
        let format = dest
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let rep = self.add_representation(&version.base.id, &format)?;
        self.add_file(&rep.base.id, &dest)?;
        Ok(())
    }

    pub fn get(&self, version_id: &str) -> Result<Version> {
        Ok(self.session.snapshot().version(version_id)?.clone())
    }

    /// Live versions of a product, oldest first.
    pub fn list_versions(&self, product_id: &str) -> Result<Vec<Version>> {
        let graph = self.session.snapshot();
        graph.product(product_id)?;
        Ok(graph
            .versions_of(product_id)
            .into_iter()
            .filter(|v| !v.base.deleted)
            .cloned()
            .collect())
    }

    /// The product's current version, if one has been published.
    pub fn current(&self, product_id: &str) -> Result<Option<Version>> {
        let graph = self.session.snapshot();
        let product = graph.product(product_id)?;
        Ok(product
            .current_version
            .and_then(|n| graph.version_by_number(product_id, n))
            .cloned())
    }

    /// Live representations of a version.
    pub fn representations(&self, version_id: &str) -> Result<Vec<Representation>> {
        let graph = self.session.snapshot();
        graph.version(version_id)?;
        Ok(graph
            .representations_of(version_id)
            .into_iter()
            .filter(|r| !r.base.deleted)
            .cloned()
            .collect())
    }
}
