//! Data models for Vogue entities.
//!
//! This module defines the core data structures:
//! - `Folder` - Asset/shot/sequence/episode hierarchy nodes
//! - `Task` - Work items with status, priority and dependencies
//! - `Product` - Versionable deliverables attached to a folder
//! - `Version` - Numbered iterations of a product (Draft, Published, Archived)
//! - `Representation` - One file-format variant of a version
//! - `FileInfo` - A tracked file on disk with its content hash
//!
//! Every entity embeds an [`EntityBase`] and refers to other entities only by
//! id. Children, tasks, products, versions, representations and files of an
//! entity are never stored on the parent; they are derived by reverse lookup
//! in [`EntityGraph`].

pub mod graph;

pub use graph::{EntityGraph, ProjectSummary};

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Open attribute mapping carried by every entity.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Discriminator for the entity arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Folder,
    Task,
    Product,
    Version,
    Representation,
    File,
}

impl EntityKind {
    /// Prefix used for generated ids of this kind.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Folder => "fld",
            EntityKind::Task => "tsk",
            EntityKind::Product => "prd",
            EntityKind::Version => "ver",
            EntityKind::Representation => "rep",
            EntityKind::File => "fil",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Folder => "folder",
            EntityKind::Task => "task",
            EntityKind::Product => "product",
            EntityKind::Version => "version",
            EntityKind::Representation => "representation",
            EntityKind::File => "file",
        }
    }

    /// Detect the kind of an id from its prefix.
    pub fn from_id(id: &str) -> Option<Self> {
        let prefix = id.split('-').next()?;
        [
            EntityKind::Folder,
            EntityKind::Task,
            EntityKind::Product,
            EntityKind::Version,
            EntityKind::Representation,
            EntityKind::File,
        ]
        .into_iter()
        .find(|k| k.id_prefix() == prefix)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generate a unique id for an entity of the given kind.
///
/// Format: `<prefix>-<32 hex chars>`, e.g. `ver-9f1c...`.
pub fn generate_id(kind: EntityKind) -> String {
    format!("{}-{}", kind.id_prefix(), uuid::Uuid::new_v4().simple())
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Fields shared by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBase {
    /// Unique, stable identifier
    pub id: String,

    /// Machine name
    pub name: String,

    /// Optional display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,

    /// Soft-delete flag; deleted entities stay in the graph while referenced
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl EntityBase {
    /// Create a base record with a freshly generated id.
    pub fn new(kind: EntityKind, name: impl Into<String>, actor: &str) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(kind),
            name: name.into(),
            label: None,
            created_at: now,
            updated_at: now,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            deleted: false,
            tags: BTreeSet::new(),
            attributes: Attributes::new(),
        }
    }

    /// Record a modification by `actor`.
    pub fn touch(&mut self, actor: &str) {
        self.updated_at = Utc::now();
        self.updated_by = actor.to_string();
    }
}

/// Behaviour shared by all entity kinds.
pub trait Entity {
    const KIND: EntityKind;

    fn base(&self) -> &EntityBase;
    fn base_mut(&mut self) -> &mut EntityBase;

    /// Status of this entity as a lowercase string.
    fn status_str(&self) -> &'static str;

    fn id(&self) -> &str {
        &self.base().id
    }

    fn name(&self) -> &str {
        &self.base().name
    }

    fn is_deleted(&self) -> bool {
        self.base().deleted
    }
}

// === Folder ===

/// Kind of hierarchy node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderType {
    #[default]
    Asset,
    Shot,
    Sequence,
    Episode,
}

impl FolderType {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(FolderType::Asset),
            "shot" => Ok(FolderType::Shot),
            "sequence" | "seq" => Ok(FolderType::Sequence),
            "episode" | "ep" => Ok(FolderType::Episode),
            _ => Err(Error::Validation(format!("Invalid folder type: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FolderType::Asset => "asset",
            FolderType::Shot => "shot",
            FolderType::Sequence => "sequence",
            FolderType::Episode => "episode",
        }
    }
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node in the project hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(flatten)]
    pub base: EntityBase,

    pub folder_type: FolderType,

    /// Parent folder; `None` for hierarchy roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Folder {
    pub fn new(
        name: impl Into<String>,
        folder_type: FolderType,
        parent_id: Option<String>,
        actor: &str,
    ) -> Self {
        Self {
            base: EntityBase::new(EntityKind::Folder, name, actor),
            folder_type,
            parent_id,
        }
    }
}

impl Entity for Folder {
    const KIND: EntityKind = EntityKind::Folder;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn status_str(&self) -> &'static str {
        if self.base.deleted { "deleted" } else { "active" }
    }
}

// === Task ===

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Blocked,
    Done,
}

impl TaskStatus {
    /// Parse a status string, accepting a few common spellings.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "not_started" | "not-started" | "notstarted" | "pending" => Ok(TaskStatus::NotStarted),
            "in_progress" | "in-progress" | "inprogress" | "wip" => Ok(TaskStatus::InProgress),
            "blocked" => Ok(TaskStatus::Blocked),
            "done" => Ok(TaskStatus::Done),
            _ => Err(Error::Validation(format!("Invalid task status: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowest (most urgent) task priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest (least urgent) task priority.
pub const MAX_PRIORITY: u8 = 5;
/// Priority given to tasks created without one.
pub const DEFAULT_PRIORITY: u8 = 3;

/// A unit of work attached to a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    pub base: EntityBase,

    /// Department or task template, e.g. "modeling"
    pub task_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    /// Priority level (1-5)
    pub priority: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    pub folder_id: String,

    /// Task ids this task depends on
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<String>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        task_type: impl Into<String>,
        folder_id: impl Into<String>,
        actor: &str,
    ) -> Self {
        Self {
            base: EntityBase::new(EntityKind::Task, name, actor),
            task_type: task_type.into(),
            assignee: None,
            status: TaskStatus::default(),
            priority: DEFAULT_PRIORITY,
            due_date: None,
            folder_id: folder_id.into(),
            dependencies: BTreeSet::new(),
        }
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn status_str(&self) -> &'static str {
        self.status.as_str()
    }
}

// === Product ===

/// One movement of a product's "current" pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u32>,
    pub to: u32,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub reason: String,
}

/// A versionable deliverable attached to a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(flatten)]
    pub base: EntityBase,

    /// e.g. "model", "rig", "workfile"
    pub product_type: String,

    pub folder_id: String,

    /// Highest version number among non-deleted versions, 0 if none
    #[serde(default)]
    pub latest_version: u32,

    /// Version consumers should use; moved by publish and rollback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<u32>,

    /// Append-only record of current-pointer movements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pointer_history: Vec<PointerChange>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        product_type: impl Into<String>,
        folder_id: impl Into<String>,
        actor: &str,
    ) -> Self {
        Self {
            base: EntityBase::new(EntityKind::Product, name, actor),
            product_type: product_type.into(),
            folder_id: folder_id.into(),
            latest_version: 0,
            current_version: None,
            pointer_history: Vec::new(),
        }
    }

    /// Move the current pointer, recording the change.
    pub fn set_current(&mut self, to: u32, actor: &str, reason: impl Into<String>) {
        let now = Utc::now();
        self.pointer_history.push(PointerChange {
            from: self.current_version,
            to,
            changed_by: actor.to_string(),
            changed_at: now,
            reason: reason.into(),
        });
        self.current_version = Some(to);
        self.base.touch(actor);
    }
}

impl Entity for Product {
    const KIND: EntityKind = EntityKind::Product;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn status_str(&self) -> &'static str {
        if self.base.deleted { "deleted" } else { "active" }
    }
}

// === Version ===

/// Publish state of a version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::Published => "published",
            VersionStatus::Archived => "archived",
        }
    }

    /// Whether the representation/file set of a version in this state is frozen.
    pub fn is_immutable(&self) -> bool {
        !matches!(self, VersionStatus::Draft)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Render a version number as a label, e.g. `v007`.
pub fn version_label(version: u32) -> String {
    format!("v{:03}", version)
}

/// A numbered iteration of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(flatten)]
    pub base: EntityBase,

    /// Positive, unique per product, assigned by the version manager
    pub version: u32,

    pub product_id: String,

    pub author: String,

    #[serde(default)]
    pub comment: String,

    #[serde(default)]
    pub status: VersionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_id: Option<String>,

    /// Task this version was produced for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// DCC application the version was authored in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcc_app: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Version {
    pub fn new(
        version: u32,
        product_id: impl Into<String>,
        author: impl Into<String>,
        comment: impl Into<String>,
        actor: &str,
    ) -> Self {
        Self {
            base: EntityBase::new(EntityKind::Version, version_label(version), actor),
            version,
            product_id: product_id.into(),
            author: author.into(),
            comment: comment.into(),
            status: VersionStatus::Draft,
            thumbnail_id: None,
            task_id: None,
            dcc_app: None,
            published_at: None,
        }
    }

    pub fn label(&self) -> String {
        version_label(self.version)
    }
}

impl Entity for Version {
    const KIND: EntityKind = EntityKind::Version;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn status_str(&self) -> &'static str {
        self.status.as_str()
    }
}

// === Representation ===

/// One file-format variant of a version's output. `base.name` is the format
/// identifier, e.g. `ma`, `abc`, `exr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    #[serde(flatten)]
    pub base: EntityBase,

    pub version_id: String,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Representation {
    pub fn new(format: impl Into<String>, version_id: impl Into<String>, actor: &str) -> Self {
        Self {
            base: EntityBase::new(EntityKind::Representation, format, actor),
            version_id: version_id.into(),
            active: true,
        }
    }
}

impl Entity for Representation {
    const KIND: EntityKind = EntityKind::Representation;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn status_str(&self) -> &'static str {
        if self.active { "active" } else { "inactive" }
    }
}

// === FileInfo ===

/// Hash algorithm recorded on every file this crate hashes.
pub const HASH_TYPE_SHA256: &str = "sha256";

/// A tracked file on disk. `base.name` is the file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(flatten)]
    pub base: EntityBase,

    /// Path relative to the project root, slash-separated
    pub path: String,

    pub size: u64,

    /// Hex-encoded content hash
    pub hash: String,

    pub hash_type: String,

    pub representation_id: String,

    pub mime_type: String,
}

impl FileInfo {
    pub fn new(
        path: impl Into<String>,
        size: u64,
        hash: impl Into<String>,
        representation_id: impl Into<String>,
        mime_type: impl Into<String>,
        actor: &str,
    ) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            base: EntityBase::new(EntityKind::File, name, actor),
            path,
            size,
            hash: hash.into(),
            hash_type: HASH_TYPE_SHA256.to_string(),
            representation_id: representation_id.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl Entity for FileInfo {
    const KIND: EntityKind = EntityKind::File;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn status_str(&self) -> &'static str {
        if self.base.deleted { "deleted" } else { "tracked" }
    }
}

/// Reconciliation state recorded for a tracked file whose disk content no
/// longer matches its record. Kept outside `FileInfo` so records of
/// published versions are never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncFlag {
    Modified {
        observed_hash: String,
        detected_at: DateTime<Utc>,
    },
    Missing {
        detected_at: DateTime<Utc>,
    },
}

// === Project ===

/// Departments created for new projects.
pub const DEFAULT_DEPARTMENTS: &[&str] = &["Model", "Rig", "Anim", "LookDev", "FX", "Lighting", "Comp"];

/// Project-wide settings stored in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// `[width, height]`
    #[serde(default = "default_resolution")]
    pub resolution: [u32; 2],

    #[serde(default)]
    pub departments: Vec<String>,

    pub created_at: DateTime<Utc>,
}

fn default_fps() -> u32 {
    24
}

fn default_resolution() -> [u32; 2] {
    [1920, 1080]
}

impl ProjectInfo {
    /// Create project info with the default frame rate, resolution and departments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fps: default_fps(),
            resolution: default_resolution(),
            departments: DEFAULT_DEPARTMENTS.iter().map(|d| d.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Project name cannot be empty".to_string()));
        }
        if self.fps == 0 {
            return Err(Error::Validation("FPS must be positive".to_string()));
        }
        if self.resolution.iter().any(|r| *r == 0) {
            return Err(Error::Validation(format!(
                "Resolution must be positive, got {}x{}",
                self.resolution[0], self.resolution[1]
            )));
        }
        if self.departments.is_empty() || self.departments.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::Validation(
                "Departments must be a non-empty list of non-empty names".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a user-supplied entity name.
///
/// Names become path components and working-file name segments, so they must
/// be non-empty and free of path separators.
pub fn validate_name(kind: EntityKind, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation(format!("{} name cannot be empty", kind)));
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(Error::Validation(format!(
            "{} name must not contain path separators or start with '.': {}",
            kind, name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_prefix_and_kind_roundtrip() {
        let id = generate_id(EntityKind::Version);
        assert!(id.starts_with("ver-"));
        assert_eq!(id.len(), 4 + 32);
        assert_eq!(EntityKind::from_id(&id), Some(EntityKind::Version));
        assert_eq!(EntityKind::from_id("zzz-123"), None);
    }

    #[test]
    fn test_generate_id_uniqueness() {
        assert_ne!(generate_id(EntityKind::Task), generate_id(EntityKind::Task));
    }

    #[test]
    fn test_task_status_parse() {
        assert_eq!(TaskStatus::parse("done").unwrap(), TaskStatus::Done);
        assert_eq!(TaskStatus::parse("In-Progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("not_started").unwrap(), TaskStatus::NotStarted);
        assert!(TaskStatus::parse("finished").is_err());
    }

    #[test]
    fn test_folder_type_parse() {
        assert_eq!(FolderType::parse("Shot").unwrap(), FolderType::Shot);
        assert_eq!(FolderType::parse("seq").unwrap(), FolderType::Sequence);
        assert!(FolderType::parse("library").is_err());
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(1), "v001");
        assert_eq!(version_label(42), "v042");
        assert_eq!(version_label(1234), "v1234");
    }

    #[test]
    fn test_version_status_immutability() {
        assert!(!VersionStatus::Draft.is_immutable());
        assert!(VersionStatus::Published.is_immutable());
        assert!(VersionStatus::Archived.is_immutable());
    }

    #[test]
    fn test_file_info_name_from_path() {
        let file = FileInfo::new("06_Scenes/Hero/Hero_Model_v001.ma", 10, "ab", "rep-1", "text/plain", "me");
        assert_eq!(file.base.name, "Hero_Model_v001.ma");
        assert_eq!(file.hash_type, HASH_TYPE_SHA256);
    }

    #[test]
    fn test_entity_serializes_flat() {
        let folder = Folder::new("Hero", FolderType::Asset, None, "me");
        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(json["name"], "Hero");
        assert_eq!(json["folder_type"], "asset");
        assert!(json.get("deleted").is_none());
        let back: Folder = serde_json::from_value(json).unwrap();
        assert_eq!(back, folder);
    }

    #[test]
    fn test_project_info_validation() {
        let mut info = ProjectInfo::new("Show");
        assert!(info.validate().is_ok());
        info.fps = 0;
        assert!(info.validate().is_err());
        info.fps = 25;
        info.departments.clear();
        assert!(info.validate().is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name(EntityKind::Folder, "Hero").is_ok());
        assert!(validate_name(EntityKind::Folder, "  ").is_err());
        assert!(validate_name(EntityKind::Folder, "a/b").is_err());
        assert!(validate_name(EntityKind::Folder, ".hidden").is_err());
    }

    #[test]
    fn test_product_set_current_records_history() {
        let mut product = Product::new("Model", "model", "fld-1", "me");
        product.set_current(1, "me", "publish");
        product.set_current(2, "you", "publish");
        assert_eq!(product.current_version, Some(2));
        assert_eq!(product.pointer_history.len(), 2);
        assert_eq!(product.pointer_history[1].from, Some(1));
        assert_eq!(product.pointer_history[1].changed_by, "you");
    }
}
