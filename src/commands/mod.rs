//! Command implementations for the `vg` CLI.
//!
//! Each command returns a result type implementing [`CommandResult`], which
//! the binary renders as JSON (default) or human-readable text. Commands are
//! thin: all behavior lives in the session managers.

use crate::concurrency::CancelToken;
use crate::config::{project_config_path, system_config_path, ResolvedConfig, VogueConfig};
use crate::hierarchy::FolderView;
use crate::layout::{self, DiscoveredProject};
use crate::models::{
    EntityKind, FileInfo, FolderType, ProjectInfo, ProjectSummary, Product, Representation, Task,
    TaskStatus, Version,
};
use crate::publish::PublishPipeline;
use crate::session::ProjectSession;
use crate::sync::{summarize, ScanReport};
use crate::tasks::{NewTask, TaskFilter};
use crate::versions::NewVersion;
use crate::worker::WorkerPool;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

fn task_line(task: &Task) -> String {
    let assignee = task
        .assignee
        .as_deref()
        .map(|a| format!(" @{}", a))
        .unwrap_or_default();
    format!(
        "{} [P{}] {} ({}){}",
        task.base.id, task.priority, task.base.name, task.status, assignee
    )
}

fn version_line(version: &Version) -> String {
    let comment = if version.comment.is_empty() {
        String::new()
    } else {
        format!(" - {}", version.comment)
    };
    format!(
        "{} {} [{}] by {}{}",
        version.base.id,
        version.label(),
        version.status,
        version.author,
        comment
    )
}

// === Project ===

#[derive(Serialize)]
pub struct ProjectInitialized {
    pub name: String,
    pub root: PathBuf,
    pub snapshot: PathBuf,
}

impl CommandResult for ProjectInitialized {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Initialized project '{}' at {}",
            self.name,
            self.root.display()
        )
    }
}

fn parse_resolution(s: &str) -> Result<[u32; 2]> {
    let invalid = || Error::Validation(format!("Resolution must be WIDTHxHEIGHT, got '{}'", s));
    let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
    let w = w.trim().parse().map_err(|_| invalid())?;
    let h = h.trim().parse().map_err(|_| invalid())?;
    Ok([w, h])
}

/// Create a project at `root`, creating the directory if needed.
pub fn project_init(
    root: &Path,
    name: &str,
    fps: u32,
    resolution: &str,
    departments: Vec<String>,
    config: ResolvedConfig,
    actor: &str,
) -> Result<ProjectInitialized> {
    let mut info = ProjectInfo::new(name);
    info.fps = fps;
    info.resolution = parse_resolution(resolution)?;
    if !departments.is_empty() {
        info.departments = departments;
    }
    let session = ProjectSession::init(root, info, config, actor)?;
    Ok(ProjectInitialized {
        name: name.to_string(),
        root: root.to_path_buf(),
        snapshot: session.storage().snapshot_path(),
    })
}

#[derive(Serialize)]
pub struct ProjectOverview {
    pub root: PathBuf,
    pub departments: Vec<String>,
    #[serde(flatten)]
    pub summary: ProjectSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CommandResult for ProjectOverview {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let s = &self.summary;
        let mut lines = vec![
            format!("Project: {} ({})", s.name, self.root.display()),
            format!(
                "  {} fps, {}x{}",
                s.fps, s.resolution[0], s.resolution[1]
            ),
            format!("  Departments: {}", self.departments.join(", ")),
            format!(
                "  Folders: {} ({} assets, {} shots)",
                s.folders, s.assets, s.shots
            ),
            format!("  Tasks: {}", s.tasks),
        ];
        for (status, count) in &s.tasks_by_status {
            lines.push(format!("    {}: {}", status, count));
        }
        lines.push(format!("  Products: {}", s.products));
        lines.push(format!("  Versions: {}", s.versions));
        for (status, count) in &s.versions_by_status {
            lines.push(format!("    {}: {}", status, count));
        }
        lines.push(format!(
            "  Files: {} in {} representations ({} flagged)",
            s.files, s.representations, s.flagged_files
        ));
        for warning in &self.warnings {
            lines.push(format!("  Warning: {}", warning));
        }
        lines.join("\n")
    }
}

pub fn project_info(session: &ProjectSession) -> ProjectOverview {
    let graph = session.snapshot();
    ProjectOverview {
        root: session.root().to_path_buf(),
        departments: graph.project.departments.clone(),
        summary: graph.summary(),
        warnings: session
            .load_warnings()
            .iter()
            .map(|w| w.to_string())
            .collect(),
    }
}

#[derive(Serialize)]
pub struct ProjectList {
    pub count: usize,
    pub projects: Vec<DiscoveredProject>,
}

impl CommandResult for ProjectList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }
        let mut lines = vec![format!("{} project(s):", self.count)];
        for p in &self.projects {
            lines.push(format!("  {}  {}", p.name, p.path.display()));
        }
        lines.join("\n")
    }
}

pub fn project_discover(roots: &[PathBuf]) -> ProjectList {
    let projects = layout::discover_projects(roots);
    ProjectList {
        count: projects.len(),
        projects,
    }
}

// === Folders and products ===

#[derive(Serialize)]
pub struct FolderCreated {
    #[serde(flatten)]
    pub folder: FolderView,
}

impl CommandResult for FolderCreated {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Created {} {} ({})",
            self.folder.folder.folder_type, self.folder.folder.base.id, self.folder.path
        )
    }
}

fn folder_view(session: &ProjectSession, folder: crate::models::Folder) -> Result<FolderCreated> {
    let path = session.snapshot().folder_path(&folder.base.id)?;
    Ok(FolderCreated {
        folder: FolderView { folder, path },
    })
}

pub fn folder_create(
    session: &ProjectSession,
    name: &str,
    folder_type: &str,
    parent: Option<&str>,
) -> Result<FolderCreated> {
    let folder_type = FolderType::parse(folder_type)?;
    let folder = session
        .hierarchy()
        .create_folder(name, folder_type, parent)?;
    folder_view(session, folder)
}

pub fn asset_create(
    session: &ProjectSession,
    name: &str,
    asset_type: &str,
    parent: Option<&str>,
) -> Result<FolderCreated> {
    let folder = session.hierarchy().create_asset(name, asset_type, parent)?;
    folder_view(session, folder)
}

pub fn shot_create(session: &ProjectSession, sequence: &str, shot: &str) -> Result<FolderCreated> {
    let folder = session.hierarchy().create_shot(sequence, shot)?;
    folder_view(session, folder)
}

#[derive(Serialize)]
pub struct FolderList {
    pub count: usize,
    pub folders: Vec<FolderView>,
}

impl CommandResult for FolderList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.folders.is_empty() {
            return "No folders found.".to_string();
        }
        let mut lines = vec![format!("{} folder(s):", self.count)];
        for f in &self.folders {
            lines.push(format!(
                "  {} {:<8} {}",
                f.folder.base.id, f.folder.folder_type, f.path
            ));
        }
        lines.join("\n")
    }
}

pub fn folder_list(
    session: &ProjectSession,
    parent: Option<&str>,
    recursive: bool,
) -> Result<FolderList> {
    let hierarchy = session.hierarchy();
    let folders = if recursive && parent.is_none() {
        hierarchy.walk()?
    } else if recursive {
        let prefix = match parent {
            Some(id) => format!("{}/", session.snapshot().folder_path(id)?),
            None => String::new(),
        };
        hierarchy
            .walk()?
            .into_iter()
            .filter(|f| f.path.starts_with(&prefix))
            .collect()
    } else {
        hierarchy.list_folders(parent)?
    };
    Ok(FolderList {
        count: folders.len(),
        folders,
    })
}

/// Acknowledgement of a soft delete.
#[derive(Serialize)]
pub struct Deleted {
    pub id: String,
    pub kind: EntityKind,
    pub deleted: bool,
}

impl Deleted {
    fn new(id: &str, kind: EntityKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            deleted: true,
        }
    }
}

impl CommandResult for Deleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted {} {}", self.kind, self.id)
    }
}

pub fn folder_delete(session: &ProjectSession, id: &str) -> Result<Deleted> {
    session.hierarchy().delete_folder(id)?;
    Ok(Deleted::new(id, EntityKind::Folder))
}

#[derive(Serialize)]
pub struct ProductCreated {
    #[serde(flatten)]
    pub product: Product,
}

impl CommandResult for ProductCreated {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Created product {} '{}' ({})",
            self.product.base.id, self.product.base.name, self.product.product_type
        )
    }
}

pub fn product_create(
    session: &ProjectSession,
    folder_id: &str,
    name: &str,
    product_type: &str,
) -> Result<ProductCreated> {
    let product = session
        .hierarchy()
        .create_product(folder_id, name, product_type)?;
    Ok(ProductCreated { product })
}

#[derive(Serialize)]
pub struct ProductList {
    pub count: usize,
    pub products: Vec<Product>,
}

impl CommandResult for ProductList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.products.is_empty() {
            return "No products found.".to_string();
        }
        let mut lines = vec![format!("{} product(s):", self.count)];
        for p in &self.products {
            let current = p
                .current_version
                .map(crate::models::version_label)
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "  {} {} ({}) latest v{:03}, current {}",
                p.base.id, p.base.name, p.product_type, p.latest_version, current
            ));
        }
        lines.join("\n")
    }
}

pub fn product_list(session: &ProjectSession, folder: Option<&str>) -> Result<ProductList> {
    let products = session.hierarchy().list_products(folder)?;
    Ok(ProductList {
        count: products.len(),
        products,
    })
}

pub fn product_delete(session: &ProjectSession, id: &str) -> Result<Deleted> {
    session.hierarchy().delete_product(id)?;
    Ok(Deleted::new(id, EntityKind::Product))
}

// === Versions ===

#[derive(Serialize)]
pub struct VersionResult {
    pub action: &'static str,
    #[serde(flatten)]
    pub version: Version,
}

impl CommandResult for VersionResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let verb = match self.action {
            "created" => "Created",
            "published" => "Published",
            "archived" => "Archived",
            other => other,
        };
        format!("{} {}", verb, version_line(&self.version))
    }
}

pub fn version_create(
    session: &ProjectSession,
    product_id: &str,
    new: NewVersion,
) -> Result<VersionResult> {
    let version = session.versions().create_version_with(product_id, new)?;
    Ok(VersionResult {
        action: "created",
        version,
    })
}

pub fn version_publish(session: &ProjectSession, id: &str) -> Result<VersionResult> {
    let pipeline = PublishPipeline::standard(session.config());
    let version = session
        .versions()
        .publish(id, &pipeline, &CancelToken::new())?;
    Ok(VersionResult {
        action: "published",
        version,
    })
}

pub fn version_archive(session: &ProjectSession, id: &str) -> Result<VersionResult> {
    let version = session.versions().archive(id)?;
    Ok(VersionResult {
        action: "archived",
        version,
    })
}

pub fn version_delete(session: &ProjectSession, id: &str) -> Result<Deleted> {
    session.versions().delete_version(id)?;
    Ok(Deleted::new(id, EntityKind::Version))
}

#[derive(Serialize)]
pub struct VersionList {
    pub product_id: String,
    pub current_version: Option<u32>,
    pub count: usize,
    pub versions: Vec<Version>,
}

impl CommandResult for VersionList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.versions.is_empty() {
            return format!("No versions of {}.", self.product_id);
        }
        let mut lines = vec![format!("{} version(s) of {}:", self.count, self.product_id)];
        for v in &self.versions {
            let marker = if Some(v.version) == self.current_version {
                "*"
            } else {
                " "
            };
            lines.push(format!(" {} {}", marker, version_line(v)));
        }
        lines.join("\n")
    }
}

pub fn version_list(session: &ProjectSession, product_id: &str) -> Result<VersionList> {
    let versions = session.versions().list_versions(product_id)?;
    let current_version = session.snapshot().product(product_id)?.current_version;
    Ok(VersionList {
        product_id: product_id.to_string(),
        current_version,
        count: versions.len(),
        versions,
    })
}

#[derive(Serialize)]
pub struct FileAdded {
    pub representation: Representation,
    pub file: FileInfo,
}

impl CommandResult for FileAdded {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Added {} {} to representation {} ({})",
            self.file.base.id, self.file.path, self.representation.base.id, self.representation.base.name
        )
    }
}

/// Attach a file to a version, reusing the live representation of that
/// format or creating it.
pub fn version_add_file(
    session: &ProjectSession,
    version_id: &str,
    path: &Path,
    format: Option<&str>,
) -> Result<FileAdded> {
    let format = match format {
        Some(f) => f.trim_start_matches('.').to_lowercase(),
        None => path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Cannot infer a format for {}; pass --format",
                    path.display()
                ))
            })?,
    };
    let versions = session.versions();
    let existing = versions
        .representations(version_id)?
        .into_iter()
        .find(|r| r.base.name == format);
    let representation = match existing {
        Some(rep) => rep,
        None => versions.add_representation(version_id, &format)?,
    };
    let file = versions.add_file(&representation.base.id, path)?;
    Ok(FileAdded {
        representation,
        file,
    })
}

#[derive(Serialize)]
pub struct RolledBack {
    pub product_id: String,
    pub current_version: Option<u32>,
    #[serde(flatten)]
    pub product: Product,
}

impl CommandResult for RolledBack {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self.current_version {
            Some(n) => format!(
                "Product {} now points at {}",
                self.product_id,
                crate::models::version_label(n)
            ),
            None => format!("Product {} has no current version", self.product_id),
        }
    }
}

pub fn version_rollback(
    session: &ProjectSession,
    product_id: &str,
    version: u32,
) -> Result<RolledBack> {
    let product = session.versions().rollback(product_id, version)?;
    Ok(RolledBack {
        product_id: product.base.id.clone(),
        current_version: product.current_version,
        product,
    })
}

// === Tasks ===

#[derive(Serialize)]
pub struct TaskResult {
    pub action: &'static str,
    #[serde(flatten)]
    pub task: Task,
}

impl CommandResult for TaskResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let verb = match self.action {
            "created" => "Created task",
            "assigned" => "Assigned",
            _ => "Updated",
        };
        format!("{} {}", verb, task_line(&self.task))
    }
}

/// Parameters for `task create`, as typed on the command line.
#[derive(Debug, Clone, Default)]
pub struct TaskCreateArgs {
    pub folder_id: String,
    pub name: String,
    pub task_type: String,
    pub assignee: Option<String>,
    pub priority: Option<u8>,
    pub due: Option<String>,
    pub depends_on: Vec<String>,
}

pub fn task_create(session: &ProjectSession, args: TaskCreateArgs) -> Result<TaskResult> {
    let due_date = args
        .due
        .as_deref()
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                Error::Validation(format!("Invalid due date '{}', expected YYYY-MM-DD", d))
            })
        })
        .transpose()?;
    let mut new = NewTask::new(args.folder_id, args.name, args.task_type);
    new.assignee = args.assignee;
    new.priority = args.priority;
    new.due_date = due_date;
    new.dependencies = args.depends_on;
    let task = session.tasks().create_task(new)?;
    Ok(TaskResult {
        action: "created",
        task,
    })
}

pub fn task_assign(session: &ProjectSession, id: &str, user: Option<&str>) -> Result<TaskResult> {
    let task = session.tasks().assign(id, user)?;
    Ok(TaskResult {
        action: "assigned",
        task,
    })
}

pub fn task_status(session: &ProjectSession, id: &str, status: &str) -> Result<TaskResult> {
    let status = TaskStatus::parse(status)?;
    let task = session.tasks().update_status(id, status)?;
    Ok(TaskResult {
        action: "updated",
        task,
    })
}

pub fn task_delete(session: &ProjectSession, id: &str) -> Result<Deleted> {
    session.tasks().delete_task(id)?;
    Ok(Deleted::new(id, EntityKind::Task))
}

#[derive(Serialize)]
pub struct TaskList {
    pub count: usize,
    pub tasks: Vec<Task>,
}

impl TaskList {
    fn new(tasks: Vec<Task>) -> Self {
        Self {
            count: tasks.len(),
            tasks,
        }
    }
}

impl CommandResult for TaskList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found.".to_string();
        }
        let mut lines = vec![format!("{} task(s):", self.count)];
        for task in &self.tasks {
            lines.push(format!("  {}", task_line(task)));
        }
        lines.join("\n")
    }
}

pub fn task_list(
    session: &ProjectSession,
    folder: Option<String>,
    assignee: Option<String>,
    status: Option<&str>,
) -> Result<TaskList> {
    let filter = TaskFilter {
        folder_id: folder,
        assignee,
        status: status.map(TaskStatus::parse).transpose()?,
    };
    Ok(TaskList::new(session.tasks().list(&filter)))
}

pub fn task_ready(session: &ProjectSession) -> Result<TaskList> {
    Ok(TaskList::new(session.tasks().ready_tasks()?))
}

pub fn task_blocked(session: &ProjectSession) -> Result<TaskList> {
    Ok(TaskList::new(session.tasks().blocked_tasks()?))
}

#[derive(Serialize)]
pub struct DependencyChanged {
    pub task_id: String,
    pub depends_on: String,
    pub action: &'static str,
}

impl CommandResult for DependencyChanged {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self.action {
            "added" => format!("{} now depends on {}", self.task_id, self.depends_on),
            _ => format!("{} no longer depends on {}", self.task_id, self.depends_on),
        }
    }
}

pub fn dep_add(session: &ProjectSession, task_id: &str, depends_on: &str) -> Result<DependencyChanged> {
    session.tasks().add_dependency(task_id, depends_on)?;
    Ok(DependencyChanged {
        task_id: task_id.to_string(),
        depends_on: depends_on.to_string(),
        action: "added",
    })
}

pub fn dep_rm(session: &ProjectSession, task_id: &str, depends_on: &str) -> Result<DependencyChanged> {
    session.tasks().remove_dependency(task_id, depends_on)?;
    Ok(DependencyChanged {
        task_id: task_id.to_string(),
        depends_on: depends_on.to_string(),
        action: "removed",
    })
}

// === Sync ===

#[derive(Serialize)]
pub struct ScanResult {
    #[serde(flatten)]
    pub report: ScanReport,
}

impl CommandResult for ScanResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let counts = summarize(&self.report);
        let mut lines = vec![format!(
            "Scanned {} file(s)",
            counts.get("scanned").copied().unwrap_or_default()
        )];
        for (key, count) in counts.iter().filter(|(k, c)| **k != "scanned" && **c > 0) {
            lines.push(format!("  {}: {}", key.replace('_', " "), count));
        }
        for unmatched in &self.report.unmatched {
            lines.push(format!("  ? {} ({})", unmatched.path, unmatched.reason));
        }
        lines.join("\n")
    }
}

/// Run a scan on the worker pool. Cancelling `token` stops it before any
/// change is committed.
pub fn scan(session: &ProjectSession, token: &CancelToken) -> Result<ScanResult> {
    let pool = WorkerPool::new(session.config().worker_threads.value)?;
    let report = session
        .synchronizer()
        .scan_in_background(&pool, token.clone())
        .join()?;
    Ok(ScanResult { report })
}

#[derive(Serialize)]
pub struct Verified {
    pub verified: bool,
    #[serde(flatten)]
    pub file: FileInfo,
}

impl CommandResult for Verified {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("{} {} OK ({})", self.file.base.id, self.file.path, self.file.hash)
    }
}

pub fn verify(session: &ProjectSession, file_id: &str) -> Result<Verified> {
    let file = session.synchronizer().verify(file_id)?;
    Ok(Verified {
        verified: true,
        file,
    })
}

// === Show ===

#[derive(Serialize)]
pub struct ShowResult {
    #[serde(flatten)]
    pub record: serde_json::Value,
}

impl CommandResult for ShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let kind = self.record["kind"].as_str().unwrap_or("entity");
        let id = self.record["id"].as_str().unwrap_or("?");
        let mut lines = vec![format!("{} {}", kind, id)];
        if let Some(obj) = self.record.as_object() {
            for (key, value) in obj {
                if key == "kind" || key == "id" {
                    continue;
                }
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.push(format!("  {}: {}", key, rendered));
            }
        }
        lines.join("\n")
    }
}

pub fn show(session: &ProjectSession, id: &str) -> Result<ShowResult> {
    let (_, record) = session.describe(id)?;
    Ok(ShowResult { record })
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

#[derive(Serialize)]
pub struct ConfigView {
    pub entries: Vec<ConfigEntry>,
}

impl CommandResult for ConfigView {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{:<18} {:<12} ({})", e.key, e.value, e.source))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn config_show(config: &ResolvedConfig) -> ConfigView {
    ConfigView {
        entries: config
            .entries()
            .into_iter()
            .map(|(key, value, source)| ConfigEntry { key, value, source })
            .collect(),
    }
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl CommandResult for ConfigSet {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

/// Write one key to the project config, or the system config when
/// `project_root` is `None`.
pub fn config_set(project_root: Option<&Path>, key: &str, value: &str) -> Result<ConfigSet> {
    let path = match project_root {
        Some(root) => project_config_path(root),
        None => system_config_path()
            .ok_or_else(|| Error::Config("No system config directory available".to_string()))?,
    };
    let mut config = VogueConfig::load(&path)?;
    config.set_key(key, value).map_err(Error::Config)?;
    config.save(&path)?;
    Ok(ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
        path,
    })
}
