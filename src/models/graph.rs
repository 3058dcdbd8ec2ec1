//! The in-memory entity graph.
//!
//! Entities live in flat id-keyed arenas. Every relationship is stored as an
//! id on the child side only; reverse relationships are computed on demand.

use super::{
    Entity, FileInfo, Folder, FolderType, ProjectInfo, Product, Representation, SyncFlag, Task,
    TaskStatus, Version, VersionStatus, MAX_PRIORITY, MIN_PRIORITY,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Every entity in a project plus project-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityGraph {
    pub project: ProjectInfo,

    #[serde(default)]
    pub folders: BTreeMap<String, Folder>,

    #[serde(default)]
    pub tasks: BTreeMap<String, Task>,

    #[serde(default)]
    pub products: BTreeMap<String, Product>,

    #[serde(default)]
    pub versions: BTreeMap<String, Version>,

    #[serde(default)]
    pub representations: BTreeMap<String, Representation>,

    #[serde(default)]
    pub files: BTreeMap<String, FileInfo>,

    /// Reconciliation flags keyed by file id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sync_flags: BTreeMap<String, SyncFlag>,
}

macro_rules! arena_accessors {
    ($get:ident, $get_mut:ident, $field:ident, $ty:ty, $label:literal) => {
        pub fn $get(&self, id: &str) -> Result<&$ty> {
            self.$field
                .get(id)
                .ok_or_else(|| Error::NotFound(format!(concat!($label, " {}"), id)))
        }

        pub fn $get_mut(&mut self, id: &str) -> Result<&mut $ty> {
            self.$field
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(format!(concat!($label, " {}"), id)))
        }
    };
}

/// Reject soft-deleted entities where a live one is required.
pub fn require_live<T: Entity>(entity: &T) -> Result<&T> {
    if entity.is_deleted() {
        Err(Error::Validation(format!(
            "{} {} is deleted",
            T::KIND,
            entity.id()
        )))
    } else {
        Ok(entity)
    }
}

impl EntityGraph {
    /// Create an empty graph for a project.
    pub fn new(project: ProjectInfo) -> Self {
        Self {
            project,
            folders: BTreeMap::new(),
            tasks: BTreeMap::new(),
            products: BTreeMap::new(),
            versions: BTreeMap::new(),
            representations: BTreeMap::new(),
            files: BTreeMap::new(),
            sync_flags: BTreeMap::new(),
        }
    }

    arena_accessors!(folder, folder_mut, folders, Folder, "folder");
    arena_accessors!(task, task_mut, tasks, Task, "task");
    arena_accessors!(product, product_mut, products, Product, "product");
    arena_accessors!(version, version_mut, versions, Version, "version");
    arena_accessors!(
        representation,
        representation_mut,
        representations,
        Representation,
        "representation"
    );
    arena_accessors!(file, file_mut, files, FileInfo, "file");

    // === Reverse lookups ===

    /// Live root folders, sorted by name.
    pub fn root_folders(&self) -> Vec<&Folder> {
        let mut roots: Vec<&Folder> = self
            .folders
            .values()
            .filter(|f| !f.base.deleted && f.parent_id.is_none())
            .collect();
        roots.sort_by(|a, b| a.base.name.cmp(&b.base.name));
        roots
    }

    /// Live direct children of a folder, sorted by name.
    pub fn children_of(&self, folder_id: &str) -> Vec<&Folder> {
        let mut children: Vec<&Folder> = self
            .folders
            .values()
            .filter(|f| !f.base.deleted && f.parent_id.as_deref() == Some(folder_id))
            .collect();
        children.sort_by(|a, b| a.base.name.cmp(&b.base.name));
        children
    }

    /// Live tasks attached to a folder.
    pub fn tasks_in(&self, folder_id: &str) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|t| !t.base.deleted && t.folder_id == folder_id)
            .collect()
    }

    /// Live products attached to a folder.
    pub fn products_in(&self, folder_id: &str) -> Vec<&Product> {
        self.products
            .values()
            .filter(|p| !p.base.deleted && p.folder_id == folder_id)
            .collect()
    }

    /// All versions of a product, deleted included, ordered by number.
    pub fn versions_of(&self, product_id: &str) -> Vec<&Version> {
        let mut versions: Vec<&Version> = self
            .versions
            .values()
            .filter(|v| v.product_id == product_id)
            .collect();
        versions.sort_by_key(|v| v.version);
        versions
    }

    /// Representations of a version, ordered by format name.
    pub fn representations_of(&self, version_id: &str) -> Vec<&Representation> {
        let mut reps: Vec<&Representation> = self
            .representations
            .values()
            .filter(|r| r.version_id == version_id)
            .collect();
        reps.sort_by(|a, b| a.base.name.cmp(&b.base.name));
        reps
    }

    /// Files of a representation, ordered by path.
    pub fn files_of(&self, representation_id: &str) -> Vec<&FileInfo> {
        let mut files: Vec<&FileInfo> = self
            .files
            .values()
            .filter(|f| f.representation_id == representation_id)
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Files of every representation of a version.
    pub fn files_of_version(&self, version_id: &str) -> Vec<&FileInfo> {
        self.representations_of(version_id)
            .into_iter()
            .flat_map(|r| self.files_of(&r.base.id))
            .collect()
    }

    /// Live tracked file at a project-relative path.
    pub fn file_by_path(&self, path: &str) -> Option<&FileInfo> {
        self.files
            .values()
            .find(|f| !f.base.deleted && f.path == path)
    }

    /// Live tasks that depend on `task_id`.
    pub fn dependents_of(&self, task_id: &str) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|t| !t.base.deleted && t.dependencies.contains(task_id))
            .collect()
    }

    /// Version of a product by number, deleted included.
    pub fn version_by_number(&self, product_id: &str, number: u32) -> Option<&Version> {
        self.versions
            .values()
            .find(|v| v.product_id == product_id && v.version == number)
    }

    /// Live product on a folder by name.
    pub fn product_by_name(&self, folder_id: &str, name: &str) -> Option<&Product> {
        self.products
            .values()
            .find(|p| !p.base.deleted && p.folder_id == folder_id && p.base.name == name)
    }

    /// Highest number ever allocated for a product, deleted versions included.
    pub fn highest_allocated(&self, product_id: &str) -> u32 {
        self.versions
            .values()
            .filter(|v| v.product_id == product_id)
            .map(|v| v.version)
            .max()
            .unwrap_or(0)
    }

    /// Highest number among a product's live versions, 0 if none.
    pub fn compute_latest(&self, product_id: &str) -> u32 {
        self.versions
            .values()
            .filter(|v| v.product_id == product_id && !v.base.deleted)
            .map(|v| v.version)
            .max()
            .unwrap_or(0)
    }

    // === Hierarchy paths ===

    /// Slash-joined names from the hierarchy root down to `folder_id`.
    pub fn folder_path(&self, folder_id: &str) -> Result<String> {
        let mut names = Vec::new();
        let mut current = Some(folder_id.to_string());
        let mut seen = HashSet::new();

        while let Some(id) = current {
            if !seen.insert(id.clone()) {
                return Err(Error::Validation(format!(
                    "Folder hierarchy cycle at {}",
                    id
                )));
            }
            let folder = self.folder(&id)?;
            names.push(folder.base.name.clone());
            current = folder.parent_id.clone();
        }

        names.reverse();
        Ok(names.join("/"))
    }

    /// Live folder at a slash-joined hierarchy path.
    pub fn folder_by_path(&self, path: &str) -> Option<&Folder> {
        let mut current: Option<&Folder> = None;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let parent_id = current.map(|f| f.base.id.as_str());
            current = self.folders.values().find(|f| {
                !f.base.deleted && f.parent_id.as_deref() == parent_id && f.base.name == segment
            });
            current?;
        }
        current
    }

    // === Task dependency graph ===

    /// Whether adding `task_id -> depends_on_id` would close a cycle, i.e.
    /// whether `task_id` is already reachable from `depends_on_id`.
    pub fn would_create_cycle(&self, task_id: &str, depends_on_id: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![depends_on_id.to_string()];

        while let Some(current) = stack.pop() {
            if current == task_id {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(task) = self.tasks.get(&current) {
                for dep in &task.dependencies {
                    if !visited.contains(dep) {
                        stack.push(dep.clone());
                    }
                }
            }
        }

        false
    }

    /// Transitive dependencies of a task that are live and not Done.
    ///
    /// Deleted tasks are treated as removed from the graph: they neither
    /// block nor propagate their own dependencies.
    pub fn unfinished_dependencies(&self, task_id: &str) -> Result<Vec<&Task>> {
        let task = self.task(task_id)?;
        let mut visited = HashSet::new();
        let mut stack: Vec<&str> = task.dependencies.iter().map(String::as_str).collect();
        let mut unfinished = Vec::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(dep) = self.tasks.get(current) else {
                continue;
            };
            if dep.base.deleted {
                continue;
            }
            if dep.status != TaskStatus::Done {
                unfinished.push(dep);
            }
            for next in &dep.dependencies {
                if !visited.contains(next.as_str()) {
                    stack.push(next);
                }
            }
        }

        unfinished.sort_by(|a, b| a.base.id.cmp(&b.base.id));
        Ok(unfinished)
    }

    /// First task found on a dependency cycle, if any.
    fn find_dependency_cycle(&self) -> Option<String> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();

        for start in self.tasks.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            // (node, expanded) pairs for an iterative post-order walk
            let mut stack: Vec<(&str, bool)> = vec![(start.as_str(), false)];
            while let Some((node, expanded)) = stack.pop() {
                if expanded {
                    marks.insert(node, Mark::Done);
                    continue;
                }
                match marks.get(node) {
                    Some(Mark::Done) => continue,
                    Some(Mark::InProgress) => return Some(node.to_string()),
                    None => {}
                }
                marks.insert(node, Mark::InProgress);
                stack.push((node, true));
                if let Some(task) = self.tasks.get(node) {
                    for dep in &task.dependencies {
                        match marks.get(dep.as_str()) {
                            Some(Mark::InProgress) => return Some(dep.clone()),
                            Some(Mark::Done) => {}
                            None => stack.push((dep.as_str(), false)),
                        }
                    }
                }
            }
        }

        None
    }

    // === Invariants ===

    /// Check every structural invariant of the graph.
    ///
    /// Run before each commit; a graph that fails here is never persisted.
    pub fn validate(&self) -> Result<()> {
        self.project.validate()?;
        self.validate_keys()?;
        self.validate_folders()?;
        self.validate_tasks()?;
        self.validate_products_and_versions()?;

        for rep in self.representations.values() {
            self.version(&rep.version_id).map_err(|_| {
                Error::Validation(format!(
                    "Representation {} references missing version {}",
                    rep.base.id, rep.version_id
                ))
            })?;
        }

        let mut paths = HashSet::new();
        for file in self.files.values() {
            self.representation(&file.representation_id).map_err(|_| {
                Error::Validation(format!(
                    "File {} references missing representation {}",
                    file.base.id, file.representation_id
                ))
            })?;
            if !file.base.deleted && !paths.insert(file.path.as_str()) {
                return Err(Error::Validation(format!(
                    "Path {} is tracked by more than one file",
                    file.path
                )));
            }
        }

        if let Some(id) = self.sync_flags.keys().find(|id| !self.files.contains_key(*id)) {
            return Err(Error::Validation(format!(
                "Sync flag references missing file {}",
                id
            )));
        }

        Ok(())
    }

    fn validate_keys(&self) -> Result<()> {
        fn check<T: Entity>(map: &BTreeMap<String, T>) -> Result<()> {
            for (key, entity) in map {
                if key != entity.id() {
                    return Err(Error::Validation(format!(
                        "{} stored under {} has id {}",
                        T::KIND,
                        key,
                        entity.id()
                    )));
                }
            }
            Ok(())
        }
        check(&self.folders)?;
        check(&self.tasks)?;
        check(&self.products)?;
        check(&self.versions)?;
        check(&self.representations)?;
        check(&self.files)
    }

    fn validate_folders(&self) -> Result<()> {
        let mut siblings = HashSet::new();
        for folder in self.folders.values() {
            if let Some(parent_id) = &folder.parent_id {
                self.folder(parent_id).map_err(|_| {
                    Error::Validation(format!(
                        "Folder {} references missing parent {}",
                        folder.base.id, parent_id
                    ))
                })?;
            }
            // Walks to the root; fails on a parent cycle
            self.folder_path(&folder.base.id)?;

            if !folder.base.deleted
                && !siblings.insert((folder.parent_id.as_deref(), folder.base.name.as_str()))
            {
                return Err(Error::Validation(format!(
                    "Duplicate folder name '{}' under the same parent",
                    folder.base.name
                )));
            }
        }
        Ok(())
    }

    fn validate_tasks(&self) -> Result<()> {
        for task in self.tasks.values() {
            self.folder(&task.folder_id).map_err(|_| {
                Error::Validation(format!(
                    "Task {} references missing folder {}",
                    task.base.id, task.folder_id
                ))
            })?;
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&task.priority) {
                return Err(Error::Validation(format!(
                    "Task {} priority {} out of range {}-{}",
                    task.base.id, task.priority, MIN_PRIORITY, MAX_PRIORITY
                )));
            }
            for dep in &task.dependencies {
                if dep == &task.base.id {
                    return Err(Error::Validation(format!(
                        "Task {} depends on itself",
                        task.base.id
                    )));
                }
                if !self.tasks.contains_key(dep) {
                    return Err(Error::Validation(format!(
                        "Task {} depends on missing task {}",
                        task.base.id, dep
                    )));
                }
            }
        }
        if let Some(id) = self.find_dependency_cycle() {
            return Err(Error::Validation(format!(
                "Task dependency cycle through {}",
                id
            )));
        }
        Ok(())
    }

    fn validate_products_and_versions(&self) -> Result<()> {
        let mut numbers = HashSet::new();
        for version in self.versions.values() {
            self.product(&version.product_id).map_err(|_| {
                Error::Validation(format!(
                    "Version {} references missing product {}",
                    version.base.id, version.product_id
                ))
            })?;
            if version.version == 0 {
                return Err(Error::Validation(format!(
                    "Version {} has number 0",
                    version.base.id
                )));
            }
            if !numbers.insert((version.product_id.as_str(), version.version)) {
                return Err(Error::Validation(format!(
                    "Duplicate version number {} for product {}",
                    version.version, version.product_id
                )));
            }
            if version.base.deleted && version.status != VersionStatus::Draft {
                return Err(Error::Validation(format!(
                    "Version {} is {} and cannot be deleted",
                    version.base.id, version.status
                )));
            }
        }

        for product in self.products.values() {
            self.folder(&product.folder_id).map_err(|_| {
                Error::Validation(format!(
                    "Product {} references missing folder {}",
                    product.base.id, product.folder_id
                ))
            })?;
            let latest = self.compute_latest(&product.base.id);
            if product.latest_version != latest {
                return Err(Error::Validation(format!(
                    "Product {} latest_version is {} but highest live version is {}",
                    product.base.id, product.latest_version, latest
                )));
            }
            if let Some(current) = product.current_version {
                match self.version_by_number(&product.base.id, current) {
                    Some(v) if !v.base.deleted && v.status != VersionStatus::Draft => {}
                    _ => {
                        return Err(Error::Validation(format!(
                            "Product {} current version {} is not a live published or archived version",
                            product.base.id, current
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Reject changes to the representation and file records of versions
    /// that were Published or Archived in `before`.
    pub fn check_frozen_versions(&self, before: &EntityGraph) -> Result<()> {
        for (id, old) in &before.versions {
            if !old.status.is_immutable() {
                continue;
            }
            let frozen = |status: VersionStatus| Error::ImmutableVersion {
                version_id: id.clone(),
                status: status.to_string(),
            };
            let Some(new) = self.versions.get(id) else {
                return Err(frozen(old.status));
            };
            if new.version != old.version || new.product_id != old.product_id {
                return Err(frozen(old.status));
            }
            if before.representations_of(id) != self.representations_of(id)
                || before.files_of_version(id) != self.files_of_version(id)
            {
                return Err(frozen(old.status));
            }
        }
        Ok(())
    }

    // === Summary ===

    /// Aggregate counts for reporting.
    pub fn summary(&self) -> ProjectSummary {
        let live_folders = self.folders.values().filter(|f| !f.base.deleted);
        let mut assets = 0;
        let mut shots = 0;
        let mut folders = 0;
        for folder in live_folders {
            folders += 1;
            match folder.folder_type {
                FolderType::Asset => assets += 1,
                FolderType::Shot => shots += 1,
                _ => {}
            }
        }

        let mut tasks_by_status = BTreeMap::new();
        for task in self.tasks.values().filter(|t| !t.base.deleted) {
            *tasks_by_status
                .entry(task.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut versions_by_status = BTreeMap::new();
        for version in self.versions.values().filter(|v| !v.base.deleted) {
            *versions_by_status
                .entry(version.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        ProjectSummary {
            name: self.project.name.clone(),
            fps: self.project.fps,
            resolution: self.project.resolution,
            folders,
            assets,
            shots,
            tasks: tasks_by_status.values().sum(),
            tasks_by_status,
            products: self.products.values().filter(|p| !p.base.deleted).count(),
            versions: versions_by_status.values().sum(),
            versions_by_status,
            representations: self
                .representations
                .values()
                .filter(|r| !r.base.deleted)
                .count(),
            files: self.files.values().filter(|f| !f.base.deleted).count(),
            flagged_files: self.sync_flags.len(),
        }
    }
}

/// Aggregate counts over a project graph.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub fps: u32,
    pub resolution: [u32; 2],
    pub folders: usize,
    pub assets: usize,
    pub shots: usize,
    pub tasks: usize,
    pub tasks_by_status: BTreeMap<String, usize>,
    pub products: usize,
    pub versions: usize,
    pub versions_by_status: BTreeMap<String, usize>,
    pub representations: usize,
    pub files: usize,
    pub flagged_files: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FolderType, ProjectInfo};

    fn add_folder(g: &mut EntityGraph, name: &str, parent: Option<&str>) -> String {
        let f = Folder::new(name, FolderType::Asset, parent.map(String::from), "t");
        let id = f.base.id.clone();
        g.folders.insert(id.clone(), f);
        id
    }

    fn add_task(g: &mut EntityGraph, name: &str, folder: &str) -> String {
        let t = Task::new(name, "model", folder, "t");
        let id = t.base.id.clone();
        g.tasks.insert(id.clone(), t);
        id
    }

    fn add_product(g: &mut EntityGraph, folder: &str) -> String {
        let p = Product::new("modelMain", "model", folder, "t");
        let id = p.base.id.clone();
        g.products.insert(id.clone(), p);
        id
    }

    fn add_version(g: &mut EntityGraph, product: &str, n: u32) -> String {
        let v = Version::new(n, product, "t", "", "t");
        let id = v.base.id.clone();
        g.versions.insert(id.clone(), v);
        let latest = g.compute_latest(product);
        g.products.get_mut(product).unwrap().latest_version = latest;
        id
    }

    fn graph() -> EntityGraph {
        EntityGraph::new(ProjectInfo::new("test"))
    }

    #[test]
    fn test_empty_graph_is_valid() {
        assert!(graph().validate().is_ok());
    }

    #[test]
    fn test_folder_path_and_lookup() {
        let mut g = graph();
        let seq = add_folder(&mut g, "SQ010", None);
        let shot = add_folder(&mut g, "SH020", Some(&seq));
        assert_eq!(g.folder_path(&shot).unwrap(), "SQ010/SH020");
        assert_eq!(g.folder_by_path("SQ010/SH020").unwrap().base.id, shot);
        assert!(g.folder_by_path("SQ010/SH999").is_none());
        assert_eq!(g.children_of(&seq).len(), 1);
        assert_eq!(g.root_folders().len(), 1);
    }

    #[test]
    fn test_folder_parent_cycle_rejected() {
        let mut g = graph();
        let a = add_folder(&mut g, "A", None);
        let b = add_folder(&mut g, "B", Some(&a));
        g.folders.get_mut(&a).unwrap().parent_id = Some(b);
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_duplicate_sibling_names_rejected() {
        let mut g = graph();
        add_folder(&mut g, "Hero", None);
        add_folder(&mut g, "Hero", None);
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_would_create_cycle() {
        let mut g = graph();
        let f = add_folder(&mut g, "Hero", None);
        let a = add_task(&mut g, "a", &f);
        let b = add_task(&mut g, "b", &f);
        let c = add_task(&mut g, "c", &f);
        // a -> b -> c
        g.tasks.get_mut(&a).unwrap().dependencies.insert(b.clone());
        g.tasks.get_mut(&b).unwrap().dependencies.insert(c.clone());

        assert!(g.would_create_cycle(&c, &a));
        assert!(!g.would_create_cycle(&a, &c));
        assert!(g.validate().is_ok());

        g.tasks.get_mut(&c).unwrap().dependencies.insert(a.clone());
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_unfinished_dependencies_skips_done_and_deleted() {
        let mut g = graph();
        let f = add_folder(&mut g, "Hero", None);
        let a = add_task(&mut g, "a", &f);
        let b = add_task(&mut g, "b", &f);
        let c = add_task(&mut g, "c", &f);
        g.tasks.get_mut(&a).unwrap().dependencies.insert(b.clone());
        g.tasks.get_mut(&b).unwrap().dependencies.insert(c.clone());

        let ids: Vec<String> = g
            .unfinished_dependencies(&a)
            .unwrap()
            .iter()
            .map(|t| t.base.id.clone())
            .collect();
        assert_eq!(ids.len(), 2);

        // Done b still propagates c
        g.tasks.get_mut(&b).unwrap().status = TaskStatus::Done;
        let deps = g.unfinished_dependencies(&a).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].base.id, c);

        g.tasks.get_mut(&c).unwrap().base.deleted = true;
        assert!(g.unfinished_dependencies(&a).unwrap().is_empty());
    }

    #[test]
    fn test_latest_version_invariant() {
        let mut g = graph();
        let f = add_folder(&mut g, "Hero", None);
        let p = add_product(&mut g, &f);
        add_version(&mut g, &p, 1);
        let v2 = add_version(&mut g, &p, 2);
        assert!(g.validate().is_ok());
        assert_eq!(g.product(&p).unwrap().latest_version, 2);

        g.versions.get_mut(&v2).unwrap().base.deleted = true;
        assert!(g.validate().is_err());
        g.products.get_mut(&p).unwrap().latest_version = g.compute_latest(&p);
        assert!(g.validate().is_ok());
        assert_eq!(g.highest_allocated(&p), 2);
        assert_eq!(g.compute_latest(&p), 1);
    }

    #[test]
    fn test_duplicate_version_number_rejected() {
        let mut g = graph();
        let f = add_folder(&mut g, "Hero", None);
        let p = add_product(&mut g, &f);
        add_version(&mut g, &p, 1);
        add_version(&mut g, &p, 1);
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_current_version_must_be_published() {
        let mut g = graph();
        let f = add_folder(&mut g, "Hero", None);
        let p = add_product(&mut g, &f);
        let v = add_version(&mut g, &p, 1);
        g.products.get_mut(&p).unwrap().current_version = Some(1);
        assert!(g.validate().is_err());
        g.versions.get_mut(&v).unwrap().status = VersionStatus::Published;
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_frozen_version_detects_new_representation() {
        let mut g = graph();
        let f = add_folder(&mut g, "Hero", None);
        let p = add_product(&mut g, &f);
        let v = add_version(&mut g, &p, 1);
        g.versions.get_mut(&v).unwrap().status = VersionStatus::Published;
        let before = g.clone();

        // Archiving is allowed
        g.versions.get_mut(&v).unwrap().status = VersionStatus::Archived;
        assert!(g.check_frozen_versions(&before).is_ok());

        let rep = Representation::new("abc", v.clone(), "t");
        g.representations.insert(rep.base.id.clone(), rep);
        match g.check_frozen_versions(&before).unwrap_err() {
            Error::ImmutableVersion { version_id, .. } => assert_eq!(version_id, v),
            e => panic!("Expected ImmutableVersion, got {:?}", e),
        }
    }

    #[test]
    fn test_file_paths_unique() {
        let mut g = graph();
        let f = add_folder(&mut g, "Hero", None);
        let p = add_product(&mut g, &f);
        let v = add_version(&mut g, &p, 1);
        let rep = Representation::new("ma", v, "t");
        let rep_id = rep.base.id.clone();
        g.representations.insert(rep_id.clone(), rep);
        for _ in 0..2 {
            let file = FileInfo::new("a/b.ma", 1, "00", rep_id.clone(), "text/plain", "t");
            g.files.insert(file.base.id.clone(), file);
        }
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_summary_counts() {
        let mut g = graph();
        let f = add_folder(&mut g, "Hero", None);
        add_task(&mut g, "a", &f);
        let p = add_product(&mut g, &f);
        add_version(&mut g, &p, 1);
        let s = g.summary();
        assert_eq!(s.assets, 1);
        assert_eq!(s.tasks, 1);
        assert_eq!(s.tasks_by_status.get("not_started"), Some(&1));
        assert_eq!(s.versions, 1);
        assert_eq!(s.versions_by_status.get("draft"), Some(&1));
        assert_eq!(s.representations, 0);
    }
}
