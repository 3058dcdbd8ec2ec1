//! On-disk project layout and project discovery.

use crate::storage::{PIPELINE_DIR, SNAPSHOT_FILE};
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory receiving copies of published files.
pub const PUBLISH_DIR: &str = "05_Publish";
/// Directory holding working scene files.
pub const SCENES_DIR: &str = "06_Scenes";

/// Standard directories of a new project, relative to its root.
pub const STANDARD_DIRS: &[&str] = &[
    "00_Pipeline",
    "00_Pipeline/templates",
    "01_Assets/Characters",
    "01_Assets/Props",
    "01_Assets/Environments",
    "02_Shots",
    "03_Textures",
    "04_Designs",
    "05_Publish",
    "06_Scenes/Assets/Characters",
    "06_Scenes/Assets/Props",
    "06_Scenes/Assets/Environments",
    "06_Scenes/Shots",
    "07_Renders",
];

/// Create the standard directory tree under `root`. Existing directories are kept.
pub fn ensure_layout(root: &Path) -> Result<()> {
    for dir in STANDARD_DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path).map_err(|e| Error::io_at(&path, e))?;
    }
    Ok(())
}

/// A project found under a library root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredProject {
    pub name: String,
    pub path: PathBuf,
}

/// List immediate subdirectories of `roots` that hold a project snapshot.
///
/// Missing or unreadable roots are skipped.
pub fn discover_projects(roots: &[PathBuf]) -> Vec<DiscoveredProject> {
    let mut projects = Vec::new();
    for root in roots {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                if root.exists() {
                    warn!(root = %root.display(), error = %e, "Failed to scan library root");
                }
                continue;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() && path.join(PIPELINE_DIR).join(SNAPSHOT_FILE).is_file() {
                projects.push(DiscoveredProject {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    path,
                });
            }
        }
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    projects
}

/// Nearest ancestor of `start` (inclusive) that holds a project snapshot.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PIPELINE_DIR).join(SNAPSHOT_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Render a project-relative path with forward slashes.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Resolve a slash-separated project-relative path.
pub fn absolute_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}
