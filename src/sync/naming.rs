//! Working-file naming convention: `{Entity}_{Task}_v{NNN}.{ext}`.
//!
//! The entity segment may itself contain underscores; the task segment is
//! whatever follows the last underscore before `_v{NNN}`.

use crate::layout::SCENES_DIR;

/// Components of a working-file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkfileName {
    pub entity: String,
    pub task: String,
    pub version: u32,
    /// Lowercased, without the dot
    pub extension: String,
}

impl WorkfileName {
    pub fn new(entity: &str, task: &str, version: u32, extension: &str) -> Self {
        Self {
            entity: entity.to_string(),
            task: task.to_string(),
            version,
            extension: extension.trim_start_matches('.').to_lowercase(),
        }
    }

    /// Parse a file name. Returns `None` if it does not follow the convention.
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, extension) = file_name.rsplit_once('.')?;
        if extension.is_empty() {
            return None;
        }
        let (prefix, digits) = stem.rsplit_once("_v")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let version: u32 = digits.parse().ok()?;
        if version == 0 {
            return None;
        }
        let (entity, task) = prefix.rsplit_once('_')?;
        if entity.is_empty() || task.is_empty() {
            return None;
        }
        Some(Self::new(entity, task, version, extension))
    }

    /// Render back to a file name, zero-padding the version to three digits.
    pub fn render(&self) -> String {
        format!(
            "{}_{}_v{:03}.{}",
            self.entity, self.task, self.version, self.extension
        )
    }
}

/// Project-relative directory holding working files for a folder.
pub fn workfile_dir(folder_path: &str) -> String {
    format!("{}/{}", SCENES_DIR, folder_path)
}

/// Project-relative canonical path of a working file.
pub fn workfile_path(folder_path: &str, name: &WorkfileName) -> String {
    format!("{}/{}", workfile_dir(folder_path), name.render())
}
