//! Built-in publish stages.

use super::{Integrator, PublishContext, Validator};
use crate::layout::{absolute_path, PUBLISH_DIR};
use crate::sync::verify_file;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fails unless the version has at least one active representation.
pub struct HasActiveRepresentation;

impl Validator for HasActiveRepresentation {
    fn validate(&self, ctx: &PublishContext) -> Result<()> {
        let active = ctx
            .graph
            .representations_of(&ctx.version.base.id)
            .iter()
            .any(|r| !r.base.deleted && r.active);
        if !active {
            return Err(Error::Validation(format!(
                "{} has no active representation",
                ctx.version.label()
            )));
        }
        Ok(())
    }
}

/// Re-hashes every file of the version's active representations.
pub struct FilesIntact;

impl Validator for FilesIntact {
    fn validate(&self, ctx: &PublishContext) -> Result<()> {
        for file in ctx.active_files() {
            verify_file(&ctx.root, file)?;
        }
        Ok(())
    }
}

/// Copies the version's files to
/// `05_Publish/<folder path>/<product>/v<NNN>/<representation>/<file>`.
pub struct CopyToPublish;

impl CopyToPublish {
    /// Project-relative publish directory of the context's version.
    pub fn target_dir(ctx: &PublishContext) -> String {
        format!(
            "{}/{}/{}/{}",
            PUBLISH_DIR,
            ctx.folder_path,
            ctx.product.base.name,
            ctx.version.label()
        )
    }

    /// `(source, destination)` pairs for every file to copy.
    fn plan(ctx: &PublishContext) -> Result<Vec<(PathBuf, PathBuf)>> {
        let target = absolute_path(&ctx.root, &Self::target_dir(ctx));
        ctx.active_files()
            .into_iter()
            .map(|file| {
                let rep = ctx.graph.representation(&file.representation_id)?;
                Ok((
                    absolute_path(&ctx.root, &file.path),
                    target.join(&rep.base.name).join(&file.base.name),
                ))
            })
            .collect()
    }

    /// Fail if two sources would land on the same destination.
    fn check_collisions(plan: &[(PathBuf, PathBuf)]) -> Result<()> {
        let mut seen: HashMap<&Path, &Path> = HashMap::new();
        for (source, dest) in plan {
            if let Some(other) = seen.insert(dest, source) {
                return Err(Error::Validation(format!(
                    "{} and {} would both publish to {}",
                    other.display(),
                    source.display(),
                    dest.display()
                )));
            }
        }
        Ok(())
    }
}

impl Integrator for CopyToPublish {
    fn integrate(&self, ctx: &mut PublishContext) -> Result<()> {
        let plan = Self::plan(ctx)?;
        Self::check_collisions(&plan)?;
        for (source, dest) in plan {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
            }
            fs::copy(&source, &dest).map_err(|e| Error::io_at(&source, e))?;
            debug!(from = %source.display(), to = %dest.display(), "Copied to publish area");
        }
        Ok(())
    }

    fn rollback(&self, ctx: &PublishContext) -> Result<()> {
        let mut dirs = Vec::new();
        for (_, dest) in Self::plan(ctx)? {
            match fs::remove_file(&dest) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io_at(&dest, e)),
            }
            if let Some(parent) = dest.parent() {
                dirs.push(parent.to_path_buf());
            }
        }
        let publish_root = ctx.root.join(PUBLISH_DIR);
        let target = absolute_path(&ctx.root, &Self::target_dir(ctx));
        dirs.extend(
            target
                .ancestors()
                .take_while(|dir| *dir != publish_root.as_path())
                .map(PathBuf::from),
        );
        dirs.sort();
        dirs.dedup();
        // Deepest first; directories holding anything else are left alone
        for dir in dirs.iter().rev() {
            let _ = fs::remove_dir(dir);
        }
        Ok(())
    }
}
