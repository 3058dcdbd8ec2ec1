//! Filesystem synchronizer: reconciles files on disk with FileInfo records.
//!
//! A scan walks the project tree (skipping the metadata and publish
//! directories and hidden entries), hashes candidate files on a bounded set
//! of worker threads, and then applies every finding in one commit:
//!
//! - tracked files whose content changed are flagged `Modified`
//! - tracked files that disappeared are flagged `Missing`
//! - flagged files that are back to their recorded hash are cleared
//! - untracked working files that resolve to a Draft version by name are
//!   registered under a representation named after their extension
//!
//! Nothing is committed until the walk and hashing complete, so a cancelled
//! scan leaves the graph untouched. Re-running a scan over an unchanged tree
//! yields an empty delta.

pub mod naming;

use crate::concurrency::CancelToken;
use crate::dcc::mime_type_for;
use crate::layout::{absolute_path, relative_path, PUBLISH_DIR, SCENES_DIR};
use crate::models::{
    version_label, EntityGraph, FileInfo, Representation, SyncFlag, Version, VersionStatus,
};
use crate::session::ProjectSession;
use crate::storage::PIPELINE_DIR;
use crate::worker::{JobHandle, WorkerPool};
use crate::{Error, Result};
use chrono::Utc;
use naming::WorkfileName;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Hash a file with SHA-256, returning its size and hex digest.
pub fn hash_file(path: &Path) -> Result<(u64, String)> {
    let mut file = File::open(path).map_err(|e| Error::io_at(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io_at(path, e)),
        };
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((size, format!("{:x}", hasher.finalize())))
}

/// Recompute a tracked file's hash and compare it with the record.
pub fn verify_file(root: &Path, file: &FileInfo) -> Result<()> {
    let (_, actual) = hash_file(&absolute_path(root, &file.path))?;
    if actual != file.hash {
        return Err(Error::Integrity {
            file_id: file.base.id.clone(),
            path: file.path.clone(),
            expected: file.hash.clone(),
            actual,
        });
    }
    Ok(())
}

/// Changes applied by one scan. Each list holds file or representation ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanDelta {
    pub new_files: Vec<String>,
    pub new_representations: Vec<String>,
    pub modified: Vec<String>,
    pub missing: Vec<String>,
    pub restored: Vec<String>,
}

impl ScanDelta {
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty()
            && self.new_representations.is_empty()
            && self.modified.is_empty()
            && self.missing.is_empty()
            && self.restored.is_empty()
    }
}

/// A file on disk that could not be linked to a Draft version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedFile {
    pub path: String,
    pub reason: String,
}

/// Result of a completed scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub delta: ScanDelta,
    /// Informational; not part of the delta
    pub unmatched: Vec<UnmatchedFile>,
    pub files_scanned: usize,
}

/// Resolve a working-file name to the version it belongs to.
///
/// The entity segment names a folder; when several folders share the name,
/// the one whose hierarchy path matches the file's directory under
/// `06_Scenes` wins. The task segment names either a product on that folder
/// or the task a version of that number was made for.
pub fn resolve_workfile<'g>(
    graph: &'g EntityGraph,
    rel_path: &str,
    name: &WorkfileName,
) -> std::result::Result<&'g Version, String> {
    let mut folders: Vec<_> = graph
        .folders
        .values()
        .filter(|f| !f.base.deleted && f.base.name == name.entity)
        .collect();
    if folders.len() > 1 {
        let dir = rel_path
            .strip_prefix(SCENES_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.rsplit_once('/'))
            .map(|(dir, _)| dir);
        folders.retain(|f| graph.folder_path(&f.base.id).ok().as_deref() == dir);
    }
    let folder = match folders.as_slice() {
        [folder] => *folder,
        [] => return Err(format!("no folder named '{}'", name.entity)),
        _ => return Err(format!("folder '{}' is ambiguous", name.entity)),
    };

    let mut products: BTreeSet<&str> = BTreeSet::new();
    for product in graph.products_in(&folder.base.id) {
        if product.base.name == name.task {
            products.insert(&product.base.id);
            continue;
        }
        let by_task = graph
            .version_by_number(&product.base.id, name.version)
            .filter(|v| !v.base.deleted)
            .and_then(|v| v.task_id.as_deref())
            .and_then(|task_id| graph.tasks.get(task_id))
            .is_some_and(|t| !t.base.deleted && t.base.name == name.task);
        if by_task {
            products.insert(&product.base.id);
        }
    }
    let product_id = match products.len() {
        1 => products.into_iter().next().unwrap_or_default(),
        0 => {
            return Err(format!(
                "no product or task '{}' on folder '{}'",
                name.task, name.entity
            ))
        }
        _ => return Err(format!("product for '{}' is ambiguous", name.task)),
    };

    let version = graph
        .version_by_number(product_id, name.version)
        .filter(|v| !v.base.deleted)
        .ok_or_else(|| format!("version {} does not exist", version_label(name.version)))?;
    if version.status != VersionStatus::Draft {
        return Err(format!("version {} is {}", version.label(), version.status));
    }
    Ok(version)
}

/// What a candidate file on disk is, relative to the pre-scan graph.
enum Candidate {
    Tracked,
    New(WorkfileName),
}

/// Scans the project tree and verifies tracked files.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    session: ProjectSession,
}

impl Synchronizer {
    pub fn new(session: ProjectSession) -> Self {
        Self { session }
    }

    /// Walk, hash and reconcile. Returns `Err(Cancelled)` without touching
    /// the graph if `token` fires before reconciliation starts.
    pub fn scan(&self, token: &CancelToken) -> Result<ScanReport> {
        let root = self.session.root().to_path_buf();
        let disk = walk_project(&root, token)?;
        let graph = self.session.snapshot();

        let mut report = ScanReport {
            files_scanned: disk.len(),
            ..Default::default()
        };
        let mut candidates: Vec<(String, Candidate)> = Vec::new();
        for rel in &disk {
            if graph.file_by_path(rel).is_some() {
                candidates.push((rel.clone(), Candidate::Tracked));
                continue;
            }
            let file_name = rel.rsplit('/').next().unwrap_or(rel);
            let Some(name) = WorkfileName::parse(file_name) else {
                report.unmatched.push(UnmatchedFile {
                    path: rel.clone(),
                    reason: "name does not follow {Entity}_{Task}_v{NNN}.{ext}".to_string(),
                });
                continue;
            };
            match resolve_workfile(&graph, rel, &name) {
                Ok(_) => candidates.push((rel.clone(), Candidate::New(name))),
                Err(reason) => report.unmatched.push(UnmatchedFile {
                    path: rel.clone(),
                    reason,
                }),
            }
        }

        let paths: Vec<&str> = candidates.iter().map(|(p, _)| p.as_str()).collect();
        let workers = self.session.config().hash_workers.value;
        let hashes = hash_all(&root, &paths, workers, token)?;
        token.check()?;

        let on_disk: BTreeSet<&str> = disk.iter().map(String::as_str).collect();
        let actor = self.session.actor().to_string();
        let mut unmatched_late = Vec::new();
        let delta = self.session.mutate("sync.scan", |g| {
            let mut delta = ScanDelta::default();
            reconcile_tracked(g, &on_disk, &hashes, &mut delta);
            for (rel, candidate) in &candidates {
                let Candidate::New(name) = candidate else {
                    continue;
                };
                let Some((size, hash)) = hashes.get(rel.as_str()) else {
                    continue;
                };
                if g.file_by_path(rel).is_some() {
                    continue;
                }
                let version_id = match resolve_workfile(g, rel, name) {
                    Ok(version) => version.base.id.clone(),
                    Err(reason) => {
                        unmatched_late.push(UnmatchedFile {
                            path: rel.clone(),
                            reason,
                        });
                        continue;
                    }
                };
                register_file(g, &version_id, rel, name, *size, hash, &actor, &mut delta);
            }
            Ok(delta)
        })?;

        report.unmatched.extend(unmatched_late);
        report.delta = delta;
        info!(
            scanned = report.files_scanned,
            new_files = report.delta.new_files.len(),
            modified = report.delta.modified.len(),
            missing = report.delta.missing.len(),
            restored = report.delta.restored.len(),
            unmatched = report.unmatched.len(),
            "Scan complete"
        );
        Ok(report)
    }

    /// Run [`Synchronizer::scan`] on a worker pool.
    pub fn scan_in_background(&self, pool: &WorkerPool, token: CancelToken) -> JobHandle<ScanReport> {
        let this = self.clone();
        pool.spawn(move || this.scan(&token))
    }

    /// Re-hash one tracked file against its record.
    pub fn verify(&self, file_id: &str) -> Result<FileInfo> {
        let graph = self.session.snapshot();
        let file = graph.file(file_id)?;
        verify_file(self.session.root(), file)?;
        debug!(file = file_id, path = %file.path, "Verified");
        Ok(file.clone())
    }

    /// Tracked files currently flagged Modified or Missing.
    pub fn flagged(&self) -> Vec<(FileInfo, SyncFlag)> {
        let graph = self.session.snapshot();
        graph
            .sync_flags
            .iter()
            .filter_map(|(id, flag)| graph.files.get(id).map(|f| (f.clone(), flag.clone())))
            .collect()
    }
}

/// Whether a project-relative path lies in the area a scan walks: no
/// hidden component and not under `00_Pipeline` or `05_Publish`.
pub fn is_scanned_path(rel: &str) -> bool {
    let mut parts = rel.split('/').filter(|p| !p.is_empty()).peekable();
    if matches!(parts.peek(), Some(&first) if first == PIPELINE_DIR || first == PUBLISH_DIR) {
        return false;
    }
    parts.all(|part| !part.starts_with('.'))
}

/// Project-relative paths of every regular file outside the reserved
/// directories, sorted.
fn walk_project(root: &Path, token: &CancelToken) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(root).follow_links(false).into_iter();
    let entries = walker.filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return false;
        }
        !(entry.depth() == 1 && (name == PIPELINE_DIR || name == PUBLISH_DIR))
    });
    for entry in entries {
        token.check()?;
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(rel) = relative_path(root, entry.path()) {
            paths.push(rel);
        }
    }
    paths.sort();
    Ok(paths)
}

type Hashes = HashMap<String, (u64, String)>;

/// Hash `paths` on up to `workers` threads. Files that vanish mid-scan are
/// left out of the result.
fn hash_all(root: &Path, paths: &[&str], workers: usize, token: &CancelToken) -> Result<Hashes> {
    if paths.is_empty() {
        return Ok(Hashes::new());
    }
    let workers = workers.clamp(1, paths.len());
    let chunk = paths.len().div_ceil(workers);

    let results: Vec<Result<Vec<(String, (u64, String))>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = paths
            .chunks(chunk)
            .map(|part| {
                scope.spawn(move || {
                    let mut out = Vec::with_capacity(part.len());
                    for rel in part {
                        token.check()?;
                        let path: PathBuf = absolute_path(root, rel);
                        match hash_file(&path) {
                            Ok(hashed) => out.push((rel.to_string(), hashed)),
                            Err(e) if e.as_io().is_some_and(|err| err.kind() == io::ErrorKind::NotFound) => {
                                debug!(path = *rel, "File vanished during scan");
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    Ok(out)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(Error::Io(io::Error::other("hash worker panicked"))))
            })
            .collect()
    });

    let mut hashes = Hashes::new();
    for part in results {
        hashes.extend(part?);
    }
    Ok(hashes)
}

/// Update sync flags for every live tracked file.
fn reconcile_tracked(
    g: &mut EntityGraph,
    on_disk: &BTreeSet<&str>,
    hashes: &Hashes,
    delta: &mut ScanDelta,
) {
    let tracked: Vec<(String, String, String)> = g
        .files
        .values()
        .filter(|f| !f.base.deleted)
        .map(|f| (f.base.id.clone(), f.path.clone(), f.hash.clone()))
        .collect();
    let now = Utc::now();

    for (id, path, recorded) in tracked {
        if !is_scanned_path(&path) {
            // Not walked, so absence from `on_disk` says nothing
            continue;
        }
        let current = g.sync_flags.get(&id).cloned();
        if !on_disk.contains(path.as_str()) {
            if !matches!(current, Some(SyncFlag::Missing { .. })) {
                warn!(file = %id, path = %path, "Tracked file is missing");
                g.sync_flags.insert(id.clone(), SyncFlag::Missing { detected_at: now });
                delta.missing.push(id);
            }
            continue;
        }
        let Some((_, observed)) = hashes.get(&path) else {
            continue;
        };
        if *observed == recorded {
            if current.is_some() {
                debug!(file = %id, path = %path, "Tracked file restored");
                g.sync_flags.remove(&id);
                delta.restored.push(id);
            }
            continue;
        }
        let already = matches!(
            &current,
            Some(SyncFlag::Modified { observed_hash, .. }) if observed_hash == observed
        );
        if !already {
            warn!(file = %id, path = %path, "Tracked file was modified");
            g.sync_flags.insert(
                id.clone(),
                SyncFlag::Modified {
                    observed_hash: observed.clone(),
                    detected_at: now,
                },
            );
            delta.modified.push(id);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn register_file(
    g: &mut EntityGraph,
    version_id: &str,
    rel: &str,
    name: &WorkfileName,
    size: u64,
    hash: &str,
    actor: &str,
    delta: &mut ScanDelta,
) {
    let existing = g
        .representations_of(version_id)
        .into_iter()
        .find(|r| !r.base.deleted && r.base.name == name.extension)
        .map(|r| r.base.id.clone());
    let rep_id = match existing {
        Some(id) => id,
        None => {
            let rep = Representation::new(name.extension.clone(), version_id, actor);
            let id = rep.base.id.clone();
            g.representations.insert(id.clone(), rep);
            delta.new_representations.push(id.clone());
            id
        }
    };
    let file = FileInfo::new(rel, size, hash, rep_id, mime_type_for(&name.extension), actor);
    debug!(file = %file.base.id, path = rel, version = version_id, "Registered new file");
    delta.new_files.push(file.base.id.clone());
    g.files.insert(file.base.id.clone(), file);
}

/// Group scan findings by kind for display.
pub fn summarize(report: &ScanReport) -> BTreeMap<&'static str, usize> {
    BTreeMap::from([
        ("new_files", report.delta.new_files.len()),
        ("new_representations", report.delta.new_representations.len()),
        ("modified", report.delta.modified.len()),
        ("missing", report.delta.missing.len()),
        ("restored", report.delta.restored.len()),
        ("unmatched", report.unmatched.len()),
        ("scanned", report.files_scanned),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::PublishPipeline;
    use crate::tasks::NewTask;
    use crate::test_utils::TestEnv;
    use crate::versions::NewVersion;
    use std::fs;

    struct Fixture {
        env: TestEnv,
        session: ProjectSession,
        product: String,
        folder: String,
    }

    fn setup() -> Fixture {
        let env = TestEnv::new();
        let session = env.init_session();
        let folder = session
            .hierarchy()
            .create_asset("Hero", "Characters", None)
            .unwrap();
        let product = session
            .hierarchy()
            .create_product(&folder.base.id, "Model", "model")
            .unwrap();
        Fixture {
            env,
            session,
            product: product.base.id,
            folder: folder.base.id,
        }
    }

    fn write(env: &TestEnv, rel: &str, content: &[u8]) {
        let path = env.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scan(session: &ProjectSession) -> ScanReport {
        session.synchronizer().scan(&CancelToken::new()).unwrap()
    }

    #[test]
    fn test_hash_file_known_digest() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();
        let (size, hash) = hash_file(&path).unwrap();
        assert_eq!(size, 3);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_scan_registers_workfile_for_draft() {
        let fx = setup();
        let version = fx.session.versions().create_version(&fx.product, None, "").unwrap();
        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"scene");
        write(&fx.env, "03_Textures/notes.txt", b"hello");

        let report = scan(&fx.session);
        assert_eq!(report.delta.new_files.len(), 1);
        assert_eq!(report.delta.new_representations.len(), 1);
        assert_eq!(report.unmatched.len(), 1);
        assert_eq!(report.unmatched[0].path, "03_Textures/notes.txt");

        let graph = fx.session.snapshot();
        let files = graph.files_of_version(&version.base.id);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "06_Scenes/Hero/Hero_Model_v001.ma");
        assert_eq!(files[0].mime_type, "application/x-maya");
    }

    #[test]
    fn test_scan_is_idempotent() {
        let fx = setup();
        fx.session.versions().create_version(&fx.product, None, "").unwrap();
        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"scene");
        write(&fx.env, "06_Scenes/Hero/Hero_Model_v009.ma", b"no such version");

        let first = scan(&fx.session);
        assert!(!first.delta.is_empty());
        let saved = fx.session.storage().load().unwrap().snapshot.saved_at;

        let second = scan(&fx.session);
        assert!(second.delta.is_empty(), "{:?}", second.delta);
        assert_eq!(fx.session.storage().load().unwrap().snapshot.saved_at, saved);
    }

    #[test]
    fn test_scan_resolves_task_segment() {
        let fx = setup();
        let task = fx
            .session
            .tasks()
            .create_task(NewTask::new(&fx.folder, "Sculpt", "model"))
            .unwrap();
        fx.session
            .versions()
            .create_version_with(
                &fx.product,
                NewVersion {
                    task_id: Some(task.base.id.clone()),
                    ..NewVersion::new("")
                },
            )
            .unwrap();
        write(&fx.env, "06_Scenes/Hero/Hero_Sculpt_v001.blend", b"blend");
        let report = scan(&fx.session);
        assert_eq!(report.delta.new_files.len(), 1);
        let graph = fx.session.snapshot();
        let file = graph.file(&report.delta.new_files[0]).unwrap();
        assert_eq!(graph.representation(&file.representation_id).unwrap().base.name, "blend");
    }

    #[test]
    fn test_published_version_files_are_not_adopted() {
        let fx = setup();
        let version = fx.session.versions().create_version(&fx.product, None, "").unwrap();
        fx.session
            .versions()
            .publish(&version.base.id, &PublishPipeline::new(), &CancelToken::new())
            .unwrap();
        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"late");
        let report = scan(&fx.session);
        assert!(report.delta.is_empty());
        assert!(report.unmatched[0].reason.contains("published"));
    }

    #[test]
    fn test_modified_missing_and_restored_flags() {
        let fx = setup();
        fx.session.versions().create_version(&fx.product, None, "").unwrap();
        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"original");
        let file_id = scan(&fx.session).delta.new_files[0].clone();

        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"edited");
        let report = scan(&fx.session);
        assert_eq!(report.delta.modified, vec![file_id.clone()]);
        assert!(matches!(
            fx.session.synchronizer().verify(&file_id),
            Err(Error::Integrity { .. })
        ));
        // Unchanged since the last scan
        assert!(scan(&fx.session).delta.is_empty());

        fs::remove_file(fx.env.path().join("06_Scenes/Hero/Hero_Model_v001.ma")).unwrap();
        assert_eq!(scan(&fx.session).delta.missing, vec![file_id.clone()]);
        assert_eq!(fx.session.synchronizer().flagged().len(), 1);

        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"original");
        assert_eq!(scan(&fx.session).delta.restored, vec![file_id.clone()]);
        assert!(fx.session.synchronizer().verify(&file_id).is_ok());
        assert!(fx.session.snapshot().sync_flags.is_empty());
    }

    #[test]
    fn test_flags_do_not_rewrite_published_records() {
        let fx = setup();
        let versions = fx.session.versions();
        let version = versions.create_version(&fx.product, None, "").unwrap();
        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"original");
        scan(&fx.session);
        versions
            .publish(&version.base.id, &PublishPipeline::new(), &CancelToken::new())
            .unwrap();
        let before = fx.session.snapshot().files_of_version(&version.base.id)[0].clone();

        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"tampered");
        assert_eq!(scan(&fx.session).delta.modified.len(), 1);
        let after = fx.session.snapshot().files_of_version(&version.base.id)[0].clone();
        assert_eq!(before, after);
    }

    #[test]
    fn test_cancelled_scan_changes_nothing() {
        let fx = setup();
        fx.session.versions().create_version(&fx.product, None, "").unwrap();
        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"scene");
        let token = CancelToken::new();
        token.cancel();
        let before = fx.session.snapshot();
        assert!(matches!(
            fx.session.synchronizer().scan(&token),
            Err(Error::Cancelled)
        ));
        assert_eq!(*fx.session.snapshot(), *before);
    }

    #[test]
    fn test_reserved_directories_are_skipped() {
        let fx = setup();
        write(&fx.env, "05_Publish/Hero/Model/v001/ma/Hero_Model_v001.ma", b"copy");
        write(&fx.env, ".git/HEAD", b"ref");
        let report = scan(&fx.session);
        assert_eq!(report.files_scanned, 0);
    }

    #[test]
    fn test_scanned_path_rules() {
        assert!(is_scanned_path("06_Scenes/Hero/Hero_Model_v001.ma"));
        assert!(is_scanned_path("03_Textures/hero.v2.png"));
        assert!(!is_scanned_path("05_Publish/hero.abc"));
        assert!(!is_scanned_path("00_Pipeline/config.kdl"));
        assert!(!is_scanned_path("06_Scenes/.cache/hero.abc"));
        assert!(!is_scanned_path(".git/HEAD"));
        // Only the top-level directories are reserved
        assert!(is_scanned_path("06_Scenes/05_Publish/hero.abc"));
    }

    #[test]
    fn test_scan_in_background() {
        let fx = setup();
        fx.session.versions().create_version(&fx.product, None, "").unwrap();
        write(&fx.env, "06_Scenes/Hero/Hero_Model_v001.ma", b"scene");
        let pool = WorkerPool::new(1).unwrap();
        let report = fx
            .session
            .synchronizer()
            .scan_in_background(&pool, CancelToken::new())
            .join()
            .unwrap();
        assert_eq!(report.delta.new_files.len(), 1);
    }
}
