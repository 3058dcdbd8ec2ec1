//! Publishing pipeline: ordered validators, then ordered integrators.
//!
//! Validators check preconditions and have no side effects; the first
//! failure aborts the run. Integrators perform side effects (copies,
//! registrations) and each exposes a compensating rollback. If an
//! integrator fails, or the run is cancelled once integrators have begun,
//! every integrator that already completed is rolled back in reverse order
//! before the error is returned.
//!
//! Graph changes made during a run are staged on the [`PublishContext`] and
//! committed together with the status change in a single write, so a failed
//! run leaves the version exactly as it was.

pub mod builtin;

pub use builtin::{CopyToPublish, FilesIntact, HasActiveRepresentation};

use crate::concurrency::CancelToken;
use crate::config::ResolvedConfig;
use crate::models::graph::require_live;
use crate::models::{EntityGraph, FileInfo, Product, Representation, Version, VersionStatus};
use crate::session::ProjectSession;
use crate::{Error, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Records an integrator wants attached to the version on success.
#[derive(Debug, Clone, Default)]
pub struct StagedRecords {
    pub representations: Vec<Representation>,
    pub files: Vec<FileInfo>,
}

/// Everything a stage can see about the version being published.
#[derive(Debug, Clone)]
pub struct PublishContext {
    pub root: PathBuf,
    pub actor: String,
    /// Graph as of the start of the run
    pub graph: Arc<EntityGraph>,
    pub version: Version,
    pub product: Product,
    /// Hierarchy path of the product's folder
    pub folder_path: String,
    pub staged: StagedRecords,
}

impl PublishContext {
    fn new(session: &ProjectSession, version_id: &str) -> Result<Self> {
        let graph = session.snapshot();
        let version = require_live(graph.version(version_id)?)?.clone();
        if version.status != VersionStatus::Draft {
            return Err(Error::InvalidTransition {
                entity_id: version_id.to_string(),
                from: version.status.to_string(),
                to: VersionStatus::Published.to_string(),
            });
        }
        let product = require_live(graph.product(&version.product_id)?)?.clone();
        let folder_path = graph.folder_path(&product.folder_id)?;
        Ok(Self {
            root: session.root().to_path_buf(),
            actor: session.actor().to_string(),
            graph,
            version,
            product,
            folder_path,
            staged: StagedRecords::default(),
        })
    }

    /// Live files of the version's active representations.
    pub fn active_files(&self) -> Vec<&FileInfo> {
        self.graph
            .representations_of(&self.version.base.id)
            .into_iter()
            .filter(|r| !r.base.deleted && r.active)
            .flat_map(|r| self.graph.files_of(&r.base.id))
            .filter(|f| !f.base.deleted)
            .collect()
    }
}

/// Side-effect-free precondition check.
pub trait Validator: Send + Sync {
    fn validate(&self, ctx: &PublishContext) -> Result<()>;
}

impl<F> Validator for F
where
    F: Fn(&PublishContext) -> Result<()> + Send + Sync,
{
    fn validate(&self, ctx: &PublishContext) -> Result<()> {
        self(ctx)
    }
}

/// Side-effecting publish step with a compensating rollback.
pub trait Integrator: Send + Sync {
    fn integrate(&self, ctx: &mut PublishContext) -> Result<()>;

    /// Undo what `integrate` did for this context.
    fn rollback(&self, ctx: &PublishContext) -> Result<()>;
}

/// Integrator built from a pair of closures.
pub struct FnIntegrator<I, R> {
    integrate: I,
    rollback: R,
}

impl<I, R> FnIntegrator<I, R>
where
    I: Fn(&mut PublishContext) -> Result<()> + Send + Sync,
    R: Fn(&PublishContext) -> Result<()> + Send + Sync,
{
    pub fn new(integrate: I, rollback: R) -> Self {
        Self { integrate, rollback }
    }
}

impl<I, R> Integrator for FnIntegrator<I, R>
where
    I: Fn(&mut PublishContext) -> Result<()> + Send + Sync,
    R: Fn(&PublishContext) -> Result<()> + Send + Sync,
{
    fn integrate(&self, ctx: &mut PublishContext) -> Result<()> {
        (self.integrate)(ctx)
    }

    fn rollback(&self, ctx: &PublishContext) -> Result<()> {
        (self.rollback)(ctx)
    }
}

fn stage_error(version_id: &str, stage: &str, err: &Error) -> Error {
    Error::Publish {
        version_id: version_id.to_string(),
        stage: stage.to_string(),
        reason: err.to_string(),
    }
}

/// Ordered validator and integrator chain.
#[derive(Default)]
pub struct PublishPipeline {
    validators: Vec<Box<dyn Validator>>,
    integrators: Vec<Box<dyn Integrator>>,
}

impl PublishPipeline {
    /// An empty pipeline: publishing only flips the status.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in stages: representation and integrity checks, plus the
    /// copy into the publish area when `publish-copy` is enabled.
    pub fn standard(config: &ResolvedConfig) -> Self {
        let mut pipeline = Self::new()
            .add_validator(HasActiveRepresentation)
            .add_validator(FilesIntact);
        if config.publish_copy.value {
            pipeline = pipeline.add_integrator(CopyToPublish);
        }
        pipeline
    }

    pub fn add_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn add_integrator(mut self, integrator: impl Integrator + 'static) -> Self {
        self.integrators.push(Box::new(integrator));
        self
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    pub fn integrator_count(&self) -> usize {
        self.integrators.len()
    }

    /// Run the pipeline and, if every stage passes, mark the version
    /// Published and move the product's current pointer to it.
    ///
    /// Callers serialize runs per version; [`crate::versions::VersionManager::publish`]
    /// does so with the version lock.
    pub fn run(
        &self,
        session: &ProjectSession,
        version_id: &str,
        token: &CancelToken,
    ) -> Result<Version> {
        let mut ctx = PublishContext::new(session, version_id)?;

        for (i, validator) in self.validators.iter().enumerate() {
            token.check()?;
            let stage = format!("validator[{}]", i);
            validator
                .validate(&ctx)
                .map_err(|e| stage_error(version_id, &stage, &e))?;
            debug!(version = version_id, %stage, "Validator passed");
        }
        token.check()?;

        let mut completed = 0;
        for (i, integrator) in self.integrators.iter().enumerate() {
            let stage = format!("integrator[{}]", i);
            if token.is_cancelled() {
                self.unwind(&ctx, completed);
                return Err(Error::Cancelled);
            }
            if let Err(e) = integrator.integrate(&mut ctx) {
                // The failing integrator is rolled back too
                let undone = self.unwind(&ctx, i + 1);
                return Err(with_rollback_note(stage_error(version_id, &stage, &e), undone));
            }
            completed = i + 1;
            debug!(version = version_id, %stage, "Integrator completed");
        }

        match commit_published(session, &ctx) {
            Ok(version) => {
                info!(
                    version = version_id,
                    integrators = completed,
                    "Publish pipeline completed"
                );
                Ok(version)
            }
            Err(e) => {
                let undone = self.unwind(&ctx, completed);
                Err(with_rollback_note(stage_error(version_id, "commit", &e), undone))
            }
        }
    }

    /// Roll back the first `count` integrators in reverse order. Returns the
    /// failures as `(stage, message)` pairs.
    fn unwind(&self, ctx: &PublishContext, count: usize) -> Vec<(String, String)> {
        let mut failures = Vec::new();
        for (i, integrator) in self.integrators.iter().enumerate().take(count).rev() {
            let stage = format!("integrator[{}]", i);
            match integrator.rollback(ctx) {
                Ok(()) => debug!(version = %ctx.version.base.id, %stage, "Integrator rolled back"),
                Err(e) => {
                    warn!(version = %ctx.version.base.id, stage, error = %e, "Integrator rollback failed");
                    failures.push((stage, e.to_string()));
                }
            }
        }
        failures
    }
}

fn with_rollback_note(err: Error, failures: Vec<(String, String)>) -> Error {
    if failures.is_empty() {
        return err;
    }
    match err {
        Error::Publish {
            version_id,
            stage,
            reason,
        } => {
            let notes: Vec<String> = failures
                .into_iter()
                .map(|(s, m)| format!("rollback of {} failed: {}", s, m))
                .collect();
            Error::Publish {
                version_id,
                stage,
                reason: format!("{}; {}", reason, notes.join("; ")),
            }
        }
        other => other,
    }
}

fn commit_published(session: &ProjectSession, ctx: &PublishContext) -> Result<Version> {
    let version_id = ctx.version.base.id.clone();
    let actor = ctx.actor.clone();
    session.mutate("version.publish", |g| {
        let status = require_live(g.version(&version_id)?)?.status;
        if status != VersionStatus::Draft {
            return Err(Error::InvalidTransition {
                entity_id: version_id.clone(),
                from: status.to_string(),
                to: VersionStatus::Published.to_string(),
            });
        }

        for rep in &ctx.staged.representations {
            if rep.version_id != version_id {
                return Err(Error::Validation(format!(
                    "Staged representation {} belongs to {}",
                    rep.base.id, rep.version_id
                )));
            }
            g.representations.insert(rep.base.id.clone(), rep.clone());
        }
        for file in &ctx.staged.files {
            g.files.insert(file.base.id.clone(), file.clone());
        }

        let version = g.version_mut(&version_id)?;
        version.status = VersionStatus::Published;
        version.published_at = Some(Utc::now());
        version.base.touch(&actor);
        let number = version.version;
        let version = version.clone();

        let product = g.product_mut(&ctx.product.base.id)?;
        product.set_current(number, &actor, "publish");
        Ok(version)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn setup() -> (TestEnv, ProjectSession, String) {
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
        let version = session
            .versions()
            .create_version(&product.base.id, None, "")
            .unwrap();
        (env, session, version.base.id)
    }

    /// Integrator that logs integrate/rollback calls into a shared journal.
    fn journaled(
        name: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
        fail: bool,
    ) -> impl Integrator {
        let undo = journal.clone();
        FnIntegrator::new(
            move |_ctx: &mut PublishContext| {
                journal.lock().unwrap().push(format!("do {}", name));
                if fail {
                    Err(Error::Validation(format!("{} exploded", name)))
                } else {
                    Ok(())
                }
            },
            move |_ctx: &PublishContext| {
                undo.lock().unwrap().push(format!("undo {}", name));
                Ok(())
            },
        )
    }

    #[test]
    fn test_validator_failure_stops_before_integrators() {
        let (_env, session, version_id) = setup();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PublishPipeline::new()
            .add_validator(|_: &PublishContext| -> Result<()> { Ok(()) })
            .add_validator(|_: &PublishContext| -> Result<()> {
                Err(Error::Validation("no thumbnail".into()))
            })
            .add_integrator(journaled("copy", journal.clone(), false));

        match pipeline.run(&session, &version_id, &CancelToken::new()) {
            Err(Error::Publish { stage, reason, .. }) => {
                assert_eq!(stage, "validator[1]");
                assert!(reason.contains("no thumbnail"));
            }
            other => panic!("Expected Publish error, got {:?}", other.map(|v| v.status)),
        }
        assert!(journal.lock().unwrap().is_empty());
        assert_eq!(
            session.snapshot().version(&version_id).unwrap().status,
            VersionStatus::Draft
        );
    }

    #[test]
    fn test_integrator_failure_rolls_back_in_reverse() {
        let (_env, session, version_id) = setup();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PublishPipeline::new()
            .add_integrator(journaled("first", journal.clone(), false))
            .add_integrator(journaled("second", journal.clone(), true))
            .add_integrator(journaled("third", journal.clone(), false));
        let before = session.snapshot();

        match pipeline.run(&session, &version_id, &CancelToken::new()) {
            Err(Error::Publish { stage, .. }) => assert_eq!(stage, "integrator[1]"),
            other => panic!("Expected Publish error, got {:?}", other.map(|v| v.status)),
        }
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["do first", "do second", "undo second", "undo first"]
        );
        assert_eq!(*session.snapshot(), *before);
    }

    #[test]
    fn test_cancel_before_integrators() {
        let (_env, session, version_id) = setup();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PublishPipeline::new().add_integrator(journaled("copy", journal.clone(), false));
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            pipeline.run(&session, &version_id, &token),
            Err(Error::Cancelled)
        ));
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_during_integrators_rolls_back() {
        let (_env, session, version_id) = setup();
        let token = CancelToken::new();
        let cancel = token.clone();
        let undone = Arc::new(AtomicUsize::new(0));
        let undone_in = undone.clone();
        let pipeline = PublishPipeline::new()
            .add_integrator(FnIntegrator::new(
                move |_: &mut PublishContext| {
                    cancel.cancel();
                    Ok(())
                },
                move |_: &PublishContext| {
                    undone_in.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            ))
            .add_integrator(FnIntegrator::new(
                |_: &mut PublishContext| panic!("must not run after cancellation"),
                |_: &PublishContext| Ok(()),
            ));

        assert!(matches!(
            pipeline.run(&session, &version_id, &token),
            Err(Error::Cancelled)
        ));
        assert_eq!(undone.load(Ordering::SeqCst), 1);
        assert_eq!(
            session.snapshot().version(&version_id).unwrap().status,
            VersionStatus::Draft
        );
    }

    #[test]
    fn test_staged_records_commit_with_status() {
        let (_env, session, version_id) = setup();
        let pipeline = PublishPipeline::new().add_integrator(FnIntegrator::new(
            |ctx: &mut PublishContext| {
                let rep = Representation::new("usd", ctx.version.base.id.clone(), &ctx.actor);
                ctx.staged.representations.push(rep);
                Ok(())
            },
            |_: &PublishContext| Ok(()),
        ));
        let version = pipeline.run(&session, &version_id, &CancelToken::new()).unwrap();
        assert_eq!(version.status, VersionStatus::Published);

        let graph = session.snapshot();
        let reps = graph.representations_of(&version_id);
        assert_eq!(reps.len(), 1);
        assert_eq!(reps[0].base.name, "usd");
    }

    #[test]
    fn test_rollback_failure_is_reported() {
        let (_env, session, version_id) = setup();
        let pipeline = PublishPipeline::new()
            .add_integrator(FnIntegrator::new(
                |_: &mut PublishContext| Ok(()),
                |_: &PublishContext| Err(Error::Validation("stuck".into())),
            ))
            .add_integrator(FnIntegrator::new(
                |_: &mut PublishContext| Err(Error::Validation("boom".into())),
                |_: &PublishContext| Ok(()),
            ));
        match pipeline.run(&session, &version_id, &CancelToken::new()) {
            Err(Error::Publish { stage, reason, .. }) => {
                assert_eq!(stage, "integrator[1]");
                assert!(reason.contains("rollback of integrator[0] failed"));
            }
            other => panic!("Expected Publish error, got {:?}", other.map(|v| v.status)),
        }
    }
}
