//! Publishing pipeline driven through the library API.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use tempfile::TempDir;
use vogue::concurrency::CancelToken;
use vogue::config::ResolvedConfig;
use vogue::models::{ProjectInfo, VersionStatus};
use vogue::publish::{FnIntegrator, PublishContext, PublishPipeline};
use vogue::worker::WorkerPool;
use vogue::{Error, ProjectSession};

const SCENE: &str = "06_Scenes/Hero/Hero_Model_v001.ma";

/// Session with a Draft `Hero/Model` v001 holding one `ma` file.
fn setup() -> (TempDir, ProjectSession, String) {
    let dir = TempDir::new().unwrap();
    let session = ProjectSession::init(
        dir.path(),
        ProjectInfo::new("show"),
        ResolvedConfig::default(),
        "tester",
    )
    .unwrap();
    let hero = session
        .hierarchy()
        .create_asset("Hero", "Characters", None)
        .unwrap();
    let product = session
        .hierarchy()
        .create_product(&hero.base.id, "Model", "model")
        .unwrap();
    let versions = session.versions();
    let version = versions
        .create_version(&product.base.id, None, "blockout")
        .unwrap();

    let scene = dir.path().join(SCENE);
    fs::create_dir_all(scene.parent().unwrap()).unwrap();
    fs::write(&scene, b"//Maya ASCII").unwrap();
    let rep = versions.add_representation(&version.base.id, "ma").unwrap();
    versions.add_file(&rep.base.id, Path::new(SCENE)).unwrap();

    (dir, session, version.base.id)
}

fn published_copy(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("05_Publish/Hero/Model/v001/ma/Hero_Model_v001.ma")
}

#[test]
fn test_standard_pipeline_publishes_and_copies() {
    let (dir, session, version_id) = setup();
    let pipeline = PublishPipeline::standard(session.config());
    assert_eq!(pipeline.validator_count(), 2);
    assert_eq!(pipeline.integrator_count(), 1);

    let version = session
        .versions()
        .publish(&version_id, &pipeline, &CancelToken::new())
        .unwrap();
    assert_eq!(version.status, VersionStatus::Published);
    assert!(version.published_at.is_some());
    assert_eq!(fs::read(published_copy(&dir)).unwrap(), b"//Maya ASCII");

    let current = session.versions().current(&version.product_id).unwrap();
    assert_eq!(current.map(|v| v.version), Some(1));
}

#[test]
fn test_failed_integrator_removes_published_copy() {
    let (dir, session, version_id) = setup();
    let pipeline = PublishPipeline::standard(session.config()).add_integrator(FnIntegrator::new(
        |_: &mut PublishContext| Err(Error::Validation("farm offline".into())),
        |_: &PublishContext| Ok(()),
    ));
    let before = session.snapshot();

    match session
        .versions()
        .publish(&version_id, &pipeline, &CancelToken::new())
    {
        Err(Error::Publish { stage, reason, .. }) => {
            assert_eq!(stage, "integrator[1]");
            assert!(reason.contains("farm offline"));
        }
        other => panic!("Expected Publish error, got {:?}", other.map(|v| v.status)),
    }
    assert!(!published_copy(&dir).exists());
    assert!(!dir.path().join("05_Publish/Hero").exists());
    assert_eq!(*session.snapshot(), *before);
}

#[test]
fn test_validators_see_the_version_context() {
    let (_dir, session, version_id) = setup();
    let seen = Arc::new(Mutex::new(None));
    let seen_in = seen.clone();
    let pipeline = PublishPipeline::new().add_validator(move |ctx: &PublishContext| -> vogue::Result<()> {
        *seen_in.lock().unwrap() = Some((
            ctx.folder_path.clone(),
            ctx.product.base.name.clone(),
            ctx.active_files().len(),
        ));
        Ok(())
    });

    session
        .versions()
        .publish(&version_id, &pipeline, &CancelToken::new())
        .unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        Some(("Hero".to_string(), "Model".to_string(), 1))
    );
}

#[test]
fn test_concurrent_publish_of_one_version_succeeds_once() {
    let (_dir, session, version_id) = setup();
    let pipeline = Arc::new(PublishPipeline::standard(session.config()));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let versions = session.versions();
            let pipeline = pipeline.clone();
            let barrier = barrier.clone();
            let version_id = version_id.clone();
            thread::spawn(move || {
                barrier.wait();
                versions.publish(&version_id, &pipeline, &CancelToken::new())
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(Error::InvalidTransition { .. })))
    );

    let graph = session.snapshot();
    let version = graph.version(&version_id).unwrap();
    let product = graph.product(&version.product_id).unwrap();
    // One pointer move, not two
    assert_eq!(product.pointer_history.len(), 1);
}

#[test]
fn test_publish_in_background() {
    let (dir, session, version_id) = setup();
    let pool = WorkerPool::new(2).unwrap();
    let handle = session.versions().publish_in_background(
        &pool,
        &version_id,
        Arc::new(PublishPipeline::standard(session.config())),
        CancelToken::new(),
    );
    let version = handle.join().unwrap();
    assert_eq!(version.status, VersionStatus::Published);
    assert!(published_copy(&dir).is_file());
}

#[test]
fn test_cancelled_background_publish_leaves_draft() {
    let (dir, session, version_id) = setup();
    let pool = WorkerPool::new(1).unwrap();
    let token = CancelToken::new();
    token.cancel();
    let result = session
        .versions()
        .publish_in_background(
            &pool,
            &version_id,
            Arc::new(PublishPipeline::standard(session.config())),
            token,
        )
        .join();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(
        session.snapshot().version(&version_id).unwrap().status,
        VersionStatus::Draft
    );
    assert!(!published_copy(&dir).exists());
}
