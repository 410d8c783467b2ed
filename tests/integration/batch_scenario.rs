//! End-to-end batch runs against an in-memory store and a scripted client

use crate::integration::test_utils::{
    checkpoint_path, orchestrator, seeded_store, slugs, store_complete_content, ScriptedClient,
};
use coursegen::checkpoint::CheckpointStore;
use coursegen::content::{ArtifactKind, FailureStage, UnitKey};
use coursegen::error::ProviderError;
use coursegen::orchestrator::{GroupStatus, RunOptions, StepStatus};
use coursegen::store::ContentStore;
use tempfile::TempDir;

#[tokio::test]
async fn full_batch_generates_imports_and_validates() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells", "enzymes"]), ("physics", &["forces"])]).await;
    let client = ScriptedClient::new();
    let orchestrator = orchestrator(store.clone(), client.clone(), dir.path());

    let report = orchestrator
        .run(&slugs(&["biology", "physics"]), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.count(GroupStatus::Completed), 2);
    assert!(!report.has_unresolved_failures());
    assert!(report.failures.is_empty());
    assert_eq!(client.calls().len(), 15);
    assert_eq!(report.generation.get(ArtifactKind::Flashcards).succeeded, 3);
    assert_eq!(report.generation.total().failed, 0);
    assert_eq!(report.writes.total().succeeded, 15);

    let biology = report.group("biology").unwrap();
    assert_eq!(biology.units, 2);
    assert_eq!(biology.steps.generation, StepStatus::Completed);
    assert_eq!(biology.steps.import, StepStatus::Completed);
    assert_eq!(biology.steps.validation, StepStatus::Completed);

    let counts = store
        .content_counts(&UnitKey::new("biology", "enzymes"))
        .await
        .unwrap();
    assert_eq!(counts.flashcards, 8);
    assert_eq!(counts.quiz, 6);
    assert_eq!(counts.recall, 5);

    // A fully settled run archives its checkpoint.
    let archived = report.archived.expect("checkpoint archived");
    assert!(archived.exists());
    assert!(!checkpoint_path(dir.path()).exists());
}

#[tokio::test]
async fn exhausted_retries_fail_one_group_and_the_batch_continues() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[
        ("biology", &["cells"]),
        ("physics", &["forces"]),
        ("chemistry", &["atoms"]),
    ])
    .await;
    let client = ScriptedClient::new();
    client.fail_topic("forces", ProviderError::Overloaded("529".into()));
    let orchestrator = orchestrator(store.clone(), client.clone(), dir.path());

    let report = orchestrator
        .run(&slugs(&["biology", "physics", "chemistry"]), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.group("biology").unwrap().status, GroupStatus::Completed);
    assert_eq!(report.group("chemistry").unwrap().status, GroupStatus::Completed);
    let physics = report.group("physics").unwrap();
    assert_eq!(physics.status, GroupStatus::Failed);
    assert_eq!(physics.steps.generation, StepStatus::Failed);
    assert_eq!(physics.steps.import, StepStatus::Pending);

    // Three attempts at the first kind, then the unit is abandoned.
    assert_eq!(client.calls_for("forces"), 3);
    let failure = report
        .failures
        .iter()
        .find(|f| f.group == "physics")
        .unwrap();
    assert_eq!(failure.stage, FailureStage::Terminal);
    assert_eq!(failure.kind, Some(ArtifactKind::Notes));
    assert_eq!(failure.unit.as_deref(), Some("forces"));

    assert!(report.has_unresolved_failures());
    assert!(report.archived.is_none());
    let state = orchestrator.checkpoint().load().unwrap().unwrap();
    assert_eq!(state.counters.groups_completed, 2);
    assert_eq!(state.counters.groups_failed, 1);
    assert_eq!(state.group("physics").unwrap().status, GroupStatus::Failed);
}

#[tokio::test]
async fn malformed_output_is_contained_to_its_kind() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let client = ScriptedClient::new();
    client.respond_with("cells", ArtifactKind::Quiz, "Sorry, I cannot help with that.");
    let orchestrator = orchestrator(store.clone(), client.clone(), dir.path());

    let report = orchestrator
        .run(&slugs(&["biology"]), &RunOptions::default())
        .await
        .unwrap();

    // Later kinds are still generated.
    assert_eq!(client.calls().len(), 5);
    assert_eq!(report.generation.get(ArtifactKind::Quiz).failed, 1);
    assert_eq!(report.generation.get(ArtifactKind::Recall).succeeded, 1);

    let outcome = report.group("biology").unwrap();
    assert_eq!(outcome.steps.generation, StepStatus::CompletedWithIssues);
    assert_eq!(outcome.steps.import, StepStatus::Completed);
    assert_eq!(outcome.steps.validation, StepStatus::CompletedWithIssues);
    assert_eq!(outcome.status, GroupStatus::Failed);

    let stages: Vec<FailureStage> = report.failures.iter().map(|f| f.stage).collect();
    assert_eq!(stages, vec![FailureStage::Recovery, FailureStage::Validation]);

    let validation = &report.validations[0];
    assert!(validation.units[0]
        .issues()
        .any(|issue| issue == "quiz: missing"));

    let counts = store
        .content_counts(&UnitKey::new("biology", "cells"))
        .await
        .unwrap();
    assert_eq!(counts.quiz, 0);
    assert_eq!(counts.practice, 3);
}

#[tokio::test]
async fn rejected_request_is_recorded_without_retrying() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let client = ScriptedClient::new();
    client.fail_topic("cells", ProviderError::AuthFailed("bad key".into()));
    let orchestrator = orchestrator(store, client.clone(), dir.path());

    let report = orchestrator
        .run(&slugs(&["biology"]), &RunOptions::default())
        .await
        .unwrap();

    // One call per kind: non-transient errors are not retried and do not abort the unit.
    assert_eq!(client.calls().len(), 5);
    assert_eq!(report.generation.total().failed, 5);
    assert!(report
        .failures
        .iter()
        .filter(|f| f.kind.is_some())
        .all(|f| f.stage == FailureStage::Provider));
    assert_eq!(report.group("biology").unwrap().status, GroupStatus::Failed);
}

#[tokio::test]
async fn complete_groups_are_skipped_unless_forced() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;
    store_complete_content(&store, "biology", &["cells"]).await;
    let client = ScriptedClient::new();
    let orchestrator = orchestrator(store, client.clone(), dir.path());

    let report = orchestrator
        .run(&slugs(&["biology"]), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(report.group("biology").unwrap().status, GroupStatus::Skipped);
    assert!(client.calls().is_empty());
    assert!(!report.has_unresolved_failures());

    let forced = orchestrator
        .run(
            &slugs(&["biology"]),
            &RunOptions {
                force: true,
                ..RunOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(forced.group("biology").unwrap().status, GroupStatus::Completed);
    assert_eq!(client.calls().len(), 5);
}

#[tokio::test]
async fn unknown_group_fails_without_stopping_the_batch() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let client = ScriptedClient::new();
    let orchestrator = orchestrator(store, client, dir.path());

    let report = orchestrator
        .run(&slugs(&["geology", "biology"]), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.group("geology").unwrap().status, GroupStatus::Failed);
    assert_eq!(report.group("biology").unwrap().status, GroupStatus::Completed);
    let failure = &report.failures[0];
    assert_eq!(failure.group, "geology");
    assert_eq!(failure.stage, FailureStage::Catalog);
    assert!(failure.unit.is_none());
    assert!(failure.kind.is_none());
}

#[tokio::test]
async fn empty_group_fails_validation() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &[])]).await;
    let client = ScriptedClient::new();
    let orchestrator = orchestrator(store, client.clone(), dir.path());

    let report = orchestrator
        .run(&slugs(&["biology"]), &RunOptions::default())
        .await
        .unwrap();

    assert!(client.calls().is_empty());
    assert_eq!(report.group("biology").unwrap().status, GroupStatus::Failed);
    assert_eq!(report.validations[0].issues, vec!["group biology has no units"]);
}

#[tokio::test]
async fn export_writes_one_script_per_group() {
    let dir = TempDir::new().unwrap();
    let export_dir = dir.path().join("export");
    let store = seeded_store(&[("biology", &["cells"]), ("physics", &["forces"])]).await;
    let client = ScriptedClient::new();
    let orchestrator = orchestrator(store, client, dir.path());

    let report = orchestrator
        .run(
            &slugs(&["biology", "physics"]),
            &RunOptions {
                export_dir: Some(export_dir.clone()),
                ..RunOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        report.exports,
        vec![export_dir.join("biology.sql"), export_dir.join("physics.sql")]
    );
    let script = std::fs::read_to_string(export_dir.join("biology.sql")).unwrap();
    assert!(script.starts_with("-- coursegen export for group biology"));
    assert!(script.contains("INSERT INTO flashcards"));
    assert!(script.trim_end().ends_with("COMMIT;"));
}

#[tokio::test]
async fn validate_only_never_touches_the_checkpoint() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;
    store_complete_content(&store, "biology", &["cells"]).await;
    let client = ScriptedClient::new();
    let orchestrator = orchestrator(store, client.clone(), dir.path());

    let report = orchestrator
        .run(
            &slugs(&["biology"]),
            &RunOptions {
                validate_only: true,
                ..RunOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(report.group("biology").unwrap().status, GroupStatus::Completed);
    assert!(client.calls().is_empty());
    assert!(!checkpoint_path(dir.path()).exists());
}

#[tokio::test]
async fn datastore_error_in_completeness_check_fails_groups_not_the_run() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"]), ("physics", &["forces"])]).await;
    sqlx::query("DROP TABLE recall_prompts")
        .execute(store.pool())
        .await
        .unwrap();
    let client = ScriptedClient::new();

    let report = orchestrator(store, client.clone(), dir.path())
        .run(&slugs(&["biology", "physics"]), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.count(GroupStatus::Failed), 2);
    assert!(client.calls().is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|f| f.stage == FailureStage::Catalog && f.unit.is_none()));
    assert!(report.failures[0]
        .message
        .starts_with("completeness check failed"));
}
