//! Resuming interrupted and partially failed runs from the progress checkpoint

use crate::integration::test_utils::{
    checkpoint_path, complete_bundle, orchestrator, orchestrator_without_generator, seeded_store,
    slugs, spool, store_complete_content, ScriptedClient,
};
use coursegen::checkpoint::{CheckpointStore, FileCheckpointStore};
use coursegen::content::{FailureStage, UnitKey};
use coursegen::error::ProviderError;
use coursegen::orchestrator::{GroupStatus, ProgressState, RunOptions, Step, StepStatus};
use coursegen::store::ContentStore;
use tempfile::TempDir;

fn resume() -> RunOptions {
    RunOptions {
        resume: true,
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn resume_skips_completed_groups_and_retries_failed_ones() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"]), ("physics", &["forces"])]).await;
    let groups = slugs(&["biology", "physics"]);

    let flaky = ScriptedClient::new();
    flaky.fail_topic("forces", ProviderError::Overloaded("529".into()));
    let first = orchestrator(store.clone(), flaky, dir.path())
        .run(&groups, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(first.group("physics").unwrap().status, GroupStatus::Failed);
    assert!(checkpoint_path(dir.path()).exists());

    let healthy = ScriptedClient::new();
    let second = orchestrator(store.clone(), healthy.clone(), dir.path())
        .run(&groups, &resume())
        .await
        .unwrap();

    assert_eq!(second.run_id, first.run_id);
    let biology = second.group("biology").unwrap();
    assert_eq!(biology.status, GroupStatus::Completed);
    assert_eq!(biology.message.as_deref(), Some("already complete"));
    assert_eq!(second.group("physics").unwrap().status, GroupStatus::Completed);

    assert_eq!(healthy.calls_for("cells"), 0);
    assert_eq!(healthy.calls_for("forces"), 5);

    let archived = second.archived.expect("settled run is archived");
    let state = FileCheckpointStore::new(archived).load().unwrap().unwrap();
    let physics = state.group("physics").unwrap();
    assert_eq!(physics.generation.attempts, 2);
    assert_eq!(physics.generation.status, StepStatus::Completed);
    assert_eq!(physics.validation.attempts, 1);
}

#[tokio::test]
async fn interrupted_import_resumes_without_regenerating() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;

    // Generation finished and import was in flight when the process stopped.
    let mut state = ProgressState::new();
    let record = state.ensure_group("biology");
    record.start();
    record.generation.begin(Step::Generation, false).unwrap();
    record
        .generation
        .finish(Step::Generation, StepStatus::Completed, None)
        .unwrap();
    record.import.begin(Step::Import, false).unwrap();
    FileCheckpointStore::new(checkpoint_path(dir.path()))
        .save(&state)
        .unwrap();
    spool(dir.path())
        .write("biology", &[complete_bundle("biology", "cells")])
        .unwrap();

    let client = ScriptedClient::new();
    let report = orchestrator(store.clone(), client.clone(), dir.path())
        .run(&slugs(&["biology"]), &resume())
        .await
        .unwrap();

    assert!(client.calls().is_empty());
    assert_eq!(report.run_id, state.run_id);
    let outcome = report.group("biology").unwrap();
    assert_eq!(outcome.status, GroupStatus::Completed);
    assert_eq!(outcome.steps.import, StepStatus::Completed);

    let counts = store
        .content_counts(&UnitKey::new("biology", "cells"))
        .await
        .unwrap();
    assert_eq!(counts.flashcards, 8);

    let archived = FileCheckpointStore::new(report.archived.unwrap())
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(archived.group("biology").unwrap().import.attempts, 2);
    assert_eq!(archived.group("biology").unwrap().generation.attempts, 1);
}

#[tokio::test]
async fn resume_without_a_checkpoint_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let client = ScriptedClient::new();

    let report = orchestrator(store, client.clone(), dir.path())
        .run(&slugs(&["biology"]), &resume())
        .await
        .unwrap();

    assert_eq!(report.group("biology").unwrap().status, GroupStatus::Completed);
    assert_eq!(client.calls().len(), 5);
}

#[tokio::test]
async fn checkpoint_reflects_each_group_as_it_settles() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"]), ("physics", &["forces"])]).await;
    let client = ScriptedClient::new();
    client.fail_topic("forces", ProviderError::Overloaded("busy".into()));
    let orchestrator = orchestrator(store, client, dir.path());

    orchestrator
        .run(&slugs(&["biology", "physics"]), &RunOptions::default())
        .await
        .unwrap();

    let state = orchestrator.checkpoint().load().unwrap().unwrap();
    let biology = state.group("biology").unwrap();
    assert_eq!(biology.status, GroupStatus::Completed);
    assert!(biology.completed_at.is_some());
    let physics = state.group("physics").unwrap();
    assert_eq!(physics.status, GroupStatus::Failed);
    assert_eq!(physics.first_incomplete_step(), Some(Step::Generation));
    assert!(physics
        .last_error
        .as_deref()
        .unwrap()
        .contains("gave up after 3 attempts"));
}

#[tokio::test]
async fn import_only_reads_spooled_bundles() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;
    spool(dir.path())
        .write("biology", &[complete_bundle("biology", "cells")])
        .unwrap();

    let report = orchestrator_without_generator(store.clone(), dir.path())
        .run(
            &slugs(&["biology"]),
            &RunOptions {
                import_only: true,
                ..RunOptions::default()
            },
        )
        .await
        .unwrap();

    let outcome = report.group("biology").unwrap();
    assert_eq!(outcome.status, GroupStatus::Completed);
    assert_eq!(outcome.steps.generation, StepStatus::Skipped);
    assert_eq!(outcome.steps.import, StepStatus::Completed);
    assert_eq!(report.writes.total().succeeded, 5);
}

#[tokio::test]
async fn import_only_without_spool_fails_the_group() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;

    let report = orchestrator_without_generator(store, dir.path())
        .run(
            &slugs(&["biology"]),
            &RunOptions {
                import_only: true,
                ..RunOptions::default()
            },
        )
        .await
        .unwrap();

    let outcome = report.group("biology").unwrap();
    assert_eq!(outcome.status, GroupStatus::Failed);
    assert_eq!(outcome.steps.import, StepStatus::Failed);
    assert_eq!(report.failures[0].stage, FailureStage::Spool);
}

#[tokio::test]
async fn generation_requires_a_client() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;

    let result = orchestrator_without_generator(store, dir.path())
        .run(&slugs(&["biology"]), &RunOptions::default())
        .await;

    assert!(matches!(
        result,
        Err(coursegen::error::PipelineError::ConfigError(_))
    ));
}

#[tokio::test]
async fn skipped_group_stays_settled_when_resuming() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"]), ("physics", &["forces"])]).await;
    store_complete_content(&store, "biology", &["cells"]).await;
    let groups = slugs(&["biology", "physics"]);

    let flaky = ScriptedClient::new();
    flaky.fail_topic("forces", ProviderError::Overloaded("529".into()));
    let first = orchestrator(store.clone(), flaky, dir.path())
        .run(&groups, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(first.group("biology").unwrap().status, GroupStatus::Skipped);
    assert_eq!(first.group("physics").unwrap().status, GroupStatus::Failed);

    let healthy = ScriptedClient::new();
    let second = orchestrator(store, healthy.clone(), dir.path())
        .run(&groups, &resume())
        .await
        .unwrap();

    let biology = second.group("biology").unwrap();
    assert_eq!(biology.status, GroupStatus::Skipped);
    assert_eq!(biology.message.as_deref(), Some("already complete"));
    assert_eq!(second.group("physics").unwrap().status, GroupStatus::Completed);
    assert_eq!(healthy.calls_for("cells"), 0);
    assert_eq!(healthy.calls_for("forces"), 5);
    assert!(second.failures.is_empty());
    assert!(second.archived.is_some());
}

#[tokio::test]
async fn finished_steps_on_an_unsettled_group_start_over() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;

    // Every step finished but the process stopped before the group settled.
    let mut state = ProgressState::new();
    let record = state.ensure_group("biology");
    record.start();
    for step in Step::ALL {
        record.step_mut(step).begin(step, false).unwrap();
        record
            .step_mut(step)
            .finish(step, StepStatus::Completed, None)
            .unwrap();
    }
    FileCheckpointStore::new(checkpoint_path(dir.path()))
        .save(&state)
        .unwrap();

    let client = ScriptedClient::new();
    let report = orchestrator(store, client.clone(), dir.path())
        .run(&slugs(&["biology"]), &resume())
        .await
        .unwrap();

    let outcome = report.group("biology").unwrap();
    assert_eq!(outcome.status, GroupStatus::Completed);
    assert_eq!(client.calls_for("cells"), 5);

    let archived = FileCheckpointStore::new(report.archived.unwrap())
        .load()
        .unwrap()
        .unwrap();
    let biology = archived.group("biology").unwrap();
    assert_eq!(biology.generation.attempts, 2);
    assert_eq!(biology.validation.attempts, 2);
}

#[tokio::test]
async fn resume_issues_prompts_only_for_unstarted_groups() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"]), ("physics", &["forces"])]).await;

    let mut state = ProgressState::new();
    let biology = state.ensure_group("biology");
    biology.start();
    for step in Step::ALL {
        biology.step_mut(step).begin(step, false).unwrap();
        biology
            .step_mut(step)
            .finish(step, StepStatus::Completed, None)
            .unwrap();
    }
    biology.settle(GroupStatus::Completed, None);
    state.ensure_group("physics");
    FileCheckpointStore::new(checkpoint_path(dir.path()))
        .save(&state)
        .unwrap();

    let client = ScriptedClient::new();
    let report = orchestrator(store, client.clone(), dir.path())
        .run(&slugs(&["biology", "physics"]), &resume())
        .await
        .unwrap();

    assert_eq!(client.calls().len(), 5);
    assert_eq!(client.calls_for("cells"), 0);
    assert_eq!(client.calls_for("forces"), 5);
    assert_eq!(report.group("physics").unwrap().status, GroupStatus::Completed);
}

#[tokio::test]
async fn empty_group_list_keeps_the_checkpoint() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("physics", &["forces"])]).await;
    let flaky = ScriptedClient::new();
    flaky.fail_topic("forces", ProviderError::Overloaded("529".into()));
    orchestrator(store.clone(), flaky, dir.path())
        .run(&slugs(&["physics"]), &RunOptions::default())
        .await
        .unwrap();

    let report = orchestrator(store, ScriptedClient::new(), dir.path())
        .run(&[], &resume())
        .await
        .unwrap();

    assert!(report.archived.is_none());
    assert!(checkpoint_path(dir.path()).exists());
}

#[tokio::test]
async fn clean_import_clears_the_spool() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&[("biology", &["cells"])]).await;

    orchestrator(store, ScriptedClient::new(), dir.path())
        .run(&slugs(&["biology"]), &RunOptions::default())
        .await
        .unwrap();

    assert!(!spool(dir.path()).path_for("biology").exists());
}
