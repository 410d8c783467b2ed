//! Auditing stored content

use crate::integration::test_utils::{complete_bundle, seeded_store, store_complete_content};
use coursegen::content::{Artifact, ArtifactKind, QualityThresholds};
use coursegen::emission::Emitter;
use coursegen::validator::Validator;

fn validator() -> Validator {
    Validator::new(QualityThresholds::default())
}

#[tokio::test]
async fn complete_content_passes() {
    let store = seeded_store(&[("biology", &["cells", "enzymes"])]).await;
    store_complete_content(&store, "biology", &["cells", "enzymes"]).await;

    let report = validator()
        .validate_group(store.as_ref(), "biology")
        .await
        .unwrap();

    assert!(report.is_valid());
    assert_eq!(report.units.len(), 2);
    assert_eq!(report.issue_count(), 0);
    let notes = &report.units[0].kinds[0];
    assert_eq!(notes.kind, ArtifactKind::Notes);
    assert!(notes.present);
}

#[tokio::test]
async fn placeholder_answer_is_flagged() {
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let mut bundle = complete_bundle("biology", "cells");
    let mut cards = bundle.flashcards.generated().cloned().unwrap();
    cards[0].answer = "TBD".into();
    bundle.set(Artifact::Flashcards(cards));
    Emitter::emit_unit(store.as_ref(), &bundle).await;

    let report = validator()
        .validate_group(store.as_ref(), "biology")
        .await
        .unwrap();

    assert!(!report.is_valid());
    let issues: Vec<&str> = report.units[0].issues().collect();
    assert_eq!(issues, vec!["flashcard 1 answer: placeholder text \"TBD\""]);
}

#[tokio::test]
async fn short_collection_reports_its_shortfall() {
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let mut bundle = complete_bundle("biology", "cells");
    let mut cards = bundle.flashcards.generated().cloned().unwrap();
    cards.truncate(6);
    bundle.set(Artifact::Flashcards(cards));
    Emitter::emit_unit(store.as_ref(), &bundle).await;

    let report = validator()
        .validate_group(store.as_ref(), "biology")
        .await
        .unwrap();

    let flashcards = report.units[0]
        .kinds
        .iter()
        .find(|k| k.kind == ArtifactKind::Flashcards)
        .unwrap();
    assert_eq!(flashcards.count, 6);
    assert_eq!(flashcards.target, 8);
    assert_eq!(
        flashcards.issues,
        vec!["flashcards: 6/8, missing 2 hard-difficulty cards"]
    );
}

#[tokio::test]
async fn empty_group_and_missing_content_are_invalid() {
    let store = seeded_store(&[("biology", &["cells"]), ("geology", &[])]).await;

    let reports = validator().validate_catalog(store.as_ref()).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].group, "biology");
    assert_eq!(reports[0].issue_count(), 5);
    assert!(reports[0].units[0]
        .kinds
        .iter()
        .all(|k| !k.present && k.issues == vec![format!("{}: missing", k.kind)]));
    assert_eq!(reports[1].issues, vec!["group geology has no units"]);
    assert!(!reports[1].is_valid());
}
