//! Importing the same or regenerated bundles into the store

use crate::integration::test_utils::{complete_bundle, seeded_store};
use coursegen::content::{
    Artifact, ArtifactFailure, ArtifactKind, Difficulty, FailureStage, Flashcard, UnitKey,
};
use coursegen::emission::{Emitter, WriteOutcome};
use coursegen::store::ContentStore;

fn key() -> UnitKey {
    UnitKey::new("biology", "cells")
}

#[tokio::test]
async fn emitting_twice_leaves_identical_content() {
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let bundle = complete_bundle("biology", "cells");

    Emitter::emit_unit(store.as_ref(), &bundle).await;
    let first = store.load_unit_content(&key()).await.unwrap();
    let second_emission = Emitter::emit_unit(store.as_ref(), &bundle).await;
    let second = store.load_unit_content(&key()).await.unwrap();

    assert!(!second_emission.has_failures());
    assert_eq!(first, second);
    assert_eq!(second.counts().flashcards, 8);
    assert_eq!(second.counts().quiz, 6);
}

#[tokio::test]
async fn regenerated_collection_replaces_the_stored_one() {
    let store = seeded_store(&[("biology", &["cells"])]).await;
    Emitter::emit_unit(store.as_ref(), &complete_bundle("biology", "cells")).await;

    let replacement: Vec<Flashcard> = (1..=3)
        .map(|i| Flashcard {
            prompt: format!("Replacement question {}?", i),
            answer: format!("Replacement answer {}", i),
            difficulty: Difficulty::Hard,
        })
        .collect();
    let mut regenerated = coursegen::content::ContentBundle::new(key());
    regenerated.set(Artifact::Flashcards(replacement.clone()));

    let emission = Emitter::emit_unit(store.as_ref(), &regenerated).await;
    let content = store.load_unit_content(&key()).await.unwrap();

    assert_eq!(content.flashcards, replacement);
    // Kinds the new bundle does not carry are left alone.
    assert_eq!(content.counts().quiz, 6);
    assert!(content.notes.is_some());
    let skipped = emission
        .writes
        .iter()
        .filter(|w| w.outcome == WriteOutcome::Skipped)
        .count();
    assert_eq!(skipped, 4);
}

#[tokio::test]
async fn failed_slot_keeps_previous_content() {
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let original = complete_bundle("biology", "cells");
    Emitter::emit_unit(store.as_ref(), &original).await;

    let mut partial = complete_bundle("biology", "cells");
    partial.fail(
        ArtifactKind::Quiz,
        ArtifactFailure {
            stage: FailureStage::Recovery,
            message: "no JSON found".into(),
        },
    );
    Emitter::emit_unit(store.as_ref(), &partial).await;

    let content = store.load_unit_content(&key()).await.unwrap();
    assert_eq!(Some(content.quiz), original.quiz.generated().cloned());
}

#[tokio::test]
async fn unknown_unit_write_is_reported_per_kind() {
    let store = seeded_store(&[("biology", &["cells"])]).await;
    let bundle = complete_bundle("biology", "mitochondria");

    let emission = Emitter::emit_group(store.as_ref(), "biology", &[bundle]).await;

    assert!(emission.has_failures());
    assert_eq!(emission.units[0].failures().count(), 5);
}
