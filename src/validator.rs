//! Completeness & Placeholder Validator
//!
//! Read-only audit of persisted content. For every unit and artifact kind it checks that
//! content exists, meets the count and structure gates, and carries no placeholder or
//! suspiciously thin text.

use crate::content::rules::{
    flashcard_issues, notes_issues, practice_issues, quiz_issues, recall_issues,
};
use crate::content::{ArtifactKind, QualityThresholds, UnitContent, UnitKey};
use crate::error::StorageError;
use crate::store::ContentStore;
use serde::Serialize;
use tracing::{debug, info};

pub mod placeholder;

use placeholder::{text_problem, TextField};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindValidation {
    pub kind: ArtifactKind,
    pub present: bool,
    pub count: usize,
    pub target: usize,
    pub issues: Vec<String>,
}

impl KindValidation {
    pub fn is_valid(&self) -> bool {
        self.present && self.issues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitValidation {
    pub unit: UnitKey,
    pub kinds: Vec<KindValidation>,
}

impl UnitValidation {
    pub fn is_valid(&self) -> bool {
        self.kinds.iter().all(KindValidation::is_valid)
    }

    pub fn issues(&self) -> impl Iterator<Item = &str> {
        self.kinds
            .iter()
            .flat_map(|k| k.issues.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupValidation {
    pub group: String,
    /// Group-level findings (e.g. no units)
    pub issues: Vec<String>,
    pub units: Vec<UnitValidation>,
}

impl GroupValidation {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty() && self.units.iter().all(UnitValidation::is_valid)
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len() + self.units.iter().map(|u| u.issues().count()).sum::<usize>()
    }

    pub fn invalid_units(&self) -> usize {
        self.units.iter().filter(|u| !u.is_valid()).count()
    }
}

pub struct Validator {
    thresholds: QualityThresholds,
}

impl Validator {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    pub async fn validate_group<S: ContentStore + ?Sized>(
        &self,
        store: &S,
        group: &str,
    ) -> Result<GroupValidation, StorageError> {
        let units = store.list_units(group).await?;
        let mut report = GroupValidation {
            group: group.to_string(),
            issues: Vec::new(),
            units: Vec::with_capacity(units.len()),
        };
        if units.is_empty() {
            report.issues.push(format!("group {} has no units", group));
        }
        for unit in units {
            let key = unit.key();
            let content = store.load_unit_content(&key).await?;
            let validation = self.validate_unit(key, &content);
            debug!(unit = %validation.unit, valid = validation.is_valid(), "unit validated");
            report.units.push(validation);
        }
        info!(
            group = %group,
            units = report.units.len(),
            invalid_units = report.invalid_units(),
            issues = report.issue_count(),
            "group validated"
        );
        Ok(report)
    }

    pub async fn validate_catalog<S: ContentStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Vec<GroupValidation>, StorageError> {
        let mut reports = Vec::new();
        for group in store.list_groups().await? {
            reports.push(self.validate_group(store, &group.slug).await?);
        }
        Ok(reports)
    }

    /// Pure check of one unit's stored content.
    pub fn validate_unit(&self, unit: UnitKey, content: &UnitContent) -> UnitValidation {
        let t = &self.thresholds;
        let min = t.min_text_chars;
        let counts = content.counts();
        let mut kinds = Vec::with_capacity(ArtifactKind::ALL.len());

        for kind in ArtifactKind::ALL {
            let count = counts.get(kind);
            let target = t.target(kind);
            let present = count > 0;
            let mut issues = Vec::new();

            if !present {
                issues.push(format!("{}: missing", kind));
            } else {
                match kind {
                    ArtifactKind::Notes => {
                        if let Some(notes) = &content.notes {
                            issues.extend(notes_issues(notes, t));
                            check(&mut issues, "notes body", &notes.body, TextField::Descriptive, min);
                            for (i, point) in notes.key_points.iter().enumerate() {
                                check(&mut issues, &format!("notes key point {}", i + 1), point, TextField::Short, min);
                            }
                        }
                    }
                    ArtifactKind::Flashcards => {
                        issues.extend(flashcard_issues(&content.flashcards, t));
                        for (i, card) in content.flashcards.iter().enumerate() {
                            let label = format!("flashcard {}", i + 1);
                            check(&mut issues, &format!("{} prompt", label), &card.prompt, TextField::Descriptive, min);
                            check(&mut issues, &format!("{} answer", label), &card.answer, TextField::Short, min);
                        }
                    }
                    ArtifactKind::Quiz => {
                        issues.extend(quiz_issues(&content.quiz, t));
                        for (i, q) in content.quiz.iter().enumerate() {
                            let label = format!("quiz question {}", i + 1);
                            check(&mut issues, &label, &q.question, TextField::Descriptive, min);
                            check(&mut issues, &format!("{} explanation", label), &q.explanation, TextField::Descriptive, min);
                            check(&mut issues, &format!("{} answer", label), &q.correct_answer, TextField::Short, min);
                            for (j, option) in q.options.iter().enumerate() {
                                check(&mut issues, &format!("{} option {}", label, j + 1), option, TextField::Short, min);
                            }
                        }
                    }
                    ArtifactKind::Practice => {
                        issues.extend(practice_issues(&content.practice, t));
                        for (i, q) in content.practice.iter().enumerate() {
                            let label = format!("practice question {}", i + 1);
                            check(&mut issues, &label, &q.question, TextField::Descriptive, min);
                            check(&mut issues, &format!("{} model answer", label), &q.model_answer, TextField::Descriptive, min);
                            for (j, point) in q.mark_scheme.iter().enumerate() {
                                check(&mut issues, &format!("{} mark point {}", label, j + 1), &point.point, TextField::Short, min);
                            }
                        }
                    }
                    ArtifactKind::Recall => {
                        issues.extend(recall_issues(&content.recall, t));
                        for (i, p) in content.recall.iter().enumerate() {
                            let label = format!("recall prompt {}", i + 1);
                            check(&mut issues, &label, &p.prompt, TextField::Descriptive, min);
                            check(&mut issues, &format!("{} model answer", label), &p.model_answer, TextField::Descriptive, min);
                            for (j, hint) in p.hints.iter().enumerate() {
                                check(&mut issues, &format!("{} hint {}", label, j + 1), hint, TextField::Short, min);
                            }
                            for (j, point) in p.key_points.iter().enumerate() {
                                check(&mut issues, &format!("{} key point {}", label, j + 1), point, TextField::Short, min);
                            }
                        }
                    }
                }
            }

            kinds.push(KindValidation {
                kind,
                present,
                count,
                target,
                issues,
            });
        }

        UnitValidation { unit, kinds }
    }
}

fn check(issues: &mut Vec<String>, label: &str, text: &str, field: TextField, min_chars: usize) {
    if let Some(problem) = text_problem(text, field, min_chars) {
        issues.push(format!("{}: {}", label, problem));
    }
}
