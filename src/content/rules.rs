//! Count and structure rules per artifact kind.
//!
//! Each check returns human-readable issues; an empty list means the artifact passes.
//! Generation rejects any artifact with issues, and the validator reports them against
//! stored content, so both ends apply the same gate.

use super::thresholds::QualityThresholds;
use super::types::{
    Artifact, Difficulty, Flashcard, Notes, PracticeQuestion, QuestionType, QuizQuestion,
    RecallPrompt,
};

pub fn artifact_issues(artifact: &Artifact, thresholds: &QualityThresholds) -> Vec<String> {
    match artifact {
        Artifact::Notes(notes) => notes_issues(notes, thresholds),
        Artifact::Flashcards(cards) => flashcard_issues(cards, thresholds),
        Artifact::Quiz(questions) => quiz_issues(questions, thresholds),
        Artifact::Practice(questions) => practice_issues(questions, thresholds),
        Artifact::Recall(prompts) => recall_issues(prompts, thresholds),
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn notes_issues(notes: &Notes, thresholds: &QualityThresholds) -> Vec<String> {
    let mut issues = Vec::new();
    let words = word_count(&notes.body);
    if words < thresholds.notes_min_words {
        issues.push(format!(
            "notes: {}/{} words",
            words, thresholds.notes_min_words
        ));
    }
    if notes.key_points.len() < thresholds.notes_min_key_points {
        issues.push(format!(
            "notes: {}/{} key points",
            notes.key_points.len(),
            thresholds.notes_min_key_points
        ));
    }
    issues
}

pub fn flashcard_issues(cards: &[Flashcard], thresholds: &QualityThresholds) -> Vec<String> {
    let count_of = |d: Difficulty| cards.iter().filter(|c| c.difficulty == d).count();
    let required = [
        (Difficulty::Easy, thresholds.flashcards_easy),
        (Difficulty::Medium, thresholds.flashcards_medium),
        (Difficulty::Hard, thresholds.flashcards_hard),
    ];

    let deficits: Vec<String> = required
        .iter()
        .filter_map(|(difficulty, want)| {
            let have = count_of(*difficulty);
            (have < *want).then(|| {
                let missing = want - have;
                format!(
                    "missing {} {}-difficulty {}",
                    missing,
                    difficulty.as_str(),
                    plural(missing, "card", "cards")
                )
            })
        })
        .collect();

    count_issue("flashcards", cards.len(), thresholds.flashcard_target(), deficits)
        .into_iter()
        .collect()
}

pub fn quiz_issues(questions: &[QuizQuestion], thresholds: &QualityThresholds) -> Vec<String> {
    let mut issues = Vec::new();
    let count_of = |t: QuestionType| questions.iter().filter(|q| q.question_type == t).count();
    let required = [
        (QuestionType::MultipleChoice, thresholds.quiz_multiple_choice, "multiple-choice"),
        (QuestionType::TrueFalse, thresholds.quiz_true_false, "true/false"),
    ];

    let deficits: Vec<String> = required
        .iter()
        .filter_map(|(question_type, want, label)| {
            let have = count_of(*question_type);
            (have < *want).then(|| {
                let missing = want - have;
                format!(
                    "missing {} {} {}",
                    missing,
                    label,
                    plural(missing, "question", "questions")
                )
            })
        })
        .collect();
    issues.extend(count_issue(
        "quiz",
        questions.len(),
        thresholds.quiz_target(),
        deficits,
    ));

    for (index, question) in questions.iter().enumerate() {
        let n = index + 1;
        match question.question_type {
            QuestionType::MultipleChoice => {
                if question.options.len() != thresholds.quiz_options {
                    issues.push(format!(
                        "quiz question {}: multiple-choice needs exactly {} options, found {}",
                        n,
                        thresholds.quiz_options,
                        question.options.len()
                    ));
                }
            }
            QuestionType::TrueFalse => {
                if !is_true_false_options(&question.options) {
                    issues.push(format!(
                        "quiz question {}: true/false options must be [\"True\", \"False\"]",
                        n
                    ));
                }
            }
        }
        if !question
            .options
            .iter()
            .any(|option| same_answer(option, &question.correct_answer))
        {
            issues.push(format!(
                "quiz question {}: correct answer {:?} is not among the options",
                n, question.correct_answer
            ));
        }
    }
    issues
}

pub fn practice_issues(
    questions: &[PracticeQuestion],
    thresholds: &QualityThresholds,
) -> Vec<String> {
    let mut issues: Vec<String> = count_issue(
        "practice",
        questions.len(),
        thresholds.practice_count,
        Vec::new(),
    )
    .into_iter()
    .collect();

    for (index, question) in questions.iter().enumerate() {
        let n = index + 1;
        if question.marks == 0 {
            issues.push(format!("practice question {}: marks must be at least 1", n));
        }
        if question.mark_scheme.is_empty() {
            issues.push(format!("practice question {}: mark scheme is empty", n));
            continue;
        }
        let total: u32 = question.mark_scheme.iter().map(|p| p.marks).sum();
        if total != question.marks {
            issues.push(format!(
                "practice question {}: mark scheme totals {}, expected {}",
                n, total, question.marks
            ));
        }
    }
    issues
}

pub fn recall_issues(prompts: &[RecallPrompt], thresholds: &QualityThresholds) -> Vec<String> {
    let mut issues: Vec<String> =
        count_issue("recall", prompts.len(), thresholds.recall_count, Vec::new())
            .into_iter()
            .collect();

    for (index, prompt) in prompts.iter().enumerate() {
        if prompt.key_points.is_empty() {
            issues.push(format!("recall prompt {}: no key points", index + 1));
        }
    }
    issues
}

/// `"<label>: have/target"` followed by distribution deficits, or nothing if both pass.
/// Collections must hit the target exactly.
fn count_issue(label: &str, have: usize, target: usize, deficits: Vec<String>) -> Option<String> {
    if have == target && deficits.is_empty() {
        return None;
    }
    let mut message = format!("{}: {}/{}", label, have, target);
    if have > target {
        message.push_str(&format!(", {} over target", have - target));
    }
    if !deficits.is_empty() {
        message.push_str(", ");
        message.push_str(&deficits.join(", "));
    }
    Some(message)
}

fn is_true_false_options(options: &[String]) -> bool {
    options.len() == 2
        && options[0].trim().eq_ignore_ascii_case("true")
        && options[1].trim().eq_ignore_ascii_case("false")
}

fn same_answer(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}
