//! Question set and plain-text rendering for callers of the pipeline.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::error::{MirrorError, Result};
use crate::orchestrator::PipelineResult;

/// Fixed question slots; answer `i` always belongs to question `i`.
pub const QUESTIONS: [&str; 5] = [
    "What do you enjoy doing in your free time?",
    "How would your friends describe you in 3 words?",
    "What stresses you out the most?",
    "Describe a recent decision you made and why.",
    "What is a personal strength and a weakness?",
];

/// Trim every answer and pad or cut the set to one entry per question.
pub fn normalize_answers<I, S>(answers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = answers
        .into_iter()
        .take(QUESTIONS.len())
        .map(|a| a.as_ref().trim().to_string())
        .collect();
    out.resize(QUESTIONS.len(), String::new());
    out
}

/// Rejects an answer set with nothing in it.
pub fn ensure_answered(answers: &[String]) -> Result<()> {
    if answers.iter().any(|a| !a.trim().is_empty()) {
        Ok(())
    } else {
        Err(MirrorError::InvalidInput {
            message: "Please answer at least one question.".to_string(),
        })
    }
}

/// Human-readable report, the same content the JSON result carries.
pub fn render_text(result: &PipelineResult, name: Option<&str>, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let title = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Personality Mirror: {name}"),
        None => "Personality Mirror".to_string(),
    };

    // writeln! into a String cannot fail
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    let _ = writeln!(out, "Generated: {}", generated_at.to_rfc3339());

    let _ = writeln!(out, "\nSummary\n-------");
    let summary = if result.summary.trim().is_empty() {
        "—"
    } else {
        result.summary.trim()
    };
    let _ = writeln!(out, "{summary}");

    let _ = writeln!(out, "\nTraits\n------");
    if result.traits.is_empty() {
        let _ = writeln!(out, "(none extracted)");
    }
    for (trait_name, score) in result.traits.iter() {
        let _ = writeln!(out, "{trait_name}: {score:.1}");
    }

    let _ = writeln!(out, "\nRecommendations\n---------------");
    for rec in &result.recommendations {
        let _ = writeln!(out, "- {rec}");
    }

    let _ = writeln!(out, "\nValidation\n----------");
    let _ = writeln!(out, "{}", result.validating_message);

    out
}
