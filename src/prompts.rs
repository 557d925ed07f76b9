//! Prompt templates for the three pipeline stages.
//!
//! Prompts are rebuilt from scratch for every call; nothing here holds state.

use crate::agents::TraitMap;

/// Appended to a prompt when the first answer could not be parsed.
pub const JSON_ONLY_SUFFIX: &str = "\nImportant: Return only JSON and nothing else.";

const TRAIT_TEMPLATE: &str = r#"You are Trait Extractor Agent.
Given these user answers (short), extract 6-8 personality traits and give each a numeric score 0-100.
Return STRICT JSON: { "traits": { "TraitName": score, ... } }.
Answers:
{answers}
"#;

const SUMMARY_TEMPLATE: &str = r#"You are Summary Agent.
Given user answers and extracted traits, produce a concise 3-4 sentence personality summary.
Return STRICT JSON: { "summary": "..." }.
Answers:
{answers}
Traits (json):
{traits_json}
"#;

const VALIDATOR_TEMPLATE: &str = r#"You are Validator & Recommendations Agent.
Given the answers and traits produce:
1) 3 practical, concrete recommendations (bullet list).
2) One validating single-sentence encouraging message.
Return STRICT JSON: { "recommendations": [...], "validating_message": "..." }.
Answers:
{answers}
Traits:
{traits_json}
"#;

/// `1. first\n2. second`, empty answers keep their slot number.
pub fn format_answers(answers: &[String]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{}. {}", i + 1, a))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render(template: &str, answers: &[String], traits: Option<&TraitMap>) -> String {
    // answers go in last so user text is never re-scanned for placeholders
    let with_traits = match traits {
        Some(traits) => template.replace("{traits_json}", &traits.to_json()),
        None => template.to_string(),
    };
    with_traits.replace("{answers}", &format_answers(answers))
}

pub fn trait_prompt(answers: &[String]) -> String {
    render(TRAIT_TEMPLATE, answers, None)
}

pub fn summary_prompt(answers: &[String], traits: &TraitMap) -> String {
    render(SUMMARY_TEMPLATE, answers, Some(traits))
}

pub fn validator_prompt(answers: &[String], traits: &TraitMap) -> String {
    render(VALIDATOR_TEMPLATE, answers, Some(traits))
}

/// The stricter second-attempt variant of `prompt`.
pub fn json_only(prompt: &str) -> String {
    format!("{prompt}{JSON_ONLY_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers() -> Vec<String> {
        vec!["I like reading".into(), "".into(), "deadlines".into()]
    }

    #[test]
    fn answers_are_numbered_from_one() {
        assert_eq!(format_answers(&answers()), "1. I like reading\n2. \n3. deadlines");
    }

    #[test]
    fn trait_prompt_has_no_placeholders_left() {
        let prompt = trait_prompt(&answers());
        assert!(prompt.contains("1. I like reading"));
        assert!(prompt.contains(r#"{ "traits": {"#));
        assert!(!prompt.contains("{answers}"));
    }

    #[test]
    fn later_stages_embed_traits_as_json() {
        let mut traits = TraitMap::new();
        traits.insert("Curious", 82.5);
        let prompt = summary_prompt(&answers(), &traits);
        assert!(prompt.contains(r#"{"Curious":82.5}"#));
        assert!(!prompt.contains("{traits_json}"));

        let prompt = validator_prompt(&answers(), &traits);
        assert!(prompt.contains(r#""validating_message""#));
        assert!(prompt.contains(r#"{"Curious":82.5}"#));
    }

    #[test]
    fn json_only_appends_instruction() {
        assert!(json_only("base").ends_with("Return only JSON and nothing else."));
        assert!(json_only("base").starts_with("base\nImportant"));
    }
}
