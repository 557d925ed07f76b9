//! Stage 3: recommendations plus one validating sentence.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::agents::stage::{StageOutcome, run_stage};
use crate::agents::trait_agent::TraitMap;
use crate::clients::TextGenerator;
use crate::config::StagePolicy;
use crate::error::Result;
use crate::prompts::validator_prompt;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatorOutput {
    pub recommendations: Vec<String>,
    pub validating_message: String,
}

impl ValidatorOutput {
    /// `None` unless at least one of the expected keys is present.
    fn from_model(obj: &Map<String, Value>) -> Option<Self> {
        let recs = obj.get("recommendations");
        let message = obj.get("validating_message").or_else(|| obj.get("validation"));
        if recs.is_none() && message.is_none() {
            return None;
        }

        let recommendations = match recs {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        let text_at = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let validating_message = text_at("validating_message")
            .or_else(|| text_at("validation"))
            .unwrap_or_default()
            .to_string();

        Some(Self {
            recommendations,
            validating_message,
        })
    }

    /// Line-based recovery for replies that carry no JSON.
    ///
    /// Bulleted or numbered lines become recommendations; with none of those the
    /// first three lines are used. The last line is the validating message.
    pub fn from_lines(raw: &str) -> Self {
        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut recommendations: Vec<String> = lines
            .iter()
            .filter(|l| l.starts_with('-') || l.starts_with(|c: char| c.is_ascii_digit()))
            .map(|l| {
                l.trim_start_matches(|c: char| c == '-' || c == '.' || c == ' ' || c.is_ascii_digit())
                    .trim()
                    .to_string()
            })
            .filter(|l| !l.is_empty())
            .collect();

        if recommendations.is_empty() {
            recommendations = lines.iter().take(3).map(|l| l.to_string()).collect();
        }

        Self {
            recommendations,
            validating_message: lines.last().map(|l| l.to_string()).unwrap_or_default(),
        }
    }
}

pub struct ValidatorAgent {
    policy: StagePolicy,
}

impl ValidatorAgent {
    pub const NAME: &'static str = "validator_agent";

    pub fn new(policy: StagePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StagePolicy {
        self.policy
    }

    pub fn prompt(&self, answers: &[String], traits: &TraitMap) -> String {
        validator_prompt(answers, traits)
    }

    pub fn run(
        &self,
        generator: &dyn TextGenerator,
        answers: &[String],
        traits: &TraitMap,
    ) -> Result<StageOutcome<ValidatorOutput>> {
        run_stage(
            Self::NAME,
            generator,
            self.policy,
            &self.prompt(answers, traits),
            ValidatorOutput::from_model,
            ValidatorOutput::from_lines,
        )
    }
}
