//! Stage 2: answers plus traits to a short prose summary.

use serde_json::Value;

use crate::agents::stage::{StageOutcome, run_stage};
use crate::agents::trait_agent::TraitMap;
use crate::clients::TextGenerator;
use crate::config::StagePolicy;
use crate::error::Result;
use crate::prompts::summary_prompt;

/// Longest raw-text summary kept when the model ignores the JSON instruction.
pub const FALLBACK_SUMMARY_CHARS: usize = 1000;

pub struct SummaryAgent {
    policy: StagePolicy,
}

impl SummaryAgent {
    pub const NAME: &'static str = "summary_agent";

    pub fn new(policy: StagePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StagePolicy {
        self.policy
    }

    pub fn prompt(&self, answers: &[String], traits: &TraitMap) -> String {
        summary_prompt(answers, traits)
    }

    pub fn run(
        &self,
        generator: &dyn TextGenerator,
        answers: &[String],
        traits: &TraitMap,
    ) -> Result<StageOutcome<String>> {
        run_stage(
            Self::NAME,
            generator,
            self.policy,
            &self.prompt(answers, traits),
            |obj| match obj.get("summary")? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            },
            truncate_raw,
        )
    }
}

fn truncate_raw(raw: &str) -> String {
    raw.trim().chars().take(FALLBACK_SUMMARY_CHARS).collect()
}
