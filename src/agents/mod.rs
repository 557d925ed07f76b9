//! The three prompt-driven pipeline stages.
//!
//! ```text
//! answers ──▶ [TraitAgent] ──▶ traits
//!                                 │
//!        answers + traits ──▶ [SummaryAgent]   ──▶ summary
//!        answers + traits ──▶ [ValidatorAgent] ──▶ recommendations, validating_message
//! ```
//!
//! Every stage goes through [`stage::run_stage`]: one attempt, an optional
//! JSON-only retry, then a stage-specific fallback that cannot fail.

pub mod stage;
pub mod summary_agent;
pub mod trait_agent;
pub mod validator_agent;

pub use stage::{StageOutcome, StagePath, run_stage};
pub use summary_agent::SummaryAgent;
pub use trait_agent::{TraitAgent, TraitMap, normalize_score};
pub use validator_agent::{ValidatorAgent, ValidatorOutput};

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::clients::{GenerationParams, TextGenerator};
    use crate::error::{MirrorError, Result};

    /// Replays canned replies in order and records every prompt it saw.
    pub struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn new<I>(script: I) -> Self
        where
            I: IntoIterator<Item = std::result::Result<&'static str, MirrorError>>,
        {
            Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(MirrorError::RemoteCall {
                        status: 599,
                        body: "script exhausted".to_string(),
                    })
                })
        }
    }
}
