//! Runs the trait, summary and validator stages in order and composes the result.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agents::{SummaryAgent, TraitAgent, TraitMap, ValidatorAgent};
use crate::clients::{GenerationParams, TextGenerator, build_generator};
use crate::config::{Config, StagePolicy};
use crate::error::Result;

/// Raw model text per stage, for debugging only. `None` when the re-call failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawOutputs {
    pub trait_agent: Option<String>,
    pub summary_agent: Option<String>,
    pub validator_agent: Option<String>,
}

/// Final report handed back to the caller. Every field is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineResult {
    pub summary: String,
    pub traits: TraitMap,
    pub recommendations: Vec<String>,
    pub validating_message: String,
    pub raw: RawOutputs,
}

/// Multi-stage personality pipeline
pub struct PipelineOrchestrator {
    generator: Box<dyn TextGenerator>,
    trait_agent: TraitAgent,
    summary_agent: SummaryAgent,
    validator_agent: ValidatorAgent,
    capture_raw: bool,
}

impl PipelineOrchestrator {
    pub fn new(generator: Box<dyn TextGenerator>, config: &Config) -> Self {
        Self {
            generator,
            trait_agent: TraitAgent::new(config.stages.traits),
            summary_agent: SummaryAgent::new(config.stages.summary),
            validator_agent: ValidatorAgent::new(config.stages.validator),
            capture_raw: config.pipeline.capture_raw,
        }
    }

    /// Build the configured transport and wire it in.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(build_generator(config)?, config))
    }

    pub fn with_capture_raw(mut self, capture_raw: bool) -> Self {
        self.capture_raw = capture_raw;
        self
    }

    /// Run all three stages for one answer set.
    ///
    /// The caller is expected to have checked that at least one answer is
    /// non-empty. `name` is only used to label log output.
    pub fn run(&self, answers: &[String], name: Option<&str>) -> Result<PipelineResult> {
        let span = tracing::info_span!(
            "pipeline",
            subject = name.filter(|n| !n.trim().is_empty()).unwrap_or("anonymous"),
            answers = answers.len()
        );
        let _guard = span.enter();
        info!("Running personality pipeline");

        let generator = self.generator.as_ref();

        let traits = self.trait_agent.run(generator, answers)?;
        debug!(path = ?traits.path, count = traits.value.len(), "trait stage done");

        let summary = self.summary_agent.run(generator, answers, &traits.value)?;
        debug!(path = ?summary.path, "summary stage done");

        let validator = self.validator_agent.run(generator, answers, &traits.value)?;
        debug!(
            path = ?validator.path,
            recommendations = validator.value.recommendations.len(),
            "validator stage done"
        );

        let mut result = PipelineResult {
            summary: summary.value,
            traits: traits.value,
            recommendations: validator.value.recommendations,
            validating_message: validator.value.validating_message,
            raw: RawOutputs::default(),
        };

        if self.capture_raw {
            result.raw = self.capture_raw_outputs(answers, &result.traits);
        }

        info!("Personality pipeline finished");
        Ok(result)
    }

    /// Re-ask each stage's base prompt once and keep the text unparsed.
    ///
    /// Runs after the result is final; failures only leave an entry empty.
    fn capture_raw_outputs(&self, answers: &[String], traits: &TraitMap) -> RawOutputs {
        RawOutputs {
            trait_agent: self.diagnostic_call(
                TraitAgent::NAME,
                &self.trait_agent.prompt(answers),
                self.trait_agent.policy(),
            ),
            summary_agent: self.diagnostic_call(
                SummaryAgent::NAME,
                &self.summary_agent.prompt(answers, traits),
                self.summary_agent.policy(),
            ),
            validator_agent: self.diagnostic_call(
                ValidatorAgent::NAME,
                &self.validator_agent.prompt(answers, traits),
                self.validator_agent.policy(),
            ),
        }
    }

    fn diagnostic_call(&self, stage: &str, prompt: &str, policy: StagePolicy) -> Option<String> {
        match self
            .generator
            .generate(prompt, GenerationParams::from(policy))
        {
            Ok(raw) => Some(raw),
            Err(err) => {
                warn!(stage, error = %err, "raw output capture failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedGenerator;
    use crate::error::MirrorError;

    fn answers() -> Vec<String> {
        vec!["I like reading".into(), "".into(), "".into(), "".into(), "".into()]
    }

    #[test]
    fn result_serializes_with_expected_top_level_keys() {
        let value = serde_json::to_value(PipelineResult::default()).unwrap();
        let obj = value.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["summary", "traits", "recommendations", "validating_message", "raw"]
        );
        assert!(obj["raw"]["trait_agent"].is_null());
    }

    #[test]
    fn diagnostic_failures_are_swallowed_per_stage() {
        let generator = ScriptedGenerator::new([
            Ok(r#"{"traits": {"Curious": 90}}"#),
            Ok(r#"{"summary": "Bookish."}"#),
            Ok(r#"{"recommendations": ["Join a club"], "validating_message": "Great."}"#),
            Ok("raw traits"),
            Err(MirrorError::RemoteCall {
                status: 500,
                body: "flaky".into(),
            }),
            Ok("raw validator"),
        ]);
        let orchestrator = PipelineOrchestrator::new(Box::new(generator), &Config::default());
        let result = orchestrator.run(&answers(), Some("Ada")).unwrap();

        assert_eq!(result.summary, "Bookish.");
        assert_eq!(result.traits.get("Curious"), Some(90.0));
        assert_eq!(result.raw.trait_agent.as_deref(), Some("raw traits"));
        assert_eq!(result.raw.summary_agent, None);
        assert_eq!(result.raw.validator_agent.as_deref(), Some("raw validator"));
    }

    #[test]
    fn capture_can_be_disabled() {
        let generator = ScriptedGenerator::new([
            Ok(r#"{"traits": {}}"#),
            Ok(r#"{"summary": "s"}"#),
            Ok(r#"{"recommendations": []}"#),
        ]);
        let orchestrator = PipelineOrchestrator::new(Box::new(generator), &Config::default())
            .with_capture_raw(false);
        let result = orchestrator.run(&answers(), None).unwrap();
        assert_eq!(result.raw, RawOutputs::default());
    }

    #[test]
    fn stage_error_propagates_to_caller() {
        let generator = ScriptedGenerator::new([Err(MirrorError::missing_api_key())]);
        let orchestrator = PipelineOrchestrator::new(Box::new(generator), &Config::default());
        assert!(matches!(
            orchestrator.run(&answers(), None),
            Err(MirrorError::Config { .. })
        ));
    }
}
