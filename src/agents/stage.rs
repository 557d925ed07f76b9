//! The attempt / retry / fallback state machine shared by every stage.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::clients::{GenerationParams, TextGenerator};
use crate::config::StagePolicy;
use crate::error::Result;
use crate::lenient_json::parse_object;
use crate::prompts::json_only;

/// Which branch of the state machine produced a stage's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePath {
    /// First call parsed with the expected key
    Primary,
    /// The JSON-only re-ask parsed with the expected key
    Retry,
    /// Stage heuristic applied to the last raw text
    Fallback,
}

#[derive(Debug, Clone)]
pub struct StageOutcome<T> {
    pub value: T,
    pub path: StagePath,
    /// Raw text of the call whose output was used
    pub raw: String,
}

/// Drive one stage to completion.
///
/// `structured` returns `None` when the expected key is missing; `fallback`
/// must not fail. A remote failure on the first attempt is only absorbed when
/// the policy allows a retry, and a failure on the retry always propagates.
pub fn run_stage<T, S, F>(
    stage: &str,
    generator: &dyn TextGenerator,
    policy: StagePolicy,
    prompt: &str,
    structured: S,
    fallback: F,
) -> Result<StageOutcome<T>>
where
    S: Fn(&Map<String, Value>) -> Option<T>,
    F: FnOnce(&str) -> T,
{
    let params = GenerationParams::from(policy);
    let try_parse = |raw: &str| parse_object(raw).and_then(|obj| structured(&obj));

    let primary_raw = match generator.generate(prompt, params) {
        Ok(raw) => {
            if let Some(value) = try_parse(raw.as_str()) {
                debug!(stage, "structured parse succeeded on first attempt");
                return Ok(StageOutcome {
                    value,
                    path: StagePath::Primary,
                    raw,
                });
            }
            raw
        }
        Err(err) if policy.retry && err.is_retryable() => {
            warn!(stage, error = %err, "first attempt failed, retrying once");
            String::new()
        }
        Err(err) => return Err(err),
    };

    if !policy.retry {
        info!(stage, "no structured output and retry disabled, using fallback");
        return Ok(StageOutcome {
            value: fallback(&primary_raw),
            path: StagePath::Fallback,
            raw: primary_raw,
        });
    }

    info!(stage, "re-asking with JSON-only instruction");
    let raw = generator.generate(&json_only(prompt), params)?;
    if let Some(value) = try_parse(raw.as_str()) {
        return Ok(StageOutcome {
            value,
            path: StagePath::Retry,
            raw,
        });
    }

    info!(stage, "retry still unstructured, using fallback");
    Ok(StageOutcome {
        value: fallback(&raw),
        path: StagePath::Fallback,
        raw,
    })
}
