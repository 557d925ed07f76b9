//! Stage 1: free-text answers to scored personality traits.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::agents::stage::{StageOutcome, run_stage};
use crate::clients::TextGenerator;
use crate::config::StagePolicy;
use crate::error::Result;
use crate::prompts::trait_prompt;

/// Trait name to score in [0, 100], one decimal, in the order the model listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraitMap {
    entries: Vec<(String, f64)>,
}

impl TraitMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. The score is normalized on the way in.
    pub fn insert(&mut self, name: impl Into<String>, score: f64) {
        let name = name.into();
        let score = clamp_score(score);
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = score,
            None => self.entries.push((name, score)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Compact JSON object, as embedded in the later prompts.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Build from the model's `traits` object, coercing every value.
    pub fn from_model(raw: &Map<String, Value>) -> Self {
        let mut traits = Self::new();
        for (name, value) in raw {
            traits.insert(name.clone(), normalize_score(value));
        }
        traits
    }
}

impl Serialize for TraitMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, score) in &self.entries {
            map.serialize_entry(name, score)?;
        }
        map.end()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for TraitMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut traits = Self::new();
        for (name, score) in iter {
            traits.insert(name, score);
        }
        traits
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    (score.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

/// Coerce whatever the model put in a score slot.
///
/// Numbers pass through, strings are parsed (a trailing `%` is tolerated),
/// everything else scores 0. The result is clamped and rounded.
pub fn normalize_score(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => parse_score_text(s).unwrap_or(0.0),
        _ => 0.0,
    };
    clamp_score(raw)
}

fn parse_score_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.trim_end_matches('%').trim().parse::<f64>().ok())
}

pub struct TraitAgent {
    policy: StagePolicy,
}

impl TraitAgent {
    pub const NAME: &'static str = "trait_agent";

    pub fn new(policy: StagePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StagePolicy {
        self.policy
    }

    pub fn prompt(&self, answers: &[String]) -> String {
        trait_prompt(answers)
    }

    /// Extract traits. An empty map after a failed retry is a normal outcome.
    pub fn run(
        &self,
        generator: &dyn TextGenerator,
        answers: &[String],
    ) -> Result<StageOutcome<TraitMap>> {
        run_stage(
            Self::NAME,
            generator,
            self.policy,
            &self.prompt(answers),
            |obj| obj.get("traits")?.as_object().map(TraitMap::from_model),
            |_| TraitMap::new(),
        )
    }
}
