use crate::error::Result;

/// Sampling knobs for one call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

impl From<crate::config::StagePolicy> for GenerationParams {
    fn from(policy: crate::config::StagePolicy) -> Self {
        Self::new(policy.max_tokens, policy.temperature)
    }
}

/// Anything that turns a prompt into model text.
///
/// Implementations are stateless between calls and perform no retries.
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        (**self).generate(prompt, params)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        (**self).generate(prompt, params)
    }
}
