//! # personality-mirror
//!
//! Turns a handful of short free-text answers into a structured personality
//! report by running three model-backed stages in sequence: trait extraction,
//! summary, and validation with recommendations.
//!
//! The model is reached through a single [`clients::TextGenerator`] chosen at
//! startup from [`config::Config`]. Model output is parsed leniently and every
//! stage degrades to a heuristic instead of failing, so a finished run always
//! yields a fully populated [`orchestrator::PipelineResult`].

pub mod agents;
pub mod clients;
pub mod config;
pub mod error;
pub mod lenient_json;
pub mod orchestrator;
pub mod prompts;
pub mod report;

pub use agents::TraitMap;
pub use config::Config;
pub use error::{MirrorError, Result};
pub use orchestrator::{PipelineOrchestrator, PipelineResult, RawOutputs};

// Load env from MIRROR_ENV_FILE or ./.env. Missing files are silently ignored.
pub fn load_env() {
    match std::env::var("MIRROR_ENV_FILE") {
        Ok(path) => {
            let _ = dotenvy::from_path(path);
        }
        Err(_) => {
            let _ = dotenvy::dotenv();
        }
    }
}

/// Build the configured transport and run the pipeline once.
pub fn run_pipeline(config: &Config, answers: &[String], name: Option<&str>) -> Result<PipelineResult> {
    PipelineOrchestrator::from_config(config)?.run(answers, name)
}
