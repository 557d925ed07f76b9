pub mod extract;
pub mod gemini;
pub mod traits;

pub use extract::extract_text;
pub use gemini::{GeminiCliClient, GeminiHttpClient};
pub use traits::{GenerationParams, TextGenerator};

use crate::config::{Config, TransportKind};
use crate::error::Result;

/// Pick the one transport this process will use.
pub fn build_generator(config: &Config) -> Result<Box<dyn TextGenerator>> {
    let credentials = Box::new(config.credentials());
    let generator: Box<dyn TextGenerator> = match config.gemini.transport {
        TransportKind::Http => Box::new(GeminiHttpClient::new(&config.gemini, credentials)?),
        TransportKind::Cli => {
            let cli = GeminiCliClient::new(&config.gemini, credentials);
            if !cli.check_available() {
                tracing::warn!(
                    "gemini CLI '{}' did not answer --version; calls will likely fail",
                    config.gemini.cli_path
                );
            }
            Box::new(cli)
        }
    };
    tracing::info!("Using {} transport", generator.name());
    Ok(generator)
}
