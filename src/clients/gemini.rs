//! Gemini transports: the REST generateContent endpoint and the local CLI.

use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::clients::extract::extract_text;
use crate::clients::traits::{GenerationParams, TextGenerator};
use crate::config::{CredentialsProvider, GeminiConfig};
use crate::error::{MirrorError, Result};

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

/// Single user-role message plus sampling parameters.
fn build_request(prompt: &str, params: GenerationParams, top_p: f32) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: [Content {
            role: "user",
            parts: [Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: params.temperature,
            top_p,
            max_output_tokens: params.max_tokens,
        },
    }
}

/// Direct HTTP client for `{base}/{model}:generateContent`
pub struct GeminiHttpClient {
    client: Client,
    base_url: String,
    top_p: f32,
    credentials: Box<dyn CredentialsProvider>,
}

impl GeminiHttpClient {
    pub fn new(config: &GeminiConfig, credentials: Box<dyn CredentialsProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MirrorError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            top_p: config.top_p,
            credentials,
        })
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.base_url, model)
    }
}

impl TextGenerator for GeminiHttpClient {
    fn name(&self) -> &str {
        "gemini-http"
    }

    fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        let creds = self.credentials.resolve();
        let api_key = creds.api_key.ok_or_else(MirrorError::missing_api_key)?;

        debug!(
            "Calling Gemini (model={}, chars={}, max_tokens={})",
            creds.model,
            prompt.len(),
            params.max_tokens
        );

        let resp = self
            .client
            .post(self.endpoint(&creds.model))
            .query(&[("key", api_key.as_str())])
            .json(&build_request(prompt, params, self.top_p))
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(MirrorError::RemoteCall {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json()?;
        Ok(extract_text(&body))
    }
}

/// Shells out to the `gemini` CLI, which handles its own authentication.
///
/// The CLI does not expose sampling controls, so `params` only shows up in logs.
pub struct GeminiCliClient {
    program: String,
    credentials: Box<dyn CredentialsProvider>,
}

impl GeminiCliClient {
    pub fn new(config: &GeminiConfig, credentials: Box<dyn CredentialsProvider>) -> Self {
        Self {
            program: config.cli_path.clone(),
            credentials,
        }
    }

    pub fn check_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// CLI stdout is `{"response": ...}` JSON, some other JSON, or plain text.
pub(crate) fn text_from_cli_stdout(stdout: &str) -> String {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(value) => match value.get("response").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => extract_text(&value),
        },
        Err(_) => stdout.trim().to_string(),
    }
}

/// Non-zero exit becomes `RemoteCall` with the exit code; death by signal is a `Transport` error.
pub(crate) fn cli_failure(status: ExitStatus, stderr: &[u8]) -> MirrorError {
    let stderr = String::from_utf8_lossy(stderr).into_owned();
    match status.code() {
        Some(code) => MirrorError::RemoteCall {
            status: code.clamp(1, i32::from(u16::MAX)) as u16,
            body: stderr,
        },
        None => MirrorError::Transport {
            message: format!("gemini CLI terminated without exit code ({status}): {stderr}"),
        },
    }
}

impl TextGenerator for GeminiCliClient {
    fn name(&self) -> &str {
        "gemini-cli"
    }

    fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        let model = self.credentials.resolve().model;
        debug!(
            "Calling gemini CLI (model={}, chars={}, ignored max_tokens={} temperature={})",
            model,
            prompt.len(),
            params.max_tokens,
            params.temperature
        );

        // Prompt goes via stdin to avoid arg length limits
        let mut child = Command::new(&self.program)
            .args(["-m", model.as_str(), "-o", "json"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MirrorError::Config {
                message: format!("cannot start '{}': {}", self.program, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes())?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(cli_failure(output.status, &output.stderr));
        }

        Ok(text_from_cli_stdout(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;
    use serde_json::json;

    #[test]
    fn request_body_matches_generate_content_shape() {
        let req = build_request("hi there", GenerationParams::new(500, 0.7), 0.95);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hi there"}]}],
                "generationConfig": {
                    "temperature": 0.7f32,
                    "topP": 0.95f32,
                    "maxOutputTokens": 500
                }
            })
        );
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let config = GeminiConfig {
            base_url: "http://localhost:9/models/".into(),
            ..GeminiConfig::default()
        };
        let client =
            GeminiHttpClient::new(&config, Box::new(StaticCredentials::new(None, "m"))).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.0-flash"),
            "http://localhost:9/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn transport_error_text_omits_api_key() {
        let config = GeminiConfig {
            base_url: "http://127.0.0.1:9/v1beta/models".into(),
            timeout_secs: 2,
            ..GeminiConfig::default()
        };
        let client = GeminiHttpClient::new(
            &config,
            Box::new(StaticCredentials::new(Some("SECRET-KEY-123"), "m")),
        )
        .unwrap();
        let err = client
            .generate("prompt", GenerationParams::new(10, 0.1))
            .unwrap_err();
        assert!(matches!(err, MirrorError::Transport { .. }), "got {err:?}");
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{err:?}").contains("SECRET-KEY-123"));
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        // Unroutable base URL: reaching the network would surface a Transport error instead
        let config = GeminiConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..GeminiConfig::default()
        };
        let client =
            GeminiHttpClient::new(&config, Box::new(StaticCredentials::new(None, "m"))).unwrap();
        let err = client
            .generate("prompt", GenerationParams::new(10, 0.1))
            .unwrap_err();
        assert!(matches!(err, MirrorError::Config { .. }), "got {err:?}");
    }

    #[test]
    fn cli_stdout_variants() {
        assert_eq!(
            text_from_cli_stdout(r#"{"session_id":"s","response":"hello"}"#),
            "hello"
        );
        assert_eq!(
            text_from_cli_stdout(r#"{"result":{"text":"deep"}}"#),
            "deep"
        );
        assert_eq!(text_from_cli_stdout("  plain words \n"), "plain words");
    }

    #[cfg(unix)]
    #[test]
    fn cli_exit_code_and_signal_map_to_distinct_errors() {
        use std::os::unix::process::ExitStatusExt;

        let err = cli_failure(ExitStatus::from_raw(2 << 8), b"quota exceeded");
        assert!(
            matches!(&err, MirrorError::RemoteCall { status: 2, body } if body == "quota exceeded"),
            "got {err:?}"
        );

        let err = cli_failure(ExitStatus::from_raw(9), b"");
        assert!(matches!(err, MirrorError::Transport { .. }), "got {err:?}");
        assert!(err.is_retryable());
    }
}
