#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Mutex;
use std::thread::JoinHandle;

use personality_mirror::clients::{GenerationParams, TextGenerator};
use personality_mirror::error::{MirrorError, Result};

/// Which stage a prompt belongs to, judged by its role line.
pub fn stage_of(prompt: &str) -> &'static str {
    if prompt.contains("Trait Extractor Agent") {
        "traits"
    } else if prompt.contains("Summary Agent") {
        "summary"
    } else if prompt.contains("Validator & Recommendations Agent") {
        "validator"
    } else {
        "unknown"
    }
}

/// Answers by stage with a fixed reply and records every prompt.
pub struct RoutedGenerator {
    replies: Vec<(&'static str, std::result::Result<String, u16>)>,
    calls: Mutex<Vec<String>>,
}

impl RoutedGenerator {
    pub fn new() -> Self {
        Self {
            replies: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, stage: &'static str, text: &str) -> Self {
        self.replies.push((stage, Ok(text.to_string())));
        self
    }

    pub fn fail(mut self, stage: &'static str, status: u16) -> Self {
        self.replies.push((stage, Err(status)));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stage: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|p| stage_of(p) == stage)
            .collect()
    }
}

impl TextGenerator for RoutedGenerator {
    fn name(&self) -> &str {
        "routed"
    }

    fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        let stage = stage_of(prompt);
        match self.replies.iter().find(|(s, _)| *s == stage) {
            Some((_, Ok(text))) => Ok(text.clone()),
            Some((_, Err(status))) => Err(MirrorError::RemoteCall {
                status: *status,
                body: format!("{stage} unavailable"),
            }),
            None => Ok(String::new()),
        }
    }
}

/// What the one-shot server saw.
#[derive(Debug, Default)]
pub struct CapturedRequest {
    pub request_line: String,
    pub body: String,
}

/// Serve exactly one HTTP response on an ephemeral port.
pub fn one_shot_server(status: u16, body: &str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header == "\r\n" || header.is_empty() {
                break;
            }
            let lower = header.to_ascii_lowercase();
            if let Some(v) = lower.strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap();
            }
        }
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).unwrap();

        let mut stream = stream;
        let response = format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        CapturedRequest {
            request_line: request_line.trim().to_string(),
            body: String::from_utf8(buf).unwrap(),
        }
    });

    (format!("http://{addr}/v1beta/models"), handle)
}
