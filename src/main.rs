use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use personality_mirror::config::Config;
use personality_mirror::orchestrator::PipelineOrchestrator;
use personality_mirror::report::{QUESTIONS, ensure_answered, normalize_answers, render_text};

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-stage personality mirror backed by Gemini", long_about = None)]
struct Args {
    /// Your name (optional, used in the report title)
    #[arg(long)]
    name: Option<String>,

    /// One answer per flag, in question order (omit to be asked interactively)
    #[arg(long = "answer", value_name = "TEXT")]
    answers: Vec<String>,

    /// Print the result as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Also write the text report to this file
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Config file (defaults to PERSONALITY_MIRROR_CONFIG or personality_mirror.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip the extra raw-output calls made for debugging
    #[arg(long)]
    no_raw: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            personality_mirror::load_env();
            Config::load_from(path)
        }
        None => Config::load(),
    }
    .context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Config is read before the subscriber exists, so report its origin now
    match &config.source {
        Some(path) => tracing::debug!("Loaded config from {}", path.display()),
        None => tracing::warn!("No config file found, using defaults"),
    }

    let answers = if args.answers.is_empty() {
        ask_questions()?
    } else {
        normalize_answers(&args.answers)
    };
    ensure_answered(&answers)?;

    let mut orchestrator = PipelineOrchestrator::from_config(&config)?;
    if args.no_raw {
        orchestrator = orchestrator.with_capture_raw(false);
    }

    eprintln!("Analyzing your personality...");
    let result = match orchestrator.run(&answers, args.name.as_deref()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error generating personality mirror: {e}");
            std::process::exit(1);
        }
    };

    let text = render_text(&result, args.name.as_deref(), chrono::Utc::now());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{text}");
    }

    if let Some(path) = &args.out {
        std::fs::write(path, &text)
            .with_context(|| format!("writing report to {}", path.display()))?;
        eprintln!("Report saved to {}", path.display());
    }

    Ok(())
}

fn ask_questions() -> Result<Vec<String>> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut answers = Vec::with_capacity(QUESTIONS.len());
    for (i, question) in QUESTIONS.iter().enumerate() {
        eprint!("{}) {} ", i + 1, question);
        io::stderr().flush().ok();
        let line = lines.next().transpose().context("reading answer")?;
        answers.push(line.unwrap_or_default());
    }
    Ok(normalize_answers(answers))
}
