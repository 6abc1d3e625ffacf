//! Command implementations.
//!
//! Wires configuration, the HTTP client, the stream consumer and the
//! practice runner together: solve → render steps → reward → practice.

use crate::api::types::{InputType, Registration, Subject, TaskRequest};
use crate::api::ApiClient;
use crate::config::{Config, KaraokeConfig, RecognizerMode};
use crate::defaults;
use crate::error::SchoolError;
use crate::karaoke::{
    CommandRecognizer, CommandSynthesizer, EchoSynthesizer, KaraokeRunner, KaraokeSession,
    LineSource, SpeechRecognizer, SpeechSynthesizer, StdinRecognizer,
};
use crate::output::{self, Notice, StepPrinter};
use crate::stream::StepEventParser;
use anyhow::{Context, Result, bail};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Options of the `solve` command after CLI parsing.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub subject: Subject,
    pub grade: Option<u8>,
    pub language: Option<String>,
    pub practice: bool,
}

fn api_client(config: &Config) -> Result<ApiClient> {
    Ok(ApiClient::new(
        &config.server.base_url,
        Duration::from_secs(config.server.request_timeout_secs),
    )?)
}

fn require_user_id(config: &Config) -> Result<&str> {
    match config.user.user_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => bail!("No learner registered yet. Run `schoolai register` first."),
    }
}

fn notify(quiet: bool, notice: Notice, message: &str) {
    if !quiet || matches!(notice, Notice::Warning | Notice::Error) {
        output::notify(notice, message);
    }
}

/// Text from the argument, a file, or piped stdin, in that order.
async fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()));
    }
    if std::io::stdin().is_terminal() {
        bail!("No text given. Pass it as an argument, with --file, or on stdin.");
    }
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read stdin")?;
    Ok(text)
}

pub async fn run_register_command(
    config: Config,
    config_path: &Path,
    registration: Registration,
    quiet: bool,
) -> Result<()> {
    let client = api_client(&config)?;
    let user_id = client.register(&registration).await?;

    Config::set_value_by_path(config_path, "user.user_id", &user_id)?;
    Config::set_value_by_path(config_path, "user.grade", &registration.grade.to_string())?;
    Config::set_value_by_path(
        config_path,
        "user.native_language",
        &registration.native_language,
    )?;

    notify(
        quiet,
        Notice::Success,
        &format!("Registered {} ({user_id})", registration.full_name),
    );
    Ok(())
}

pub async fn run_progress_command(config: Config) -> Result<()> {
    let user_id = require_user_id(&config)?;
    let progress = api_client(&config)?.progress(user_id).await?;
    println!("{}", output::format_progress(&progress));
    Ok(())
}

pub async fn run_ocr_command(config: Config, image: &Path) -> Result<()> {
    let text = api_client(&config)?.ocr(image).await?;
    println!("{text}");
    Ok(())
}

/// Solve a task, streaming steps to stdout, then reward and offer practice.
pub async fn run_solve_command(config: Config, options: SolveOptions, quiet: bool) -> Result<()> {
    let client = api_client(&config)?;

    let (payload, input_type) = match &options.image {
        Some(image) => {
            notify(quiet, Notice::Info, "Recognizing task photo...");
            (client.ocr(image).await?, InputType::Ocr)
        }
        None => (
            read_text(options.text.clone(), options.file.as_deref()).await?,
            InputType::Text,
        ),
    };

    let language = options
        .language
        .clone()
        .unwrap_or_else(|| config.user.native_language.clone());
    let request = TaskRequest::text(
        payload.trim(),
        options.subject,
        options.grade.unwrap_or(config.user.grade),
        &language,
    )
    .with_input_type(input_type);
    request.validate()?;

    let parser = StepEventParser::new().with_event_lines(config.stream.accept_event_lines);
    let mut printer = StepPrinter::new(std::io::stdout().is_terminal());

    let steps = match client.solve_streaming(&request, parser, &mut printer).await {
        Ok(steps) => steps,
        Err(e @ SchoolError::StreamUnavailable { .. }) if printer.printed() > 0 => {
            // Steps already on screen stay there; no reward for a partial solution.
            return Err(anyhow::Error::new(e).context(format!(
                "Solution interrupted after {} steps, no star awarded",
                printer.printed()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if steps.is_empty() {
        notify(quiet, Notice::Warning, "The server returned no steps.");
        return Ok(());
    }

    award_star(&client, &config, quiet).await;

    if options.practice && options.subject.offers_practice() && std::io::stdin().is_terminal() {
        let locale = defaults::speech_locale(&config.user.native_language);
        let lines = LineSource::stdin();
        if confirm(&lines, "Practice this text aloud?").await {
            run_practice(&config.karaoke, &request.payload, locale, &lines, quiet).await?;
        }
    }
    Ok(())
}

/// Post a reward and show the refreshed star count. Failures only warn.
async fn award_star(client: &ApiClient, config: &Config, quiet: bool) {
    let Some(user_id) = config.user.user_id.as_deref().filter(|id| !id.is_empty()) else {
        debug!("no registered learner, skipping reward");
        return;
    };

    if let Err(e) = client.reward(user_id).await {
        warn!(error = %e, "reward failed");
        notify(quiet, Notice::Warning, &format!("Could not add a star: {e}"));
        return;
    }

    match client.progress(user_id).await {
        Ok(progress) => notify(
            quiet,
            Notice::Success,
            &format!("Star added! {}", output::format_progress(&progress)),
        ),
        Err(e) => {
            warn!(error = %e, "progress refresh failed");
            notify(quiet, Notice::Success, "Star added!");
        }
    }
}

/// Closed input counts as "no".
async fn confirm(lines: &LineSource, question: &str) -> bool {
    eprint!("{question} [y/N] ");
    let Some(answer) = lines.next_line().await else {
        return false;
    };
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "д" | "да")
}

pub async fn run_karaoke_command(
    config: Config,
    text: Option<String>,
    file: Option<PathBuf>,
    language: Option<String>,
    quiet: bool,
) -> Result<()> {
    let text = read_text(text, file.as_deref()).await?;
    let locale = language
        .unwrap_or_else(|| defaults::speech_locale(&config.user.native_language).to_string());
    run_practice(&config.karaoke, &text, &locale, &LineSource::stdin(), quiet).await?;
    Ok(())
}

/// Interactive practice: Enter plays the current line, `q` quits.
///
/// Triggers and typed transcripts come from the same `lines`. Returns whether
/// every line was practiced.
async fn run_practice(
    config: &KaraokeConfig,
    text: &str,
    locale: &str,
    lines: &LineSource,
    quiet: bool,
) -> Result<bool> {
    let mut runner = KaraokeRunner::new(
        KaraokeSession::new(text, locale),
        build_synthesizer(config)?,
        build_recognizer(config, lines)?,
        config.timeouts(),
    )?;

    if runner.is_finished() {
        notify(quiet, Notice::Warning, "Nothing to practice: the text has no lines.");
        return Ok(false);
    }

    while !runner.is_finished() {
        output::render_line_prompt(runner.session());
        let Some(line) = lines.next_line().await else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        for feedback in runner.play_turn().await {
            output::render_feedback(&feedback, runner.session());
        }
    }
    Ok(runner.is_finished())
}

pub fn build_synthesizer(config: &KaraokeConfig) -> Result<Arc<dyn SpeechSynthesizer>> {
    if config.synthesizer_command.is_empty() {
        return Ok(Arc::new(EchoSynthesizer));
    }
    Ok(Arc::new(CommandSynthesizer::new(&config.synthesizer_command)?))
}

/// `None` when recognition is switched off; the runner then refuses to start.
pub fn build_recognizer(
    config: &KaraokeConfig,
    lines: &LineSource,
) -> Result<Option<Arc<dyn SpeechRecognizer>>> {
    Ok(match config.recognizer {
        RecognizerMode::None => None,
        RecognizerMode::Stdin => Some(Arc::new(StdinRecognizer::new(lines.clone()))),
        RecognizerMode::Command => {
            Some(Arc::new(CommandRecognizer::new(&config.recognizer_command)?))
        }
    })
}
