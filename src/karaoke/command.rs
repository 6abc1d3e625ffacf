//! Speech backends built on external programs and the terminal.
//!
//! Synthesis and recognition engines are configured as command templates,
//! e.g. `["espeak-ng", "-v", "{lang}", "{text}"]`. `{text}` and `{lang}`
//! are substituted per call; when no argument mentions `{text}` the line is
//! appended as the final argument.

use crate::error::{Result, SchoolError};
use crate::karaoke::speech::{SpeechRecognizer, SpeechSynthesizer};
use std::io::BufRead;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::thread;
use tokio::process::Command;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

const TEXT_PLACEHOLDER: &str = "{text}";
const LANG_PLACEHOLDER: &str = "{lang}";
const LINE_BUFFER: usize = 16;

/// Substitute placeholders into a command template's arguments.
fn render_args(template: &[String], text: Option<&str>, language: &str) -> Vec<String> {
    let mut args: Vec<String> = template
        .iter()
        .map(|arg| {
            let arg = arg.replace(LANG_PLACEHOLDER, language);
            match text {
                Some(text) => arg.replace(TEXT_PLACEHOLDER, text),
                None => arg,
            }
        })
        .collect();

    if let Some(text) = text
        && !template.iter().any(|arg| arg.contains(TEXT_PLACEHOLDER))
    {
        args.push(text.to_string());
    }
    args
}

/// Whether `program` resolves to a file, either directly or via `PATH`.
pub fn program_on_path(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Split a template into program and argument list.
fn split_template(template: &[String]) -> Result<(&str, &[String])> {
    template
        .split_first()
        .map(|(program, args)| (program.as_str(), args))
        .ok_or_else(|| SchoolError::ConfigInvalidValue {
            key: "karaoke".to_string(),
            message: "speech command must not be empty".to_string(),
        })
}

/// Synthesizer that runs an external TTS program per line.
///
/// A timed-out or cancelled utterance is killed when its future is dropped.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(template: &[String]) -> Result<Self> {
        let (program, args) = split_template(template)?;
        Ok(Self {
            program: program.to_string(),
            args: args.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str, language: &str) -> Result<()> {
        let args = render_args(&self.args, Some(text), language);
        debug!(program = %self.program, ?args, "running synthesizer");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| SchoolError::SynthesisFailed {
                message: format!("Failed to execute {}: {}", self.program, e),
            })?;

        if !status.success() {
            return Err(SchoolError::SynthesisFailed {
                message: format!("{} failed with status {:?}", self.program, status),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Fallback synthesizer that prints the line instead of playing it.
#[derive(Debug, Clone, Default)]
pub struct EchoSynthesizer;

#[async_trait::async_trait]
impl SpeechSynthesizer for EchoSynthesizer {
    async fn speak(&self, text: &str, _language: &str) -> Result<()> {
        eprintln!("♪ {text}");
        Ok(())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Recognizer that runs an external STT program and reads the transcript
/// from its stdout.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(template: &[String]) -> Result<Self> {
        let (program, args) = split_template(template)?;
        Ok(Self {
            program: program.to_string(),
            args: args.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for CommandRecognizer {
    async fn recognize(&self, language: &str) -> Result<String> {
        let args = render_args(&self.args, None, language);
        debug!(program = %self.program, ?args, "running recognizer");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SchoolError::RecognitionFailed {
                message: format!("Failed to execute {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SchoolError::RecognitionFailed {
                message: format!(
                    "{} failed with status {:?}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn is_available(&self) -> bool {
        program_on_path(&self.program)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Lines typed on the terminal, shared by everything that reads them.
///
/// A single reader thread owns stdin and forwards each line into a channel.
/// Waiting for a line is cancel-safe: a read abandoned by a timeout leaves
/// the next line in the channel for whoever asks after it.
#[derive(Debug, Clone)]
pub struct LineSource {
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl LineSource {
    /// Starts the stdin reader thread.
    ///
    /// Blocking reads run on a plain thread so a pending read never holds up
    /// runtime shutdown.
    pub fn stdin() -> Self {
        let (tx, source) = Self::channel(LINE_BUFFER);
        thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        source
    }

    /// A source fed by hand; it ends once the sender is dropped.
    pub fn channel(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            tx,
            Self {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// A source that yields `lines` and then ends.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let (tx, source) = Self::channel(lines.len().max(1));
        for line in lines {
            if tx.try_send(line).is_err() {
                break;
            }
        }
        source
    }

    /// Next line without its terminator, or `None` once input is closed.
    pub async fn next_line(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }
}

/// Recognizer that takes the learner's line typed on the terminal.
#[derive(Debug, Clone)]
pub struct StdinRecognizer {
    lines: LineSource,
}

impl StdinRecognizer {
    pub fn new(lines: LineSource) -> Self {
        Self { lines }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for StdinRecognizer {
    async fn recognize(&self, _language: &str) -> Result<String> {
        eprint!("> ");
        self.lines
            .next_line()
            .await
            .ok_or_else(|| SchoolError::RecognitionFailed {
                message: "terminal input closed".to_string(),
            })
    }

    fn name(&self) -> &str {
        "stdin"
    }
}
