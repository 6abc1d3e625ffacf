//! Command-line interface for schoolai
//!
//! Provides argument parsing using clap derive macros.

use crate::api::types::Subject;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Step-by-step homework help with listen-and-repeat practice
#[derive(Parser, Debug)]
#[command(
    name = "schoolai",
    version,
    about = "Step-by-step homework help with listen-and-repeat practice"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress notifications (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a learner and remember the user id
    Register {
        /// Full name
        #[arg(long)]
        name: String,
        /// Birth date as YYYY-MM-DD
        #[arg(long, value_name = "DATE")]
        birth_date: String,
        /// School grade (1-11)
        #[arg(long)]
        grade: u8,
        /// Native language (ru, en, sah)
        #[arg(long, value_name = "LANG", default_value = "ru")]
        language: String,
    },

    /// Show earned stars
    Progress,

    /// Recognize the text of a task photo
    Ocr {
        /// PNG, JPEG or WebP image
        image: PathBuf,
    },

    /// Solve a task, printing each step as it arrives
    Solve {
        /// Task text (reads --file or stdin when omitted)
        text: Option<String>,
        /// Read the task text from a file
        #[arg(long, short = 'f', value_name = "PATH", conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Task photo to recognize first
        #[arg(long, value_name = "PATH", conflicts_with_all = ["text", "file"])]
        image: Option<PathBuf>,
        /// School subject
        #[arg(long, short = 's', value_enum, default_value_t = Subject::Math)]
        subject: Subject,
        /// School grade (default: from config)
        #[arg(long, short = 'g')]
        grade: Option<u8>,
        /// Task language (default: native language from config)
        #[arg(long, short = 'l', value_name = "LANG")]
        language: Option<String>,
        /// Do not offer listen-and-repeat practice afterwards
        #[arg(long)]
        no_practice: bool,
    },

    /// Practice text line by line: listen, then repeat
    Karaoke {
        /// Practice text (reads --file or stdin when omitted)
        text: Option<String>,
        /// Read the practice text from a file
        #[arg(long, short = 'f', value_name = "PATH", conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Speech locale (default: derived from native language)
        #[arg(long, short = 'l', value_name = "LOCALE")]
        language: Option<String>,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value by key (e.g., server.base_url)
    Get {
        /// Dotted key path (e.g., user.grade, karaoke.recognizer)
        key: String,
    },
    /// Set a configuration value by key
    Set {
        /// Dotted key path (e.g., user.grade, karaoke.recognizer)
        key: String,
        /// Value to set
        value: String,
    },
    /// List current configuration values
    List,
}
