use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use schoolai::api::types::Registration;
use schoolai::app::{
    SolveOptions, run_karaoke_command, run_ocr_command, run_progress_command,
    run_register_command, run_solve_command,
};
use schoolai::cli::{Cli, Commands, ConfigAction};
use schoolai::config::Config;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(version = %schoolai::version_string(), "starting");

    match cli.command {
        Commands::Register {
            name,
            birth_date,
            grade,
            language,
        } => {
            let path = config_path(cli.config.as_deref())?;
            let config = Config::load_or_default(&path)?.with_env_overrides();
            let registration = Registration {
                full_name: name,
                birth_date,
                grade,
                native_language: language,
            };
            run_register_command(config, &path, registration, cli.quiet).await?;
        }
        Commands::Progress => {
            run_progress_command(load_config(cli.config.as_deref())?).await?;
        }
        Commands::Ocr { image } => {
            run_ocr_command(load_config(cli.config.as_deref())?, &image).await?;
        }
        Commands::Solve {
            text,
            file,
            image,
            subject,
            grade,
            language,
            no_practice,
        } => {
            let options = SolveOptions {
                text,
                file,
                image,
                subject,
                grade,
                language,
                practice: !no_practice,
            };
            run_solve_command(load_config(cli.config.as_deref())?, options, cli.quiet).await?;
        }
        Commands::Karaoke {
            text,
            file,
            language,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_karaoke_command(config, text, file, language, cli.quiet).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "schoolai", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn config_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        // Load from custom path
        Config::load(path)?
    } else {
        // Try default path, fall back to defaults
        Config::load_or_default(&Config::default_path()?)?
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let path = config_path(custom_path)?;

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default(&path)?.with_env_overrides();
            println!("{}", config.get_value_by_path(&key)?);
        }
        ConfigAction::Set { key, value } => {
            Config::set_value_by_path(&path, &key, &value)?;
            println!("{}", format!("Set {key} = {value}").green());
        }
        ConfigAction::List => {
            let config = Config::load_or_default(&path)?.with_env_overrides();
            println!("{}", format!("# {}", path.display()).dimmed());
            print!("{}", config.to_display_toml()?);
        }
    }
    Ok(())
}
