use std::process;
use std::sync::Arc;

use tracing_subscriber::{filter::LevelFilter, fmt};

use glyphic_server::state::AppState;
use glyphic_server::{Settings, config, files};

mod cli;
mod error;

use cli::{Cli, Commands};
use error::AppError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match config::load() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    init_tracing(determine_log_level(&cli, &settings));

    if let Err(err) = run(cli, settings).await {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt().with_max_level(level).with_target(false).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

/// Settings pick the baseline level; `-v` flags only ever raise it.
fn determine_log_level(cli: &Cli, settings: &Settings) -> LevelFilter {
    match cli.verbose {
        0 => settings
            .log_level
            .parse()
            .unwrap_or(LevelFilter::INFO),
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<(), AppError> {
    match cli.command {
        Some(Commands::Serve(_)) => run_serve(settings).await,
        None => {
            Cli::print_help();
            Ok(())
        }
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    files::ensure_directory_exists(&settings.temp_dir).map_err(|source| AppError::TempDir {
        path: settings.temp_dir.clone(),
        source,
    })?;
    tracing::info!(path = %settings.temp_dir.display(), "temporary directory ready");

    let settings = Arc::new(settings);
    let state = AppState::new(Arc::clone(&settings));

    // TODO: construct and register the OCR engine via `state.set_ocr_engine`
    // once a model backend lands; until then healthz reports model_loaded=false.
    tracing::info!(
        model_path = %settings.model_path,
        max_file_size = settings.max_file_size,
        "starting glyphic OCR service"
    );

    glyphic_server::serve(&settings, state).await?;

    tracing::info!("glyphic OCR service stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_level(level: &str) -> Settings {
        Settings {
            log_level: level.to_string(),
            ..Settings::default()
        }
    }

    fn cli_with_verbosity(verbose: u8) -> Cli {
        Cli {
            command: None,
            verbose,
        }
    }

    #[test]
    fn log_level_defaults_to_settings() {
        let level = determine_log_level(&cli_with_verbosity(0), &settings_with_level("warn"));
        assert_eq!(level, LevelFilter::WARN);
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let level = determine_log_level(&cli_with_verbosity(0), &settings_with_level("chatty"));
        assert_eq!(level, LevelFilter::INFO);
    }

    #[test]
    fn verbosity_flags_raise_the_level() {
        let settings = settings_with_level("info");
        assert_eq!(
            determine_log_level(&cli_with_verbosity(1), &settings),
            LevelFilter::DEBUG
        );
        assert_eq!(
            determine_log_level(&cli_with_verbosity(2), &settings),
            LevelFilter::TRACE
        );
    }
}
