//! Document Translator Web - JSON API for translating uploaded documents.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use doc_translator_core::{AppConfig, Lang, clear_translation_cache};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::{AppState, JOB_MAX_AGE};

/// How often finished and abandoned jobs are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Parser, Debug)]
#[command(name = "doc-translator-web")]
#[command(author, version, about = "Document Translator Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_BASE")]
    api_base: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Default target language when an upload names none
    #[arg(long)]
    target: Option<String>,

    /// Pages per request (default: chosen from file size and page count)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Disable caching
    #[arg(long)]
    no_cache: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Clear the chunk cache on startup
    #[arg(long)]
    clear_cache: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(api_base) = &self.api_base {
            config.translator.api_base.clone_from(api_base);
        }
        if self.api_key.is_some() {
            config.translator.api_key.clone_from(&self.api_key);
        }
        if let Some(model) = &self.model {
            config.translator.model.clone_from(model);
        }
        if let Some(target) = &self.target {
            config.target_lang = Lang::new(target);
        }
        if self.chunk_size.is_some() {
            config.pipeline.chunk_size = self.chunk_size;
        }
        if self.no_cache {
            config.cache.memory_enabled = false;
            config.cache.disk_enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},sled=warn")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if args.clear_cache {
        match clear_translation_cache() {
            Ok(count) => info!("Cleared {} cached chunk translations", count),
            Err(e) => warn!("Failed to clear cache: {}", e),
        }
    }

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    args.apply(&mut config);

    // Opens the disk cache, so a second server on the same cache fails fast
    let state = Arc::new(AppState::new(config).context("Failed to initialize application state")?);
    if !state.translator.translator().is_available() {
        warn!("No Gemini API key configured; translation jobs will fail");
    }

    let sweep_state = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;
            let removed = sweep_state.cleanup_old_jobs(JOB_MAX_AGE).await;
            if removed > 0 {
                info!("Removed {} expired jobs", removed);
            }
        }
    });

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "doc-translator-web",
            "--model",
            "gemini-2.5-pro",
            "--target",
            "de",
            "--chunk-size",
            "4",
            "--no-cache",
        ]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.translator.model, "gemini-2.5-pro");
        assert_eq!(config.target_lang, Lang::new("de"));
        assert_eq!(config.pipeline.chunk_size, Some(4));
        assert!(!config.cache.memory_enabled);
        assert!(!config.cache.disk_enabled);
        assert_eq!(args.port, 3000);
    }
}
