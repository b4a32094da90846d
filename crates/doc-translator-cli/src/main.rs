//! Document Translator CLI - Command line tool for translating documents.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use doc_translator_core::{
    AppConfig, BackoffKind, CancellationToken, DocumentTranslator, Lang, OutputFormat,
    ProgressEvent, RenderContext, RunOptions, SourceFile, TranslationOutcome,
    clear_translation_cache, output_filename, render,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatOption {
    Txt,
    Html,
    Pdf,
    Docx,
}

impl From<FormatOption> for OutputFormat {
    fn from(opt: FormatOption) -> Self {
        match opt {
            FormatOption::Txt => Self::Txt,
            FormatOption::Html => Self::Html,
            FormatOption::Pdf => Self::Pdf,
            FormatOption::Docx => Self::Docx,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "doc-translate")]
#[command(author, version, about = "Translate PDF, Word and image documents", long_about = None)]
struct Args {
    /// Input document (PDF, DOCX, DOC, JPEG, PNG, WebP or GIF)
    #[arg(required_unless_present = "clear_cache")]
    input: Option<PathBuf>,

    /// Output file; with several formats only its stem and directory are used
    /// (default: <input>_translated.<ext> next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (repeatable)
    #[arg(short, long = "format", value_enum, default_values_t = vec![FormatOption::Txt])]
    formats: Vec<FormatOption>,

    /// Target language code
    #[arg(short = 't', long)]
    target: Option<String>,

    /// Preserve document structure as markdown
    #[arg(long)]
    high_fidelity: bool,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_BASE")]
    api_base: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Pages per request (default: chosen from file size and page count)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Attempts per chunk
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay before retrying a failed chunk
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Delay between chunks
    #[arg(long)]
    chunk_delay_ms: Option<u64>,

    /// Double the retry delay after each failed attempt
    #[arg(long)]
    exponential_backoff: bool,

    /// Disable caching
    #[arg(long)]
    no_cache: bool,

    /// Clear the chunk cache and exit
    #[arg(long)]
    clear_cache: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(target) = &self.target {
            config.target_lang = Lang::new(target);
        }
        if self.high_fidelity {
            config.high_fidelity = true;
        }
        if let Some(api_base) = &self.api_base {
            config.translator.api_base.clone_from(api_base);
        }
        if self.api_key.is_some() {
            config.translator.api_key.clone_from(&self.api_key);
        }
        if let Some(model) = &self.model {
            config.translator.model.clone_from(model);
        }
        if self.chunk_size.is_some() {
            config.pipeline.chunk_size = self.chunk_size;
        }
        if let Some(max_retries) = self.max_retries {
            config.pipeline.max_retries = max_retries;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.pipeline.retry_delay_ms = delay;
        }
        if let Some(delay) = self.chunk_delay_ms {
            config.pipeline.chunk_delay_ms = delay;
        }
        if self.exponential_backoff {
            config.pipeline.backoff = BackoffKind::Exponential;
        }
        if self.no_cache {
            config.cache.memory_enabled = false;
            config.cache.disk_enabled = false;
        }
    }

    /// Requested formats in first-mention order, each once.
    fn output_formats(&self) -> Vec<OutputFormat> {
        let mut formats: Vec<OutputFormat> = Vec::with_capacity(self.formats.len());
        for format in self.formats.iter().map(|&f| OutputFormat::from(f)) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        formats
    }
}

/// Where to write one format.
fn output_path(input: &Path, output: Option<&Path>, format: OutputFormat, single: bool) -> PathBuf {
    match output {
        Some(path) if single => path.to_path_buf(),
        Some(path) => path.with_extension(format.extension()),
        None => {
            let name = input
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("document");
            input.with_file_name(output_filename(name, format))
        }
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

#[allow(clippy::print_stdout)]
fn print_summary(outcome: &TranslationOutcome, written: &[PathBuf]) {
    println!(
        "Translated {}/{} pages in {}/{} chunks ({} words, {} characters)",
        outcome.pages_processed,
        outcome.total_pages,
        outcome.successful_chunks,
        outcome.chunks_processed,
        outcome.word_count,
        outcome.char_count
    );
    if !outcome.failed_ranges.is_empty() {
        let ranges: Vec<String> = outcome.failed_ranges.iter().map(ToString::to_string).collect();
        println!("Not translated: {}", ranges.join(", "));
    }
    for path in written {
        println!("Saved: {}", path.display());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if args.clear_cache {
        let cleared = clear_translation_cache().context("Failed to clear cache")?;
        #[allow(clippy::print_stdout)]
        {
            println!("Cleared {cleared} cached chunk translations");
        }
        if args.input.is_none() {
            return Ok(());
        }
    }

    let Some(input) = args.input.clone() else {
        anyhow::bail!("No input file given");
    };

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    args.apply(&mut config);

    let target = config.target_lang.clone();
    let high_fidelity = config.high_fidelity;
    let translator = DocumentTranslator::new(config).context("Failed to initialize translator")?;

    info!("Loading document: {}", input.display());
    let file = SourceFile::from_path(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document = translator
        .load(file)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current request");
            on_interrupt.cancel();
        }
    });

    let pb = progress_bar();
    let progress_pb = pb.clone();
    let options = RunOptions {
        progress: Some(Arc::new(move |event: &ProgressEvent| {
            progress_pb.set_length(event.total_chunks as u64);
            progress_pb.set_position(event.chunk_index as u64);
            progress_pb.set_message(format!(
                "({}/{} pages)",
                event.pages_processed, event.total_pages
            ));
        })),
        cancel: Some(cancel),
    };

    let result = translator
        .translate_source(&document, &target, high_fidelity, options)
        .await;
    pb.finish_and_clear();
    let outcome = result.context("Translation failed")?;

    let title = document.title();
    let metadata = document.metadata();
    let ctx = RenderContext {
        title: &title,
        metadata: &metadata,
        target: &target,
    };

    let formats = args.output_formats();
    let single = formats.len() == 1;

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let bytes = render(format, &outcome, &ctx)
            .with_context(|| format!("Failed to render {format} output"))?;
        let path = output_path(&input, args.output.as_deref(), format, single);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
        written.push(path);
    }

    print_summary(&outcome, &written);
    Ok(())
}
