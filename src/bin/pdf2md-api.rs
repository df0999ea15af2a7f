//! Server binary for pdf2md-api.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ParserConfig` / `ServerConfig` and runs the HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2md_api::{AppState, ImageMode, OutputMode, ParserConfig, ServerConfig, VisionParser};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  POST /parse   multipart field "file": a .pdf, .jpg, .jpeg or .png upload
  GET  /        service description

ENVIRONMENT:
  GEMINI_API_KEY    credential for the default gemini provider
                    (OPENAI_API_KEY, ANTHROPIC_API_KEY, … for other providers)
  PDFIUM_LIB_PATH   path to libpdfium; otherwise the system library is used
  RUST_LOG          log filter, e.g. RUST_LOG=pdf2md_api=debug
  A .env file in the working directory is loaded at startup.

EXAMPLES:
  pdf2md-api
  pdf2md-api --bind 127.0.0.1:9000 --output-mode summary --output-dir ./output
  curl -F file=@scan.png http://localhost:8000/parse -o scan.md
"#;

/// Convert uploaded PDFs and images to Markdown using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-api",
    version,
    about = "HTTP service converting PDFs and images to Markdown using Vision LLMs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "PDF2MD_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// How /parse returns results: download or summary.
    #[arg(long, env = "PDF2MD_OUTPUT_MODE", value_enum, default_value = "download")]
    output_mode: OutputModeArg,

    /// Directory for saved markdown in summary mode.
    #[arg(long, env = "PDF2MD_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Directory for request temp files (default: OS temp dir).
    #[arg(long, env = "PDF2MD_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Maximum upload size in MiB.
    #[arg(long, env = "PDF2MD_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: usize,

    /// LLM provider: gemini, openai, anthropic, ollama, azure, …
    #[arg(long, env = "PDF2MD_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Vision model ID.
    #[arg(long, env = "PDF2MD_MODEL", default_value = "gemini-1.5-flash")]
    model: String,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2MD_TEMPERATURE", default_value_t = 0.9)]
    temperature: f32,

    /// Nucleus sampling threshold (0.0–1.0).
    #[arg(long, env = "PDF2MD_TOP_P", default_value_t = 0.4)]
    top_p: f32,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDF2MD_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// How page images are sent: url or base64.
    #[arg(long, env = "PDF2MD_IMAGE_MODE", value_enum, default_value = "url")]
    image_mode: ImageModeArg,

    /// Ask only for text and structure, without tables, formulas and figures.
    #[arg(long, env = "PDF2MD_BASIC_EXTRACTION")]
    basic_extraction: bool,

    /// Longest edge of a rendered page in pixels.
    #[arg(long, env = "PDF2MD_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Number of concurrent VLM calls per document.
    #[arg(short, long, env = "PDF2MD_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2MD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputModeArg {
    Download,
    Summary,
}

impl From<OutputModeArg> for OutputMode {
    fn from(v: OutputModeArg) -> Self {
        match v {
            OutputModeArg::Download => OutputMode::Download,
            OutputModeArg::Summary => OutputMode::Summary,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ImageModeArg {
    Url,
    Base64,
}

impl From<ImageModeArg> for ImageMode {
    fn from(v: ImageModeArg) -> Self {
        match v {
            ImageModeArg::Url => ImageMode::Url,
            ImageModeArg::Base64 => ImageMode::Base64,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so .env values feed the clap env fallbacks.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let parser_config = build_parser_config(&cli).await?;
    info!(
        "Parser: provider={} model={} image_mode={:?} detailed={}",
        parser_config.provider_name,
        parser_config.model,
        parser_config.image_mode,
        parser_config.detailed_extraction
    );

    let mut server = ServerConfig::builder()
        .bind_addr(cli.bind)
        .output_mode(cli.output_mode.clone().into())
        .output_dir(cli.output_dir.clone())
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));
    if let Some(ref dir) = cli.temp_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create temp dir: {}", dir.display()))?;
        server = server.temp_dir(dir.clone());
    }
    let server_config = server.build();

    let state = AppState::new(Arc::new(VisionParser::new(parser_config)), server_config);
    pdf2md_api::serve(state)
        .await
        .with_context(|| format!("Server on {} failed", cli.bind))?;
    Ok(())
}

async fn build_parser_config(cli: &Cli) -> Result<ParserConfig> {
    let mut builder = ParserConfig::builder()
        .provider_name(cli.provider.clone())
        .model(cli.model.clone())
        .temperature(cli.temperature)
        .top_p(cli.top_p)
        .max_output_tokens(cli.max_tokens)
        .image_mode(cli.image_mode.clone().into())
        .detailed_extraction(!cli.basic_extraction)
        .max_rendered_pixels(cli.max_pixels)
        .concurrency(cli.concurrency);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt file: {}", path.display()))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid parser configuration")
}
