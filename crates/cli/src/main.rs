mod echo;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use siphon_core::{
    BrowserSettings, ExtractionResult, ExtractionService, ReadabilityConfig, RetryPolicy, ServiceConfig,
};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::echo::{format_size, print_banner, print_extraction_summary, print_field, print_info, print_step, print_success};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for the extraction result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Html,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("Invalid format: {s}. Valid options: json, html, text")),
        }
    }
}

/// Extract structured article data from web pages
#[derive(Parser, Debug)]
#[command(name = "siphon")]
#[command(version)]
#[command(about = "Extract structured article data from web pages", long_about = None)]
struct Args {
    /// URL to render, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// URL reported for file or stdin input
    #[arg(long, value_name = "URL")]
    url: Option<Url>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (json, html, text)
    #[arg(short, long, default_value = "json", value_name = "FORMAT")]
    format: OutputFormat,

    /// Navigation timeout in seconds
    #[arg(long, default_value = "20", value_name = "SECS")]
    timeout: u64,

    /// Retries after the first failed attempt
    #[arg(long, default_value = "3", value_name = "NUM")]
    retries: u32,

    /// Chrome or Chromium binary (auto-detected by default)
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Text length below which a second, less aggressive pass is tried
    #[arg(long, default_value = "500", value_name = "NUM")]
    char_threshold: usize,

    /// Minimum score for the article body candidate
    #[arg(long, default_value = "10", value_name = "SCORE")]
    min_score: f64,

    /// Strip images from the extracted content
    #[arg(long)]
    no_images: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn is_remote(&self) -> bool {
        siphon_core::sanitize::is_http_url(&self.input)
    }

    fn readability_config(&self) -> ReadabilityConfig {
        ReadabilityConfig::builder()
            .char_threshold(self.char_threshold)
            .min_score(self.min_score)
            .preserve_images(!self.no_images)
            .build()
    }

    fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_concurrent: 1,
            retry: RetryPolicy::new(self.retries),
            browser: BrowserSettings {
                navigation_timeout: Duration::from_secs(self.timeout),
                chrome_executable: self.chrome_path.clone(),
                ..Default::default()
            },
            readability: self.readability_config(),
        }
    }
}

async fn extract_remote(args: &Args) -> anyhow::Result<ExtractionResult> {
    if args.verbose {
        print_step(1, 3, &format!("Rendering {}", args.input.bright_white().underline()));
        print_field("Timeout", &format!("{}s", args.timeout));
        print_field("Attempts", &RetryPolicy::new(args.retries).max_attempts().to_string());
    }

    let service = ExtractionService::with_browser(args.service_config());
    service
        .extract(&args.input)
        .await
        .with_context(|| format!("Failed to extract {}", args.input))
}

fn extract_local(args: &Args) -> anyhow::Result<ExtractionResult> {
    let html = if args.input == "-" {
        if args.verbose {
            print_step(1, 3, "Reading from stdin");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read from stdin")?;
        buffer
    } else {
        if args.verbose {
            print_step(1, 3, &format!("Reading from file {}", args.input.bright_white()));
        }
        fs::read_to_string(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?
    };

    if args.verbose {
        print_field("Size", &format_size(html.len()));
        print_step(2, 3, "Sanitizing and extracting");
    }

    let url = args.url.as_ref().map_or_else(|| args.input.clone(), Url::to_string);
    ExtractionService::with_browser(args.service_config())
        .extract_html(&html, &url, 200)
        .context("Failed to extract content")
}

fn render(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(result).context("Failed to serialize result")?,
        OutputFormat::Html => result.content.clone(),
        OutputFormat::Text => result.text_content.clone(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("siphon_core=debug"))
            .with_writer(io::stderr)
            .init();
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let result = if args.is_remote() { extract_remote(&args).await? } else { extract_local(&args)? };

    if args.verbose {
        print_extraction_summary(&result);
        print_step(3, 3, &format!("Writing {:?} output", args.format));
    }

    let output = render(&result, args.format)?;
    match &args.output {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{output}"),
    }

    Ok(())
}
