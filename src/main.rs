//! # quill CLI
//!
//! Command-line front end for the crawl, keyword and article pipeline.
//!
//! ## Subcommands
//!
//! - `crawl`: crawl a site and print the collected text
//! - `generate`: crawl, extract keywords, and write an article for each
//! - `serve`: serve the web form front end
//!
//! Model settings and the API key come from the environment; see
//! `quill::config`.

mod telemetry;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use quill::config::QuillConfig;
use quill::crawler::{CrawlerConfig, DEFAULT_MAX_PAGES, SiteCrawler};
use quill::openai::Client;
use quill::pipeline::{ArticleReport, Pipeline, PipelineConfig, RunEvent};
use quill::ratelimit::{Backoff, DEFAULT_MAX_RETRY_DELAY, RetryPolicy};
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Crawl a website and draft an article for each of its keywords", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a website and print the collected text
    Crawl(CrawlArgs),

    /// Crawl a website, extract keywords and generate articles
    Generate(GenerateArgs),

    /// Serve the web form
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URL to start from
    #[arg(required = true)]
    url: String,

    /// Maximum number of pages to visit
    #[arg(short = 'p', long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    /// Token budget for collected text (default: context window - 100)
    #[arg(short, long)]
    token_budget: Option<usize>,

    /// Per-request timeout in seconds (default: none)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct RetryArgs {
    /// Give up on an article after this many rate-limited retries (default: never)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Seconds to wait before retrying a rate-limited call
    #[arg(long, default_value_t = 60)]
    retry_delay: u64,

    /// Double the retry delay after each attempt, up to 15 minutes
    #[arg(long)]
    exponential_backoff: bool,
}

impl RetryArgs {
    fn policy(&self) -> RetryPolicy {
        let delay = Duration::from_secs(self.retry_delay);
        let backoff = if self.exponential_backoff {
            Backoff::Exponential {
                base: delay,
                max: DEFAULT_MAX_RETRY_DELAY.max(delay),
            }
        } else {
            Backoff::Fixed(delay)
        };

        match self.max_retries {
            Some(max_retries) => RetryPolicy::bounded(max_retries, backoff),
            None => RetryPolicy::unbounded(backoff),
        }
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// URL to start from
    #[arg(required = true)]
    url: String,

    /// Maximum number of pages to visit
    #[arg(short = 'p', long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    /// Token budget for collected text (default: context window - 100)
    #[arg(short, long)]
    token_budget: Option<usize>,

    /// Strip brackets, quotes and blanks from the extracted keywords
    #[arg(long)]
    trim_keywords: bool,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    retry: RetryArgs,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = quill::server::DEFAULT_ADDR)]
    addr: SocketAddr,

    /// Maximum number of pages to visit per submission
    #[arg(short = 'p', long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    #[command(flatten)]
    retry: RetryArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber();

    match cli.command {
        Some(Commands::Crawl(args)) => crawl_command(args).await?,
        Some(Commands::Generate(args)) => generate_command(args).await?,
        Some(Commands::Serve(args)) => serve_command(args).await?,
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["quill", "--help"]);
        }
    }

    Ok(())
}

fn load_config() -> anyhow::Result<QuillConfig> {
    QuillConfig::from_env().context("failed to load configuration")
}

fn pipeline(
    config: &QuillConfig,
    pipeline_config: PipelineConfig,
    retry: &RetryArgs,
) -> anyhow::Result<Pipeline<Client>> {
    let client = Client::from_config(config)?;
    let pipeline =
        Pipeline::new(client, config, pipeline_config).context("failed to build pipeline")?;
    Ok(pipeline.with_retry_policy(retry.policy()))
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let token_budget = match args.token_budget {
        Some(budget) => budget,
        None => CrawlerConfig::default().token_budget,
    };

    let mut builder = CrawlerConfig::builder()
        .max_pages(args.max_pages)
        .token_budget(token_budget);
    if let Some(secs) = args.timeout {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }
    let config = builder.build();

    println!("Crawling {}...", args.url);
    let outcome = SiteCrawler::new(config)?
        .crawl(&args.url)
        .await
        .with_context(|| format!("failed to crawl {}", args.url))?;

    println!("{}", outcome.text);
    println!();
    println!(
        "Visited {} pages, collected ~{} tokens{}",
        outcome.pages_visited.len(),
        outcome.estimated_tokens,
        if outcome.budget_exhausted {
            " (budget reached)"
        } else {
            ""
        }
    );
    for url in &outcome.pages_visited {
        println!("  {}", url);
    }

    Ok(())
}

#[instrument]
async fn generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let config = load_config()?;
    let mut pipeline_config = PipelineConfig::from_quill_config(&config)
        .max_pages(args.max_pages)
        .trim_keywords(args.trim_keywords);
    if let Some(budget) = args.token_budget {
        pipeline_config = pipeline_config.token_budget(budget);
    }
    let pipeline = pipeline(&config, pipeline_config, &args.retry)?;

    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
        .progress_chars("##-");
    let mut progress_bar: Option<ProgressBar> = None;

    eprintln!("Crawling {}...", args.url);
    let report = pipeline
        .run_with_progress(&args.url, |event| match event {
            RunEvent::Crawled(outcome) => eprintln!(
                "Visited {} pages, collected ~{} tokens",
                outcome.pages_visited.len(),
                outcome.estimated_tokens
            ),
            RunEvent::KeywordsExtracted(keywords) => {
                eprintln!("Extracted {} keywords", keywords.len());
                let bar = ProgressBar::new(keywords.len() as u64).with_style(style.clone());
                bar.set_message("Generating articles...");
                progress_bar = Some(bar);
            }
            RunEvent::ArticleWritten { keyword, .. } => {
                if let Some(bar) = &progress_bar {
                    bar.inc(1);
                    bar.set_message(format!("Wrote article for {}", keyword.trim()));
                }
            }
        })
        .await;
    if let Some(bar) = progress_bar {
        bar.finish_with_message("Articles generated");
    }

    if let Some(output_file) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(output_file, json)
            .await
            .with_context(|| format!("failed to write {}", output_file.display()))?;
        eprintln!("Saved report to {}", output_file.display());
    }

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ArticleReport) {
    println!("{}", report.first_article);

    for (keyword, article) in report.articles.iter().skip(1) {
        println!();
        println!("=== {} ===", keyword.trim());
        println!();
        if article.is_empty() {
            println!("(no article)");
        } else {
            println!("{}", article);
        }
    }
}

#[instrument]
async fn serve_command(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config()?;
    let pipeline = pipeline(
        &config,
        PipelineConfig::from_quill_config(&config).max_pages(args.max_pages),
        &args.retry,
    )?;

    quill::server::serve(pipeline, args.addr).await?;
    Ok(())
}
