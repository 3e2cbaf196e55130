// ABOUTME: CLI for scraping articles and listing pages published by Brazilian government sites.
// ABOUTME: Fetches pages (optionally through a disk cache), runs the extractors and prints JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use brinfo_scrape::{
    loader, ArticleRecord, Clock, ContentSourceRegistry, ExtractionContext, Extractor,
    FetchOptions, Fetcher, ListingScraper, Scrape, ScraperBuilder, SystemClock,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_CACHE_DIR: &str = ".brinfo-cache";
const DEFAULT_URL_EXTRACTOR: &str = "a[href] | href";

#[derive(Parser, Debug)]
#[command(name = "brinfo")]
#[command(about = "Scrape content published by government institutions from Brazil")]
struct Cli {
    /// Keep fetched pages on disk and reuse them on later runs
    #[arg(long, global = true)]
    use_cache: bool,

    /// Directory for cached pages
    #[arg(long, global = true, env = "BRINFO_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// User agent sent with every request
    #[arg(long, global = true, env = "BRINFO_USER_AGENT")]
    user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 5)]
    timeout: u64,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a single article and print it as JSON
    Article {
        url: String,

        /// Identifier of the source the article belongs to
        #[arg(short, long)]
        source_guid: String,

        /// JSON merged over the scraped article
        #[arg(short, long)]
        merge_with: Option<String>,

        /// Extra JSON object printed alongside the article
        #[arg(short, long)]
        extra_data: Option<String>,

        #[command(flatten)]
        extractors: ExtractorArgs,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },
    /// Scrape an article and report ingestion problems without failing
    Inspect {
        url: String,

        #[command(flatten)]
        extractors: ExtractorArgs,
    },
    /// Run the article pipeline on a local HTML file
    InspectFile {
        file: PathBuf,
        url: String,

        #[command(flatten)]
        extractors: ExtractorArgs,
    },
    /// Scrape the article links of a listing page
    Listing {
        url: String,

        /// Selector of the element wrapping each link
        #[arg(short = 'l', long)]
        link_container: String,

        /// Extractor for the link URL, relative to the container
        #[arg(short = 'u', long, default_value = DEFAULT_URL_EXTRACTOR)]
        url_extractor: String,

        #[arg(short = 'p', long)]
        published_at_extractor: Option<String>,

        #[arg(short = 'i', long)]
        image_url_extractor: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ExtractorArgs {
    /// JSON config of extractors appended after the default ones
    #[arg(long)]
    custom_extractors: Option<String>,

    /// JSON file of content sources with per-host extractors
    #[arg(long, env = "BRINFO_SOURCES")]
    sources: Option<PathBuf>,
}

impl ExtractorArgs {
    /// Per-host extractors from the sources file, then the inline custom ones.
    fn compile(&self, url: &str) -> Result<Vec<Extractor>> {
        let mut extractors = Vec::new();
        if let Some(path) = &self.sources {
            let registry = ContentSourceRegistry::load_file(path)?;
            if let Some(source) = registry.for_url(url) {
                tracing::info!(source = %source.id, "using content source extractors");
                extractors.extend(source.extractors.iter().cloned());
            }
        }
        if let Some(json) = &self.custom_extractors {
            extractors.extend(loader::from_json(json).context("invalid --custom-extractors")?);
        }
        Ok(extractors)
    }
}

#[derive(Serialize)]
struct ArticlePayload<'a> {
    #[serde(flatten)]
    article: &'a ArticleRecord,
    key: String,
    source_guid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Serialize)]
struct InspectPayload<'a> {
    #[serde(flatten)]
    article: &'a ArticleRecord,
    problems: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fetcher(cli: &Cli) -> Result<Fetcher> {
    let mut opts = FetchOptions {
        timeout: Duration::from_secs(cli.timeout),
        cache_dir: cli.use_cache.then(|| cli.cache_dir.clone()),
        ..Default::default()
    };
    if let Some(ua) = &cli.user_agent {
        opts.user_agent = ua.clone();
    }
    Ok(Fetcher::new(opts)?)
}

fn scrape_url(cli: &Cli, url: &str, scraper: &impl Scrape) -> Result<ArticleRecord> {
    tracing::info!(url = %url, "scraping");
    let page = fetcher(cli)?.fetch(url)?;
    let mut ctx = ExtractionContext::new(url);
    if let Some(ct) = &page.content_type {
        ctx = ctx.with_content_type(ct.clone());
    }
    Ok(scraper.run_bytes(&page.body, &ctx)?)
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", out);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Article {
            url,
            source_guid,
            merge_with,
            extra_data,
            extractors,
            compact,
        } => {
            let merge_with = merge_with
                .as_deref()
                .map(|json| serde_json::from_str::<ArticleRecord>(json))
                .transpose()
                .context("invalid --merge-with")?;
            let extra = extra_data
                .as_deref()
                .map(|json| serde_json::from_str::<BTreeMap<String, serde_json::Value>>(json))
                .transpose()
                .context("invalid --extra-data")?;

            let mut builder = ScraperBuilder::new().extend_extractors(extractors.compile(url)?);
            if let Some(record) = merge_with {
                builder = builder.merge_with(record);
            }
            let record = scrape_url(&cli, url, &builder.build())?;

            let payload = ArticlePayload {
                article: &record,
                key: record.storage_key(source_guid),
                source_guid,
                extra,
            };
            print_json(&payload, *compact)?;

            if let Err(problems) = record.validate_for_ingestion(SystemClock.now()) {
                tracing::warn!(url = %url, problems = ?problems, "record failed ingestion validation");
                bail!("data is invalid for ingestion: {}", problems.join(", "));
            }
        }
        Command::Inspect { url, extractors } => {
            let scraper = ScraperBuilder::new()
                .extend_extractors(extractors.compile(url)?)
                .build();
            let record = scrape_url(&cli, url, &scraper)?;
            let problems = record
                .validate_for_ingestion(SystemClock.now())
                .err()
                .unwrap_or_default();
            if !problems.is_empty() {
                tracing::warn!(url = %url, problems = ?problems, "record failed ingestion validation");
            }
            print_json(
                &InspectPayload {
                    article: &record,
                    problems,
                },
                false,
            )?;
        }
        Command::InspectFile {
            file,
            url,
            extractors,
        } => {
            let body = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
            let scraper = ScraperBuilder::new()
                .extend_extractors(extractors.compile(url)?)
                .build();
            let record = scraper.run_bytes(&body, &ExtractionContext::new(url.clone()))?;
            print_json(&record, false)?;
        }
        Command::Listing {
            url,
            link_container,
            url_extractor,
            published_at_extractor,
            image_url_extractor,
        } => {
            let scraper = ListingScraper::from_specs(
                link_container,
                url_extractor,
                published_at_extractor.as_deref(),
                image_url_extractor.as_deref(),
            )
            .context("invalid listing extractors")?;

            tracing::info!(url = %url, "scraping listing");
            let page = fetcher(&cli)?.fetch(url)?;
            let links = scraper.run(&page.text(), &ExtractionContext::new(url.clone()))?;
            print_json(&links, false)?;
        }
    }

    Ok(())
}
