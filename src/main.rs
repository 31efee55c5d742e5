//! dytt-index main entry point
//!
//! This is the command-line interface for the dytt-index catalogue crawler.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use dytt_index::config::{load_config_with_hash, Config};
use dytt_index::crawler::{repair, Coordinator, CrawlSummary, EventSink, Fetcher, NullSink};
use dytt_index::output::{
    load_statistics, print_download_links, print_search_results, print_statistics, ConsoleSink,
    ProgressFormat,
};
use dytt_index::storage::{open_storage, ItemQuery, SortColumn, SortDirection, SqliteStorage};
use dytt_index::Storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// dytt-index: a resumable catalogue crawler
///
/// dytt-index crawls the dytt movie catalogue across its mirrors, extracts
/// structured records from its detail pages and keeps them in SQLite.
#[derive(Parser, Debug)]
#[command(name = "dytt-index")]
#[command(version)]
#[command(about = "A resumable movie catalogue crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the database path from the configuration
    #[arg(long, value_name = "PATH", global = true)]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the catalogue and store its items
    Crawl(CrawlArgs),

    /// Walk list pages only, without fetching detail pages
    Probe {
        /// Page to start from (defaults to the resolved mirror)
        #[arg(long)]
        start_url: Option<String>,

        /// Maximum number of list pages to fetch
        #[arg(long, default_value_t = 5)]
        pages: usize,
    },

    /// Search stored items
    Search(SearchArgs),

    /// Re-run extraction over stored items
    Repair {
        /// Only repair items of this kind ("movie" covers every movie bucket)
        #[arg(long)]
        only_kind: Option<String>,

        /// Maximum number of items to repair (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },

    /// Show catalogue statistics
    Stats {
        /// Restrict event counts to one session
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Create the database schema
    InitDb {
        /// Drop every table first
        #[arg(long)]
        drop: bool,
    },
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Page to start from (defaults to the resolved mirror)
    start_url: Option<String>,

    /// Maximum number of list pages to fetch
    #[arg(long)]
    max_pages: Option<usize>,

    /// Maximum number of items to save (0 disables detail fetching)
    #[arg(long)]
    max_items: Option<usize>,

    /// Session id; a later run with the same id resumes
    #[arg(long)]
    session_id: Option<String>,

    /// Print progress as JSON lines
    #[arg(long)]
    json: bool,

    /// Walk every configured catalogue section
    #[arg(long, conflicts_with = "start_url")]
    sections: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Substring of the title
    #[arg(long)]
    title: Option<String>,

    /// Substring of any text column
    #[arg(short, long)]
    keyword: Option<String>,

    /// Kind (movie, movie_cn, tv, variety, anime, documentary, ...)
    #[arg(long)]
    kind: Option<String>,

    #[arg(long)]
    country: Option<String>,

    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    director: Option<String>,

    #[arg(long)]
    actor: Option<String>,

    /// Rating source (douban or imdb)
    #[arg(long)]
    rating_source: Option<String>,

    /// Minimum rating
    #[arg(long)]
    min_rating: Option<f64>,

    #[arg(long)]
    year_from: Option<i32>,

    #[arg(long)]
    year_to: Option<i32>,

    /// Required tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long, default_value_t = 20)]
    limit: usize,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Sort column: updated_at, created_at, year, rating, title, id
    #[arg(long, default_value = "updated_at")]
    sort: String,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "desc")]
    order: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };
    if let Some(database) = &cli.database {
        config.output.database_path = database.display().to_string();
    }

    match cli.command {
        Command::Crawl(args) => handle_crawl(config, config_hash, args, cli.quiet).await,
        Command::Probe { start_url, pages } => handle_probe(config, start_url, pages).await,
        Command::Search(args) => handle_search(&config, args),
        Command::Repair { only_kind, limit } => {
            handle_repair(&config, only_kind.as_deref(), limit).await
        }
        Command::Stats { session_id } => handle_stats(&config, session_id.as_deref()),
        Command::InitDb { drop } => handle_init_db(&config, drop),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dytt_index=info,warn"),
            1 => EnvFilter::new("dytt_index=debug,info"),
            2 => EnvFilter::new("dytt_index=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    open_storage(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Stops the coordinator on Ctrl-C
fn stop_on_ctrl_c(coordinator: &Coordinator) {
    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current request");
            stop.stop();
        }
    });
}

fn print_summary(summary: &CrawlSummary) {
    println!(
        "\n页面 {} | 条目 {} | 非详情 {} | 错误 {}",
        summary.pages, summary.items, summary.not_detail, summary.errors
    );
}

/// Handles the crawl command
async fn handle_crawl(
    mut config: Config,
    config_hash: Option<String>,
    args: CrawlArgs,
    quiet: bool,
) -> anyhow::Result<()> {
    if let Some(max_pages) = args.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if let Some(max_items) = args.max_items {
        config.crawl.max_items = max_items;
    }
    if args.session_id.is_some() {
        config.crawl.session_id = args.session_id;
    }
    if config.crawl.max_pages == 0 {
        bail!("--max-pages must be at least 1");
    }

    let mut storage = open_database(&config)?;
    if let (Some(id), Some(hash)) = (&config.crawl.session_id, &config_hash) {
        let ids: Vec<String> = if args.sections {
            config
                .crawl
                .sections
                .iter()
                .map(|section| format!("{}/{}", id, section.name))
                .collect()
        } else {
            vec![id.clone()]
        };
        for id in ids {
            let session = storage.ensure_session(Some(&id))?;
            storage.set_session_notes(&session, &format!("config sha256 {}", hash))?;
        }
    }

    let format = if args.json {
        ProgressFormat::Json
    } else {
        ProgressFormat::Human
    };
    let sink: Box<dyn EventSink> = if quiet {
        Box::new(NullSink)
    } else {
        Box::new(ConsoleSink::new(format))
    };

    let mut coordinator = Coordinator::new(config, storage, sink)?;
    stop_on_ctrl_c(&coordinator);

    let summary = if args.sections {
        coordinator.run_sections().await
    } else {
        coordinator.run(args.start_url.as_deref()).await
    }
    .context("Crawl failed")?;

    if !args.json {
        print_summary(&summary);
    }
    Ok(())
}

/// Handles the probe command: list pages only, nothing persisted
async fn handle_probe(
    mut config: Config,
    start_url: Option<String>,
    pages: usize,
) -> anyhow::Result<()> {
    if pages == 0 {
        bail!("--pages must be at least 1");
    }
    config.crawl.max_pages = pages;
    config.crawl.max_items = 0;
    config.crawl.session_id = None;

    let storage = open_database(&config)?;
    let mut coordinator =
        Coordinator::new(config, storage, Box::new(ConsoleSink::new(ProgressFormat::Human)))?;
    stop_on_ctrl_c(&coordinator);

    let summary = coordinator
        .run(start_url.as_deref())
        .await
        .context("Probe failed")?;
    print_summary(&summary);
    Ok(())
}

/// Handles the search command
fn handle_search(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let sort = match SortColumn::parse(&args.sort) {
        Some(sort) => sort,
        None => bail!("Unknown sort column: {}", args.sort),
    };

    let query = ItemQuery {
        title: args.title,
        keyword: args.keyword,
        kind: args.kind,
        country: args.country,
        language: args.language,
        director: args.director,
        actors: args.actor,
        rating_source: args.rating_source,
        rating_min: args.min_rating,
        year_from: args.year_from,
        year_to: args.year_to,
        tags: args.tags,
        limit: args.limit,
        offset: args.offset,
        sort,
        direction: SortDirection::parse(&args.order),
    };

    let storage = open_database(config)?;
    let total = storage.count_items(&query)?;
    let items = storage.search_items(&query)?;
    print_search_results(&items, total);

    if let Some(first) = items.first() {
        let links = storage.get_download_links(first.id)?;
        print_download_links(&first.title, &links);
    }
    Ok(())
}

/// Handles the repair command
async fn handle_repair(config: &Config, kind: Option<&str>, limit: usize) -> anyhow::Result<()> {
    let mut storage = open_database(config)?;
    let fetcher = Fetcher::new(&config.fetch)?;
    let limit = (limit > 0).then_some(limit);

    let summary = repair(&mut storage, &fetcher, kind, limit)
        .await
        .context("Repair failed")?;
    println!(
        "修复 {} | 重新抓取 {} | 失败 {}",
        summary.repaired, summary.refetched, summary.failed
    );
    Ok(())
}

/// Handles the stats command
fn handle_stats(config: &Config, session_id: Option<&str>) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);
    let storage = open_database(config)?;
    let stats = load_statistics(&storage, session_id)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the init-db command
fn handle_init_db(config: &Config, drop: bool) -> anyhow::Result<()> {
    let mut storage = open_database(config)?;
    if drop {
        storage.reset()?;
        println!("✓ Dropped and recreated schema in {}", config.output.database_path);
    } else {
        println!("✓ Schema ready in {}", config.output.database_path);
    }
    Ok(())
}
