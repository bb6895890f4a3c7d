//! coinrank CLI — merge, clean, ranking and inventory commands.
//!
//! Commands:
//! - `merge` — rank every `<symbol>-usd-max.csv` file and write one merged CSV
//! - `clean` — filter the ranking snapshot by completeness and cutoff date
//! - `ranking` — fetch and print the resolved ranking without merging
//! - `inventory` — list discovered asset files (no network)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use coinrank_core::data::{
    list_asset_files, resolve_ranking, CoinGeckoApiSource, CoinGeckoWebSource, HttpFetcher,
    RankingSource, StdoutProgress,
};
use coinrank_core::domain::PLACEHOLDER_RANK;
use coinrank_runner::{clean_snapshot, run_merge, MergeReport, PipelineConfig, SchemaPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "coinrank",
    about = "coinrank — merge per-coin CoinGecko history with market-cap ranks"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply to anything it omits.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge all asset files with the CoinGecko ranking into one CSV.
    Merge {
        /// Directory holding `<symbol>-usd-max.csv` files.
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Merged CSV path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output columns: first-file or union.
        #[arg(long)]
        schema: Option<SchemaPolicy>,

        /// Fail instead of scraping the website when the API is unavailable.
        #[arg(long, default_value_t = false)]
        no_fallback: bool,
    },
    /// Drop incomplete and pre-cutoff rows from the ranking snapshot.
    Clean {
        /// Snapshot CSV to read.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Cleaned CSV path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// First date kept (YYYY-MM-DD).
        #[arg(long)]
        cutoff: Option<String>,
    },
    /// Fetch the ranking and print the top entries.
    Ranking {
        /// Number of entries to print.
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Fail instead of scraping the website when the API is unavailable.
        #[arg(long, default_value_t = false)]
        no_fallback: bool,
    },
    /// List asset files and the symbols derived from them.
    Inventory {
        /// Directory holding `<symbol>-usd-max.csv` files.
        #[arg(long)]
        raw_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Merge {
            raw_dir,
            output,
            schema,
            no_fallback,
        } => run_merge_cmd(config, raw_dir, output, schema, no_fallback),
        Commands::Clean {
            input,
            output,
            cutoff,
        } => run_clean_cmd(config, input, output, cutoff),
        Commands::Ranking { top, no_fallback } => run_ranking_cmd(config, top, no_fallback),
        Commands::Inventory { raw_dir } => run_inventory_cmd(config, raw_dir),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// One HTTP client shared by the API source and the web fallback.
struct Sources {
    fetcher: HttpFetcher,
}

impl Sources {
    fn new(config: &PipelineConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.ranking.timeout(), &config.ranking.user_agent)
            .context("failed to build HTTP client")?;
        Ok(Self { fetcher })
    }

    fn api(&self, config: &PipelineConfig) -> CoinGeckoApiSource<&HttpFetcher> {
        CoinGeckoApiSource::new(&self.fetcher, config.ranking.api_settings())
    }

    fn web(&self, config: &PipelineConfig) -> Result<CoinGeckoWebSource<&HttpFetcher>> {
        Ok(CoinGeckoWebSource::new(
            &self.fetcher,
            config.ranking.web_settings(),
        )?)
    }
}

fn run_merge_cmd(
    mut config: PipelineConfig,
    raw_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    schema: Option<SchemaPolicy>,
    no_fallback: bool,
) -> Result<()> {
    if let Some(dir) = raw_dir {
        config.paths.raw_dir = dir;
    }
    if let Some(path) = output {
        config.paths.merged_output = path;
    }
    if let Some(schema) = schema {
        config.merge.schema = schema;
    }
    if no_fallback {
        config.ranking.fallback_enabled = false;
    }

    let sources = Sources::new(&config)?;
    let primary = sources.api(&config);
    let web = sources.web(&config)?;
    let fallback: Option<&dyn RankingSource> = if config.ranking.fallback_enabled {
        Some(&web)
    } else {
        None
    };

    let report = run_merge(&config.merge_request(), &primary, fallback, &StdoutProgress)
        .context("merge failed")?;
    print_merge_summary(&report);
    Ok(())
}

fn run_clean_cmd(
    mut config: PipelineConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    cutoff: Option<String>,
) -> Result<()> {
    if let Some(path) = input {
        config.paths.snapshot_input = path;
    }
    if let Some(path) = output {
        config.paths.cleaned_output = path;
    }
    if let Some(date) = cutoff.as_deref() {
        config.clean.cutoff = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid --cutoff '{date}', expected YYYY-MM-DD"))?;
    }

    let report = clean_snapshot(
        &config.paths.snapshot_input,
        &config.paths.cleaned_output,
        config.clean.cutoff,
    )
    .context("snapshot cleaning failed")?;

    println!();
    println!("=== Snapshot Cleaned ===");
    println!("Input:            {}", config.paths.snapshot_input.display());
    println!("Output:           {}", config.paths.cleaned_output.display());
    println!("Cutoff:           {}", config.clean.cutoff);
    println!("Rows read:        {}", report.rows_read);
    println!("Dropped missing:  {}", report.dropped_missing);
    println!("Dropped (cutoff): {}", report.dropped_before_cutoff);
    println!("Rows written:     {}", report.rows_written);
    Ok(())
}

fn run_ranking_cmd(mut config: PipelineConfig, top: usize, no_fallback: bool) -> Result<()> {
    if no_fallback {
        config.ranking.fallback_enabled = false;
    }

    let sources = Sources::new(&config)?;
    let primary = sources.api(&config);
    let web = sources.web(&config)?;
    let fallback: Option<&dyn RankingSource> = if config.ranking.fallback_enabled {
        Some(&web)
    } else {
        None
    };

    let resolved = resolve_ranking(&primary, fallback, &StdoutProgress)?;

    println!();
    println!("Source: {} ({} coins)", resolved.origin, resolved.map.len());
    println!("{:>6}  {:<10} {:<28} {}", "Rank", "Symbol", "Name", "Id");
    println!("{}", "-".repeat(64));
    for coin in resolved.map.by_rank().into_iter().take(top) {
        println!(
            "{:>6}  {:<10} {:<28} {}",
            coin.coin_rank, coin.coin_symbol, coin.coin_name, coin.coin_id
        );
    }
    Ok(())
}

fn run_inventory_cmd(config: PipelineConfig, raw_dir: Option<PathBuf>) -> Result<()> {
    let dir = raw_dir.unwrap_or(config.paths.raw_dir);
    let files = list_asset_files(&dir, &config.merge.file_suffix)?;

    println!("Directory: {}", dir.display());
    println!("Files: {}", files.len());
    println!();
    println!("{:<10} {}", "Symbol", "File");
    println!("{}", "-".repeat(40));
    for file in &files {
        println!("{:<10} {}", file.symbol, file.file_name);
    }
    Ok(())
}

fn print_merge_summary(report: &MergeReport) {
    println!();
    println!("=== Merge Complete ===");
    println!("Output:          {}", report.output_path.display());
    println!("Files merged:    {}", report.input_files);
    println!("Rows written:    {}", report.rows_written);
    println!(
        "Ranking source:  {} ({} coins)",
        report.ranking_origin, report.ranking_size
    );
    println!("Dataset hash:    {}", report.dataset_hash);

    if report.unmatched.is_empty() {
        println!("All files matched a ranked coin.");
    } else {
        println!();
        println!(
            "WARNING: {} file(s) had no ranking entry (rank {PLACEHOLDER_RANK}):",
            report.unmatched.len()
        );
        for name in &report.unmatched {
            println!("  {name}");
        }
    }
}
