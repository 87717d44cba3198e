//! # Tripcost-fetch CLI
//!
//! Command-line interface for the tripcost-fetch library.
//! Refreshes the route cache and the fuel price file used by the trip cost estimator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{LevelFilter, error};
use tripcost_fetch::{
    BatchLimits, FuelSourceConfig, FuelType, MatrixServiceConfig, RouteRunOptions, describe_change,
};

mod cli;

/// Command-line interface for tripcost-fetch
#[derive(Parser)]
#[command(name = "tripcost-fetch")]
#[command(about = "Fetches route distances and fuel prices for the trip cost estimator")]
#[command(long_about = "Refreshes the data files used by the trip cost estimator:
  tripcost-fetch routes            # Build data/routes_cache.json from data/locations.json
  tripcost-fetch routes --dry-run  # Show the request plan without calling the service
  tripcost-fetch fuel              # Scrape current prices into data/fuel_prices.json

The routes command requires the GOOGLE_API_KEY environment variable.")]
#[command(version = env!("TRIPCOST_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch distances and durations for every ordered pair of locations
    Routes(RoutesArgs),
    /// Scrape current fuel prices
    Fuel(FuelArgs),
}

#[derive(Args)]
struct RoutesArgs {
    /// Location registry (JSON list of id/name/latitude/longitude)
    #[arg(long, default_value = "data/locations.json")]
    locations: PathBuf,

    /// Route cache to write
    #[arg(long, default_value = "data/routes_cache.json")]
    output: PathBuf,

    /// Maximum origins or destinations per request
    #[arg(long, default_value_t = 25)]
    max_dimension: usize,

    /// Maximum origin × destination elements per request
    #[arg(long, default_value_t = 100)]
    max_elements: usize,

    /// Pause after every request, in milliseconds
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// Print the request plan without calling the service
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct FuelArgs {
    /// Price file to write
    #[arg(long, default_value = "data/fuel_prices.json")]
    output: PathBuf,

    /// Pricing page to scrape
    #[arg(long, default_value = "https://naftas.com.ar")]
    url: String,

    /// Scrape and print prices without saving them
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Command::Routes(args) => args.verbose,
        Command::Fuel(args) => args.verbose,
    };
    init_logging(verbose);

    if verbose {
        eprintln!("🚗 Tripcost-fetch v{} starting...", env!("TRIPCOST_VERSION"));
    }

    match cli.command {
        Command::Routes(args) => routes(args).await,
        Command::Fuel(args) => fuel(args).await,
    }
}

/// Initialize logging to stderr; `RUST_LOG` takes precedence over the default level
fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_target(false)
        .init();
}

fn batch_limits(args: &RoutesArgs) -> BatchLimits {
    BatchLimits {
        max_dimension: args.max_dimension,
        max_elements: args.max_elements,
    }
}

async fn routes(args: RoutesArgs) -> anyhow::Result<()> {
    if args.dry_run {
        return show_plan(&args);
    }

    let service = MatrixServiceConfig::from_env()?;

    eprintln!("{}", "=".repeat(60));
    eprintln!("Route cache generation");
    eprintln!("{}", "=".repeat(60));

    // Sized by the first progress callback
    let progress_manager = cli::ProgressManager::new(
        0,
        &format!("🌐 Querying routes for {}", args.locations.display()),
    );

    let options = RouteRunOptions {
        limits: batch_limits(&args),
        pacing: Duration::from_millis(args.delay_ms),
        progress: Some(progress_manager.callback()),
        ..Default::default()
    };

    let summary =
        tripcost_fetch::generate_routes(&args.locations, &args.output, service, options)
            .await
            .with_context(|| format!("generating route cache {}", args.output.display()))?;

    eprintln!();
    eprintln!("{}", "=".repeat(60));
    eprintln!("✅ Routes saved to: {}", args.output.display());
    eprintln!("{summary}");
    eprintln!("{}", "=".repeat(60));

    Ok(())
}

/// Print the sub-query plan without touching the network
fn show_plan(args: &RoutesArgs) -> anyhow::Result<()> {
    let locations = tripcost_fetch::load_locations(&args.locations)
        .with_context(|| format!("reading locations from {}", args.locations.display()))?;
    let chunk_size = batch_limits(args).chunk_size()?;
    let plan = tripcost_fetch::plan_subqueries(&locations, chunk_size)?;

    eprintln!(
        "🔍 [DRY RUN] {} locations, chunk size {chunk_size}, {} requests",
        locations.len(),
        plan.len()
    );
    for subquery in &plan {
        eprintln!(
            "  Request {}: {} ({} elements)",
            subquery.index + 1,
            subquery.describe(),
            subquery.element_count()
        );
    }
    eprintln!("  Would write: {}", args.output.display());

    Ok(())
}

async fn fuel(args: FuelArgs) -> anyhow::Result<()> {
    eprintln!("{}", "=".repeat(60));
    eprintln!("Fuel price update");
    eprintln!("{}", "=".repeat(60));

    let config = FuelSourceConfig {
        page_url: args.url.clone(),
        ..Default::default()
    };

    if args.dry_run {
        let previous = tripcost_fetch::load_fuel_prices(&args.output)?;
        let prices = tripcost_fetch::scrape_fuel_prices(config).await?;
        print_prices(&prices, previous.as_ref(), &args.output);
        eprintln!("🔍 [DRY RUN] Not saving {}", args.output.display());
        return Ok(());
    }

    let update = tripcost_fetch::update_fuel_prices(&args.output, config)
        .await
        .with_context(|| format!("updating {}", args.output.display()))?;

    print_prices(&update.prices, update.previous.as_ref(), &args.output);
    eprintln!("✅ Prices saved to: {}", args.output.display());
    eprintln!("   Updated: {}", update.written.last_updated);

    Ok(())
}

fn print_prices(
    prices: &tripcost_fetch::FuelPrices,
    previous: Option<&tripcost_fetch::FuelPriceFile>,
    output: &Path,
) {
    eprintln!();
    eprintln!("Current prices:");
    for fuel in FuelType::ALL {
        let current = prices.get(fuel);
        let change = describe_change(previous.and_then(|file| file.price(fuel)), current);
        eprintln!("  {:<16} ${current:.0}{change}", fuel.code());
    }
    if previous.is_none() {
        eprintln!("  (no previous prices in {})", output.display());
    }
}
