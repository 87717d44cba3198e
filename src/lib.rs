//! # Tripcost-fetch Library
//!
//! Populates the two derived datasets used by the trip cost estimator:
//!
//! - **Route cache**: road distance and duration for every ordered pair of
//!   known locations, fetched from a bulk distance-matrix service in
//!   size-limited batches
//! - **Fuel prices**: current prices for three fuel types, scraped from a
//!   public pricing page
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use tripcost_fetch::{MatrixServiceConfig, RouteRunOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = MatrixServiceConfig::from_env()?;
//!     let summary = tripcost_fetch::generate_routes(
//!         "data/locations.json",
//!         "data/routes_cache.json",
//!         service,
//!         RouteRunOptions::default(),
//!     )
//!     .await?;
//!     println!("{summary}");
//!
//!     let update = tripcost_fetch::update_fuel_prices(
//!         "data/fuel_prices.json",
//!         tripcost_fetch::FuelSourceConfig::default(),
//!     )
//!     .await?;
//!     println!("NAFTA: ${:.0}", update.prices.get(tripcost_fetch::FuelType::Nafta));
//!     Ok(())
//! }
//! ```

use std::path::Path;

// Re-export core types that users might need
pub use crate::core::aggregator::{
    MergePolicy, RouteAggregator, RouteCache, RouteCacheEntry, cache_key,
};
pub use crate::core::cache::{load_route_cache, save_route_cache};
pub use crate::core::client::{DistanceMatrixClient, MatrixResponse, MatrixServiceConfig};
pub use crate::core::error::{Error, QueryFailure, Result};
pub use crate::core::fuel::{
    FuelPriceFile, FuelPriceScraper, FuelPrices, FuelSourceConfig, FuelType, describe_change,
};
pub use crate::core::location::{Location, load_locations};
pub use crate::core::partition::{BatchLimits, SubQuery, partition, plan_subqueries};
pub use crate::core::report::RunSummary;
pub use crate::core::routes::{ProgressCallback, RouteGenerator, RouteRun, RouteRunOptions};

// Internal modules
mod core;

/// Build the full route matrix for a location file and write the cache.
///
/// The cache file is replaced even when the matrix is incomplete; the
/// returned summary carries the deficit.
pub async fn generate_routes(
    locations_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    service: MatrixServiceConfig,
    options: RouteRunOptions,
) -> Result<RunSummary> {
    let locations = load_locations(locations_path)?;
    let client = DistanceMatrixClient::new(service)?;

    let run = RouteGenerator::with_options(&client, options)
        .run(&locations)
        .await?;

    save_route_cache(output_path, &run.routes)?;
    run.summary.log();

    Ok(run.summary)
}

/// Outcome of a fuel price update
#[derive(Debug, Clone)]
pub struct FuelUpdate {
    pub prices: FuelPrices,
    /// Contents of the price file before the update, if it existed
    pub previous: Option<FuelPriceFile>,
    pub written: FuelPriceFile,
}

/// Scrape current prices and write them to the price file.
///
/// On a failed scrape the existing file is kept and the error returned.
pub async fn update_fuel_prices(
    output_path: impl AsRef<Path>,
    config: FuelSourceConfig,
) -> Result<FuelUpdate> {
    let output_path = output_path.as_ref();
    let previous = core::fuel::load_price_file(output_path)?;

    let scraper = FuelPriceScraper::new(config)?;
    let prices = scraper.scrape().await?;

    let written = FuelPriceFile::new(&prices, core::fuel::today(), &scraper.config().source_name);
    core::fuel::save_price_file(output_path, &written)?;

    Ok(FuelUpdate {
        prices,
        previous,
        written,
    })
}

/// Scrape current prices without touching any file
pub async fn scrape_fuel_prices(config: FuelSourceConfig) -> Result<FuelPrices> {
    FuelPriceScraper::new(config)?.scrape().await
}

/// Read the current price file, if present
pub fn load_fuel_prices(path: impl AsRef<Path>) -> Result<Option<FuelPriceFile>> {
    core::fuel::load_price_file(path)
}
