//! Fuel price scraping and the fuel price file
//!
//! The pricing page is fetched once and run through the matcher pipeline
//! from [`crate::core::matchers`]. A scrape only succeeds when every fuel
//! type was priced; otherwise the existing price file is left untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};

use crate::core::cache::{read_json, write_json};
use crate::core::error::{Error, Result};
use crate::core::matchers::{
    PriceElementMatcher, PriceMatcher, ScrapedPage, TextPatternMatcher, fallback_prices,
};

pub const NAFTAS_URL: &str = "https://naftas.com.ar";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Fuel types tracked by the estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    /// Nafta Super
    Nafta,
    /// Gasoil / Diesel común
    Ultra,
    /// Euro / Infinia Diesel
    InfiniaDiesel,
}

impl FuelType {
    /// Ordered cheapest-first, as assumed by the fallback stage
    pub const ALL: [FuelType; 3] = [FuelType::Nafta, FuelType::Ultra, FuelType::InfiniaDiesel];

    pub fn code(&self) -> &'static str {
        match self {
            FuelType::Nafta => "NAFTA",
            FuelType::Ultra => "ULTRA",
            FuelType::InfiniaDiesel => "INFINIA_DIESEL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FuelType::Nafta => "Nafta Super",
            FuelType::Ultra => "Gasoil",
            FuelType::InfiniaDiesel => "Infinia Diesel (Euro)",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A complete set of prices, one per fuel type
#[derive(Debug, Clone, PartialEq)]
pub struct FuelPrices {
    prices: BTreeMap<FuelType, f64>,
}

impl FuelPrices {
    /// Require a price for every fuel type
    pub fn from_map(prices: BTreeMap<FuelType, f64>) -> Result<Self> {
        let missing: Vec<&str> = FuelType::ALL
            .iter()
            .filter(|fuel| !prices.contains_key(*fuel))
            .map(FuelType::code)
            .collect();

        if !missing.is_empty() {
            return Err(Error::ScrapeFailed(format!(
                "no price found for {}",
                missing.join(", ")
            )));
        }

        Ok(Self { prices })
    }

    pub fn get(&self, fuel: FuelType) -> f64 {
        self.prices.get(&fuel).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuelType, f64)> + '_ {
        self.prices.iter().map(|(fuel, price)| (*fuel, *price))
    }
}

/// Run the matcher pipeline over a page, then the fallback stage if needed
pub fn extract_prices(page: &ScrapedPage) -> Result<FuelPrices> {
    let matchers: Vec<Box<dyn PriceMatcher>> = vec![
        Box::new(TextPatternMatcher::default()),
        Box::new(PriceElementMatcher),
    ];

    let mut prices = BTreeMap::new();
    for matcher in &matchers {
        for fuel in FuelType::ALL {
            if prices.contains_key(&fuel) {
                continue;
            }
            if let Some(price) = matcher.find(page, fuel) {
                info!("  Found {fuel}: ${price} ({})", matcher.name());
                prices.insert(fuel, price);
            }
        }
    }

    if prices.len() < FuelType::ALL.len() {
        let missing: Vec<_> = FuelType::ALL
            .iter()
            .filter(|fuel| !prices.contains_key(*fuel))
            .map(FuelType::code)
            .collect();
        warn!("Could not find prices for: {}", missing.join(", "));
        warn!("Attempting to extract prices from page structure...");

        let filled = fallback_prices(page, &mut prices);
        if !filled.is_empty() {
            info!("  Extracted fallback prices: {prices:?}");
        }
    }

    FuelPrices::from_map(prices)
}

/// Configuration for the pricing page
#[derive(Debug, Clone)]
pub struct FuelSourceConfig {
    pub page_url: String,

    /// Name recorded as `source` in the price file
    pub source_name: String,

    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FuelSourceConfig {
    fn default() -> Self {
        Self {
            page_url: NAFTAS_URL.to_string(),
            source_name: "naftas.com.ar".to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fetches and scrapes the pricing page
pub struct FuelPriceScraper {
    config: FuelSourceConfig,
    client: Client,
}

impl FuelPriceScraper {
    pub fn new(config: FuelSourceConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &FuelSourceConfig {
        &self.config
    }

    pub async fn fetch_page(&self) -> Result<ScrapedPage> {
        info!("Fetching prices from {}...", self.config.page_url);

        let response = self.client.get(&self.config.page_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!(
                "Failed to fetch {}: {status}",
                self.config.page_url
            )));
        }

        let html = response.text().await?;
        Ok(ScrapedPage::new(html))
    }

    pub async fn scrape(&self) -> Result<FuelPrices> {
        let page = self.fetch_page().await?;
        extract_prices(&page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelLabels {
    #[serde(rename = "NAFTA")]
    pub nafta: String,
    #[serde(rename = "ULTRA")]
    pub ultra: String,
    #[serde(rename = "INFINIA_DIESEL")]
    pub infinia_diesel: String,
}

impl Default for FuelLabels {
    fn default() -> Self {
        Self {
            nafta: FuelType::Nafta.label().to_string(),
            ultra: FuelType::Ultra.label().to_string(),
            infinia_diesel: FuelType::InfiniaDiesel.label().to_string(),
        }
    }
}

/// Contents of `fuel_prices.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPriceFile {
    #[serde(rename = "NAFTA", default)]
    pub nafta: Option<f64>,
    #[serde(rename = "ULTRA", default)]
    pub ultra: Option<f64>,
    #[serde(rename = "INFINIA_DIESEL", default)]
    pub infinia_diesel: Option<f64>,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub labels: FuelLabels,
}

impl FuelPriceFile {
    pub fn new(prices: &FuelPrices, last_updated: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            nafta: Some(prices.get(FuelType::Nafta)),
            ultra: Some(prices.get(FuelType::Ultra)),
            infinia_diesel: Some(prices.get(FuelType::InfiniaDiesel)),
            last_updated: last_updated.into(),
            source: source.into(),
            labels: FuelLabels::default(),
        }
    }

    pub fn price(&self, fuel: FuelType) -> Option<f64> {
        match fuel {
            FuelType::Nafta => self.nafta,
            FuelType::Ultra => self.ultra,
            FuelType::InfiniaDiesel => self.infinia_diesel,
        }
    }
}

pub fn load_price_file(path: impl AsRef<Path>) -> Result<Option<FuelPriceFile>> {
    read_json(path)
}

pub fn save_price_file(path: impl AsRef<Path>, file: &FuelPriceFile) -> Result<()> {
    write_json(path, file)
}

/// Today's date in the price file format
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// `" (+$15, +1.0%)"` style suffix comparing a new price with the previous one
pub fn describe_change(previous: Option<f64>, current: f64) -> String {
    let previous = match previous {
        Some(p) if p != 0.0 => p,
        _ => return String::new(),
    };

    let diff = current - previous;
    let pct = diff / previous * 100.0;
    if diff > 0.0 {
        format!(" (+${diff:.0}, +{pct:.1}%)")
    } else if diff < 0.0 {
        format!(" (-${:.0}, {pct:.1}%)", diff.abs())
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
        <h1>Precios de combustibles</h1>
        <div class="grid">
            <div class="precio"><h3>Nafta Super</h3><p>$ 1.566</p></div>
            <div class="precio"><h3>Gasoil</h3><p>$ 1.601</p></div>
            <div class="precio"><h3>Infinia Diesel</h3><p>$ 1.809</p></div>
        </div>
    </body></html>"#;

    fn prices(nafta: f64, ultra: f64, infinia: f64) -> FuelPrices {
        FuelPrices::from_map(BTreeMap::from([
            (FuelType::Nafta, nafta),
            (FuelType::Ultra, ultra),
            (FuelType::InfiniaDiesel, infinia),
        ]))
        .unwrap()
    }

    #[test]
    fn test_extract_prices_from_text() {
        let extracted = extract_prices(&ScrapedPage::new(PAGE)).unwrap();
        assert_eq!(extracted, prices(1566.0, 1601.0, 1809.0));
    }

    #[test]
    fn test_extract_prices_uses_fallback_for_unlabelled_numbers() {
        let page = ScrapedPage::new("<table><tr><td>1890</td><td>1550</td><td>1620</td></tr></table>");
        let extracted = extract_prices(&page).unwrap();
        assert_eq!(extracted, prices(1550.0, 1620.0, 1890.0));
    }

    #[test]
    fn test_extract_prices_fails_when_incomplete() {
        let page = ScrapedPage::new("<p>Nafta Super $1.566</p><p>GNC $600</p>");
        match extract_prices(&page) {
            Err(Error::ScrapeFailed(msg)) => {
                assert!(msg.contains("ULTRA"));
                assert!(msg.contains("INFINIA_DIESEL"));
            }
            other => panic!("Expected ScrapeFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_describe_change() {
        assert_eq!(describe_change(Some(1500.0), 1515.0), " (+$15, +1.0%)");
        assert_eq!(describe_change(Some(1600.0), 1560.0), " (-$40, -2.5%)");
        assert_eq!(describe_change(Some(1500.0), 1500.0), "");
        assert_eq!(describe_change(None, 1500.0), "");
        assert_eq!(describe_change(Some(0.0), 1500.0), "");
    }

    #[test]
    fn test_price_file_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fuel_prices.json");

        let file = FuelPriceFile::new(&prices(1566.0, 1601.0, 1809.5), "2026-10-19", "naftas.com.ar");
        save_price_file(&path, &file).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let expected = r#"{
  "NAFTA": 1566.0,
  "ULTRA": 1601.0,
  "INFINIA_DIESEL": 1809.5,
  "last_updated": "2026-10-19",
  "source": "naftas.com.ar",
  "labels": {
    "NAFTA": "Nafta Super",
    "ULTRA": "Gasoil",
    "INFINIA_DIESEL": "Infinia Diesel (Euro)"
  }
}
"#;
        assert_eq!(text, expected);

        let loaded = load_price_file(&path).unwrap().unwrap();
        assert_eq!(loaded, file);
        assert_eq!(loaded.price(FuelType::InfiniaDiesel), Some(1809.5));
    }

    #[test]
    fn test_partial_price_file_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fuel_prices.json");
        std::fs::write(&path, r#"{"NAFTA": 1400}"#).unwrap();

        let loaded = load_price_file(&path).unwrap().unwrap();
        assert_eq!(loaded.price(FuelType::Nafta), Some(1400.0));
        assert_eq!(loaded.price(FuelType::Ultra), None);
    }

    #[tokio::test]
    async fn test_scrape_from_mock_page() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = FuelSourceConfig {
            page_url: format!("{}/", mock_server.uri()),
            ..Default::default()
        };
        let scraper = FuelPriceScraper::new(config).unwrap();
        let scraped = scraper.scrape().await.unwrap();

        assert_eq!(scraped.get(FuelType::Ultra), 1601.0);
    }

    #[tokio::test]
    async fn test_scrape_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let config = FuelSourceConfig {
            page_url: mock_server.uri(),
            ..Default::default()
        };
        let scraper = FuelPriceScraper::new(config).unwrap();

        assert!(matches!(scraper.scrape().await, Err(Error::HttpError(_))));
    }
}
