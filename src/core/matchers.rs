//! Price extraction from a fetched pricing page
//!
//! Each [`PriceMatcher`] looks at the page independently and returns an
//! optional price for one fuel type. The fallback stage is separate and only
//! runs once every matcher has had its turn.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::core::fuel::FuelType;

/// Prices at or below this value are discarded as noise
pub const MIN_PLAUSIBLE_PRICE: f64 = 100.0;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static PRICE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)price|precio|valor").expect("valid price class regex"));

static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\s*(\d[\d.,]*)").expect("valid number regex"));

static FALLBACK_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(1[0-9]{3}(?:\.[0-9]{2})?)\b").expect("valid fallback regex"));

/// Normalize a local-format price string.
///
/// `"1.566,00"` and `"1.566"` are both 1566; `"15.66"` stays a decimal.
pub fn parse_price(text: &str) -> Option<f64> {
    let mut cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if cleaned.contains(',') {
        cleaned = cleaned.replace('.', "").replace(',', ".");
    } else if cleaned.matches('.').count() > 1 {
        cleaned = cleaned.replace('.', "");
    } else if let Some((_, decimals)) = cleaned.split_once('.') {
        if decimals.len() == 3 {
            cleaned = cleaned.replace('.', "");
        }
    }

    cleaned.parse::<f64>().ok()
}

fn plausible(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p > MIN_PLAUSIBLE_PRICE)
}

/// Join text nodes with single spaces
fn collapse<'t>(parts: impl Iterator<Item = &'t str>) -> String {
    let joined = parts.collect::<Vec<_>>().join(" ");
    WHITESPACE.replace_all(joined.trim(), " ").into_owned()
}

/// Visible text of a parsed document, without script or style contents
fn visible_text(document: &Html) -> String {
    let parts = document.tree.root().descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| matches!(element.name(), "script" | "style"))
        });
        (!hidden).then_some(&**text)
    });
    collapse(parts)
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse(element.text())
}

/// Visible text of an HTML document, entities decoded and whitespace collapsed
pub fn html_to_text(html: &str) -> String {
    visible_text(&Html::parse_document(html))
}

/// A fetched page with its visible text and price elements extracted
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub html: String,
    pub text: String,
    price_elements: Vec<String>,
}

impl ScrapedPage {
    pub fn new(html: impl Into<String>) -> Self {
        let html = html.into();
        let document = Html::parse_document(&html);
        let text = visible_text(&document);

        let classed = Selector::parse("[class]").expect("valid class selector");
        let price_elements = document
            .select(&classed)
            .filter(|element| {
                element
                    .value()
                    .attr("class")
                    .is_some_and(|class| PRICE_CLASS.is_match(class))
            })
            .map(element_text)
            .collect();

        Self {
            html,
            text,
            price_elements,
        }
    }

    /// Text of every element whose class mentions price, precio or valor,
    /// in document order
    pub fn price_elements(&self) -> &[String] {
        &self.price_elements
    }
}

/// An independent strategy for locating one fuel's price on a page
pub trait PriceMatcher {
    fn name(&self) -> &'static str;

    fn find(&self, page: &ScrapedPage, fuel: FuelType) -> Option<f64>;
}

/// Label-followed-by-amount patterns over the page text
pub struct TextPatternMatcher {
    patterns: Vec<(FuelType, Regex)>,
}

impl Default for TextPatternMatcher {
    fn default() -> Self {
        const AMOUNT: &str = r"[:\s]*\$?\s*([\d.,]+)";
        let table = [
            (FuelType::Nafta, r"super"),
            (FuelType::Nafta, r"nafta\s+super"),
            (FuelType::Ultra, r"gasoil"),
            (FuelType::Ultra, r"diesel\s+com[úu]n"),
            (FuelType::InfiniaDiesel, r"euro"),
            (FuelType::InfiniaDiesel, r"infinia\s+diesel"),
            (FuelType::InfiniaDiesel, r"diesel\s+premium"),
        ];

        let patterns = table
            .into_iter()
            .map(|(fuel, label)| {
                let regex = Regex::new(&format!("(?i){label}{AMOUNT}")).expect("valid fuel pattern");
                (fuel, regex)
            })
            .collect();

        Self { patterns }
    }
}

impl PriceMatcher for TextPatternMatcher {
    fn name(&self) -> &'static str {
        "text patterns"
    }

    fn find(&self, page: &ScrapedPage, fuel: FuelType) -> Option<f64> {
        self.patterns
            .iter()
            .filter(|(pattern_fuel, _)| *pattern_fuel == fuel)
            .find_map(|(_, regex)| {
                let caps = regex.captures(&page.text)?;
                plausible(parse_price(&caps[1]))
            })
    }
}

/// Elements styled as prices, classified by the fuel named in their text
#[derive(Default)]
pub struct PriceElementMatcher;

impl PriceElementMatcher {
    fn classify(text: &str) -> Option<FuelType> {
        let text = text.to_lowercase();
        if text.contains("super") || text.contains("nafta") {
            Some(FuelType::Nafta)
        } else if text.contains("gasoil") || (text.contains("diesel") && !text.contains("euro")) {
            Some(FuelType::Ultra)
        } else if text.contains("euro") || text.contains("infinia") || text.contains("premium") {
            Some(FuelType::InfiniaDiesel)
        } else {
            None
        }
    }
}

impl PriceMatcher for PriceElementMatcher {
    fn name(&self) -> &'static str {
        "price elements"
    }

    fn find(&self, page: &ScrapedPage, fuel: FuelType) -> Option<f64> {
        page.price_elements().iter().find_map(|text| {
            let caps = FIRST_NUMBER.captures(text)?;
            let price = plausible(parse_price(&caps[1]))?;
            (Self::classify(text) == Some(fuel)).then_some(price)
        })
    }
}

/// Last-resort stage: assign the three lowest distinct price-shaped numbers
/// to the missing fuels, cheapest first.
///
/// Returns the fuels that were filled in.
pub fn fallback_prices(page: &ScrapedPage, prices: &mut BTreeMap<FuelType, f64>) -> Vec<FuelType> {
    let candidates: Vec<&str> = FALLBACK_NUMBER
        .captures_iter(&page.text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    if candidates.len() < 3 {
        return Vec::new();
    }

    let mut values: Vec<f64> = candidates
        .iter()
        .take(6)
        .filter_map(|c| c.parse::<f64>().ok())
        .collect();
    values.sort_by(f64::total_cmp);
    values.dedup();

    if values.len() < 3 {
        return Vec::new();
    }

    let mut filled = Vec::new();
    for (fuel, value) in FuelType::ALL.into_iter().zip(values) {
        if let Entry::Vacant(slot) = prices.entry(fuel) {
            slot.insert(value);
            filled.push(fuel);
        }
    }
    filled
}
