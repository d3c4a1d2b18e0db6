// Feed module - Tesouro Transparente CSV resources

pub mod movements;
pub mod parse;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::FeedConfig;
use crate::error::TesouroError;
use crate::models::{PriceSeries, SeriesPoint};
use crate::tesouro::ProductType;

pub use movements::{movement_pivot, MovementPivot, DEFAULT_EXCLUSIONS};
pub use parse::{decode_feed_bytes, parse_movement_feed, parse_rate_feed, MovementRow, RateRow};

const SALE_CSV_URL: &str = "https://www.tesourotransparente.gov.br/ckan/dataset/f0468ecc-ae97-4287-89c2-6d8139fb4343/resource/e5f90e3a-8f8d-4895-9c56-4bb2f7877920/download/VendasTesouroDireto.csv";
const RATE_CSV_URL: &str = "https://www.tesourotransparente.gov.br/ckan/dataset/df56aa42-484a-4a59-8184-7676580c81e3/resource/796d2059-14e9-44e3-80c9-2d9e30b405c1/download/PrecoTaxaTesouroDireto.csv";
const REPURCHASE_CSV_URL: &str = "https://www.tesourotransparente.gov.br/ckan/dataset/f30db6e4-6123-416c-b094-be8dfc823601/resource/30c2b3f5-6edd-499a-8514-062bfda0f61a/download/RecomprasTesouroDireto.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Sale,
    Repurchase,
    Rate,
}

impl FeedKind {
    pub fn default_url(&self) -> &'static str {
        match self {
            FeedKind::Sale => SALE_CSV_URL,
            FeedKind::Repurchase => REPURCHASE_CSV_URL,
            FeedKind::Rate => RATE_CSV_URL,
        }
    }

    /// Accepts the English names and the Portuguese ones used by the
    /// Tesouro site ("venda", "resgate", "taxa").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" | "venda" => Some(FeedKind::Sale),
            "repurchase" | "resgate" => Some(FeedKind::Repurchase),
            "rate" | "taxa" => Some(FeedKind::Rate),
            _ => None,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedKind::Sale => "sale",
            FeedKind::Repurchase => "repurchase",
            FeedKind::Rate => "rate",
        };
        f.write_str(name)
    }
}

/// Download one feed resource and return it decoded. No retries, no cache:
/// every call hits the network.
pub fn fetch_price_feed(kind: FeedKind, config: &FeedConfig) -> Result<String> {
    let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
    if let Some(proxy) = config.proxy.as_deref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("Invalid proxy URL")?);
    }
    let client = builder.build().context("Failed to build HTTP client")?;

    let url = config.url_for(kind);
    info!("Downloading Tesouro {} feed from {}", kind, url);
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to download Tesouro {} CSV", kind))?
        .error_for_status()
        .with_context(|| format!("Tesouro {} CSV returned error status", kind))?;

    let bytes = response
        .bytes()
        .with_context(|| format!("Failed to read Tesouro {} CSV bytes", kind))?;
    Ok(decode_feed_bytes(&bytes))
}

/// Read a previously downloaded feed file
pub fn read_feed_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read feed file {}", path.display()))?;
    Ok(decode_feed_bytes(&bytes))
}

/// Source of per-bond price history
pub trait PriceFeed {
    fn price_series(
        &self,
        product: ProductType,
        maturity: NaiveDate,
    ) -> crate::error::Result<PriceSeries>;
}

/// Morning buy/sell rates for one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateObservation {
    pub date: NaiveDate,
    pub buy_rate: Option<Decimal>,
    pub sell_rate: Option<Decimal>,
}

/// Parsed rate feed held in memory
#[derive(Debug, Clone, Default)]
pub struct RateFeed {
    rows: Vec<RateRow>,
}

impl RateFeed {
    pub fn new(rows: Vec<RateRow>) -> Self {
        Self { rows }
    }

    /// Parse a rate CSV; a feed without a single priced row is an error
    pub fn from_content(content: &str) -> crate::error::Result<Self> {
        let rows = parse_rate_feed(content)?;
        if rows.is_empty() {
            return Err(TesouroError::Feed("rate feed has no priced rows".to_string()));
        }
        Ok(Self::new(rows))
    }

    pub fn fetch(config: &FeedConfig) -> Result<Self> {
        let content = fetch_price_feed(FeedKind::Rate, config)?;
        let feed = Self::from_content(&content).context("Failed to parse Tesouro rate CSV")?;
        info!("Loaded {} rate rows", feed.rows.len());
        Ok(feed)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = read_feed_file(path)?;
        Self::from_content(&content)
            .with_context(|| format!("Failed to parse feed file {}", path.display()))
    }

    pub fn rows(&self) -> &[RateRow] {
        &self.rows
    }

    /// Latest base date in the feed
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.base_date).max()
    }

    fn rows_for(
        &self,
        product: ProductType,
        maturity: NaiveDate,
    ) -> crate::error::Result<Vec<&RateRow>> {
        let mut rows: Vec<&RateRow> = self
            .rows
            .iter()
            .filter(|r| r.maturity == maturity)
            .filter(|r| ProductType::from_name(&r.product_name).ok() == Some(product))
            .collect();
        if rows.is_empty() {
            return Err(TesouroError::bond_not_found(product.name(), maturity));
        }
        rows.sort_by_key(|r| r.base_date);
        rows.dedup_by_key(|r| r.base_date);
        Ok(rows)
    }

    pub fn rate_history(
        &self,
        product: ProductType,
        maturity: NaiveDate,
    ) -> crate::error::Result<Vec<RateObservation>> {
        Ok(self
            .rows_for(product, maturity)?
            .into_iter()
            .map(|r| RateObservation {
                date: r.base_date,
                buy_rate: r.buy_rate,
                sell_rate: r.sell_rate,
            })
            .collect())
    }
}

impl PriceFeed for RateFeed {
    fn price_series(
        &self,
        product: ProductType,
        maturity: NaiveDate,
    ) -> crate::error::Result<PriceSeries> {
        let points = self
            .rows_for(product, maturity)?
            .into_iter()
            .map(|r| SeriesPoint::new(r.base_date, r.base_price))
            .collect();
        PriceSeries::new(product, maturity, points)
    }
}
