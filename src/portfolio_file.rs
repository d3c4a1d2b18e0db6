//! Portfolio files
//!
//! A portfolio is described in TOML as a list of `[[title]]` tables:
//!
//! ```toml
//! [[title]]
//! product = "Tesouro Selic"
//! maturity = 2029-03-01
//! acquired = "08/07/2021"
//! invested = "5000.00"
//!
//! [[title]]
//! product = "Tesouro Prefixado"
//! maturity = "2026-01-01"
//! acquired = "2023-02-10"
//! quantity = 1.5
//! ```
//!
//! Dates may be TOML dates, ISO strings or `dd/mm/yyyy` strings. Amounts may
//! be strings or numbers; strings are preferred since they keep every digit.

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::models::{Portfolio, Position, Title};
use crate::tesouro::{parse_date_flexible, ProductType};
use chrono::NaiveDate;

#[derive(Debug, Deserialize)]
struct PortfolioFile {
    #[serde(default)]
    title: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
struct TitleEntry {
    product: String,
    maturity: DateField,
    acquired: DateField,
    quantity: Option<AmountField>,
    invested: Option<AmountField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateField {
    Date(toml::value::Datetime),
    Text(String),
}

impl DateField {
    fn to_date(&self) -> Result<NaiveDate> {
        let text = match self {
            DateField::Date(dt) => dt.to_string(),
            DateField::Text(s) => s.clone(),
        };
        Ok(parse_date_flexible(&text)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AmountField {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AmountField {
    fn to_decimal(&self) -> Result<Decimal> {
        match self {
            AmountField::Integer(i) => Ok(Decimal::from(*i)),
            AmountField::Float(f) => Decimal::from_str(&f.to_string())
                .map_err(|e| anyhow!("invalid amount {}: {}", f, e)),
            AmountField::Text(s) => {
                Decimal::from_str(s.trim()).map_err(|e| anyhow!("invalid amount '{}': {}", s, e))
            }
        }
    }
}

impl TitleEntry {
    fn into_title(self) -> Result<Title> {
        let position = match (&self.quantity, &self.invested) {
            (Some(q), None) => Position::Quantity(q.to_decimal()?),
            (None, Some(v)) => Position::Invested(v.to_decimal()?),
            (Some(_), Some(_)) => bail!("give either quantity or invested, not both"),
            (None, None) => bail!("missing quantity or invested"),
        };
        let product = ProductType::from_name(&self.product)?;
        Ok(Title::new(
            product,
            self.maturity.to_date().context("Invalid maturity")?,
            self.acquired.to_date().context("Invalid acquisition date")?,
            position,
        )?)
    }
}

pub fn parse_portfolio(content: &str) -> Result<Portfolio> {
    let file: PortfolioFile = toml::from_str(content).context("Failed to parse portfolio file")?;
    file.title
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let product = entry.product.clone();
            entry
                .into_title()
                .with_context(|| format!("Title #{} ({})", i + 1, product))
        })
        .collect()
}

pub fn load_portfolio(path: &Path) -> Result<Portfolio> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read portfolio file {}", path.display()))?;
    parse_portfolio(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_mixed_formats() {
        let content = r#"
[[title]]
product = "Tesouro Selic"
maturity = 2029-03-01
acquired = "08/07/2021"
invested = "5000.00"

[[title]]
product = "tesouro prefixado"
maturity = "2026-01-01"
acquired = "2023-02-10"
quantity = 1.5
"#;
        let portfolio = parse_portfolio(content).unwrap();
        assert_eq!(portfolio.len(), 2);

        let selic = &portfolio.titles()[0];
        assert_eq!(selic.product, ProductType::Selic);
        assert_eq!(selic.maturity, d(2029, 3, 1));
        assert_eq!(selic.acquired, d(2021, 7, 8));
        assert_eq!(selic.position, Position::Invested(dec!(5000.00)));

        let pre = &portfolio.titles()[1];
        assert_eq!(pre.product, ProductType::Prefixado);
        assert_eq!(pre.position, Position::Quantity(dec!(1.5)));
    }

    #[test]
    fn test_integer_amount() {
        let content = r#"
[[title]]
product = "Tesouro IPCA+"
maturity = "2035-05-15"
acquired = "2020-01-02"
quantity = 3
"#;
        let portfolio = parse_portfolio(content).unwrap();
        assert_eq!(portfolio.titles()[0].position, Position::Quantity(dec!(3)));
    }

    #[test]
    fn test_both_amounts_rejected() {
        let content = r#"
[[title]]
product = "Tesouro Selic"
maturity = "2029-03-01"
acquired = "2021-07-08"
quantity = "1"
invested = "100"
"#;
        let err = parse_portfolio(content).unwrap_err();
        assert!(format!("{:#}", err).contains("not both"));
    }

    #[test]
    fn test_unknown_product_rejected() {
        let content = r#"
[[title]]
product = "Tesouro Bitcoin"
maturity = "2029-03-01"
acquired = "2021-07-08"
quantity = "1"
"#;
        let err = parse_portfolio(content).unwrap_err();
        assert!(format!("{:#}", err).contains("Tesouro Bitcoin"));
    }

    #[test]
    fn test_empty_file_is_empty_portfolio() {
        assert!(parse_portfolio("").unwrap().is_empty());
    }
}
