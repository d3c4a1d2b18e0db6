use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TesouroError};

/// Tesouro Direto product families as they appear in the "Tipo Titulo" column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ProductType {
    #[serde(rename = "Tesouro IPCA+ com Juros Semestrais")]
    IpcaJuros,
    #[serde(rename = "Tesouro IGPM+ com Juros Semestrais")]
    IgpmJuros,
    #[serde(rename = "Tesouro Prefixado")]
    Prefixado,
    #[serde(rename = "Tesouro Prefixado com Juros Semestrais")]
    PrefixadoJuros,
    #[serde(rename = "Tesouro Selic")]
    Selic,
    #[serde(rename = "Tesouro IPCA+")]
    Ipca,
    #[serde(rename = "Tesouro RendA+")]
    Renda,
    #[serde(rename = "Tesouro Educa+")]
    Educa,
}

impl ProductType {
    pub const ALL: [ProductType; 8] = [
        ProductType::IpcaJuros,
        ProductType::IgpmJuros,
        ProductType::Prefixado,
        ProductType::PrefixadoJuros,
        ProductType::Selic,
        ProductType::Ipca,
        ProductType::Renda,
        ProductType::Educa,
    ];

    /// Product name used by the Tesouro Transparente feed
    pub fn name(&self) -> &'static str {
        match self {
            ProductType::IpcaJuros => "Tesouro IPCA+ com Juros Semestrais",
            ProductType::IgpmJuros => "Tesouro IGPM+ com Juros Semestrais",
            ProductType::Prefixado => "Tesouro Prefixado",
            ProductType::PrefixadoJuros => "Tesouro Prefixado com Juros Semestrais",
            ProductType::Selic => "Tesouro Selic",
            ProductType::Ipca => "Tesouro IPCA+",
            ProductType::Renda => "Tesouro RendA+",
            ProductType::Educa => "Tesouro Educa+",
        }
    }

    /// Market ticker prefix (NTN-B, LTN, LTF, ...)
    pub fn ticker(&self) -> &'static str {
        match self {
            ProductType::IpcaJuros => "NTN-B",
            ProductType::IgpmJuros => "NTN-C",
            ProductType::Prefixado => "LTN",
            ProductType::PrefixadoJuros => "NTN-F",
            ProductType::Selic => "LTF",
            ProductType::Ipca => "NTN-B Principal",
            ProductType::Renda => "RendA+",
            ProductType::Educa => "Educa+",
        }
    }

    /// Floating-rate bonds get a custody fee allowance
    pub fn is_floating_rate(&self) -> bool {
        matches!(self, ProductType::Selic)
    }

    /// Resolve a feed product name. The feed spells RendA+ both as
    /// "Tesouro RendA+" and "Tesouro Renda+ Aposentadoria Extra".
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        if let Some(found) = Self::ALL
            .iter()
            .find(|p| p.name().to_ascii_lowercase() == normalized)
        {
            return Ok(*found);
        }
        if normalized.starts_with("tesouro renda+") {
            return Ok(ProductType::Renda);
        }
        if normalized.starts_with("tesouro educa+") {
            return Ok(ProductType::Educa);
        }
        Err(TesouroError::UnknownProductType(name.trim().to_string()))
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProductType {
    type Err = TesouroError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Nomenclature table: product name to ticker prefix
pub fn nomenclature() -> Vec<(&'static str, &'static str)> {
    ProductType::ALL
        .iter()
        .map(|p| (p.name(), p.ticker()))
        .collect()
}

/// Short label for a holding, e.g. `LTF_2025_2021-07-08`
pub fn holding_label(product: ProductType, maturity: NaiveDate, acquired: NaiveDate) -> String {
    format!(
        "{}_{}_{}",
        product.ticker().to_ascii_uppercase(),
        maturity.year(),
        acquired.format("%Y-%m-%d")
    )
}

pub fn parse_decimal_br(input: &str) -> Result<Decimal> {
    let cleaned = input
        .trim()
        .replace('.', "")
        .replace(',', ".")
        .replace('%', "");
    if cleaned.is_empty() {
        return Err(TesouroError::Parse("empty decimal input".to_string()));
    }
    Decimal::from_str(&cleaned)
        .map_err(|err| TesouroError::Parse(format!("invalid decimal '{}': {}", input, err)))
}

pub fn parse_date_br(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y")
        .map_err(|_| TesouroError::Parse(format!("invalid date: {}", value)))
}

/// Accepts ISO (`2025-03-01`) or Brazilian (`01/03/2025`) dates.
pub fn parse_date_flexible(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").or_else(|_| parse_date_br(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nomenclature_maps_selic_to_ltf() {
        let table = nomenclature();
        assert_eq!(table.len(), 8);
        assert!(table.contains(&("Tesouro Selic", "LTF")));
        assert!(table.contains(&("Tesouro IPCA+", "NTN-B Principal")));
    }

    #[test]
    fn test_from_name_is_case_insensitive() {
        let product = ProductType::from_name("  tesouro ipca+ com juros semestrais ").unwrap();
        assert_eq!(product, ProductType::IpcaJuros);
        assert_eq!(product.ticker(), "NTN-B");
    }

    #[test]
    fn test_from_name_renda_alias() {
        let product = ProductType::from_name("Tesouro Renda+ Aposentadoria Extra").unwrap();
        assert_eq!(product, ProductType::Renda);
    }

    #[test]
    fn test_unknown_product_type() {
        let err = ProductType::from_name("Tesouro Bitcoin").unwrap_err();
        assert_eq!(
            err,
            TesouroError::UnknownProductType("Tesouro Bitcoin".to_string())
        );
    }

    #[test]
    fn test_only_selic_is_floating_rate() {
        let floating: Vec<_> = ProductType::ALL
            .iter()
            .filter(|p| p.is_floating_rate())
            .collect();
        assert_eq!(floating, vec![&ProductType::Selic]);
    }

    #[test]
    fn test_holding_label() {
        let label = holding_label(
            ProductType::Selic,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 7, 8).unwrap(),
        );
        assert_eq!(label, "LTF_2025_2021-07-08");
    }

    #[test]
    fn test_parse_decimal_br() {
        let value = parse_decimal_br("1.234,56").unwrap();
        assert_eq!(value, Decimal::from_str("1234.56").unwrap());
    }

    #[test]
    fn test_parse_date_br() {
        let date = parse_date_br("17/09/2007").unwrap();
        assert_eq!(date.year(), 2007);
        assert!(parse_date_br("2007-09-17").is_err());
    }

    #[test]
    fn test_parse_date_flexible() {
        let iso = parse_date_flexible("2021-07-08").unwrap();
        let br = parse_date_flexible("08/07/2021").unwrap();
        assert_eq!(iso, br);
    }
}
