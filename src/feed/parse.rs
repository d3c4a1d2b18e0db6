use chrono::NaiveDate;
use encoding_rs::ISO_8859_15;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Result, TesouroError};
use crate::feed::FeedKind;
use crate::tesouro::{parse_date_br, parse_decimal_br};

/// One row of `PrecoTaxaTesouroDireto.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRow {
    pub product_name: String,
    pub maturity: NaiveDate,
    pub base_date: NaiveDate,
    pub buy_rate: Option<Decimal>,
    pub sell_rate: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub base_price: Decimal,
}

/// One row of the sales (`VendasTesouroDireto.csv`) or repurchases
/// (`RecomprasTesouroDireto.csv`) feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementRow {
    pub product_name: String,
    pub maturity: NaiveDate,
    pub date: NaiveDate,
    pub unit_price: Option<Decimal>,
    pub quantity: Decimal,
    pub value: Option<Decimal>,
}

/// Feed files are published in UTF-8 or ISO-8859-15 depending on the resource.
pub fn decode_feed_bytes(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = ISO_8859_15.decode(bytes);
            decoded.into_owned()
        }
    };
    text.trim_start_matches('\u{feff}').to_string()
}

fn reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(content.as_bytes())
}

fn find_header(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| TesouroError::Parse(format!("missing feed column: {}", name)))
}

fn optional_decimal(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        None
    } else {
        parse_decimal_br(raw).ok()
    }
}

fn csv_error(err: csv::Error) -> TesouroError {
    TesouroError::Parse(format!("malformed feed CSV: {}", err))
}

pub fn parse_rate_feed(content: &str) -> Result<Vec<RateRow>> {
    let mut reader = reader(content);
    let headers = reader.headers().map_err(csv_error)?.clone();

    let tipo_idx = find_header(&headers, "Tipo Titulo")?;
    let venc_idx = find_header(&headers, "Data Vencimento")?;
    let base_idx = find_header(&headers, "Data Base")?;
    let taxa_compra_idx = find_header(&headers, "Taxa Compra Manha")?;
    let taxa_venda_idx = find_header(&headers, "Taxa Venda Manha")?;
    let pu_compra_idx = find_header(&headers, "PU Compra Manha")?;
    let pu_venda_idx = find_header(&headers, "PU Venda Manha")?;
    let pu_base_idx = find_header(&headers, "PU Base Manha")?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let tipo = field(tipo_idx);
        let venc = field(venc_idx);
        let base = field(base_idx);
        let pu_base = field(pu_base_idx);
        if tipo.is_empty() || venc.is_empty() || base.is_empty() || pu_base.is_empty() {
            skipped += 1;
            continue;
        }

        let base_price = match parse_decimal_br(pu_base) {
            Ok(value) => value,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        rows.push(RateRow {
            product_name: tipo.to_string(),
            maturity: parse_date_br(venc)?,
            base_date: parse_date_br(base)?,
            buy_rate: optional_decimal(field(taxa_compra_idx)),
            sell_rate: optional_decimal(field(taxa_venda_idx)),
            buy_price: optional_decimal(field(pu_compra_idx)),
            sell_price: optional_decimal(field(pu_venda_idx)),
            base_price,
        });
    }

    tracing::debug!("Parsed {} rate rows ({} skipped)", rows.len(), skipped);
    Ok(rows)
}

pub fn parse_movement_feed(kind: FeedKind, content: &str) -> Result<Vec<MovementRow>> {
    let date_column = match kind {
        FeedKind::Sale => "Data Venda",
        FeedKind::Repurchase => "Data Resgate",
        FeedKind::Rate => {
            return Err(TesouroError::InvalidInput(
                "the rate feed carries no movements".to_string(),
            ))
        }
    };

    let mut reader = reader(content);
    let headers = reader.headers().map_err(csv_error)?.clone();

    let tipo_idx = find_header(&headers, "Tipo Titulo")?;
    let venc_idx = find_header(&headers, "Vencimento do Titulo")?;
    let date_idx = find_header(&headers, date_column)?;
    let qty_idx = find_header(&headers, "Quantidade")?;
    let pu_idx = headers.iter().position(|h| h.trim().eq_ignore_ascii_case("PU"));
    let value_idx = headers.iter().position(|h| h.trim().eq_ignore_ascii_case("Valor"));

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let tipo = field(tipo_idx);
        let venc = field(venc_idx);
        let date = field(date_idx);
        let qty = field(qty_idx);
        if tipo.is_empty() || venc.is_empty() || date.is_empty() || qty.is_empty() {
            continue;
        }

        rows.push(MovementRow {
            product_name: tipo.to_string(),
            maturity: parse_date_br(venc)?,
            date: parse_date_br(date)?,
            unit_price: pu_idx.and_then(|idx| optional_decimal(field(idx))),
            quantity: parse_decimal_br(qty)?,
            value: value_idx.and_then(|idx| optional_decimal(field(idx))),
        });
    }

    tracing::debug!("Parsed {} {} rows", rows.len(), kind);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RATE_CSV: &str = "Tipo Titulo;Data Vencimento;Data Base;Taxa Compra Manha;Taxa Venda Manha;PU Compra Manha;PU Venda Manha;PU Base Manha\n\
Tesouro IPCA+ com Juros Semestrais;15/05/2045;17/09/2007;6,37;6,47;1617,98;1595,98;1595,39\n\
Tesouro Selic;01/03/2025;08/07/2021;0,02;0,03;;10.912,34;10.905,12\n\
Tesouro Selic;01/03/2025;09/07/2021;0,02;0,03;;10.913,00;\n";

    #[test]
    fn test_parse_rate_feed() {
        let rows = parse_rate_feed(RATE_CSV).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].base_price, dec!(1595.39));
        assert_eq!(rows[0].sell_rate, Some(dec!(6.47)));
        assert_eq!(rows[1].base_price, dec!(10905.12));
        assert_eq!(rows[1].buy_price, None);
        assert_eq!(rows[1].maturity, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn test_parse_rate_feed_missing_column() {
        let err = parse_rate_feed("Tipo Titulo;Data Base\nTesouro Selic;01/01/2024\n").unwrap_err();
        assert!(err.to_string().contains("Data Vencimento"));
    }

    #[test]
    fn test_parse_rate_feed_bad_date_aborts() {
        let csv = "Tipo Titulo;Data Vencimento;Data Base;Taxa Compra Manha;Taxa Venda Manha;PU Compra Manha;PU Venda Manha;PU Base Manha\n\
Tesouro Selic;2025-03-01;08/07/2021;0,02;0,03;;1;1\n";
        assert!(matches!(parse_rate_feed(csv), Err(TesouroError::Parse(_))));
    }

    #[test]
    fn test_parse_sale_feed() {
        let csv = "Tipo Titulo;Vencimento do Titulo;Data Venda;PU;Quantidade;Valor\n\
Tesouro Prefixado;01/01/2026;05/01/2024;800,10;1,5;1200,15\n";
        let rows = parse_movement_feed(FeedKind::Sale, csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, dec!(1.5));
        assert_eq!(rows[0].value, Some(dec!(1200.15)));
    }

    #[test]
    fn test_parse_repurchase_feed_needs_resgate_column() {
        let csv = "Tipo Titulo;Vencimento do Titulo;Data Venda;PU;Quantidade;Valor\n";
        assert!(parse_movement_feed(FeedKind::Repurchase, csv).is_err());
    }

    #[test]
    fn test_decode_latin1_bytes() {
        let bytes = b"Tipo T\xedtulo";
        assert_eq!(decode_feed_bytes(bytes), "Tipo Título");
        assert_eq!(decode_feed_bytes("\u{feff}abc".as_bytes()), "abc");
    }
}
