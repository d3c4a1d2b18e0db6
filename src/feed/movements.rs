use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::parse::MovementRow;

/// Product-name fragments left out of movement pivots unless overridden.
/// Matched case-insensitively: the feed spells RendA+ both as "RendA+" and
/// "Renda+ Aposentadoria Extra".
pub const DEFAULT_EXCLUSIONS: [&str; 3] = ["Juros Semestrais", "Educa+", "RendA+"];

/// Quantity moved per bond label per date
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovementPivot {
    pub by_date: BTreeMap<NaiveDate, BTreeMap<String, Decimal>>,
}

impl MovementPivot {
    /// Every bond label seen on any date, sorted
    pub fn labels(&self) -> Vec<String> {
        self.by_date
            .values()
            .flat_map(|m| m.keys().cloned())
            .unique()
            .sorted()
            .collect()
    }

    /// Total quantity per label across all dates
    pub fn totals(&self) -> BTreeMap<String, Decimal> {
        let mut totals = BTreeMap::new();
        for (label, qty) in self.by_date.values().flatten() {
            *totals.entry(label.clone()).or_insert(Decimal::ZERO) += *qty;
        }
        totals
    }
}

/// `<Tipo Titulo>_<maturity>`
pub fn movement_label(row: &MovementRow) -> String {
    format!("{}_{}", row.product_name, row.maturity.format("%Y-%m-%d"))
}

/// Sum quantities per (label, date). Rows whose product name contains any of
/// `exclude`, ignoring case, are dropped; with `since`, only rows whose
/// maturity and movement date are both after it are kept.
pub fn movement_pivot(
    rows: &[MovementRow],
    exclude: &[&str],
    since: Option<NaiveDate>,
) -> MovementPivot {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<String, Decimal>> = BTreeMap::new();

    let exclude: Vec<String> = exclude.iter().map(|frag| frag.to_lowercase()).collect();
    let kept = rows
        .iter()
        .filter(|r| {
            let name = r.product_name.to_lowercase();
            !exclude.iter().any(|frag| name.contains(frag.as_str()))
        })
        .filter(|r| since.map_or(true, |s| r.maturity > s && r.date > s));

    for row in kept {
        *by_date
            .entry(row.date)
            .or_default()
            .entry(movement_label(row))
            .or_insert(Decimal::ZERO) += row.quantity;
    }

    MovementPivot { by_date }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(name: &str, maturity: NaiveDate, date: NaiveDate, qty: Decimal) -> MovementRow {
        MovementRow {
            product_name: name.to_string(),
            maturity,
            date,
            unit_price: None,
            quantity: qty,
            value: None,
        }
    }

    #[test]
    fn test_pivot_sums_same_label_and_date() {
        let rows = vec![
            row("Tesouro Selic", d(2025, 3, 1), d(2024, 1, 5), dec!(1.5)),
            row("Tesouro Selic", d(2025, 3, 1), d(2024, 1, 5), dec!(2)),
            row("Tesouro Prefixado", d(2026, 1, 1), d(2024, 1, 5), dec!(3)),
        ];
        let pivot = movement_pivot(&rows, &[], None);
        let day = &pivot.by_date[&d(2024, 1, 5)];
        assert_eq!(day["Tesouro Selic_2025-03-01"], dec!(3.5));
        assert_eq!(day["Tesouro Prefixado_2026-01-01"], dec!(3));
        assert_eq!(pivot.labels().len(), 2);
    }

    #[test]
    fn test_pivot_default_exclusions() {
        let rows = vec![
            row("Tesouro IPCA+ com Juros Semestrais", d(2035, 5, 15), d(2024, 1, 5), dec!(1)),
            row("Tesouro Educa+", d(2030, 12, 15), d(2024, 1, 5), dec!(1)),
            row("Tesouro IPCA+", d(2035, 5, 15), d(2024, 1, 5), dec!(1)),
        ];
        let pivot = movement_pivot(&rows, &DEFAULT_EXCLUSIONS, None);
        assert_eq!(pivot.labels(), vec!["Tesouro IPCA+_2035-05-15".to_string()]);
    }

    #[test]
    fn test_pivot_exclusions_ignore_case() {
        let rows = vec![
            row("Tesouro Renda+ Aposentadoria Extra", d(2049, 12, 15), d(2024, 1, 5), dec!(1)),
            row("Tesouro RendA+", d(2049, 12, 15), d(2024, 1, 5), dec!(1)),
            row("Tesouro Selic", d(2029, 3, 1), d(2024, 1, 5), dec!(1)),
        ];
        let pivot = movement_pivot(&rows, &DEFAULT_EXCLUSIONS, None);
        assert_eq!(pivot.labels(), vec!["Tesouro Selic_2029-03-01".to_string()]);

        let pivot = movement_pivot(&rows, &["selic"], None);
        assert_eq!(pivot.labels().len(), 2);
    }

    #[test]
    fn test_pivot_since_filter() {
        let rows = vec![
            row("Tesouro Selic", d(2025, 3, 1), d(2023, 12, 29), dec!(1)),
            row("Tesouro Selic", d(2025, 3, 1), d(2024, 1, 5), dec!(2)),
            row("Tesouro Selic", d(2023, 3, 1), d(2024, 1, 5), dec!(4)),
        ];
        let pivot = movement_pivot(&rows, &[], Some(d(2024, 1, 1)));
        assert_eq!(pivot.by_date.len(), 1);
        assert_eq!(pivot.totals()["Tesouro Selic_2025-03-01"], dec!(2));
    }
}
