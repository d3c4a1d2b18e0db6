//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of valuation from presentation.

use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use tesouro::feed::{MovementPivot, RateObservation};
use tesouro::models::{CostBreakdown, Position, QuotaSeries};
use tesouro::quota::PortfolioValuation;
use tesouro::utils::{format_currency, format_decimal_br, format_percent};
use tesouro::valuation::TitleValuation;

/// Trailing windows in business days
pub const TRAILING_WINDOWS: [(&str, usize); 4] =
    [("1M", 21), ("6M", 126), ("12M", 252), ("24M", 504)];

/// Pretty JSON; serialization failures are reported inside the JSON itself
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn signed_currency(value: Decimal) -> String {
    if value >= Decimal::ZERO {
        format_currency(value).green().to_string()
    } else {
        format_currency(value).red().to_string()
    }
}

fn signed_percent(value: Decimal) -> String {
    if value >= Decimal::ZERO {
        format_percent(value).green().to_string()
    } else {
        format_percent(value).red().to_string()
    }
}

fn summary_line(output: &mut String, label: &str, value: impl std::fmt::Display) {
    output.push_str(&format!("\n{:<22} {}", format!("{}:", label).bold(), value));
}

/// Product name to ticker table
pub fn format_titles_table(nomenclature: &[(&str, &str)]) -> String {
    #[derive(Tabled)]
    struct TitleRow {
        #[tabled(rename = "Product")]
        product: String,
        #[tabled(rename = "Ticker")]
        ticker: String,
    }

    let rows: Vec<TitleRow> = nomenclature
        .iter()
        .map(|(product, ticker)| TitleRow {
            product: product.to_string(),
            ticker: ticker.to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    format!("\n{} Tesouro Direto titles\n\n{}\n", "📜".cyan().bold(), table)
}

/// Summary of one title's mark-to-market series
pub fn format_valuation(valuation: &TitleValuation) -> String {
    let mut output = format!(
        "\n{} {}\n",
        "📈".cyan().bold(),
        valuation.title.label().bold()
    );

    let position = match valuation.title.position {
        Position::Quantity(_) => "by quantity",
        Position::Invested(_) => "by amount invested",
    };
    summary_line(&mut output, "Product", valuation.title.product);
    summary_line(&mut output, "Maturity", valuation.title.maturity.format("%d/%m/%Y"));
    summary_line(
        &mut output,
        "Acquired",
        format!(
            "{} (priced {})",
            valuation.title.acquired.format("%d/%m/%Y"),
            valuation.effective_date.format("%d/%m/%Y")
        ),
    );
    summary_line(
        &mut output,
        "Quantity",
        format!("{} ({})", format_decimal_br(valuation.quantity, 6), position),
    );
    summary_line(&mut output, "Invested", format_currency(valuation.invested));

    if let Some(last) = valuation.since_acquisition.last() {
        let gain = last.value - valuation.invested;
        summary_line(
            &mut output,
            "Value",
            format!("{} on {}", format_currency(last.value), last.date.format("%d/%m/%Y")),
        );
        summary_line(&mut output, "Gross gain", signed_currency(gain));
        if let Some(pct) = gain.checked_div(valuation.invested) {
            summary_line(&mut output, "Gross return", signed_percent(pct));
        }
    }
    summary_line(
        &mut output,
        "Priced days",
        valuation.since_acquisition.len(),
    );
    output.push('\n');
    output
}

/// Cost breakdown of one title or a whole portfolio
pub fn format_costs(label: &str, costs: &CostBreakdown) -> String {
    #[derive(Tabled)]
    struct CostRow {
        #[tabled(rename = "Item")]
        item: String,
        #[tabled(rename = "Rate")]
        rate: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let rows = vec![
        CostRow {
            item: "Income tax (IR)".to_string(),
            rate: format_percent(costs.income_tax_rate),
            amount: format_currency(costs.income_tax),
        },
        CostRow {
            item: "IOF".to_string(),
            rate: format_percent(costs.transaction_tax_rate),
            amount: format_currency(costs.transaction_tax),
        },
        CostRow {
            item: "Custody fee (B3)".to_string(),
            rate: "-".to_string(),
            amount: format_currency(costs.custody_fee),
        },
        CostRow {
            item: "Total".to_string(),
            rate: String::new(),
            amount: format_currency(costs.total),
        },
    ];

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());

    let mut output = format!("\n{} Costs for {}\n\n{}\n", "💰".cyan().bold(), label.bold(), table);
    output.push_str(&format!("\n{} Summary", "━".repeat(60).bright_black()));
    summary_line(&mut output, "Business days held", costs.business_days_held);
    summary_line(&mut output, "Final value", format_currency(costs.final_value));
    summary_line(&mut output, "Gross gain", signed_currency(costs.gross_gain));
    summary_line(&mut output, "Net gain", signed_currency(costs.net_return()));
    summary_line(&mut output, "Net value", format_currency(costs.net_value()));
    output.push('\n');
    output
}

/// Per-title values plus the quota summary of a portfolio
pub fn format_portfolio(valuation: &PortfolioValuation) -> String {
    #[derive(Tabled)]
    struct HoldingRow {
        #[tabled(rename = "Title")]
        label: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Invested")]
        invested: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Return")]
        gross_return: String,
    }

    let rows: Vec<HoldingRow> = valuation
        .titles
        .iter()
        .map(|t| {
            let last = t.since_acquisition.last().map(|p| p.value);
            HoldingRow {
                label: t.title.label(),
                quantity: format_decimal_br(t.quantity, 6),
                invested: format_currency(t.invested),
                value: last.map(format_currency).unwrap_or_else(|| "N/A".to_string()),
                gross_return: last
                    .and_then(|v| (v - t.invested).checked_div(t.invested))
                    .map(signed_percent)
                    .unwrap_or_else(|| "N/A".to_string()),
            }
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());

    let mut output = format!("\n{} Portfolio\n\n{}\n", "📊".cyan().bold(), table);
    output.push_str(&format_quota_summary(&valuation.quotas));
    output
}

fn format_quota_summary(quotas: &QuotaSeries) -> String {
    let mut output = format!("\n{} Quota", "━".repeat(60).bright_black());
    if let (Some(first), Some(last)) = (quotas.first(), quotas.last()) {
        summary_line(
            &mut output,
            "Period",
            format!(
                "{} to {} ({} days)",
                first.date.format("%d/%m/%Y"),
                last.date.format("%d/%m/%Y"),
                quotas.len()
            ),
        );
        summary_line(&mut output, "Market value", format_currency(last.total_mtm));
        summary_line(&mut output, "Quotas", format_decimal_br(last.quota_count, 6));
        summary_line(&mut output, "Quota price", format_decimal_br(last.quota_price, 6));
        summary_line(&mut output, "Cumulative return", signed_percent(quotas.cumulative_return()));
    }
    for (name, periods) in TRAILING_WINDOWS {
        let value = quotas
            .trailing_return(periods)
            .map(signed_percent)
            .unwrap_or_else(|| "N/A".to_string());
        summary_line(&mut output, &format!("Trailing {}", name), value);
    }
    output.push('\n');
    output
}

/// Trailing returns keyed by window name, for JSON output
pub fn trailing_returns(quotas: &QuotaSeries) -> BTreeMap<&'static str, Option<Decimal>> {
    TRAILING_WINDOWS
        .iter()
        .map(|(name, periods)| (*name, quotas.trailing_return(*periods)))
        .collect()
}

pub fn format_rates_table(label: &str, history: &[RateObservation]) -> String {
    #[derive(Tabled)]
    struct RateRowView {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Buy rate")]
        buy: String,
        #[tabled(rename = "Sell rate")]
        sell: String,
    }

    let rate = |r: Option<Decimal>| {
        r.map(|v| format!("{}%", format_decimal_br(v, 2)))
            .unwrap_or_else(|| "-".to_string())
    };
    let rows: Vec<RateRowView> = history
        .iter()
        .map(|obs| RateRowView {
            date: obs.date.format("%d/%m/%Y").to_string(),
            buy: rate(obs.buy_rate),
            sell: rate(obs.sell_rate),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    format!("\n{} Rates for {}\n\n{}\n", "📉".cyan().bold(), label.bold(), table)
}

pub fn format_movements_table(kind: &str, totals: &BTreeMap<String, Decimal>) -> String {
    if totals.is_empty() {
        return format!("{} No {} movements found\n", "ℹ".blue().bold(), kind);
    }

    #[derive(Tabled)]
    struct MovementView {
        #[tabled(rename = "Bond")]
        label: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
    }

    let rows: Vec<MovementView> = totals
        .iter()
        .map(|(label, qty)| MovementView {
            label: label.clone(),
            quantity: format_decimal_br(*qty, 2),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    format!("\n{} Total {} quantity per bond\n\n{}\n", "📦".cyan().bold(), kind, table)
}

/// Quantity per movement date (rows) and bond (columns)
pub fn format_movement_pivot(kind: &str, pivot: &MovementPivot) -> String {
    if pivot.by_date.is_empty() {
        return format!("{} No {} movements found\n", "ℹ".blue().bold(), kind);
    }

    let labels = pivot.labels();
    let mut builder = Builder::default();
    builder.push_record(std::iter::once("Date".to_string()).chain(labels.iter().cloned()));
    for (date, quantities) in &pivot.by_date {
        let mut record = vec![date.format("%d/%m/%Y").to_string()];
        record.extend(labels.iter().map(|label| {
            quantities
                .get(label)
                .map(|qty| format_decimal_br(*qty, 2))
                .unwrap_or_else(|| "-".to_string())
        }));
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    format!("\n{} {} quantity per date\n\n{}\n", "📦".cyan().bold(), kind, table)
}
