//! Routes parsed clap commands to the engine and prints the result.

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::info;

use crate::cli::formatters;
use crate::cli::{Cli, Commands, TitleArgs};
use tesouro::config::Config;
use tesouro::costs::CostEngine;
use tesouro::feed::{
    fetch_price_feed, movement_pivot, parse_movement_feed, read_feed_file, FeedKind, RateFeed,
    DEFAULT_EXCLUSIONS,
};
use tesouro::models::{CostBreakdown, Portfolio, Position, Title};
use tesouro::portfolio_file::load_portfolio;
use tesouro::quota::value_portfolio;
use tesouro::tesouro::{nomenclature, parse_date_flexible, ProductType};
use tesouro::valuation::value_title;

pub fn dispatch_command(cli: &Cli, config: &Config) -> Result<()> {
    match &cli.command {
        Commands::Titles => dispatch_titles(cli.json),
        Commands::Value { title } => dispatch_value(cli, config, title),
        Commands::Costs { title, custody } => {
            dispatch_costs(cli, config, title, *custody || config.costs.custody_fee)
        }
        Commands::Portfolio {
            file,
            costs,
            custody,
        } => {
            let custody = *costs && (*custody || config.costs.custody_fee);
            dispatch_portfolio(cli, config, file, *costs, custody)
        }
        Commands::Rates { product, maturity } => dispatch_rates(cli, config, product, maturity),
        Commands::Movements {
            kind,
            since,
            exclude,
            all,
            by_date,
        } => {
            let exclude: Vec<&str> = if *all {
                Vec::new()
            } else if exclude.is_empty() {
                DEFAULT_EXCLUSIONS.to_vec()
            } else {
                exclude.iter().map(String::as_str).collect()
            };
            dispatch_movements(cli, config, kind, since.as_deref(), &exclude, *by_date)
        }
    }
}

fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).with_context(|| format!("Invalid amount: {}", raw))
}

fn title_from_args(args: &TitleArgs) -> Result<Title> {
    let position = match (&args.quantity, &args.invested) {
        (Some(q), _) => Position::Quantity(parse_amount(q)?),
        (None, Some(v)) => Position::Invested(parse_amount(v)?),
        (None, None) => return Err(anyhow!("Give --quantity or --invested")),
    };
    let title = Title::from_product_name(
        &args.product,
        parse_date_flexible(&args.maturity).context("Invalid maturity")?,
        parse_date_flexible(&args.acquired).context("Invalid acquisition date")?,
        position,
    )?;
    Ok(title)
}

fn load_rate_feed(cli: &Cli, config: &Config) -> Result<RateFeed> {
    match &cli.feed_file {
        Some(path) => {
            info!("Reading rate feed from {}", path.display());
            RateFeed::from_path(path)
        }
        None => RateFeed::fetch(&config.feed),
    }
}

fn dispatch_titles(json_output: bool) -> Result<()> {
    let table = nomenclature();
    if json_output {
        let map: BTreeMap<&str, &str> = table.iter().copied().collect();
        println!("{}", formatters::to_json(&map));
    } else {
        print!("{}", formatters::format_titles_table(&table));
    }
    Ok(())
}

fn dispatch_value(cli: &Cli, config: &Config, args: &TitleArgs) -> Result<()> {
    let title = title_from_args(args)?;
    let feed = load_rate_feed(cli, config)?;
    let valuation = value_title(&feed, &title)
        .with_context(|| format!("Failed to value {}", title.label()))?;

    if cli.json {
        println!("{}", formatters::to_json(&valuation));
    } else {
        print!("{}", formatters::format_valuation(&valuation));
    }
    Ok(())
}

fn dispatch_costs(cli: &Cli, config: &Config, args: &TitleArgs, custody: bool) -> Result<()> {
    #[derive(Serialize)]
    struct JsonCosts<'a> {
        title: String,
        custody_fee_applied: bool,
        #[serde(flatten)]
        costs: &'a CostBreakdown,
        net_return: Decimal,
        net_value: Decimal,
    }

    let title = title_from_args(args)?;
    let feed = load_rate_feed(cli, config)?;
    let valuation = value_title(&feed, &title)
        .with_context(|| format!("Failed to value {}", title.label()))?;
    let costs = CostEngine::brazilian()
        .assess_title(&valuation, custody)
        .with_context(|| format!("Failed to assess costs of {}", title.label()))?;

    if cli.json {
        let out = JsonCosts {
            title: title.label(),
            custody_fee_applied: custody,
            costs: &costs,
            net_return: costs.net_return(),
            net_value: costs.net_value(),
        };
        println!("{}", formatters::to_json(&out));
    } else {
        print!("{}", formatters::format_costs(&title.label(), &costs));
    }
    Ok(())
}

fn dispatch_portfolio(
    cli: &Cli,
    config: &Config,
    file: &std::path::Path,
    with_costs: bool,
    custody: bool,
) -> Result<()> {
    let portfolio: Portfolio = load_portfolio(file)?;
    info!("Loaded {} titles from {}", portfolio.len(), file.display());

    let feed = load_rate_feed(cli, config)?;
    let valuation = value_portfolio(&feed, &portfolio).context("Failed to value portfolio")?;
    let costs = if with_costs {
        let costs = CostEngine::brazilian()
            .assess_portfolio(&valuation, custody)
            .context("Failed to assess portfolio costs")?;
        Some(costs)
    } else {
        None
    };

    if cli.json {
        #[derive(Serialize)]
        struct JsonPortfolio<'a> {
            #[serde(flatten)]
            valuation: &'a tesouro::quota::PortfolioValuation,
            cumulative_return: Decimal,
            trailing_returns: BTreeMap<&'static str, Option<Decimal>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            costs: Option<&'a CostBreakdown>,
        }
        let out = JsonPortfolio {
            valuation: &valuation,
            cumulative_return: valuation.quotas.cumulative_return(),
            trailing_returns: formatters::trailing_returns(&valuation.quotas),
            costs: costs.as_ref(),
        };
        println!("{}", formatters::to_json(&out));
    } else {
        print!("{}", formatters::format_portfolio(&valuation));
        if let Some(costs) = &costs {
            print!("{}", formatters::format_costs("portfolio", costs));
        }
    }
    Ok(())
}

fn dispatch_rates(cli: &Cli, config: &Config, product: &str, maturity: &str) -> Result<()> {
    let product = ProductType::from_name(product)?;
    let maturity = parse_date_flexible(maturity).context("Invalid maturity")?;
    let feed = load_rate_feed(cli, config)?;
    let history = feed.rate_history(product, maturity)?;

    if cli.json {
        println!("{}", formatters::to_json(&history));
    } else {
        let label = format!("{} {}", product, maturity.format("%d/%m/%Y"));
        print!("{}", formatters::format_rates_table(&label, &history));
    }
    Ok(())
}

fn dispatch_movements(
    cli: &Cli,
    config: &Config,
    kind: &str,
    since: Option<&str>,
    exclude: &[&str],
    by_date: bool,
) -> Result<()> {
    let kind = match FeedKind::parse(kind) {
        Some(k @ (FeedKind::Sale | FeedKind::Repurchase)) => k,
        _ => return Err(anyhow!("Unknown movement feed '{}': use sale or repurchase", kind)),
    };
    let since = since
        .map(parse_date_flexible)
        .transpose()
        .context("Invalid --since date")?;

    let content = match &cli.feed_file {
        Some(path) => read_feed_file(path)?,
        None => fetch_price_feed(kind, &config.feed)?,
    };
    let rows = parse_movement_feed(kind, &content)
        .with_context(|| format!("Failed to parse Tesouro {} CSV", kind))?;
    let pivot = movement_pivot(&rows, exclude, since);

    match (by_date, cli.json) {
        (true, true) => println!("{}", formatters::to_json(&pivot.by_date)),
        (true, false) => print!("{}", formatters::format_movement_pivot(&kind.to_string(), &pivot)),
        (false, true) => println!("{}", formatters::to_json(&pivot.totals())),
        (false, false) => print!(
            "{}",
            formatters::format_movements_table(&kind.to_string(), &pivot.totals())
        ),
    }
    Ok(())
}
