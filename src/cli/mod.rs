use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "tesouro")]
#[command(
    version,
    about = "Brazilian Tesouro Direto valuation with quota returns and net-of-tax estimates"
)]
#[command(
    long_about = "Value Tesouro Direto holdings against the public Tesouro Transparente feed, \
                  compose them into a quota series and estimate income tax, IOF and custody fee."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Config file (defaults to <config dir>/tesouro/config.toml)
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Read the feed CSV from disk instead of downloading it
    #[arg(long = "feed-file", global = true, value_name = "PATH")]
    pub feed_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Identifies one holding on the command line
#[derive(Args, Debug, Clone)]
pub struct TitleArgs {
    /// Product name, e.g. "Tesouro Selic" or "Tesouro IPCA+ com Juros Semestrais"
    pub product: String,

    /// Maturity date (YYYY-MM-DD or DD/MM/YYYY)
    pub maturity: String,

    /// Acquisition date (YYYY-MM-DD or DD/MM/YYYY)
    pub acquired: String,

    /// Units held
    #[arg(long, conflicts_with = "invested", required_unless_present = "invested")]
    pub quantity: Option<String>,

    /// Cash invested on the acquisition date
    #[arg(long)]
    pub invested: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the product name to ticker nomenclature
    Titles,

    /// Mark-to-market summary of one title
    Value {
        #[command(flatten)]
        title: TitleArgs,
    },

    /// Income tax, IOF and custody fee of one title held until the last feed date
    Costs {
        #[command(flatten)]
        title: TitleArgs,

        /// Charge the B3 custody fee (also enabled by `costs.custody_fee` in config)
        #[arg(long)]
        custody: bool,
    },

    /// Quota series and trailing returns of a portfolio file
    Portfolio {
        /// TOML file with [[title]] tables
        file: PathBuf,

        /// Also estimate income tax, IOF and custody fee for the whole portfolio
        #[arg(long)]
        costs: bool,

        /// Charge the B3 custody fee with --costs (also enabled by `costs.custody_fee` in config)
        #[arg(long, requires = "costs")]
        custody: bool,
    },

    /// Morning buy/sell rate history of one bond
    Rates {
        /// Product name
        product: String,

        /// Maturity date (YYYY-MM-DD or DD/MM/YYYY)
        maturity: String,
    },

    /// Sale or repurchase totals per bond
    Movements {
        /// Which feed: sale (venda) or repurchase (resgate)
        kind: String,

        /// Only bonds maturing after, and movements dated after, this date
        #[arg(long)]
        since: Option<String>,

        /// Product-name fragment to leave out, case-insensitive; repeatable.
        /// Replaces the default list (Juros Semestrais, Educa+, RendA+)
        #[arg(long, value_name = "FRAGMENT", conflicts_with = "all")]
        exclude: Vec<String>,

        /// Keep every product, ignoring the default exclusions
        #[arg(long)]
        all: bool,

        /// Show quantities per movement date instead of totals
        #[arg(long)]
        by_date: bool,
    },
}
