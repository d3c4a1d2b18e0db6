//! Tesouro - Brazilian Tesouro Direto portfolio valuation
//!
//! This library values government bond holdings against the public Tesouro
//! Transparente price feed, composes them into a quota (cotization) series
//! that isolates market performance from cash inflows, and estimates what the
//! investor keeps after income tax, IOF and the B3 custody fee.

pub mod calendar;
pub mod config;
pub mod costs;
pub mod error;
pub mod feed;
pub mod models;
pub mod portfolio_file;
pub mod quota;
pub mod tesouro;
pub mod utils;
pub mod valuation;

pub use error::{Result, TesouroError};
