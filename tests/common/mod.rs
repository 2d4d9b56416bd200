#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use payoffs::engine::leg::LegConfig;
use payoffs::engine::price::Price;
use payoffs::engine::types::{FeeSchedule, QuoteError, QuoteSource, Side, StaticQuotes};
use payoffs::symbols::OccParser;

pub fn cents(raw: i64) -> Price {
    Price::new(raw, 100).unwrap()
}

pub fn expiration() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 19).unwrap()
}

/// Shared defaults with whole-unit ticks: 40-point grids that stay easy to
/// hand-check. Strike 100 legs sweep [80.00, 120.00).
pub fn whole_tick_config(quotes: Arc<dyn QuoteSource>) -> LegConfig {
    LegConfig {
        side: Side::Long,
        price_range: cents(2000),
        tick_size: cents(100),
        parser: Arc::new(OccParser),
        fees: Arc::new(FeeSchedule::standard(100).unwrap()),
        quotes,
    }
}

/// Shared defaults at the standard cent tick: 4000-point grids.
pub fn cent_tick_config(quotes: Arc<dyn QuoteSource>) -> LegConfig {
    LegConfig {
        tick_size: cents(1),
        ..whole_tick_config(quotes)
    }
}

pub fn no_quotes() -> Arc<dyn QuoteSource> {
    Arc::new(StaticQuotes::new())
}

/// A quote source with no working backend: every lookup fails.
#[derive(Debug)]
pub struct FailingQuotes;

impl QuoteSource for FailingQuotes {
    fn premium(&self, symbol: &str, _scale: i64) -> Result<Price, QuoteError> {
        Err(QuoteError::Unavailable {
            symbol: symbol.to_string(),
        })
    }
}
