use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::leg::{LegConfig, LegOverrides};
use super::multi::MultiLeg;
use super::price::{Price, PriceError};
use crate::symbols::{SymbolError, SymbolParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(self) -> i64 {
        match self {
            Side::Long => 1,
            Side::Short => -1,
        }
    }

    pub fn is_short(self) -> bool {
        matches!(self, Side::Short)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

/// Ordered mapping from underlying price to payoff at expiration.
pub type PayoffCurve = BTreeMap<Price, Price>;

/// Errors from curve construction and aggregation. Construction-time errors
/// abort object creation entirely; no partially-initialized leg or strategy
/// is ever observable.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid grid range: start {start} must be below stop {stop}")]
    InvalidRange { start: Price, stop: Price },
    #[error("tick size must be positive, got {tick}")]
    NonPositiveTick { tick: Price },
    #[error("price range must be positive, got {range}")]
    NonPositiveRange { range: Price },
    #[error("fees must be non-negative, got {fee}")]
    NegativeFee { fee: Price },
    #[error("strikes must be strictly ascending: {lower} then {upper}")]
    StrikeOrder { lower: Price, upper: Price },
    #[error("a strategy needs at least one leg")]
    EmptyLegs,
    #[error(transparent)]
    Price(#[from] PriceError),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

/// Errors from a premium lookup. These never abort curve computation; the
/// engine degrades the affected leg's premium to zero and logs it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("no quote available for {symbol}")]
    Unavailable { symbol: String },
    #[error("quote source failure for {symbol}: {message}")]
    Source { symbol: String, message: String },
}

/// Broker fee schedule, pluggable per broker. Must always resolve: cost
/// materially changes breakeven, so a failure here fails the computation.
pub trait CostModel: Send + Sync + fmt::Debug {
    fn cost(&self, leg_count: usize) -> Result<Price, EngineError>;
}

/// Current market premium for an option symbol, quoted at the requested
/// scale. Implementations may block on network I/O and may fail.
pub trait QuoteSource: Send + Sync + fmt::Debug {
    fn premium(&self, symbol: &str, scale: i64) -> Result<Price, QuoteError>;
}

/// Base fee plus a per-contract fee for every contract after the first,
/// applied once per strategy with the leg count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    base_fee: Price,
    per_contract: Price,
}

impl FeeSchedule {
    pub fn new(base_fee: Price, per_contract: Price) -> Result<Self, EngineError> {
        if base_fee.scale() != per_contract.scale() {
            return Err(PriceError::ScaleMismatch {
                left: base_fee.scale(),
                right: per_contract.scale(),
            }
            .into());
        }
        if base_fee.is_negative() {
            return Err(EngineError::NegativeFee { fee: base_fee });
        }
        if per_contract.is_negative() {
            return Err(EngineError::NegativeFee { fee: per_contract });
        }
        Ok(Self { base_fee, per_contract })
    }

    /// The common retail schedule: 4.95 base, 0.65 per additional contract.
    pub fn standard(scale: i64) -> Result<Self, EngineError> {
        let base_fee = Price::new(495, 100)?.rescale(scale)?;
        let per_contract = Price::new(65, 100)?.rescale(scale)?;
        Self::new(base_fee, per_contract)
    }

    pub fn base_fee(&self) -> Price {
        self.base_fee
    }

    pub fn per_contract(&self) -> Price {
        self.per_contract
    }

    pub fn calculate(&self, leg_count: usize) -> Result<Price, EngineError> {
        if leg_count == 0 {
            return Err(EngineError::EmptyLegs);
        }
        let extra = self.per_contract.mul_scalar(leg_count as i64 - 1)?;
        Ok(self.base_fee.add(extra)?)
    }
}

impl CostModel for FeeSchedule {
    fn cost(&self, leg_count: usize) -> Result<Price, EngineError> {
        self.calculate(leg_count)
    }
}

/// Quote source for when no live quote backend is configured: every premium
/// is an explicit zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoQuotes;

impl QuoteSource for NoQuotes {
    fn premium(&self, symbol: &str, scale: i64) -> Result<Price, QuoteError> {
        Price::new(0, scale).map_err(|err| QuoteError::Source {
            symbol: symbol.to_string(),
            message: err.to_string(),
        })
    }
}

/// Fixed premiums keyed by symbol. Used by the demo binary and tests in
/// place of a live trading API.
#[derive(Debug, Default, Clone)]
pub struct StaticQuotes {
    quotes: HashMap<String, f64>,
}

impl StaticQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, premium: f64) -> Self {
        self.quotes.insert(symbol.to_string(), premium);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl QuoteSource for StaticQuotes {
    fn premium(&self, symbol: &str, scale: i64) -> Result<Price, QuoteError> {
        let value = self
            .quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| QuoteError::Unavailable {
                symbol: symbol.to_string(),
            })?;
        Price::from_f64(value, scale).map_err(|err| QuoteError::Source {
            symbol: symbol.to_string(),
            message: err.to_string(),
        })
    }
}

/// Generation-stamped payoff curve cache. The owner bumps its generation on
/// any mutation that invalidates the curve (grid reset, leg append); the
/// cache recomputes when its stamp is stale and is only written with a fully
/// computed curve.
#[derive(Debug, Default)]
pub(crate) struct CurveCache {
    stamp: u64,
    curve: Option<PayoffCurve>,
}

impl CurveCache {
    pub(crate) fn get_or_compute(
        &mut self,
        generation: u64,
        compute: impl FnOnce() -> Result<PayoffCurve, EngineError>,
    ) -> Result<&PayoffCurve, EngineError> {
        let stale = self.curve.is_none() || self.stamp != generation;
        if stale {
            let curve = compute()?;
            self.stamp = generation;
            return Ok(self.curve.insert(curve));
        }
        match &self.curve {
            Some(curve) => Ok(curve),
            None => unreachable!("fresh cache holds a curve"),
        }
    }
}

fn validate_positive(value: &f64, _context: &()) -> garde::Result {
    if *value > 0.0 {
        Ok(())
    } else {
        Err(garde::Error::new(format!("must be positive, got {value}")))
    }
}

/// One leg requested by symbol.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LegRequest {
    #[garde(length(min = 1))]
    pub symbol: String,
    #[serde(default)]
    #[garde(skip)]
    pub short: bool,
}

/// External-facing profile request, validated before any fixed-point
/// conversion happens.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProfileParams {
    #[garde(length(min = 1), dive)]
    pub legs: Vec<LegRequest>,
    /// Half-width of the price grid around each strike.
    #[serde(default = "default_price_range")]
    #[garde(custom(validate_positive))]
    pub price_range: f64,
    #[serde(default = "default_tick_size")]
    #[garde(custom(validate_positive))]
    pub tick_size: f64,
    #[serde(default = "default_base_fee")]
    #[garde(range(min = 0.0))]
    pub base_fee: f64,
    #[serde(default = "default_per_contract")]
    #[garde(range(min = 0.0))]
    pub per_contract: f64,
    /// Fixed-point sub-unit count, e.g. 100 for cent precision.
    #[serde(default = "default_scale")]
    #[garde(range(min = 1))]
    pub scale: i64,
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub include_cost: bool,
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub include_premium: bool,
    #[serde(default = "default_y_pad")]
    #[garde(range(min = 0.0))]
    pub y_pad: f64,
    #[serde(default)]
    #[garde(skip)]
    pub y_limits: Option<(f64, f64)>,
}

fn default_price_range() -> f64 {
    20.0
}

fn default_tick_size() -> f64 {
    0.01
}

fn default_base_fee() -> f64 {
    4.95
}

fn default_per_contract() -> f64 {
    0.65
}

fn default_scale() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_y_pad() -> f64 {
    2.0
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            legs: Vec::new(),
            price_range: default_price_range(),
            tick_size: default_tick_size(),
            base_fee: default_base_fee(),
            per_contract: default_per_contract(),
            scale: default_scale(),
            include_cost: true,
            include_premium: true,
            y_pad: default_y_pad(),
            y_limits: None,
        }
    }
}

impl ProfileParams {
    /// Assemble the strategy these params describe. Call `validate()` first;
    /// conversion assumes the numeric bounds hold.
    pub fn to_multi_leg(
        &self,
        parser: Arc<dyn SymbolParser>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Result<MultiLeg, EngineError> {
        let price_range = Price::from_f64(self.price_range, self.scale)?;
        let tick_size = Price::from_f64(self.tick_size, self.scale)?;
        let fees = Arc::new(FeeSchedule::new(
            Price::from_f64(self.base_fee, self.scale)?,
            Price::from_f64(self.per_contract, self.scale)?,
        )?);
        let config = LegConfig {
            side: Side::Long,
            price_range,
            tick_size,
            parser,
            fees,
            quotes,
        };
        let mut strategy = MultiLeg::new(config);
        for leg in &self.legs {
            let overrides = leg.short.then(|| LegOverrides {
                side: Some(Side::Short),
                ..LegOverrides::default()
            });
            strategy.add_symbol(&leg.symbol, overrides.as_ref())?;
        }
        Ok(strategy)
    }
}
