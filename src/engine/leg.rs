use std::sync::Arc;

use chrono::NaiveDate;

use super::price::{Price, PriceRange};
use super::types::{
    CostModel, CurveCache, EngineError, FeeSchedule, OptionType, PayoffCurve, QuoteSource, Side,
};
use crate::symbols::{ParsedSymbol, SymbolParser};

/// Shared construction defaults for the legs of a strategy.
#[derive(Debug, Clone)]
pub struct LegConfig {
    pub side: Side,
    /// Half-width of the price grid around the strike.
    pub price_range: Price,
    pub tick_size: Price,
    pub parser: Arc<dyn SymbolParser>,
    pub fees: Arc<dyn CostModel>,
    pub quotes: Arc<dyn QuoteSource>,
}

impl LegConfig {
    /// Long side, 20-unit half-width, 0.01 ticks, standard fee schedule.
    pub fn standard(
        scale: i64,
        parser: Arc<dyn SymbolParser>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            side: Side::Long,
            price_range: Price::new(20, 1)?.rescale(scale)?,
            tick_size: Price::new(1, 100)?.rescale(scale)?,
            parser,
            fees: Arc::new(FeeSchedule::standard(scale)?),
            quotes,
        })
    }

    pub fn with_overrides(&self, overrides: &LegOverrides) -> Self {
        let mut config = self.clone();
        if let Some(side) = overrides.side {
            config.side = side;
        }
        if let Some(price_range) = overrides.price_range {
            config.price_range = price_range;
        }
        if let Some(tick_size) = overrides.tick_size {
            config.tick_size = tick_size;
        }
        config
    }
}

/// Per-leg replacements for individual [`LegConfig`] fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegOverrides {
    pub side: Option<Side>,
    pub price_range: Option<Price>,
    pub tick_size: Option<Price>,
}

/// One option contract, fully identified. Either supplied directly or
/// recovered from a raw symbol by a [`SymbolParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub symbol: String,
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: Price,
}

impl ContractSpec {
    pub fn from_parsed(symbol: &str, parsed: ParsedSymbol) -> Self {
        Self {
            symbol: symbol.trim().to_string(),
            underlying: parsed.underlying,
            expiration: parsed.expiration,
            option_type: parsed.option_type,
            strike: parsed.strike,
        }
    }
}

/// One option position: a contract, a direction, and a local price grid.
///
/// The payoff curve, cost, and premium are each computed once and cached.
/// The curve cache is invalidated by [`Leg::reset_grid_range`]; cost and
/// premium do not depend on the grid and survive resets.
#[derive(Debug)]
pub struct Leg {
    symbol: String,
    underlying: String,
    expiration: NaiveDate,
    option_type: OptionType,
    side: Side,
    strike: Price,
    price_range: Price,
    tick_size: Price,
    start: Price,
    stop: Price,
    fees: Arc<dyn CostModel>,
    quotes: Arc<dyn QuoteSource>,
    generation: u64,
    curve: CurveCache,
    cost: Option<Price>,
    premium: Option<Price>,
}

impl Leg {
    /// Build a leg from explicit parts. The strike is rescaled exactly onto
    /// the tick grid; any validation failure aborts construction.
    pub fn new(
        contract: ContractSpec,
        side: Side,
        price_range: Price,
        tick_size: Price,
        fees: Arc<dyn CostModel>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Result<Self, EngineError> {
        if tick_size.raw() <= 0 {
            return Err(EngineError::NonPositiveTick { tick: tick_size });
        }
        if price_range.raw() <= 0 {
            return Err(EngineError::NonPositiveRange { range: price_range });
        }
        let strike = contract.strike.rescale(tick_size.scale())?;
        let start = strike.sub(price_range)?;
        let stop = strike.add(price_range)?;
        // The grid must be constructible up front, never lazily nonsensical.
        PriceRange::new(start, stop, tick_size)?;

        Ok(Self {
            symbol: contract.symbol,
            underlying: contract.underlying,
            expiration: contract.expiration,
            option_type: contract.option_type,
            side,
            strike,
            price_range,
            tick_size,
            start,
            stop,
            fees,
            quotes,
            generation: 0,
            curve: CurveCache::default(),
            cost: None,
            premium: None,
        })
    }

    /// Build a leg from a raw symbol routed through the configured parser.
    pub fn from_symbol(symbol: &str, config: &LegConfig) -> Result<Self, EngineError> {
        let parsed = config.parser.parse(symbol)?;
        Self::with_config(ContractSpec::from_parsed(symbol, parsed), config)
    }

    pub fn with_config(contract: ContractSpec, config: &LegConfig) -> Result<Self, EngineError> {
        Self::new(
            contract,
            config.side,
            config.price_range,
            config.tick_size,
            config.fees.clone(),
            config.quotes.clone(),
        )
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    pub fn expiration(&self) -> NaiveDate {
        self.expiration
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn strike(&self) -> Price {
        self.strike
    }

    pub fn price_range(&self) -> Price {
        self.price_range
    }

    pub fn tick_size(&self) -> Price {
        self.tick_size
    }

    pub fn start(&self) -> Price {
        self.start
    }

    pub fn stop(&self) -> Price {
        self.stop
    }

    /// Raw intrinsic-value curve over the half-open grid `[start, stop)`:
    /// `max(p - strike, 0)` for calls, `max(strike - p, 0)` for puts,
    /// negated when short. Cost and premium are not netted here; that is a
    /// presentation decision made at render time.
    pub fn payoffs(&mut self) -> Result<&PayoffCurve, EngineError> {
        let (start, stop, tick) = (self.start, self.stop, self.tick_size);
        let (strike, option_type, side) = (self.strike, self.option_type, self.side);
        self.curve.get_or_compute(self.generation, || {
            compute_curve(start, stop, tick, strike, option_type, side)
        })
    }

    /// Trading cost for this leg alone, cached after the first resolution.
    pub fn cost(&mut self) -> Result<Price, EngineError> {
        if let Some(cost) = self.cost {
            return Ok(cost);
        }
        let cost = self.fees.cost(1)?;
        self.cost = Some(cost);
        Ok(cost)
    }

    /// Current market premium, negated when short. An unavailable quote is
    /// degraded to an explicit zero, cached, and logged; it never aborts the
    /// computation and never leaves a partial value behind.
    pub fn premium(&mut self) -> Result<Price, EngineError> {
        if let Some(premium) = self.premium {
            return Ok(premium);
        }
        let scale = self.tick_size.scale();
        let premium = match self.quotes.premium(&self.symbol, scale) {
            Ok(quote) => {
                let quote = quote.rescale(scale)?;
                if self.side.is_short() {
                    quote.neg()?
                } else {
                    quote
                }
            }
            Err(err) => {
                tracing::warn!(
                    symbol = %self.symbol,
                    error = %err,
                    "premium unavailable, treating as zero"
                );
                self.tick_size.zero_like()
            }
        };
        self.premium = Some(premium);
        Ok(premium)
    }

    /// Replace the grid boundaries and invalidate the cached payoff curve.
    /// Cost and premium caches are unaffected.
    pub fn reset_grid_range(&mut self, start: Price, stop: Price) -> Result<(), EngineError> {
        PriceRange::new(start, stop, self.tick_size)?;
        self.start = start;
        self.stop = stop;
        self.generation += 1;
        Ok(())
    }
}

fn compute_curve(
    start: Price,
    stop: Price,
    tick: Price,
    strike: Price,
    option_type: OptionType,
    side: Side,
) -> Result<PayoffCurve, EngineError> {
    let grid = PriceRange::new(start, stop, tick)?;
    let zero = strike.zero_like();
    let mut curve = PayoffCurve::new();
    for price in &grid {
        let intrinsic = match option_type {
            OptionType::Call => price.sub(strike)?,
            OptionType::Put => strike.sub(price)?,
        };
        let intrinsic = if intrinsic.is_negative() { zero } else { intrinsic };
        let payoff = match side {
            Side::Long => intrinsic,
            Side::Short => intrinsic.neg()?,
        };
        curve.insert(price, payoff);
    }
    Ok(curve)
}
