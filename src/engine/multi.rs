use std::collections::btree_map::Entry;
use std::sync::Arc;

use super::leg::{Leg, LegConfig, LegOverrides};
use super::price::Price;
use super::types::{CostModel, CurveCache, EngineError, PayoffCurve};

/// An ordered collection of legs traded as one strategy.
///
/// Aggregation first imposes a common price grid on every leg, then sums the
/// per-leg curves elementwise. Cost is one blended commission for the whole
/// strategy (the fee model applied to the leg count, not a sum of per-leg
/// costs); premium is the exact signed sum over the legs.
#[derive(Debug)]
pub struct MultiLeg {
    legs: Vec<Leg>,
    defaults: LegConfig,
    fees: Arc<dyn CostModel>,
    generation: u64,
    curve: CurveCache,
    cost: Option<(u64, Price)>,
    premium: Option<(u64, Price)>,
}

impl MultiLeg {
    /// An empty strategy; legs share `defaults` unless overridden per leg.
    /// The strategy-level fee model starts as the shared one.
    pub fn new(defaults: LegConfig) -> Self {
        let fees = defaults.fees.clone();
        Self {
            legs: Vec::new(),
            defaults,
            fees,
            generation: 0,
            curve: CurveCache::default(),
            cost: None,
            premium: None,
        }
    }

    pub fn with_legs(defaults: LegConfig, legs: Vec<Leg>) -> Self {
        let mut strategy = Self::new(defaults);
        for leg in legs {
            strategy.add_leg(leg);
        }
        strategy
    }

    /// Replace the strategy-level fee model.
    pub fn with_cost_model(mut self, fees: Arc<dyn CostModel>) -> Self {
        self.fees = fees;
        self.cost = None;
        self
    }

    /// Append a preconstructed leg. Aggregates computed earlier recompute on
    /// their next access.
    pub fn add_leg(&mut self, leg: Leg) {
        self.legs.push(leg);
        self.generation += 1;
    }

    /// Append a leg built from a raw symbol, using the shared defaults or,
    /// when given, the per-leg overrides.
    pub fn add_symbol(
        &mut self,
        symbol: &str,
        overrides: Option<&LegOverrides>,
    ) -> Result<(), EngineError> {
        let leg = match overrides {
            Some(overrides) => Leg::from_symbol(symbol, &self.defaults.with_overrides(overrides))?,
            None => Leg::from_symbol(symbol, &self.defaults)?,
        };
        self.add_leg(leg);
        Ok(())
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Cached aggregate payoff curve over the reconciled common grid.
    pub fn payoffs(&mut self) -> Result<&PayoffCurve, EngineError> {
        if self.legs.is_empty() {
            return Err(EngineError::EmptyLegs);
        }
        let legs = &mut self.legs;
        self.curve
            .get_or_compute(self.generation, || aggregate(legs))
    }

    /// Cached strategy commission: the fee model applied once with the leg
    /// count. A three-leg strategy on the standard schedule costs
    /// 4.95 + 0.65 * 2, not three separate base fees.
    pub fn cost(&mut self) -> Result<Price, EngineError> {
        if self.legs.is_empty() {
            return Err(EngineError::EmptyLegs);
        }
        if let Some((stamp, cost)) = self.cost {
            if stamp == self.generation {
                return Ok(cost);
            }
        }
        let cost = self.fees.cost(self.legs.len())?;
        self.cost = Some((self.generation, cost));
        Ok(cost)
    }

    /// Cached signed sum of the legs' premiums.
    pub fn premium(&mut self) -> Result<Price, EngineError> {
        if self.legs.is_empty() {
            return Err(EngineError::EmptyLegs);
        }
        if let Some((stamp, premium)) = self.premium {
            if stamp == self.generation {
                return Ok(premium);
            }
        }
        let mut total: Option<Price> = None;
        for leg in &mut self.legs {
            let premium = leg.premium()?;
            total = Some(match total {
                Some(total) => total.add(premium)?,
                None => premium,
            });
        }
        let total = total.ok_or(EngineError::EmptyLegs)?;
        self.premium = Some((self.generation, total));
        Ok(total)
    }
}

/// Impose the common grid and sum the per-leg curves.
///
/// The common grid runs from the lowest leg start to the lowest leg stop:
/// the narrowest stop wins, so a wider leg is truncated rather than covered
/// to its full range. Grid points a leg does not quote contribute zero.
fn aggregate(legs: &mut [Leg]) -> Result<PayoffCurve, EngineError> {
    let common_start = legs.iter().map(Leg::start).min().ok_or(EngineError::EmptyLegs)?;
    let common_stop = legs.iter().map(Leg::stop).min().ok_or(EngineError::EmptyLegs)?;

    for leg in legs.iter_mut() {
        leg.reset_grid_range(common_start, common_stop)?;
    }

    let mut total = PayoffCurve::new();
    for leg in legs.iter_mut() {
        for (&price, &payoff) in leg.payoffs()? {
            match total.entry(price) {
                Entry::Vacant(entry) => {
                    entry.insert(payoff);
                }
                Entry::Occupied(mut entry) => {
                    let sum = entry.get().add(payoff)?;
                    *entry.get_mut() = sum;
                }
            }
        }
    }
    Ok(total)
}
