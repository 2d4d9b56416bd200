//! Preset constructors for the common strategy shapes. Each returns a ready
//! [`MultiLeg`] whose legs carry synthesized OCC symbols, so premium lookups
//! work the same as for legs built from raw symbols.

use chrono::NaiveDate;

use crate::engine::leg::{ContractSpec, Leg, LegConfig};
use crate::engine::multi::MultiLeg;
use crate::engine::price::Price;
use crate::engine::types::{EngineError, OptionType, Side};
use crate::symbols::format_occ;

fn leg(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    option_type: OptionType,
    side: Side,
    strike: Price,
) -> Result<Leg, EngineError> {
    let symbol = format_occ(underlying, expiration, option_type, strike)?;
    let contract = ContractSpec {
        symbol,
        underlying: underlying.to_ascii_uppercase(),
        expiration,
        option_type,
        strike,
    };
    Leg::new(
        contract,
        side,
        config.price_range,
        config.tick_size,
        config.fees.clone(),
        config.quotes.clone(),
    )
}

fn single(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    option_type: OptionType,
    side: Side,
    strike: Price,
) -> Result<MultiLeg, EngineError> {
    let only = leg(config, underlying, expiration, option_type, side, strike)?;
    Ok(MultiLeg::with_legs(config.clone(), vec![only]))
}

fn two_legs(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    specs: [(OptionType, Side, Price); 2],
) -> Result<MultiLeg, EngineError> {
    let mut legs = Vec::with_capacity(2);
    for (option_type, side, strike) in specs {
        legs.push(leg(config, underlying, expiration, option_type, side, strike)?);
    }
    Ok(MultiLeg::with_legs(config.clone(), legs))
}

fn ascending(lower: Price, upper: Price) -> Result<(), EngineError> {
    if lower >= upper {
        return Err(EngineError::StrikeOrder { lower, upper });
    }
    Ok(())
}

// Singles

pub fn long_call(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    strike: Price,
) -> Result<MultiLeg, EngineError> {
    single(config, underlying, expiration, OptionType::Call, Side::Long, strike)
}

pub fn short_call(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    strike: Price,
) -> Result<MultiLeg, EngineError> {
    single(config, underlying, expiration, OptionType::Call, Side::Short, strike)
}

pub fn long_put(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    strike: Price,
) -> Result<MultiLeg, EngineError> {
    single(config, underlying, expiration, OptionType::Put, Side::Long, strike)
}

pub fn short_put(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    strike: Price,
) -> Result<MultiLeg, EngineError> {
    single(config, underlying, expiration, OptionType::Put, Side::Short, strike)
}

// Vertical spreads

/// Buy the lower strike call, sell the higher strike call.
pub fn bull_call_spread(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    lower: Price,
    upper: Price,
) -> Result<MultiLeg, EngineError> {
    ascending(lower, upper)?;
    two_legs(config, underlying, expiration, [
        (OptionType::Call, Side::Long, lower),
        (OptionType::Call, Side::Short, upper),
    ])
}

/// Sell the lower strike call, buy the higher strike call.
pub fn bear_call_spread(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    lower: Price,
    upper: Price,
) -> Result<MultiLeg, EngineError> {
    ascending(lower, upper)?;
    two_legs(config, underlying, expiration, [
        (OptionType::Call, Side::Short, lower),
        (OptionType::Call, Side::Long, upper),
    ])
}

/// Buy the lower strike put, sell the higher strike put.
pub fn bull_put_spread(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    lower: Price,
    upper: Price,
) -> Result<MultiLeg, EngineError> {
    ascending(lower, upper)?;
    two_legs(config, underlying, expiration, [
        (OptionType::Put, Side::Long, lower),
        (OptionType::Put, Side::Short, upper),
    ])
}

/// Sell the lower strike put, buy the higher strike put.
pub fn bear_put_spread(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    lower: Price,
    upper: Price,
) -> Result<MultiLeg, EngineError> {
    ascending(lower, upper)?;
    two_legs(config, underlying, expiration, [
        (OptionType::Put, Side::Short, lower),
        (OptionType::Put, Side::Long, upper),
    ])
}

// Straddles and strangles

/// Buy a call and a put at the same strike.
pub fn long_straddle(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    strike: Price,
) -> Result<MultiLeg, EngineError> {
    two_legs(config, underlying, expiration, [
        (OptionType::Call, Side::Long, strike),
        (OptionType::Put, Side::Long, strike),
    ])
}

/// Sell a call and a put at the same strike.
pub fn short_straddle(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    strike: Price,
) -> Result<MultiLeg, EngineError> {
    two_legs(config, underlying, expiration, [
        (OptionType::Call, Side::Short, strike),
        (OptionType::Put, Side::Short, strike),
    ])
}

/// Buy an OTM put below an OTM call.
pub fn long_strangle(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    put_strike: Price,
    call_strike: Price,
) -> Result<MultiLeg, EngineError> {
    ascending(put_strike, call_strike)?;
    two_legs(config, underlying, expiration, [
        (OptionType::Put, Side::Long, put_strike),
        (OptionType::Call, Side::Long, call_strike),
    ])
}

/// Sell an OTM put below an OTM call.
pub fn short_strangle(
    config: &LegConfig,
    underlying: &str,
    expiration: NaiveDate,
    put_strike: Price,
    call_strike: Price,
) -> Result<MultiLeg, EngineError> {
    ascending(put_strike, call_strike)?;
    two_legs(config, underlying, expiration, [
        (OptionType::Put, Side::Short, put_strike),
        (OptionType::Call, Side::Short, call_strike),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{FeeSchedule, StaticQuotes};
    use std::sync::Arc;

    fn cents(raw: i64) -> Price {
        Price::new(raw, 100).unwrap()
    }

    fn expiration() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 19).unwrap()
    }

    fn config() -> LegConfig {
        LegConfig {
            side: Side::Long,
            price_range: cents(2000),
            tick_size: cents(100),
            parser: Arc::new(crate::symbols::OccParser),
            fees: Arc::new(FeeSchedule::standard(100).unwrap()),
            quotes: Arc::new(StaticQuotes::new()),
        }
    }

    #[test]
    fn long_call_is_a_one_leg_strategy() {
        let mut strategy = long_call(&config(), "XYZ", expiration(), cents(10000)).unwrap();
        assert_eq!(strategy.len(), 1);
        assert_eq!(strategy.legs()[0].symbol(), "XYZ240119C00100000");
        assert_eq!(strategy.legs()[0].side(), Side::Long);

        let curve = strategy.payoffs().unwrap();
        assert_eq!(curve[&cents(10500)], cents(500));
    }

    #[test]
    fn bull_call_spread_legs_and_cap() {
        let mut strategy =
            bull_call_spread(&config(), "XYZ", expiration(), cents(10000), cents(10500)).unwrap();

        let sides: Vec<Side> = strategy.legs().iter().map(Leg::side).collect();
        assert_eq!(sides, vec![Side::Long, Side::Short]);

        let curve = strategy.payoffs().unwrap();
        assert_eq!(curve[&cents(9500)], cents(0));
        assert_eq!(curve[&cents(11000)], cents(500)); // capped above 105
    }

    #[test]
    fn bear_put_spread_profits_downward() {
        let mut strategy =
            bear_put_spread(&config(), "XYZ", expiration(), cents(9500), cents(10000)).unwrap();

        let curve = strategy.payoffs().unwrap();
        // Below both strikes: long 100 put pays, short 95 put costs; net 5.
        assert_eq!(curve[&cents(9000)], cents(500));
        assert_eq!(curve[&cents(10000)], cents(0));
        assert_eq!(curve[&cents(11000)], cents(0));
    }

    #[test]
    fn spreads_reject_unordered_strikes() {
        let err = bull_call_spread(&config(), "XYZ", expiration(), cents(10500), cents(10000))
            .unwrap_err();
        assert!(matches!(err, EngineError::StrikeOrder { .. }));

        let err = bull_call_spread(&config(), "XYZ", expiration(), cents(10000), cents(10000))
            .unwrap_err();
        assert!(matches!(err, EngineError::StrikeOrder { .. }));
    }

    #[test]
    fn long_straddle_is_v_shaped() {
        let mut strategy = long_straddle(&config(), "XYZ", expiration(), cents(10000)).unwrap();

        let curve = strategy.payoffs().unwrap();
        assert_eq!(curve[&cents(10000)], cents(0));
        assert_eq!(curve[&cents(9500)], cents(500)); // put side
        assert_eq!(curve[&cents(10500)], cents(500)); // call side
    }

    #[test]
    fn short_straddle_is_negated_straddle() {
        let mut long = long_straddle(&config(), "XYZ", expiration(), cents(10000)).unwrap();
        let mut short = short_straddle(&config(), "XYZ", expiration(), cents(10000)).unwrap();

        let long_curve = long.payoffs().unwrap().clone();
        for (price, payoff) in short.payoffs().unwrap() {
            assert_eq!(*payoff, long_curve[price].neg().unwrap());
        }
    }

    #[test]
    fn strangle_flat_between_strikes() {
        let mut strategy =
            long_strangle(&config(), "XYZ", expiration(), cents(9500), cents(10500)).unwrap();

        let curve = strategy.payoffs().unwrap();
        assert_eq!(curve[&cents(9500)], cents(0));
        assert_eq!(curve[&cents(10000)], cents(0));
        assert_eq!(curve[&cents(10500)], cents(0));
        assert_eq!(curve[&cents(9000)], cents(500));
        assert_eq!(curve[&cents(11000)], cents(500));
    }

    #[test]
    fn strangle_rejects_put_strike_at_or_above_call_strike() {
        let err = long_strangle(&config(), "XYZ", expiration(), cents(10500), cents(9500))
            .unwrap_err();
        assert!(matches!(err, EngineError::StrikeOrder { .. }));
    }

    #[test]
    fn synthesized_symbols_resolve_premiums() {
        let quotes = StaticQuotes::new().with("XYZ240119C00100000", 2.50);
        let config = LegConfig {
            quotes: Arc::new(quotes),
            ..config()
        };
        let mut strategy = long_call(&config, "xyz", expiration(), cents(10000)).unwrap();
        assert_eq!(strategy.premium().unwrap(), cents(250));
    }
}
