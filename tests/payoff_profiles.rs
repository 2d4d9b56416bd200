//! End-to-end payoff profile scenarios: single legs, spreads, grid
//! reconciliation, the blended strategy commission, and render-time netting.
//! Expectations are hand-calculated in the comments.

use std::sync::Arc;

use payoffs::engine::leg::{Leg, LegOverrides};
use payoffs::engine::multi::MultiLeg;
use payoffs::engine::types::{
    EngineError, LegRequest, ProfileParams, Side, StaticQuotes,
};
use payoffs::render::{net_curve, PlotOptions, Profile};
use payoffs::strategies;
use payoffs::symbols::OccParser;

mod common;
use common::{cent_tick_config, cents, expiration, no_quotes, whole_tick_config, FailingQuotes};

fn raw_only() -> PlotOptions {
    PlotOptions {
        include_cost: false,
        include_premium: false,
        ..PlotOptions::default()
    }
}

#[test]
fn long_call_profile_on_unit_ticks() {
    // Strike 100, half-width 20, 1.00 ticks, no cost or premium netted.
    let config = whole_tick_config(no_quotes());
    let mut leg = Leg::from_symbol("XYZ240119C00100000", &config).unwrap();

    let curve = leg.payoffs().unwrap();
    assert_eq!(curve.len(), 40); // 2 * 20 / 1
    assert_eq!(curve[&cents(10500)], cents(500)); // 105 → 5
    assert_eq!(curve[&cents(9500)], cents(0)); // 95 → worthless
    assert_eq!(*curve.keys().last().unwrap(), cents(11900)); // stop at 120 is exclusive
    assert!(!curve.contains_key(&cents(12000)));
}

#[test]
fn short_leg_mirrors_long_leg() {
    let config = whole_tick_config(no_quotes());
    let mut long = Leg::from_symbol("XYZ240119P00100000", &config).unwrap();
    let mut short = Leg::from_symbol(
        "XYZ240119P00100000",
        &config.with_overrides(&LegOverrides {
            side: Some(Side::Short),
            ..LegOverrides::default()
        }),
    )
    .unwrap();

    let long_curve = long.payoffs().unwrap().clone();
    let short_curve = short.payoffs().unwrap();
    assert_eq!(long_curve.len(), short_curve.len());
    for (price, payoff) in short_curve {
        assert_eq!(*payoff, long_curve[price].neg().unwrap());
    }
}

#[test]
fn vertical_spread_rises_then_caps() {
    // Long 100 call + short 105 call: flat at 0 through 100, linear in
    // between, capped at exactly 5 from 105 on.
    let config = whole_tick_config(no_quotes());
    let mut spread =
        strategies::bull_call_spread(&config, "XYZ", expiration(), cents(10000), cents(10500))
            .unwrap();

    let curve = spread.payoffs().unwrap();
    for raw in (8000..=10000).step_by(100) {
        assert_eq!(curve[&cents(raw)], cents(0), "at {raw}");
    }
    assert_eq!(curve[&cents(10100)], cents(100));
    assert_eq!(curve[&cents(10400)], cents(400));
    for raw in (10500..=11900).step_by(100) {
        assert_eq!(curve[&cents(raw)], cents(500), "at {raw}");
    }
}

#[test]
fn three_leg_strategy_pays_one_blended_commission() {
    let config = whole_tick_config(no_quotes());
    let mut strategy = MultiLeg::new(config);
    strategy.add_symbol("XYZ240119C00100000", None).unwrap();
    strategy.add_symbol("XYZ240119C00105000", None).unwrap();
    strategy.add_symbol("XYZ240119P00095000", None).unwrap();

    // 4.95 + 0.65 * 2 = 6.25, not 3 * 4.95 = 14.85.
    assert_eq!(strategy.cost().unwrap(), cents(625));
}

#[test]
fn premium_sums_signed_and_degrades_missing_quotes_to_zero() {
    // Only the long leg has a live quote; the short leg's lookup fails and
    // contributes zero instead of aborting the computation.
    let quotes = Arc::new(
        StaticQuotes::new().with("XYZ240119C00100000", 2.50),
    );
    let config = whole_tick_config(quotes);
    let mut strategy = MultiLeg::new(config);
    strategy.add_symbol("XYZ240119C00100000", None).unwrap();
    strategy
        .add_symbol(
            "XYZ240119C00105000",
            Some(&LegOverrides {
                side: Some(Side::Short),
                ..LegOverrides::default()
            }),
        )
        .unwrap();

    assert_eq!(strategy.premium().unwrap(), cents(250));
}

#[test]
fn dead_quote_source_never_aborts_but_cost_still_resolves() {
    let config = whole_tick_config(Arc::new(FailingQuotes));
    let mut strategy = MultiLeg::new(config);
    strategy.add_symbol("XYZ240119C00100000", None).unwrap();

    assert_eq!(strategy.premium().unwrap(), cents(0));
    assert_eq!(strategy.cost().unwrap(), cents(495));
}

#[test]
fn mixed_width_legs_truncate_to_the_narrowest_stop() {
    // Half-widths 20 and 10 around strike 100. The common grid becomes
    // [80, 110): lowest start, but also lowest stop. The wide leg's
    // [110, 120) tail is cut off rather than the narrow leg extended.
    let config = whole_tick_config(no_quotes());
    let mut strategy = MultiLeg::new(config);
    strategy.add_symbol("XYZ240119C00100000", None).unwrap();
    strategy
        .add_symbol(
            "XYZ240119C00100000",
            Some(&LegOverrides {
                price_range: Some(cents(1000)),
                ..LegOverrides::default()
            }),
        )
        .unwrap();

    let curve = strategy.payoffs().unwrap();
    assert_eq!(*curve.keys().next().unwrap(), cents(8000));
    assert_eq!(*curve.keys().last().unwrap(), cents(10900));
    assert_eq!(curve.len(), 30);
    // Both legs quote every point of the common grid, so the sum doubles.
    assert_eq!(curve[&cents(10500)], cents(1000));
}

#[test]
fn aggregates_stay_stable_until_a_leg_is_added() {
    let config = whole_tick_config(no_quotes());
    let mut strategy = MultiLeg::new(config);
    strategy.add_symbol("XYZ240119C00100000", None).unwrap();

    let first = strategy.payoffs().unwrap().clone();
    let second = strategy.payoffs().unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(strategy.cost().unwrap(), cents(495));

    strategy
        .add_symbol(
            "XYZ240119C00105000",
            Some(&LegOverrides {
                side: Some(Side::Short),
                ..LegOverrides::default()
            }),
        )
        .unwrap();

    let after = strategy.payoffs().unwrap();
    assert_ne!(&first, after);
    assert_eq!(after[&cents(11900)], cents(500));
    assert_eq!(strategy.cost().unwrap(), cents(560)); // 4.95 + 0.65
}

#[test]
fn netted_breakeven_lands_on_an_exact_grid_point() {
    // Cent ticks: 4000 grid points. Long 100 call, 2.50 premium, 4.95 cost.
    // Breakeven is 100 + 4.95 + 2.50 = 107.45, an exact grid point with an
    // exactly zero netted payoff. Floats stepping 0.01 would miss this.
    let quotes = Arc::new(StaticQuotes::new().with("XYZ240119C00100000", 2.50));
    let config = cent_tick_config(quotes);
    let mut leg = Leg::from_symbol("XYZ240119C00100000", &config).unwrap();

    assert_eq!(leg.payoffs().unwrap().len(), 4000); // 2 * 20 / 0.01

    let netted = net_curve(&mut leg, &PlotOptions::default()).unwrap();
    assert_eq!(netted[&cents(10745)], cents(0));
    assert_eq!(netted[&cents(10744)], cents(-1));
    assert_eq!(netted[&cents(10746)], cents(1));
}

#[test]
fn raw_curves_stay_raw_when_netting_is_disabled() {
    let quotes = Arc::new(StaticQuotes::new().with("XYZ240119C00100000", 2.50));
    let config = whole_tick_config(quotes);
    let mut leg = Leg::from_symbol("XYZ240119C00100000", &config).unwrap();

    let raw = net_curve(&mut leg, &raw_only()).unwrap();
    assert_eq!(raw[&cents(10500)], cents(500));
    assert_eq!(raw[&cents(9500)], cents(0));
}

#[test]
fn profile_params_assemble_a_working_strategy() {
    let params = ProfileParams {
        legs: vec![
            LegRequest {
                symbol: "XYZ240119C00100000".to_string(),
                short: false,
            },
            LegRequest {
                symbol: "XYZ240119C00105000".to_string(),
                short: true,
            },
        ],
        tick_size: 1.0,
        ..ProfileParams::default()
    };

    let mut strategy = params
        .to_multi_leg(Arc::new(OccParser), no_quotes())
        .unwrap();

    assert_eq!(strategy.len(), 2);
    assert_eq!(strategy.legs()[0].side(), Side::Long);
    assert_eq!(strategy.legs()[1].side(), Side::Short);
    assert_eq!(strategy.cost().unwrap(), cents(560));

    let curve = strategy.payoffs().unwrap();
    assert_eq!(curve[&cents(11000)], cents(500));
}

#[test]
fn unparseable_symbol_creates_no_leg() {
    let config = whole_tick_config(no_quotes());
    let mut strategy = MultiLeg::new(config);

    let err = strategy.add_symbol("garbage", None).unwrap_err();
    assert!(matches!(err, EngineError::Symbol(_)));
    assert!(strategy.is_empty());
    assert!(matches!(strategy.payoffs(), Err(EngineError::EmptyLegs)));
}

#[test]
fn leg_and_strategy_share_the_render_interface() {
    // Both entity kinds satisfy the same capability trait, so one render
    // path serves singles and multi-leg strategies alike.
    fn max_net<P: Profile>(profile: &mut P) -> payoffs::engine::price::Price {
        let curve = net_curve(profile, &PlotOptions::default()).unwrap();
        *curve.values().max().unwrap()
    }

    let config = whole_tick_config(no_quotes());
    let mut leg = Leg::from_symbol("XYZ240119C00100000", &config).unwrap();
    let mut strategy =
        strategies::long_call(&config, "XYZ", expiration(), cents(10000)).unwrap();

    assert_eq!(max_net(&mut leg), max_net(&mut strategy));
}
