use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use garde::Validate;
use tracing_subscriber::{self, EnvFilter};

use payoffs::engine::types::{
    LegRequest, NoQuotes, ProfileParams, QuoteSource, StaticQuotes,
};
use payoffs::render::{net_curve, render, PlotOptions, TextChart};
use payoffs::symbols::OccParser;

const USAGE: &str = "\
usage: payoffs [OPTIONS] SYMBOL [SYMBOL...]

Plot the expiration payoff profile of an option strategy. Symbols use the
OCC format (e.g. AAPL240119C00195000); prefix one with `short:` to sell
that leg.

options:
  --range N         grid half-width around each strike (default 20)
  --tick N          price grid tick size (default 0.01)
  --scale N         fixed-point sub-unit count (default 100)
  --base-fee N      commission base fee (default 4.95)
  --per-contract N  commission per additional contract (default 0.65)
  --quote SYM=P     static premium for a symbol (repeatable)
  --ypad N          y-axis padding (default 2)
  --no-cost         leave trading cost out of the displayed curve
  --no-premium      leave premium out of the displayed curve
";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        eprint!("{USAGE}");
        return Ok(());
    }

    let (params, quotes) = parse_args(args)?;

    params
        .validate()
        .map_err(|report| anyhow!("invalid parameters: {report}"))?;

    let mut strategy = params.to_multi_leg(Arc::new(OccParser), quotes)?;

    let options = PlotOptions {
        y_pad: params.y_pad,
        y_limits: params.y_limits,
        include_cost: params.include_cost,
        include_premium: params.include_premium,
    };

    let stdout = std::io::stdout();
    let mut chart = TextChart::new(stdout.lock());
    render(&mut strategy, &options, &mut chart)?;
    drop(chart);

    let netted = net_curve(&mut strategy, &options)?;
    let best = netted.values().max().copied();
    let worst = netted.values().min().copied();

    println!();
    println!("legs:       {}", strategy.len());
    println!("cost:       {}", strategy.cost()?);
    println!("premium:    {}", strategy.premium()?);
    if let (Some(best), Some(worst)) = (best, worst) {
        println!("max profit: {best}");
        println!("max loss:   {worst}");
    }

    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<(ProfileParams, Arc<dyn QuoteSource>)> {
    let mut params = ProfileParams::default();
    let mut quotes = StaticQuotes::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--range" => params.price_range = value(&mut iter, "--range")?,
            "--tick" => params.tick_size = value(&mut iter, "--tick")?,
            "--scale" => params.scale = value(&mut iter, "--scale")?,
            "--base-fee" => params.base_fee = value(&mut iter, "--base-fee")?,
            "--per-contract" => params.per_contract = value(&mut iter, "--per-contract")?,
            "--ypad" => params.y_pad = value(&mut iter, "--ypad")?,
            "--no-cost" => params.include_cost = false,
            "--no-premium" => params.include_premium = false,
            "--quote" => {
                let spec: String = value(&mut iter, "--quote")?;
                let (symbol, premium) = spec
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--quote expects SYMBOL=PREMIUM, got {spec:?}"))?;
                let premium: f64 = premium
                    .parse()
                    .map_err(|err| anyhow!("bad premium in {spec:?}: {err}"))?;
                quotes = quotes.with(symbol, premium);
            }
            flag if flag.starts_with('-') => bail!("unknown option {flag:?}\n{USAGE}"),
            symbol => {
                let (symbol, short) = match symbol.strip_prefix("short:") {
                    Some(rest) => (rest, true),
                    None => (symbol, false),
                };
                params.legs.push(LegRequest {
                    symbol: symbol.to_string(),
                    short,
                });
            }
        }
    }

    let quotes: Arc<dyn QuoteSource> = if quotes.is_empty() {
        Arc::new(NoQuotes)
    } else {
        Arc::new(quotes)
    };
    Ok((params, quotes))
}

fn value<T>(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = iter
        .next()
        .ok_or_else(|| anyhow!("{flag} needs a value"))?;
    raw.parse()
        .map_err(|err| anyhow!("bad value for {flag}: {err}"))
}
