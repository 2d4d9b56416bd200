use std::io::{self, Write};

use thiserror::Error;

use crate::engine::leg::Leg;
use crate::engine::multi::MultiLeg;
use crate::engine::price::Price;
use crate::engine::types::{EngineError, PayoffCurve};

/// The capability a renderable position exposes: a raw payoff curve plus the
/// cost and premium scalars. Implemented by both [`Leg`] and [`MultiLeg`] so
/// one render path serves both.
pub trait Profile {
    fn payoffs(&mut self) -> Result<&PayoffCurve, EngineError>;
    fn cost(&mut self) -> Result<Price, EngineError>;
    fn premium(&mut self) -> Result<Price, EngineError>;
}

impl Profile for Leg {
    fn payoffs(&mut self) -> Result<&PayoffCurve, EngineError> {
        Leg::payoffs(self)
    }

    fn cost(&mut self) -> Result<Price, EngineError> {
        Leg::cost(self)
    }

    fn premium(&mut self) -> Result<Price, EngineError> {
        Leg::premium(self)
    }
}

impl Profile for MultiLeg {
    fn payoffs(&mut self) -> Result<&PayoffCurve, EngineError> {
        MultiLeg::payoffs(self)
    }

    fn cost(&mut self) -> Result<Price, EngineError> {
        MultiLeg::cost(self)
    }

    fn premium(&mut self) -> Result<Price, EngineError> {
        MultiLeg::premium(self)
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("chart output failed: {0}")]
    Io(#[from] io::Error),
}

/// Presentation choices. Whether cost and premium are netted into the
/// displayed curve is decided here, not inside the cached curves.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub y_pad: f64,
    pub y_limits: Option<(f64, f64)>,
    pub include_cost: bool,
    pub include_premium: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            y_pad: 2.0,
            y_limits: None,
            include_cost: true,
            include_premium: true,
        }
    }
}

/// The displayed curve: the raw payoff minus cost and premium according to
/// the options, computed exactly in fixed point.
pub fn net_curve<P>(profile: &mut P, options: &PlotOptions) -> Result<PayoffCurve, EngineError>
where
    P: Profile + ?Sized,
{
    let mut deduction: Option<Price> = None;
    if options.include_cost {
        deduction = Some(profile.cost()?);
    }
    if options.include_premium {
        let premium = profile.premium()?;
        deduction = Some(match deduction {
            Some(deduction) => deduction.add(premium)?,
            None => premium,
        });
    }

    let mut curve = profile.payoffs()?.clone();
    if let Some(deduction) = deduction {
        for payoff in curve.values_mut() {
            *payoff = payoff.sub(deduction)?;
        }
    }
    Ok(curve)
}

/// What a chart backend receives: float points in grid order and the y-axis
/// window to draw them in.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub points: Vec<(f64, f64)>,
    pub y_lim: (f64, f64),
}

/// Pure consumer of a prepared series; no feedback into the engine.
pub trait ChartBackend {
    fn draw(&mut self, series: &PlotSeries) -> Result<(), RenderError>;
}

/// Net the curve, frame it, and hand it to the backend. Y-limits default to
/// the curve extremes padded by `y_pad` unless explicitly overridden.
pub fn render<P, B>(
    profile: &mut P,
    options: &PlotOptions,
    backend: &mut B,
) -> Result<(), RenderError>
where
    P: Profile + ?Sized,
    B: ChartBackend + ?Sized,
{
    let curve = net_curve(profile, options)?;
    let points: Vec<(f64, f64)> = curve
        .iter()
        .map(|(price, payoff)| (price.to_f64(), payoff.to_f64()))
        .collect();

    let y_lim = match options.y_limits {
        Some(limits) => limits,
        None => {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &(_, y) in &points {
                lo = lo.min(y);
                hi = hi.max(y);
            }
            (lo - options.y_pad, hi + options.y_pad)
        }
    };

    backend.draw(&PlotSeries { points, y_lim })
}

/// Character-grid chart for terminals: payoff marks, a zero line, y labels
/// on the left edge and the price span along the bottom.
#[derive(Debug)]
pub struct TextChart<W> {
    out: W,
    width: usize,
    height: usize,
}

impl<W: Write> TextChart<W> {
    pub fn new(out: W) -> Self {
        Self::with_size(out, 72, 20)
    }

    pub fn with_size(out: W, width: usize, height: usize) -> Self {
        Self {
            out,
            width: width.max(2),
            height: height.max(2),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn row_for(&self, y: f64, y_lim: (f64, f64)) -> usize {
        let (lo, hi) = y_lim;
        let span = (hi - lo).max(f64::EPSILON);
        let row = ((hi - y) / span * (self.height - 1) as f64).round();
        (row.max(0.0) as usize).min(self.height - 1)
    }
}

impl<W: Write> ChartBackend for TextChart<W> {
    fn draw(&mut self, series: &PlotSeries) -> Result<(), RenderError> {
        if series.points.is_empty() {
            return Ok(());
        }

        let (y_lo, y_hi) = series.y_lim;
        let mut grid = vec![vec![' '; self.width]; self.height];

        let zero_row = (y_lo <= 0.0 && 0.0 <= y_hi).then(|| self.row_for(0.0, series.y_lim));
        if let Some(row) = zero_row {
            for cell in &mut grid[row] {
                *cell = '-';
            }
        }

        // One sample per column, payoff marks overwrite the zero line.
        let last = series.points.len() - 1;
        for col in 0..self.width {
            let index = col * last / (self.width - 1);
            let (_, y) = series.points[index];
            if y >= y_lo && y <= y_hi {
                grid[self.row_for(y, series.y_lim)][col] = '*';
            }
        }

        for (row, cells) in grid.iter().enumerate() {
            let line: String = cells.iter().collect();
            let label = if row == 0 {
                format!("{y_hi:>9.2}")
            } else if row == self.height - 1 {
                format!("{y_lo:>9.2}")
            } else if zero_row == Some(row) {
                format!("{:>9.2}", 0.0)
            } else {
                " ".repeat(9)
            };
            writeln!(self.out, "{label} |{line}")?;
        }

        let dashes: String = "-".repeat(self.width);
        writeln!(self.out, "{} +{dashes}", " ".repeat(9))?;

        let (x_lo, _) = series.points[0];
        let (x_hi, _) = series.points[last];
        writeln!(
            self.out,
            "{} {x_lo:<.2}{:>pad$.2}",
            " ".repeat(9),
            x_hi,
            pad = self.width.saturating_sub(format!("{x_lo:<.2}").len())
        )?;

        Ok(())
    }
}
