use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use super::types::EngineError;

/// Fixed-point price arithmetic errors. All of these indicate misuse by the
/// caller and are not recoverable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PriceError {
    #[error("scale must be positive, got {scale}")]
    InvalidScale { scale: i64 },
    #[error("scale mismatch: {left} vs {right}")]
    ScaleMismatch { left: i64, right: i64 },
    #[error("fixed-point overflow in {op}")]
    Overflow { op: &'static str },
    #[error("cannot rescale {raw}/{from} to scale {to} without losing precision")]
    LossyRescale { raw: i64, from: i64, to: i64 },
    #[error("value {value} is not representable at scale {scale}")]
    OutOfRange { value: f64, scale: i64 },
}

/// A monetary amount stored as `raw` counts of `1/scale` currency units.
///
/// Strikes, ranges, tick sizes, costs and premiums all use this type so that
/// repeated tick-by-tick arithmetic reproduces the same grid points exactly,
/// with none of the drift binary floats accumulate. Arithmetic requires both
/// operands to share a scale; comparisons are exact across scales.
#[derive(Debug, Clone, Copy)]
pub struct Price {
    raw: i64,
    scale: i64,
}

impl Price {
    pub fn new(raw: i64, scale: i64) -> Result<Self, PriceError> {
        if scale <= 0 {
            return Err(PriceError::InvalidScale { scale });
        }
        Ok(Self { raw, scale })
    }

    /// Boundary conversion from a float, rounding to the nearest
    /// representable value. Exactness guarantees begin after this point.
    pub fn from_f64(value: f64, scale: i64) -> Result<Self, PriceError> {
        if scale <= 0 {
            return Err(PriceError::InvalidScale { scale });
        }
        let scaled = value * scale as f64;
        if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
            return Err(PriceError::OutOfRange { value, scale });
        }
        Ok(Self {
            raw: scaled.round() as i64,
            scale,
        })
    }

    pub fn raw(self) -> i64 {
        self.raw
    }

    pub fn scale(self) -> i64 {
        self.scale
    }

    pub fn to_f64(self) -> f64 {
        self.raw as f64 / self.scale as f64
    }

    /// Zero at the same scale as `self`.
    pub fn zero_like(self) -> Self {
        Self {
            raw: 0,
            scale: self.scale,
        }
    }

    pub fn is_negative(self) -> bool {
        self.raw < 0
    }

    pub fn is_positive(self) -> bool {
        self.raw > 0
    }

    fn same_scale(self, other: Self) -> Result<(), PriceError> {
        if self.scale == other.scale {
            Ok(())
        } else {
            Err(PriceError::ScaleMismatch {
                left: self.scale,
                right: other.scale,
            })
        }
    }

    pub fn add(self, other: Self) -> Result<Self, PriceError> {
        self.same_scale(other)?;
        let raw = self
            .raw
            .checked_add(other.raw)
            .ok_or(PriceError::Overflow { op: "add" })?;
        Ok(Self { raw, scale: self.scale })
    }

    pub fn sub(self, other: Self) -> Result<Self, PriceError> {
        self.same_scale(other)?;
        let raw = self
            .raw
            .checked_sub(other.raw)
            .ok_or(PriceError::Overflow { op: "sub" })?;
        Ok(Self { raw, scale: self.scale })
    }

    pub fn mul_scalar(self, factor: i64) -> Result<Self, PriceError> {
        let raw = self
            .raw
            .checked_mul(factor)
            .ok_or(PriceError::Overflow { op: "mul_scalar" })?;
        Ok(Self { raw, scale: self.scale })
    }

    pub fn neg(self) -> Result<Self, PriceError> {
        let raw = self
            .raw
            .checked_neg()
            .ok_or(PriceError::Overflow { op: "neg" })?;
        Ok(Self { raw, scale: self.scale })
    }

    /// Exact conversion to another scale. Fails rather than round: a strike
    /// quoted in mills moves onto a cent grid only if no precision is lost.
    pub fn rescale(self, scale: i64) -> Result<Self, PriceError> {
        if scale <= 0 {
            return Err(PriceError::InvalidScale { scale });
        }
        if scale == self.scale {
            return Ok(self);
        }
        let wide = i128::from(self.raw) * i128::from(scale);
        if wide % i128::from(self.scale) != 0 {
            return Err(PriceError::LossyRescale {
                raw: self.raw,
                from: self.scale,
                to: scale,
            });
        }
        let raw = i64::try_from(wide / i128::from(self.scale))
            .map_err(|_| PriceError::Overflow { op: "rescale" })?;
        Ok(Self { raw, scale })
    }

    /// The half-open grid `[start, stop)` stepped by `step`. See [`PriceRange`].
    pub fn range(start: Self, stop: Self, step: Self) -> Result<PriceRange, EngineError> {
        PriceRange::new(start, stop, step)
    }
}

// Comparisons cross-multiply in i128 so values at different scales compare
// by exact numeric value (both scales are positive, so the sign survives).
impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        i128::from(self.raw) * i128::from(other.scale)
            == i128::from(other.raw) * i128::from(self.scale)
    }
}

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        (i128::from(self.raw) * i128::from(other.scale))
            .cmp(&(i128::from(other.raw) * i128::from(self.scale)))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match decimal_digits(self.scale) {
            Some(0) => write!(f, "{}", self.raw),
            Some(digits) => {
                let sign = if self.raw < 0 { "-" } else { "" };
                let magnitude = self.raw.unsigned_abs();
                let scale = self.scale as u64;
                write!(
                    f,
                    "{sign}{}.{:0width$}",
                    magnitude / scale,
                    magnitude % scale,
                    width = digits
                )
            }
            // Non-decimal tick units render as an exact fraction.
            None => write!(f, "{}/{}", self.raw, self.scale),
        }
    }
}

/// Number of fractional digits if `scale` is a power of ten.
fn decimal_digits(scale: i64) -> Option<usize> {
    let mut value = scale;
    let mut digits = 0;
    while value % 10 == 0 {
        value /= 10;
        digits += 1;
    }
    (value == 1).then_some(digits)
}

/// A lazy, finite, restartable sequence of prices `start, start+step, ...`
/// while the value is below `stop` (half-open, `stop` itself excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRange {
    start: Price,
    stop: Price,
    step: Price,
}

impl PriceRange {
    pub fn new(start: Price, stop: Price, step: Price) -> Result<Self, EngineError> {
        if start.scale != stop.scale || start.scale != step.scale {
            return Err(PriceError::ScaleMismatch {
                left: start.scale,
                right: if start.scale == stop.scale {
                    step.scale
                } else {
                    stop.scale
                },
            }
            .into());
        }
        if step.raw <= 0 {
            return Err(EngineError::NonPositiveTick { tick: step });
        }
        if stop.raw <= start.raw {
            return Err(EngineError::InvalidRange { start, stop });
        }
        Ok(Self { start, stop, step })
    }

    pub fn start(&self) -> Price {
        self.start
    }

    pub fn stop(&self) -> Price {
        self.stop
    }

    pub fn step(&self) -> Price {
        self.step
    }

    /// Exact number of grid points.
    pub fn len(&self) -> usize {
        let span = i128::from(self.stop.raw) - i128::from(self.start.raw);
        let step = i128::from(self.step.raw);
        ((span + step - 1) / step) as usize
    }

    pub fn is_empty(&self) -> bool {
        // Construction requires stop > start, so the grid always has points.
        false
    }

    /// A fresh iterator from the start of the range.
    pub fn iter(&self) -> PriceRangeIter {
        PriceRangeIter {
            next: self.start.raw,
            stop: self.stop.raw,
            step: self.step.raw,
            scale: self.start.scale,
        }
    }
}

impl<'a> IntoIterator for &'a PriceRange {
    type Item = Price;
    type IntoIter = PriceRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct PriceRangeIter {
    next: i64,
    stop: i64,
    step: i64,
    scale: i64,
}

impl Iterator for PriceRangeIter {
    type Item = Price;

    fn next(&mut self) -> Option<Price> {
        if self.next >= self.stop {
            return None;
        }
        let current = Price {
            raw: self.next,
            scale: self.scale,
        };
        self.next = match self.next.checked_add(self.step) {
            Some(next) => next,
            None => self.stop,
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next >= self.stop {
            0
        } else {
            let span = i128::from(self.stop) - i128::from(self.next);
            let step = i128::from(self.step);
            ((span + step - 1) / step) as usize
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PriceRangeIter {}
