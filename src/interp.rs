//! Bracket search and interpolation over sorted sample tables.
//!
//! [`locate`] finds the pair of samples bracketing a value by binary search
//! and reports where the value falls between them. [`interpolate`] blends the
//! matching `y` samples with that fraction. Both work on linear or
//! logarithmic spacing; cross-section tables are sampled geometrically and
//! use [`InterpMode::Log`].

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// How samples are spaced along the `x` axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpMode {
    Linear,
    Log,
}

/// Result of [`locate`]: `keys[lower] <= value <= keys[lower + 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: usize,
    /// Position of the value inside the bracket, in `[0, 1]`.
    pub fraction: f64,
}

/// Find the bracket of `keys` (ascending, at least 2 entries) containing `value`.
///
/// Values outside `[keys[0], keys[n-1]]` (or NaN) give `OutOfRange`. A value
/// equal to a sample returns that sample as a bracket edge with fraction 0,
/// or fraction 1 for the last sample.
///
/// In log mode the fraction is taken on `ln(value)`; if the bracket touches a
/// non-positive key it falls back to the linear fraction.
pub fn locate(value: f64, keys: &[f64], mode: InterpMode) -> Result<Bracket, QueryError> {
    let n = keys.len();
    if n < 2 {
        return Err(QueryError::InsufficientSamples { x_len: n, y_len: n });
    }
    let (first, last) = (keys[0], keys[n - 1]);
    if !(value >= first && value <= last) {
        return Err(QueryError::OutOfRange {
            value,
            min: first,
            max: last,
        });
    }

    // Number of keys <= value; at least 1 because value >= keys[0].
    let above = keys.partition_point(|&k| k <= value);
    let lower = (above - 1).min(n - 2);
    let (lo, hi) = (keys[lower], keys[lower + 1]);

    let fraction = if value == lo || hi == lo {
        0.0
    } else if value == hi {
        1.0
    } else {
        match mode {
            InterpMode::Log if lo > 0.0 => (value.ln() - lo.ln()) / (hi.ln() - lo.ln()),
            _ => (value - lo) / (hi - lo),
        }
    };

    Ok(Bracket { lower, fraction })
}

/// Interpolate `ys` at `x` over the sample grid `xs`.
///
/// In log mode the blend happens on `ln(y)` and is exponentiated back, except
/// when either bracketing `y` is zero or negative, where a linear blend is
/// used instead. Exact sample points return the stored value unchanged.
pub fn interpolate(x: f64, xs: &[f64], ys: &[f64], mode: InterpMode) -> Result<f64, QueryError> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return Err(QueryError::InsufficientSamples {
            x_len: xs.len(),
            y_len: ys.len(),
        });
    }

    let Bracket { lower, fraction } = locate(x, xs, mode)?;
    let (y0, y1) = (ys[lower], ys[lower + 1]);

    if fraction == 0.0 {
        return Ok(y0);
    }
    if fraction == 1.0 {
        return Ok(y1);
    }

    let y = match mode {
        InterpMode::Log if y0 > 0.0 && y1 > 0.0 => {
            ((1.0 - fraction) * y0.ln() + fraction * y1.ln()).exp()
        }
        _ => (1.0 - fraction) * y0 + fraction * y1,
    };
    Ok(y)
}
