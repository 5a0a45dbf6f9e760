//! Empirical distribution of one frame's pixel values.

use crate::stack::Pixel;

/// Sorted distinct values of a frame and the fraction of pixels at or below each.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalCdf {
    values: Vec<f64>,
    cdf: Vec<f64>,
}

impl EmpiricalCdf {
    pub fn from_frame<T: Pixel>(frame: &[T]) -> Self {
        let values: Vec<f64> = frame.iter().map(|v| v.to_f64()).collect();
        Self::with_inverse(&values).0
    }

    /// Builds the distribution and, for every input sample, the index of its
    /// distinct value.
    ///
    /// NaN samples form one group sorted after every number. `-0.0` and `0.0`
    /// are the same value.
    pub(crate) fn with_inverse(samples: &[f64]) -> (Self, Vec<usize>) {
        let mut order: Vec<usize> = (0..samples.len()).collect();
        order.sort_unstable_by(|&a, &b| samples[a].total_cmp(&samples[b]));

        let mut values: Vec<f64> = Vec::new();
        let mut cdf: Vec<f64> = Vec::new();
        let mut inverse = vec![0; samples.len()];
        let total = samples.len() as f64;

        for (seen, &index) in order.iter().enumerate() {
            let sample = samples[index];
            let same = values
                .last()
                .is_some_and(|&last| last == sample || (last.is_nan() && sample.is_nan()));
            if !same {
                values.push(sample);
                cdf.push(0.0);
            }
            let last = cdf.len() - 1;
            cdf[last] = (seen + 1) as f64 / total;
            inverse[index] = last;
        }

        (Self { values, cdf }, inverse)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A single distinct value; every quantile maps to it.
    pub fn is_degenerate(&self) -> bool {
        self.values.len() == 1
    }

    /// Value at cumulative fraction `p`, linearly interpolated between knots.
    pub fn quantile(&self, p: f64) -> f64 {
        interp(p, &self.cdf, &self.values)
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be increasing. Below the first knot returns `fp[0]`, above the
/// last returns the last `fp`. Exact knots return their `fp` unchanged.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    debug_assert!(!xp.is_empty());

    if x.is_nan() {
        return f64::NAN;
    }
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }

    // xp[j] <= x < xp[j + 1]
    let j = xp.partition_point(|&k| k <= x) - 1;
    if x == xp[j] {
        return fp[j];
    }
    let slope = (fp[j + 1] - fp[j]) / (xp[j + 1] - xp[j]);
    fp[j] + (x - xp[j]) * slope
}
