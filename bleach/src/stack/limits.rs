use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stack::Pixel;

/// Valid intensity range of a stack.
///
/// `high` is the normalization divisor for the ratio and exponential
/// correctors; both bounds clip every corrector's output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct ContrastLimits {
    low: f64,
    high: f64,
}

impl ContrastLimits {
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(Error::ContrastLimits { low, high });
        }
        Ok(Self { low, high })
    }

    /// Full representable range for integer types, `[0, 1]` for floats.
    pub fn for_dtype<T: Pixel>() -> Self {
        if T::DTYPE.is_integer() {
            Self {
                low: T::MIN,
                high: T::MAX,
            }
        } else {
            Self {
                low: 0.0,
                high: 1.0,
            }
        }
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Clamps into `[low, high]`. Infinities saturate to the matching bound,
    /// NaN saturates to `high`.
    #[inline]
    pub fn clip(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.high
        } else {
            value.clamp(self.low, self.high)
        }
    }
}

impl TryFrom<(f64, f64)> for ContrastLimits {
    type Error = Error;

    fn try_from((low, high): (f64, f64)) -> Result<Self> {
        Self::new(low, high)
    }
}

impl From<ContrastLimits> for (f64, f64) {
    fn from(limits: ContrastLimits) -> Self {
        (limits.low, limits.high)
    }
}
