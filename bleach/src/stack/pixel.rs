//! Element types a stack can hold and their conversions to and from `f64`.

use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Tag naming a stack's element type, reported in correction metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl Dtype {
    pub fn is_integer(self) -> bool {
        !matches!(self, Dtype::F32 | Dtype::F64)
    }
}

/// Distance to the nearest integer, in units of `f64::EPSILON * |x|`, below
/// which an `f64` counts as that integer when casting back to an integer type.
const INTEGER_SNAP_ULPS: f64 = 64.0;

/// Numeric element of an image stack.
///
/// All correction math runs in `f64`. Converting back to integers truncates
/// toward zero and saturates at the type bounds, NaN becomes zero. Values
/// within rounding noise of an integer (`x / h * h`) snap to it first.
pub trait Pixel:
    Copy + Send + Sync + PartialOrd + std::fmt::Debug + AsPrimitive<f64> + 'static
{
    const DTYPE: Dtype;

    /// Smallest representable value as `f64`.
    const MIN: f64;
    /// Largest representable value as `f64`.
    const MAX: f64;

    fn from_f64(value: f64) -> Self;

    #[inline]
    fn to_f64(self) -> f64 {
        self.as_()
    }
}

#[inline]
fn snap_to_integer(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() <= INTEGER_SNAP_ULPS * f64::EPSILON * value.abs().max(1.0) {
        rounded
    } else {
        value
    }
}

macro_rules! impl_integer_pixel {
    ($($ty:ty => $dtype:ident),+ $(,)?) => {
        $(
            impl Pixel for $ty {
                const DTYPE: Dtype = Dtype::$dtype;
                const MIN: f64 = <$ty>::MIN as f64;
                const MAX: f64 = <$ty>::MAX as f64;

                #[inline]
                fn from_f64(value: f64) -> Self {
                    snap_to_integer(value).as_()
                }
            }
        )+
    };
}

macro_rules! impl_float_pixel {
    ($($ty:ty => $dtype:ident),+ $(,)?) => {
        $(
            impl Pixel for $ty {
                const DTYPE: Dtype = Dtype::$dtype;
                const MIN: f64 = <$ty>::MIN as f64;
                const MAX: f64 = <$ty>::MAX as f64;

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value.as_()
                }
            }
        )+
    };
}

impl_integer_pixel!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i8 => I8,
    i16 => I16,
    i32 => I32,
);

impl_float_pixel!(f32 => F32, f64 => F64);
