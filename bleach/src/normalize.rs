//! Shared numeric contract of the correctors: validate the stack, lift it to
//! `f64` (optionally normalized by the upper contrast limit), and clip/cast
//! the result back to the input's element type.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::stack::{ContrastLimits, ImageStack, Pixel};

/// Correctors accept a time axis plus two or three spatial axes.
pub(crate) fn validate_stack<T: Pixel>(images: &ImageStack<T>) -> Result<()> {
    let ndim = images.ndim();
    if !(3..=4).contains(&ndim) {
        return Err(Error::Dimensionality { ndim });
    }
    Ok(())
}

/// Stack values as `f64`, unscaled.
pub(crate) fn to_f64<T: Pixel>(images: &ImageStack<T>) -> Vec<f64> {
    images.as_slice().par_iter().map(|v| v.to_f64()).collect()
}

/// Stack values divided by `limits.high()`, mapping the valid range into `[0, 1]`.
pub(crate) fn normalized<T: Pixel>(
    images: &ImageStack<T>,
    limits: &ContrastLimits,
) -> Result<Vec<f64>> {
    let high = limits.high();
    if high == 0.0 {
        return Err(Error::ZeroUpperLimit);
    }
    Ok(images
        .as_slice()
        .par_iter()
        .map(|v| v.to_f64() / high)
        .collect())
}

/// Mean over every non-time axis, one value per frame.
pub(crate) fn frame_means(values: &[f64], frame_len: usize) -> Vec<f64> {
    values
        .par_chunks_exact(frame_len)
        .map(|frame| frame.iter().sum::<f64>() / frame_len as f64)
        .collect()
}

/// Multiplies every pixel of frame `i` by `factors[i]`.
pub(crate) fn scale_frames(values: &mut [f64], frame_len: usize, factors: &[f64]) {
    debug_assert_eq!(values.len(), frame_len * factors.len());
    values
        .par_chunks_exact_mut(frame_len)
        .zip(factors.par_iter())
        .for_each(|(frame, &factor)| {
            for v in frame.iter_mut() {
                *v *= factor;
            }
        });
}

/// Clips to the contrast limits and casts back into a stack of `shape`.
pub(crate) fn restore<T: Pixel>(
    values: &[f64],
    shape: &[usize],
    limits: &ContrastLimits,
) -> ImageStack<T> {
    let data: Vec<T> = values
        .par_iter()
        .map(|&v| T::from_f64(limits.clip(v)))
        .collect();
    ImageStack::from_validated(shape.to_vec(), data)
}

/// Like [`restore`], after multiplying by `limits.high()` to undo [`normalized`].
pub(crate) fn restore_normalized<T: Pixel>(
    values: &[f64],
    shape: &[usize],
    limits: &ContrastLimits,
) -> ImageStack<T> {
    let high = limits.high();
    let data: Vec<T> = values
        .par_iter()
        .map(|&v| T::from_f64(limits.clip(v * high)))
        .collect();
    ImageStack::from_validated(shape.to_vec(), data)
}
