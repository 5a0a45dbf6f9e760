//! Bleach correction by histogram matching.
//!
//! Each frame after the first is remapped so its pixel value distribution
//! matches a reference frame: every pixel's cumulative fraction under its own
//! frame is inverted through the reference distribution. Matched values are
//! written back in the stack's element type before the next frame is
//! processed, so with [`HistogramMatch::Neighbor`] each frame is matched
//! against the already corrected frame before it.
//!
//! Intensities are not normalized; only the final clip uses the contrast limits.

mod cdf;

pub use cdf::{interp, EmpiricalCdf};

use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::correction::{Corrected, CorrectionMetadata, CorrectionMethod};
use crate::diagnostics::{Diagnostics, DiagnosticsSink};
use crate::error::{Error, Result};
use crate::normalize;
use crate::stack::{ContrastLimits, ImageStack, Pixel};

/// Which frame supplies the reference distribution.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HistogramMatch {
    /// Every frame matches frame 0.
    #[default]
    First,
    /// Frame `i` matches the corrected frame `i - 1`.
    Neighbor,
}

impl FromStr for HistogramMatch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first" => Ok(HistogramMatch::First),
            "neighbor" => Ok(HistogramMatch::Neighbor),
            other => Err(Error::UnknownMatch(other.to_string())),
        }
    }
}

/// Diagnostics of a histogram correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramReport {
    pub matching: HistogramMatch,
    /// Frames whose own pixels held a single distinct value.
    pub degenerate_frames: Vec<usize>,
}

/// Histogram correction with no diagnostics sink.
pub fn correct<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    matching: HistogramMatch,
) -> Result<Corrected<T>> {
    correct_with(images, contrast_limits, matching, &DiagnosticsSink::default())
}

pub fn correct_with<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    matching: HistogramMatch,
    sink: &DiagnosticsSink,
) -> Result<Corrected<T>> {
    normalize::validate_stack(images)?;

    let frame_len = images.frame_len();
    let mut pixels = images.as_slice().to_vec();

    let first = EmpiricalCdf::from_frame(&pixels[..frame_len]);
    let mut degenerate = vec![first.is_degenerate()];

    match matching {
        HistogramMatch::First => {
            // Frames only read frame 0's recording, which never changes.
            let rest: Vec<bool> = pixels
                .par_chunks_exact_mut(frame_len)
                .skip(1)
                .map(|frame| match_frame(frame, &first))
                .collect();
            degenerate.extend(rest);
        }
        HistogramMatch::Neighbor => {
            let mut reference = first;
            for frame in pixels.chunks_exact_mut(frame_len).skip(1) {
                degenerate.push(match_frame(frame, &reference));
                reference = EmpiricalCdf::from_frame(frame);
            }
        }
    }

    let degenerate_frames: Vec<usize> = degenerate
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d)
        .map(|(i, _)| i)
        .collect();

    let values: Vec<f64> = pixels.par_iter().map(|v| v.to_f64()).collect();
    let corrected = normalize::restore(&values, images.shape(), contrast_limits);

    tracing::debug!(
        frame_count = images.frame_count(),
        %matching,
        degenerate = degenerate_frames.len(),
        "Applied histogram matching"
    );

    let diagnostics = Diagnostics::Histogram(HistogramReport {
        matching,
        degenerate_frames,
    });
    sink.report(&diagnostics);

    Ok(Corrected {
        images: corrected,
        metadata: CorrectionMetadata::new::<T>(CorrectionMethod::Histogram { matching }, diagnostics),
    })
}

/// Remaps `frame` in place onto `reference`. Returns whether the frame's own
/// distribution was degenerate.
fn match_frame<T: Pixel>(frame: &mut [T], reference: &EmpiricalCdf) -> bool {
    let samples: Vec<f64> = frame.iter().map(|v| v.to_f64()).collect();
    let (own, inverse) = EmpiricalCdf::with_inverse(&samples);

    let matched: Vec<T> = own
        .cdf()
        .iter()
        .map(|&p| T::from_f64(reference.quantile(p)))
        .collect();
    for (pixel, &index) in frame.iter_mut().zip(&inverse) {
        *pixel = matched[index];
    }

    own.is_degenerate()
}
