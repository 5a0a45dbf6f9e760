//! Bleach correction by the simple ratio method.
//!
//! Every frame is scaled by the ratio of the first frame's mean intensity to
//! its own, after subtracting a background level:
//!
//! ```text
//! I'_i(x, y) = (mean(I_0) - b) / (mean(I_i) - b) * (I_i(x, y) - b)
//! ```
//!
//! Intensities are normalized by the upper contrast limit, so `b` lives in
//! `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::correction::{Corrected, CorrectionMetadata, CorrectionMethod};
use crate::diagnostics::{Diagnostics, DiagnosticsSink};
use crate::error::{Error, Result};
use crate::normalize;
use crate::stack::{ContrastLimits, ImageStack, Pixel};

/// Frames whose mean intensity equals the background level.
///
/// Their ratio is non-finite; the resulting pixel values saturate at the
/// contrast limits when clipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndeterminateRatio {
    pub frames: Vec<usize>,
}

/// Diagnostics of a ratio correction. Means are in the normalized domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioReport {
    pub background_intensity: f64,
    pub frame_means: Vec<f64>,
    pub ratios: Vec<f64>,
    pub indeterminate: Option<IndeterminateRatio>,
}

/// Ratio correction with no diagnostics sink.
pub fn correct<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    background_intensity: Option<f64>,
) -> Result<Corrected<T>> {
    correct_with(
        images,
        contrast_limits,
        background_intensity,
        &DiagnosticsSink::default(),
    )
}

pub fn correct_with<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    background_intensity: Option<f64>,
    sink: &DiagnosticsSink,
) -> Result<Corrected<T>> {
    normalize::validate_stack(images)?;
    validate_background(background_intensity)?;

    let frame_len = images.frame_len();
    let mut values = normalize::normalized(images, contrast_limits)?;
    let frame_means = normalize::frame_means(&values, frame_len);

    let background = background_intensity.unwrap_or(0.0);
    let reference = frame_means[0];
    let ratios: Vec<f64> = frame_means
        .iter()
        .map(|&mean| (reference - background) / (mean - background))
        .collect();

    let indeterminate: Vec<usize> = ratios
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_finite())
        .map(|(i, _)| i)
        .collect();
    if !indeterminate.is_empty() {
        tracing::warn!(
            frames = ?indeterminate,
            background,
            "Mean intensity equals background, ratio is indeterminate"
        );
    }

    for v in values.iter_mut() {
        *v -= background;
    }
    normalize::scale_frames(&mut values, frame_len, &ratios);

    let corrected = normalize::restore_normalized(&values, images.shape(), contrast_limits);

    tracing::debug!(
        frame_count = images.frame_count(),
        background,
        ?ratios,
        "Applied ratio correction"
    );

    let diagnostics = Diagnostics::Ratio(RatioReport {
        background_intensity: background,
        frame_means,
        ratios,
        indeterminate: (!indeterminate.is_empty()).then_some(IndeterminateRatio {
            frames: indeterminate,
        }),
    });
    sink.report(&diagnostics);

    Ok(Corrected {
        images: corrected,
        metadata: CorrectionMetadata::new::<T>(
            CorrectionMethod::Ratio {
                background_intensity,
            },
            diagnostics,
        ),
    })
}

pub(crate) fn validate_background(background_intensity: Option<f64>) -> Result<()> {
    match background_intensity {
        Some(b) if !(0.0..=1.0).contains(&b) => Err(Error::BackgroundIntensity(b)),
        _ => Ok(()),
    }
}
