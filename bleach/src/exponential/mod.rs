//! Bleach correction by fitting an exponential decay curve.
//!
//! The per-frame mean intensity is fit with a mono- or bi-exponential curve
//! (Levenberg-Marquardt). Each frame is divided by the curve normalized to
//! its maximum, so the brightest point of the curve keeps its intensity.
//!
//! A fit that cannot be used falls back to the flat curve `f(t) = 1`, leaving
//! the stack unscaled. The fallback is reported, never raised as an error.

mod model;

pub use model::{DecayModel, FitFailure};

use serde::{Deserialize, Serialize};

use crate::correction::{Corrected, CorrectionMetadata, CorrectionMethod};
use crate::diagnostics::{Diagnostics, DiagnosticsSink};
use crate::error::Result;
use crate::fit::{LMConfig, Termination};
use crate::normalize;
use crate::stack::{ContrastLimits, ImageStack, Pixel};

/// Outcome of the curve fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Fitted {
        termination: Termination,
        iterations: usize,
    },
    Fallback(FitFailure),
}

impl FitStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FitStatus::Fallback(_))
    }
}

/// Diagnostics of an exponential correction. Values are in the normalized domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub model: DecayModel,
    pub status: FitStatus,
    /// Fitted parameters, empty after a fallback.
    pub params: Vec<f64>,
    /// Coefficient of determination of the curve actually applied. NaN or
    /// infinite when the frame means are constant.
    pub r_squared: f64,
    pub frame_means: Vec<f64>,
    /// Curve values per frame, before normalization to the maximum.
    pub curve: Vec<f64>,
}

/// Exponential correction with default fit settings and no diagnostics sink.
pub fn correct<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    model: DecayModel,
) -> Result<Corrected<T>> {
    correct_with(
        images,
        contrast_limits,
        model,
        &LMConfig::default(),
        &DiagnosticsSink::default(),
    )
}

pub fn correct_with<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    model: DecayModel,
    config: &LMConfig,
    sink: &DiagnosticsSink,
) -> Result<Corrected<T>> {
    normalize::validate_stack(images)?;

    let frame_len = images.frame_len();
    let mut values = normalize::normalized(images, contrast_limits)?;
    let frame_means = normalize::frame_means(&values, frame_len);

    let (status, params, curve) = fit_curve(model, &frame_means, config);
    if let FitStatus::Fallback(failure) = status {
        tracing::warn!(curve = %model, ?failure, "Curve fit failed, using flat curve");
    }

    let r_squared = r_squared(&frame_means, &curve);
    tracing::info!(
        curve = %model,
        r_squared,
        "R-squared value for fitting a {}-exponential curve: {}",
        model,
        r_squared
    );

    let peak = curve.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let factors: Vec<f64> = curve.iter().map(|&f| 1.0 / (f / peak)).collect();
    normalize::scale_frames(&mut values, frame_len, &factors);

    let corrected = normalize::restore_normalized(&values, images.shape(), contrast_limits);

    let diagnostics = Diagnostics::Exponential(FitReport {
        model,
        status,
        params,
        r_squared,
        frame_means,
        curve,
    });
    sink.report(&diagnostics);

    Ok(Corrected {
        images: corrected,
        metadata: CorrectionMetadata::new::<T>(
            CorrectionMethod::Exponential { curve_type: model },
            diagnostics,
        ),
    })
}

/// Fits `model` and evaluates it per frame, substituting the flat curve when
/// the fit is unusable.
fn fit_curve(
    model: DecayModel,
    frame_means: &[f64],
    config: &LMConfig,
) -> (FitStatus, Vec<f64>, Vec<f64>) {
    let flat = |failure| {
        (
            FitStatus::Fallback(failure),
            Vec::new(),
            vec![1.0; frame_means.len()],
        )
    };

    let fit = match model.fit(frame_means, config) {
        Ok(fit) => fit,
        Err(failure) => return flat(failure),
    };

    let curve: Vec<f64> = (0..frame_means.len())
        .map(|t| model.evaluate(t as f64, &fit.params))
        .collect();
    if !curve.iter().all(|f| f.is_finite()) {
        return flat(FitFailure::NonFinite);
    }
    if !curve.iter().any(|&f| f > 0.0) {
        return flat(FitFailure::NonPositivePeak);
    }

    tracing::debug!(
        curve = %model,
        params = ?fit.params,
        iterations = fit.iterations,
        termination = ?fit.termination,
        "Fitted bleaching curve"
    );

    (
        FitStatus::Fitted {
            termination: fit.termination,
            iterations: fit.iterations,
        },
        fit.params,
        curve,
    )
}

/// `1 - SS_res / SS_tot` of `fitted` against `observed`.
pub(crate) fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_res: f64 = observed
        .iter()
        .zip(fitted)
        .map(|(o, f)| (o - f) * (o - f))
        .sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean) * (o - mean)).sum();
    1.0 - ss_res / ss_tot
}
