//! Method selection, dispatch, and the metadata attached to a corrected stack.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, DiagnosticsSink};
use crate::error::Result;
use crate::exponential::{self, DecayModel};
use crate::fit::LMConfig;
use crate::histogram::{self, HistogramMatch};
use crate::ratio;
use crate::stack::{ContrastLimits, Dtype, ImageStack, Pixel};

/// A correction method with its parameters.
///
/// Serializes as `{"method": "ratio", "background_intensity": 0.1}`,
/// `{"method": "exponential", "curve_type": "mono"}` or
/// `{"method": "histogram", "match": "first"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum CorrectionMethod {
    Ratio {
        #[serde(default)]
        background_intensity: Option<f64>,
    },
    Exponential {
        #[serde(default)]
        curve_type: DecayModel,
    },
    Histogram {
        #[serde(rename = "match", default)]
        matching: HistogramMatch,
    },
}

impl Default for CorrectionMethod {
    fn default() -> Self {
        CorrectionMethod::Ratio {
            background_intensity: None,
        }
    }
}

impl CorrectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CorrectionMethod::Ratio { .. } => "ratio",
            CorrectionMethod::Exponential { .. } => "exponential",
            CorrectionMethod::Histogram { .. } => "histogram",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CorrectionMethod::Ratio { .. } => "Ratio Method",
            CorrectionMethod::Exponential { .. } => "Exponential Curve Method",
            CorrectionMethod::Histogram { .. } => "Histogram Matching Method",
        }
    }

    /// Name for the corrected copy of a layer called `layer_name`.
    pub fn output_name(&self, layer_name: &str) -> String {
        format!("{} Corrected ({})", layer_name, self.title())
    }

    /// Checks parameters that do not depend on the stack.
    pub fn validate(&self) -> Result<()> {
        match *self {
            CorrectionMethod::Ratio {
                background_intensity,
            } => ratio::validate_background(background_intensity),
            CorrectionMethod::Exponential { .. } | CorrectionMethod::Histogram { .. } => Ok(()),
        }
    }
}

/// What was applied to produce a corrected stack, and what the corrector observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionMetadata {
    #[serde(flatten)]
    pub method: CorrectionMethod,
    pub dtype: Dtype,
    pub diagnostics: Diagnostics,
}

impl CorrectionMetadata {
    pub(crate) fn new<T: Pixel>(method: CorrectionMethod, diagnostics: Diagnostics) -> Self {
        Self {
            method,
            dtype: T::DTYPE,
            diagnostics,
        }
    }
}

/// A corrected stack with the input's shape and element type.
#[derive(Debug, Clone, PartialEq)]
pub struct Corrected<T: Pixel> {
    pub images: ImageStack<T>,
    pub metadata: CorrectionMetadata,
}

/// Runs `method` with default fit settings and no diagnostics sink.
pub fn correct<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    method: &CorrectionMethod,
) -> Result<Corrected<T>> {
    correct_with(
        images,
        contrast_limits,
        method,
        &LMConfig::default(),
        &DiagnosticsSink::default(),
    )
}

pub fn correct_with<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    method: &CorrectionMethod,
    fit_config: &LMConfig,
    sink: &DiagnosticsSink,
) -> Result<Corrected<T>> {
    tracing::info!(
        method = method.name(),
        shape = ?images.shape(),
        dtype = %images.dtype(),
        low = contrast_limits.low(),
        high = contrast_limits.high(),
        "Correcting photobleaching"
    );

    match *method {
        CorrectionMethod::Ratio {
            background_intensity,
        } => ratio::correct_with(images, contrast_limits, background_intensity, sink),
        CorrectionMethod::Exponential { curve_type } => {
            exponential::correct_with(images, contrast_limits, curve_type, fit_config, sink)
        }
        CorrectionMethod::Histogram { matching } => {
            histogram::correct_with(images, contrast_limits, matching, sink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn stack() -> ImageStack<u8> {
        let data = [200u8, 180, 160, 140]
            .iter()
            .flat_map(|&v| std::iter::repeat_n(v, 4))
            .collect();
        ImageStack::from_shape_vec(vec![4, 2, 2], data).unwrap()
    }

    #[test]
    fn test_output_names() {
        let ratio = CorrectionMethod::Ratio {
            background_intensity: Some(0.1),
        };
        assert_eq!(ratio.output_name("cells"), "cells Corrected (Ratio Method)");
        let exp = CorrectionMethod::Exponential {
            curve_type: DecayModel::Bi,
        };
        assert_eq!(
            exp.output_name("cells"),
            "cells Corrected (Exponential Curve Method)"
        );
        let hist = CorrectionMethod::Histogram {
            matching: HistogramMatch::First,
        };
        assert_eq!(hist.name(), "histogram");
        assert_eq!(
            hist.output_name("cells"),
            "cells Corrected (Histogram Matching Method)"
        );
    }

    #[test]
    fn test_validate() {
        assert!(CorrectionMethod::default().validate().is_ok());
        let bad = CorrectionMethod::Ratio {
            background_intensity: Some(2.0),
        };
        assert_eq!(bad.validate().unwrap_err(), Error::BackgroundIntensity(2.0));
    }

    #[test]
    fn test_dispatch_records_method_and_dtype() {
        let limits = ContrastLimits::new(0.0, 255.0).unwrap();
        let methods = [
            CorrectionMethod::Ratio {
                background_intensity: Some(0.0),
            },
            CorrectionMethod::Exponential {
                curve_type: DecayModel::Mono,
            },
            CorrectionMethod::Histogram {
                matching: HistogramMatch::Neighbor,
            },
        ];
        for method in methods {
            let corrected = correct(&stack(), &limits, &method).unwrap();
            assert_eq!(corrected.metadata.method, method);
            assert_eq!(corrected.metadata.dtype, Dtype::U8);
            assert_eq!(corrected.images.shape(), &[4, 2, 2]);
            let diagnostics_method = match corrected.metadata.diagnostics {
                Diagnostics::Ratio(_) => "ratio",
                Diagnostics::Exponential(_) => "exponential",
                Diagnostics::Histogram(_) => "histogram",
            };
            assert_eq!(diagnostics_method, method.name());
        }
    }

    #[test]
    fn test_metadata_serializes_flat() {
        let limits = ContrastLimits::new(0.0, 255.0).unwrap();
        let method = CorrectionMethod::Histogram {
            matching: HistogramMatch::First,
        };
        let corrected = correct(&stack(), &limits, &method).unwrap();

        let text =
            common::serde::serialize(&corrected.metadata, common::FileFormat::Json).unwrap();
        assert!(text.contains("\"method\": \"histogram\""), "{}", text);
        assert!(text.contains("\"match\": \"first\""), "{}", text);
        assert!(text.contains("\"dtype\": \"u8\""), "{}", text);

        let parsed: CorrectionMetadata =
            common::serde::deserialize(&text, common::FileFormat::Json).unwrap();
        assert_eq!(parsed, corrected.metadata);
    }

    #[test]
    fn test_method_from_yaml() {
        let method: CorrectionMethod = common::serde::deserialize(
            "method: exponential\ncurve_type: bi\n",
            common::FileFormat::Yaml,
        )
        .unwrap();
        assert_eq!(
            method,
            CorrectionMethod::Exponential {
                curve_type: DecayModel::Bi
            }
        );

        let method: CorrectionMethod =
            common::serde::deserialize("method: ratio\n", common::FileFormat::Yaml).unwrap();
        assert_eq!(method, CorrectionMethod::default());
    }
}
