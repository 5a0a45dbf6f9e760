//! Correction settings loadable from YAML or JSON.
//!
//! ```yaml
//! method: exponential
//! curve_type: bi
//! fit:
//!   max_iterations: 500
//! ```

use common::FileFormat;
use serde::{Deserialize, Serialize};

use crate::correction::{self, Corrected, CorrectionMethod};
use crate::diagnostics::DiagnosticsSink;
use crate::error::Result;
use crate::fit::LMConfig;
use crate::stack::{ContrastLimits, ImageStack, Pixel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BleachConfig {
    #[serde(flatten)]
    pub method: CorrectionMethod,
    /// Curve fit tuning, only read by the exponential method.
    #[serde(default)]
    pub fit: LMConfig,
}

impl BleachConfig {
    pub fn new(method: CorrectionMethod) -> Self {
        Self {
            method,
            fit: LMConfig::default(),
        }
    }

    /// Parses and validates a config.
    pub fn from_text(text: &str, format: FileFormat) -> common::serde::Result<Self> {
        let config: Self = common::serde::deserialize(text, format)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_text(&self, format: FileFormat) -> common::serde::Result<String> {
        common::serde::serialize(self, format)
    }

    pub fn validate(&self) -> Result<()> {
        self.method.validate()
    }
}

/// Runs the configured correction.
pub fn correct_with_config<T: Pixel>(
    images: &ImageStack<T>,
    contrast_limits: &ContrastLimits,
    config: &BleachConfig,
    sink: &DiagnosticsSink,
) -> Result<Corrected<T>> {
    config.validate()?;
    correction::correct_with(images, contrast_limits, &config.method, &config.fit, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::exponential::DecayModel;
    use crate::histogram::HistogramMatch;

    #[test]
    fn test_roundtrip_all_formats() {
        let config = BleachConfig {
            method: CorrectionMethod::Exponential {
                curve_type: DecayModel::Bi,
            },
            fit: LMConfig {
                max_iterations: 250,
                ..LMConfig::default()
            },
        };
        for format in FileFormat::all_formats_for_testing() {
            let text = config.to_text(format).unwrap();
            let parsed = BleachConfig::from_text(&text, format).unwrap();
            assert_eq!(parsed, config, "{:?}", format);
        }
    }

    #[test]
    fn test_partial_fit_settings_use_defaults() {
        let text = "method: exponential\ncurve_type: mono\nfit:\n  max_iterations: 50\n";
        let config = BleachConfig::from_text(text, FileFormat::Yaml).unwrap();
        assert_eq!(config.fit.max_iterations, 50);
        assert_eq!(config.fit.ftol, LMConfig::default().ftol);
    }

    #[test]
    fn test_missing_fit_section() {
        let text = r#"{"method": "histogram", "match": "neighbor"}"#;
        let config = BleachConfig::from_text(text, FileFormat::Json).unwrap();
        assert_eq!(
            config,
            BleachConfig::new(CorrectionMethod::Histogram {
                matching: HistogramMatch::Neighbor
            })
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let text = "method: ratio\nbackground_intensity: 1.5\n";
        let err = BleachConfig::from_text(text, FileFormat::Yaml).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::BackgroundIntensity(1.5))
        );

        assert!(BleachConfig::from_text("method: exponential\ncurve_type: tri\n", FileFormat::Yaml)
            .is_err());
        assert!(BleachConfig::from_text("method: median\n", FileFormat::Yaml).is_err());
    }

    #[test]
    fn test_correct_with_config() {
        let stack = ImageStack::from_shape_vec(vec![2, 1, 2], vec![100u8, 100, 50, 50]).unwrap();
        let limits = ContrastLimits::new(0.0, 255.0).unwrap();
        let config = BleachConfig::default();

        let corrected =
            correct_with_config(&stack, &limits, &config, &DiagnosticsSink::default()).unwrap();
        assert_eq!(corrected.images.as_slice(), &[100, 100, 100, 100]);

        let invalid = BleachConfig::new(CorrectionMethod::Ratio {
            background_intensity: Some(-1.0),
        });
        assert_eq!(
            correct_with_config(&stack, &limits, &invalid, &DiagnosticsSink::default())
                .unwrap_err(),
            Error::BackgroundIntensity(-1.0)
        );
    }
}
