//! Error types for bleach correction.
//!
//! Every variant is an invalid-parameter condition: the call is rejected before
//! any numeric work happens and no partial result is produced. Recoverable
//! numeric conditions (indeterminate ratios, failed curve fits, degenerate
//! histograms) are reported through diagnostics instead.

use thiserror::Error;

/// Errors that can occur when validating a correction request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Image stack is empty")]
    EmptyStack,

    #[error("Image stack shape {shape:?} has a zero-length axis")]
    ZeroLengthAxis { shape: Vec<usize> },

    #[error("Buffer of {actual} values does not match shape {shape:?} ({expected} values)")]
    BufferSize {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Expected 3d or 4d image stack, instead got {ndim} dimensions")]
    Dimensionality { ndim: usize },

    #[error("Frame {index} has shape {actual:?}, expected {expected:?}")]
    FrameShapeMismatch {
        index: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Contrast limits must be finite with low <= high, got ({low}, {high})")]
    ContrastLimits { low: f64, high: f64 },

    #[error("Upper contrast limit is zero, cannot normalize intensities")]
    ZeroUpperLimit,

    #[error("`background_intensity` expected to be between 0 and 1, instead got {0}")]
    BackgroundIntensity(f64),

    #[error("Curve must be one of [\"mono\", \"bi\"], instead got {0:?}")]
    UnknownCurve(String),

    #[error("'match' expected to be one of [\"first\", \"neighbor\"], instead got {0:?}")]
    UnknownMatch(String),

    #[error("Intensity profile needs a frame axis and a data axis, got {ndim} dimensions")]
    ProfileAxes { ndim: usize },

    #[error("Cannot compare intensity profiles of {left}d and {right}d stacks")]
    ProfileDimensionality { left: usize, right: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensionality_message() {
        let err = Error::Dimensionality { ndim: 2 };
        assert_eq!(
            err.to_string(),
            "Expected 3d or 4d image stack, instead got 2 dimensions"
        );
    }

    #[test]
    fn test_frame_shape_mismatch_message() {
        let err = Error::FrameShapeMismatch {
            index: 3,
            expected: vec![10, 10],
            actual: vec![10, 9],
        };
        let msg = err.to_string();
        assert!(msg.contains("Frame 3"));
        assert!(msg.contains("[10, 9]"));
        assert!(msg.contains("[10, 10]"));
    }

    #[test]
    fn test_background_message() {
        let err = Error::BackgroundIntensity(1.5);
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_unknown_curve_message() {
        let err = Error::UnknownCurve("tri".to_string());
        assert!(err.to_string().contains("\"tri\""));
    }

    #[test]
    fn test_error_is_debug() {
        let debug_str = format!("{:?}", Error::ZeroUpperLimit);
        assert!(debug_str.contains("ZeroUpperLimit"));
    }
}
