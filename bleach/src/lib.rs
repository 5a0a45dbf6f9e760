//! Bleach - photobleaching correction for time-lapse microscopy image stacks.
//!
//! Fluorescent signal fades with every exposure. This library rescales each
//! frame of a stack so the decay disappears, keeping the element type and a
//! caller-given valid intensity range. Three methods are available:
//! - Ratio: scale each frame by the first frame's mean over its own
//! - Exponential: divide by a fitted mono- or bi-exponential decay curve
//! - Histogram: remap each frame's value distribution onto a reference frame
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bleach::{ContrastLimits, CorrectionMethod, DecayModel, ImageStack};
//!
//! let stack = ImageStack::from_shape_vec(vec![frames, height, width], pixels)?;
//! let limits = ContrastLimits::new(0.0, 4095.0)?;
//! let method = CorrectionMethod::Exponential { curve_type: DecayModel::Bi };
//!
//! let corrected = bleach::correct(&stack, &limits, &method)?;
//! println!("R² = {:?}", corrected.metadata.diagnostics.r_squared());
//! ```

mod config;
mod correction;
mod diagnostics;
mod error;
pub mod exponential;
pub(crate) mod fit;
pub mod histogram;
pub(crate) mod normalize;
mod profile;
pub mod ratio;
mod stack;

// ============================================================================
// Stack types
// ============================================================================

pub use stack::{ContrastLimits, Dtype, Frame, ImageStack, Pixel};

// ============================================================================
// Correction
// ============================================================================

pub use config::{correct_with_config, BleachConfig};
pub use correction::{correct, correct_with, Corrected, CorrectionMetadata, CorrectionMethod};
pub use exponential::{DecayModel, FitFailure, FitReport, FitStatus};
pub use fit::{LMConfig, Termination};
pub use histogram::{HistogramMatch, HistogramReport};
pub use ratio::{IndeterminateRatio, RatioReport};

// ============================================================================
// Diagnostics and errors
// ============================================================================

pub use diagnostics::{Diagnostics, DiagnosticsSink};
pub use error::{Error, Result};
pub use profile::IntensityProfile;
