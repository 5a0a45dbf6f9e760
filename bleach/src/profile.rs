//! Mean intensity per frame, for plotting a stack before and after correction.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize;
use crate::stack::{ImageStack, Pixel};

/// Frame indices against mean intensity, in the stack's own value range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityProfile {
    pub frames: Vec<usize>,
    pub mean_intensity: Vec<f64>,
}

impl IntensityProfile {
    /// Any stack with a frame axis and at least one more axis.
    pub fn from_stack<T: Pixel>(images: &ImageStack<T>) -> Result<Self> {
        let ndim = images.ndim();
        if ndim < 2 {
            return Err(Error::ProfileAxes { ndim });
        }

        let values = normalize::to_f64(images);
        let mean_intensity = normalize::frame_means(&values, images.frame_len());
        Ok(Self {
            frames: (0..images.frame_count()).collect(),
            mean_intensity,
        })
    }

    /// Profiles of two stacks to plot side by side. The stacks must have the
    /// same number of dimensions; frame counts and element types may differ.
    pub fn compare<A: Pixel, B: Pixel>(
        left: &ImageStack<A>,
        right: &ImageStack<B>,
    ) -> Result<(Self, Self)> {
        if left.ndim() != right.ndim() {
            return Err(Error::ProfileDimensionality {
                left: left.ndim(),
                right: right.ndim(),
            });
        }
        Ok((Self::from_stack(left)?, Self::from_stack(right)?))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
