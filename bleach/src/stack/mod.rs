//! Time-lapse image stacks.
//!
//! A stack is one contiguous row-major buffer plus its full shape. Axis 0 is
//! time (frames); the remaining axes are the spatial shape shared by every
//! frame, `[H, W]` or `[Z, H, W]` for the correctors.

mod limits;
mod pixel;


pub use limits::ContrastLimits;
pub use pixel::{Dtype, Pixel};

use crate::error::{Error, Result};

/// A single frame with its own spatial shape, used to assemble a stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T: Pixel> {
    shape: Vec<usize>,
    pixels: Vec<T>,
}

impl<T: Pixel> Frame<T> {
    pub fn new(shape: impl Into<Vec<usize>>, pixels: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        check_buffer(&shape, pixels.len())?;
        Ok(Self { shape, pixels })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }
}

/// Ordered sequence of frames sharing one spatial shape and element type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStack<T: Pixel> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: Pixel> ImageStack<T> {
    /// Wraps a row-major buffer. Any dimensionality is accepted here; the
    /// correctors reject anything but 3d and 4d stacks.
    pub fn from_shape_vec(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        check_buffer(&shape, data.len())?;
        Ok(Self { shape, data })
    }

    /// Wraps a buffer whose length is already known to match `shape`.
    pub(crate) fn from_validated(shape: Vec<usize>, data: Vec<T>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    /// Stacks frames along a new leading time axis.
    ///
    /// Every frame must have the first frame's shape.
    pub fn from_frames(frames: Vec<Frame<T>>) -> Result<Self> {
        let Some(first) = frames.first() else {
            return Err(Error::EmptyStack);
        };
        let frame_shape = first.shape.clone();

        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.shape != frame_shape)
        {
            return Err(Error::FrameShapeMismatch {
                index,
                expected: frame_shape,
                actual: frame.shape.clone(),
            });
        }

        let mut shape = Vec::with_capacity(frame_shape.len() + 1);
        shape.push(frames.len());
        shape.extend_from_slice(&frame_shape);

        let data = frames.into_iter().flat_map(|frame| frame.pixels).collect();
        Ok(Self { shape, data })
    }

    /// Stack of `shape` with every element set to `value`.
    pub fn filled(shape: impl Into<Vec<usize>>, value: T) -> Result<Self> {
        let shape = shape.into();
        let len = checked_len(&shape)?;
        Ok(Self {
            data: vec![value; len],
            shape,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> Dtype {
        T::DTYPE
    }

    /// Number of frames (length of axis 0).
    pub fn frame_count(&self) -> usize {
        self.shape[0]
    }

    /// Shape of a single frame (all axes after time).
    pub fn frame_shape(&self) -> &[usize] {
        &self.shape[1..]
    }

    /// Number of values in a single frame.
    pub fn frame_len(&self) -> usize {
        self.frame_shape().iter().product()
    }

    pub fn frame(&self, index: usize) -> &[T] {
        let len = self.frame_len();
        &self.data[index * len..(index + 1) * len]
    }

    pub fn frames(&self) -> impl ExactSizeIterator<Item = &[T]> {
        self.data.chunks_exact(self.frame_len())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

fn checked_len(shape: &[usize]) -> Result<usize> {
    if shape.is_empty() {
        return Err(Error::EmptyStack);
    }
    if shape.contains(&0) {
        return Err(Error::ZeroLengthAxis {
            shape: shape.to_vec(),
        });
    }
    Ok(shape.iter().product())
}

fn check_buffer(shape: &[usize], actual: usize) -> Result<()> {
    let expected = checked_len(shape)?;
    if expected != actual {
        return Err(Error::BufferSize {
            shape: shape.to_vec(),
            expected,
            actual,
        });
    }
    Ok(())
}
