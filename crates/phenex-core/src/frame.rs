//! Raster image buffer and the pixel-level operations refinement needs.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single-channel raster image buffer.
///
/// The pipeline treats pixel data as `f32` in roughly `[0, 1]`; nothing below
/// enforces that range, so values produced by a host backend pass through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Frame {
    /// Creates a frame from raw pixel data.
    ///
    /// Fails when `data.len() != width * height`.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::configuration(format!(
                "frame data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a frame filled with a constant value.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel data in row-major order.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable pixel data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the frame, returning its pixel data.
    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mean pixel value.
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Population variance of the pixel values.
    #[must_use]
    pub fn variance(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.data
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum::<f32>()
            / self.data.len() as f32
    }

    /// Cosine similarity against another frame, in `[-1, 1]`.
    ///
    /// Frames of unequal size are compared over the overlapping prefix.
    /// Returns 0.0 when either frame is empty or degenerate.
    #[must_use]
    pub fn similarity(&self, other: &Frame) -> f32 {
        let n = self.data.len().min(other.data.len());
        if n == 0 {
            return 0.0;
        }

        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;

        for (a, b) in self.data[..n].iter().zip(other.data[..n].iter()) {
            let a = *a as f64;
            let b = *b as f64;
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        if norm_a > 0.0 && norm_b > 0.0 {
            (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
        } else {
            0.0
        }
    }

    /// Resizes the frame with bilinear interpolation.
    #[must_use]
    pub fn resize_bilinear(&self, width: usize, height: usize) -> Frame {
        if width == 0 || height == 0 || self.data.is_empty() {
            return Frame {
                width,
                height,
                data: vec![0.0; width * height],
            };
        }
        if width == self.width && height == self.height {
            return self.clone();
        }

        let mut data = Vec::with_capacity(width * height);
        let x_ratio = if width > 1 {
            (self.width.saturating_sub(1)) as f32 / (width - 1) as f32
        } else {
            0.0
        };
        let y_ratio = if height > 1 {
            (self.height.saturating_sub(1)) as f32 / (height - 1) as f32
        } else {
            0.0
        };

        for y in 0..height {
            let sy = y as f32 * y_ratio;
            let y0 = sy.floor() as usize;
            let y1 = (y0 + 1).min(self.height - 1);
            let fy = sy - y0 as f32;

            for x in 0..width {
                let sx = x as f32 * x_ratio;
                let x0 = sx.floor() as usize;
                let x1 = (x0 + 1).min(self.width - 1);
                let fx = sx - x0 as f32;

                let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
                let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
                data.push(top * (1.0 - fy) + bottom * fy);
            }
        }

        Frame {
            width,
            height,
            data,
        }
    }

    /// Alpha-blends this frame toward `other`.
    ///
    /// `alpha` is the weight given to `other`; 0.0 returns `self` unchanged,
    /// 1.0 returns `other`. Fails when dimensions differ.
    pub fn blend(&self, other: &Frame, alpha: f32) -> Result<Frame> {
        if self.width != other.width || self.height != other.height {
            return Err(Error::LengthMismatch {
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }

        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * (1.0 - alpha) + b * alpha)
            .collect();

        Ok(Frame {
            width: self.width,
            height: self.height,
            data,
        })
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(Frame::new(4, 4, vec![0.0; 16]).is_ok());
        assert!(Frame::new(4, 4, vec![0.0; 15]).is_err());
    }

    #[test]
    fn test_variance_of_constant_is_zero() {
        let frame = Frame::filled(8, 8, 0.5);
        assert_eq!(frame.variance(), 0.0);
        assert!((frame.mean() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_identical() {
        let frame = Frame::new(2, 2, vec![0.1, 0.5, 0.9, 0.3]).unwrap();
        assert!((frame.similarity(&frame) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similarity_empty_is_zero() {
        let a = Frame::filled(0, 0, 0.0);
        let b = Frame::filled(2, 2, 0.5);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_resize_preserves_constant() {
        let frame = Frame::filled(4, 4, 0.25);
        let resized = frame.resize_bilinear(8, 8);
        assert_eq!(resized.len(), 64);
        for v in resized.data() {
            assert!((v - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_resize_same_size_is_identity() {
        let frame = Frame::new(2, 2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(frame.resize_bilinear(2, 2), frame);
    }

    #[test]
    fn test_blend_weights() {
        let a = Frame::filled(2, 2, 0.0);
        let b = Frame::filled(2, 2, 1.0);
        let blended = a.blend(&b, 0.3).unwrap();
        for v in blended.data() {
            assert!((v - 0.3).abs() < 1e-6);
        }
    }

    #[test]
    fn test_blend_dimension_mismatch() {
        let a = Frame::filled(2, 2, 0.0);
        let b = Frame::filled(3, 3, 1.0);
        assert!(a.blend(&b, 0.5).is_err());
    }
}
