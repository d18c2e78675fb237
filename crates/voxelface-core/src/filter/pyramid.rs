//! Multi-resolution image pyramid.

use burn::tensor::backend::Backend;
use crate::image::Image;
use super::gaussian::GaussianFilter;
use super::downsample::DownsampleFilter;

/// A sequence of progressively smoothed and subsampled copies of a volume,
/// coarsest first. Registration walks the levels in order; each level is
/// band-limited with a Gaussian before subsampling.
pub struct MultiResolutionPyramid<B: Backend, const D: usize> {
    images: Vec<Image<B, D>>,
}

impl<B: Backend, const D: usize> MultiResolutionPyramid<B, D> {
    /// Build a pyramid from shrink factors and smoothing sigmas, one entry
    /// per level (`[level][dim]`, coarsest level first).
    ///
    /// # Panics
    /// Panics if the two schedules have different lengths.
    pub fn new(
        input: &Image<B, D>,
        shrink_factors: &[Vec<usize>],
        smoothing_sigmas: &[Vec<f64>],
    ) -> Self {
        assert_eq!(
            shrink_factors.len(),
            smoothing_sigmas.len(),
            "schedule lengths must match"
        );

        let mut images = Vec::with_capacity(shrink_factors.len());
        for (factors, sigmas) in shrink_factors.iter().zip(smoothing_sigmas.iter()) {
            let needs_smoothing = sigmas.iter().any(|&s| s > 1e-6);
            let needs_shrinking = factors.iter().any(|&f| f > 1);

            if !needs_smoothing && !needs_shrinking {
                images.push(input.clone());
                continue;
            }

            let smoothed = if needs_smoothing {
                GaussianFilter::new(sigmas.clone()).apply(input)
            } else {
                input.clone()
            };

            let level = if needs_shrinking {
                DownsampleFilter::new(factors.clone()).apply(&smoothed)
            } else {
                smoothed
            };
            images.push(level);
        }

        Self { images }
    }

    /// The image at a level (0 = coarsest).
    pub fn level(&self, level: usize) -> &Image<B, D> {
        &self.images[level]
    }

    /// Number of levels.
    pub fn levels(&self) -> usize {
        self.images.len()
    }

    /// Default power-of-2 schedule, coarsest first: `levels == 3` yields
    /// factors `[4, 2, 1]` and sigmas `[2.0, 1.0, 0.0]` per axis.
    pub fn default_schedule(levels: usize) -> (Vec<Vec<usize>>, Vec<Vec<f64>>) {
        let mut shrink_factors = Vec::with_capacity(levels);
        let mut smoothing_sigmas = Vec::with_capacity(levels);

        for i in 0..levels {
            let factor = 2usize.pow((levels - 1 - i) as u32);
            let sigma = if factor > 1 { 0.5 * factor as f64 } else { 0.0 };
            shrink_factors.push(vec![factor; D]);
            smoothing_sigmas.push(vec![sigma; D]);
        }
        (shrink_factors, smoothing_sigmas)
    }
}
