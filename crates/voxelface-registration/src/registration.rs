//! Multi-resolution affine registration.

use std::time::{Duration, Instant};
use burn::tensor::ElementConversion;
use burn::tensor::backend::Backend;
use nalgebra::SVector;
use voxelface_core::filter::MultiResolutionPyramid;
use voxelface_core::image::Image;
use voxelface_core::transform::AffineTransform;
use crate::error::{RegistrationError, Result};
use crate::metric::Metric;
use crate::optimizer::{minimize, PatternSearchOptions};

/// Unitless-step to parameter-unit scales for the 12 affine parameters:
/// translations in mm, rotations in radians, then log-scale and shear.
const PARAMETER_SCALES: [f64; 12] = [
    1.0, 1.0, 1.0, // translation
    0.01, 0.01, 0.01, // rotation
    0.01, 0.01, 0.01, // log-scale
    0.01, 0.01, 0.01, // shear
];

/// Which affine degrees of freedom the optimizer may move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformModel {
    /// Translation only (3 DOF).
    Translation,
    /// Translation + rotation (6 DOF).
    Rigid,
    /// Full affine: translation, rotation, scale, shear (12 DOF).
    Affine,
}

impl TransformModel {
    fn active_parameters(&self) -> [bool; 12] {
        let mut active = [false; 12];
        let dof = match self {
            Self::Translation => 3,
            Self::Rigid => 6,
            Self::Affine => 12,
        };
        for flag in active.iter_mut().take(dof) {
            *flag = true;
        }
        active
    }
}

/// Per-level settings of the coarse-to-fine schedule.
///
/// All vectors have one entry per pyramid level, coarsest first. Coarse
/// levels take big optimizer steps with loose tolerances over few voxels;
/// the finest level refines with small steps, sampling a strided subset to
/// bound cost.
#[derive(Debug, Clone)]
pub struct RegistrationSchedule {
    pub shrink_factors: Vec<Vec<usize>>,
    pub smoothing_sigmas: Vec<Vec<f64>>,
    pub iterations: Vec<usize>,
    pub initial_steps: Vec<f64>,
    pub tolerances: Vec<f64>,
    pub sample_strides: Vec<usize>,
}

impl RegistrationSchedule {
    /// Default power-of-2 schedule with the given number of levels.
    ///
    /// Three levels yield shrink factors `[4, 2, 1]`, smoothing sigmas
    /// `[2, 1, 0]` mm, and sample strides `[1, 2, 4]` (denser sampling
    /// where the level is already small).
    pub fn levels(levels: usize) -> Self {
        let mut shrink_factors = Vec::with_capacity(levels);
        let mut smoothing_sigmas = Vec::with_capacity(levels);
        let mut iterations = Vec::with_capacity(levels);
        let mut initial_steps = Vec::with_capacity(levels);
        let mut tolerances = Vec::with_capacity(levels);
        let mut sample_strides = Vec::with_capacity(levels);

        for i in 0..levels {
            let factor = 2usize.pow((levels - 1 - i) as u32);
            let sigma = if factor > 1 { 0.5 * factor as f64 } else { 0.0 };

            shrink_factors.push(vec![factor; 3]);
            smoothing_sigmas.push(vec![sigma; 3]);
            iterations.push(60);
            initial_steps.push(2.0 * factor as f64);
            tolerances.push(0.125 * factor as f64);
            sample_strides.push((4 / factor).max(1));
        }

        Self {
            shrink_factors,
            smoothing_sigmas,
            iterations,
            initial_steps,
            tolerances,
            sample_strides,
        }
    }

    pub fn with_iterations(mut self, iterations: Vec<usize>) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_initial_steps(mut self, initial_steps: Vec<f64>) -> Self {
        self.initial_steps = initial_steps;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Vec<f64>) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_sample_strides(mut self, sample_strides: Vec<usize>) -> Self {
        self.sample_strides = sample_strides;
        self
    }

    fn validate(&self) -> Result<usize> {
        let levels = self.shrink_factors.len();
        if levels == 0 {
            return Err(RegistrationError::InvalidConfiguration(
                "schedule needs at least one level".into(),
            ));
        }
        let lengths = [
            self.smoothing_sigmas.len(),
            self.iterations.len(),
            self.initial_steps.len(),
            self.tolerances.len(),
            self.sample_strides.len(),
        ];
        if lengths.iter().any(|&len| len != levels) {
            return Err(RegistrationError::InvalidConfiguration(format!(
                "schedule vectors disagree on level count (expected {})",
                levels
            )));
        }
        Ok(levels)
    }
}

impl Default for RegistrationSchedule {
    fn default() -> Self {
        Self::levels(3)
    }
}

/// Estimates the affine transform aligning a moving volume to a fixed one.
///
/// The returned transform maps fixed-space physical coordinates into
/// moving space: the backward map a resample filter consumes directly to
/// pull moving-space data (the face mask) onto the fixed grid.
///
/// The estimator walks a smoothed pyramid coarsest-first, minimizing the
/// metric with a pattern search at each level and seeding every level with
/// the previous level's result. The initial estimate aligns the two volume
/// centers. There is no optimizer state outside the parameter vector, so
/// `execute` is a pure function of its inputs.
pub struct AffineRegistration<M> {
    metric: M,
    schedule: RegistrationSchedule,
    model: TransformModel,
    divergence_tolerance: f64,
    timeout: Option<Duration>,
}

impl<M> AffineRegistration<M> {
    pub fn new(metric: M) -> Self {
        Self {
            metric,
            schedule: RegistrationSchedule::default(),
            model: TransformModel::Affine,
            divergence_tolerance: 1e-3,
            timeout: None,
        }
    }

    pub fn with_schedule(mut self, schedule: RegistrationSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_model(mut self, model: TransformModel) -> Self {
        self.model = model;
        self
    }

    /// Loss slack allowed over the identity transform before the result is
    /// declared divergent. A negative value requires the result to strictly
    /// improve on identity by at least that margin.
    pub fn with_divergence_tolerance(mut self, tolerance: f64) -> Self {
        self.divergence_tolerance = tolerance;
        self
    }

    /// Wall-clock budget for the whole optimization, checked between
    /// optimizer sweeps.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run the registration.
    ///
    /// Fails with `InvalidInputGeometry` before any optimization if either
    /// volume has unusable spacing, orientation or dimensions; with
    /// `Timeout` if the budget expires; and with `Divergence` if the final
    /// transform does not match the identity transform's similarity on the
    /// finest level within the configured tolerance.
    pub fn execute<B: Backend>(
        &self,
        fixed: &Image<B, 3>,
        moving: &Image<B, 3>,
    ) -> Result<AffineTransform<3>>
    where
        M: Metric<B, 3>,
    {
        fixed.validate_geometry()?;
        moving.validate_geometry()?;
        let levels = self.schedule.validate()?;
        let deadline = self.timeout.map(|budget| Instant::now() + budget);

        let fixed_pyramid = MultiResolutionPyramid::new(
            fixed,
            &self.schedule.shrink_factors,
            &self.schedule.smoothing_sigmas,
        );
        let moving_pyramid = MultiResolutionPyramid::new(
            moving,
            &self.schedule.shrink_factors,
            &self.schedule.smoothing_sigmas,
        );

        let fixed_center = fixed.physical_center();
        let moving_center = moving.physical_center();
        let center = SVector::<f64, 3>::new(fixed_center[0], fixed_center[1], fixed_center[2]);

        // Seed with the translation aligning the two volume centers.
        let mut params = AffineTransform::<3>::identity_parameters().to_vec();
        for i in 0..3 {
            params[i] = moving_center[i] - fixed_center[i];
        }
        let active = self.model.active_parameters();

        for level in 0..levels {
            let fixed_level = fixed_pyramid.level(level);
            let moving_level = moving_pyramid.level(level);
            let stride = self.schedule.sample_strides[level];

            tracing::info!(
                level = level + 1,
                levels,
                fixed_size = ?fixed_level.shape(),
                stride,
                metric = self.metric.name(),
                "registration level"
            );

            let cost = |candidate: &[f64]| {
                let transform = AffineTransform::<3>::from_parameters(candidate, center);
                self.metric
                    .forward(fixed_level, moving_level, &transform, stride)
                    .into_scalar()
                    .elem::<f64>()
            };

            let options = PatternSearchOptions {
                initial_step: self.schedule.initial_steps[level],
                min_step: self.schedule.tolerances[level],
                max_iterations: self.schedule.iterations[level],
                deadline,
            };
            let result = minimize(&cost, &params, &PARAMETER_SCALES, &active, &options)?;

            tracing::info!(
                level = level + 1,
                loss = result.loss,
                iterations = result.iterations,
                evaluations = result.evaluations,
                converged = result.converged,
                "level finished"
            );
            params = result.params;
        }

        // The result must not lose to the identity transform on the finest
        // level actually evaluated; silently keeping a diverged transform
        // would leak facial anatomy through a misplaced mask.
        let finest = levels - 1;
        let fixed_finest = fixed_pyramid.level(finest);
        let moving_finest = moving_pyramid.level(finest);
        let stride = self.schedule.sample_strides[finest];

        let final_transform = AffineTransform::<3>::from_parameters(&params, center);
        let final_loss = self
            .metric
            .forward(fixed_finest, moving_finest, &final_transform, stride)
            .into_scalar()
            .elem::<f64>();
        let identity_loss = self
            .metric
            .forward(
                fixed_finest,
                moving_finest,
                &AffineTransform::<3>::identity(center),
                stride,
            )
            .into_scalar()
            .elem::<f64>();

        if final_loss > identity_loss + self.divergence_tolerance {
            return Err(RegistrationError::Divergence(format!(
                "final {} loss {:.6} is worse than identity loss {:.6}",
                self.metric.name(),
                final_loss,
                identity_loss
            )));
        }

        tracing::info!(final_loss, identity_loss, "registration complete");
        Ok(final_transform)
    }
}
