//! The defacing pipeline orchestrator.

use std::time::Duration;
use burn::tensor::backend::Backend;
use voxelface_core::error::ImageError;
use voxelface_core::filter::{CompositeFilter, ResampleImageFilter, VoxelateFilter};
use voxelface_core::image::Image;
use voxelface_core::interpolation::NearestNeighborInterpolator;
use voxelface_core::transform::AffineTransform;
use voxelface_registration::metric::Metric;
use voxelface_registration::{
    AffineRegistration, MutualInformation, NormalizedCrossCorrelation, RegistrationError,
    RegistrationSchedule, TransformModel,
};
use crate::error::Result;

/// Similarity metric used by the transform estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Normalized cross correlation; the default for a T1 template against
    /// T1-like subjects.
    NormalizedCrossCorrelation,
    /// Mutual information; tolerates contrast differences between the
    /// template and the subject.
    MutualInformation,
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct DefaceConfig {
    /// Edge length in mm of the voxelation cubes.
    pub voxel_size_mm: f64,
    /// Pyramid levels for registration.
    pub levels: usize,
    /// Degrees of freedom of the estimated transform.
    pub model: TransformModel,
    /// Similarity metric.
    pub metric: MetricKind,
    /// Wall-clock budget for registration.
    pub timeout: Option<Duration>,
    /// Loss slack over the identity transform before the registration is
    /// declared divergent.
    pub divergence_tolerance: f64,
}

impl Default for DefaceConfig {
    fn default() -> Self {
        Self {
            voxel_size_mm: 8.0,
            levels: 3,
            model: TransformModel::Affine,
            metric: MetricKind::NormalizedCrossCorrelation,
            timeout: None,
            divergence_tolerance: 1e-3,
        }
    }
}

impl DefaceConfig {
    pub fn with_voxel_size_mm(mut self, voxel_size_mm: f64) -> Self {
        self.voxel_size_mm = voxel_size_mm;
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_model(mut self, model: TransformModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Everything the pipeline produces. The warped mask and the voxelated
/// volume are kept so callers can dump them for inspection; only `defaced`
/// is the de-identified result.
#[derive(Debug)]
pub struct DefaceOutput<B: Backend> {
    pub defaced: Image<B, 3>,
    pub warped_mask: Image<B, 3>,
    pub voxelated: Image<B, 3>,
    pub transform: AffineTransform<3>,
}

/// Sequences the defacing stages over in-memory volumes:
///
/// 1. estimate the affine transform aligning the template to the subject,
/// 2. warp the face mask onto the subject grid (nearest neighbor),
/// 3. voxelate the subject,
/// 4. composite original and voxelated volumes under the warped mask.
///
/// The mask convention is "1 = keep the original voxel": the bundled deface
/// mask is zero over facial anatomy, so the face region is replaced by the
/// voxelated copy and everything else passes through untouched. Voxels the
/// warped mask does not cover (outside the template's field of view) weigh
/// 0 and are voxelated as well.
pub struct DefacePipeline {
    config: DefaceConfig,
}

impl DefacePipeline {
    pub fn new(config: DefaceConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline. `subject` is the fixed volume; `template` and
    /// `mask` are the bundled assets, with `mask` registered on the
    /// template grid.
    pub fn run<B: Backend>(
        &self,
        subject: &Image<B, 3>,
        template: &Image<B, 3>,
        mask: &Image<B, 3>,
    ) -> Result<DefaceOutput<B>> {
        subject.validate_geometry()?;
        template.validate_geometry()?;
        mask.validate_geometry()?;

        if !mask.grid().approx_eq(&template.grid(), 1e-3) {
            return Err(ImageError::grid_mismatch(
                "face mask is not registered on the template grid",
            )
            .into());
        }

        tracing::info!(
            subject_size = ?subject.shape(),
            template_size = ?template.shape(),
            "registering template to subject space"
        );
        let transform = self.estimate(subject, template)?;

        tracing::info!("warping face mask into subject space");
        let warped_mask = ResampleImageFilter::new_from_reference(
            subject,
            transform.clone(),
            NearestNeighborInterpolator::new(),
        )
        .apply(mask);

        // The warp targets the subject grid by construction; a mismatch
        // here means the mask would blend against the wrong voxels.
        if !warped_mask.grid().approx_eq(&subject.grid(), 1e-6) {
            return Err(ImageError::grid_mismatch(
                "warped mask left the subject grid",
            )
            .into());
        }

        tracing::info!(voxel_size_mm = self.config.voxel_size_mm, "voxelating subject");
        let voxelated = VoxelateFilter::new(self.config.voxel_size_mm).apply(subject)?;

        tracing::info!("compositing defaced volume");
        let defaced = CompositeFilter::new().apply(subject, &voxelated, &warped_mask)?;

        Ok(DefaceOutput {
            defaced,
            warped_mask,
            voxelated,
            transform,
        })
    }

    fn estimate<B: Backend>(
        &self,
        subject: &Image<B, 3>,
        template: &Image<B, 3>,
    ) -> std::result::Result<AffineTransform<3>, RegistrationError> {
        match self.config.metric {
            MetricKind::NormalizedCrossCorrelation => {
                self.run_registration(NormalizedCrossCorrelation::new(), subject, template)
            }
            MetricKind::MutualInformation => {
                self.run_registration(MutualInformation::default(), subject, template)
            }
        }
    }

    fn run_registration<B: Backend, M: Metric<B, 3>>(
        &self,
        metric: M,
        subject: &Image<B, 3>,
        template: &Image<B, 3>,
    ) -> std::result::Result<AffineTransform<3>, RegistrationError> {
        let mut registration = AffineRegistration::new(metric)
            .with_schedule(RegistrationSchedule::levels(self.config.levels))
            .with_model(self.config.model)
            .with_divergence_tolerance(self.config.divergence_tolerance);
        if let Some(timeout) = self.config.timeout {
            registration = registration.with_timeout(timeout);
        }
        registration.execute(subject, template)
    }
}
