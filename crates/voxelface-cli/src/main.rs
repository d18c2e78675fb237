//! voxelface: de-identify structural MRI by voxelating the face region.

use std::path::PathBuf;
use std::time::Duration;
use anyhow::{bail, Context, Result};
use burn_ndarray::NdArray;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use voxelface_io::{read_nifti, write_nifti};
use voxelface_pipeline::{DefaceConfig, DefacePipeline, MetricKind, TransformModel};

mod paths;

use paths::{backup_path, derive_output_path, with_suffix};

/// Bundled template assets, loaded read-only.
const TEMPLATE_FILE: &str = "ConteCore2_50_T1w_2mm.nii.gz";
const FACEMASK_FILE: &str = "ConteCore2_50_2mm_deface_mask.nii.gz";

type Backend = NdArray<f32>;

#[derive(Parser)]
#[command(name = "voxelface")]
#[command(version)]
#[command(about = "Fast MRI face voxelator for de-identifying T1w and T2w structural images")]
struct Cli {
    /// Structural MRI with intact face
    #[arg(short = 'i', long)]
    infile: PathBuf,

    /// Defaced image filename (default: input with a _defaced suffix)
    #[arg(short = 'o', long, conflicts_with = "in_place")]
    outfile: Option<PathBuf>,

    /// Overwrite the input in place, backing the original up with a _faced suffix
    #[arg(long)]
    in_place: bool,

    /// Template volume (default: <template-dir>/ConteCore2_50_T1w_2mm.nii.gz)
    #[arg(long)]
    template: Option<PathBuf>,

    /// Face mask volume (default: <template-dir>/ConteCore2_50_2mm_deface_mask.nii.gz)
    #[arg(long)]
    facemask: Option<PathBuf>,

    /// Directory holding the bundled template assets
    /// (falls back to $VOXELFACE_TEMPLATE_DIR)
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Edge length in mm of the voxelation cubes
    #[arg(long, default_value_t = 8.0)]
    voxel_size: f64,

    /// Registration degrees of freedom
    #[arg(long, value_enum, default_value = "affine")]
    model: ModelArg,

    /// Registration similarity metric
    #[arg(long, value_enum, default_value = "ncc")]
    metric: MetricArg,

    /// Registration time budget in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Also write the warped facemask and the voxelated volume next to the output
    #[arg(long)]
    save_intermediates: bool,

    /// Verbose progress logging (no behavioral effect)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    Translation,
    Rigid,
    Affine,
}

impl From<ModelArg> for TransformModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Translation => TransformModel::Translation,
            ModelArg::Rigid => TransformModel::Rigid,
            ModelArg::Affine => TransformModel::Affine,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    /// Normalized cross correlation
    Ncc,
    /// Mutual information
    Mi,
}

impl From<MetricArg> for MetricKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Ncc => MetricKind::NormalizedCrossCorrelation,
            MetricArg::Mi => MetricKind::MutualInformation,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    if !cli.infile.is_file() {
        bail!("input volume not found: {}", cli.infile.display());
    }

    let template_dir = cli
        .template_dir
        .clone()
        .or_else(|| std::env::var_os("VOXELFACE_TEMPLATE_DIR").map(PathBuf::from));
    let template_path = resolve_asset(cli.template.clone(), &template_dir, TEMPLATE_FILE, "template")?;
    let facemask_path = resolve_asset(cli.facemask.clone(), &template_dir, FACEMASK_FILE, "facemask")?;

    let output_path = if cli.in_place {
        cli.infile.clone()
    } else {
        cli.outfile
            .clone()
            .unwrap_or_else(|| derive_output_path(&cli.infile))
    };

    info!("faced image   : {}", cli.infile.display());
    info!("defaced image : {}", output_path.display());

    let device = Default::default();

    info!("loading faced image");
    let subject = read_nifti::<Backend, _>(&cli.infile, &device)
        .with_context(|| format!("failed to load subject volume {}", cli.infile.display()))?;

    info!("loading template from {}", template_path.display());
    let template = read_nifti::<Backend, _>(&template_path, &device)
        .with_context(|| format!("failed to load template {}", template_path.display()))?;

    info!("loading facemask from {}", facemask_path.display());
    let mask = read_nifti::<Backend, _>(&facemask_path, &device)
        .with_context(|| format!("failed to load facemask {}", facemask_path.display()))?;

    let mut config = DefaceConfig::default()
        .with_voxel_size_mm(cli.voxel_size)
        .with_model(cli.model.into())
        .with_metric(cli.metric.into());
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let output = DefacePipeline::new(config)
        .run(&subject, &template, &mask)
        .context("defacing pipeline failed")?;

    // Everything below is write-last: nothing touches the filesystem until
    // the pipeline has fully succeeded.
    if cli.save_intermediates {
        let facemask_out = with_suffix(&output_path, "_facemask");
        write_nifti(&facemask_out, &output.warped_mask)
            .with_context(|| format!("failed to write {}", facemask_out.display()))?;
        info!("wrote warped facemask to {}", facemask_out.display());

        let voxelated_out = with_suffix(&output_path, "_voxelated");
        write_nifti(&voxelated_out, &output.voxelated)
            .with_context(|| format!("failed to write {}", voxelated_out.display()))?;
        info!("wrote voxelated volume to {}", voxelated_out.display());
    }

    if cli.in_place {
        let backup = backup_path(&cli.infile);
        std::fs::rename(&cli.infile, &backup)
            .with_context(|| format!("failed to back up original to {}", backup.display()))?;
        info!("original backed up to {}", backup.display());
    }

    write_nifti(&output_path, &output.defaced)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    info!("wrote defaced volume to {}", output_path.display());

    Ok(())
}

fn resolve_asset(
    explicit: Option<PathBuf>,
    template_dir: &Option<PathBuf>,
    file_name: &str,
    flag: &str,
) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path,
        None => match template_dir {
            Some(dir) => dir.join(file_name),
            None => bail!(
                "no {flag} given: pass --{flag}, or point --template-dir / \
                 VOXELFACE_TEMPLATE_DIR at the bundled assets"
            ),
        },
    };
    if !path.is_file() {
        bail!("{flag} not found: {}", path.display());
    }
    Ok(path)
}
