use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dicom_cohort::{CohortReport, Pipeline, PipelineConfig, ReportConfig, SortBy};

#[derive(Parser, Debug)]
#[command(author, version, about = "Join MRI intensity features with clinical records")]
struct Cli {
    /// Folder with one sub-folder of DICOM files per patient
    #[arg(value_name = "MRI_DIR")]
    mri_dir: PathBuf,

    /// Clinical CSV with a `Subject` column
    #[arg(value_name = "CLINICAL_CSV")]
    clinical_csv: PathBuf,

    /// Slice height after resizing
    #[arg(long, default_value_t = 128)]
    height: usize,

    /// Slice width after resizing
    #[arg(long, default_value_t = 128)]
    width: usize,

    /// Extension of the image files
    #[arg(long, default_value = "dcm")]
    extension: String,

    /// Attribute slices are ordered by
    #[arg(long, value_enum, default_value_t = SortBy::ImagePositionPatient)]
    sort_by: SortBy,

    /// Process patients in parallel
    #[arg(long)]
    parallel: bool,

    /// Write the feature table to this CSV file
    #[arg(long)]
    features_csv: Option<PathBuf>,

    /// Write the combined table to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a PNG of each patient's middle slice into this folder
    #[arg(long)]
    preview_dir: Option<PathBuf>,

    /// Rows of the combined table to print
    #[arg(long, default_value_t = 5)]
    head: usize,

    /// Decimals in the printed report
    #[arg(long, default_value_t = 2)]
    precision: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for PipelineConfig {
    fn from(cli: Cli) -> Self {
        PipelineConfig {
            target_shape: (cli.height, cli.width),
            extension: cli.extension,
            sort_by: cli.sort_by,
            parallel: cli.parallel,
            features_csv: cli.features_csv,
            combined_csv: cli.output,
            preview_dir: cli.preview_dir,
            report: ReportConfig {
                head_rows: cli.head,
                precision: cli.precision,
                ..ReportConfig::default()
            },
            ..PipelineConfig::new(cli.mri_dir, cli.clinical_csv)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = PipelineConfig::from(cli);
    let output = Pipeline::new(config.clone())
        .run()
        .with_context(|| format!("processing {}", config.mri_dir.display()))?;

    println!("Clinical records:");
    print!("{}", output.clinical.format_head(config.report.head_rows));

    let skipped = output
        .diagnostics
        .iter()
        .filter(|d| d.is_patient_skipped())
        .count();
    println!(
        "{} of {} patients processed ({} skipped, {} diagnostics)",
        output.features.len(),
        output.clinical.unique_subjects().len(),
        skipped,
        output.diagnostics.len()
    );

    if output.combined.is_empty() {
        println!("No combined records. Check that patient ids match the imaging folders.");
        return Ok(());
    }

    match CohortReport::build(&output.combined, &config.report) {
        Ok(report) => print!("{report}"),
        Err(err) => log::warn!("no cohort report: {err}"),
    }
    Ok(())
}
