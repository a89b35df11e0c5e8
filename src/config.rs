use crate::{
    assembler::DEFAULT_EXTENSION, enums::SortBy, normalizer::DEFAULT_TARGET_SHAPE,
    report::ReportConfig,
};

use std::path::PathBuf;

/// Everything one pipeline run needs; nothing is read from global state.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Folder holding one sub-folder of slices per patient.
    pub mri_dir: PathBuf,
    pub clinical_csv: PathBuf,
    /// `(height, width)` every slice is resized to.
    pub target_shape: (usize, usize),
    pub extension: String,
    pub sort_by: SortBy,
    pub parallel: bool,
    pub features_csv: Option<PathBuf>,
    pub combined_csv: Option<PathBuf>,
    /// Where to write a PNG of each patient's middle slice.
    pub preview_dir: Option<PathBuf>,
    pub report: ReportConfig,
}

impl PipelineConfig {
    pub fn new(mri_dir: impl Into<PathBuf>, clinical_csv: impl Into<PathBuf>) -> Self {
        Self {
            mri_dir: mri_dir.into(),
            clinical_csv: clinical_csv.into(),
            target_shape: DEFAULT_TARGET_SHAPE,
            extension: DEFAULT_EXTENSION.to_string(),
            sort_by: SortBy::default(),
            parallel: false,
            features_csv: None,
            combined_csv: None,
            preview_dir: None,
            report: ReportConfig::default(),
        }
    }
}
