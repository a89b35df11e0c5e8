use crate::{
    assembler::VolumeAssembler,
    clinical::ClinicalTable,
    config::PipelineConfig,
    features::FeatureTable,
    join::{CombinedTable, join},
    loader::{Diagnostic, PatientVolumeLoader},
    normalizer::SliceNormalizer,
    slice_reader::{DicomSliceReader, SliceReader},
    table::TableError,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not load clinical data: {0}")]
    Clinical(#[source] TableError),

    #[error("could not join clinical data with features: {0}")]
    Join(#[source] TableError),

    #[error("could not write features: {0}")]
    WriteFeatures(#[source] csv::Error),

    #[error("could not write combined table: {0}")]
    WriteCombined(#[source] TableError),

    #[error("could not create preview folder: {0}")]
    PreviewDir(#[source] std::io::Error),
}

/// Products of one run. Volumes are not kept.
#[derive(Debug)]
pub struct PipelineOutput {
    pub clinical: ClinicalTable,
    pub features: FeatureTable,
    pub combined: CombinedTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Clinical CSV and per-patient imaging in, combined feature table out.
pub struct Pipeline<R = DicomSliceReader> {
    config: PipelineConfig,
    reader: R,
}

impl Pipeline<DicomSliceReader> {
    pub fn new(config: PipelineConfig) -> Self {
        let reader = DicomSliceReader::new(config.sort_by);
        Self { config, reader }
    }
}

impl<R: SliceReader> Pipeline<R> {
    pub fn with_reader(config: PipelineConfig, reader: R) -> Self {
        Self { config, reader }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Fails only on clinical-table problems, a feature column clash in the
    /// join, or when a requested output cannot be written. Patients or
    /// slices that cannot be loaded end up in
    /// [`PipelineOutput::diagnostics`].
    pub fn run(&self) -> Result<PipelineOutput, PipelineError> {
        let config = &self.config;

        let clinical =
            ClinicalTable::from_csv(&config.clinical_csv).map_err(PipelineError::Clinical)?;
        let patient_ids = clinical.unique_subjects();
        log::info!(
            "loaded {} clinical records for {} patients",
            clinical.len(),
            patient_ids.len()
        );

        if let Some(dir) = &config.preview_dir {
            std::fs::create_dir_all(dir).map_err(PipelineError::PreviewDir)?;
        }

        let normalizer = SliceNormalizer::new(config.target_shape);
        let assembler = VolumeAssembler::new(&self.reader, normalizer)
            .with_extension(config.extension.clone());
        let loader = PatientVolumeLoader::new(&config.mri_dir, assembler)
            .with_parallel(config.parallel);

        let (features, diagnostics) =
            FeatureTable::extract_all(&loader, &patient_ids, |id, volume| {
                let Some(dir) = &config.preview_dir else {
                    return;
                };
                let path = dir.join(format!("{id}.png"));
                if let Err(err) = volume.save_preview(&path) {
                    log::warn!("could not write preview {}: {err}", path.display());
                }
            });
        log::info!("{} patients processed", features.len());

        let combined = join(&clinical, &features).map_err(PipelineError::Join)?;
        log::info!("{} combined records", combined.len());

        if let Some(path) = &config.features_csv {
            features
                .write_csv(path)
                .map_err(PipelineError::WriteFeatures)?;
        }
        if let Some(path) = &config.combined_csv {
            combined
                .write_csv(path)
                .map_err(PipelineError::WriteCombined)?;
        }

        Ok(PipelineOutput {
            clinical,
            features,
            combined,
            diagnostics,
        })
    }
}
