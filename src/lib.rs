//! # DICOM-cohort library
//!
//! This crate turns a folder of per-patient DICOM series and a clinical
//! CSV export into one table of clinical attributes and image intensity
//! features per patient.
//!
//! The pipeline runs in these steps:
//!  - every `.dcm` file below `<mri dir>/<patient id>/` is decoded into a
//!    slice and its position along the scan axis (by default the third
//!    component of Image Position (Patient))
//!  - slices are resized to a common shape (128x128 unless configured)
//!    with a triangle filter, keeping the scanner's intensity scale
//!  - slices are sorted by position and stacked into a volume
//!  - each volume is reduced to its mean and population standard
//!    deviation and then dropped
//!  - the features are inner-joined with the clinical records on `Subject`
//!
//! Unreadable files and patients without usable images never abort a run;
//! they are logged and returned as [`loader::Diagnostic`]s.
//!
//! Patients can be processed in parallel using rayon.
//!
//! # Examples
//!
//! ## Loading a single patient's volume
//!
//! ```no_run
//! # use dicom_cohort::{DicomSliceReader, SliceNormalizer, VolumeAssembler};
//! let assembler = VolumeAssembler::new(DicomSliceReader::default(), SliceNormalizer::default());
//! let assembly = assembler
//!     .assemble("MRI/ADNI/002_S_0295")
//!     .expect("should have decoded at least one slice");
//! println!("volume shape: {:?}", assembly.volume.dim());
//! ```
//!
//! ## Running the whole pipeline
//!
//! ```no_run
//! # use dicom_cohort::{Pipeline, PipelineConfig};
//! let config = PipelineConfig::new("MRI/ADNI", "clinical.csv");
//! let output = Pipeline::new(config).run().expect("clinical data should load");
//! println!("{} patients with features", output.features.len());
//! ```

pub mod assembler;
pub mod clinical;
pub mod config;
pub mod enums;
pub mod features;
mod interpolator;
pub mod join;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod slice_reader;
pub mod table;
pub mod volume;

/// Identifier shared by clinical records and imaging folders.
pub type PatientId = String;

pub use assembler::{AssembleError, Assembly, SkipReason, VolumeAssembler};
pub use clinical::ClinicalTable;
pub use config::PipelineConfig;
pub use enums::SortBy;
pub use features::{FeatureError, FeatureTable, IntensityFeatures};
pub use join::{CombinedTable, join};
pub use loader::{Diagnostic, LoadOutcome, PatientVolumeLoader};
pub use normalizer::SliceNormalizer;
pub use pipeline::{Pipeline, PipelineError, PipelineOutput};
pub use report::{CohortReport, ReportConfig};
pub use slice_reader::{DicomSliceReader, Slice, SliceReadError, SliceReader};
pub use volume::Volume;
