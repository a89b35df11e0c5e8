use crate::{
    PatientId,
    assembler::{AssembleError, VolumeAssembler},
    slice_reader::SliceReader,
    volume::Volume,
};

use rayon::prelude::*;
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    path::PathBuf,
};

/// Something that kept a patient, or one of its files, out of the result.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    PatientFolderNotFound { patient: PatientId, folder: PathBuf },
    NoSlicesDecoded { patient: PatientId },
    /// The assembled volume has no voxels, e.g. for a zero target shape.
    EmptyVolume { patient: PatientId },
    TraversalFailed { patient: PatientId, reason: String },
    SliceSkipped { patient: PatientId, path: PathBuf, reason: String },
}

impl Diagnostic {
    pub fn patient(&self) -> &str {
        match self {
            Diagnostic::PatientFolderNotFound { patient, .. }
            | Diagnostic::NoSlicesDecoded { patient }
            | Diagnostic::EmptyVolume { patient }
            | Diagnostic::TraversalFailed { patient, .. }
            | Diagnostic::SliceSkipped { patient, .. } => patient,
        }
    }

    /// Whether the patient is missing from the result because of this.
    pub fn is_patient_skipped(&self) -> bool {
        !matches!(self, Diagnostic::SliceSkipped { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::PatientFolderNotFound { patient, folder } => {
                write!(f, "patient {patient}: folder not found at {}", folder.display())
            }
            Diagnostic::NoSlicesDecoded { patient } => {
                write!(f, "patient {patient}: no slices could be decoded")
            }
            Diagnostic::EmptyVolume { patient } => {
                write!(f, "patient {patient}: volume has no voxels")
            }
            Diagnostic::TraversalFailed { patient, reason } => {
                write!(f, "patient {patient}: {reason}")
            }
            Diagnostic::SliceSkipped {
                patient,
                path,
                reason,
            } => write!(f, "patient {patient}: skipped {}: {reason}", path.display()),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub volumes: BTreeMap<PatientId, Volume>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Loads the volumes of many patients from `<base_dir>/<patient id>/`.
///
/// Missing folders and folders without a single decodable slice are
/// reported as [`Diagnostic`]s; the batch itself never fails.
pub struct PatientVolumeLoader<R> {
    base_dir: PathBuf,
    assembler: VolumeAssembler<R>,
    parallel: bool,
}

impl<R: SliceReader> PatientVolumeLoader<R> {
    pub fn new(base_dir: impl Into<PathBuf>, assembler: VolumeAssembler<R>) -> Self {
        Self {
            base_dir: base_dir.into(),
            assembler,
            parallel: false,
        }
    }

    /// Assemble patients concurrently. Each worker still holds only the
    /// volume it is currently reducing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load every requested patient and keep all volumes.
    pub fn load_all<S: AsRef<str>>(&self, patient_ids: &[S]) -> LoadOutcome {
        let (volumes, diagnostics) = self.map_volumes(patient_ids, |_, volume| volume);
        LoadOutcome {
            volumes,
            diagnostics,
        }
    }

    /// Assemble each patient and reduce its volume with `f` straight away,
    /// so the volume is dropped before the next patient is read.
    ///
    /// Duplicate ids are loaded once. The result is keyed by patient id and
    /// does not depend on completion order.
    pub fn map_volumes<S, T, F>(
        &self,
        patient_ids: &[S],
        f: F,
    ) -> (BTreeMap<PatientId, T>, Vec<Diagnostic>)
    where
        S: AsRef<str>,
        T: Send,
        F: Fn(&str, Volume) -> T + Sync,
    {
        let ids = Self::unique_ids(patient_ids);
        let process = |id: &str| {
            let (volume, diagnostics) = self.load_patient(id);
            (id.to_string(), volume.map(|v| f(id, v)), diagnostics)
        };

        let results: Vec<_> = if self.parallel {
            ids.into_par_iter().map(process).collect()
        } else {
            ids.into_iter().map(process).collect()
        };

        let mut values = BTreeMap::new();
        let mut all_diagnostics = Vec::new();
        for (id, value, diagnostics) in results {
            all_diagnostics.extend(diagnostics);
            if let Some(value) = value {
                values.insert(id, value);
            }
        }
        (values, all_diagnostics)
    }

    fn load_patient(&self, patient_id: &str) -> (Option<Volume>, Vec<Diagnostic>) {
        let folder = self.base_dir.join(patient_id);
        if !folder.is_dir() {
            log::warn!(
                "folder for patient {patient_id} not found in {}",
                self.base_dir.display()
            );
            let diagnostic = Diagnostic::PatientFolderNotFound {
                patient: patient_id.to_string(),
                folder,
            };
            return (None, vec![diagnostic]);
        }

        log::info!("processing patient {patient_id}");
        match self.assembler.assemble(&folder) {
            Ok(assembly) => {
                let diagnostics = assembly
                    .skipped
                    .into_iter()
                    .map(|skipped| Diagnostic::SliceSkipped {
                        patient: patient_id.to_string(),
                        path: skipped.path,
                        reason: skipped.reason.to_string(),
                    })
                    .collect();
                (Some(assembly.volume), diagnostics)
            }
            Err(AssembleError::NoSlicesDecoded { .. }) => {
                log::warn!("patient {patient_id} has no decodable slices, skipping");
                let diagnostic = Diagnostic::NoSlicesDecoded {
                    patient: patient_id.to_string(),
                };
                (None, vec![diagnostic])
            }
            Err(err @ AssembleError::Walk(_)) => {
                log::warn!("patient {patient_id} skipped: {err}");
                let diagnostic = Diagnostic::TraversalFailed {
                    patient: patient_id.to_string(),
                    reason: err.to_string(),
                };
                (None, vec![diagnostic])
            }
        }
    }

    fn unique_ids<S: AsRef<str>>(patient_ids: &[S]) -> Vec<&str> {
        let mut seen = HashSet::new();
        patient_ids
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}
