use crate::{
    PatientId,
    loader::{Diagnostic, PatientVolumeLoader},
    slice_reader::SliceReader,
    volume::Volume,
};

use serde::Serialize;
use std::{collections::BTreeMap, io, path::Path};
use thiserror::Error;

pub const MEAN_INTENSITY: &str = "Mean_Intensity";
pub const STD_INTENSITY: &str = "Std_Intensity";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("cannot compute intensity statistics of an empty volume")]
    EmptyVolume,
}

/// Global intensity statistics of one volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityFeatures {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl IntensityFeatures {
    /// Mean and population standard deviation over every voxel.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::EmptyVolume`] if the volume has no voxels.
    pub fn extract(volume: &Volume) -> Result<Self, FeatureError> {
        let data = volume.data();
        if data.is_empty() {
            return Err(FeatureError::EmptyVolume);
        }

        let count = data.len() as f64;
        let mean = data.iter().map(|&v| f64::from(v)).sum::<f64>() / count;
        let variance = data
            .iter()
            .map(|&v| {
                let diff = f64::from(v) - mean;
                diff * diff
            })
            .sum::<f64>()
            / count;

        Ok(Self {
            mean,
            std: variance.sqrt(),
        })
    }
}

#[derive(Serialize)]
struct FeatureRow<'a> {
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "Mean_Intensity")]
    mean: f64,
    #[serde(rename = "Std_Intensity")]
    std: f64,
}

/// Intensity features keyed by patient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: BTreeMap<PatientId, IntensityFeatures>,
}

impl FeatureTable {
    pub const COLUMNS: [&'static str; 2] = [MEAN_INTENSITY, STD_INTENSITY];

    /// Load and reduce every patient, keeping only the features.
    ///
    /// `on_volume` sees each volume before it is dropped.
    pub fn extract_all<R, S, F>(
        loader: &PatientVolumeLoader<R>,
        patient_ids: &[S],
        on_volume: F,
    ) -> (Self, Vec<Diagnostic>)
    where
        R: SliceReader,
        S: AsRef<str>,
        F: Fn(&str, &Volume) + Sync,
    {
        let (results, mut diagnostics) = loader.map_volumes(patient_ids, |id, volume| {
            on_volume(id, &volume);
            IntensityFeatures::extract(&volume)
        });

        let mut rows = BTreeMap::new();
        for (id, result) in results {
            match result {
                Ok(features) => {
                    rows.insert(id, features);
                }
                Err(err) => {
                    log::warn!("patient {id}: {err}");
                    diagnostics.push(Diagnostic::EmptyVolume { patient: id });
                }
            }
        }
        (Self { rows }, diagnostics)
    }

    pub fn insert(&mut self, patient: impl Into<PatientId>, features: IntensityFeatures) {
        self.rows.insert(patient.into(), features);
    }

    pub fn get(&self, patient: &str) -> Option<&IntensityFeatures> {
        self.rows.get(patient)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IntensityFeatures)> {
        self.rows.iter().map(|(id, f)| (id.as_str(), f))
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for (subject, features) in self.iter() {
            writer.serialize(FeatureRow {
                subject,
                mean: features.mean,
                std: features.std,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl FromIterator<(PatientId, IntensityFeatures)> for FeatureTable {
    fn from_iter<I: IntoIterator<Item = (PatientId, IntensityFeatures)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembler::{
            VolumeAssembler,
            tests::{TextSliceReader, write_slice},
        },
        normalizer::SliceNormalizer,
    };
    use ndarray::{Array3, array};

    #[test]
    fn constant_volume_has_zero_spread() {
        let volume = Volume::new(Array3::from_elem((3, 4, 4), 12.5));
        let features = IntensityFeatures::extract(&volume).unwrap();
        assert_eq!(features, IntensityFeatures { mean: 12.5, std: 0.0 });
    }

    #[test]
    fn uses_population_standard_deviation() {
        let volume = Volume::new(array![[[2.0, 4.0], [4.0, 4.0]], [[5.0, 5.0], [7.0, 9.0]]]);
        let features = IntensityFeatures::extract(&volume).unwrap();
        assert_eq!(features.mean, 5.0);
        assert_eq!(features.std, 2.0);
    }

    #[test]
    fn empty_volume_is_an_error() {
        let volume = Volume::new(Array3::zeros((0, 128, 128)));
        assert_eq!(
            IntensityFeatures::extract(&volume),
            Err(FeatureError::EmptyVolume)
        );
    }

    #[test]
    fn empty_volumes_are_reported_as_such() {
        let dir = tempfile::tempdir().unwrap();
        write_slice(&dir.path().join("A"), "1.dcm", 1.0, 1.0);
        let loader = PatientVolumeLoader::new(
            dir.path(),
            VolumeAssembler::new(TextSliceReader, SliceNormalizer::new((0, 4))),
        );

        let (table, diagnostics) = FeatureTable::extract_all(&loader, &["A"], |_, _| {});

        assert!(table.is_empty());
        assert_eq!(
            diagnostics,
            vec![Diagnostic::EmptyVolume {
                patient: "A".to_string()
            }]
        );
        assert!(diagnostics[0].is_patient_skipped());
    }

    #[test]
    fn writes_csv_with_named_columns() {
        let table: FeatureTable = [
            ("B".to_string(), IntensityFeatures { mean: 2.0, std: 0.5 }),
            ("A".to_string(), IntensityFeatures { mean: 1.0, std: 0.25 }),
        ]
        .into_iter()
        .collect();

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Subject,Mean_Intensity,Std_Intensity\nA,1.0,0.25\nB,2.0,0.5\n"
        );
    }
}
