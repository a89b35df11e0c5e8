use crate::{
    normalizer::SliceNormalizer,
    slice_reader::{SliceReadError, SliceReader},
    volume::Volume,
};

use ndarray::{Array2, Array3, s};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const DEFAULT_EXTENSION: &str = "dcm";

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("no slices could be decoded from {}", folder.display())]
    NoSlicesDecoded { folder: PathBuf },

    #[error("could not traverse patient folder: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Read(#[from] SliceReadError),

    #[error("could not traverse: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A file, or a part of the folder tree, left out of the volume.
#[derive(Debug)]
pub struct SkippedSlice {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// A volume together with the files that could not contribute to it.
#[derive(Debug)]
pub struct Assembly {
    pub volume: Volume,
    pub skipped: Vec<SkippedSlice>,
}

/// Collects the slices of one patient folder into an ordered [`Volume`].
pub struct VolumeAssembler<R> {
    reader: R,
    normalizer: SliceNormalizer,
    extension: String,
}

impl<R: SliceReader> VolumeAssembler<R> {
    pub fn new(reader: R, normalizer: SliceNormalizer) -> Self {
        Self {
            reader,
            normalizer,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Only files with this extension (case-insensitive) are read.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Build the volume of every slice found below `folder`.
    ///
    /// Files that fail to decode and sub-folders that cannot be entered are
    /// logged, listed in [`Assembly::skipped`] and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::NoSlicesDecoded`] if not a single slice
    /// could be read, or [`AssembleError::Walk`] if `folder` itself cannot
    /// be opened.
    pub fn assemble(&self, folder: impl AsRef<Path>) -> Result<Assembly, AssembleError> {
        let folder = folder.as_ref();
        let mut skipped = Vec::new();
        let paths = self.find_slice_files(folder, &mut skipped)?;
        log::debug!("found {} slice files in {}", paths.len(), folder.display());

        let mut positioned = Vec::with_capacity(paths.len());
        for path in paths {
            match self.reader.read(&path) {
                Ok(slice) => {
                    let image = self.normalizer.normalize(slice.pixels.view());
                    positioned.push((slice.position, image));
                }
                Err(reason) => {
                    log::warn!("skipping slice {}: {reason}", path.display());
                    skipped.push(SkippedSlice {
                        path,
                        reason: reason.into(),
                    });
                }
            }
        }

        if positioned.is_empty() {
            return Err(AssembleError::NoSlicesDecoded {
                folder: folder.to_path_buf(),
            });
        }

        Self::sort_slices(&mut positioned);
        let images: Vec<_> = positioned.into_iter().map(|(_, image)| image).collect();

        Ok(Assembly {
            volume: Volume::new(self.build_volume_array(&images)),
            skipped,
        })
    }

    /// Recursively list matching files, in file-name order so that equal
    /// positions always resolve the same way. Symbolic links are followed.
    ///
    /// Entries below `folder` that cannot be read go to `skipped`; only a
    /// failure on `folder` itself is an error.
    fn find_slice_files(
        &self,
        folder: &Path,
        skipped: &mut Vec<SkippedSlice>,
    ) -> Result<Vec<PathBuf>, walkdir::Error> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(folder).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => return Err(err),
                Err(err) => {
                    let path = err.path().unwrap_or(folder).to_path_buf();
                    log::warn!("skipping {}: {err}", path.display());
                    skipped.push(SkippedSlice {
                        path,
                        reason: err.into(),
                    });
                    continue;
                }
            };
            if entry.file_type().is_file() && self.has_slice_extension(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    fn has_slice_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    /// Stable ascending sort; ties keep discovery order.
    fn sort_slices(slices: &mut [(f64, Array2<f32>)]) {
        slices.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    fn build_volume_array(&self, images: &[Array2<f32>]) -> Array3<f32> {
        let (height, width) = self.normalizer.target_shape();
        let depth = images.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }
}
