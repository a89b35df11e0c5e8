use crate::enums::SortBy;

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, s};
use std::path::Path;
use thiserror::Error;

/// One decoded cross-section and its coordinate along the stacking axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub pixels: Array2<f32>,
    pub position: f64,
}

#[derive(Debug, Error)]
pub enum SliceReadError {
    #[error("not a readable DICOM file: {0}")]
    Open(#[from] dicom::object::ReadError),

    #[error("could not decode pixel data: {0}")]
    Decode(#[from] dicom::pixeldata::Error),

    #[error("missing slice position ({0:?})")]
    MissingPosition(SortBy),

    #[error("image has no pixels")]
    EmptyImage,
}

/// Decodes one imaging file into a [`Slice`].
pub trait SliceReader: Sync {
    fn read(&self, path: &Path) -> Result<Slice, SliceReadError>;
}

impl<R: SliceReader + ?Sized> SliceReader for &R {
    fn read(&self, path: &Path) -> Result<Slice, SliceReadError> {
        (**self).read(path)
    }
}

/// [`SliceReader`] backed by the dicom-rs stack.
///
/// Pixel values go through the modality LUT (rescale slope and intercept)
/// but no VOI windowing, so intensities stay on the scanner's scale. Only
/// the first frame and first sample of each file are used.
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomSliceReader {
    sort_by: SortBy,
}

impl DicomSliceReader {
    pub fn new(sort_by: SortBy) -> Self {
        Self { sort_by }
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    fn get_position(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<f64> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float64()
                    .ok()?;
                pos.get(2).copied()
            }
            SortBy::TablePosition => dicom_object
                .element(tags::TABLE_POSITION)
                .ok()?
                .to_float64()
                .ok(),
            SortBy::InstanceNumber => dicom_object
                .element(tags::INSTANCE_NUMBER)
                .ok()?
                .to_int::<i32>()
                .ok()
                .map(f64::from),
        }
    }

    fn decode_image(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Result<Array2<f32>, SliceReadError> {
        let pixel_data = dicom_object.decode_pixel_data()?;
        let frames = pixel_data.to_ndarray_with_options::<f32>(&ConvertOptions::new())?;
        let image = frames.slice_move(s![0, .., .., 0]);
        if image.is_empty() {
            return Err(SliceReadError::EmptyImage);
        }
        Ok(image)
    }
}

impl SliceReader for DicomSliceReader {
    fn read(&self, path: &Path) -> Result<Slice, SliceReadError> {
        let dicom_object = open_file(path)?;
        let position = Self::get_position(&dicom_object, self.sort_by)
            .ok_or(SliceReadError::MissingPosition(self.sort_by))?;
        let pixels = Self::decode_image(&dicom_object)?;
        Ok(Slice { pixels, position })
    }
}
