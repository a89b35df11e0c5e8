use image::{ImageBuffer, Luma};
use ndarray::{Array3, ArrayView2, s};
use rayon::prelude::*;
use std::path::Path;

/// Stack of normalized slices, shape `(slices, height, width)`, ordered by
/// ascending slice position.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub data: Array3<f32>,
}

impl Volume {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The `index`-th slice in position order.
    pub fn slice(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.dim().0).then(|| self.data.slice(s![index, .., ..]))
    }

    /// 8-bit rendering of the middle axial slice, windowed to its own
    /// min/max.
    pub fn middle_slice_image(&self) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let slice = self.slice(self.dim().0 / 2)?;
        Self::slice_to_image(&slice)
    }

    pub fn save_preview(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        match self.middle_slice_image() {
            Some(image) => image.save(path),
            None => Ok(()),
        }
    }

    #[inline]
    fn normalize_to_u8(value: f32, min: f32, range: f32) -> u8 {
        if range <= 0.0 {
            return 0;
        }
        (((value - min) / range) * 255.0).clamp(0.0, 255.0) as u8
    }

    fn slice_to_image(slice: &ArrayView2<'_, f32>) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (height, width) = slice.dim();
        let (min, max) = slice
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&v| Self::normalize_to_u8(v, min, range))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_volume() -> Volume {
        Volume::new(Array3::from_shape_fn((3, 2, 4), |(z, y, x)| {
            (z * 100 + y * 10 + x) as f32
        }))
    }

    #[test]
    fn slices_are_indexed_in_position_order() {
        let volume = ramp_volume();
        let last = volume.slice(2).unwrap();
        assert_eq!(last.dim(), (2, 4));
        assert_eq!(last[[1, 3]], 213.0);
    }

    #[test]
    fn out_of_range_index_returns_none() {
        let volume = ramp_volume();
        assert!(volume.slice(3).is_none());
        assert!(Volume::new(Array3::zeros((0, 2, 2))).middle_slice_image().is_none());
    }

    #[test]
    fn middle_slice_is_windowed_to_full_gray_range() {
        let image = ramp_volume().middle_slice_image().unwrap();
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(3, 1).0, [255]);
    }

    #[test]
    fn constant_slice_renders_black() {
        let volume = Volume::new(Array3::from_elem((1, 2, 2), 7.0));
        let image = volume.middle_slice_image().unwrap();
        assert!(image.pixels().all(|p| p.0 == [0]));
    }

    #[test]
    fn preview_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        ramp_volume().save_preview(&path).unwrap();
        assert!(path.is_file());
    }
}
