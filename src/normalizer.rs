use crate::interpolator::{Interpolator, Taps};

use ndarray::{Array2, ArrayView2, Axis, Zip};

pub const DEFAULT_TARGET_SHAPE: (usize, usize) = (128, 128);

/// Resizes slices to a fixed `(height, width)` with a separable triangle
/// filter.
///
/// Growing interpolates linearly; shrinking averages over every source
/// pixel an output pixel covers, so intensity statistics survive large
/// reductions. Every output value is a convex combination of source values,
/// so the result never leaves the source's `[min, max]` range and
/// intensities keep their physical scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceNormalizer {
    target_shape: (usize, usize),
}

impl Default for SliceNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SHAPE)
    }
}

impl SliceNormalizer {
    pub fn new(target_shape: (usize, usize)) -> Self {
        Self { target_shape }
    }

    pub fn target_shape(&self) -> (usize, usize) {
        self.target_shape
    }

    /// Resize `slice` to the target shape.
    ///
    /// A slice without pixels yields an all-zero array; readers reject such
    /// slices before they get here.
    pub fn normalize(&self, slice: ArrayView2<'_, f32>) -> Array2<f32> {
        let (height, width) = self.target_shape;
        let (src_height, src_width) = slice.dim();

        if src_height == 0 || src_width == 0 || height == 0 || width == 0 {
            return Array2::zeros((height, width));
        }
        if (src_height, src_width) == (height, width) {
            return slice.to_owned();
        }

        let rows = Self::resample(slice, Axis(1), &Interpolator::triangle_taps(width, src_width));
        Self::resample(
            rows.view(),
            Axis(0),
            &Interpolator::triangle_taps(height, src_height),
        )
    }

    /// Resample every lane along `axis` with `taps`.
    fn resample(source: ArrayView2<'_, f32>, axis: Axis, taps: &[Taps]) -> Array2<f32> {
        let mut shape = source.raw_dim();
        shape[axis.index()] = taps.len();
        let mut resized = Array2::<f32>::zeros(shape);

        Zip::from(resized.lanes_mut(axis))
            .and(source.lanes(axis))
            .par_for_each(|mut out, lane| {
                for (value, tap) in out.iter_mut().zip(taps) {
                    *value = tap.apply(lane);
                }
            });

        resized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn value_range(arr: &Array2<f32>) -> (f32, f32) {
        arr.iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    #[test]
    fn upsamples_to_the_target_shape_within_the_source_range() {
        let slice = array![[-1000.0f32, 0.0, 250.0], [40.0, 3000.0, 12.5]];
        let out = SliceNormalizer::default().normalize(slice.view());

        assert_eq!(out.dim(), (128, 128));
        let (lo, hi) = value_range(&out);
        assert!(lo >= -1000.0 && hi <= 3000.0);
    }

    #[test]
    fn downsamples_to_the_target_shape() {
        let slice = Array2::from_shape_fn((300, 257), |(y, x)| (y * 257 + x) as f32);
        let out = SliceNormalizer::new((128, 64)).normalize(slice.view());

        assert_eq!(out.dim(), (128, 64));
        let (lo, hi) = value_range(&out);
        assert!(lo >= 0.0 && hi <= (300 * 257 - 1) as f32);
    }

    #[test]
    fn matching_shape_is_unchanged() {
        let slice = Array2::from_shape_fn((128, 128), |(y, x)| (y as f32) - (x as f32) * 0.5);
        let out = SliceNormalizer::default().normalize(slice.view());
        assert_eq!(out, slice);
    }

    #[test]
    fn constant_slice_stays_constant() {
        let slice = Array2::from_elem((7, 3), 42.0f32);
        let out = SliceNormalizer::default().normalize(slice.view());
        assert!(out.iter().all(|&v| (v - 42.0).abs() < 1e-4));
    }

    #[test]
    fn shrinking_keeps_the_mean_of_fine_patterns() {
        let pattern = [0.0f32, 100.0, 100.0, 0.0];
        let slice = Array2::from_shape_fn((512, 512), |(_, x)| pattern[x % 4]);
        let out = SliceNormalizer::new((128, 128)).normalize(slice.view());

        let source_mean = slice.mean().unwrap();
        let out_mean = out.mean().unwrap();
        assert_eq!(source_mean, 50.0);
        assert!((out_mean - source_mean).abs() < 1.0, "mean {out_mean}");
        let (lo, hi) = value_range(&out);
        assert!(lo >= 0.0 && hi <= 100.0);
    }

    #[test]
    fn shrinking_averages_blocks() {
        let slice = Array2::from_shape_fn((64, 64), |(y, x)| {
            if (x / 32 + y / 32) % 2 == 0 { 0.0f32 } else { 80.0 }
        });
        let out = SliceNormalizer::new((2, 2)).normalize(slice.view());
        assert!((out.mean().unwrap() - slice.mean().unwrap()).abs() < 1e-3);
    }

    #[test]
    fn zero_target_shape_yields_an_empty_slice() {
        let slice = Array2::from_elem((4, 4), 1.0f32);
        let out = SliceNormalizer::new((0, 4)).normalize(slice.view());
        assert_eq!(out.dim(), (0, 4));
    }

    #[test]
    fn single_pixel_is_broadcast() {
        let slice = array![[9.0f32]];
        let out = SliceNormalizer::new((4, 5)).normalize(slice.view());
        assert_eq!(out, Array2::from_elem((4, 5), 9.0));
    }
}
