use ndarray::{ArrayView1, s};

/// Source pixels and normalized weights that make up one output pixel.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Taps {
    start: usize,
    weights: Vec<f64>,
}

impl Taps {
    /// Weighted sum over `lane`, kept inside the range of the pixels read.
    #[inline]
    pub(crate) fn apply(&self, lane: ArrayView1<'_, f32>) -> f32 {
        let window = lane.slice(s![self.start..self.start + self.weights.len()]);
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        for (&v, &w) in window.iter().zip(&self.weights) {
            sum += w * f64::from(v);
            lo = lo.min(v);
            hi = hi.max(v);
        }
        (sum as f32).max(lo).min(hi)
    }
}

pub(crate) struct Interpolator;

impl Interpolator {
    /// Triangle filter taps for resampling an axis of `source_len` pixels
    /// onto `output_len` pixels, pixel centers aligned.
    ///
    /// When shrinking, the kernel is widened by the shrink ratio so every
    /// source pixel contributes to the output. When growing, this is plain
    /// linear interpolation.
    pub(crate) fn triangle_taps(output_len: usize, source_len: usize) -> Vec<Taps> {
        let ratio = source_len as f64 / output_len as f64;
        let support = ratio.max(1.0);

        (0..output_len)
            .map(|i| {
                let center = (i as f64 + 0.5) * ratio;
                let left = (center - support).floor().max(0.0) as usize;
                let right = ((center + support).ceil() as usize).min(source_len);

                let mut start = left;
                let mut weights = Vec::with_capacity(right.saturating_sub(left));
                for j in left..right {
                    let w = Self::triangle((j as f64 + 0.5 - center) / support);
                    if w > 0.0 {
                        if weights.is_empty() {
                            start = j;
                        }
                        weights.push(w);
                    }
                }

                let total: f64 = weights.iter().sum();
                weights.iter_mut().for_each(|w| *w /= total);
                Taps { start, weights }
            })
            .collect()
    }

    #[inline]
    fn triangle(x: f64) -> f64 {
        (1.0 - x.abs()).max(0.0)
    }
}
