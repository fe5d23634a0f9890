//! Template plan precomputation for ZNCC scoring.

use crate::image::ImageView;
use crate::util::{PadMatchError, PadMatchResult};

/// Per-pixel variance at or below which a patch counts as uniform.
pub(crate) const FLAT_VARIANCE: f64 = 0.25;

/// Precomputed statistics and zero-mean buffer for template matching.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f32,
    var_t: f32,
    t_prime: Vec<f32>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    ///
    /// Uniform templates are accepted; `is_flat` reports them so kernels can
    /// fall back to an intensity comparison where ZNCC is undefined.
    pub fn from_view(tpl: ImageView<'_, u8>) -> PadMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(PadMatchError::InvalidDimensions { width, height })?;

        let mut sum = 0u64;
        let mut sum_sq = 0u64;
        for y in 0..height {
            let row = tpl.row(y).ok_or(PadMatchError::BufferTooSmall {
                needed: (y + 1).saturating_mul(tpl.stride()),
                got: 0,
            })?;
            for &value in row {
                let v = u64::from(value);
                sum += v;
                sum_sq += v * v;
            }
        }

        let count_f = count as f64;
        let mean_f64 = sum as f64 / count_f;
        let var_t = (sum_sq as f64 - (sum as f64) * (sum as f64) / count_f).max(0.0);

        let mean = mean_f64 as f32;
        let mut t_prime = Vec::with_capacity(count);
        for y in 0..height {
            if let Some(row) = tpl.row(y) {
                t_prime.extend(row.iter().map(|&value| value as f32 - mean));
            }
        }

        Ok(Self {
            width,
            height,
            mean,
            var_t: var_t as f32,
            t_prime,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the mean intensity of the template.
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Returns the sum of squared deviations from the mean.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn t_prime(&self) -> &[f32] {
        &self.t_prime
    }

    /// Returns true when the template carries no usable contrast.
    pub fn is_flat(&self) -> bool {
        let n = (self.width * self.height) as f64;
        f64::from(self.var_t) / n <= FLAT_VARIANCE
    }
}

#[cfg(test)]
mod tests {
    use super::TemplatePlan;
    use crate::image::ImageView;

    #[test]
    fn plan_statistics_match_definition() {
        let data = [10u8, 20, 30, 40];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        assert!((plan.mean() - 25.0).abs() < 1e-6);
        assert!((plan.var_t() - 500.0).abs() < 1e-3);
        assert_eq!(plan.t_prime(), &[-15.0, -5.0, 5.0, 15.0]);
        assert!(!plan.is_flat());
    }

    #[test]
    fn uniform_template_is_flat() {
        let data = [77u8; 16];
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        assert!(plan.is_flat());
        assert!((plan.mean() - 77.0).abs() < 1e-6);
    }
}
