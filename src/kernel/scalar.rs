//! Scalar reference kernel for ZNCC window statistics.

use crate::image::ImageView;
use crate::kernel::{Kernel, WindowStats};
use crate::template::TemplatePlan;

/// Scalar unmasked ZNCC kernel.
pub struct ZnccScalar;

impl Kernel for ZnccScalar {
    fn window_stats(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> WindowStats {
        let tpl_width = plan.width();
        let t_prime = plan.t_prime();

        let mut stats = WindowStats::default();
        for ty in 0..plan.height() {
            let Some(img_row) = image.row(y + ty) else {
                break;
            };
            let window = &img_row[x..x + tpl_width];
            let base = ty * tpl_width;
            let mut dot_row = 0.0f64;
            for (tx, &value) in window.iter().enumerate() {
                let v = u64::from(value);
                dot_row += f64::from(t_prime[base + tx]) * value as f64;
                stats.sum_i += v;
                stats.sum_i2 += v * v;
            }
            stats.dot += dot_row;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::ZnccScalar;
    use crate::image::ImageView;
    use crate::kernel::{scan_best, Kernel};
    use crate::template::TemplatePlan;

    #[test]
    fn zncc_scan_matches_bruteforce() {
        let img_width = 6;
        let img_height = 5;
        let mut image = Vec::with_capacity(img_width * img_height);
        for y in 0..img_height {
            for x in 0..img_width {
                image.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        let tpl_width = 3;
        let tpl_height = 2;
        let mut tpl = Vec::with_capacity(tpl_width * tpl_height);
        for y in 0..tpl_height {
            for x in 0..tpl_width {
                tpl.push(((x * 5 + y * 11 + x * y) & 0xFF) as u8);
            }
        }

        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let tpl_view = ImageView::from_slice(&tpl, tpl_width, tpl_height).unwrap();
        let plan = TemplatePlan::from_view(tpl_view).unwrap();
        let best = scan_best::<ZnccScalar>(image_view, &plan).unwrap().unwrap();

        let t_prime = plan.t_prime();
        let var_t = plan.var_t() as f64;
        let n = (tpl_width * tpl_height) as f64;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_x = 0;
        let mut best_y = 0;
        for y in 0..=(img_height - tpl_height) {
            for x in 0..=(img_width - tpl_width) {
                let mut dot = 0.0f64;
                let mut sum_i = 0.0f64;
                let mut sum_i2 = 0.0f64;
                for ty in 0..tpl_height {
                    let row = image_view.row(y + ty).unwrap();
                    for tx in 0..tpl_width {
                        let value = row[x + tx] as f64;
                        dot += t_prime[ty * tpl_width + tx] as f64 * value;
                        sum_i += value;
                        sum_i2 += value * value;
                    }
                }
                let var_i = sum_i2 - (sum_i * sum_i) / n;
                let score = dot / (var_t * var_i).sqrt();
                if score > best_score {
                    best_score = score;
                    best_x = x;
                    best_y = y;
                }
            }
        }

        assert_eq!(best.x, best_x);
        assert_eq!(best.y, best_y);
        assert!((best.score - best_score as f32).abs() < 1e-5);
    }

    #[test]
    fn identical_patch_scores_one() {
        let data: Vec<u8> = (0..64u32).map(|v| ((v * 37) % 251) as u8).collect();
        let view = ImageView::from_slice(&data, 8, 8).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        let score = <ZnccScalar as Kernel>::score_at(view, &plan, 0, 0);
        assert!((score - 1.0).abs() < 1e-5);
    }
}
