//! SIMD-accelerated kernel using the `wide` crate.
//!
//! The dot product of each template row is vectorized to process 8 pixels at
//! a time using `f32x8`. Window sums stay in exact integer arithmetic so the
//! uniform-patch fallback behaves exactly like the scalar kernel.

use crate::image::ImageView;
use crate::kernel::{Kernel, WindowStats};
use crate::template::TemplatePlan;
use wide::f32x8;

const LANES: usize = 8;

/// Load 8 u8 values and convert to f32x8.
#[inline]
fn load_u8x8_as_f32x8(slice: &[u8]) -> f32x8 {
    f32x8::from([
        slice[0] as f32,
        slice[1] as f32,
        slice[2] as f32,
        slice[3] as f32,
        slice[4] as f32,
        slice[5] as f32,
        slice[6] as f32,
        slice[7] as f32,
    ])
}

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// Horizontal sum of f32x8.
#[inline]
fn hsum(v: f32x8) -> f32 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3] + arr[4] + arr[5] + arr[6] + arr[7]
}

/// SIMD-accelerated unmasked ZNCC kernel.
pub struct ZnccSimd;

impl Kernel for ZnccSimd {
    fn window_stats(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> WindowStats {
        let tpl_width = plan.width();
        let t_prime = plan.t_prime();
        let simd_end = tpl_width / LANES * LANES;

        let mut stats = WindowStats::default();
        for ty in 0..plan.height() {
            let Some(img_row) = image.row(y + ty) else {
                break;
            };
            let window = &img_row[x..x + tpl_width];
            let tpl_row = &t_prime[ty * tpl_width..(ty + 1) * tpl_width];

            let mut dot_vec = f32x8::ZERO;
            let mut tx = 0;
            while tx < simd_end {
                dot_vec += load_f32x8(&tpl_row[tx..]) * load_u8x8_as_f32x8(&window[tx..]);
                tx += LANES;
            }
            let mut dot_row = f64::from(hsum(dot_vec));
            while tx < tpl_width {
                dot_row += f64::from(tpl_row[tx]) * window[tx] as f64;
                tx += 1;
            }
            stats.dot += dot_row;

            for &value in window {
                let v = u64::from(value);
                stats.sum_i += v;
                stats.sum_i2 += v * v;
            }
        }
        stats
    }
}
