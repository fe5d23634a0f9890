#![allow(dead_code)]

use image::{GrayImage, Luma};
use std::fs;
use std::path::{Path, PathBuf};

/// Fresh, empty scratch directory under the cargo target tmpdir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join(name);
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn solid(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Grid of bright squares on a dark background. Square size, offset and
/// the set of filled cells depend on `pad`, so every pad gets distinct
/// corners and a distinct correlation pattern.
pub fn textured(pad: u32, size: u32) -> GrayImage {
    let mut img = GrayImage::from_pixel(size, size, Luma([30]));
    let side = 5 + pad;
    let dx = pad % 3;
    let dy = (pad + 1) % 3;
    for gy in 0..4u32 {
        for gx in 0..4u32 {
            if (gx + gy + pad) % 3 == 0 {
                continue;
            }
            let x0 = 20 + gx * 16 + dx;
            let y0 = 20 + gy * 16 + dy;
            for y in y0..(y0 + side).min(size) {
                for x in x0..(x0 + side).min(size) {
                    img.put_pixel(x, y, Luma([220]));
                }
            }
        }
    }
    img
}

/// Writes `img` as `<root>/<folder>/<file>`, creating the folder.
pub fn write_template(root: &Path, folder: &str, file: &str, img: &GrayImage) -> PathBuf {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file);
    img.save(&path).unwrap();
    path
}
