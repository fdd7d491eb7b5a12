use std::path::Path;

use common::target::SKIP;
use common::{Palette, Rgb, Target};
use image::RgbaImage;

use crate::error::Result;

/// Pixels at or below this alpha are left unpainted.
const ALPHA_CUTOFF: u8 = 128;

/// Load an image from disk and map it onto `palette`.
pub fn load_target(path: &Path, palette: &Palette) -> Result<Target> {
    let lossy = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"));
    if lossy {
        tracing::warn!("{} is a JPEG; lossy compression is a poor fit for pixel art", path.display());
    }

    let image = image::open(path)?.to_rgba8();
    tracing::info!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
    quantize(&image, palette)
}

/// Nearest paintable palette color per opaque pixel; translucent pixels
/// become `SKIP`.
pub fn quantize(image: &RgbaImage, palette: &Palette) -> Result<Target> {
    let pixels = image
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            if a > ALPHA_CUTOFF {
                palette.nearest(Rgb::new(r, g, b))
            } else {
                SKIP
            }
        })
        .collect();
    Ok(Target::new(
        image.width() as usize,
        image.height() as usize,
        pixels,
        palette,
    )?)
}
