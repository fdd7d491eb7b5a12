use crate::error::CanvasError;
use crate::palette::Palette;

/// Marks a target pixel that must be left alone (transparent in the source).
pub const SKIP: u8 = 255;

/// The image to paint, as palette indices. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Target {
    /// Build a target from row-major pixels, rejecting any non-skip pixel
    /// that is not a paintable color of `palette`.
    pub fn new(
        width: usize,
        height: usize,
        pixels: Vec<u8>,
        palette: &Palette,
    ) -> Result<Self, CanvasError> {
        let expected = width * height;
        if pixels.len() != expected || expected == 0 {
            return Err(CanvasError::TargetShape {
                width,
                height,
                expected,
                got: pixels.len(),
            });
        }
        for (i, &color) in pixels.iter().enumerate() {
            if color != SKIP && !palette.is_paintable(color) {
                return Err(CanvasError::UnpaintableColor {
                    x: i % width,
                    y: i / width,
                    color,
                });
            }
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Desired color at image-relative (x, y), or `None` for skipped pixels.
    pub fn desired(&self, x: usize, y: usize) -> Option<u8> {
        match self.pixels.get(y * self.width + x) {
            Some(&SKIP) | None => None,
            Some(&color) => Some(color),
        }
    }

    /// Number of pixels that will be painted.
    pub fn paintable_count(&self) -> usize {
        self.pixels.iter().filter(|&&c| c != SKIP).count()
    }

    /// Every image-relative coordinate in raster order (row by row).
    pub fn raster(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Rgb;

    fn palette() -> Palette {
        Palette::new(vec![Rgb::new(0, 0, 0); 4]).unwrap()
    }

    #[test]
    fn skip_pixels_are_not_desired() {
        let target = Target::new(2, 2, vec![2, SKIP, 3, 2], &palette()).unwrap();
        assert_eq!(target.desired(0, 0), Some(2));
        assert_eq!(target.desired(1, 0), None);
        assert_eq!(target.desired(0, 1), Some(3));
        assert_eq!(target.paintable_count(), 3);
        assert_eq!(
            target.raster().collect::<Vec<_>>(),
            vec![(0, 0), (1, 0), (0, 1), (1, 1)]
        );
    }

    #[test]
    fn rejects_reserved_and_unknown_colors() {
        assert_eq!(
            Target::new(2, 1, vec![2, 1], &palette()),
            Err(CanvasError::UnpaintableColor { x: 1, y: 0, color: 1 })
        );
        assert!(Target::new(1, 1, vec![4], &palette()).is_err());
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(Target::new(2, 2, vec![2; 3], &palette()).is_err());
        assert!(Target::new(0, 0, vec![], &palette()).is_err());
    }
}
