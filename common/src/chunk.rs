use crate::error::CanvasError;
use crate::palette::Canvas;

/// Chunk side length in pixels (256x256).
pub const CHUNK_SIZE: i64 = 256;

/// Pixels per chunk: 256 * 256 = 65,536, one color byte each.
pub const CHUNK_AREA: usize = (CHUNK_SIZE as usize) * (CHUNK_SIZE as usize);

/// A pixel address as the server sees it: chunk indices plus the offset of
/// the pixel inside that chunk (`local_y * 256 + local_x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolPos {
    pub chunk_x: u8,
    pub chunk_y: u8,
    pub offset: u32,
}

/// Translate an absolute canvas coordinate into protocol addressing.
pub fn to_protocol(canvas: &Canvas, x: i64, y: i64) -> Result<ProtocolPos, CanvasError> {
    if !canvas.contains(x, y) {
        return Err(CanvasError::OutOfCanvas { x, y });
    }
    let half = canvas.half();
    let mod_offs = half.rem_euclid(CHUNK_SIZE);
    let chunk_x = (x + half).div_euclid(CHUNK_SIZE);
    let chunk_y = (y + half).div_euclid(CHUNK_SIZE);
    let offset = (y + mod_offs).rem_euclid(CHUNK_SIZE) * CHUNK_SIZE + (x + mod_offs).rem_euclid(CHUNK_SIZE);
    Ok(ProtocolPos {
        chunk_x: chunk_x as u8,
        chunk_y: chunk_y as u8,
        offset: offset as u32,
    })
}

/// Translate protocol addressing back into an absolute canvas coordinate.
pub fn to_absolute(canvas: &Canvas, pos: ProtocolPos) -> (i64, i64) {
    let (lx, ly) = local_coords(pos.offset);
    let half = canvas.half();
    (
        pos.chunk_x as i64 * CHUNK_SIZE - half + lx as i64,
        pos.chunk_y as i64 * CHUNK_SIZE - half + ly as i64,
    )
}

/// Split an intra-chunk offset into local (x, y).
pub fn local_coords(offset: u32) -> (usize, usize) {
    ((offset & 0xFF) as usize, ((offset >> 8) & 0xFF) as usize)
}

/// Inclusive rectangle of chunks, in chunk indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRect {
    pub x: u8,
    pub y: u8,
    pub width: u32,
    pub height: u32,
}

impl ChunkRect {
    /// The chunks overlapped by a `width`x`height` image whose top-left pixel
    /// sits at absolute (`x`, `y`). The image must lie fully on the canvas.
    pub fn covering(
        canvas: &Canvas,
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    ) -> Result<Self, CanvasError> {
        let outside = CanvasError::PlacementOutsideCanvas {
            x,
            y,
            width,
            height,
        };
        if width == 0 || height == 0 {
            return Err(outside);
        }
        let (right, bottom) = (x + width as i64 - 1, y + height as i64 - 1);
        if !canvas.contains(x, y) || !canvas.contains(right, bottom) {
            return Err(outside);
        }

        let half = canvas.half();
        let start_x = (x + half).div_euclid(CHUNK_SIZE);
        let start_y = (y + half).div_euclid(CHUNK_SIZE);
        let end_x = (right + half).div_euclid(CHUNK_SIZE);
        let end_y = (bottom + half).div_euclid(CHUNK_SIZE);

        Ok(Self {
            x: start_x as u8,
            y: start_y as u8,
            width: (end_x - start_x + 1) as u32,
            height: (end_y - start_y + 1) as u32,
        })
    }

    /// Every chunk in the rectangle, row by row.
    pub fn chunks(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        (0..self.height).flat_map(move |dy| {
            (0..self.width).map(move |dx| ((self.x as u32 + dx) as u8, (self.y as u32 + dy) as u8))
        })
    }

    pub fn contains_chunk(&self, chunk_x: u8, chunk_y: u8) -> bool {
        let (cx, cy) = (chunk_x as u32, chunk_y as u32);
        let (x, y) = (self.x as u32, self.y as u32);
        cx >= x && cx < x + self.width && cy >= y && cy < y + self.height
    }

    pub fn len(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute coordinate of the rectangle's top-left pixel.
    pub fn pixel_origin(&self, canvas: &Canvas) -> (i64, i64) {
        let half = canvas.half();
        (
            self.x as i64 * CHUNK_SIZE - half,
            self.y as i64 * CHUNK_SIZE - half,
        )
    }
}
