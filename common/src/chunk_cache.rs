use crate::chunk::{local_coords, ChunkRect, ProtocolPos, CHUNK_AREA, CHUNK_SIZE};
use crate::error::CanvasError;
use crate::palette::Canvas;

/// Protected pixels are reported shifted up by 128.
pub const PROTECTED_FLAG: u8 = 0x80;

/// Strip the protection flag from a raw color byte.
pub fn normalize(raw: u8) -> u8 {
    if raw >= PROTECTED_FLAG {
        raw - PROTECTED_FLAG
    } else {
        raw
    }
}

/// Color indices for a fixed rectangle of chunks, stored as one flat
/// row-major buffer spanning the whole rectangle.
#[derive(Debug, Clone)]
pub struct ChunkCache {
    rect: ChunkRect,
    /// Absolute coordinate of `data[0]`.
    origin: (i64, i64),
    stride: usize,
    data: Vec<u8>,
}

impl ChunkCache {
    /// An all-zero cache covering `rect`.
    pub fn new(canvas: &Canvas, rect: ChunkRect) -> Self {
        let stride = rect.width as usize * CHUNK_SIZE as usize;
        Self {
            rect,
            origin: rect.pixel_origin(canvas),
            stride,
            data: vec![0; rect.len() * CHUNK_AREA],
        }
    }

    pub fn rect(&self) -> ChunkRect {
        self.rect
    }

    /// Bulk-load one chunk bitmap. A short buffer leaves the missing tail at
    /// color 0. Returns false if the chunk is outside the rectangle.
    pub fn load_chunk(&mut self, chunk_x: u8, chunk_y: u8, raw: &[u8]) -> bool {
        if !self.rect.contains_chunk(chunk_x, chunk_y) {
            return false;
        }
        let size = CHUNK_SIZE as usize;
        let base_x = (chunk_x - self.rect.x) as usize * size;
        let base_y = (chunk_y - self.rect.y) as usize * size;
        for ly in 0..size {
            let row = (base_y + ly) * self.stride + base_x;
            for lx in 0..size {
                let byte = raw.get(ly * size + lx).copied().unwrap_or(0);
                self.data[row + lx] = normalize(byte);
            }
        }
        true
    }

    fn index(&self, x: i64, y: i64) -> Result<usize, CanvasError> {
        let lx = x - self.origin.0;
        let ly = y - self.origin.1;
        let rows = self.data.len() / self.stride;
        if lx < 0 || ly < 0 || lx as usize >= self.stride || ly as usize >= rows {
            return Err(CanvasError::OutOfCache { x, y });
        }
        Ok(ly as usize * self.stride + lx as usize)
    }

    /// Cached color at an absolute coordinate.
    pub fn get(&self, x: i64, y: i64) -> Result<u8, CanvasError> {
        self.index(x, y).map(|i| self.data[i])
    }

    /// Store a color at an absolute coordinate, stripping protection.
    pub fn set(&mut self, x: i64, y: i64, raw: u8) -> Result<(), CanvasError> {
        let i = self.index(x, y)?;
        self.data[i] = normalize(raw);
        Ok(())
    }

    /// Apply a pixel update addressed in protocol terms. Updates for chunks
    /// outside the rectangle are ignored and reported as `false`.
    pub fn apply(&mut self, pos: ProtocolPos, raw: u8) -> bool {
        if !self.rect.contains_chunk(pos.chunk_x, pos.chunk_y) {
            return false;
        }
        let (lx, ly) = local_coords(pos.offset);
        let size = CHUNK_SIZE as usize;
        let x = (pos.chunk_x - self.rect.x) as usize * size + lx;
        let y = (pos.chunk_y - self.rect.y) as usize * size + ly;
        self.data[y * self.stride + x] = normalize(raw);
        true
    }
}
