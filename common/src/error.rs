/// Errors raised while building or addressing a canvas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas size {0} must be a power of two between 256 and 65536")]
    InvalidSize(u32),

    #[error("palette needs between 3 and 255 colors, got {0}")]
    InvalidPalette(usize),

    #[error("canvas {0} is a 3D canvas, only 2D canvases are supported")]
    Unsupported(u8),

    #[error("({x}, {y}) lies outside the canvas")]
    OutOfCanvas { x: i64, y: i64 },

    #[error("({x}, {y}) lies outside the cached chunk rectangle")]
    OutOfCache { x: i64, y: i64 },

    #[error("a {width}x{height} image at ({x}, {y}) does not fit on the canvas")]
    PlacementOutsideCanvas {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    #[error("target pixel ({x}, {y}) uses color {color}, which is not paintable")]
    UnpaintableColor { x: usize, y: usize, color: u8 },

    #[error("target has {got} pixels but {width}x{height} needs {expected}")]
    TargetShape {
        width: usize,
        height: usize,
        expected: usize,
        got: usize,
    },
}

/// Errors raised while decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty binary frame")]
    Empty,

    #[error("frame 0x{opcode:02X} needs {expected} bytes, got {got}")]
    Truncated {
        opcode: u8,
        expected: usize,
        got: usize,
    },

    #[error("malformed chat message: {0}")]
    Chat(#[from] serde_json::Error),
}
