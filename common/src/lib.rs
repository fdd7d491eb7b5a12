pub mod chunk;
pub mod chunk_cache;
pub mod endpoints;
pub mod error;
pub mod palette;
pub mod protocol;
pub mod target;

pub use chunk::{ChunkRect, ProtocolPos};
pub use chunk_cache::ChunkCache;
pub use error::{CanvasError, ProtocolError};
pub use palette::{Canvas, CanvasDescriptor, Palette, Rgb};
pub use protocol::{ClientFrame, PlaceOutcome, PlaceResult, ServerEvent};
pub use target::Target;
