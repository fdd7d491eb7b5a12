use common::CanvasError;

#[derive(Debug, thiserror::Error)]
pub enum PainterError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("canvas {0} does not exist")]
    UnknownCanvas(u8),

    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("proxy tunnel failed: {0}")]
    Proxy(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket transport failed: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("a placement is already awaiting its result")]
    AlreadyInFlight,

    #[error("operator resume channel closed")]
    OperatorGone,
}

pub type Result<T, E = PainterError> = std::result::Result<T, E>;
