/// Path of the canvas metadata / current user endpoint.
pub const ME_PATH: &str = "/api/me";

/// Path of the local (name or e-mail + password) login endpoint.
pub const LOGIN_PATH: &str = "/api/auth/local";

/// Path of the live WebSocket endpoint.
pub const WS_PATH: &str = "/ws";

/// Name of the session cookie set by a successful login.
pub const SESSION_COOKIE: &str = "pixelplanet.session";

/// Build the path of a raw chunk bitmap.
pub fn chunk_path(canvas: u8, chunk_x: u8, chunk_y: u8) -> String {
    format!("/chunks/{canvas}/{chunk_x}/{chunk_y}.bmp")
}

/// Derive the WebSocket URL from an HTTP(S) base URL.
pub fn ws_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}{WS_PATH}")
}
