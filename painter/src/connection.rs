use common::endpoints::SESSION_COOKIE;
use common::{ChunkRect, ClientFrame};
use futures::stream::{SplitSink, SplitStream};
use futures::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, Uri};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{PainterError, Result};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsSink = SplitSink<WsStream, Message>;
pub type WsFrames = SplitStream<WsStream>;

/// Outbound frames waiting for the writer task.
const OUTBOUND_CAPACITY: usize = 256;

/// Largest CONNECT response head accepted from a proxy.
const MAX_PROXY_HEAD: usize = 8 * 1024;

/// Open the live connection, presenting the session cookie when logged in.
/// With `proxy` (`host:port`) the socket is tunnelled through an HTTP proxy.
pub async fn connect(
    url: &str,
    origin: &str,
    session: Option<&str>,
    proxy: Option<&str>,
) -> Result<(WsSink, WsFrames)> {
    let mut request = url.into_client_request()?;
    let headers = request.headers_mut();
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert("Origin", value);
    }
    if let Some(token) = session {
        let cookie = HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))
            .map_err(|_| PainterError::Config("session token is not a valid header value".into()))?;
        headers.insert("Cookie", cookie);
    }

    let (ws, _response) = match proxy {
        Some(proxy) => {
            let stream = tunnel(proxy, request.uri()).await?;
            tokio_tungstenite::client_async_tls_with_config(request, stream, None, None).await?
        }
        None => tokio_tungstenite::connect_async(request).await?,
    };
    tracing::info!("Connected to {}", url);
    Ok(ws.split())
}

/// Ask the HTTP proxy at `proxy` for a `CONNECT` tunnel to the host of `uri`.
pub async fn tunnel(proxy: &str, uri: &Uri) -> Result<TcpStream> {
    let host = uri
        .host()
        .ok_or_else(|| PainterError::Config(format!("{uri} has no host")))?;
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("wss") | Some("https") => 443,
        _ => 80,
    });
    let target = format!("{host}:{port}");

    let mut stream = TcpStream::connect(proxy).await?;
    stream
        .write_all(format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n\r\n").as_bytes())
        .await?;

    // Read byte by byte so nothing past the head is consumed.
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte).await? == 0 {
            return Err(PainterError::Proxy(format!("{proxy} closed the connection")));
        }
        head.push(byte[0]);
        if head.len() > MAX_PROXY_HEAD {
            return Err(PainterError::Proxy(format!("{proxy} sent an oversized response")));
        }
    }

    let head = String::from_utf8_lossy(&head);
    let status_line = head.lines().next().unwrap_or_default();
    if status_line.split_whitespace().nth(1) != Some("200") {
        return Err(PainterError::Proxy(format!(
            "{proxy} refused CONNECT {target}: {status_line}"
        )));
    }
    tracing::info!("Tunnelling to {} through {}", target, proxy);
    Ok(stream)
}

/// Select the canvas and subscribe to every chunk in `rect`. Sent once,
/// before any placement.
pub async fn announce<S>(sink: &mut S, canvas: u8, rect: &ChunkRect) -> Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    sink.send(Message::Binary(ClientFrame::SelectCanvas(canvas).encode().into()))
        .await?;
    for (chunk_x, chunk_y) in rect.chunks() {
        let frame = ClientFrame::RegisterChunk { chunk_x, chunk_y }.encode();
        sink.send(Message::Binary(frame.into())).await?;
    }
    tracing::info!("Registered {} chunks on canvas {}", rect.len(), canvas);
    Ok(())
}

/// Move the sink into a task that writes every frame sent on the returned
/// channel. The task ends with an error on the first failed write.
pub fn spawn_writer<S>(mut sink: S) -> (mpsc::Sender<Vec<u8>>, JoinHandle<Result<()>>)
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_CAPACITY);
    let handle = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            sink.send(Message::Binary(frame.into())).await?;
        }
        Ok(())
    });
    (tx, handle)
}
