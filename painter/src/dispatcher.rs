use common::chunk::to_absolute;
use common::protocol::{decode_binary, decode_text, ChatChannel};
use common::ServerEvent;
use futures::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::{PainterError, Result};
use crate::session::Session;

/// Read frames until the connection ends, applying pixel updates to the
/// cache and handing placement results to the waiting driver. Always ends
/// with an error: the connection has no clean shutdown.
pub async fn run<S>(mut frames: S, session: Session) -> Result<()>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    tracing::info!("Receive loop started");

    let outcome = loop {
        let message = match frames.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => break Err(PainterError::from(e)),
            None => break Err(PainterError::ConnectionClosed),
        };

        let event = match message {
            Message::Text(text) => decode_text(&text),
            Message::Binary(data) => decode_binary(&data),
            Message::Close(frame) => {
                tracing::info!("Server closed the connection: {:?}", frame);
                break Err(PainterError::ConnectionClosed);
            }
            _ => continue,
        };

        match event {
            Ok(event) => handle(&session, event).await,
            Err(e) => tracing::warn!("Skipping malformed frame: {}", e),
        }
    };

    // Nobody will answer a pending placement any more.
    session.gate.close();
    outcome
}

/// Apply one decoded event.
pub async fn handle(session: &Session, event: ServerEvent) {
    match event {
        ServerEvent::OnlineCount(count) => tracing::info!("Online: {}", count),
        ServerEvent::TotalCooldown { ms } => tracing::info!("Total cooldown: {} ms", ms),
        ServerEvent::PlaceResult(result) => {
            tracing::debug!(
                "Pixel return code {}, wait {} ms (+{} s)",
                result.code,
                result.wait_ms,
                result.cooldown_s
            );
            if !session.gate.resolve(result) {
                tracing::warn!("Place result with no placement in flight: {:?}", result);
            }
        }
        ServerEvent::PixelUpdate(update) => {
            let (x, y) = to_absolute(&session.canvas, update.pos);
            let applied = session.cache.write().await.apply(update.pos, update.color);
            if applied {
                tracing::debug!("Pixel update at ({}, {}): color {}", x, y, update.color);
            }
        }
        ServerEvent::Chat(message) => {
            let room = match message.channel() {
                ChatChannel::International => "int".to_string(),
                ChatChannel::Country(code) => code,
            };
            tracing::info!("[chat {}] {}: {}", room, message.name, message.text);
        }
        ServerEvent::Unrecognized { opcode, raw } => {
            tracing::warn!("Unrecognized opcode 0x{:02X}, raw data: {:?}", opcode, raw);
        }
    }
}
