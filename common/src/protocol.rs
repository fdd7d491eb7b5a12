use serde::Deserialize;

use crate::chunk::ProtocolPos;
use crate::error::ProtocolError;

/// Client → server opcodes.
pub const SELECT_CANVAS: u8 = 0xA0;
pub const REGISTER_CHUNK: u8 = 0xA1;
pub const PLACE_PIXEL: u8 = 0xC1;

/// Server → client opcodes. Pixel updates reuse the placement opcode.
pub const ONLINE_COUNT: u8 = 0xA7;
pub const TOTAL_COOLDOWN: u8 = 0xC2;
pub const PLACE_RESULT: u8 = 0xC3;
pub const PIXEL_UPDATE: u8 = 0xC1;

/// Return code asking the user to solve a CAPTCHA.
pub const CAPTCHA_REQUIRED: u8 = 10;

/// A color at a protocol address, as carried by both placements and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPlacement {
    pub pos: ProtocolPos,
    pub color: u8,
}

impl PixelPlacement {
    fn write(&self, opcode: u8) -> Vec<u8> {
        let off = self.pos.offset;
        vec![
            opcode,
            self.pos.chunk_x,
            self.pos.chunk_y,
            (off >> 16) as u8,
            (off >> 8) as u8,
            off as u8,
            self.color,
        ]
    }

    fn read(payload: &[u8]) -> Self {
        Self {
            pos: ProtocolPos {
                chunk_x: payload[0],
                chunk_y: payload[1],
                offset: u32::from_be_bytes([0, payload[2], payload[3], payload[4]]),
            },
            color: payload[5],
        }
    }
}

/// Frames the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFrame {
    SelectCanvas(u8),
    RegisterChunk { chunk_x: u8, chunk_y: u8 },
    PlacePixel(PixelPlacement),
}

impl ClientFrame {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ClientFrame::SelectCanvas(id) => vec![SELECT_CANVAS, *id],
            ClientFrame::RegisterChunk { chunk_x, chunk_y } => {
                vec![REGISTER_CHUNK, *chunk_x, *chunk_y]
            }
            ClientFrame::PlacePixel(p) => p.write(PLACE_PIXEL),
        }
    }
}

/// The server's answer to a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceResult {
    pub code: u8,
    pub wait_ms: u32,
    pub cooldown_s: u16,
}

/// How a placement result should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed { wait_ms: u32, cooldown_s: u16 },
    Captcha,
    Rejected(u8),
}

impl PlaceResult {
    pub fn outcome(&self) -> PlaceOutcome {
        match self.code {
            0 => PlaceOutcome::Placed {
                wait_ms: self.wait_ms,
                cooldown_s: self.cooldown_s,
            },
            CAPTCHA_REQUIRED => PlaceOutcome::Captcha,
            code => PlaceOutcome::Rejected(code),
        }
    }
}

/// Which chat room a message was posted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatChannel {
    International,
    Country(String),
}

#[derive(Deserialize)]
struct RawChat(String, String, serde_json::Value);

/// A chat line, sent by the server as `[name, text, country]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawChat")]
pub struct ChatMessage {
    pub name: String,
    pub text: String,
    pub country: serde_json::Value,
}

impl From<RawChat> for ChatMessage {
    fn from(RawChat(name, text, country): RawChat) -> Self {
        Self {
            name,
            text,
            country,
        }
    }
}

impl ChatMessage {
    pub fn channel(&self) -> ChatChannel {
        match &self.country {
            serde_json::Value::Number(n) if n.as_u64() == Some(0) => ChatChannel::International,
            serde_json::Value::String(s) => ChatChannel::Country(s.clone()),
            other => ChatChannel::Country(other.to_string()),
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    OnlineCount(u16),
    TotalCooldown { ms: u32 },
    PlaceResult(PlaceResult),
    PixelUpdate(PixelPlacement),
    Chat(ChatMessage),
    Unrecognized { opcode: u8, raw: Vec<u8> },
}

fn payload(data: &[u8], len: usize) -> Result<&[u8], ProtocolError> {
    let body = &data[1..];
    if body.len() < len {
        return Err(ProtocolError::Truncated {
            opcode: data[0],
            expected: len + 1,
            got: data.len(),
        });
    }
    Ok(&body[..len])
}

/// Decode a binary frame. Unknown opcodes are not an error.
pub fn decode_binary(data: &[u8]) -> Result<ServerEvent, ProtocolError> {
    let opcode = *data.first().ok_or(ProtocolError::Empty)?;
    let event = match opcode {
        ONLINE_COUNT => {
            let p = payload(data, 2)?;
            ServerEvent::OnlineCount(u16::from_be_bytes([p[0], p[1]]))
        }
        TOTAL_COOLDOWN => {
            let p = payload(data, 4)?;
            ServerEvent::TotalCooldown {
                ms: u32::from_le_bytes([p[0], p[1], p[2], p[3]]),
            }
        }
        PLACE_RESULT => {
            let p = payload(data, 7)?;
            ServerEvent::PlaceResult(PlaceResult {
                code: p[0],
                wait_ms: u32::from_be_bytes([p[1], p[2], p[3], p[4]]),
                cooldown_s: u16::from_be_bytes([p[5], p[6]]),
            })
        }
        PIXEL_UPDATE => ServerEvent::PixelUpdate(PixelPlacement::read(payload(data, 6)?)),
        _ => ServerEvent::Unrecognized {
            opcode,
            raw: data.to_vec(),
        },
    };
    Ok(event)
}

/// Decode a text frame, which is always a chat message.
pub fn decode_text(text: &str) -> Result<ServerEvent, ProtocolError> {
    Ok(ServerEvent::Chat(serde_json::from_str(text)?))
}
