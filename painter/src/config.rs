use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::PainterError;
use crate::scheduler::Strategy;

/// Delays applied by the placement driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Base pause after every placement attempt.
    pub interval: Duration,
    /// Half-width of the uniform jitter added to `interval`.
    pub jitter: Duration,
    /// Pause before retrying a rejected placement.
    pub retry_delay: Duration,
    /// Pause between two defend scans.
    pub defend_interval: Duration,
    /// A successful placement reporting at least this much wait triggers a
    /// cooldown pause.
    pub cooldown_threshold_ms: u32,
    /// Added to the server's cooldown seconds.
    pub cooldown_margin: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            jitter: Duration::from_millis(250),
            retry_delay: Duration::from_secs(2),
            defend_interval: Duration::from_secs(1),
            cooldown_threshold_ms: 30_000,
            cooldown_margin: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// No pauses at all; the cooldown threshold is kept.
    pub fn none() -> Self {
        Self {
            interval: Duration::ZERO,
            jitter: Duration::ZERO,
            retry_delay: Duration::ZERO,
            defend_interval: Duration::ZERO,
            cooldown_threshold_ms: 30_000,
            cooldown_margin: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

pub struct Config {
    pub base_url: String,
    pub ws_url: String,
    pub canvas: u8,
    pub image: PathBuf,
    pub x: i64,
    pub y: i64,
    pub strategy: Strategy,
    pub defend: bool,
    pub credentials: Option<Credentials>,
    pub session: Option<String>,
    /// HTTP proxy as `host:port`, used for the API and the live connection.
    pub proxy: Option<String>,
    pub pacing: Pacing,
}

impl Config {
    pub fn from_env() -> Result<Self, PainterError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PainterError> {
        let base_url = lookup("PAINTER_BASE_URL").unwrap_or_else(|| "https://pixelplanet.fun".into());
        let ws_url = lookup("PAINTER_WS_URL").unwrap_or_else(|| common::endpoints::ws_url(&base_url));

        let image = lookup("PAINTER_IMAGE")
            .map(PathBuf::from)
            .ok_or_else(|| PainterError::Config("PAINTER_IMAGE is required".into()))?;

        let credentials = match (lookup("PAINTER_LOGIN"), lookup("PAINTER_PASSWORD")) {
            (Some(name), Some(password)) if !name.is_empty() => Some(Credentials { name, password }),
            (Some(name), None) if !name.is_empty() => {
                return Err(PainterError::Config("PAINTER_LOGIN is set without PAINTER_PASSWORD".into()))
            }
            _ => None,
        };

        let proxy = lookup("PAINTER_PROXY").filter(|p| !p.is_empty());
        if let Some(proxy) = &proxy {
            validate_proxy(proxy)?;
        }

        let pacing = Pacing {
            interval: Duration::from_millis(parse_or(&lookup, "PAINTER_INTERVAL_MS", 500)?),
            jitter: Duration::from_millis(parse_or(&lookup, "PAINTER_JITTER_MS", 250)?),
            ..Pacing::default()
        };
        if pacing.jitter > pacing.interval {
            return Err(PainterError::Config(
                "PAINTER_JITTER_MS must not exceed PAINTER_INTERVAL_MS".into(),
            ));
        }

        Ok(Self {
            base_url,
            ws_url,
            canvas: parse_or(&lookup, "PAINTER_CANVAS", 0)?,
            image,
            x: parse_required(&lookup, "PAINTER_X")?,
            y: parse_required(&lookup, "PAINTER_Y")?,
            strategy: parse_or(&lookup, "PAINTER_STRATEGY", Strategy::Forward)?,
            defend: parse_flag(&lookup, "PAINTER_DEFEND")?,
            credentials,
            session: lookup("PAINTER_SESSION").filter(|s| !s.is_empty()),
            proxy,
            pacing,
        })
    }
}

fn parse_required<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<T, PainterError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).ok_or_else(|| PainterError::Config(format!("{key} is required")))?;
    raw.trim()
        .parse()
        .map_err(|e| PainterError::Config(format!("{key}={raw}: {e}")))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, PainterError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(_) => parse_required(lookup, key),
        None => Ok(default),
    }
}

fn validate_proxy(proxy: &str) -> Result<(), PainterError> {
    let valid = proxy
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if valid {
        Ok(())
    } else {
        Err(PainterError::Config(format!("PAINTER_PROXY={proxy}: expected host:port")))
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool, PainterError> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("n") | Some("no") | Some("false") => Ok(false),
        Some("1") | Some("y") | Some("yes") | Some("true") => Ok(true),
        Some(other) => Err(PainterError::Config(format!("{key}={other}: expected yes or no"))),
    }
}
