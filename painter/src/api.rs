use std::collections::HashMap;

use common::endpoints::{chunk_path, LOGIN_PATH, ME_PATH, SESSION_COOKIE};
use common::{Canvas, CanvasDescriptor};
use serde::{Deserialize, Serialize};

use crate::config::Credentials;
use crate::error::{PainterError, Result};

/// Plain HTTP side of the service: metadata, login and chunk bitmaps.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Me {
    pub canvases: HashMap<String, CanvasDescriptor>,
}

impl Me {
    /// Validated metadata of canvas `id`.
    pub fn canvas(&self, id: u8) -> Result<Canvas> {
        let desc = self
            .canvases
            .get(&id.to_string())
            .ok_or(PainterError::UnknownCanvas(id))?;
        tracing::info!("Using canvas {} ({}, {}x{})", id, desc.title, desc.size, desc.size);
        Ok(Canvas::from_descriptor(id, desc)?)
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    nameoremail: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    me: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(default)]
    name: String,
}

impl ApiClient {
    /// `proxy` is an HTTP proxy as `host:port`.
    pub fn new(base_url: &str, proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!("painter/", env!("CARGO_PKG_VERSION")));
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(format!("http://{proxy}"))?);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Canvas metadata keyed by canvas id.
    pub async fn me(&self) -> Result<Me> {
        let me = self
            .http
            .get(self.url(ME_PATH))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(me)
    }

    /// Log in and return the session token. A rejected login is `None`.
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<String>> {
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest {
                nameoremail: &credentials.name,
                password: &credentials.password,
            })
            .send()
            .await?;

        let token = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.value().to_string());
        let body: LoginResponse = response.json().await?;

        match (body.success, token) {
            (true, Some(token)) => {
                let name = body.me.map(|m| m.name).unwrap_or_default();
                tracing::info!("Logged in as {}", name);
                Ok(Some(token))
            }
            _ => Ok(None),
        }
    }

    /// Raw color bytes of one chunk, 256x256 row-major. Never-painted
    /// chunks come back empty.
    pub async fn chunk(&self, canvas: u8, chunk_x: u8, chunk_y: u8) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(self.url(&chunk_path(canvas, chunk_x, chunk_y)))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
