//! Outbound side of the room connection.
//!
//! The video SDK lives behind a local bridge process. Broadcasts are handed
//! to the bridge, which publishes them on the reliable data channel.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::protocol::ClassMessage;

#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// Publishes one reliable broadcast to every participant.
    async fn publish(&self, message: &ClassMessage) -> Result<()>;

    /// Leaves the room.
    async fn disconnect(&self) -> Result<()>;
}

pub struct BridgeTransport {
    client: reqwest::Client,
    base_url: String,
}

impl BridgeTransport {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach room bridge at {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Room bridge error ({}): {}", status, body));
        }
        Ok(())
    }

    /// Sends a body-less control command to the bridge.
    pub async fn command(&self, path: &str) -> Result<()> {
        self.post(path, b"{}".to_vec()).await
    }
}

#[async_trait]
impl RoomTransport for BridgeTransport {
    async fn publish(&self, message: &ClassMessage) -> Result<()> {
        let payload = message
            .encode()
            .context("Failed to encode data message")?;
        debug!("Publishing {}", message.action());
        self.post("/publish", payload).await
    }

    async fn disconnect(&self) -> Result<()> {
        debug!("Disconnecting from room");
        self.command("/disconnect").await
    }
}
