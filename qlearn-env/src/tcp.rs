//! TCP-backed environment

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use qlearn_core::{Environment, RLError, Result, Step};

use crate::protocol::{decode_response, FrameBuffer, DEFAULT_MAX_FRAME_BYTES};

const READ_CHUNK: usize = 1024;

/// Connection settings for the simulation server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Largest accepted response object
    pub max_frame_bytes: usize,
    /// Message that asks the server for a fresh episode, if it has one
    pub reset_token: Option<String>,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2037,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            reset_token: None,
        }
    }
}

impl TcpConfig {
    /// `host:port`
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject unusable settings
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RLError::InvalidConfig("connection host is empty".to_string()));
        }
        if self.max_frame_bytes == 0 {
            return Err(RLError::InvalidConfig(
                "max_frame_bytes must be at least 1".to_string(),
            ));
        }
        if self.reset_token.as_deref().is_some_and(str::is_empty) {
            return Err(RLError::InvalidConfig("reset_token is empty".to_string()));
        }
        Ok(())
    }
}

/// Environment reached over a persistent TCP connection
///
/// Every exchange writes one message and waits for one response object.
/// The connection is opened once and kept until [`Environment::close`].
pub struct TcpEnvironment {
    stream: TcpStream,
    config: TcpConfig,
    frames: FrameBuffer,
    reported_extra_keys: bool,
}

impl TcpEnvironment {
    /// Connect to the configured server
    pub async fn connect(config: TcpConfig) -> Result<Self> {
        config.validate()?;
        let address = config.address();
        let stream = TcpStream::connect(&address)
            .await
            .map_err(|e| RLError::Connection(format!("cannot reach {address}: {e}")))?;
        stream.set_nodelay(true).map_err(connection_lost)?;
        info!(%address, "connected to environment");

        Ok(Self {
            frames: FrameBuffer::new(config.max_frame_bytes),
            stream,
            config,
            reported_extra_keys: false,
        })
    }

    async fn exchange(&mut self, message: &str) -> Result<Step> {
        self.stream
            .write_all(message.as_bytes())
            .await
            .map_err(connection_lost)?;

        let frame = self.read_frame().await?;
        let step = decode_response(&frame)?;
        debug!(
            message,
            state = %step.state,
            reward = step.reward.value(),
            done = step.done,
            "exchange"
        );

        if !step.info.fields.is_empty() && !self.reported_extra_keys {
            let keys: Vec<&String> = step.info.fields.keys().collect();
            warn!(?keys, "response carries extra keys; kept in step info only");
            self.reported_extra_keys = true;
        }
        Ok(step)
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.frames.next_frame()? {
                return Ok(frame);
            }
            let read = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(connection_lost)?;
            if read == 0 {
                return Err(RLError::Connection(
                    "environment closed the connection".to_string(),
                ));
            }
            self.frames.extend(&chunk[..read]);
        }
    }
}

#[async_trait]
impl Environment for TcpEnvironment {
    async fn reset(&mut self) -> Result<Step> {
        match self.config.reset_token.clone() {
            Some(token) => self.exchange(&token).await,
            None => Err(RLError::Environment(
                "environment does not support reset (no reset_token configured)".to_string(),
            )),
        }
    }

    async fn step(&mut self, action: &str) -> Result<Step> {
        self.exchange(action).await
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "shutdown after peer close");
        }
        info!(address = %self.config.address(), "disconnected from environment");
        Ok(())
    }
}

fn connection_lost(error: std::io::Error) -> RLError {
    RLError::Connection(error.to_string())
}
