//! MCP transport layer.
//!
//! `McpTransport` moves raw JSON-RPC messages. `SseTransport` talks to a
//! remote tool server over HTTP + Server-Sent Events; `ChannelTransport`
//! connects two in-process peers.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::McpError;

/// Trait for MCP message transport.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Next inbound message. `None` when the transport is closed.
    async fn receive(&mut self) -> Result<Option<String>, McpError>;

    /// Send one outbound message.
    async fn send(&mut self, message: &str) -> Result<(), McpError>;
}

// ── SSE ─────────────────────────────────────────────────────────────

/// One decoded Server-Sent Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental SSE decoder. Feed it chunks as they arrive; it yields every
/// event completed by a blank line.
///
/// Bytes are buffered until a full line is present, so a multibyte
/// character split across network chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&raw[..newline_pos])
                .trim_end_matches('\r')
                .to_string();

            if line.is_empty() {
                if !self.data.is_empty() || self.event.is_some() {
                    frames.push(SseFrame {
                        event: self.event.take().unwrap_or_else(|| "message".to_string()),
                        data: std::mem::take(&mut self.data).join("\n"),
                    });
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
                None => (line.as_str(), ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        frames
    }
}

/// Resolve the `endpoint` event's data against the SSE URL.
pub fn resolve_endpoint(sse_url: &Url, data: &str) -> Result<Url, McpError> {
    sse_url
        .join(data.trim())
        .map_err(|e| McpError::Transport(format!("invalid endpoint '{}': {}", data, e)))
}

/// Client side of the MCP SSE transport.
///
/// `connect` opens the event stream and waits for the server to announce
/// its POST endpoint. Inbound `message` events are queued for `receive`;
/// `send` POSTs to the endpoint.
pub struct SseTransport {
    http: reqwest::Client,
    endpoint: Url,
    inbound: mpsc::Receiver<String>,
    reader: JoinHandle<()>,
}

impl SseTransport {
    pub async fn connect(sse_url: &str, handshake_timeout: Duration) -> Result<Self, McpError> {
        let base = Url::parse(sse_url)
            .map_err(|e| McpError::Transport(format!("invalid SSE URL '{}': {}", sse_url, e)))?;
        let http = reqwest::Client::new();

        tracing::debug!(url = %base, "Opening SSE stream");
        let response = http
            .get(base.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(McpError::ServerUnavailable(format!(
                "SSE endpoint returned {}",
                response.status()
            )));
        }

        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let (inbound_tx, inbound) = mpsc::channel(64);
        let reader = tokio::spawn(read_events(
            response,
            base.clone(),
            endpoint_tx,
            inbound_tx,
        ));

        let endpoint = match tokio::time::timeout(handshake_timeout, endpoint_rx).await {
            Ok(Ok(Ok(endpoint))) => endpoint,
            Ok(Ok(Err(e))) => {
                reader.abort();
                return Err(e);
            }
            Ok(Err(_)) => {
                reader.abort();
                return Err(McpError::ConnectionClosed);
            }
            Err(_) => {
                reader.abort();
                return Err(McpError::Timeout {
                    method: "endpoint".to_string(),
                    after: handshake_timeout,
                });
            }
        };

        tracing::info!(endpoint = %endpoint, "SSE transport ready");
        Ok(Self {
            http,
            endpoint,
            inbound,
            reader,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

async fn read_events(
    response: reqwest::Response,
    base: Url,
    endpoint_tx: oneshot::Sender<Result<Url, McpError>>,
    inbound: mpsc::Sender<String>,
) {
    let mut bytes = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut endpoint_tx = Some(endpoint_tx);

    while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "SSE stream failed");
                break;
            }
        };
        for frame in decoder.push(&chunk) {
            match frame.event.as_str() {
                "endpoint" => {
                    if let Some(tx) = endpoint_tx.take() {
                        let _ = tx.send(resolve_endpoint(&base, &frame.data));
                    }
                }
                "message" => {
                    if inbound.send(frame.data).await.is_err() {
                        return;
                    }
                }
                other => tracing::trace!(event = other, "Ignoring SSE event"),
            }
        }
    }
    tracing::debug!("SSE stream closed");
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl McpTransport for SseTransport {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(message.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(McpError::Transport(format!(
                "POST {} returned {}",
                self.endpoint,
                response.status()
            )));
        }
        Ok(())
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// In-memory transport backed by channel pairs.
pub struct ChannelTransport {
    rx: mpsc::Receiver<String>,
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Two connected transports: what one sends, the other receives.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = mpsc::channel(32);
        let (tx_b, rx_a) = mpsc::channel(32);
        (Self { rx: rx_a, tx: tx_a }, Self { rx: rx_b, tx: tx_b })
    }
}

#[async_trait]
impl McpTransport for ChannelTransport {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        Ok(self.rx.recv().await)
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.tx
            .send(message.to_string())
            .await
            .map_err(|_| McpError::ConnectionClosed)
    }
}
