//! Control channel client
//!
//! Sends one JSON command to the running player over its local IPC socket and
//! waits for the correlated reply. Each call opens a fresh connection; there is
//! no pipelining and no persistent connection.
//!
//! Wire format (one line each way):
//! ```text
//! -> {"command":["get_property","time-pos"],"request_id":7}
//! <- {"data":12.3,"error":"success","request_id":7}
//! ```
//! The player may interleave unsolicited `{"event":...}` lines; they are skipped.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Request line sent to the player
#[derive(Debug, Clone, Serialize)]
pub struct ControlRequest {
    pub command: Vec<Value>,
    pub request_id: u64,
}

/// Reply line received from the player
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ControlResponse {
    pub data: Option<Value>,
    pub error: Option<String>,
    pub request_id: Option<u64>,
    /// Present only on unsolicited event lines
    pub event: Option<String>,
}

impl ControlResponse {
    /// Success replies carry no error or the literal `"success"`
    pub fn is_success(&self) -> bool {
        matches!(self.error.as_deref(), None | Some("success"))
    }
}

/// Command seam to the running player
#[async_trait]
pub trait PlayerControl: Send + Sync {
    /// Send `[verb, ...args]` and return the reply's `data` (`null` when absent)
    async fn send(&self, command: Vec<Value>) -> Result<Value>;

    /// Read a player property
    async fn get_property(&self, name: &str) -> Result<Value> {
        self.send(vec![json!("get_property"), json!(name)]).await
    }

    /// Write a player property
    async fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.send(vec![json!("set_property"), json!(name), value])
            .await
            .map(|_| ())
    }

    /// Cycle a boolean/enum property (e.g. `pause`)
    async fn cycle(&self, name: &str) -> Result<()> {
        self.send(vec![json!("cycle"), json!(name)]).await.map(|_| ())
    }

    /// Seek by `position` seconds, relative to the current position or absolute
    async fn seek(&self, position: f64, relative: bool) -> Result<()> {
        let mode = if relative { "relative" } else { "absolute" };
        self.send(vec![json!("seek"), json!(position), json!(mode)])
            .await
            .map(|_| ())
    }
}

/// Connection-per-call client bound to the player's socket path
pub struct IpcControlClient {
    socket_path: PathBuf,
    timeout: Duration,
    next_request_id: AtomicU64,
}

impl IpcControlClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    #[cfg(unix)]
    async fn round_trip(&self, request: &ControlRequest) -> Result<ControlResponse> {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::UnixStream;

        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            Error::ControlUnreachable(format!("{}: {}", self.socket_path.display(), e))
        })?;
        let (reader, mut writer) = stream.into_split();

        let mut line = serde_json::to_vec(request)
            .map_err(|e| Error::Internal(format!("Failed to encode control request: {}", e)))?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .map_err(|e| Error::ControlUnreachable(format!("Write failed: {}", e)))?;

        let mut lines = BufReader::new(reader).lines();
        let mut decode_error = None;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| Error::ControlUnreachable(format!("Read failed: {}", e)))?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<ControlResponse>(line) {
                Ok(response) if response.event.is_some() => {
                    trace!("Skipping player event: {}", line);
                }
                Ok(response)
                    if response
                        .request_id
                        .map_or(true, |id| id == request.request_id) =>
                {
                    return Ok(response);
                }
                Ok(_) => {
                    trace!("Skipping reply to another request: {}", line);
                }
                Err(e) => {
                    decode_error = Some(format!("{}: {}", e, line));
                }
            }
        }

        Err(Error::ControlMalformed(
            decode_error.unwrap_or_else(|| "connection closed without a reply".to_string()),
        ))
    }

    #[cfg(not(unix))]
    async fn round_trip(&self, _request: &ControlRequest) -> Result<ControlResponse> {
        Err(Error::ControlUnreachable(
            "local control sockets require a unix platform".to_string(),
        ))
    }
}

#[async_trait]
impl PlayerControl for IpcControlClient {
    async fn send(&self, command: Vec<Value>) -> Result<Value> {
        let request = ControlRequest {
            command,
            request_id: self.next_request_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = tokio::time::timeout(self.timeout, self.round_trip(&request))
            .await
            .map_err(|_| Error::ControlTimeout(self.timeout.as_millis() as u64))??;

        if !response.is_success() {
            return Err(Error::ControlRejected(
                response.error.unwrap_or_default(),
            ));
        }

        Ok(response.data.unwrap_or(Value::Null))
    }
}
