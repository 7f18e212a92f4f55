// Unix domain socket transport with length-prefixed JSON frames

use crate::error::{RagError, Result};
use crate::pipeline::PipelineResult;
use crate::retrieval::ConversationTurn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

/// Maximum frame size (10MB)
pub const MAX_MESSAGE_SIZE: u32 = 10 * 1024 * 1024;

/// Requests accepted by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IpcMessage {
    /// Answer a question, optionally in the context of a prior conversation
    Ask {
        question: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        history: Option<Vec<ConversationTurn>>,
    },
    /// Request server status
    Status,
}

/// Response sent back for every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Machine-readable error code, present on failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl IpcResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            code: None,
            data: None,
        }
    }

    pub fn success_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: None,
            code: None,
            data: Some(data),
        }
    }

    /// Error response carrying the wire code of `error`
    pub fn failure(error: &RagError) -> Self {
        Self {
            success: false,
            message: Some(error.to_string()),
            code: Some(error.code().to_string()),
            data: None,
        }
    }
}

/// Unix domain socket listener
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
}

impl IpcServer {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }

    /// Bind to the socket path, replacing a stale socket file
    pub async fn bind(&mut self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| RagError::Io {
                source: e,
                context: format!("Failed to remove existing socket: {:?}", self.socket_path),
            })?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RagError::Io {
                source: e,
                context: format!("Failed to create socket directory: {:?}", parent),
            })?;
        }

        let listener = UnixListener::bind(&self.socket_path).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to bind to socket: {:?}", self.socket_path),
        })?;

        self.listener = Some(listener);

        tracing::info!("Listening on {:?}", self.socket_path);
        Ok(())
    }

    pub async fn accept(&self) -> Result<UnixStream> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| RagError::Server("Server not bound".to_string()))?;

        let (stream, _addr) = listener.accept().await.map_err(|e| RagError::Io {
            source: e,
            context: "Failed to accept connection".to_string(),
        })?;

        Ok(stream)
    }

    /// Remove the socket file
    pub fn shutdown(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| RagError::Io {
                source: e,
                context: format!("Failed to remove socket: {:?}", self.socket_path),
            })?;
        }
        Ok(())
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

/// Read one length-prefixed JSON frame
async fn read_frame<R, T>(stream: &mut R, what: &str) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let length = stream.read_u32().await.map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to read {} length", what),
    })?;

    if length > MAX_MESSAGE_SIZE {
        return Err(RagError::Server(format!(
            "{} too large: {} bytes (max: {})",
            what, length, MAX_MESSAGE_SIZE
        )));
    }

    let mut buffer = vec![0u8; length as usize];
    stream
        .read_exact(&mut buffer)
        .await
        .map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to read {} payload", what),
        })?;

    serde_json::from_slice(&buffer).map_err(|e| RagError::Json {
        source: e,
        context: format!("Failed to deserialize {}", what),
    })
}

/// Write one length-prefixed JSON frame (4-byte big-endian length)
async fn write_frame<W, T>(stream: &mut W, value: &T, what: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(value).map_err(|e| RagError::Json {
        source: e,
        context: format!("Failed to serialize {}", what),
    })?;

    if payload.len() > MAX_MESSAGE_SIZE as usize {
        return Err(RagError::Server(format!(
            "{} too large: {} bytes (max: {})",
            what,
            payload.len(),
            MAX_MESSAGE_SIZE
        )));
    }

    stream
        .write_u32(payload.len() as u32)
        .await
        .map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to write {} length", what),
        })?;

    stream.write_all(&payload).await.map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to write {} payload", what),
    })?;

    stream.flush().await.map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to flush {}", what),
    })?;

    Ok(())
}

pub async fn read_message<R: AsyncRead + Unpin>(stream: &mut R) -> Result<IpcMessage> {
    read_frame(stream, "request").await
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    stream: &mut W,
    response: &IpcResponse,
) -> Result<()> {
    write_frame(stream, response, "response").await
}

/// Client for a running server
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Send one request and wait for its response
    pub async fn send(&self, message: &IpcMessage) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| RagError::Io {
                source: e,
                context: format!("Failed to connect to server at {:?}", self.socket_path),
            })?;

        write_frame(&mut stream, message, "request").await?;
        read_frame(&mut stream, "response").await
    }

    /// Ask a question and decode the pipeline result
    pub async fn ask(
        &self,
        question: &str,
        history: Option<Vec<ConversationTurn>>,
    ) -> Result<PipelineResult> {
        let response = self
            .send(&IpcMessage::Ask {
                question: question.to_string(),
                history,
            })
            .await?;

        if !response.success {
            return Err(RagError::Server(format!(
                "{}: {}",
                response.code.as_deref().unwrap_or("internal"),
                response.message.unwrap_or_default()
            )));
        }

        let data = response
            .data
            .ok_or_else(|| RagError::Server("Response carried no result".to_string()))?;

        serde_json::from_value(data).map_err(|e| RagError::Json {
            source: e,
            context: "Failed to decode pipeline result".to_string(),
        })
    }
}
