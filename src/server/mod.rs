// Server module: answers questions over a Unix domain socket

mod ipc;
mod signals;

pub use ipc::{
    read_message, write_response, IpcClient, IpcMessage, IpcResponse, IpcServer,
    MAX_MESSAGE_SIZE,
};
pub use signals::SignalHandler;

use crate::config::{expand_tilde, ServerConfig};
use crate::error::{RagError, Result};
use crate::pipeline::RagPipeline;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::net::UnixStream;
use tokio::sync::Semaphore;
use tokio::task;

/// Request server sharing one pipeline across connections
pub struct Server {
    pipeline: Arc<RagPipeline>,
    ipc_server: IpcServer,
    limiter: Arc<Semaphore>,
}

impl Server {
    /// Bind the configured socket
    pub async fn bind(pipeline: Arc<RagPipeline>, config: &ServerConfig) -> Result<Self> {
        let mut ipc_server = IpcServer::new(expand_tilde(&config.socket_path));
        ipc_server.bind().await?;

        Ok(Self {
            pipeline,
            ipc_server,
            limiter: Arc::new(Semaphore::new(config.max_connections.max(1))),
        })
    }

    pub fn socket_path(&self) -> &Path {
        self.ipc_server.socket_path()
    }

    /// Serve until SIGTERM, SIGINT or SIGHUP
    pub async fn run(self) -> Result<()> {
        let mut signal_handler = SignalHandler::new()?;
        self.serve_until(async move {
            let sig = signal_handler.wait().await;
            tracing::info!("Received {}", sig);
        })
        .await
    }

    /// Serve until `shutdown` completes, then remove the socket
    pub async fn serve_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        loop {
            // Wait for a free slot first so a full server still sees shutdown
            let permit = tokio::select! {
                permit = Arc::clone(&self.limiter).acquire_owned() => {
                    permit.map_err(|e| RagError::Server(e.to_string()))?
                }
                _ = &mut shutdown => break,
            };

            tokio::select! {
                accepted = self.ipc_server.accept() => {
                    let stream = match accepted {
                        Ok(stream) => stream,
                        Err(e) => {
                            tracing::error!("{}", e);
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&self.pipeline);
                    task::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = handle_client(stream, &pipeline).await {
                            tracing::error!("Client handler error: {}", e);
                        }
                    });
                }

                _ = &mut shutdown => break,
            }
        }

        tracing::info!("Shutting down server");
        self.ipc_server.shutdown()
    }
}

/// Handle one request/response exchange
async fn handle_client(mut stream: UnixStream, pipeline: &RagPipeline) -> Result<()> {
    let response = match read_message(&mut stream).await {
        Ok(message) => dispatch(message, pipeline).await,
        Err(RagError::Json { source, .. }) => {
            IpcResponse::failure(&RagError::InvalidRequest(source.to_string()))
        }
        Err(e) => return Err(e),
    };

    write_response(&mut stream, &response).await
}

async fn dispatch(message: IpcMessage, pipeline: &RagPipeline) -> IpcResponse {
    match message {
        IpcMessage::Status => IpcResponse::success("Server is running"),
        IpcMessage::Ask { question, history } => {
            if question.trim().is_empty() {
                return IpcResponse::failure(&RagError::InvalidRequest(
                    "question must not be empty".to_string(),
                ));
            }

            let history = history.unwrap_or_default();
            match pipeline.run(&question, &history).await {
                Ok(result) => match serde_json::to_value(&result) {
                    Ok(data) => IpcResponse::success_with_data(data),
                    Err(e) => IpcResponse::failure(&RagError::Json {
                        source: e,
                        context: "Failed to serialize pipeline result".to_string(),
                    }),
                },
                Err(e) => {
                    tracing::error!("Request failed: {}", e);
                    IpcResponse::failure(&e)
                }
            }
        }
    }
}
