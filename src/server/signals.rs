// Signal handling for graceful server shutdown

use crate::error::{RagError, Result};
use tokio::signal::unix::{signal, Signal as TokioSignal, SignalKind};

/// Listens for the signals that stop the server
pub struct SignalHandler {
    sigterm: TokioSignal,
    sigint: TokioSignal,
    sighup: TokioSignal,
}

impl SignalHandler {
    /// Install handlers for SIGTERM, SIGINT and SIGHUP
    pub fn new() -> Result<Self> {
        let install = |kind: SignalKind, name: &str| {
            signal(kind).map_err(|e| RagError::Io {
                source: e,
                context: format!("Failed to setup {} handler", name),
            })
        };

        Ok(Self {
            sigterm: install(SignalKind::terminate(), "SIGTERM")?,
            sigint: install(SignalKind::interrupt(), "SIGINT")?,
            sighup: install(SignalKind::hangup(), "SIGHUP")?,
        })
    }

    /// Wait for the next signal and return its name
    pub async fn wait(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sighup.recv() => "SIGHUP",
        }
    }
}
