use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

#[cfg(unix)]
use signal::unix::{signal, SignalKind};

/// Signal types that can stop a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM - container graceful shutdown
    Terminate,
    /// SIGINT - Ctrl+C
    Interrupt,
    /// SIGQUIT
    Quit,
    /// The subscription ended on its own (fatal store or decode error)
    Internal,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Quit => write!(f, "SIGQUIT"),
            ShutdownSignal::Internal => write!(f, "INTERNAL"),
        }
    }
}

pub struct SignalHandler {
    shutdown_signal: Option<ShutdownSignal>,
    internal_shutdown_notify: Arc<Notify>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self { shutdown_signal: None, internal_shutdown_notify: Arc::new(Notify::new()) }
    }

    /// Handle used by background tasks to request a shutdown
    pub fn get_shutdown_trigger(&self) -> Arc<Notify> {
        self.internal_shutdown_notify.clone()
    }

    /// Wait for any shutdown signal and return which one was received
    pub async fn wait_for_shutdown(&mut self) -> Result<ShutdownSignal> {
        let signal = self.wait_for_signal().await?;
        self.shutdown_signal = Some(signal);
        info!(signal = %signal, "Received shutdown signal");
        Ok(signal)
    }

    pub fn shutdown_signal(&self) -> Option<ShutdownSignal> {
        self.shutdown_signal
    }

    #[cfg(unix)]
    async fn wait_for_signal(&self) -> Result<ShutdownSignal> {
        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| anyhow!("Failed to create SIGTERM handler: {e}"))?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| anyhow!("Failed to create SIGINT handler: {e}"))?;
        let mut sigquit = signal(SignalKind::quit()).map_err(|e| anyhow!("Failed to create SIGQUIT handler: {e}"))?;

        info!("Signal handler initialized, listening for SIGTERM, SIGINT, SIGQUIT and internal shutdown requests");

        let received = tokio::select! {
            _ = sigterm.recv() => ShutdownSignal::Terminate,
            _ = sigint.recv() => ShutdownSignal::Interrupt,
            _ = sigquit.recv() => {
                warn!("Force quit signal received (SIGQUIT)");
                ShutdownSignal::Quit
            }
            _ = self.internal_shutdown_notify.notified() => {
                warn!("Internal shutdown requested, the subscription has stopped");
                ShutdownSignal::Internal
            }
        };
        Ok(received)
    }

    #[cfg(not(unix))]
    async fn wait_for_signal(&self) -> Result<ShutdownSignal> {
        info!("Signal handler initialized, listening for Ctrl+C and internal shutdown requests");

        let received = tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(|e| anyhow!("Failed to listen for Ctrl+C: {e}"))?;
                ShutdownSignal::Interrupt
            }
            _ = self.internal_shutdown_notify.notified() => {
                warn!("Internal shutdown requested, the subscription has stopped");
                ShutdownSignal::Internal
            }
        };
        Ok(received)
    }

    /// Run `shutdown_fn` bounded by `timeout_secs`.
    ///
    /// A tick that already claimed a message finishes its acknowledgment
    /// inside this window; after the timeout it is abandoned and the message
    /// stays claimed by this worker.
    pub async fn handle_graceful_shutdown<F, Fut>(&self, shutdown_fn: F, timeout_secs: u64) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let signal = self.shutdown_signal.unwrap_or(ShutdownSignal::Interrupt);
        info!(signal = %signal, timeout_secs, "Starting graceful shutdown");

        let timeout_duration = tokio::time::Duration::from_secs(timeout_secs);
        match tokio::time::timeout(timeout_duration, shutdown_fn()).await {
            Ok(Ok(())) => {
                info!("Graceful shutdown completed");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "Graceful shutdown failed");
                Err(e)
            }
            Err(_) => {
                error!(timeout_secs, "Graceful shutdown timed out");
                Err(anyhow!("Shutdown timeout exceeded"))
            }
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}
