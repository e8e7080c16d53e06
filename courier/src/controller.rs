use std::{path::Path, sync::Arc};

use courier_common::{Signal, internal, logging};
use courier_delivery::{Dispatcher, DispatcherConfig, LogTransport, Transport};
use courier_store::StoreConfig;
use serde::Deserialize;
use tokio::sync::broadcast;

/// Top-level configuration and entry point
///
/// ```ron
/// Courier (
///     store: (
///         type: "File",
///         path: "/var/spool/courier",
///     ),
///     delivery: (
///         max_attempts: 3,
///         reconciliation_interval_ms: 5000,
///     ),
/// )
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Courier {
    #[serde(default)]
    store: StoreConfig,
    #[serde(alias = "dispatcher", default)]
    delivery: DispatcherConfig,
}

/// Wait for CTRL+C or SIGTERM
async fn wait_for_signal() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    Ok(())
}

impl Courier {
    /// Load a configuration file
    ///
    /// # Errors
    /// If the file cannot be read or is not valid configuration
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config from {}: {e}", path.display())
        })?;

        Ok(ron::from_str(&content)?)
    }

    #[must_use]
    pub const fn store_config(&self) -> &StoreConfig {
        &self.store
    }

    #[must_use]
    pub const fn delivery_config(&self) -> &DispatcherConfig {
        &self.delivery
    }

    /// Open the configured store and build a dispatcher over it
    ///
    /// The dispatcher is not started; use it directly for submissions and
    /// queries, or see [`Courier::serve`]. The store is only opened, never
    /// repaired, so this is safe while a server is running against it.
    ///
    /// # Errors
    /// If the store cannot be opened
    pub fn dispatcher(&self, transport: Arc<dyn Transport>) -> anyhow::Result<Dispatcher> {
        let store = self.store.clone().into_store()?;
        Ok(Dispatcher::new(self.delivery.clone(), store, transport))
    }

    /// Run the dispatcher until a shutdown signal arrives on `shutdown`
    ///
    /// The store is recovered from any crash residue before delivery starts.
    ///
    /// # Errors
    /// If the store cannot be opened or recovered
    pub async fn serve(
        &self,
        transport: Arc<dyn Transport>,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> anyhow::Result<()> {
        let store = self.store.clone().into_recovered_store()?;
        let dispatcher = Dispatcher::new(self.delivery.clone(), store, transport);

        if let Some(path) = self.store.path() {
            internal!(level = INFO, "Message store at {}", path.display());
        }

        dispatcher.begin();
        internal!(level = INFO, "Controller running");

        loop {
            match shutdown.recv().await {
                Ok(Signal::Shutdown) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Shutdown receiver lagged by {skipped} signals");
                }
            }
        }

        dispatcher.shutdown().await;
        Ok(())
    }

    /// Run this controller, and everything it controls, until interrupted
    ///
    /// Messages are handed to a [`LogTransport`].
    ///
    /// # Errors
    /// If the store cannot be opened or signal handlers cannot be installed
    pub async fn run(&self) -> anyhow::Result<()> {
        logging::init();

        let (sender, receiver) = broadcast::channel(16);
        let serve = self.serve(Arc::new(LogTransport), receiver);
        tokio::pin!(serve);

        tokio::select! {
            r = &mut serve => return r,
            r = wait_for_signal() => r?,
        }

        internal!(level = INFO, "Shutting down...");
        sender.send(Signal::Shutdown)?;

        tokio::select! {
            r = &mut serve => r,
            _ = tokio::signal::ctrl_c() => {
                internal!(level = WARN, "Forced shutdown, in-flight delivery abandoned");
                Ok(())
            }
        }
    }
}
