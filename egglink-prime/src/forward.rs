//! Best-effort relay of accepted readings to an external webhook.
//!
//! Ingestion only ever pushes onto a bounded queue and never waits on the
//! webhook. A single worker drains the queue; failed or timed-out posts are
//! logged and dropped.

use std::time::Duration;

use egglink_core::Fields;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook answered {0}")]
    Status(StatusCode),
}

/// Handle used by the ingestion path to hand readings to the worker.
#[derive(Clone, Debug)]
pub struct Forwarder {
    tx: Option<mpsc::Sender<Fields>>,
}

impl Forwarder {
    /// A forwarder that drops everything. Used when no webhook is configured.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Start the worker task and return the handle feeding it.
    pub fn spawn(
        url: String,
        timeout: Duration,
        queue_capacity: usize,
        cancel: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>), ForwardError> {
        let webhook = Webhook::new(url, timeout)?;
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));

        let handle = tokio::spawn(run_worker(rx, webhook, cancel));

        Ok((Self { tx: Some(tx) }, handle))
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue `fields` for delivery without waiting.
    ///
    /// Returns `false` when the reading was not queued: forwarding is
    /// disabled, the queue is full, or the worker has stopped.
    pub fn forward(&self, fields: Fields) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };

        match tx.try_send(fields) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("forward queue full, dropping reading");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("forward worker stopped, dropping reading");
                false
            }
        }
    }
}

struct Webhook {
    client: reqwest::Client,
    url: String,
}

impl Webhook {
    fn new(url: String, timeout: Duration) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    async fn post(&self, fields: &Fields) -> Result<StatusCode, ForwardError> {
        let response = self.client.post(&self.url).json(fields).send().await?;
        let status = response.status();

        if status.is_success() || status.is_redirection() {
            Ok(status)
        } else {
            Err(ForwardError::Status(status))
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Fields>,
    webhook: Webhook,
    cancel: CancellationToken,
) {
    info!(url = %webhook.url, "Forwarder started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Forwarder shutting down");
                break;
            }
            fields = rx.recv() => {
                let Some(fields) = fields else {
                    info!("Forward queue closed");
                    break;
                };

                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Forwarder shutting down");
                        break;
                    }
                    result = webhook.post(&fields) => match result {
                        Ok(status) => debug!(%status, "Reading forwarded"),
                        Err(e) => warn!(error = %e, "Failed to forward reading"),
                    }
                }
            }
        }
    }
}
