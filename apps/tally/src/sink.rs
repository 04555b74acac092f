//! # History Sinks
//!
//! `HistorySink` implementations that hand completed calculations off to
//! background tasks, so the engine never waits on storage or the network.
//!
//! - `ChannelSink`: queue into a writer task that owns a local store
//! - `HttpSink`: one task per calculation, POSTing to the history service

use crate::api::CalculateRequest;
use crate::client::HistoryClient;
use std::sync::{Arc, Mutex};
use tally_core::{CalcError, HistorySink, HistoryStore, NewCalculation};
use tokio::runtime::Handle;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

// =============================================================================
// CHANNEL SINK
// =============================================================================

enum WriterMessage {
    Record(NewCalculation),
    Flush(oneshot::Sender<()>),
    Close(oneshot::Sender<usize>),
}

/// Sink that queues calculations for a writer task.
///
/// The writer owns no state of its own: it records into the shared store,
/// which readers (the REPL, the server) can query concurrently.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WriterMessage>,
    session_id: Option<String>,
}

impl std::fmt::Debug for WriterMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record(c) => f.debug_tuple("Record").field(c).finish(),
            Self::Flush(_) => f.write_str("Flush"),
            Self::Close(_) => f.write_str("Close"),
        }
    }
}

impl ChannelSink {
    /// Start a writer task on the current runtime.
    ///
    /// The task ends on `close`, or once every clone of the sink is dropped,
    /// and returns the number of calculations it stored.
    pub fn spawn<S>(store: Arc<RwLock<S>>) -> (Self, JoinHandle<usize>)
    where
        S: HistoryStore + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(async move {
            let mut written = 0usize;
            let mut closing = None;
            while let Some(message) = rx.recv().await {
                match message {
                    WriterMessage::Record(calculation) => {
                        match store.write().await.record(calculation) {
                            Ok(entry) => {
                                written += 1;
                                tracing::debug!(id = entry.id, "calculation stored");
                            }
                            Err(e) => tracing::warn!(error = %e, "failed to store calculation"),
                        }
                    }
                    WriterMessage::Flush(ack) => {
                        let _ = ack.send(());
                    }
                    WriterMessage::Close(ack) => {
                        closing = Some(ack);
                        break;
                    }
                }
            }
            // Release the store before acknowledging, so it can be reopened.
            drop(rx);
            drop(store);
            tracing::debug!(written, "history writer stopped");
            if let Some(ack) = closing {
                let _ = ack.send(written);
            }
            written
        });

        (
            Self {
                tx,
                session_id: None,
            },
            writer,
        )
    }

    /// Tag every recorded calculation with a session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Wait until everything queued so far has been written.
    pub async fn flush(&self) -> Result<(), CalcError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::Flush(ack_tx))
            .map_err(|_| writer_gone())?;
        ack_rx.await.map_err(|_| writer_gone())
    }

    /// Write everything queued so far, then stop the writer and release the
    /// store. Returns the number of calculations stored.
    pub async fn close(&self) -> Result<usize, CalcError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::Close(ack_tx))
            .map_err(|_| writer_gone())?;
        ack_rx.await.map_err(|_| writer_gone())
    }
}

fn writer_gone() -> CalcError {
    CalcError::IoError("history writer stopped".to_string())
}

impl HistorySink for ChannelSink {
    fn record_calculation(&self, expression: &str, result: &str) -> Result<(), CalcError> {
        let mut calculation = NewCalculation::new(expression, result);
        calculation.session_id.clone_from(&self.session_id);
        self.tx
            .send(WriterMessage::Record(calculation))
            .map_err(|_| writer_gone())
    }
}

// =============================================================================
// HTTP SINK
// =============================================================================

/// Sink that forwards each calculation to the history service.
///
/// Every notification becomes its own task; failures are logged and the
/// calculation is dropped.
#[derive(Debug)]
pub struct HttpSink {
    client: HistoryClient,
    session_id: Option<String>,
    runtime: Handle,
    in_flight: Mutex<JoinSet<()>>,
}

impl HttpSink {
    /// Create a sink bound to the current tokio runtime.
    pub fn new(client: HistoryClient) -> Result<Self, CalcError> {
        let runtime = Handle::try_current()
            .map_err(|e| CalcError::IoError(format!("no async runtime: {}", e)))?;
        Ok(Self {
            client,
            session_id: None,
            runtime,
            in_flight: Mutex::new(JoinSet::new()),
        })
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Wait for every request started so far.
    pub async fn flush(&self) -> Result<(), CalcError> {
        let mut pending = {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|e| CalcError::IoError(e.to_string()))?;
            std::mem::take(&mut *in_flight)
        };
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "history upload task failed");
            }
        }
        Ok(())
    }
}

impl HistorySink for HttpSink {
    fn record_calculation(&self, expression: &str, result: &str) -> Result<(), CalcError> {
        let mut request = CalculateRequest::new(expression, result);
        request.session_id.clone_from(&self.session_id);
        let client = self.client.clone();

        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|e| CalcError::IoError(e.to_string()))?;
        // Reap finished uploads so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn_on(
            async move {
                if let Err(e) = client.record_calculation(&request).await {
                    tracing::warn!(
                        expression = request.expression.as_deref().unwrap_or_default(),
                        error = %e,
                        "history service rejected calculation"
                    );
                }
            },
            &self.runtime,
        );
        Ok(())
    }
}
