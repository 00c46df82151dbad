//! Where lifecycle observer failures are reported.
//!
//! A failing observer never breaks the data path: the tap catches the panic,
//! turns it into [`TapError::ObserverFailure`] and hands it to a
//! [`DiagnosticSink`]. The default sink, [`TracingSink`], logs it through
//! `tracing`. Any `Fn(&TapError) + Send + Sync` closure is a sink as well.

use crate::errors::TapError;

/// Receives errors raised by lifecycle observers.
pub trait DiagnosticSink: Send + Sync {
    /// Called once per failed observer invocation.
    fn report(&self, error: &TapError);
}

/// Sink logging every failure as a `tracing` error event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, error: &TapError) {
        match error {
            TapError::ObserverFailure { event, message } => {
                tracing::error!(%event, %message, "lifecycle observer failed");
            }
            other => tracing::error!(error = %other, "tap diagnostic"),
        }
    }
}

impl<F> DiagnosticSink for F
where
    F: Fn(&TapError) + Send + Sync,
{
    fn report(&self, error: &TapError) {
        self(error);
    }
}
