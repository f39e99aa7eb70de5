//! Generic poller: produce a value, compare with the last one, hand changes
//! to a handler, sleep, repeat.
//!
//! Each poller runs as its own task. A failed cycle is logged and the loop
//! carries on; only cancellation ends it. Cancellation is observed during
//! the sleep and again between produce and handle, so a stopping engine
//! never writes a facet after `stop` has been requested.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use factorio_status_core::ParseError;

use crate::error::{PollerCycleError, SourceError};

/// Something a poller can sample on each cycle.
pub trait Source: Send + 'static {
    type Value: PartialEq + Send + Sync + 'static;

    fn produce(&mut self) -> impl Future<Output = Result<Self::Value, SourceError>> + Send;
}

pub type Handler<V> = Box<dyn FnMut(&V) -> Result<(), ParseError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Value equal to the previous one; handler skipped.
    Unchanged,
    /// New value handed to the handler.
    Handled,
    /// Cancellation arrived after producing; handler skipped.
    Cancelled,
}

pub struct Poller<S: Source> {
    name: String,
    source: S,
    handler: Handler<S::Value>,
    interval: Duration,
    last: Option<S::Value>,
}

impl<S: Source> Poller<S> {
    pub fn new(
        name: impl Into<String>,
        source: S,
        interval: Duration,
        handler: impl FnMut(&S::Value) -> Result<(), ParseError> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            handler: Box::new(handler),
            interval,
            last: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one produce/compare/handle cycle.
    ///
    /// The produced value becomes the new "last value" even if the handler
    /// fails, so an unparseable value is reported once rather than on every
    /// cycle until it changes.
    pub async fn cycle(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<CycleOutcome, PollerCycleError> {
        let value = self
            .source
            .produce()
            .await
            .map_err(|source| PollerCycleError::Produce {
                poller: self.name.clone(),
                source,
            })?;

        if self.last.as_ref() == Some(&value) {
            return Ok(CycleOutcome::Unchanged);
        }
        if cancel.is_cancelled() {
            return Ok(CycleOutcome::Cancelled);
        }

        let result = (self.handler)(&value);
        self.last = Some(value);
        result.map_err(|source| PollerCycleError::Handle {
            poller: self.name.clone(),
            source,
        })?;
        Ok(CycleOutcome::Handled)
    }

    /// Loop until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::debug!("{} poller started (every {:?})", self.name, self.interval);
        while !cancel.is_cancelled() {
            match self.cycle(&cancel).await {
                Ok(CycleOutcome::Handled) => tracing::debug!("{} poller: value changed", self.name),
                Ok(_) => {}
                Err(e) => tracing::warn!("{e}"),
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::debug!("{} poller stopped", self.name);
    }
}
