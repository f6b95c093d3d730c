//! # Concurrency Coordinator
//!
//! Serializes everything that touches order state. Two sections, always taken in
//! this order and never the reverse:
//!
//! 1. **decode**: owns the [`Decoder`] and its scratch buffer. Held by the
//!    transport side from the start of decoding until the store mutation for that
//!    message has finished, so messages are applied strictly one at a time in
//!    delivery order.
//! 2. **presentation**: owns the [`OrderStore`] (and through it the presenter).
//!    Held around every store operation, including the whole
//!    complete/promote/present sequence, by both the transport side and the
//!    rendering side.
//!
//! Every acquisition is bounded by `lock_timeout`. On the transport side a
//! timeout drops the message as [`DecodeError::Busy`]; on the rendering side it
//! surfaces as [`CoordinatorError::Busy`].
//!
//! ## Completion notices
//!
//! Notices go out after both sections are released. Completions made one after
//! another are announced in that order. Two completions racing from the transport
//! side and the rendering side may be announced in either order; each notice
//! carries its own `orderId`.
//!
//! ## Persistence
//!
//! Clock reads and writes run on Tokio's blocking pool (see
//! [`ClockKeeper::persist`]); key-value backends may block.

use crate::clock::{format_status_time, ClockKeeper, TimeRecord};
use crate::config::EngineConfig;
use crate::model::{Order, OrderId, StoreError};
use crate::notifier::Notifier;
use crate::presentation::{ORDER_COMPLETED, ORDER_DELETED, ORDER_RECEIVED, ORDER_UPDATED};
use crate::presentation::Presenter;
use crate::protocol::{Command, DecodeError, Decoder, DISPLAY_TEST};
use crate::store::{OrderStore, Outcome};
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Why an inbound message was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures on the rendering side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("order state busy for more than {0:?}")]
    Busy(Duration),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one inbound message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Order(Outcome),
    Info {
        /// Time saved from a `display_test` sync.
        synced: Option<i64>,
        popup: Option<String>,
    },
    /// Unknown discriminator, nothing to do.
    Ignored,
}

#[derive(Debug)]
pub struct Coordinator {
    decode: Mutex<Decoder>,
    presentation: Mutex<OrderStore>,
    notifier: Notifier,
    clock: ClockKeeper,
    lock_timeout: Duration,
    lifecycle_popup: Duration,
    info_popup: Duration,
}

impl Coordinator {
    pub fn new(
        config: &EngineConfig,
        presenter: Box<dyn Presenter>,
        notifier: Notifier,
        clock: ClockKeeper,
    ) -> Self {
        Self {
            decode: Mutex::new(Decoder::new(config)),
            presentation: Mutex::new(OrderStore::new(config, presenter)),
            notifier,
            clock,
            lock_timeout: config.lock_timeout(),
            lifecycle_popup: config.lifecycle_popup(),
            info_popup: config.info_popup(),
        }
    }

    // =========================================================================
    // TRANSPORT SIDE
    // =========================================================================

    /// Decodes and applies one raw write from the command characteristic.
    #[tracing::instrument(skip(self, raw), fields(len = raw.len()))]
    pub async fn handle_message(&self, raw: &[u8]) -> Result<Applied, MessageError> {
        let mut decoder = match tokio::time::timeout(self.lock_timeout, self.decode.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                error!(timeout_ms = self.lock_timeout.as_millis() as u64, "Decode section busy, dropping message");
                return Err(DecodeError::Busy.into());
            }
        };

        let command = decoder.decode(raw).map_err(|e| {
            warn!(error = %e, "Message dropped");
            e
        })?;
        debug!(?command, "Decoded");

        let applied = match command {
            Command::Unknown { .. } => Applied::Ignored,
            Command::Info {
                command,
                timestamp,
                free_text,
            } => self.apply_info(command.as_deref(), timestamp, free_text).await?,
            order_command => {
                let mut store = self.presentation_for_transport().await?;
                Applied::Order(self.apply_order(&mut store, order_command)?)
            }
        };
        drop(decoder);

        if let Applied::Order(Outcome::Completed(order_id)) = &applied {
            self.announce(order_id).await;
        }
        Ok(applied)
    }

    fn apply_order(&self, store: &mut OrderStore, command: Command) -> Result<Outcome, StoreError> {
        let outcome = match command {
            Command::Add {
                order_id,
                number,
                dishes,
            } => store.add(&order_id, number, dishes.as_deref())?,
            Command::Update {
                order_id,
                number,
                dishes,
                completed,
            } => store.update(&order_id, number, dishes.as_deref(), completed)?,
            Command::Remove { order_id } => store.remove(&order_id)?,
            Command::Info { .. } | Command::Unknown { .. } => return Ok(Outcome::NotFound),
        };
        self.confirm(store, &outcome);
        Ok(outcome)
    }

    async fn apply_info(
        &self,
        command: Option<&str>,
        timestamp: Option<i64>,
        free_text: Option<String>,
    ) -> Result<Applied, DecodeError> {
        let sync = timestamp.filter(|_| command == Some(DISPLAY_TEST));
        if sync.is_none() && free_text.is_none() {
            debug!(?command, "Info message without effect");
            return Ok(Applied::Info {
                synced: None,
                popup: None,
            });
        }

        // A busy display drops the whole message, so nothing is saved before this.
        let mut store = self.presentation_for_transport().await?;
        let synced = match sync {
            Some(millis) => match self.clock.persist(millis, Utc::now()).await {
                Ok(true) => Some(millis),
                Ok(false) => None,
                Err(e) => {
                    error!(error = %e, "Failed to persist synced time");
                    None
                }
            },
            None => None,
        };
        if let Some(millis) = synced {
            if let Some(text) = format_status_time(millis) {
                store.presenter().time_synced(millis, &text);
            }
        }
        if let Some(text) = &free_text {
            info!(text = %text, "Info popup");
            store.presenter().show_transient_message(text, self.info_popup);
        }
        Ok(Applied::Info {
            synced,
            popup: free_text,
        })
    }

    async fn presentation_for_transport(&self) -> Result<MutexGuard<'_, OrderStore>, DecodeError> {
        self.lock_store().await.map_err(|_| DecodeError::Busy)
    }

    // =========================================================================
    // RENDERING SIDE
    // =========================================================================

    /// Takes the presentation section, e.g. for a periodic redraw.
    pub async fn lock_store(&self) -> Result<MutexGuard<'_, OrderStore>, CoordinatorError> {
        tokio::time::timeout(self.lock_timeout, self.presentation.lock())
            .await
            .map_err(|_| {
                error!(timeout_ms = self.lock_timeout.as_millis() as u64, "Presentation section busy");
                CoordinatorError::Busy(self.lock_timeout)
            })
    }

    /// Operator finished the focused order.
    pub async fn complete_focused(&self) -> Result<Outcome, CoordinatorError> {
        let outcome = {
            let mut store = self.lock_store().await?;
            let outcome = store.complete_focused()?;
            self.confirm(&mut store, &outcome);
            outcome
        };
        if let Outcome::Completed(order_id) = &outcome {
            self.announce(order_id).await;
        }
        Ok(outcome)
    }

    /// Operator pressed the ready button on one row.
    pub async fn complete_order(&self, order_id: &OrderId) -> Result<Outcome, CoordinatorError> {
        let outcome = {
            let mut store = self.lock_store().await?;
            let outcome = store.complete(order_id)?;
            self.confirm(&mut store, &outcome);
            outcome
        };
        if let Outcome::Completed(order_id) = &outcome {
            self.announce(order_id).await;
        }
        Ok(outcome)
    }

    pub async fn lookup(&self, order_id: &OrderId) -> Result<Option<Order>, CoordinatorError> {
        Ok(self.lock_store().await?.lookup(order_id).cloned())
    }

    pub async fn current_focus(&self) -> Result<Option<Order>, CoordinatorError> {
        Ok(self.lock_store().await?.current_focus().cloned())
    }

    pub async fn waiting_count(&self) -> Result<usize, CoordinatorError> {
        Ok(self.lock_store().await?.waiting_count())
    }

    pub async fn snapshot(&self) -> Result<Vec<Order>, CoordinatorError> {
        Ok(self.lock_store().await?.snapshot())
    }

    /// Forwards a link state change to the status bar.
    pub async fn set_connected(&self, connected: bool) -> Result<(), CoordinatorError> {
        info!(connected, "Connection changed");
        self.lock_store().await?.presenter().connection_changed(connected);
        Ok(())
    }

    /// Loads the persisted time and shows it if it is plausible.
    pub async fn restore_clock(&self) -> Result<Option<TimeRecord>, CoordinatorError> {
        let record = match self.clock.load(Utc::now()).await {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Failed to read saved time");
                None
            }
        };
        if let Some(record) = record {
            if let Some(text) = format_status_time(record.millis) {
                self.lock_store().await?.presenter().time_synced(record.millis, &text);
            }
        }
        Ok(record)
    }

    // =========================================================================
    // SHARED
    // =========================================================================

    fn confirm(&self, store: &mut OrderStore, outcome: &Outcome) {
        let text = match outcome {
            Outcome::Added { .. } => ORDER_RECEIVED,
            Outcome::Updated => ORDER_UPDATED,
            Outcome::Completed(_) => ORDER_COMPLETED,
            Outcome::Removed => ORDER_DELETED,
            Outcome::AlreadyPresent | Outcome::NotFound => return,
        };
        store.presenter().show_transient_message(text, self.lifecycle_popup);
    }

    async fn announce(&self, order_id: &OrderId) {
        if let Err(e) = self.notifier.notify_completed(order_id).await {
            warn!(%order_id, error = %e, "Completion committed, notice not delivered");
        }
    }
}
