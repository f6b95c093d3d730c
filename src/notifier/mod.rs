//! # Outbound Notifier
//!
//! Tells the sending device that an order is ready by writing
//! `{"orderId":"<id>","status":true}` to the notification characteristic.
//!
//! Delivery is best-effort. By the time a notice is sent the completion has
//! already been committed to the store, so callers log a [`SendError`] and move on.

pub mod mock;

use crate::model::OrderId;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no active connection")]
    NotConnected,
    #[error("send rejected by transport: {0}")]
    Rejected(String),
    #[error("send timed out")]
    Timeout,
    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Send side of the wireless link.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_notification(&self, payload: &[u8]) -> Result<(), SendError>;

    fn is_connected(&self) -> bool;
}

/// Wire shape of a completion notice.
#[derive(Debug, Serialize)]
pub struct CompletionNotice<'a> {
    #[serde(rename = "orderId")]
    pub order_id: &'a str,
    pub status: bool,
}

impl<'a> CompletionNotice<'a> {
    pub fn completed(order_id: &'a OrderId) -> Self {
        Self {
            order_id: order_id.as_str(),
            status: true,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SendError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn Transport>,
    send_timeout: Duration,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>, send_timeout: Duration) -> Self {
        Self {
            transport,
            send_timeout,
        }
    }

    #[tracing::instrument(skip(self, order_id), fields(order_id = %order_id))]
    pub async fn notify_completed(&self, order_id: &OrderId) -> Result<(), SendError> {
        if !self.transport.is_connected() {
            warn!("No connection, completion notice not sent");
            return Err(SendError::NotConnected);
        }
        let payload = CompletionNotice::completed(order_id).to_bytes()?;
        debug!(payload = %String::from_utf8_lossy(&payload), "Sending completion notice");

        match tokio::time::timeout(self.send_timeout, self.transport.send_notification(&payload)).await {
            Ok(Ok(())) => {
                info!("Completion notice sent");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Completion notice failed");
                Err(e)
            }
            Err(_) => {
                warn!(timeout_ms = self.send_timeout.as_millis() as u64, "Completion notice timed out");
                Err(SendError::Timeout)
            }
        }
    }
}

/// Transport that logs notices instead of sending them. Used by the demo binary.
#[derive(Debug)]
pub struct LoopbackTransport {
    connected: bool,
}

impl LoopbackTransport {
    pub fn new(connected: bool) -> Self {
        Self { connected }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_notification(&self, payload: &[u8]) -> Result<(), SendError> {
        info!(payload = %String::from_utf8_lossy(payload), "Loopback notification");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::mock::RecordingTransport;
    use super::*;

    #[test]
    fn notice_wire_shape() {
        let id = OrderId::from("order_0005");
        let bytes = CompletionNotice::completed(&id).to_bytes().unwrap();
        assert_eq!(bytes, br#"{"orderId":"order_0005","status":true}"#);
    }

    #[test]
    fn notice_escapes_id() {
        let id = OrderId::from("a\"b");
        let bytes = CompletionNotice::completed(&id).to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["orderId"], "a\"b");
        assert_eq!(value["status"], true);
    }

    #[tokio::test]
    async fn sends_through_transport() {
        let transport = Arc::new(RecordingTransport::connected());
        let notifier = Notifier::new(transport.clone(), Duration::from_millis(100));

        notifier.notify_completed(&OrderId::from("A")).await.unwrap();
        assert_eq!(transport.sent_order_ids(), vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn disconnected_transport_is_reported() {
        let transport = Arc::new(RecordingTransport::disconnected());
        let notifier = Notifier::new(transport.clone(), Duration::from_millis(100));

        let result = notifier.notify_completed(&OrderId::from("A")).await;
        assert!(matches!(result, Err(SendError::NotConnected)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn rejected_send_is_surfaced() {
        let transport = Arc::new(RecordingTransport::connected());
        transport.reject_next("congested");
        let notifier = Notifier::new(transport.clone(), Duration::from_millis(100));

        let result = notifier.notify_completed(&OrderId::from("A")).await;
        assert!(matches!(result, Err(SendError::Rejected(reason)) if reason == "congested"));
    }

    #[tokio::test]
    async fn slow_send_times_out() {
        let transport = Arc::new(RecordingTransport::connected());
        transport.set_delay(Duration::from_secs(5));
        let notifier = Notifier::new(transport.clone(), Duration::from_millis(50));

        let result = notifier.notify_completed(&OrderId::from("A")).await;
        assert!(matches!(result, Err(SendError::Timeout)));
    }
}
