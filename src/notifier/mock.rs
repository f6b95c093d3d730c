//! # Mock Transport
//!
//! [`RecordingTransport`] captures every payload handed to it and can be told to
//! drop the link, reject the next send, or stall.

use super::{SendError, Transport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    sent: Vec<Vec<u8>>,
    rejections: VecDeque<String>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    connected: AtomicBool,
    script: Mutex<Script>,
}

impl RecordingTransport {
    pub fn connected() -> Self {
        Self {
            connected: AtomicBool::new(true),
            script: Mutex::default(),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// The next send fails with [`SendError::Rejected`].
    pub fn reject_next(&self, reason: &str) {
        self.script().rejections.push_back(reason.to_string());
    }

    /// Every send sleeps this long before completing.
    pub fn set_delay(&self, delay: Duration) {
        self.script().delay = Some(delay);
    }

    /// Raw payloads, in send order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.script().sent.clone()
    }

    /// `orderId` of every payload that parsed as a notice.
    pub fn sent_order_ids(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|payload| serde_json::from_slice::<serde_json::Value>(payload).ok())
            .filter_map(|value| value.get("orderId").and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_notification(&self, payload: &[u8]) -> Result<(), SendError> {
        let delay = self.script().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script();
        if let Some(reason) = script.rejections.pop_front() {
            return Err(SendError::Rejected(reason));
        }
        script.sent.push(payload.to_vec());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
