//! # Ingress Actor
//!
//! The transport callback never touches order state itself. It hands each raw
//! write to the [`IngressActor`] through an [`IngressClient`] and returns. The
//! actor drains its channel one frame at a time, so frames are applied in exactly
//! the order the transport delivered them.
//!
//! ## Usage
//!
//! ```ignore
//! let (actor, client) = IngressActor::new(32, coordinator.clone());
//! tokio::spawn(actor.run());
//!
//! // From the transport callback, without waiting:
//! client.submit(payload)?;
//!
//! // Or, when the caller wants the outcome:
//! let applied = client.deliver(payload).await?;
//! ```
//!
//! Dropping every client closes the channel and ends [`IngressActor::run`].

use crate::coordinator::{Applied, Coordinator, MessageError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Answer to a read on the command characteristic. Invalid writes are still
/// acknowledged; there is no application-level NACK.
pub const READ_RESPONSE: &str = "OK";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngressError {
    #[error("ingress actor closed")]
    ActorClosed,
    #[error("ingress actor dropped response channel")]
    ActorDropped,
    #[error("ingress queue full, frame dropped")]
    QueueFull,
    #[error(transparent)]
    Message(#[from] MessageError),
}

pub type Response<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub enum IngressRequest {
    Frame {
        payload: Vec<u8>,
        respond_to: Option<Response<Result<Applied, MessageError>>>,
    },
    ConnectionChanged {
        connected: bool,
    },
}

pub struct IngressActor {
    receiver: mpsc::Receiver<IngressRequest>,
    coordinator: Arc<Coordinator>,
}

impl IngressActor {
    pub fn new(buffer_size: usize, coordinator: Arc<Coordinator>) -> (Self, IngressClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            coordinator,
        };
        (actor, IngressClient::new(sender))
    }

    /// Processes frames until every client is dropped.
    pub async fn run(mut self) {
        info!("Ingress started");
        let mut frames: u64 = 0;
        let mut dropped: u64 = 0;

        while let Some(request) = self.receiver.recv().await {
            match request {
                IngressRequest::Frame {
                    payload,
                    respond_to,
                } => {
                    frames += 1;
                    let result = self.coordinator.handle_message(&payload).await;
                    match &result {
                        Ok(applied) => debug!(frame = frames, ?applied, "Frame applied"),
                        Err(e) => {
                            dropped += 1;
                            warn!(frame = frames, error = %e, "Frame dropped");
                        }
                    }
                    if let Some(respond_to) = respond_to {
                        let _ = respond_to.send(result);
                    }
                }
                IngressRequest::ConnectionChanged { connected } => {
                    if let Err(e) = self.coordinator.set_connected(connected).await {
                        warn!(connected, error = %e, "Connection change not shown");
                    }
                }
            }
        }

        info!(frames, dropped, "Ingress shutdown");
    }
}

/// Cloneable handle used by transport callbacks.
#[derive(Debug, Clone)]
pub struct IngressClient {
    sender: mpsc::Sender<IngressRequest>,
}

impl IngressClient {
    pub fn new(sender: mpsc::Sender<IngressRequest>) -> Self {
        Self { sender }
    }

    /// Queues a frame and waits for its outcome.
    pub async fn deliver(&self, payload: Vec<u8>) -> Result<Applied, IngressError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(IngressRequest::Frame {
                payload,
                respond_to: Some(respond_to),
            })
            .await
            .map_err(|_| IngressError::ActorClosed)?;
        Ok(response.await.map_err(|_| IngressError::ActorDropped)??)
    }

    /// Queues a frame without waiting. Never blocks the caller.
    pub fn submit(&self, payload: Vec<u8>) -> Result<(), IngressError> {
        self.sender
            .try_send(IngressRequest::Frame {
                payload,
                respond_to: None,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => IngressError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => IngressError::ActorClosed,
            })
    }

    /// Answer for a read on the command characteristic.
    pub fn read(&self) -> &'static str {
        READ_RESPONSE
    }

    pub async fn connection_changed(&self, connected: bool) -> Result<(), IngressError> {
        self.sender
            .send(IngressRequest::ConnectionChanged { connected })
            .await
            .map_err(|_| IngressError::ActorClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockKeeper, MemoryStore};
    use crate::config::EngineConfig;
    use crate::notifier::mock::RecordingTransport;
    use crate::notifier::Notifier;
    use crate::presentation::mock::RecordingPresenter;
    use crate::protocol::DecodeError;
    use crate::store::Outcome;

    fn coordinator(presenter: RecordingPresenter) -> Arc<Coordinator> {
        let config = EngineConfig::default();
        Arc::new(Coordinator::new(
            &config,
            Box::new(presenter),
            Notifier::new(Arc::new(RecordingTransport::connected()), config.send_timeout()),
            ClockKeeper::new(&config, Arc::new(MemoryStore::new())),
        ))
    }

    #[tokio::test]
    async fn frames_are_applied_in_order() {
        let presenter = RecordingPresenter::new();
        let coordinator = coordinator(presenter.clone());
        let (actor, client) = IngressActor::new(8, coordinator.clone());
        let handle = tokio::spawn(actor.run());

        for id in ["A", "B", "C"] {
            client.submit(format!(r#"{{"t":"a","o":"{id}"}}"#).into_bytes()).unwrap();
        }
        let last = client.deliver(br#"{"t":"u","o":"A","status":true}"#.to_vec()).await.unwrap();
        assert!(matches!(last, Applied::Order(Outcome::Completed(_))));

        let focus = coordinator.current_focus().await.unwrap().unwrap();
        assert_eq!(focus.id.as_str(), "B");

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_frames_are_reported_not_fatal() {
        let coordinator = coordinator(RecordingPresenter::new());
        let (actor, client) = IngressActor::new(8, coordinator);
        let handle = tokio::spawn(actor.run());

        let result = client.deliver(b"garbage".to_vec()).await;
        assert!(matches!(
            result,
            Err(IngressError::Message(MessageError::Decode(DecodeError::MalformedPayload(_))))
        ));
        assert_eq!(client.read(), "OK");
        assert!(client.deliver(br#"{"t":"a","o":"A"}"#.to_vec()).await.is_ok());

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn connection_change_is_forwarded() {
        let presenter = RecordingPresenter::new();
        let (actor, client) = IngressActor::new(8, coordinator(presenter.clone()));
        let handle = tokio::spawn(actor.run());

        client.connection_changed(false).await.unwrap();
        drop(client);
        handle.await.unwrap();

        assert_eq!(
            presenter.events().last(),
            Some(&crate::presentation::LifecycleEvent::ConnectionChanged(false))
        );
    }

    #[tokio::test]
    async fn closed_actor_is_reported() {
        let (actor, client) = IngressActor::new(1, coordinator(RecordingPresenter::new()));
        drop(actor);
        assert_eq!(client.submit(b"{}".to_vec()), Err(IngressError::ActorClosed));
        assert_eq!(
            client.deliver(b"{}".to_vec()).await,
            Err(IngressError::ActorClosed)
        );
    }
}
