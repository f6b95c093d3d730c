use crate::clock::{ClockKeeper, KeyValueStore, TimeRecord};
use crate::config::{ConfigError, EngineConfig};
use crate::coordinator::Coordinator;
use crate::ingress::{IngressActor, IngressClient};
use crate::notifier::{Notifier, Transport};
use crate::presentation::Presenter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Reasons a [`KitchenSystem`] could not start.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Owns one running engine: the coordinator, the ingress actor and its task.
///
/// # Wiring
///
/// - The **transport** callback uses [`KitchenSystem::ingress`] to hand over raw
///   writes and link state changes.
/// - The **rendering** side uses [`KitchenSystem::coordinator`] for operator
///   actions (`complete_focused`, `complete_order`) and redraw snapshots.
///
/// # Example
///
/// ```ignore
/// let (presenter, events) = ChannelPresenter::new();
/// let system = KitchenSystem::new(
///     EngineConfig::default(),
///     Box::new(presenter),
///     Arc::new(LoopbackTransport::new(true)),
///     Arc::new(MemoryStore::new()),
/// ).await?;
///
/// system.ingress.submit(br#"{"t":"a","o":"order_0001"}"#.to_vec())?;
/// system.coordinator.complete_focused().await?;
///
/// system.shutdown().await?;
/// ```
pub struct KitchenSystem {
    /// Transport-side entry point.
    pub ingress: IngressClient,

    /// Rendering-side entry point.
    pub coordinator: Arc<Coordinator>,

    /// Time restored at startup, if any was plausible.
    pub restored_time: Option<TimeRecord>,

    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl KitchenSystem {
    /// Validates `config`, restores the saved clock and starts ingress.
    pub async fn new(
        config: EngineConfig,
        presenter: Box<dyn Presenter>,
        transport: Arc<dyn Transport>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Result<Self, SystemError> {
        config.validate()?;

        let notifier = Notifier::new(transport, config.send_timeout());
        let clock = ClockKeeper::new(&config, kv);
        let coordinator = Arc::new(Coordinator::new(&config, presenter, notifier, clock));

        let restored_time = match coordinator.restore_clock().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Clock restore skipped");
                None
            }
        };

        let (actor, ingress) = IngressActor::new(config.ingress_buffer, coordinator.clone());
        let ingress_handle = tokio::spawn(actor.run());

        info!(policy = ?config.policy, restored = restored_time.is_some(), "Kitchen system started");
        Ok(Self {
            ingress,
            coordinator,
            restored_time,
            handles: vec![ingress_handle],
        })
    }

    /// Closes ingress, lets queued frames drain and joins the actor task.
    ///
    /// Clones of [`KitchenSystem::ingress`] held elsewhere keep the actor alive;
    /// drop them first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down kitchen system...");

        drop(self.ingress);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Ingress task failed: {:?}", e);
                return Err(format!("Ingress task failed: {:?}", e));
            }
        }

        info!("Kitchen system shutdown complete.");
        Ok(())
    }
}
