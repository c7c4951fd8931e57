//! Alert dispatch for the marches dashboard.
//!
//! Business code enqueues an [`AlertJobPayload`] on the durable `"alertes"`
//! queue; the background [`worker`] resolves the alert rule and delivers on
//! each of its channels, recording one [`Notification`] per attempt.

pub mod api;
pub mod context;
pub mod model;
pub mod queue;
pub mod sender;
pub mod store;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use tracing::info;

use marches_core::{Module, ServiceError};
use marches_sql::SQLStore;

pub use context::{AlertContext, ContextError, ContextValue};
pub use model::{AlertJob, AlertJobPayload, AlertRule, Channel, JobHandle, JobStatus, Notification};
pub use queue::{AlertQueue, QueueConfig, DEFAULT_QUEUE};
pub use sender::{ChannelSender, DeliveryError, OutboundMessage, SenderRegistry};
pub use store::AlertStore;
pub use worker::{AlertWorker, DispatchOutcome, WorkerConfig, WorkerHandle};

/// The alert module: rule store, job queue and (optionally) its worker.
pub struct AlertModule {
    store: Arc<AlertStore>,
    queue: Arc<AlertQueue>,
    worker: Option<WorkerHandle>,
}

impl AlertModule {
    /// Initialise storage and open the queue. No worker runs until
    /// [`AlertModule::start_worker`] is called.
    pub fn new(db: Arc<dyn SQLStore>, queue_config: QueueConfig) -> Result<Self, ServiceError> {
        let store = Arc::new(AlertStore::new(Arc::clone(&db))?);
        let queue = Arc::new(AlertQueue::open(db, queue_config)?);
        Ok(Self {
            store,
            queue,
            worker: None,
        })
    }

    /// Start the dispatch loop and stall watchdog. Restarting stops the
    /// previous worker first.
    pub async fn start_worker(&mut self, senders: SenderRegistry, config: WorkerConfig) {
        if let Some(previous) = self.worker.take() {
            previous.shutdown().await;
        }
        let worker = Arc::new(AlertWorker::new(
            format!("{}-worker", self.queue.name()),
            Arc::clone(&self.queue),
            Arc::clone(&self.store),
            Arc::new(senders),
        ));
        self.worker = Some(worker::start(worker, config));
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<AlertQueue> {
        &self.queue
    }

    /// Producer entry point for other modules.
    pub fn enqueue_alert(&self, payload: AlertJobPayload) -> Result<JobHandle, ServiceError> {
        self.queue.enqueue_alert(payload)
    }

    /// Refuse further enqueues, then stop the worker once the job it is
    /// dispatching has been recorded. The backing store is left open for
    /// its owner to close afterwards.
    pub async fn shutdown(&mut self) {
        self.queue.close();
        if let Some(worker) = self.worker.take() {
            worker.shutdown().await;
        }
        info!("alert module shut down");
    }
}

impl Module for AlertModule {
    fn name(&self) -> &str {
        "alertes"
    }

    fn routes(&self) -> Router {
        api::router(api::AlertState {
            store: Arc::clone(&self.store),
            queue: Arc::clone(&self.queue),
        })
    }
}
