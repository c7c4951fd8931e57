use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use marches_core::ServiceError;

use crate::model::{AlertJob, AlertRule, Channel, Notification};
use crate::queue::AlertQueue;
use crate::sender::{DeliveryError, OutboundMessage, SenderRegistry};
use crate::store::{new_notification, AlertStore};

/// Configuration for the background loops, usually from `[worker]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub enabled: bool,
    /// Pause between polls when the queue is empty (milliseconds).
    pub poll_interval_ms: u64,
    /// How often to look for stalled jobs (seconds).
    pub stale_check_interval: u64,
    /// An ACTIVE job older than this many seconds is considered stalled.
    pub stale_threshold: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 500,
            stale_check_interval: 30,
            stale_threshold: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RuleMissing,
    RuleInactive,
}

/// What happened to one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No delivery attempted, no notification written.
    Skipped(SkipReason),
    /// One notification written per channel.
    Delivered { sent: u32, failed: u32 },
}

/// Consumes alert jobs and delivers them on every channel of their rule.
pub struct AlertWorker {
    id: String,
    queue: Arc<AlertQueue>,
    store: Arc<AlertStore>,
    senders: Arc<SenderRegistry>,
}

impl AlertWorker {
    pub fn new(
        id: impl Into<String>,
        queue: Arc<AlertQueue>,
        store: Arc<AlertStore>,
        senders: Arc<SenderRegistry>,
    ) -> Self {
        Self {
            id: id.into(),
            queue,
            store,
            senders,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn queue(&self) -> &Arc<AlertQueue> {
        &self.queue
    }

    /// Dispatch one job.
    ///
    /// A missing or inactive rule is a no-op. Otherwise every channel gets
    /// exactly one attempt and one notification record, whatever happens
    /// on the others. Only storage failures are returned as errors.
    pub async fn process(&self, job: &AlertJob) -> Result<DispatchOutcome, ServiceError> {
        let code = &job.payload.alerte_code;
        let rule = match self.store.find_rule(code)? {
            None => {
                debug!(job = %job.id, alerte = %code, "no such rule, skipping");
                return Ok(DispatchOutcome::Skipped(SkipReason::RuleMissing));
            }
            Some(rule) if !rule.active => {
                debug!(job = %job.id, alerte = %code, "rule inactive, skipping");
                return Ok(DispatchOutcome::Skipped(SkipReason::RuleInactive));
            }
            Some(rule) => rule,
        };

        let (mut sent, mut failed) = (0u32, 0u32);
        for &channel in &rule.channels {
            let notification = self.deliver(&rule, job, channel).await;
            if notification.envoyee {
                sent += 1;
            } else {
                failed += 1;
            }
            self.store.append_notification(&notification)?;
        }

        info!(job = %job.id, alerte = %code, sent, failed, "alert dispatched");
        Ok(DispatchOutcome::Delivered { sent, failed })
    }

    /// Attempt one channel and describe the attempt as a notification.
    async fn deliver(&self, rule: &AlertRule, job: &AlertJob, channel: Channel) -> Notification {
        let mut notification = new_notification(&rule.code, &job.payload.event_code, channel);

        match self.attempt(rule, job, channel, &mut notification).await {
            Ok(()) => notification.envoyee = true,
            Err(e) => {
                warn!(job = %job.id, alerte = %rule.code, %channel, "delivery failed: {e}");
                notification.error = Some(e.to_string());
            }
        }
        notification
    }

    /// Build and send one message, copying what was sent into `notification`.
    async fn attempt(
        &self,
        rule: &AlertRule,
        job: &AlertJob,
        channel: Channel,
        notification: &mut Notification,
    ) -> Result<(), DeliveryError> {
        let msg = build_message(rule, job, channel)?;
        notification.recipient = msg.recipient.clone();
        notification.subject = msg.subject.clone();
        notification.body = msg.body.clone();

        let sender = self
            .senders
            .get(channel)
            .ok_or(DeliveryError::NoSender(channel))?;
        notification.simulated = sender.simulated();
        sender.send(&msg).await
    }

    /// Claim and process one job. `false` when the queue was empty.
    pub async fn run_once(&self) -> Result<bool, ServiceError> {
        let Some(job) = self.queue.claim_next(&self.id)? else {
            return Ok(false);
        };

        match self.process(&job).await {
            Ok(_) => {
                self.queue.complete(&job.id)?;
            }
            Err(e) => {
                error!(job = %job.id, "alert job processing error: {e}");
                self.queue.fail(&job.id, &e.to_string())?;
            }
        }
        Ok(true)
    }
}

/// Render the rule's templates and resolve the channel's recipient.
fn build_message(
    rule: &AlertRule,
    job: &AlertJob,
    channel: Channel,
) -> Result<OutboundMessage, DeliveryError> {
    let payload = &job.payload;

    let recipient = match channel {
        Channel::Push => payload
            .in_app_user_id
            .clone()
            .or_else(|| rule.recipients.get(&channel).cloned()),
        _ => rule.recipients.get(&channel).cloned(),
    }
    .filter(|r| !r.trim().is_empty())
    .ok_or(DeliveryError::NoRecipient(channel))?;

    let subject = match channel {
        Channel::Sms => None,
        _ => Some(match &rule.subject {
            Some(t) => payload.context.render(t)?,
            None => rule.label.clone(),
        }),
    };

    let body = match &rule.template {
        Some(t) => payload.context.render(t)?,
        None => format!("{} ({})", rule.label, payload.event_code),
    };

    Ok(OutboundMessage {
        channel,
        recipient,
        subject,
        body,
        alerte_code: rule.code.clone(),
        event_code: payload.event_code.clone(),
        context: payload.context.clone(),
    })
}

/// Start the background loops.
///
/// - **Dispatch loop**: drains the queue, then sleeps `poll_interval_ms`.
/// - **Stall watchdog**: puts silent ACTIVE jobs back to WAITING.
///
/// The returned handle stops both loops; the job in flight is finished
/// first.
pub fn start(worker: Arc<AlertWorker>, config: WorkerConfig) -> WorkerHandle {
    let cancel = CancellationToken::new();
    let mut tasks = Vec::with_capacity(2);

    // --- Dispatch loop ---
    {
        let worker = Arc::clone(&worker);
        let cancel = cancel.clone();
        let interval = Duration::from_millis(config.poll_interval_ms.max(10));

        tasks.push(tokio::spawn(async move {
            info!(worker = %worker.id(), "alert worker started (poll={interval:?})");
            loop {
                // Drain everything that is ready before sleeping.
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    match worker.run_once().await {
                        Ok(true) => continue,
                        Ok(false) => break,
                        Err(e) => {
                            error!("alert worker error: {e}");
                            break;
                        }
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(worker = %worker.id(), "alert worker stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }));
    }

    // --- Stall watchdog ---
    {
        let queue = Arc::clone(worker.queue());
        let cancel = cancel.clone();
        let interval = Duration::from_secs(config.stale_check_interval.max(1));
        let threshold = config.stale_threshold;

        tasks.push(tokio::spawn(async move {
            info!("alert stall watchdog started (interval={interval:?}, threshold={threshold}s)");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("alert stall watchdog stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        debug!("stall watchdog scan");
                        match queue.recover_stalled(threshold) {
                            Ok(0) => {}
                            Ok(n) => info!("stall watchdog: recovered {n} jobs"),
                            Err(e) => error!("stall watchdog error: {e}"),
                        }
                    }
                }
            }
        }));
    }

    WorkerHandle { cancel, tasks }
}

/// Running background loops started by [`start`].
pub struct WorkerHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Ask the loops to stop without waiting for them.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the loops and wait until they have exited. A job being
    /// dispatched is completed (or failed) before this returns.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("alert worker task ended abnormally: {e}");
            }
        }
    }
}
