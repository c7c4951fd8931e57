use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use marches_core::{new_id, now_rfc3339, parse_rfc3339, ListParams, ListResult, ServiceError};
use marches_sql::{SQLStore, Value};

use crate::model::{AlertJob, AlertJobPayload, JobCounts, JobHandle, JobListQuery, JobStatus};
use crate::store::{row_to, sql_err, to_json};

/// Default queue name for alert dispatch.
pub const DEFAULT_QUEUE: &str = "alertes";

/// SQL schema for queued jobs. `seq` gives FIFO order.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alert_jobs (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,
    queue       TEXT NOT NULL,
    status      TEXT NOT NULL,
    data        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    finished_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_alert_jobs_status ON alert_jobs(queue, status, seq);
";

/// Attempts before a contended claim gives up for this round.
const CLAIM_RETRIES: usize = 5;

/// Error recorded on a job reclaimed from a silent worker.
const STALLED_ERROR: &str = "stalled: worker went silent";

/// Queue settings, usually from the `[queue]` config section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub name: String,
    /// Completed jobs kept for inspection.
    pub keep_completed: usize,
    /// Failed jobs kept for inspection.
    pub keep_failed: usize,
    /// Processing attempts before a job is marked failed.
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE.to_string(),
            keep_completed: 500,
            keep_failed: 1000,
            max_attempts: 3,
        }
    }
}

/// Durable alert job queue on top of the SQL store.
///
/// Constructed once by the composition root and shared through `Arc`.
/// [`AlertQueue::close`] stops admission; the database itself is owned and
/// closed by whoever opened it.
pub struct AlertQueue {
    db: Arc<dyn SQLStore>,
    config: QueueConfig,
    closed: AtomicBool,
}

impl AlertQueue {
    /// Initialise the schema and return an open queue.
    pub fn open(db: Arc<dyn SQLStore>, config: QueueConfig) -> Result<Self, ServiceError> {
        if config.name.trim().is_empty() {
            return Err(ServiceError::Validation("queue name cannot be empty".into()));
        }
        if config.max_attempts == 0 {
            return Err(ServiceError::Validation("max_attempts must be at least 1".into()));
        }
        db.exec_batch(SCHEMA).map_err(sql_err)?;
        info!(
            queue = %config.name,
            keep_completed = config.keep_completed,
            keep_failed = config.keep_failed,
            "alert queue opened"
        );
        Ok(Self {
            db,
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Stop accepting jobs. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(queue = %self.config.name, "alert queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =======================================================================
    // Producer side
    // =======================================================================

    /// Validate the payload and persist one job for the worker.
    ///
    /// The job is committed before this returns. Validation errors are
    /// raised before touching the store; an unreachable or closed store
    /// yields `Unavailable`.
    pub fn enqueue_alert(&self, payload: AlertJobPayload) -> Result<JobHandle, ServiceError> {
        payload.validate()?;
        if self.is_closed() {
            return Err(ServiceError::Unavailable(format!(
                "queue '{}' is closed",
                self.config.name
            )));
        }

        let job = AlertJob {
            id: new_id(),
            queue: self.config.name.clone(),
            payload,
            status: JobStatus::Waiting,
            attempts: 0,
            max_attempts: self.config.max_attempts,
            error: None,
            claimed_by: None,
            created_at: now_rfc3339(),
            started_at: None,
            finished_at: None,
        };

        self.db
            .exec(
                "INSERT INTO alert_jobs (id, queue, status, data, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                &[
                    job.id.as_str().into(),
                    job.queue.as_str().into(),
                    job.status.as_str().into(),
                    to_json(&job)?.into(),
                    job.created_at.as_str().into(),
                ],
            )
            .map_err(sql_err)?;

        debug!(
            job = %job.id,
            event = %job.payload.event_code,
            alerte = %job.payload.alerte_code,
            "alert job enqueued"
        );
        Ok(JobHandle {
            id: job.id,
            queue: job.queue,
        })
    }

    // =======================================================================
    // Consumer side
    // =======================================================================

    /// Claim the oldest waiting job: WAITING -> ACTIVE (CAS).
    ///
    /// `None` when the queue is empty, or when every candidate was taken
    /// by another worker in the meantime.
    pub fn claim_next(&self, worker_id: &str) -> Result<Option<AlertJob>, ServiceError> {
        for _ in 0..CLAIM_RETRIES {
            let rows = self
                .db
                .query(
                    "SELECT seq, data FROM alert_jobs WHERE queue = ?1 AND status = ?2 \
                     ORDER BY seq ASC LIMIT 1",
                    &[
                        self.config.name.as_str().into(),
                        JobStatus::Waiting.as_str().into(),
                    ],
                )
                .map_err(sql_err)?;

            let Some(row) = rows.first() else {
                return Ok(None);
            };
            let seq = row
                .get_i64("seq")
                .ok_or_else(|| ServiceError::Storage("missing seq column".into()))?;
            let mut job: AlertJob = row_to(row)?;

            job.status = JobStatus::Active;
            job.claimed_by = Some(worker_id.to_string());
            job.started_at = Some(now_rfc3339());

            let affected = self
                .db
                .exec(
                    "UPDATE alert_jobs SET data = ?1, status = ?2 WHERE seq = ?3 AND status = ?4",
                    &[
                        to_json(&job)?.into(),
                        job.status.as_str().into(),
                        Value::Integer(seq),
                        JobStatus::Waiting.as_str().into(),
                    ],
                )
                .map_err(sql_err)?;

            if affected > 0 {
                debug!(job = %job.id, worker = worker_id, "alert job claimed");
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// ACTIVE -> COMPLETED, then trim completed history.
    pub fn complete(&self, id: &str) -> Result<AlertJob, ServiceError> {
        let mut job = self.get(id)?;
        expect_status(&job, JobStatus::Active)?;

        job.status = JobStatus::Completed;
        job.error = None;
        job.finished_at = Some(now_rfc3339());
        self.save(&job, JobStatus::Active)?;

        self.trim(JobStatus::Completed, self.config.keep_completed)?;
        Ok(job)
    }

    /// Record a failed attempt. The job goes back to WAITING while attempts
    /// remain, otherwise to FAILED (and failed history is trimmed).
    pub fn fail(&self, id: &str, error: &str) -> Result<AlertJob, ServiceError> {
        let mut job = self.get(id)?;
        expect_status(&job, JobStatus::Active)?;

        job.attempts += 1;
        job.error = Some(error.to_string());
        job.claimed_by = None;

        if job.attempts < job.max_attempts {
            job.status = JobStatus::Waiting;
            job.started_at = None;
            self.save(&job, JobStatus::Active)?;
            debug!(job = %job.id, attempts = job.attempts, "alert job requeued: {error}");
        } else {
            job.status = JobStatus::Failed;
            job.finished_at = Some(now_rfc3339());
            self.save(&job, JobStatus::Active)?;
            warn!(job = %job.id, attempts = job.attempts, "alert job failed: {error}");
            self.trim(JobStatus::Failed, self.config.keep_failed)?;
        }
        Ok(job)
    }

    /// Manually re-drive a FAILED job.
    pub fn retry(&self, id: &str) -> Result<AlertJob, ServiceError> {
        let mut job = self.get(id)?;
        expect_status(&job, JobStatus::Failed)?;

        job.status = JobStatus::Waiting;
        job.attempts = 0;
        job.error = None;
        job.started_at = None;
        job.finished_at = None;
        self.save(&job, JobStatus::Failed)?;
        info!(job = %job.id, "alert job re-queued");
        Ok(job)
    }

    /// Treat ACTIVE jobs whose worker went silent for `threshold_secs` as a
    /// failed attempt: back to WAITING while attempts remain, otherwise
    /// FAILED. Returns how many were recovered.
    pub fn recover_stalled(&self, threshold_secs: i64) -> Result<u32, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT data FROM alert_jobs WHERE queue = ?1 AND status = ?2",
                &[
                    self.config.name.as_str().into(),
                    JobStatus::Active.as_str().into(),
                ],
            )
            .map_err(sql_err)?;

        let now = chrono::Utc::now();
        let mut recovered = 0u32;
        let mut failed_any = false;

        for row in &rows {
            let mut job: AlertJob = row_to(row)?;
            let Some(started) = job.started_at.as_deref().and_then(parse_rfc3339) else {
                continue;
            };
            if (now - started).num_seconds() < threshold_secs {
                continue;
            }

            job.attempts += 1;
            job.error = Some(STALLED_ERROR.to_string());
            job.claimed_by = None;
            job.started_at = None;
            let exhausted = job.attempts >= job.max_attempts;
            if exhausted {
                job.status = JobStatus::Failed;
                job.finished_at = Some(now_rfc3339());
            } else {
                job.status = JobStatus::Waiting;
            }

            if self.save(&job, JobStatus::Active)? {
                recovered += 1;
                if exhausted {
                    warn!(job = %job.id, attempts = job.attempts, "stalled alert job failed");
                    failed_any = true;
                } else {
                    debug!(job = %job.id, attempts = job.attempts, "stalled alert job requeued");
                }
            }
        }

        if failed_any {
            self.trim(JobStatus::Failed, self.config.keep_failed)?;
        }
        Ok(recovered)
    }

    // =======================================================================
    // Query
    // =======================================================================

    pub fn get(&self, id: &str) -> Result<AlertJob, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT data FROM alert_jobs WHERE id = ?1 AND queue = ?2",
                &[id.into(), self.config.name.as_str().into()],
            )
            .map_err(sql_err)?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("job {id}")))?;
        row_to(row)
    }

    /// Jobs newest first, optionally filtered by status.
    pub fn list(&self, query: &JobListQuery) -> Result<ListResult<AlertJob>, ServiceError> {
        let page = ListParams::new(query.limit, query.offset);

        let mut params: Vec<Value> = vec![self.config.name.as_str().into()];
        let mut where_sql = "WHERE queue = ?1".to_string();
        if let Some(status) = query.status {
            params.push(status.as_str().into());
            where_sql.push_str(" AND status = ?2");
        }

        let count_rows = self
            .db
            .query(&format!("SELECT COUNT(*) AS cnt FROM alert_jobs {where_sql}"), &params)
            .map_err(sql_err)?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let idx = params.len() + 1;
        let select_sql = format!(
            "SELECT data FROM alert_jobs {where_sql} ORDER BY seq DESC LIMIT ?{idx} OFFSET ?{}",
            idx + 1
        );
        params.push(Value::Integer(page.capped_limit() as i64));
        params.push(Value::Integer(page.offset as i64));

        let rows = self.db.query(&select_sql, &params).map_err(sql_err)?;
        let items = rows.iter().map(row_to).collect::<Result<Vec<_>, _>>()?;
        Ok(ListResult { items, total })
    }

    pub fn counts(&self) -> Result<JobCounts, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT status, COUNT(*) AS cnt FROM alert_jobs WHERE queue = ?1 GROUP BY status",
                &[self.config.name.as_str().into()],
            )
            .map_err(sql_err)?;

        let mut counts = JobCounts::default();
        for row in &rows {
            let n = row.get_i64("cnt").unwrap_or(0) as usize;
            match row.get_str("status").and_then(JobStatus::from_str) {
                Some(JobStatus::Waiting) => counts.waiting = n,
                Some(JobStatus::Active) => counts.active = n,
                Some(JobStatus::Completed) => counts.completed = n,
                Some(JobStatus::Failed) => counts.failed = n,
                None => {}
            }
        }
        Ok(counts)
    }

    // =======================================================================
    // Internals
    // =======================================================================

    /// Write `job` back if its stored status is still `expected`.
    fn save(&self, job: &AlertJob, expected: JobStatus) -> Result<bool, ServiceError> {
        let affected = self
            .db
            .exec(
                "UPDATE alert_jobs SET data = ?1, status = ?2, finished_at = ?3 \
                 WHERE id = ?4 AND status = ?5",
                &[
                    to_json(job)?.into(),
                    job.status.as_str().into(),
                    job.finished_at.as_deref().into(),
                    job.id.as_str().into(),
                    expected.as_str().into(),
                ],
            )
            .map_err(sql_err)?;
        Ok(affected > 0)
    }

    /// Keep only the newest `keep` jobs in `status`, oldest evicted first.
    fn trim(&self, status: JobStatus, keep: usize) -> Result<(), ServiceError> {
        let evicted = self
            .db
            .exec(
                "DELETE FROM alert_jobs WHERE queue = ?1 AND status = ?2 AND seq NOT IN (\
                   SELECT seq FROM alert_jobs WHERE queue = ?1 AND status = ?2 \
                   ORDER BY finished_at DESC, seq DESC LIMIT ?3)",
                &[
                    self.config.name.as_str().into(),
                    status.as_str().into(),
                    Value::Integer(keep as i64),
                ],
            )
            .map_err(sql_err)?;
        if evicted > 0 {
            debug!(queue = %self.config.name, %status, evicted, "trimmed job history");
        }
        Ok(())
    }
}

fn expect_status(job: &AlertJob, expected: JobStatus) -> Result<(), ServiceError> {
    if job.status == expected {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "job {} is {}, expected {}",
            job.id, job.status, expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AlertContext;
    use marches_sql::{Row, SQLError, SqliteStore};

    fn open_queue(config: QueueConfig) -> (Arc<SqliteStore>, AlertQueue) {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        let queue = AlertQueue::open(db.clone(), config).unwrap();
        (db, queue)
    }

    fn queue() -> AlertQueue {
        open_queue(QueueConfig::default()).1
    }

    fn payload(n: usize) -> AlertJobPayload {
        AlertJobPayload::new("MARCHE_CREATED", "notif-marche")
            .with_context(AlertContext::new().with("marcheId", format!("m{n}")))
    }

    /// A store whose backing database can never be reached.
    struct Unreachable;

    impl SQLStore for Unreachable {
        fn query(&self, _: &str, _: &[Value]) -> Result<Vec<Row>, SQLError> {
            Err(SQLError::Connection("connection refused".into()))
        }
        fn exec(&self, _: &str, _: &[Value]) -> Result<u64, SQLError> {
            Err(SQLError::Connection("connection refused".into()))
        }
        fn exec_batch(&self, _: &str) -> Result<(), SQLError> {
            Ok(())
        }
    }

    #[test]
    fn enqueue_persists_waiting_job() {
        let q = queue();
        let handle = q.enqueue_alert(payload(1)).unwrap();
        assert_eq!(handle.queue, "alertes");

        let job = q.get(&handle.id).unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.payload, payload(1));
        assert_eq!(job.max_attempts, 3);
        assert_eq!(q.counts().unwrap().waiting, 1);
    }

    #[test]
    fn enqueue_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.sqlite");
        let id = {
            let db = Arc::new(SqliteStore::open(&path).unwrap());
            let q = AlertQueue::open(db.clone(), QueueConfig::default()).unwrap();
            let id = q.enqueue_alert(payload(1)).unwrap().id;
            q.close();
            db.close().unwrap();
            id
        };
        let db = Arc::new(SqliteStore::open(&path).unwrap());
        let q = AlertQueue::open(db, QueueConfig::default()).unwrap();
        assert_eq!(q.get(&id).unwrap().status, JobStatus::Waiting);
    }

    #[test]
    fn invalid_payload_rejected_before_io() {
        // Validation must win even against a dead store.
        let q = AlertQueue::open(Arc::new(Unreachable), QueueConfig::default()).unwrap();
        let err = q
            .enqueue_alert(AlertJobPayload::new("", "notif-marche"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn unreachable_store_surfaces_error() {
        let q = AlertQueue::open(Arc::new(Unreachable), QueueConfig::default()).unwrap();
        let err = q.enqueue_alert(payload(1)).unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn closed_database_surfaces_error() {
        let (db, q) = open_queue(QueueConfig::default());
        db.close().unwrap();
        assert!(matches!(q.enqueue_alert(payload(1)), Err(ServiceError::Unavailable(_))));
    }

    #[test]
    fn closed_queue_refuses_jobs() {
        let q = queue();
        q.close();
        q.close();
        assert!(q.is_closed());
        assert!(matches!(q.enqueue_alert(payload(1)), Err(ServiceError::Unavailable(_))));
        assert_eq!(q.counts().unwrap(), JobCounts::default());
    }

    #[test]
    fn claims_in_fifo_order_once() {
        let q = queue();
        let first = q.enqueue_alert(payload(1)).unwrap();
        let second = q.enqueue_alert(payload(2)).unwrap();

        let a = q.claim_next("w1").unwrap().unwrap();
        let b = q.claim_next("w2").unwrap().unwrap();
        assert_eq!(a.id, first.id);
        assert_eq!(b.id, second.id);
        assert_eq!(a.status, JobStatus::Active);
        assert_eq!(a.claimed_by.as_deref(), Some("w1"));
        assert!(q.claim_next("w3").unwrap().is_none());
    }

    #[test]
    fn complete_requires_active() {
        let q = queue();
        let h = q.enqueue_alert(payload(1)).unwrap();
        assert!(matches!(q.complete(&h.id), Err(ServiceError::Validation(_))));

        q.claim_next("w").unwrap();
        let done = q.complete(&h.id).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.finished_at.is_some());
        assert!(matches!(q.complete(&h.id), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn fail_retries_then_gives_up() {
        let (_db, q) = open_queue(QueueConfig {
            max_attempts: 2,
            ..Default::default()
        });
        let h = q.enqueue_alert(payload(1)).unwrap();

        q.claim_next("w").unwrap().unwrap();
        let job = q.fail(&h.id, "smtp down").unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.attempts, 1);
        assert!(job.claimed_by.is_none());

        q.claim_next("w").unwrap().unwrap();
        let job = q.fail(&h.id, "smtp still down").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("smtp still down"));

        let job = q.retry(&h.id).unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.attempts, 0);
        assert!(q.retry(&h.id).is_err());
    }

    #[test]
    fn retention_evicts_oldest_completed() {
        let (_db, q) = open_queue(QueueConfig {
            keep_completed: 2,
            ..Default::default()
        });
        let ids: Vec<String> = (0..4).map(|n| q.enqueue_alert(payload(n)).unwrap().id).collect();
        for _ in 0..4 {
            let job = q.claim_next("w").unwrap().unwrap();
            q.complete(&job.id).unwrap();
        }

        assert_eq!(q.counts().unwrap().completed, 2);
        assert!(q.get(&ids[0]).is_err());
        assert!(q.get(&ids[1]).is_err());
        assert!(q.get(&ids[2]).is_ok());
        assert!(q.get(&ids[3]).is_ok());
    }

    #[test]
    fn retention_evicts_oldest_failed() {
        let (_db, q) = open_queue(QueueConfig {
            keep_failed: 1,
            max_attempts: 1,
            ..Default::default()
        });
        let first = q.enqueue_alert(payload(1)).unwrap();
        let second = q.enqueue_alert(payload(2)).unwrap();
        for _ in 0..2 {
            let job = q.claim_next("w").unwrap().unwrap();
            q.fail(&job.id, "boom").unwrap();
        }
        assert_eq!(q.counts().unwrap().failed, 1);
        assert!(q.get(&first.id).is_err());
        assert_eq!(q.get(&second.id).unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn stalled_jobs_are_recovered() {
        let q = queue();
        let h = q.enqueue_alert(payload(1)).unwrap();
        q.claim_next("w").unwrap().unwrap();

        // Fresh claim is not stalled.
        assert_eq!(q.recover_stalled(60).unwrap(), 0);
        // Any claim is older than zero seconds.
        assert_eq!(q.recover_stalled(0).unwrap(), 1);

        let job = q.get(&h.id).unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.error.as_deref(), Some(STALLED_ERROR));
        assert!(q.claim_next("w2").unwrap().is_some());
    }

    #[test]
    fn job_that_keeps_stalling_ends_failed() {
        let (_db, q) = open_queue(QueueConfig {
            max_attempts: 2,
            ..Default::default()
        });
        let h = q.enqueue_alert(payload(1)).unwrap();

        q.claim_next("w").unwrap().unwrap();
        assert_eq!(q.recover_stalled(0).unwrap(), 1);
        assert_eq!(q.get(&h.id).unwrap().status, JobStatus::Waiting);

        q.claim_next("w").unwrap().unwrap();
        assert_eq!(q.recover_stalled(0).unwrap(), 1);
        let job = q.get(&h.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 2);
        assert!(job.finished_at.is_some());
        assert!(job.claimed_by.is_none());

        // A failed job is no longer claimable or recoverable.
        assert!(q.claim_next("w").unwrap().is_none());
        assert_eq!(q.recover_stalled(0).unwrap(), 0);
        assert_eq!(q.counts().unwrap().failed, 1);
    }

    #[test]
    fn queues_are_isolated_by_name() {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        let alertes = AlertQueue::open(db.clone(), QueueConfig::default()).unwrap();
        let other = AlertQueue::open(
            db,
            QueueConfig {
                name: "rapports".into(),
                ..Default::default()
            },
        )
        .unwrap();

        let h = alertes.enqueue_alert(payload(1)).unwrap();
        assert!(other.claim_next("w").unwrap().is_none());
        assert!(other.get(&h.id).is_err());
        assert_eq!(alertes.list(&JobListQuery::default()).unwrap().total, 1);
    }

    #[test]
    fn list_filters_by_status() {
        let q = queue();
        q.enqueue_alert(payload(1)).unwrap();
        q.enqueue_alert(payload(2)).unwrap();
        let job = q.claim_next("w").unwrap().unwrap();
        q.complete(&job.id).unwrap();

        let waiting = q
            .list(&JobListQuery {
                status: Some(JobStatus::Waiting),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(waiting.total, 1);
        assert_eq!(waiting.items[0].status, JobStatus::Waiting);

        let all = q.list(&JobListQuery::default()).unwrap();
        assert_eq!(all.total, 2);
    }

    #[test]
    fn config_validation() {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        let bad = QueueConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(AlertQueue::open(db.clone(), bad).is_err());
        let bad = QueueConfig {
            name: " ".into(),
            ..Default::default()
        };
        assert!(AlertQueue::open(db, bad).is_err());
    }
}
