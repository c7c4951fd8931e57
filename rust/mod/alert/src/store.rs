use std::sync::Arc;

use tracing::info;

use marches_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use marches_sql::{Row, SQLError, SQLStore, Value};

use crate::model::{
    dedup_channels, validate_rule_fields, AlertRule, CreateAlertRule, Notification,
    NotificationQuery, UpdateAlertRule,
};

/// SQL schema for alert rules and the notification log.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alert_rules (
    code        TEXT PRIMARY KEY,
    data        TEXT NOT NULL,
    active      INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS notifications (
    id          TEXT PRIMARY KEY,
    data        TEXT NOT NULL,
    alerte_code TEXT NOT NULL,
    channel     TEXT NOT NULL,
    envoyee     INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notif_alerte ON notifications(alerte_code);
CREATE INDEX IF NOT EXISTS idx_notif_created_at ON notifications(created_at);
";

/// Map a SQL failure to the service taxonomy: an unreachable store is
/// `Unavailable`, anything else is `Storage`.
pub(crate) fn sql_err(e: SQLError) -> ServiceError {
    if e.is_connection() {
        ServiceError::Unavailable(format!("alert store unreachable: {e}"))
    } else {
        ServiceError::Storage(e.to_string())
    }
}

/// Persistent storage for alert rules and notifications.
pub struct AlertStore {
    db: Arc<dyn SQLStore>,
}

impl AlertStore {
    /// Create a new AlertStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| ServiceError::Storage(format!("alert schema init: {e}")))?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------------

    pub fn create_rule(&self, input: CreateAlertRule) -> Result<AlertRule, ServiceError> {
        validate_rule_fields(&input.code, &input.label)?;

        let now = now_rfc3339();
        let rule = AlertRule {
            code: input.code,
            label: input.label,
            channels: dedup_channels(input.channels),
            recipients: input.recipients,
            subject: input.subject.filter(|s| !s.is_empty()),
            template: input.template.filter(|s| !s.is_empty()),
            active: input.active,
            created_at: now.clone(),
            updated_at: now,
        };

        // The primary key decides between concurrent creators.
        let inserted = self
            .db
            .exec(
                "INSERT INTO alert_rules (code, data, active, created_at) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(code) DO NOTHING",
                &[
                    rule.code.as_str().into(),
                    to_json(&rule)?.into(),
                    rule.active.into(),
                    rule.created_at.as_str().into(),
                ],
            )
            .map_err(sql_err)?;
        if inserted == 0 {
            return Err(ServiceError::Conflict(format!(
                "rule '{}' already exists",
                rule.code
            )));
        }

        info!(code = %rule.code, active = rule.active, "alert rule created");
        Ok(rule)
    }

    /// Get a rule, `NotFound` if absent.
    pub fn get_rule(&self, code: &str) -> Result<AlertRule, ServiceError> {
        self.find_rule(code)?
            .ok_or_else(|| ServiceError::NotFound(format!("rule '{code}' not found")))
    }

    /// Look a rule up without treating absence as an error.
    pub fn find_rule(&self, code: &str) -> Result<Option<AlertRule>, ServiceError> {
        let rows = self
            .db
            .query("SELECT data FROM alert_rules WHERE code = ?1", &[code.into()])
            .map_err(sql_err)?;
        rows.first().map(row_to).transpose()
    }

    /// All rules ordered by code.
    pub fn list_rules(&self) -> Result<Vec<AlertRule>, ServiceError> {
        let rows = self
            .db
            .query("SELECT data FROM alert_rules ORDER BY code ASC", &[])
            .map_err(sql_err)?;
        rows.iter().map(row_to).collect()
    }

    pub fn update_rule(
        &self,
        code: &str,
        patch: UpdateAlertRule,
    ) -> Result<AlertRule, ServiceError> {
        let mut rule = self.get_rule(code)?;

        if let Some(label) = patch.label {
            rule.label = label;
        }
        if let Some(channels) = patch.channels {
            rule.channels = dedup_channels(channels);
        }
        if let Some(recipients) = patch.recipients {
            rule.recipients = recipients;
        }
        if let Some(subject) = patch.subject {
            rule.subject = Some(subject).filter(|s| !s.is_empty());
        }
        if let Some(template) = patch.template {
            rule.template = Some(template).filter(|s| !s.is_empty());
        }
        if let Some(active) = patch.active {
            rule.active = active;
        }
        validate_rule_fields(&rule.code, &rule.label)?;
        rule.updated_at = now_rfc3339();

        let affected = self
            .db
            .exec(
                "UPDATE alert_rules SET data = ?1, active = ?2 WHERE code = ?3",
                &[to_json(&rule)?.into(), rule.active.into(), code.into()],
            )
            .map_err(sql_err)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("rule '{code}' not found")));
        }

        info!(code = %rule.code, active = rule.active, "alert rule updated");
        Ok(rule)
    }

    pub fn delete_rule(&self, code: &str) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec("DELETE FROM alert_rules WHERE code = ?1", &[code.into()])
            .map_err(sql_err)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("rule '{code}' not found")));
        }
        info!(code, "alert rule deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Notifications (append-only)
    // -----------------------------------------------------------------------

    /// Record one delivery attempt.
    pub fn append_notification(&self, n: &Notification) -> Result<(), ServiceError> {
        self.db
            .exec(
                "INSERT INTO notifications (id, data, alerte_code, channel, envoyee, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                &[
                    n.id.as_str().into(),
                    to_json(n)?.into(),
                    n.alerte_code.as_str().into(),
                    n.channel.as_str().into(),
                    n.envoyee.into(),
                    n.created_at.as_str().into(),
                ],
            )
            .map_err(sql_err)?;
        Ok(())
    }

    /// Delivery history, newest first.
    pub fn list_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<ListResult<Notification>, ServiceError> {
        let page = ListParams::new(query.limit, query.offset);

        let mut where_clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(ref code) = query.alerte_code {
            params.push(code.as_str().into());
            where_clauses.push(format!("alerte_code = ?{}", params.len()));
        }
        if let Some(channel) = query.channel {
            params.push(channel.as_str().into());
            where_clauses.push(format!("channel = ?{}", params.len()));
        }
        if let Some(envoyee) = query.envoyee {
            params.push(envoyee.into());
            where_clauses.push(format!("envoyee = ?{}", params.len()));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_rows = self
            .db
            .query(
                &format!("SELECT COUNT(*) AS cnt FROM notifications {where_sql}"),
                &params,
            )
            .map_err(sql_err)?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let idx = params.len() + 1;
        let select_sql = format!(
            "SELECT data FROM notifications {where_sql} \
             ORDER BY created_at DESC, rowid DESC LIMIT ?{idx} OFFSET ?{}",
            idx + 1
        );
        params.push(Value::Integer(page.capped_limit() as i64));
        params.push(Value::Integer(page.offset as i64));

        let rows = self.db.query(&select_sql, &params).map_err(sql_err)?;
        let items = rows.iter().map(row_to).collect::<Result<Vec<_>, _>>()?;

        Ok(ListResult { items, total })
    }
}

/// Build a notification record stamped now.
pub(crate) fn new_notification(
    alerte_code: &str,
    event_code: &str,
    channel: crate::model::Channel,
) -> Notification {
    Notification {
        id: new_id(),
        alerte_code: alerte_code.to_string(),
        event_code: event_code.to_string(),
        channel,
        recipient: String::new(),
        subject: None,
        body: String::new(),
        envoyee: false,
        simulated: false,
        error: None,
        created_at: now_rfc3339(),
    }
}

pub(crate) fn to_json<T: serde::Serialize>(v: &T) -> Result<String, ServiceError> {
    serde_json::to_string(v).map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Deserialize a record from a row's `data` JSON column.
pub(crate) fn row_to<T: serde::de::DeserializeOwned>(row: &Row) -> Result<T, ServiceError> {
    let json = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Storage("missing data column".into()))?;
    serde_json::from_str(json).map_err(|e| ServiceError::Storage(format!("bad record json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Channel;
    use marches_sql::SqliteStore;
    use std::collections::BTreeMap;

    fn test_store() -> AlertStore {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        AlertStore::new(db).unwrap()
    }

    fn rule_input(code: &str) -> CreateAlertRule {
        CreateAlertRule {
            code: code.into(),
            label: "Nouveau marché".into(),
            channels: vec![Channel::Email, Channel::Sms],
            recipients: BTreeMap::from([
                (Channel::Email, "achats@example.fr".to_string()),
                (Channel::Sms, "+33600000000".to_string()),
            ]),
            subject: None,
            template: Some("Marché {{marcheId}} créé".into()),
            active: true,
        }
    }

    fn notification(code: &str, channel: Channel, envoyee: bool) -> Notification {
        let mut n = new_notification(code, "MARCHE_CREATED", channel);
        n.recipient = "dest".into();
        n.body = "corps".into();
        n.envoyee = envoyee;
        n
    }

    #[test]
    fn create_and_get_rule() {
        let store = test_store();
        let created = store.create_rule(rule_input("notif-marche")).unwrap();
        assert_eq!(created.created_at, created.updated_at);

        let got = store.get_rule("notif-marche").unwrap();
        assert_eq!(got, created);
        assert_eq!(got.channels, vec![Channel::Email, Channel::Sms]);
    }

    #[test]
    fn duplicate_rule_conflicts() {
        let store = test_store();
        store.create_rule(rule_input("notif-marche")).unwrap();
        let err = store.create_rule(rule_input("notif-marche")).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn concurrent_creators_get_one_rule_and_conflicts() {
        let store = Arc::new(test_store());
        let results: Vec<_> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|i| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        let mut input = rule_input("notif-marche");
                        input.label = format!("créateur {i}");
                        store.create_rule(input)
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ServiceError::Conflict(_))));

        // Losers never overwrite the stored rule.
        assert_eq!(store.get_rule("notif-marche").unwrap().label, winners[0].label);
        assert_eq!(store.list_rules().unwrap().len(), 1);
    }

    #[test]
    fn missing_rule() {
        let store = test_store();
        assert!(store.find_rule("absent").unwrap().is_none());
        assert!(matches!(store.get_rule("absent"), Err(ServiceError::NotFound(_))));
        assert!(matches!(store.delete_rule("absent"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn update_rule_partially() {
        let store = test_store();
        store.create_rule(rule_input("notif-marche")).unwrap();

        let updated = store
            .update_rule(
                "notif-marche",
                UpdateAlertRule {
                    active: Some(false),
                    template: Some(String::new()),
                    channels: Some(vec![Channel::Push, Channel::Push]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!updated.active);
        assert!(updated.template.is_none());
        assert_eq!(updated.channels, vec![Channel::Push]);
        assert_eq!(updated.label, "Nouveau marché");

        let got = store.get_rule("notif-marche").unwrap();
        assert_eq!(got, updated);

        let err = store
            .update_rule(
                "notif-marche",
                UpdateAlertRule {
                    label: Some("  ".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn list_and_delete_rules() {
        let store = test_store();
        store.create_rule(rule_input("b-rule")).unwrap();
        store.create_rule(rule_input("a-rule")).unwrap();

        let codes: Vec<String> = store.list_rules().unwrap().into_iter().map(|r| r.code).collect();
        assert_eq!(codes, vec!["a-rule", "b-rule"]);

        store.delete_rule("a-rule").unwrap();
        assert_eq!(store.list_rules().unwrap().len(), 1);
    }

    #[test]
    fn notifications_filter_and_order() {
        let store = test_store();
        store
            .append_notification(&notification("a", Channel::Email, true))
            .unwrap();
        store
            .append_notification(&notification("a", Channel::Sms, false))
            .unwrap();
        let last = notification("b", Channel::Email, true);
        store.append_notification(&last).unwrap();

        let all = store.list_notifications(&NotificationQuery::default()).unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].id, last.id);

        let failed = store
            .list_notifications(&NotificationQuery {
                envoyee: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(failed.total, 1);
        assert_eq!(failed.items[0].channel, Channel::Sms);

        let page = store
            .list_notifications(&NotificationQuery {
                alerte_code: Some("a".into()),
                channel: Some(Channel::Email),
                limit: Some(10),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].envoyee);

        let second = store
            .list_notifications(&NotificationQuery {
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(second.total, 3);
        assert_eq!(second.items.len(), 1);
    }

    #[test]
    fn closed_database_is_unavailable() {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        let store = AlertStore::new(db.clone()).unwrap();
        db.close().unwrap();
        assert!(matches!(store.find_rule("x"), Err(ServiceError::Unavailable(_))));
    }
}
