//! Alert Repository
//!
//! Dedup is enforced by the partial unique indexes created in
//! `migrations`; an insert that hits one is reported as the existing alert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use prodtrack_models::{
    Alert, AlertPriority, AlertStatus, AlertType, DedupScope, DepartmentCode, DepartmentSet,
};
use prodtrack_utils::{TrackerError, TrackerResult};

use crate::store::{AlertStore, AlertVersion, CreateOutcome};

const ALERT_COLUMNS: &str = r#"
    id, alert_type, priority, title, message, primary_responsible_department,
    secondary_involved_departments, product_id, document_id, batch_id, entity_key,
    dedup_scope, status, due_date, resolved_at, resolved_by, resolution_notes,
    metadata, created_at, updated_at
"#;

/// A conflicting alert can be resolved between our insert and the
/// follow-up read; retry the pair this many times.
const INSERT_ATTEMPTS: usize = 3;

pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn try_insert(&self, alert: &Alert) -> TrackerResult<Option<Alert>> {
        let row: Option<AlertRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO alerts
                (id, alert_type, priority, title, message, primary_responsible_department,
                 secondary_involved_departments, product_id, document_id, batch_id, entity_key,
                 dedup_scope, status, due_date, resolved_at, resolved_by, resolution_notes,
                 metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            ALERT_COLUMNS
        ))
        .bind(alert.id)
        .bind(alert.alert_type.as_str())
        .bind(alert.priority.as_str())
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(alert.primary_responsible_department.as_str())
        .bind(alert.secondary_involved_departments.encode())
        .bind(alert.product_id)
        .bind(alert.document_id)
        .bind(alert.batch_id)
        .bind(&alert.entity_key)
        .bind(alert.dedup_scope.as_str())
        .bind(alert.status.as_str())
        .bind(alert.due_date)
        .bind(alert.resolved_at)
        .bind(alert.resolved_by)
        .bind(&alert.resolution_notes)
        .bind(&alert.metadata)
        .bind(alert.created_at)
        .bind(alert.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Alert::try_from).transpose()
    }
}

#[async_trait]
impl AlertStore for AlertRepository {
    async fn find_alert(&self, id: Uuid) -> TrackerResult<Option<Alert>> {
        let row: Option<AlertRow> =
            sqlx::query_as(&format!("SELECT {} FROM alerts WHERE id = $1", ALERT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Alert::try_from).transpose()
    }

    async fn find_blocking_alert(
        &self,
        alert_type: AlertType,
        entity_key: &str,
    ) -> TrackerResult<Option<Alert>> {
        let row: Option<AlertRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM alerts
            WHERE alert_type = $1 AND entity_key = $2
              AND ((dedup_scope = 'unresolved' AND status IN ('open', 'in_progress'))
                OR (dedup_scope = 'open_only' AND status = 'open'))
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            ALERT_COLUMNS
        ))
        .bind(alert_type.as_str())
        .bind(entity_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Alert::try_from).transpose()
    }

    async fn insert_if_absent(&self, alert: Alert) -> TrackerResult<CreateOutcome> {
        for _ in 0..INSERT_ATTEMPTS {
            if let Some(created) = self.try_insert(&alert).await? {
                return Ok(CreateOutcome::Created(created));
            }
            let existing = self.find_blocking_alert(alert.alert_type, &alert.entity_key).await?;
            if let Some(existing) = existing {
                return Ok(CreateOutcome::Existing(existing));
            }
        }

        Err(TrackerError::conflict(format!(
            "Could not insert {} alert for {}",
            alert.alert_type, alert.entity_key
        )))
    }

    async fn update_alert(&self, alert: &Alert, expected: AlertVersion) -> TrackerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE alerts SET
                priority = $2,
                status = $3,
                resolved_at = $4,
                resolved_by = $5,
                resolution_notes = $6,
                metadata = $7,
                updated_at = $8
            WHERE id = $1 AND status = $9 AND priority = $10
            "#,
        )
        .bind(alert.id)
        .bind(alert.priority.as_str())
        .bind(alert.status.as_str())
        .bind(alert.resolved_at)
        .bind(alert.resolved_by)
        .bind(&alert.resolution_notes)
        .bind(&alert.metadata)
        .bind(alert.updated_at)
        .bind(expected.status.as_str())
        .bind(expected.priority.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM alerts WHERE id = $1")
            .bind(alert.id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Ok(false),
            None => Err(TrackerError::not_found(format!("alert {}", alert.id))),
        }
    }

    async fn alerts_for_entity(&self, entity_key: &str) -> TrackerResult<Vec<Alert>> {
        let rows: Vec<AlertRow> = sqlx::query_as(&format!(
            "SELECT {} FROM alerts WHERE entity_key = $1 ORDER BY created_at, id",
            ALERT_COLUMNS
        ))
        .bind(entity_key)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Alert::try_from).collect()
    }
}

/// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    alert_type: String,
    priority: String,
    title: String,
    message: String,
    primary_responsible_department: String,
    secondary_involved_departments: serde_json::Value,
    product_id: Option<Uuid>,
    document_id: Option<Uuid>,
    batch_id: Option<Uuid>,
    entity_key: String,
    dedup_scope: String,
    status: String,
    due_date: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<Uuid>,
    resolution_notes: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn unknown(column: &str, value: &str) -> TrackerError {
    TrackerError::database(format!("Unknown alert {} '{}'", column, value))
}

impl TryFrom<AlertRow> for Alert {
    type Error = TrackerError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            alert_type: AlertType::from_str(&row.alert_type)
                .ok_or_else(|| unknown("type", &row.alert_type))?,
            priority: AlertPriority::from_str(&row.priority)
                .ok_or_else(|| unknown("priority", &row.priority))?,
            title: row.title,
            message: row.message,
            primary_responsible_department: DepartmentCode::new(row.primary_responsible_department),
            secondary_involved_departments: DepartmentSet::decode(
                &row.secondary_involved_departments,
            )?,
            product_id: row.product_id,
            document_id: row.document_id,
            batch_id: row.batch_id,
            entity_key: row.entity_key,
            dedup_scope: DedupScope::from_str(&row.dedup_scope)
                .ok_or_else(|| unknown("dedup scope", &row.dedup_scope))?,
            status: AlertStatus::from_str(&row.status)
                .ok_or_else(|| unknown("status", &row.status))?,
            due_date: row.due_date,
            resolved_at: row.resolved_at,
            resolved_by: row.resolved_by,
            resolution_notes: row.resolution_notes,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
