//! Persistence seams consumed by the compliance engine.
//!
//! Both the Postgres repositories and the in-memory store implement these
//! traits. Alert insertion is the one write that must be atomic: a store
//! never holds two alerts of the same type for the same entity while the
//! earlier one still blocks under its dedup scope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use prodtrack_models::{
    Alert, AlertPriority, AlertStatus, AlertType, CompletenessReport, DepartmentCode, Document,
    Product,
};
use prodtrack_utils::TrackerResult;

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_product(&self, id: Uuid) -> TrackerResult<Option<Product>>;

    /// Products ordered by creation time, then id.
    async fn list_products(&self, offset: i64, limit: i64) -> TrackerResult<Vec<Product>>;

    /// Products the department owns or has secondary access to.
    async fn list_products_for_department(
        &self,
        department: &DepartmentCode,
        offset: i64,
        limit: i64,
    ) -> TrackerResult<Vec<Product>>;

    async fn save_product(&self, product: &Product) -> TrackerResult<()>;

    async fn cache_completeness(
        &self,
        product_id: Uuid,
        report: &CompletenessReport,
    ) -> TrackerResult<()>;

    async fn cache_compliance(
        &self,
        product_id: Uuid,
        compliance_percentage: f64,
    ) -> TrackerResult<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_document(&self, id: Uuid) -> TrackerResult<Option<Document>>;

    async fn save_document(&self, document: &Document) -> TrackerResult<()>;

    /// Countable (active or draft, not soft-deleted) documents of a product.
    async fn documents_for_product(&self, product_id: Uuid) -> TrackerResult<Vec<Document>>;

    /// Countable documents whose deadline is at or before `until`,
    /// ordered by deadline, then id.
    async fn documents_with_deadline_before(
        &self,
        until: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> TrackerResult<Vec<Document>>;
}

/// Result of an idempotent alert insert.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Alert),
    /// A blocking alert already existed; nothing was written.
    Existing(Alert),
}

impl CreateOutcome {
    pub fn alert(&self) -> &Alert {
        match self {
            Self::Created(alert) | Self::Existing(alert) => alert,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Status and priority an alert had when it was read. Updates only apply
/// while the stored row still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertVersion {
    pub status: AlertStatus,
    pub priority: AlertPriority,
}

impl AlertVersion {
    pub fn of(alert: &Alert) -> Self {
        Self {
            status: alert.status,
            priority: alert.priority,
        }
    }
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn find_alert(&self, id: Uuid) -> TrackerResult<Option<Alert>>;

    /// The alert of this type and entity that currently blocks duplicates.
    async fn find_blocking_alert(
        &self,
        alert_type: AlertType,
        entity_key: &str,
    ) -> TrackerResult<Option<Alert>>;

    /// Inserts the alert unless a blocking alert exists, atomically.
    async fn insert_if_absent(&self, alert: Alert) -> TrackerResult<CreateOutcome>;

    /// Writes the alert if the stored row still matches `expected`.
    /// Returns `false` when another writer changed it first.
    async fn update_alert(&self, alert: &Alert, expected: AlertVersion) -> TrackerResult<bool>;

    async fn alerts_for_entity(&self, entity_key: &str) -> TrackerResult<Vec<Alert>>;
}
