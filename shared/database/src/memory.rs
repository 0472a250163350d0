//! In-memory store.
//!
//! Backs tests and local runs. Each map sits behind its own lock; alert
//! dedup and conditional alert updates are checked and written under a
//! single write guard. Saves validate the same way the Postgres
//! repositories do.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use prodtrack_models::{
    Alert, AlertType, CompletenessReport, DepartmentCode, DepartmentScoped, Document, Product,
};
use prodtrack_utils::{validate_model, TrackerError, TrackerResult};

use crate::store::{AlertStore, AlertVersion, CreateOutcome, DocumentStore, ProductStore};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    products: Arc<RwLock<HashMap<Uuid, Product>>>,
    documents: Arc<RwLock<HashMap<Uuid, Document>>>,
    alerts: Arc<RwLock<HashMap<Uuid, Alert>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn alert_count(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn all_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.read().await.values().cloned().collect();
        alerts.sort_by_key(|a| (a.created_at, a.id));
        alerts
    }
}

fn page<T>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn find_product(&self, id: Uuid) -> TrackerResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_products(&self, offset: i64, limit: i64) -> TrackerResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by_key(|p| (p.created_at, p.id));
        Ok(page(products, offset, limit))
    }

    async fn list_products_for_department(
        &self,
        department: &DepartmentCode,
        offset: i64,
        limit: i64,
    ) -> TrackerResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.has_access(department))
            .cloned()
            .collect();
        products.sort_by_key(|p| (p.created_at, p.id));
        Ok(page(products, offset, limit))
    }

    async fn save_product(&self, product: &Product) -> TrackerResult<()> {
        validate_model(product)?;
        self.products.write().await.insert(product.id, product.clone());
        Ok(())
    }

    async fn cache_completeness(
        &self,
        product_id: Uuid,
        report: &CompletenessReport,
    ) -> TrackerResult<()> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or_else(|| TrackerError::not_found(format!("product {}", product_id)))?;
        product.apply_completeness(report);
        Ok(())
    }

    async fn cache_compliance(
        &self,
        product_id: Uuid,
        compliance_percentage: f64,
    ) -> TrackerResult<()> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or_else(|| TrackerError::not_found(format!("product {}", product_id)))?;
        product.compliance_percentage = compliance_percentage;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_document(&self, id: Uuid) -> TrackerResult<Option<Document>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn save_document(&self, document: &Document) -> TrackerResult<()> {
        validate_model(document)?;
        self.documents.write().await.insert(document.id, document.clone());
        Ok(())
    }

    async fn documents_for_product(&self, product_id: Uuid) -> TrackerResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents
            .read()
            .await
            .values()
            .filter(|d| d.product_id == Some(product_id) && d.is_countable())
            .cloned()
            .collect();
        documents.sort_by_key(|d| (d.created_at, d.id));
        Ok(documents)
    }

    async fn documents_with_deadline_before(
        &self,
        until: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> TrackerResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents
            .read()
            .await
            .values()
            .filter(|d| d.is_countable() && d.deadline.map_or(false, |deadline| deadline <= until))
            .cloned()
            .collect();
        documents.sort_by_key(|d| (d.deadline, d.id));
        Ok(page(documents, offset, limit))
    }
}

#[async_trait]
impl AlertStore for InMemoryStore {
    async fn find_alert(&self, id: Uuid) -> TrackerResult<Option<Alert>> {
        Ok(self.alerts.read().await.get(&id).cloned())
    }

    async fn find_blocking_alert(
        &self,
        alert_type: AlertType,
        entity_key: &str,
    ) -> TrackerResult<Option<Alert>> {
        Ok(self
            .alerts
            .read()
            .await
            .values()
            .find(|a| {
                a.alert_type == alert_type && a.entity_key == entity_key && a.blocks_duplicate()
            })
            .cloned())
    }

    async fn insert_if_absent(&self, alert: Alert) -> TrackerResult<CreateOutcome> {
        let mut alerts = self.alerts.write().await;
        let existing = alerts
            .values()
            .find(|a| {
                a.alert_type == alert.alert_type
                    && a.entity_key == alert.entity_key
                    && a.blocks_duplicate()
            })
            .cloned();

        match existing {
            Some(existing) => Ok(CreateOutcome::Existing(existing)),
            None => {
                alerts.insert(alert.id, alert.clone());
                Ok(CreateOutcome::Created(alert))
            }
        }
    }

    async fn update_alert(&self, alert: &Alert, expected: AlertVersion) -> TrackerResult<bool> {
        let mut alerts = self.alerts.write().await;
        let stored = alerts
            .get_mut(&alert.id)
            .ok_or_else(|| TrackerError::not_found(format!("alert {}", alert.id)))?;

        if AlertVersion::of(stored) != expected {
            return Ok(false);
        }
        *stored = alert.clone();
        Ok(true)
    }

    async fn alerts_for_entity(&self, entity_key: &str) -> TrackerResult<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .read()
            .await
            .values()
            .filter(|a| a.entity_key == entity_key)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| (a.created_at, a.id));
        Ok(alerts)
    }
}
