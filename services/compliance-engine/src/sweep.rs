//! Periodic sweeps.
//!
//! Both sweeps page through their table in `chunk_size` slices and check
//! for cancellation between chunks. Each item is evaluated independently:
//! a failure is recorded in the summary and the sweep moves on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use prodtrack_models::{Document, Product};
use prodtrack_utils::TrackerResult;

use crate::service::ComplianceService;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepFailure {
    pub id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SweepSummary {
    pub processed: usize,
    pub failed: usize,
    pub alerts_created: usize,
    pub failures: Vec<SweepFailure>,
    /// Stopped early because cancellation was requested.
    pub interrupted: bool,
}

impl SweepSummary {
    fn record(&mut self, id: Uuid, result: TrackerResult<usize>) {
        self.processed += 1;
        match result {
            Ok(created) => self.alerts_created += created,
            Err(e) => {
                tracing::error!(id = %id, code = e.error_code(), error = %e, "Sweep item failed");
                self.failed += 1;
                self.failures.push(SweepFailure { id, error: e.to_string() });
            }
        }
    }
}

impl ComplianceService {
    fn chunk_limit(&self) -> i64 {
        self.sweep.chunk_size.max(1) as i64
    }

    /// Re-evaluates every product and raises alerts under the sweep
    /// low-compliance policy.
    pub async fn compliance_sweep(&self, cancel: &CancellationToken) -> TrackerResult<SweepSummary> {
        let now = Utc::now();
        let limit = self.chunk_limit();
        let mut offset = 0i64;
        let mut summary = SweepSummary::default();

        tracing::info!(chunk_size = limit, "Compliance sweep started");

        loop {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let chunk = self.products.list_products(offset, limit).await?;
            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as i64;

            for product in &chunk {
                let result = self.sweep_product(product, now).await;
                summary.record(product.id, result);
            }
        }

        tracing::info!(
            processed = summary.processed,
            failed = summary.failed,
            alerts_created = summary.alerts_created,
            interrupted = summary.interrupted,
            "Compliance sweep finished"
        );
        Ok(summary)
    }

    async fn sweep_product(&self, product: &Product, now: DateTime<Utc>) -> TrackerResult<usize> {
        let evaluation = self.evaluate_product(product, now).await?;
        let policy = self.alerts.policies().sweep;
        let batch = self
            .raise_product_alerts(product, &evaluation, &policy, now)
            .await?;
        Ok(batch.created_count())
    }

    /// Raises expiry alerts for documents whose deadline falls within the
    /// configured window.
    pub async fn deadline_sweep(&self, cancel: &CancellationToken) -> TrackerResult<SweepSummary> {
        let now = Utc::now();
        let window_days = self.sweep.expiry_window_days;
        let until = now + chrono::Duration::days(window_days);
        let limit = self.chunk_limit();
        let mut offset = 0i64;
        let mut summary = SweepSummary::default();

        tracing::info!(window_days, chunk_size = limit, "Deadline sweep started");

        loop {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let chunk = self
                .documents
                .documents_with_deadline_before(until, offset, limit)
                .await?;
            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as i64;

            for document in &chunk {
                let result = self.sweep_document(document, window_days, now).await;
                summary.record(document.id, result);
            }
        }

        tracing::info!(
            processed = summary.processed,
            failed = summary.failed,
            alerts_created = summary.alerts_created,
            interrupted = summary.interrupted,
            "Deadline sweep finished"
        );
        Ok(summary)
    }

    async fn sweep_document(
        &self,
        document: &Document,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> TrackerResult<usize> {
        match self.alerts.document_expiry_alert(document, window_days, now) {
            Some(alert) => Ok(usize::from(self.alerts.raise(alert, now).await?.is_created())),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prodtrack_database::{DocumentStore, InMemoryStore, ProductStore};
    use prodtrack_models::AlertType;
    use prodtrack_utils::RuleConfig;
    use std::sync::Arc;

    fn service(store: &InMemoryStore) -> ComplianceService {
        ComplianceService::in_memory(Arc::new(RuleConfig::bundled().unwrap()), store.clone())
    }

    #[tokio::test]
    async fn test_compliance_sweep_covers_every_chunk() {
        let store = InMemoryStore::new();
        let mut service = service(&store);
        service.sweep.chunk_size = 2;

        for i in 0..5 {
            let mut product = Product::new(format!("P-{}", i), "Serum", "QA");
            product.created_at = Utc::now() - Duration::days(60);
            store.save_product(&product).await.unwrap();
        }

        let summary = service.compliance_sweep(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.processed, 5);
        assert_eq!(summary.failed, 0);
        assert!(!summary.interrupted);
        let low = store
            .all_alerts()
            .await
            .into_iter()
            .filter(|a| a.alert_type == AlertType::LowCompliance)
            .count();
        assert_eq!(low, 5);

        let again = service.compliance_sweep(&CancellationToken::new()).await.unwrap();
        assert_eq!(again.alerts_created, 0);
    }

    #[tokio::test]
    async fn test_sweep_stops_when_cancelled() {
        let store = InMemoryStore::new();
        let service = service(&store);
        store.save_product(&Product::new("P-1", "Serum", "QA")).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = service.compliance_sweep(&cancel).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.processed, 0);
        assert_eq!(store.alert_count().await, 0);
    }

    #[tokio::test]
    async fn test_deadline_sweep_raises_expiry_alerts() {
        let store = InMemoryStore::new();
        let service = service(&store);
        let now = Utc::now();

        let expired = Document::new("quality_certificates", "iso.pdf", "QA")
            .with_deadline(now - Duration::days(1));
        let expiring = Document::new("supplier_contracts", "contract.pdf", "PUR")
            .with_deadline(now + Duration::days(10));
        let distant = Document::new("test_reports", "report.pdf", "QA")
            .with_deadline(now + Duration::days(90));
        for document in [&expired, &expiring, &distant] {
            store.save_document(document).await.unwrap();
        }

        let summary = service.deadline_sweep(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.alerts_created, 2);
        let types: Vec<AlertType> = store.all_alerts().await.iter().map(|a| a.alert_type).collect();
        assert!(types.contains(&AlertType::DocumentExpired));
        assert!(types.contains(&AlertType::DocumentExpiring));

        let again = service.deadline_sweep(&CancellationToken::new()).await.unwrap();
        assert_eq!(again.alerts_created, 0);
    }
}
