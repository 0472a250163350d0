//! Compliance Service
//!
//! Entry point for callers: loads products and documents from the stores,
//! runs the resolver, evaluator and scorer, caches results onto the product
//! and hands reports to the alert generator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use prodtrack_database::{AlertStore, DocumentStore, InMemoryStore, ProductStore};
use prodtrack_models::{
    round2, AccessLevel, CategoryCompliance, CompletenessReport, ComplianceReport, DepartmentCode,
    DepartmentScoped, OverallStatus, Product,
};
use prodtrack_utils::{RuleConfig, SweepConfig, TrackerError, TrackerResult};

use crate::alerts::{
    AlertBatch, AlertGenerator, AlertPolicies, Escalation, LowCompliancePolicy, Transition,
};
use crate::completeness::CompletenessScorer;
use crate::compliance::ComplianceEvaluator;
use crate::requirements::{RequirementResolver, Requirements};

/// Both reports for one product, computed at the same instant.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductEvaluation {
    pub compliance: ComplianceReport,
    pub completeness: CompletenessReport,
}

/// One slot of a batch evaluation. Exactly one of `evaluation` and
/// `error` is set.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchItem {
    pub product_id: Uuid,
    pub evaluation: Option<ProductEvaluation>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DepartmentSummary {
    pub department: DepartmentCode,
    pub total_products: usize,
    pub owned: usize,
    pub shared: usize,
    pub by_status: BTreeMap<OverallStatus, usize>,
    pub average_compliance: f64,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ComplianceService {
    pub(crate) products: Arc<dyn ProductStore>,
    pub(crate) documents: Arc<dyn DocumentStore>,
    pub(crate) alerts: AlertGenerator,
    pub(crate) sweep: SweepConfig,
    resolver: RequirementResolver,
    evaluator: ComplianceEvaluator,
    scorer: CompletenessScorer,
}

impl ComplianceService {
    pub fn new(
        rules: Arc<RuleConfig>,
        products: Arc<dyn ProductStore>,
        documents: Arc<dyn DocumentStore>,
        alert_store: Arc<dyn AlertStore>,
        policies: AlertPolicies,
        sweep: SweepConfig,
    ) -> Self {
        Self {
            products,
            documents,
            alerts: AlertGenerator::new(alert_store, rules.clone(), policies),
            sweep,
            resolver: RequirementResolver::new(rules),
            evaluator: ComplianceEvaluator::new(),
            scorer: CompletenessScorer::default(),
        }
    }

    /// Service over a single in-memory store with default policies.
    pub fn in_memory(rules: Arc<RuleConfig>, store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self::new(
            rules,
            store.clone(),
            store.clone(),
            store,
            AlertPolicies::default(),
            SweepConfig::default(),
        )
    }

    pub fn alert_generator(&self) -> &AlertGenerator {
        &self.alerts
    }

    async fn load_product(&self, product_id: Uuid) -> TrackerResult<Product> {
        self.products
            .find_product(product_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(format!("product {}", product_id)))
    }

    pub async fn resolve_requirements(&self, product_id: Uuid) -> TrackerResult<Requirements> {
        let product = self.load_product(product_id).await?;
        Ok(self.resolver.resolve(&product))
    }

    async fn compliance_for(
        &self,
        product: &Product,
        now: DateTime<Utc>,
    ) -> TrackerResult<ComplianceReport> {
        let requirements = self.resolver.resolve(product);
        let documents = self.documents.documents_for_product(product.id).await?;
        Ok(self.evaluator.evaluate(product, &requirements, &documents, now))
    }

    pub async fn evaluate_compliance(&self, product_id: Uuid) -> TrackerResult<ComplianceReport> {
        let product = self.load_product(product_id).await?;
        let report = self.compliance_for(&product, Utc::now()).await?;
        self.products
            .cache_compliance(product.id, report.compliance_percentage)
            .await?;
        Ok(report)
    }

    /// Scores the product and caches the result onto it.
    pub async fn evaluate_completeness(
        &self,
        product_id: Uuid,
    ) -> TrackerResult<CompletenessReport> {
        let product = self.load_product(product_id).await?;
        let report = self.scorer.score(&product, Utc::now());
        self.products.cache_completeness(product.id, &report).await?;
        Ok(report)
    }

    /// Runs both evaluations for a loaded product and caches them.
    pub(crate) async fn evaluate_product(
        &self,
        product: &Product,
        now: DateTime<Utc>,
    ) -> TrackerResult<ProductEvaluation> {
        let compliance = self.compliance_for(product, now).await?;
        let completeness = self.scorer.score(product, now);

        self.products
            .cache_compliance(product.id, compliance.compliance_percentage)
            .await?;
        self.products.cache_completeness(product.id, &completeness).await?;

        Ok(ProductEvaluation { compliance, completeness })
    }

    /// Evaluates each product independently; a failure is recorded in
    /// that product's slot and the batch carries on.
    pub async fn batch_evaluate(&self, product_ids: &[Uuid]) -> Vec<BatchItem> {
        let now = Utc::now();
        let mut items = Vec::with_capacity(product_ids.len());

        for &product_id in product_ids {
            let result = match self.load_product(product_id).await {
                Ok(product) => self.evaluate_product(&product, now).await,
                Err(e) => Err(e),
            };

            items.push(match result {
                Ok(evaluation) => BatchItem {
                    product_id,
                    evaluation: Some(evaluation),
                    error: None,
                },
                Err(e) => {
                    tracing::error!(
                        product_id = %product_id,
                        code = e.error_code(),
                        error = %e,
                        "Batch evaluation failed"
                    );
                    BatchItem { product_id, evaluation: None, error: Some(e.to_string()) }
                }
            });
        }

        items
    }

    /// Required categories that still have no countable upload.
    pub async fn list_missing_documents(
        &self,
        product_id: Uuid,
    ) -> TrackerResult<Vec<CategoryCompliance>> {
        let product = self.load_product(product_id).await?;
        let report = self.compliance_for(&product, Utc::now()).await?;
        Ok(report.outstanding().into_iter().cloned().collect())
    }

    pub(crate) async fn raise_product_alerts(
        &self,
        product: &Product,
        evaluation: &ProductEvaluation,
        policy: &LowCompliancePolicy,
        now: DateTime<Utc>,
    ) -> TrackerResult<AlertBatch> {
        let mut candidates = self.alerts.completeness_alerts(product, &evaluation.completeness);
        candidates.extend(self.alerts.missing_document_alerts(product, &evaluation.compliance));
        candidates.extend(
            self.alerts.low_compliance_alert(product, &evaluation.compliance, policy),
        );

        self.alerts.raise_all(candidates, now).await
    }

    /// Re-evaluates a product and raises its alerts under the
    /// single-product low-compliance policy.
    pub async fn generate_alerts(&self, product_id: Uuid) -> TrackerResult<AlertBatch> {
        let product = self.load_product(product_id).await?;
        let now = Utc::now();
        let evaluation = self.evaluate_product(&product, now).await?;
        let policy = self.alerts.policies().on_update;
        self.raise_product_alerts(&product, &evaluation, &policy, now).await
    }

    /// Saves an edited product, then re-evaluates it and raises alerts.
    pub async fn on_product_updated(
        &self,
        product: &Product,
    ) -> TrackerResult<(ProductEvaluation, AlertBatch)> {
        self.products.save_product(product).await?;

        let now = Utc::now();
        let evaluation = self.evaluate_product(product, now).await?;
        let policy = self.alerts.policies().on_update;
        let alerts = self.raise_product_alerts(product, &evaluation, &policy, now).await?;

        tracing::info!(
            product_id = %product.id,
            compliance_percentage = evaluation.compliance.compliance_percentage,
            completeness_score = evaluation.completeness.completeness_score,
            alerts_created = alerts.created_count(),
            "Product re-evaluated after update"
        );
        Ok((evaluation, alerts))
    }

    pub async fn escalate_alert(&self, alert_id: Uuid) -> TrackerResult<Escalation> {
        self.alerts.escalate(alert_id).await
    }

    pub async fn mark_alert_in_progress(&self, alert_id: Uuid) -> TrackerResult<Transition> {
        self.alerts.mark_in_progress(alert_id).await
    }

    pub async fn resolve_alert(
        &self,
        alert_id: Uuid,
        notes: Option<String>,
        user_id: Option<Uuid>,
    ) -> TrackerResult<Transition> {
        self.alerts.resolve(alert_id, notes, user_id).await
    }

    pub async fn close_alert(&self, alert_id: Uuid) -> TrackerResult<Transition> {
        self.alerts.close(alert_id).await
    }

    /// Compliance overview of every product the department can see.
    pub async fn department_summary(
        &self,
        department: &DepartmentCode,
    ) -> TrackerResult<DepartmentSummary> {
        let now = Utc::now();
        let limit = self.sweep.chunk_size.max(1) as i64;
        let mut offset = 0i64;

        let mut summary = DepartmentSummary {
            department: department.clone(),
            total_products: 0,
            owned: 0,
            shared: 0,
            by_status: BTreeMap::new(),
            average_compliance: 0.0,
            failed: 0,
        };
        let mut compliance_total = 0.0;

        loop {
            let page = self
                .products
                .list_products_for_department(department, offset, limit)
                .await?;
            if page.is_empty() {
                break;
            }
            offset += page.len() as i64;

            for product in &page {
                summary.total_products += 1;
                match product.access_level(department) {
                    AccessLevel::FullControl => summary.owned += 1,
                    AccessLevel::ReadEdit => summary.shared += 1,
                    AccessLevel::None => {}
                }

                match self.compliance_for(product, now).await {
                    Ok(report) => {
                        compliance_total += report.compliance_percentage;
                        *summary.by_status.entry(report.overall_status).or_default() += 1;
                    }
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(
                            product_id = %product.id,
                            code = e.error_code(),
                            error = %e,
                            "Could not evaluate product"
                        );
                    }
                }
            }
        }

        let evaluated = summary.total_products - summary.failed;
        if evaluated > 0 {
            summary.average_compliance = round2(compliance_total / evaluated as f64);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prodtrack_models::{AlertType, CategoryStatus, Document};

    fn service(store: &InMemoryStore) -> ComplianceService {
        ComplianceService::in_memory(Arc::new(RuleConfig::bundled().unwrap()), store.clone())
    }

    async fn stored_product(
        store: &InMemoryStore,
        code: &str,
        department: &str,
        age_days: i64,
    ) -> Product {
        let mut product = Product::new(code, "Hydra Serum", department);
        product.created_at = Utc::now() - Duration::days(age_days);
        store.save_product(&product).await.unwrap();
        product
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let store = InMemoryStore::new();
        let err = service(&store).evaluate_compliance(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_evaluations_are_cached_on_the_product() {
        let store = InMemoryStore::new();
        let service = service(&store);
        let product = stored_product(&store, "P-1", "RND", 2).await;
        let upload = Document::new("test_reports", "report.pdf", "QA").for_product(product.id);
        store.save_document(&upload).await.unwrap();

        let compliance = service.evaluate_compliance(product.id).await.unwrap();
        let completeness = service.evaluate_completeness(product.id).await.unwrap();

        let cached = store.find_product(product.id).await.unwrap().unwrap();
        assert_eq!(compliance.compliance_percentage, 25.0);
        assert_eq!(cached.compliance_percentage, 25.0);
        assert_eq!(cached.completeness_score, completeness.completeness_score);
        assert_eq!(cached.last_completeness_check, Some(completeness.checked_at));
    }

    #[tokio::test]
    async fn test_batch_records_failures_per_item() {
        let store = InMemoryStore::new();
        let service = service(&store);
        let product = stored_product(&store, "P-2", "QA", 1).await;
        let missing = Uuid::new_v4();

        let items = service.batch_evaluate(&[product.id, missing]).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].evaluation.is_some());
        assert!(items[0].error.is_none());
        assert_eq!(items[1].product_id, missing);
        assert!(items[1].error.as_deref().unwrap().starts_with("Not found"));
    }

    #[tokio::test]
    async fn test_list_missing_documents() {
        let store = InMemoryStore::new();
        let service = service(&store);
        let product = stored_product(&store, "P-3", "RND", 10).await;
        store
            .save_document(
                &Document::new("ingredient_list", "inci.pdf", "RND").for_product(product.id),
            )
            .await
            .unwrap();

        let missing = service.list_missing_documents(product.id).await.unwrap();
        let keys: Vec<&str> = missing.iter().map(|c| c.category.as_str()).collect();

        assert_eq!(keys, vec!["product_specifications", "safety_data_sheet", "test_reports"]);
        assert_eq!(missing[0].status, CategoryStatus::ExpiringSoon);
    }

    #[tokio::test]
    async fn test_generate_alerts_is_idempotent() {
        let store = InMemoryStore::new();
        let service = service(&store);
        let product = stored_product(&store, "P-4", "PRD", 10).await;

        let first = service.generate_alerts(product.id).await.unwrap();
        let second = service.generate_alerts(product.id).await.unwrap();

        assert!(first.created.iter().any(|a| a.alert_type == AlertType::LowCompliance));
        assert!(first
            .created
            .iter()
            .any(|a| a.alert_type == AlertType::MissingDocument
                && a.entity_key.ends_with("category:batch_documents")));
        assert!(second.created.is_empty());
        assert_eq!(second.existing.len(), first.created.len());
        assert_eq!(store.alert_count().await, first.created.len());
    }

    #[tokio::test]
    async fn test_on_product_updated_saves_and_scores() {
        let store = InMemoryStore::new();
        let service = service(&store);
        let mut product = stored_product(&store, "P-5", "RND", 0).await;
        product.brand = Some("Lumiere".to_string());

        let (evaluation, _) = service.on_product_updated(&product).await.unwrap();
        let stored = store.find_product(product.id).await.unwrap().unwrap();

        assert_eq!(stored.brand.as_deref(), Some("Lumiere"));
        assert!(evaluation.completeness.fields["brand"].completed);
        assert_eq!(stored.completeness_score, evaluation.completeness.completeness_score);
    }

    #[tokio::test]
    async fn test_department_summary() {
        let store = InMemoryStore::new();
        let service = service(&store);
        stored_product(&store, "P-6", "RND", 1).await;
        let mut shared = Product::new("P-7", "Balm", "PUR");
        shared.secondary_access_departments.insert("RND");
        store.save_product(&shared).await.unwrap();
        stored_product(&store, "P-8", "LEG", 1).await;

        let summary = service.department_summary(&DepartmentCode::new("rnd")).await.unwrap();

        assert_eq!(summary.total_products, 2);
        assert_eq!(summary.owned, 1);
        assert_eq!(summary.shared, 1);
        assert_eq!(summary.by_status.values().sum::<usize>(), 2);
        assert_eq!(summary.failed, 0);
    }
}
