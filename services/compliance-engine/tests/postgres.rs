//! Postgres-backed tests.
//!
//! Run with a scratch database:
//! `PRODTRACK_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use prodtrack_compliance_engine::{AlertPolicies, ComplianceService};
use prodtrack_database::{
    initialize_database, AlertRepository, AlertStore, DepartmentRepository, DocumentRepository,
    DocumentStore, PostgresPool, ProductRepository, ProductStore,
};
use prodtrack_models::{AlertSubject, AlertType, CategoryStatus, Document, Product};
use prodtrack_utils::{DatabaseConfig, RuleConfig, SweepConfig};

async fn pool() -> PostgresPool {
    let url = std::env::var("PRODTRACK_TEST_DATABASE_URL")
        .expect("PRODTRACK_TEST_DATABASE_URL must point at a scratch database");
    let config = DatabaseConfig {
        postgres_url: url,
        ..DatabaseConfig::default()
    };
    initialize_database(&config).await.expect("database initializes")
}

fn service(pool: &PostgresPool) -> ComplianceService {
    ComplianceService::new(
        Arc::new(RuleConfig::bundled().unwrap()),
        Arc::new(ProductRepository::new(pool.clone())),
        Arc::new(DocumentRepository::new(pool.clone())),
        Arc::new(AlertRepository::new(pool.clone())),
        AlertPolicies::default(),
        SweepConfig::default(),
    )
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL
async fn test_departments_sync() {
    let pool = pool().await;
    let rules = RuleConfig::bundled().unwrap();
    let repo = DepartmentRepository::new(pool);

    let synced = repo.sync(&rules.departments).await.unwrap();
    assert_eq!(synced, rules.departments.len());

    let listed = repo.list().await.unwrap();
    assert!(listed.iter().any(|d| d.code.as_str() == "QA"));
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL
async fn test_concurrent_alert_generation_is_deduplicated() {
    let pool = pool().await;
    let service = Arc::new(service(&pool));
    let product = Product::new(format!("PG-{}", uuid::Uuid::new_v4()), "Body Lotion", "QA");
    ProductRepository::new(pool.clone()).save_product(&product).await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let id = product.id;
            tokio::spawn(async move { service.generate_alerts(id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let entity = AlertSubject::Product { product_id: product.id }.entity_key();
    let alerts = AlertRepository::new(pool).alerts_for_entity(&entity).await.unwrap();
    let low = alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::LowCompliance)
        .count();
    assert_eq!(low, 1);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL
async fn test_upload_completes_category_and_caches() {
    let pool = pool().await;
    let service = service(&pool);
    let products = ProductRepository::new(pool.clone());
    let documents = DocumentRepository::new(pool.clone());

    let mut product = Product::new(format!("PG-{}", uuid::Uuid::new_v4()), "Night Cream", "PRD");
    product.created_at = Utc::now() - Duration::days(10);
    products.save_product(&product).await.unwrap();

    let before = service.evaluate_compliance(product.id).await.unwrap();
    assert_eq!(before.categories["batch_documents"].status, CategoryStatus::Overdue);

    let mut upload = Document::new("batch_documents", "batch.pdf", "PRD").for_product(product.id);
    documents.save_document(&upload).await.unwrap();
    let after = service.evaluate_compliance(product.id).await.unwrap();
    assert_eq!(after.categories["batch_documents"].status, CategoryStatus::Completed);

    let cached = products.find_product(product.id).await.unwrap().unwrap();
    assert_eq!(cached.compliance_percentage, after.compliance_percentage);

    upload.soft_delete();
    documents.save_document(&upload).await.unwrap();
    let deleted = service.evaluate_compliance(product.id).await.unwrap();
    assert_eq!(deleted.categories["batch_documents"].document_count, 0);

    let summary = service.compliance_sweep(&CancellationToken::new()).await.unwrap();
    assert_eq!(summary.failed, 0);
}
