//! Compliance Evaluator
//!
//! Classifies every required category of a product against its countable
//! uploads. Precedence per category: completed, then overdue, then
//! expiring soon, then missing. Categories that are not required are left
//! out of the report and never affect the percentage.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use prodtrack_models::{
    round2, CategoryCompliance, CategoryStatus, ComplianceReport, Document, OverallStatus, Product,
};

use crate::requirements::Requirements;

/// A deadline within this many days is "expiring soon".
pub const EXPIRING_SOON_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceEvaluator;

impl ComplianceEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        product: &Product,
        requirements: &Requirements,
        documents: &[Document],
        now: DateTime<Utc>,
    ) -> ComplianceReport {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for document in documents.iter().filter(|d| d.is_countable()) {
            *counts.entry(document.category_key.as_str()).or_default() += 1;
        }

        let categories: BTreeMap<String, CategoryCompliance> = requirements
            .values()
            .filter(|r| r.is_required)
            .map(|requirement| {
                let document_count = counts.get(requirement.category.as_str()).copied().unwrap_or(0);
                let status = classify(document_count, requirement.computed_deadline, now);
                let compliance = CategoryCompliance {
                    category: requirement.category.clone(),
                    name: requirement.name.clone(),
                    primary_owner: requirement.primary_owner.clone(),
                    status,
                    document_count,
                    computed_deadline: requirement.computed_deadline,
                    days_until_deadline: requirement
                        .computed_deadline
                        .map(|deadline| days_until(deadline, now)),
                    is_overdue: status == CategoryStatus::Overdue,
                };
                (requirement.category.clone(), compliance)
            })
            .collect();

        let total_required = categories.len();
        let completed_count = categories
            .values()
            .filter(|c| c.status == CategoryStatus::Completed)
            .count();

        let compliance_percentage = if total_required == 0 {
            100.0
        } else {
            round2(completed_count as f64 / total_required as f64 * 100.0)
        };

        let overall_status = overall_status(&categories);

        tracing::debug!(
            product_id = %product.id,
            total_required,
            completed_count,
            compliance_percentage,
            overall_status = overall_status.as_str(),
            "Evaluated product compliance"
        );

        ComplianceReport {
            product_id: product.id,
            compliance_percentage,
            overall_status,
            total_required,
            completed_count,
            categories,
            evaluated_at: now,
        }
    }
}

pub fn classify(
    document_count: usize,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CategoryStatus {
    if document_count > 0 {
        return CategoryStatus::Completed;
    }
    match deadline {
        Some(deadline) if deadline < now => CategoryStatus::Overdue,
        Some(deadline) if deadline <= now + Duration::days(EXPIRING_SOON_DAYS) => {
            CategoryStatus::ExpiringSoon
        }
        _ => CategoryStatus::Missing,
    }
}

/// Whole days until the deadline, rounded down: a deadline two hours ago
/// is -1, one in thirty hours is 1.
pub fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (deadline - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

fn overall_status(categories: &BTreeMap<String, CategoryCompliance>) -> OverallStatus {
    let has = |status: CategoryStatus| categories.values().any(|c| c.status == status);

    if has(CategoryStatus::Overdue) {
        OverallStatus::Critical
    } else if has(CategoryStatus::ExpiringSoon) {
        OverallStatus::Warning
    } else if has(CategoryStatus::Missing) {
        OverallStatus::Incomplete
    } else {
        OverallStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::RequirementResolver;
    use prodtrack_models::DocumentStatus;
    use prodtrack_utils::RuleConfig;
    use std::sync::Arc;

    fn resolve(product: &Product) -> Requirements {
        RequirementResolver::new(Arc::new(RuleConfig::bundled().unwrap())).resolve(product)
    }

    fn upload(product: &Product, category: &str) -> Document {
        Document::new(category, format!("{}.pdf", category), "QA").for_product(product.id)
    }

    #[test]
    fn test_classification_precedence() {
        let now = Utc::now();
        let past = now - Duration::days(1);
        let soon = now + Duration::days(3);
        let later = now + Duration::days(30);

        assert_eq!(classify(1, Some(past), now), CategoryStatus::Completed);
        assert_eq!(classify(0, Some(past), now), CategoryStatus::Overdue);
        assert_eq!(classify(0, Some(soon), now), CategoryStatus::ExpiringSoon);
        assert_eq!(classify(0, Some(later), now), CategoryStatus::Missing);
        assert_eq!(classify(0, None, now), CategoryStatus::Missing);
        assert_eq!(
            classify(0, Some(now + Duration::days(EXPIRING_SOON_DAYS)), now),
            CategoryStatus::ExpiringSoon
        );
    }

    #[test]
    fn test_days_until_rounds_down() {
        let now = Utc::now();
        assert_eq!(days_until(now - Duration::hours(2), now), -1);
        assert_eq!(days_until(now + Duration::hours(30), now), 1);
        assert_eq!(days_until(now - Duration::days(3), now), -3);
    }

    #[test]
    fn test_no_documents_after_deadlines() {
        let now = Utc::now();
        let mut product = Product::new("P-1", "Serum", "QA");
        product.created_at = now - Duration::days(50);

        let report = ComplianceEvaluator::new().evaluate(&product, &resolve(&product), &[], now);

        assert_eq!(report.compliance_percentage, 0.0);
        assert_eq!(report.overall_status, OverallStatus::Critical);
        assert!(report.categories.values().all(|c| c.is_overdue));
        assert_eq!(report.completed_count, 0);
    }

    #[test]
    fn test_all_required_uploaded() {
        let now = Utc::now();
        let product = Product::new("P-2", "Serum", "QA");
        let requirements = resolve(&product);
        let documents: Vec<Document> = requirements
            .values()
            .filter(|r| r.is_required)
            .map(|r| upload(&product, &r.category))
            .collect();

        let report = ComplianceEvaluator::new().evaluate(&product, &requirements, &documents, now);

        assert_eq!(report.compliance_percentage, 100.0);
        assert_eq!(report.overall_status, OverallStatus::Complete);
        assert_eq!(report.completed_count, report.total_required);
    }

    #[test]
    fn test_archived_and_deleted_documents_do_not_count() {
        let now = Utc::now();
        let product = Product::new("P-3", "Serum", "QA");
        let requirements = resolve(&product);

        let mut archived = upload(&product, "test_reports");
        archived.status = DocumentStatus::Archived;
        let mut deleted = upload(&product, "safety_data_sheet");
        deleted.soft_delete();
        let active = upload(&product, "ingredient_list");

        let report = ComplianceEvaluator::new().evaluate(
            &product,
            &requirements,
            &[archived, deleted, active],
            now,
        );

        assert_eq!(report.completed_count, 1);
        assert_eq!(report.categories["test_reports"].document_count, 0);
        assert_eq!(report.categories["ingredient_list"].status, CategoryStatus::Completed);
    }

    #[test]
    fn test_optional_categories_are_excluded() {
        let now = Utc::now();
        let product = Product::new("P-4", "Cream", "RND");
        let requirements = resolve(&product);
        assert!(requirements.contains_key("stability_study"));

        let report = ComplianceEvaluator::new().evaluate(&product, &requirements, &[], now);
        assert!(!report.categories.contains_key("stability_study"));
        assert_eq!(report.total_required, 4);
    }

    #[test]
    fn test_no_required_categories_is_fully_compliant() {
        let now = Utc::now();
        let product = Product::new("P-5", "Cream", "RND");
        let report = ComplianceEvaluator::new().evaluate(&product, &Requirements::new(), &[], now);

        assert_eq!(report.compliance_percentage, 100.0);
        assert_eq!(report.overall_status, OverallStatus::Complete);
    }

    #[test]
    fn test_expiring_soon_makes_warning() {
        let now = Utc::now();
        let mut product = Product::new("P-6", "Cream", "QA");
        // ingredient_list (7 days) expires in 2 days; everything else uploaded
        product.created_at = now - Duration::days(5);
        let requirements = resolve(&product);
        let documents: Vec<Document> = requirements
            .values()
            .filter(|r| r.is_required && r.category != "ingredient_list")
            .map(|r| upload(&product, &r.category))
            .collect();

        let report = ComplianceEvaluator::new().evaluate(&product, &requirements, &documents, now);
        let ingredients = &report.categories["ingredient_list"];

        assert_eq!(ingredients.status, CategoryStatus::ExpiringSoon);
        assert_eq!(ingredients.days_until_deadline, Some(2));
        assert_eq!(report.overall_status, OverallStatus::Warning);
    }
}
