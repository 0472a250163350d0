//! Completeness Scorer
//!
//! Scores a product's descriptive fields against a fixed weighted rule
//! table. The score covers every field; `missing_fields` only lists fields
//! whose check time has passed, so a new product is not flagged for
//! extended information on day one.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use prodtrack_models::{
    round2, CompletenessReport, FieldCompletion, MissingField, Product, ProductField,
};
use prodtrack_utils::run_rules;
use prodtrack_utils::ValidationRule::{self, *};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: ProductField,
    pub required: bool,
    pub check_after_hours: i64,
    pub weight: u32,
    pub validation_rules: Vec<ValidationRule>,
}

impl FieldRule {
    fn new(
        field: ProductField,
        required: bool,
        check_after_hours: i64,
        weight: u32,
        validation_rules: &[ValidationRule],
    ) -> Self {
        Self {
            field,
            required,
            check_after_hours,
            weight,
            validation_rules: validation_rules.to_vec(),
        }
    }
}

/// The weighted field table. Basic information weighs 100 in total,
/// extended information 10.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessRules {
    rules: Vec<FieldRule>,
}

impl CompletenessRules {
    pub fn standard() -> Self {
        use ProductField as F;

        Self {
            rules: vec![
                FieldRule::new(F::Name, true, 0, 15, &[NotEmpty, MinLength(3)]),
                FieldRule::new(F::Brand, true, 0, 15, &[NotEmpty]),
                FieldRule::new(F::Description, true, 0, 15, &[NotEmpty, MinLength(20)]),
                FieldRule::new(F::DetailedDescription, true, 6, 15, &[NotEmpty, MinLength(50)]),
                FieldRule::new(F::Specifications, true, 6, 10, &[NotEmpty, ContainsUnit]),
                FieldRule::new(F::Ingredients, true, 12, 10, &[NotEmpty, MinLength(10)]),
                FieldRule::new(F::Usage, true, 12, 10, &[NotEmpty, MinLength(10)]),
                FieldRule::new(F::Instructions, true, 24, 5, &[NotEmpty, ContainsSteps]),
                FieldRule::new(F::Storage, true, 24, 5, &[NotEmpty, ContainsConditions]),
                FieldRule::new(F::DevelopmentReason, false, 24, 3, &[NotEmpty, MinLength(20)]),
                FieldRule::new(F::SimilarProducts, false, 48, 3, &[NotEmpty, HasComparison]),
                FieldRule::new(F::Usp, false, 72, 4, &[NotEmpty, HasUniquePoints]),
            ],
        }
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn total_weight(&self) -> u32 {
        self.rules.iter().map(|r| r.weight).sum()
    }
}

impl Default for CompletenessRules {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletenessScorer {
    rules: CompletenessRules,
}

impl CompletenessScorer {
    pub fn new(rules: CompletenessRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CompletenessRules {
        &self.rules
    }

    pub fn score(&self, product: &Product, now: DateTime<Utc>) -> CompletenessReport {
        let hours_since_creation = product.hours_since_creation(now);

        let mut fields = BTreeMap::new();
        let mut validation_errors = BTreeMap::new();
        let mut missing_fields = Vec::new();
        let mut earned = 0u32;

        for rule in &self.rules.rules {
            let name = rule.field.as_str();
            let errors = run_rules(name, product.field_value(rule.field), &rule.validation_rules);
            let completed = errors.is_empty();
            let should_check = hours_since_creation >= rule.check_after_hours;

            if completed {
                earned += rule.weight;
            } else {
                validation_errors.insert(name.to_string(), errors.clone());
                if should_check {
                    missing_fields.push(MissingField {
                        field: name.to_string(),
                        check_after_hours: rule.check_after_hours,
                        hours_overdue: hours_since_creation - rule.check_after_hours,
                        errors: errors.clone(),
                    });
                }
            }

            fields.insert(
                name.to_string(),
                FieldCompletion {
                    completed,
                    required: rule.required,
                    weight: rule.weight,
                    check_after_hours: rule.check_after_hours,
                    should_check,
                    errors,
                },
            );
        }

        let total = self.rules.total_weight();
        let completeness_score = if total == 0 {
            100.0
        } else {
            round2(100.0 * f64::from(earned) / f64::from(total))
        };

        tracing::debug!(
            product_id = %product.id,
            completeness_score,
            missing = missing_fields.len(),
            hours_since_creation,
            "Scored product completeness"
        );

        CompletenessReport {
            product_id: product.id,
            completeness_score,
            missing_fields,
            validation_errors,
            fields,
            hours_since_creation,
            checked_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prodtrack_models::FieldGroup;

    fn product_aged(hours: i64, now: DateTime<Utc>) -> Product {
        let mut product = Product::new("P-1", "", "RND");
        product.created_at = now - Duration::hours(hours);
        product
    }

    fn fill_basic_info(product: &mut Product) {
        product.name = "Hydra Serum".to_string();
        product.brand = Some("Lumiere".to_string());
        product.description = Some("A lightweight hydrating face serum".to_string());
        product.detailed_description = Some(
            "Hyaluronic acid serum for daily use that keeps skin hydrated all day long".to_string(),
        );
        product.specifications = Some("Volume: 30 ml, glass dropper bottle".to_string());
        product.ingredients = Some("Aqua, sodium hyaluronate, glycerin".to_string());
        product.usage = Some("Apply on clean skin morning and evening".to_string());
        product.instructions = Some("Step 1: cleanse. Step 2: apply three drops".to_string());
        product.storage = Some("Store in a cool, dry place".to_string());
    }

    #[test]
    fn test_weights() {
        let rules = CompletenessRules::standard();
        let group_weight = |group: FieldGroup| -> u32 {
            rules
                .rules()
                .iter()
                .filter(|r| r.field.group() == group)
                .map(|r| r.weight)
                .sum()
        };

        assert_eq!(group_weight(FieldGroup::BasicInfo), 100);
        assert_eq!(group_weight(FieldGroup::ExtendedInfo), 10);
        assert_eq!(rules.total_weight(), 110);
        assert_eq!(rules.rules().len(), ProductField::ALL.len());
    }

    #[test]
    fn test_new_empty_product_flags_only_immediate_fields() {
        let now = Utc::now();
        let report = CompletenessScorer::default().score(&product_aged(0, now), now);

        assert_eq!(report.completeness_score, 0.0);
        let flagged: Vec<&str> = report.missing_fields.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(flagged, vec!["name", "brand", "description"]);
        assert!(report.missing_fields.iter().all(|m| m.hours_overdue == 0));
        assert_eq!(report.validation_errors.len(), 12);
    }

    #[test]
    fn test_basic_info_complete_after_thirty_hours() {
        let now = Utc::now();
        let mut product = product_aged(30, now);
        fill_basic_info(&mut product);

        let report = CompletenessScorer::default().score(&product, now);

        assert_eq!(report.completeness_score, 90.91);
        let flagged: Vec<&str> = report.missing_fields.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(flagged, vec!["development_reason"]);
        assert_eq!(report.missing_fields[0].hours_overdue, 6);
        assert!(!report.fields["usp"].should_check);
        assert!(report.fields["storage"].completed);
    }

    #[test]
    fn test_whitespace_is_empty() {
        let now = Utc::now();
        let mut product = product_aged(1, now);
        product.brand = Some("   ".to_string());

        let report = CompletenessScorer::default().score(&product, now);
        let brand = &report.fields["brand"];

        assert!(!brand.completed);
        assert_eq!(brand.errors, vec!["brand is required".to_string()]);
    }

    #[test]
    fn test_each_failing_rule_is_reported() {
        let now = Utc::now();
        let mut product = product_aged(48, now);
        product.specifications = Some("   ".to_string());

        let report = CompletenessScorer::default().score(&product, now);
        assert_eq!(report.validation_errors["specifications"].len(), 2);

        product.specifications = Some("Tiny box".to_string());
        let report = CompletenessScorer::default().score(&product, now);
        assert_eq!(report.validation_errors["specifications"].len(), 1);

        product.specifications = Some("Net weight 2 kilograms".to_string());
        let report = CompletenessScorer::default().score(&product, now);
        assert!(!report.validation_errors.contains_key("specifications"));
    }

    #[test]
    fn test_rescoring_is_idempotent() {
        let now = Utc::now();
        let mut product = product_aged(100, now);
        fill_basic_info(&mut product);
        let scorer = CompletenessScorer::default();

        let first = scorer.score(&product, now);
        product.apply_completeness(&first);
        let second = scorer.score(&product, now);

        assert_eq!(first, second);
        assert_eq!(product.completeness_score, first.completeness_score);
        assert_eq!(product.last_completeness_check, Some(now));
    }
}
