//! Requirement Resolver
//!
//! Computes which document categories a product must supply by merging,
//! in order: the universal base rules, the rules for the product's primary
//! owner department, and the rule sets of every conditional predicate the
//! product satisfies. Merging only adds categories or upgrades them to
//! required; nothing is removed or downgraded.

use std::collections::BTreeMap;
use std::sync::Arc;

use prodtrack_models::{codes, Product, ResolvedRequirement};
use prodtrack_utils::RuleConfig;

/// Resolved requirements keyed by category key.
pub type Requirements = BTreeMap<String, ResolvedRequirement>;

/// A named heuristic over a product. The name selects the conditional
/// rule set in `requirement_rules`.
#[derive(Clone, Copy)]
pub struct ProductPredicate {
    pub name: &'static str,
    pub test: fn(&Product) -> bool,
}

impl std::fmt::Debug for ProductPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductPredicate").field("name", &self.name).finish()
    }
}

/// Purchased from abroad: owned by purchasing, or described as imported.
pub fn is_imported(product: &Product) -> bool {
    product.primary_owner_department == *codes::PURCHASING
        || product
            .description
            .as_deref()
            .map_or(false, |d| d.to_lowercase().contains("import"))
}

/// Marketing or e-commerce has a stake in the product.
pub fn is_marketing_driven(product: &Product) -> bool {
    product.secondary_access_departments.contains_code(codes::MARKETING)
        || product.secondary_access_departments.contains_code(codes::ECOMMERCE)
}

pub fn default_predicates() -> Vec<ProductPredicate> {
    vec![
        ProductPredicate { name: "imported_products", test: is_imported },
        ProductPredicate { name: "marketing_products", test: is_marketing_driven },
    ]
}

#[derive(Debug, Clone)]
pub struct RequirementResolver {
    rules: Arc<RuleConfig>,
    predicates: Vec<ProductPredicate>,
}

impl RequirementResolver {
    pub fn new(rules: Arc<RuleConfig>) -> Self {
        Self::with_predicates(rules, default_predicates())
    }

    pub fn with_predicates(rules: Arc<RuleConfig>, predicates: Vec<ProductPredicate>) -> Self {
        Self { rules, predicates }
    }

    /// Names of the predicates that hold for the product.
    pub fn matching_predicates(&self, product: &Product) -> Vec<&'static str> {
        self.predicates
            .iter()
            .filter(|p| (p.test)(product))
            .map(|p| p.name)
            .collect()
    }

    pub fn resolve(&self, product: &Product) -> Requirements {
        let rules = &self.rules.requirement_rules;
        let mut resolved = Requirements::new();

        self.merge(
            &mut resolved,
            product,
            "all_products",
            &rules.all_products.required_categories,
            false,
        );

        if let Some(list) = rules.by_primary_department.get(&product.primary_owner_department) {
            let source = format!("department:{}", product.primary_owner_department);
            self.merge(&mut resolved, product, &source, &list.required_categories, false);
        }

        for name in self.matching_predicates(product) {
            match rules.conditional.get(name) {
                Some(rule) => self.merge(&mut resolved, product, name, &rule.additional_required, true),
                None => tracing::debug!(predicate = name, "No conditional rule set configured"),
            }
        }

        resolved
    }

    /// Adds `categories` to `resolved`. Conditional sets force the
    /// category to required; other sets use the category's own flag.
    fn merge(
        &self,
        resolved: &mut Requirements,
        product: &Product,
        source: &str,
        categories: &[String],
        force_required: bool,
    ) {
        for key in categories {
            let Some(category) = self.rules.category(key) else {
                tracing::warn!(
                    category = %key,
                    source,
                    product_id = %product.id,
                    "Skipping unknown document category"
                );
                continue;
            };

            let is_required = force_required || category.is_required;
            resolved
                .entry(key.clone())
                .and_modify(|existing| {
                    existing.is_required |= is_required;
                    existing.sources.push(source.to_string());
                })
                .or_insert_with(|| ResolvedRequirement {
                    category: key.clone(),
                    name: category.name.clone(),
                    primary_owner: category.primary_owner.clone(),
                    secondary_access: category.secondary_access.clone(),
                    is_required,
                    deadline_days: category.deadline_days,
                    computed_deadline: category.deadline_from(product.created_at),
                    sources: vec![source.to_string()],
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn resolver() -> RequirementResolver {
        RequirementResolver::new(Arc::new(RuleConfig::bundled().unwrap()))
    }

    #[test]
    fn test_base_rules_apply_to_every_product() {
        let product = Product::new("P-1", "Serum", "QA");
        let resolved = resolver().resolve(&product);

        for key in ["product_specifications", "ingredient_list", "safety_data_sheet", "test_reports"] {
            assert!(resolved[key].is_required, "{} should be required", key);
        }
        assert!(resolved.contains_key("quality_certificates"));
        assert!(!resolved.contains_key("legal_documents"));
    }

    #[test]
    fn test_department_rules_keep_category_flag() {
        let product = Product::new("P-2", "Cream", "RND");
        let resolved = resolver().resolve(&product);

        let stability = &resolved["stability_study"];
        assert!(!stability.is_required);
        assert_eq!(stability.sources, vec!["department:RND".to_string()]);
    }

    #[test]
    fn test_imported_products_force_legal_documents() {
        let product = Product::new("P-3", "Imported balm", "PUR");
        let resolved = resolver().resolve(&product);

        let legal = &resolved["legal_documents"];
        assert!(legal.is_required);
        assert_eq!(legal.sources, vec!["imported_products".to_string()]);
        assert!(resolved["import_documents"].is_required);
        // supplier_contracts comes from the PUR department rule only
        assert!(!resolved["supplier_contracts"].is_required);
    }

    #[test]
    fn test_import_keyword_in_description() {
        let mut product = Product::new("P-4", "Tea", "RND");
        product.description = Some("Directly IMPORTED from Japan".to_string());
        assert!(is_imported(&product));

        product.description = Some("Local produce".to_string());
        assert!(!is_imported(&product));
    }

    #[test]
    fn test_marketing_driven_products() {
        let mut product = Product::new("P-5", "Soap", "RND");
        assert!(!is_marketing_driven(&product));

        product.secondary_access_departments.insert("ECOM");
        assert!(is_marketing_driven(&product));

        let resolved = resolver().resolve(&product);
        assert!(resolved["labeling_artwork"].is_required);
        assert!(resolved["product_images"].is_required);
    }

    #[test]
    fn test_conditional_rules_upgrade_existing_requirement() {
        // MKT department lists labeling_artwork as optional; marketing rule upgrades it
        let mut product = Product::new("P-6", "Lip balm", "MKT");
        let without = resolver().resolve(&product);
        assert!(!without["labeling_artwork"].is_required);

        product.secondary_access_departments.insert("ECOM");
        let with = resolver().resolve(&product);
        let artwork = &with["labeling_artwork"];
        assert!(artwork.is_required);
        assert_eq!(
            artwork.sources,
            vec!["department:MKT".to_string(), "marketing_products".to_string()]
        );
    }

    #[test]
    fn test_computed_deadline_from_creation() {
        let mut product = Product::new("P-7", "Gel", "PRD");
        product.created_at = product.created_at - Duration::days(10);
        let resolved = resolver().resolve(&product);

        let batch = &resolved["batch_documents"];
        assert_eq!(batch.deadline_days, Some(7));
        assert_eq!(batch.computed_deadline, Some(product.created_at + Duration::days(7)));
    }

    #[test]
    fn test_unknown_categories_are_skipped() {
        let yaml = r#"
categories:
  test_reports:
    name: Test reports
    primary_owner: QA
    is_required: true
requirement_rules:
  all_products:
    required_categories: [test_reports, retired_category]
"#;
        let rules = Arc::new(RuleConfig::from_yaml_str(yaml).unwrap());
        let product = Product::new("P-8", "Mask", "QA");
        let resolved = RequirementResolver::new(rules).resolve(&product);

        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains_key("test_reports"));
    }

    #[test]
    fn test_custom_predicates_compose() {
        fn always(_: &Product) -> bool {
            true
        }
        let yaml = r#"
categories:
  export_license:
    name: Export license
    primary_owner: LEG
requirement_rules:
  exported_products:
    additional_required: [export_license]
"#;
        let rules = Arc::new(RuleConfig::from_yaml_str(yaml).unwrap());
        let resolver = RequirementResolver::with_predicates(
            rules,
            vec![ProductPredicate { name: "exported_products", test: always }],
        );
        let resolved = resolver.resolve(&Product::new("P-9", "Oil", "RND"));
        assert!(resolved["export_license"].is_required);
    }
}
