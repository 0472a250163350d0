//! Static document category rule matrix.
//!
//! Loaded once at process start and shared read-only (`Arc<RuleConfig>`)
//! by the requirement resolver and the alert generator.

use prodtrack_models::{AlertPriority, Department, DepartmentCode, DocumentCategoryRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{TrackerError, TrackerResult};
use crate::validation::validate_model;

const BUNDLED_RULES: &str = include_str!("../../../config/document_rules.yaml");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConfig {
    pub categories: BTreeMap<String, DocumentCategoryRule>,
    pub requirement_rules: RequirementRules,
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub priority_levels: BTreeMap<AlertPriority, PriorityLevel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequirementRules {
    #[serde(default)]
    pub all_products: CategoryList,
    #[serde(default)]
    pub by_primary_department: BTreeMap<DepartmentCode, CategoryList>,
    /// Conditional rule sets keyed by predicate name
    /// (`imported_products`, `marketing_products`, ...).
    #[serde(flatten)]
    pub conditional: BTreeMap<String, ConditionalRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryList {
    #[serde(default)]
    pub required_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConditionalRule {
    #[serde(default)]
    pub additional_required: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriorityLevel {
    #[serde(default)]
    pub categories: Vec<String>,
}

impl RuleConfig {
    pub fn from_yaml_str(yaml: &str) -> TrackerResult<Self> {
        let mut config: RuleConfig = serde_yaml::from_str(yaml)?;
        for (key, category) in config.categories.iter_mut() {
            category.key = key.clone();
        }
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::configuration(format!("Cannot read rule file {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&yaml)?;
        tracing::info!(
            path = %path.display(),
            categories = config.categories.len(),
            "Loaded document rule matrix"
        );
        Ok(config)
    }

    /// The rule matrix shipped with the crate.
    pub fn bundled() -> TrackerResult<Self> {
        Self::from_yaml_str(BUNDLED_RULES)
    }

    pub fn category(&self, key: &str) -> Option<&DocumentCategoryRule> {
        self.categories.get(key)
    }

    pub fn department(&self, code: &DepartmentCode) -> Option<&Department> {
        self.departments.iter().find(|d| &d.code == code)
    }

    /// Highest priority level listing the category.
    pub fn category_priority(&self, key: &str) -> Option<AlertPriority> {
        self.priority_levels
            .iter()
            .rev()
            .find(|(_, level)| level.categories.iter().any(|c| c == key))
            .map(|(priority, _)| *priority)
    }

    /// Lists inconsistencies in the matrix. None of them are fatal:
    /// resolution skips unknown categories at evaluation time.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for department in &self.departments {
            if let Err(e) = validate_model(department) {
                warnings.push(format!("department {}: {}", department.code, e));
            }
        }

        if !self.departments.is_empty() {
            for (key, category) in &self.categories {
                if self.department(&category.primary_owner).is_none() {
                    warnings.push(format!(
                        "category {} owned by unknown department {}",
                        key, category.primary_owner
                    ));
                }
            }
        }

        let rules = &self.requirement_rules;
        let mut referenced: Vec<(String, &String)> = rules
            .all_products
            .required_categories
            .iter()
            .map(|c| ("all_products".to_string(), c))
            .collect();
        for (dept, list) in &rules.by_primary_department {
            referenced.extend(
                list.required_categories
                    .iter()
                    .map(|c| (format!("by_primary_department.{}", dept), c)),
            );
        }
        for (name, rule) in &rules.conditional {
            referenced.extend(rule.additional_required.iter().map(|c| (name.clone(), c)));
        }
        for (name, level) in &self.priority_levels {
            referenced.extend(
                level.categories
                    .iter()
                    .map(|c| (format!("priority_levels.{}", name), c)),
            );
        }

        for (source, key) in referenced {
            if !self.categories.contains_key(key) {
                warnings.push(format!("{} references unknown category {}", source, key));
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_rules_load() {
        let rules = RuleConfig::bundled().unwrap();
        assert!(rules.validate().is_empty(), "{:?}", rules.validate());

        let sds = rules.category("safety_data_sheet").unwrap();
        assert_eq!(sds.key, "safety_data_sheet");
        assert_eq!(sds.primary_owner, DepartmentCode::new("QA"));
        assert!(sds.is_required);

        assert!(rules.requirement_rules.conditional.contains_key("imported_products"));
        assert!(rules.requirement_rules.conditional.contains_key("marketing_products"));
        assert!(rules
            .requirement_rules
            .by_primary_department
            .contains_key(&DepartmentCode::new("PUR")));
    }

    #[test]
    fn test_category_priority() {
        let rules = RuleConfig::bundled().unwrap();
        assert_eq!(rules.category_priority("legal_documents"), Some(AlertPriority::Critical));
        assert_eq!(rules.category_priority("product_images"), Some(AlertPriority::Low));
        assert_eq!(rules.category_priority("unknown"), None);
    }

    #[test]
    fn test_validate_reports_unknown_references() {
        let yaml = r#"
categories:
  test_reports:
    name: Test reports
    primary_owner: QA
    is_required: true
requirement_rules:
  all_products:
    required_categories: [test_reports, retired_category]
  imported_products:
    additional_required: [customs_forms]
departments:
  - code: RND
    name: Research
"#;
        let rules = RuleConfig::from_yaml_str(yaml).unwrap();
        let warnings = rules.validate();
        assert_eq!(warnings.len(), 3, "{:?}", warnings);
        assert!(warnings.iter().any(|w| w.contains("retired_category")));
        assert!(warnings.iter().any(|w| w.contains("customs_forms")));
        assert!(warnings.iter().any(|w| w.contains("unknown department QA")));
    }

    #[test]
    fn test_malformed_yaml_is_configuration_error() {
        let err = RuleConfig::from_yaml_str("categories: [").unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }
}
