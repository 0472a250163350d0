//! Derived evaluation results.
//!
//! The JSON field names here (`compliance_percentage`, `completeness_score`,
//! `missing_fields`, `overall_status`) are what callers consume, so they
//! must not be renamed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{DepartmentCode, DepartmentSet};

/// A document category a product must (or may) supply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedRequirement {
    pub category: String,
    pub name: String,
    pub primary_owner: DepartmentCode,
    pub secondary_access: DepartmentSet,
    pub is_required: bool,
    pub deadline_days: Option<i64>,
    pub computed_deadline: Option<DateTime<Utc>>,
    /// Merge steps that contributed this requirement, in order.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Missing,
    Completed,
    Overdue,
    ExpiringSoon,
}

impl CategoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::ExpiringSoon => "expiring_soon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Complete,
    Incomplete,
    Warning,
    Critical,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryCompliance {
    pub category: String,
    pub name: String,
    pub primary_owner: DepartmentCode,
    pub status: CategoryStatus,
    pub document_count: usize,
    pub computed_deadline: Option<DateTime<Utc>>,
    pub days_until_deadline: Option<i64>,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceReport {
    pub product_id: Uuid,
    pub compliance_percentage: f64,
    pub overall_status: OverallStatus,
    pub total_required: usize,
    pub completed_count: usize,
    pub categories: BTreeMap<String, CategoryCompliance>,
    pub evaluated_at: DateTime<Utc>,
}

impl ComplianceReport {
    /// Required categories without a countable upload.
    pub fn outstanding(&self) -> Vec<&CategoryCompliance> {
        self.categories
            .values()
            .filter(|c| c.status != CategoryStatus::Completed)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldCompletion {
    pub completed: bool,
    pub required: bool,
    pub weight: u32,
    pub check_after_hours: i64,
    pub should_check: bool,
    pub errors: Vec<String>,
}

/// A field that is due for checking and still fails validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissingField {
    pub field: String,
    pub check_after_hours: i64,
    pub hours_overdue: i64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletenessReport {
    pub product_id: Uuid,
    pub completeness_score: f64,
    pub missing_fields: Vec<MissingField>,
    pub validation_errors: BTreeMap<String, Vec<String>>,
    pub fields: BTreeMap<String, FieldCompletion>,
    pub hours_since_creation: i64,
    pub checked_at: DateTime<Utc>,
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
