use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::department::validate_department_code;
use crate::{DepartmentCode, DepartmentScoped, DepartmentSet};

/// An uploaded document attached to a product or a production batch.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Document {
    pub id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub category_key: String,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    pub product_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    #[validate(custom = "validate_department_code")]
    pub primary_owner_department: DepartmentCode,
    pub secondary_access_departments: DepartmentSet,
    pub deadline: Option<DateTime<Utc>>,
    pub status: DocumentStatus,
    #[validate(range(min = 1))]
    pub version: i32,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Active,
    Archived,
    Expired,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// Immutable configuration for one document category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentCategoryRule {
    /// Filled from the configuration map key at load time.
    #[serde(default)]
    pub key: String,
    pub name: String,
    pub primary_owner: DepartmentCode,
    #[serde(default)]
    pub secondary_access: DepartmentSet,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub deadline_days: Option<i64>,
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

fn default_max_size_mb() -> u64 {
    10
}

impl DocumentCategoryRule {
    /// Deadline relative to the subject's creation time.
    pub fn deadline_from(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.deadline_days.map(|days| created_at + Duration::days(days))
    }
}

impl DepartmentScoped for DocumentCategoryRule {
    fn primary_department(&self) -> &DepartmentCode {
        &self.primary_owner
    }

    fn secondary_departments(&self) -> &DepartmentSet {
        &self.secondary_access
    }
}

impl Document {
    pub fn new(
        category_key: impl Into<String>,
        file_name: impl Into<String>,
        primary_owner_department: impl Into<DepartmentCode>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            category_key: category_key.into(),
            file_name: file_name.into(),
            product_id: None,
            batch_id: None,
            primary_owner_department: primary_owner_department.into(),
            secondary_access_departments: DepartmentSet::new(),
            deadline: None,
            status: DocumentStatus::Active,
            version: 1,
            uploaded_by: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn for_product(mut self, product_id: Uuid) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether this document counts as an upload for its category.
    pub fn is_countable(&self) -> bool {
        self.deleted_at.is_none()
            && matches!(self.status, DocumentStatus::Active | DocumentStatus::Draft)
    }

    /// Builds the replacement produced by a re-upload. The previous
    /// version should be archived by the caller.
    pub fn new_version(&self, file_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            version: self.version + 1,
            status: DocumentStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..self.clone()
        }
    }

    pub fn archive(&mut self) {
        self.status = DocumentStatus::Archived;
        self.updated_at = Utc::now();
    }

    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn days_until_deadline(&self, now: DateTime<Utc>) -> Option<i64> {
        self.deadline.map(|d| (d - now).num_days())
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map_or(false, |d| d < now)
    }
}

impl DepartmentScoped for Document {
    fn primary_department(&self) -> &DepartmentCode {
        &self.primary_owner_department
    }

    fn secondary_departments(&self) -> &DepartmentSet {
        &self.secondary_access_departments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countable_documents() {
        let mut doc = Document::new("safety_data_sheet", "sds.pdf", "QA");
        assert!(doc.is_countable());

        doc.status = DocumentStatus::Draft;
        assert!(doc.is_countable());

        doc.archive();
        assert!(!doc.is_countable());

        let mut deleted = Document::new("safety_data_sheet", "sds.pdf", "QA");
        deleted.soft_delete();
        assert!(!deleted.is_countable());
    }

    #[test]
    fn test_new_version_increments() {
        let product_id = Uuid::new_v4();
        let doc = Document::new("test_reports", "report-v1.pdf", "QA").for_product(product_id);
        let next = doc.new_version("report-v2.pdf");

        assert_eq!(next.version, 2);
        assert_ne!(next.id, doc.id);
        assert_eq!(next.product_id, Some(product_id));
        assert_eq!(next.category_key, "test_reports");
    }

    #[test]
    fn test_category_deadline_and_file_types() {
        let rule = DocumentCategoryRule {
            key: "batch_documents".to_string(),
            name: "Batch documents".to_string(),
            primary_owner: DepartmentCode::new("PRD"),
            secondary_access: DepartmentSet::new(),
            is_required: true,
            deadline_days: Some(7),
            file_types: vec!["pdf".to_string(), "xlsx".to_string()],
            max_size_mb: 10,
        };

        let created = Utc::now();
        assert_eq!(rule.deadline_from(created), Some(created + Duration::days(7)));
    }
}
