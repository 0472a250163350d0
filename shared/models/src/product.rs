//! Product domain model.
//!
//! A product carries its descriptive fields plus the cached results of
//! the last compliance and completeness evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::department::validate_department_code;
use crate::{CompletenessReport, DepartmentCode, DepartmentScoped, DepartmentSet, MissingField};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Product {
    pub id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Product code is required"))]
    pub code: String,
    #[validate(length(max = 255))]
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub detailed_description: Option<String>,
    pub specifications: Option<String>,
    pub ingredients: Option<String>,
    pub usage: Option<String>,
    pub instructions: Option<String>,
    pub storage: Option<String>,
    pub development_reason: Option<String>,
    pub similar_products: Option<String>,
    pub usp: Option<String>,
    #[validate(custom = "validate_department_code")]
    pub primary_owner_department: DepartmentCode,
    pub secondary_access_departments: DepartmentSet,
    pub status: ProductStatus,
    #[validate(range(min = 0.0, max = 100.0))]
    pub compliance_percentage: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub completeness_score: f64,
    pub missing_fields: Vec<MissingField>,
    pub validation_errors: BTreeMap<String, Vec<String>>,
    pub last_completeness_check: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    InDevelopment,
    Active,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InDevelopment => "in_development",
            Self::Active => "active",
            Self::Discontinued => "discontinued",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "in_development" | "development" => Some(Self::InDevelopment),
            "active" => Some(Self::Active),
            "discontinued" => Some(Self::Discontinued),
            _ => None,
        }
    }
}

/// Descriptive fields graded by the completeness scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductField {
    Name,
    Brand,
    Description,
    DetailedDescription,
    Specifications,
    Ingredients,
    Usage,
    Instructions,
    Storage,
    DevelopmentReason,
    SimilarProducts,
    Usp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    BasicInfo,
    ExtendedInfo,
}

impl ProductField {
    pub const ALL: [ProductField; 12] = [
        Self::Name,
        Self::Brand,
        Self::Description,
        Self::DetailedDescription,
        Self::Specifications,
        Self::Ingredients,
        Self::Usage,
        Self::Instructions,
        Self::Storage,
        Self::DevelopmentReason,
        Self::SimilarProducts,
        Self::Usp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Brand => "brand",
            Self::Description => "description",
            Self::DetailedDescription => "detailed_description",
            Self::Specifications => "specifications",
            Self::Ingredients => "ingredients",
            Self::Usage => "usage",
            Self::Instructions => "instructions",
            Self::Storage => "storage",
            Self::DevelopmentReason => "development_reason",
            Self::SimilarProducts => "similar_products",
            Self::Usp => "usp",
        }
    }

    pub fn group(&self) -> FieldGroup {
        match self {
            Self::DevelopmentReason | Self::SimilarProducts | Self::Usp => FieldGroup::ExtendedInfo,
            _ => FieldGroup::BasicInfo,
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Product {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        primary_owner_department: impl Into<DepartmentCode>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            brand: None,
            description: None,
            detailed_description: None,
            specifications: None,
            ingredients: None,
            usage: None,
            instructions: None,
            storage: None,
            development_reason: None,
            similar_products: None,
            usp: None,
            primary_owner_department: primary_owner_department.into(),
            secondary_access_departments: DepartmentSet::new(),
            status: ProductStatus::Draft,
            compliance_percentage: 0.0,
            completeness_score: 0.0,
            missing_fields: Vec::new(),
            validation_errors: BTreeMap::new(),
            last_completeness_check: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Raw value of a descriptive field; absent values read as "".
    pub fn field_value(&self, field: ProductField) -> &str {
        let value = match field {
            ProductField::Name => return &self.name,
            ProductField::Brand => &self.brand,
            ProductField::Description => &self.description,
            ProductField::DetailedDescription => &self.detailed_description,
            ProductField::Specifications => &self.specifications,
            ProductField::Ingredients => &self.ingredients,
            ProductField::Usage => &self.usage,
            ProductField::Instructions => &self.instructions,
            ProductField::Storage => &self.storage,
            ProductField::DevelopmentReason => &self.development_reason,
            ProductField::SimilarProducts => &self.similar_products,
            ProductField::Usp => &self.usp,
        };
        value.as_deref().unwrap_or("")
    }

    pub fn set_field(&mut self, field: ProductField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ProductField::Name => self.name = value,
            ProductField::Brand => self.brand = Some(value),
            ProductField::Description => self.description = Some(value),
            ProductField::DetailedDescription => self.detailed_description = Some(value),
            ProductField::Specifications => self.specifications = Some(value),
            ProductField::Ingredients => self.ingredients = Some(value),
            ProductField::Usage => self.usage = Some(value),
            ProductField::Instructions => self.instructions = Some(value),
            ProductField::Storage => self.storage = Some(value),
            ProductField::DevelopmentReason => self.development_reason = Some(value),
            ProductField::SimilarProducts => self.similar_products = Some(value),
            ProductField::Usp => self.usp = Some(value),
        }
        self.updated_at = Utc::now();
    }

    /// Caches a completeness report onto the product.
    pub fn apply_completeness(&mut self, report: &CompletenessReport) {
        self.completeness_score = report.completeness_score;
        self.missing_fields = report.missing_fields.clone();
        self.validation_errors = report.validation_errors.clone();
        self.last_completeness_check = Some(report.checked_at);
    }

    pub fn hours_since_creation(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_hours()
    }
}

impl DepartmentScoped for Product {
    fn primary_department(&self) -> &DepartmentCode {
        &self.primary_owner_department
    }

    fn secondary_departments(&self) -> &DepartmentSet {
        &self.secondary_access_departments
    }
}
