//! # Prodtrack Core Domain Models
//!
//! Domain models for the multi-department product/document lifecycle tracker.
//!
//! ## Key Models
//!
//! - **Department**: static reference data keyed by department code
//! - **Product**: descriptive fields plus cached compliance/completeness results
//! - **Document**: an uploaded, versioned document in a category
//! - **DocumentCategoryRule**: immutable configuration for a document category
//! - **Alert**: a deduplicated, prioritized, escalatable notification
//!
//! ## Ownership
//!
//! Every scoped entity has one primary owner department and a set of
//! secondary access departments; see [`DepartmentScoped`].

pub mod access;
pub mod alert;
pub mod department;
pub mod document;
pub mod product;
pub mod report;

#[cfg(test)]
pub mod property_tests;

pub use access::{AccessLevel, DepartmentScoped};
pub use alert::{
    Alert, AlertPriority, AlertStatus, AlertSubject, AlertType, DedupScope, EscalationOutcome,
    NewAlert, TransitionOutcome,
};
pub use department::{codes, Department, DepartmentCode, DepartmentSet};
pub use document::{Document, DocumentCategoryRule, DocumentStatus};
pub use product::{FieldGroup, Product, ProductField, ProductStatus};
pub use report::{
    round2, CategoryCompliance, CategoryStatus, ComplianceReport, CompletenessReport,
    FieldCompletion, MissingField, OverallStatus, ResolvedRequirement,
};
