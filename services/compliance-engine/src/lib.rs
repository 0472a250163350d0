//! # Prodtrack Compliance Engine
//!
//! Decides, for each product, which document categories it must supply,
//! how far along it is, and which alerts its owners should see.
//!
//! - [`RequirementResolver`]: merges base, department and conditional rules
//! - [`ComplianceEvaluator`]: classifies required categories against uploads
//! - [`CompletenessScorer`]: weighted field validation with graduated deadlines
//! - [`AlertGenerator`]: deduplicated, prioritized alerts and their lifecycle
//! - [`ComplianceService`]: store-backed façade, batch evaluation and sweeps

pub mod alerts;
pub mod completeness;
pub mod compliance;
pub mod requirements;
pub mod service;
pub mod sweep;

pub use alerts::{
    AlertBatch, AlertGenerator, AlertPolicies, DedupPolicy, Escalation, LowCompliancePolicy,
    Transition,
};
pub use completeness::{CompletenessRules, CompletenessScorer, FieldRule};
pub use compliance::{ComplianceEvaluator, EXPIRING_SOON_DAYS};
pub use requirements::{
    default_predicates, is_imported, is_marketing_driven, ProductPredicate, RequirementResolver,
    Requirements,
};
pub use service::{BatchItem, ComplianceService, DepartmentSummary, ProductEvaluation};
pub use sweep::{SweepFailure, SweepSummary};
