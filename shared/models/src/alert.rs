//! Alert records and their lifecycle.
//!
//! Status transitions:
//! `open -> in_progress -> resolved -> closed`, `open -> resolved`.
//! Escalation bumps priority on any non-terminal alert and is capped at
//! `critical`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{DepartmentCode, DepartmentScoped, DepartmentSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Due fields more than 12 hours past their check time.
    IncompleteFieldsCritical,
    /// Due fields up to 12 hours past their check time.
    IncompleteFields,
    LowCompliance,
    MissingDocument,
    DeadlineApproaching,
    DocumentExpiring,
    DocumentExpired,
    Manual,
}

impl AlertType {
    pub const ALL: [AlertType; 8] = [
        Self::IncompleteFieldsCritical,
        Self::IncompleteFields,
        Self::LowCompliance,
        Self::MissingDocument,
        Self::DeadlineApproaching,
        Self::DocumentExpiring,
        Self::DocumentExpired,
        Self::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncompleteFieldsCritical => "incomplete_fields_critical",
            Self::IncompleteFields => "incomplete_fields",
            Self::LowCompliance => "low_compliance",
            Self::MissingDocument => "missing_document",
            Self::DeadlineApproaching => "deadline_approaching",
            Self::DocumentExpiring => "document_expiring",
            Self::DocumentExpired => "document_expired",
            Self::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertPriority {
    /// Next priority up, `None` at critical.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Low => Some(Self::Medium),
            Self::Medium => Some(Self::High),
            Self::High => Some(Self::Critical),
            Self::Critical => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl AlertStatus {
    pub fn can_transition_to(&self, target: AlertStatus) -> bool {
        use AlertStatus::*;

        match (self, target) {
            (Open, InProgress) => true,
            (Open, Resolved) => true,
            (InProgress, Resolved) => true,
            (Resolved, Closed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which existing alerts block creation of another alert of the same
/// type for the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// Any open or in-progress alert blocks.
    Unresolved,
    /// Only an open alert blocks; an in-progress alert can be re-triggered.
    OpenOnly,
}

impl DedupScope {
    pub fn blocks(&self, status: AlertStatus) -> bool {
        match self {
            Self::Unresolved => !status.is_terminal(),
            Self::OpenOnly => status == AlertStatus::Open,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::OpenOnly => "open_only",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unresolved" => Some(Self::Unresolved),
            "open_only" => Some(Self::OpenOnly),
            _ => None,
        }
    }
}

/// The entity an alert is about. Its key is the dedup identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertSubject {
    Product { product_id: Uuid },
    ProductCategory { product_id: Uuid, category: String },
    Document { document_id: Uuid, product_id: Option<Uuid> },
    Batch { batch_id: Uuid },
}

impl AlertSubject {
    pub fn entity_key(&self) -> String {
        match self {
            Self::Product { product_id } => format!("product:{}", product_id),
            Self::ProductCategory { product_id, category } => {
                format!("product:{}:category:{}", product_id, category)
            }
            Self::Document { document_id, .. } => format!("document:{}", document_id),
            Self::Batch { batch_id } => format!("batch:{}", batch_id),
        }
    }

    pub fn product_id(&self) -> Option<Uuid> {
        match self {
            Self::Product { product_id } | Self::ProductCategory { product_id, .. } => {
                Some(*product_id)
            }
            Self::Document { product_id, .. } => *product_id,
            Self::Batch { .. } => None,
        }
    }

    pub fn document_id(&self) -> Option<Uuid> {
        match self {
            Self::Document { document_id, .. } => Some(*document_id),
            _ => None,
        }
    }

    pub fn batch_id(&self) -> Option<Uuid> {
        match self {
            Self::Batch { batch_id } => Some(*batch_id),
            _ => None,
        }
    }
}

/// Alert contents before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub subject: AlertSubject,
    pub primary_responsible_department: DepartmentCode,
    pub secondary_involved_departments: DepartmentSet,
    pub due_date: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub primary_responsible_department: DepartmentCode,
    pub secondary_involved_departments: DepartmentSet,
    pub product_id: Option<Uuid>,
    pub document_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub entity_key: String,
    pub dedup_scope: DedupScope,
    pub status: AlertStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EscalationOutcome {
    Escalated { from: AlertPriority, to: AlertPriority },
    AlreadyAtHighest,
    /// Terminal alerts cannot be escalated.
    Rejected { status: AlertStatus },
}

impl EscalationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Escalated { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    Applied { from: AlertStatus, to: AlertStatus },
    Rejected { from: AlertStatus, to: AlertStatus },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

impl Alert {
    pub fn from_new(new: NewAlert, dedup_scope: DedupScope, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type: new.alert_type,
            priority: new.priority,
            title: new.title,
            message: new.message,
            primary_responsible_department: new.primary_responsible_department,
            secondary_involved_departments: new.secondary_involved_departments,
            product_id: new.subject.product_id(),
            document_id: new.subject.document_id(),
            batch_id: new.subject.batch_id(),
            entity_key: new.subject.entity_key(),
            dedup_scope,
            status: AlertStatus::Open,
            due_date: new.due_date,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this alert blocks a new one of the same type and entity.
    pub fn blocks_duplicate(&self) -> bool {
        self.dedup_scope.blocks(self.status)
    }

    pub fn escalate(&mut self, now: DateTime<Utc>) -> EscalationOutcome {
        if self.status.is_terminal() {
            return EscalationOutcome::Rejected { status: self.status };
        }
        match self.priority.next() {
            Some(next) => {
                let from = self.priority;
                self.priority = next;
                self.updated_at = now;
                EscalationOutcome::Escalated { from, to: next }
            }
            None => EscalationOutcome::AlreadyAtHighest,
        }
    }

    pub fn mark_in_progress(&mut self, now: DateTime<Utc>) -> TransitionOutcome {
        self.transition(AlertStatus::InProgress, now)
    }

    pub fn resolve(
        &mut self,
        notes: Option<String>,
        resolver: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> TransitionOutcome {
        let outcome = self.transition(AlertStatus::Resolved, now);
        if outcome.is_applied() {
            self.resolved_at = Some(now);
            self.resolved_by = resolver;
            self.resolution_notes = notes;
        }
        outcome
    }

    pub fn close(&mut self, now: DateTime<Utc>) -> TransitionOutcome {
        self.transition(AlertStatus::Closed, now)
    }

    fn transition(&mut self, target: AlertStatus, now: DateTime<Utc>) -> TransitionOutcome {
        let from = self.status;
        if !from.can_transition_to(target) {
            return TransitionOutcome::Rejected { from, to: target };
        }
        self.status = target;
        self.updated_at = now;
        TransitionOutcome::Applied { from, to: target }
    }
}

impl DepartmentScoped for Alert {
    fn primary_department(&self) -> &DepartmentCode {
        &self.primary_responsible_department
    }

    fn secondary_departments(&self) -> &DepartmentSet {
        &self.secondary_involved_departments
    }
}
