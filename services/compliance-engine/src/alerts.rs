//! Alert Generator
//!
//! Turns evaluator and scorer output into prioritized alerts, and applies
//! lifecycle actions (escalate, mark in progress, resolve, close) to stored
//! alerts. Alert builders are pure; persistence goes through
//! [`AlertStore::insert_if_absent`], which makes duplicate creation a no-op.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use prodtrack_database::{AlertStore, AlertVersion, CreateOutcome};
use prodtrack_models::{
    Alert, AlertPriority, AlertSubject, AlertType, CategoryStatus, ComplianceReport,
    CompletenessReport, DedupScope, DepartmentSet, Document, EscalationOutcome, MissingField,
    NewAlert, Product, TransitionOutcome,
};
use prodtrack_utils::{AlertConfig, RuleConfig, TrackerError, TrackerResult};

use crate::compliance::{days_until, EXPIRING_SOON_DAYS};

/// Fields more than this many hours past their check time raise a
/// critical alert instead of a high one.
pub const CRITICAL_OVERDUE_HOURS: i64 = 12;

/// Compliance below this is a high-priority low-compliance alert.
const LOW_COMPLIANCE_HIGH_PRIORITY_BELOW: f64 = 50.0;

/// Lifecycle actions re-read and re-apply when a concurrent writer changed
/// the alert in between, up to this many times.
const UPDATE_ATTEMPTS: usize = 3;

/// A named low-compliance threshold. Sweeps and single-product updates
/// use different ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowCompliancePolicy {
    pub name: &'static str,
    pub threshold: f64,
}

impl LowCompliancePolicy {
    pub const SWEEP: Self = Self { name: "sweep", threshold: 70.0 };
    pub const ON_UPDATE: Self = Self { name: "on_update", threshold: 80.0 };

    pub fn triggers(&self, compliance_percentage: f64) -> bool {
        compliance_percentage < self.threshold
    }
}

/// Per-type dedup scopes.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupPolicy {
    scopes: BTreeMap<AlertType, DedupScope>,
}

impl DedupPolicy {
    pub fn scope_for(&self, alert_type: AlertType) -> DedupScope {
        self.scopes
            .get(&alert_type)
            .copied()
            .unwrap_or(DedupScope::Unresolved)
    }

    pub fn with_override(mut self, alert_type: AlertType, scope: DedupScope) -> Self {
        self.scopes.insert(alert_type, scope);
        self
    }
}

impl Default for DedupPolicy {
    /// Deadline and expiry alerts may be re-raised while someone is
    /// working on them; everything else waits for resolution.
    fn default() -> Self {
        let scopes = [
            (AlertType::DeadlineApproaching, DedupScope::OpenOnly),
            (AlertType::DocumentExpiring, DedupScope::OpenOnly),
            (AlertType::DocumentExpired, DedupScope::OpenOnly),
        ]
        .into_iter()
        .collect();
        Self { scopes }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertPolicies {
    pub dedup: DedupPolicy,
    pub sweep: LowCompliancePolicy,
    pub on_update: LowCompliancePolicy,
}

impl AlertPolicies {
    pub fn from_config(config: &AlertConfig) -> Self {
        let dedup = config
            .dedup_scopes
            .iter()
            .fold(DedupPolicy::default(), |policy, (alert_type, scope)| {
                policy.with_override(*alert_type, *scope)
            });

        Self {
            dedup,
            sweep: LowCompliancePolicy {
                threshold: config.sweep_low_compliance_threshold,
                ..LowCompliancePolicy::SWEEP
            },
            on_update: LowCompliancePolicy {
                threshold: config.update_low_compliance_threshold,
                ..LowCompliancePolicy::ON_UPDATE
            },
        }
    }
}

impl Default for AlertPolicies {
    fn default() -> Self {
        Self {
            dedup: DedupPolicy::default(),
            sweep: LowCompliancePolicy::SWEEP,
            on_update: LowCompliancePolicy::ON_UPDATE,
        }
    }
}

/// Alerts raised by one generation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertBatch {
    pub created: Vec<Alert>,
    /// Blocking alerts that already covered a candidate.
    pub existing: Vec<Alert>,
}

impl AlertBatch {
    pub fn push(&mut self, outcome: CreateOutcome) {
        match outcome {
            CreateOutcome::Created(alert) => self.created.push(alert),
            CreateOutcome::Existing(alert) => self.existing.push(alert),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    pub alert: Alert,
    pub outcome: EscalationOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub alert: Alert,
    pub outcome: TransitionOutcome,
}

#[derive(Clone)]
pub struct AlertGenerator {
    store: Arc<dyn AlertStore>,
    rules: Arc<RuleConfig>,
    policies: AlertPolicies,
}

impl AlertGenerator {
    pub fn new(
        store: Arc<dyn AlertStore>,
        rules: Arc<RuleConfig>,
        policies: AlertPolicies,
    ) -> Self {
        Self { store, rules, policies }
    }

    pub fn policies(&self) -> &AlertPolicies {
        &self.policies
    }

    /// Completeness alerts: one critical alert for fields more than
    /// [`CRITICAL_OVERDUE_HOURS`] overdue, one high alert for the rest
    /// that are past their check time.
    pub fn completeness_alerts(
        &self,
        product: &Product,
        report: &CompletenessReport,
    ) -> Vec<NewAlert> {
        let (critical, high): (Vec<&MissingField>, Vec<&MissingField>) = report
            .missing_fields
            .iter()
            .filter(|m| m.hours_overdue > 0)
            .partition(|m| m.hours_overdue > CRITICAL_OVERDUE_HOURS);

        let mut alerts = Vec::new();
        if !critical.is_empty() {
            alerts.push(self.incomplete_fields_alert(
                product,
                report,
                AlertType::IncompleteFieldsCritical,
                AlertPriority::Critical,
                &critical,
            ));
        }
        if !high.is_empty() {
            alerts.push(self.incomplete_fields_alert(
                product,
                report,
                AlertType::IncompleteFields,
                AlertPriority::High,
                &high,
            ));
        }
        alerts
    }

    fn incomplete_fields_alert(
        &self,
        product: &Product,
        report: &CompletenessReport,
        alert_type: AlertType,
        priority: AlertPriority,
        fields: &[&MissingField],
    ) -> NewAlert {
        let names: Vec<&str> = fields.iter().map(|m| m.field.as_str()).collect();
        let max_overdue = fields.iter().map(|m| m.hours_overdue).max().unwrap_or(0);

        NewAlert {
            alert_type,
            priority,
            title: format!("Incomplete product information: {}", product.name),
            message: format!(
                "Product {} is missing or has invalid fields: {} (up to {} hours overdue)",
                product.code,
                names.join(", "),
                max_overdue
            ),
            subject: AlertSubject::Product { product_id: product.id },
            primary_responsible_department: product.primary_owner_department.clone(),
            secondary_involved_departments: product.secondary_access_departments.clone(),
            due_date: None,
            metadata: json!({
                "fields": names,
                "max_hours_overdue": max_overdue,
                "completeness_score": report.completeness_score,
            }),
        }
    }

    pub fn low_compliance_alert(
        &self,
        product: &Product,
        report: &ComplianceReport,
        policy: &LowCompliancePolicy,
    ) -> Option<NewAlert> {
        if !policy.triggers(report.compliance_percentage) {
            return None;
        }

        let priority = if report.compliance_percentage < LOW_COMPLIANCE_HIGH_PRIORITY_BELOW {
            AlertPriority::High
        } else {
            AlertPriority::Medium
        };
        let outstanding: Vec<&str> = report
            .outstanding()
            .iter()
            .map(|c| c.category.as_str())
            .collect();

        Some(NewAlert {
            alert_type: AlertType::LowCompliance,
            priority,
            title: format!("Low compliance: {}", product.name),
            message: format!(
                "Product {} is {:.2}% compliant (threshold {:.0}%); {} of {} required categories uploaded",
                product.code,
                report.compliance_percentage,
                policy.threshold,
                report.completed_count,
                report.total_required
            ),
            subject: AlertSubject::Product { product_id: product.id },
            primary_responsible_department: product.primary_owner_department.clone(),
            secondary_involved_departments: product.secondary_access_departments.clone(),
            due_date: None,
            metadata: json!({
                "policy": policy.name,
                "threshold": policy.threshold,
                "compliance_percentage": report.compliance_percentage,
                "overall_status": report.overall_status,
                "outstanding_categories": outstanding,
            }),
        })
    }

    /// One alert per overdue or expiring-soon required category, addressed
    /// to the category's owner.
    pub fn missing_document_alerts(
        &self,
        product: &Product,
        report: &ComplianceReport,
    ) -> Vec<NewAlert> {
        report
            .categories
            .values()
            .filter_map(|category| {
                let (alert_type, priority, title) = match category.status {
                    CategoryStatus::Overdue => (
                        AlertType::MissingDocument,
                        self.rules
                            .category_priority(&category.category)
                            .unwrap_or(AlertPriority::High),
                        format!("Overdue document: {}", category.name),
                    ),
                    CategoryStatus::ExpiringSoon => (
                        AlertType::DeadlineApproaching,
                        AlertPriority::Medium,
                        format!("Document deadline approaching: {}", category.name),
                    ),
                    _ => return None,
                };

                let mut involved: DepartmentSet = self
                    .rules
                    .category(&category.category)
                    .map(|rule| rule.secondary_access.clone())
                    .unwrap_or_default();
                involved.insert(product.primary_owner_department.clone());
                involved.remove(&category.primary_owner);

                let days = category.days_until_deadline.unwrap_or_default();
                let message = if days < 0 {
                    format!(
                        "{} for product {} is {} days overdue",
                        category.name,
                        product.code,
                        -days
                    )
                } else {
                    format!(
                        "{} for product {} is due in {} days",
                        category.name, product.code, days
                    )
                };

                Some(NewAlert {
                    alert_type,
                    priority,
                    title,
                    message,
                    subject: AlertSubject::ProductCategory {
                        product_id: product.id,
                        category: category.category.clone(),
                    },
                    primary_responsible_department: category.primary_owner.clone(),
                    secondary_involved_departments: involved,
                    due_date: category.computed_deadline,
                    metadata: json!({
                        "category": category.category,
                        "days_until_deadline": category.days_until_deadline,
                    }),
                })
            })
            .collect()
    }

    /// Expiry alert for a document whose deadline falls inside the window.
    pub fn document_expiry_alert(
        &self,
        document: &Document,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Option<NewAlert> {
        if !document.is_countable() {
            return None;
        }
        let deadline = document.deadline?;
        if deadline > now + Duration::days(window_days) {
            return None;
        }

        let days = days_until(deadline, now);
        let (alert_type, priority, message) = if deadline < now {
            (
                AlertType::DocumentExpired,
                AlertPriority::Critical,
                format!("{} expired {} days ago", document.file_name, -days),
            )
        } else if days <= EXPIRING_SOON_DAYS {
            (
                AlertType::DocumentExpiring,
                AlertPriority::High,
                format!("{} expires in {} days", document.file_name, days),
            )
        } else {
            (
                AlertType::DocumentExpiring,
                AlertPriority::Medium,
                format!("{} expires in {} days", document.file_name, days),
            )
        };

        let category_name = self
            .rules
            .category(&document.category_key)
            .map_or(document.category_key.as_str(), |rule| rule.name.as_str());

        Some(NewAlert {
            alert_type,
            priority,
            title: format!("{}: {}", category_name, document.file_name),
            message,
            subject: AlertSubject::Document {
                document_id: document.id,
                product_id: document.product_id,
            },
            primary_responsible_department: document.primary_owner_department.clone(),
            secondary_involved_departments: document.secondary_access_departments.clone(),
            due_date: Some(deadline),
            metadata: json!({
                "category": document.category_key,
                "version": document.version,
                "days_until_deadline": days,
            }),
        })
    }

    /// Persists the alert unless one of the same type already blocks the
    /// entity under its dedup scope.
    pub async fn raise(&self, new: NewAlert, now: DateTime<Utc>) -> TrackerResult<CreateOutcome> {
        let scope = self.policies.dedup.scope_for(new.alert_type);
        let alert = Alert::from_new(new, scope, now);
        let outcome = self.store.insert_if_absent(alert).await?;

        let alert = outcome.alert();
        if outcome.is_created() {
            tracing::info!(
                alert_id = %alert.id,
                alert_type = %alert.alert_type,
                priority = %alert.priority,
                entity = %alert.entity_key,
                "Alert created"
            );
        } else {
            tracing::debug!(
                alert_id = %alert.id,
                alert_type = %alert.alert_type,
                entity = %alert.entity_key,
                "Alert already open, skipping"
            );
        }
        Ok(outcome)
    }

    pub async fn raise_all(
        &self,
        alerts: Vec<NewAlert>,
        now: DateTime<Utc>,
    ) -> TrackerResult<AlertBatch> {
        let mut batch = AlertBatch::default();
        for new in alerts {
            batch.push(self.raise(new, now).await?);
        }
        Ok(batch)
    }

    async fn load(&self, id: Uuid) -> TrackerResult<Alert> {
        self.store
            .find_alert(id)
            .await?
            .ok_or_else(|| TrackerError::not_found(format!("alert {}", id)))
    }

    pub async fn escalate(&self, id: Uuid) -> TrackerResult<Escalation> {
        for _ in 0..UPDATE_ATTEMPTS {
            let mut alert = self.load(id).await?;
            let read = AlertVersion::of(&alert);
            let outcome = alert.escalate(Utc::now());

            match outcome {
                EscalationOutcome::Escalated { from, to } => {
                    if !self.store.update_alert(&alert, read).await? {
                        tracing::debug!(alert_id = %id, "Alert changed while escalating, retrying");
                        continue;
                    }
                    tracing::info!(alert_id = %id, from = %from, to = %to, "Alert escalated");
                }
                EscalationOutcome::AlreadyAtHighest => {
                    tracing::info!(alert_id = %id, "Alert already at highest priority");
                }
                EscalationOutcome::Rejected { status } => {
                    tracing::warn!(alert_id = %id, status = %status, "Cannot escalate alert");
                }
            }

            return Ok(Escalation { alert, outcome });
        }

        Err(TrackerError::conflict(format!("alert {} kept changing during escalation", id)))
    }

    pub async fn mark_in_progress(&self, id: Uuid) -> TrackerResult<Transition> {
        self.transition(id, |alert, now| alert.mark_in_progress(now)).await
    }

    pub async fn resolve(
        &self,
        id: Uuid,
        notes: Option<String>,
        resolver: Option<Uuid>,
    ) -> TrackerResult<Transition> {
        self.transition(id, move |alert, now| alert.resolve(notes.clone(), resolver, now))
            .await
    }

    pub async fn close(&self, id: Uuid) -> TrackerResult<Transition> {
        self.transition(id, |alert, now| alert.close(now)).await
    }

    /// Applies a status change with a conditional write. A writer that
    /// loses the race re-reads the alert, so e.g. a second resolve is
    /// rejected instead of overwriting the first.
    async fn transition<F>(&self, id: Uuid, apply: F) -> TrackerResult<Transition>
    where
        F: Fn(&mut Alert, DateTime<Utc>) -> TransitionOutcome + Send + Sync,
    {
        for _ in 0..UPDATE_ATTEMPTS {
            let mut alert = self.load(id).await?;
            let read = AlertVersion::of(&alert);
            let outcome = apply(&mut alert, Utc::now());

            match outcome {
                TransitionOutcome::Applied { from, to } => {
                    if !self.store.update_alert(&alert, read).await? {
                        tracing::debug!(alert_id = %id, "Alert changed concurrently, retrying");
                        continue;
                    }
                    tracing::info!(alert_id = %id, from = %from, to = %to, "Alert status changed");
                }
                TransitionOutcome::Rejected { from, to } => {
                    tracing::warn!(
                        alert_id = %id,
                        from = %from,
                        to = %to,
                        "Alert transition rejected"
                    );
                }
            }

            return Ok(Transition { alert, outcome });
        }

        Err(TrackerError::conflict(format!("alert {} kept changing", id)))
    }
}
