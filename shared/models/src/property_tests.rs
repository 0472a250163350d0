//! Property-based tests for the Prodtrack domain models.

use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use crate::{
    Alert, AlertPriority, AlertStatus, AlertSubject, AlertType, DedupScope, DepartmentCode,
    AccessLevel, DepartmentScoped, DepartmentSet, EscalationOutcome, NewAlert, Product,
};

prop_compose! {
    fn arb_department_code()(code in "[A-Z]{2,6}") -> DepartmentCode {
        DepartmentCode::new(code)
    }
}

fn arb_priority() -> impl Strategy<Value = AlertPriority> {
    prop_oneof![
        Just(AlertPriority::Low),
        Just(AlertPriority::Medium),
        Just(AlertPriority::High),
        Just(AlertPriority::Critical),
    ]
}

fn alert_with(priority: AlertPriority) -> Alert {
    Alert::from_new(
        NewAlert {
            alert_type: AlertType::Manual,
            priority,
            title: "Manual".to_string(),
            message: String::new(),
            subject: AlertSubject::Product { product_id: Uuid::new_v4() },
            primary_responsible_department: DepartmentCode::new("QA"),
            secondary_involved_departments: DepartmentSet::new(),
            due_date: None,
            metadata: serde_json::Value::Null,
        },
        DedupScope::Unresolved,
        Utc::now(),
    )
}

proptest! {
    /// Escalation never lowers priority and always terminates at critical.
    #[test]
    fn prop_escalation_is_monotonic_and_capped(start in arb_priority(), calls in 0usize..8) {
        let mut alert = alert_with(start);
        let now = Utc::now();
        let mut previous = alert.priority;

        for _ in 0..calls {
            let outcome = alert.escalate(now);
            prop_assert!(alert.priority >= previous);
            if previous == AlertPriority::Critical {
                prop_assert_eq!(outcome, EscalationOutcome::AlreadyAtHighest);
            }
            previous = alert.priority;
        }

        let steps_to_max = 3 - start as usize;
        if calls >= steps_to_max {
            prop_assert_eq!(alert.priority, AlertPriority::Critical);
        }
        prop_assert_eq!(alert.status, AlertStatus::Open);
    }

    /// Exactly one access level holds for any department.
    #[test]
    fn prop_access_level_matches_has_access(
        primary in arb_department_code(),
        secondary in prop::collection::vec(arb_department_code(), 0..5),
        candidate in arb_department_code(),
    ) {
        let mut product = Product::new("P-1", "Item", primary.clone());
        product.secondary_access_departments = secondary.iter().cloned().collect();

        let level = product.access_level(&candidate);
        prop_assert_eq!(product.has_access(&candidate), level != AccessLevel::None);
        if candidate == primary {
            prop_assert_eq!(level, AccessLevel::FullControl);
        }
    }

    /// Stored department sets decode back to the same codes.
    #[test]
    fn prop_department_set_codec(codes in prop::collection::vec("[a-zA-Z]{2,6}", 0..6)) {
        let set: DepartmentSet = codes.iter().map(String::as_str).collect();
        let decoded = DepartmentSet::decode(&set.encode()).unwrap();
        prop_assert_eq!(&decoded, &set);
        for code in &codes {
            prop_assert!(decoded.contains_code(code));
        }
    }
}
