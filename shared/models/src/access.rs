//! Primary-owner / secondary-access predicates shared by every
//! department-scoped entity.

use serde::{Deserialize, Serialize};

use crate::{DepartmentCode, DepartmentSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Primary owner: read, edit and delete.
    FullControl,
    /// Secondary access: read and edit, no delete.
    ReadEdit,
    None,
}

/// An entity owned by one department and visible to a set of others.
pub trait DepartmentScoped {
    fn primary_department(&self) -> &DepartmentCode;

    fn secondary_departments(&self) -> &DepartmentSet;

    fn has_access(&self, department: &DepartmentCode) -> bool {
        self.primary_department() == department || self.secondary_departments().contains(department)
    }

    fn access_level(&self, department: &DepartmentCode) -> AccessLevel {
        if self.primary_department() == department {
            AccessLevel::FullControl
        } else if self.secondary_departments().contains(department) {
            AccessLevel::ReadEdit
        } else {
            AccessLevel::None
        }
    }

    fn can_delete(&self, department: &DepartmentCode) -> bool {
        self.access_level(department) == AccessLevel::FullControl
    }
}
