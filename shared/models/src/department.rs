//! Department reference data and the typed department-code set used for
//! primary/secondary ownership on every scoped entity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use validator::{Validate, ValidationError};

/// Well-known department codes referenced by built-in heuristics.
pub mod codes {
    pub const PURCHASING: &str = "PUR";
    pub const MARKETING: &str = "MKT";
    pub const ECOMMERCE: &str = "ECOM";
    pub const RESEARCH: &str = "RND";
    pub const QUALITY: &str = "QA";
    pub const LEGAL: &str = "LEG";
    pub const PRODUCTION: &str = "PRD";
}

/// Department code, normalized to trimmed upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DepartmentCode(String);

impl DepartmentCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Codes are 2-10 ASCII letters.
    pub fn is_well_formed(&self) -> bool {
        (2..=10).contains(&self.0.len()) && self.0.chars().all(|c| c.is_ascii_uppercase())
    }
}

impl From<String> for DepartmentCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<&str> for DepartmentCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<DepartmentCode> for String {
    fn from(code: DepartmentCode) -> Self {
        code.0
    }
}

impl PartialEq<str> for DepartmentCode {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for DepartmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered set of department codes.
///
/// Persisted as a JSON array; `encode`/`decode` are the only conversions
/// to and from the stored representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentSet(BTreeSet<DepartmentCode>);

impl DepartmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &DepartmentCode) -> bool {
        self.0.contains(code)
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.0.contains(&DepartmentCode::new(code))
    }

    pub fn insert(&mut self, code: impl Into<DepartmentCode>) -> bool {
        self.0.insert(code.into())
    }

    pub fn remove(&mut self, code: &DepartmentCode) -> bool {
        self.0.remove(code)
    }

    pub fn extend<I, C>(&mut self, codes: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<DepartmentCode>,
    {
        self.0.extend(codes.into_iter().map(Into::into));
    }

    pub fn iter(&self) -> impl Iterator<Item = &DepartmentCode> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the set for storage.
    pub fn encode(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.0
                .iter()
                .map(|c| serde_json::Value::String(c.as_str().to_string()))
                .collect(),
        )
    }

    /// Decodes a stored set. `null` and the empty string decode to the empty set.
    pub fn decode(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::String(s) if s.trim().is_empty() => Ok(Self::default()),
            // Legacy rows hold the array as an encoded string
            serde_json::Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        }
    }
}

impl<C: Into<DepartmentCode>> FromIterator<C> for DepartmentSet {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a DepartmentSet {
    type Item = &'a DepartmentCode;
    type IntoIter = std::collections::btree_set::Iter<'a, DepartmentCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Static department reference data.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Department {
    #[validate(custom = "validate_department_code")]
    pub code: DepartmentCode,
    #[validate(length(min = 1, max = 100, message = "Department name is required"))]
    pub name: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

impl Department {
    pub fn new(code: impl Into<DepartmentCode>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            responsibilities: Vec::new(),
        }
    }
}

pub(crate) fn validate_department_code(code: &DepartmentCode) -> Result<(), ValidationError> {
    if code.is_well_formed() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_department_code"))
    }
}
