use crate::error::{TrackerError, TrackerResult};
use regex::Regex;
use std::sync::OnceLock;
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> TrackerResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(TrackerError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match &error.code {
                std::borrow::Cow::Borrowed("length") => {
                    format!("Length validation failed for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("range") => {
                    format!("Value out of range for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("required") => {
                    format!("Field '{}' is required", field)
                }
                _ => format!("Validation failed for field '{}': {}", field, error.code),
            };
            messages.push(message);
        }
    }

    messages.sort();
    messages.join(", ")
}

const UNIT_VOCABULARY: &[&str] = &[
    "ml", "l", "cl", "dl", "mg", "g", "kg", "mcg", "oz", "lb", "mm", "cm", "m", "pcs", "caps",
    "tablets", "gram", "liter", "litre",
];

const STEP_MARKERS: &[&str] = &[
    "step", "first", "second", "third", "then", "next", "finally", "after that",
];

const STORAGE_CONDITIONS: &[&str] = &[
    "temperature", "°c", "°f", "humidity", "avoid", "dry", "cool", "sunlight", "refrigerat",
    "room temp", "below", "above", "out of reach",
];

const COMPARISON_VOCABULARY: &[&str] = &[
    "compared to", "compare", "versus", "price", "quality", "other brand", "competitor",
    "cheaper", "better than", "similar to", "alternative",
];

const UNIQUENESS_VOCABULARY: &[&str] = &[
    "exclusive", "unique", "distinctive", "outstanding", "only", "first", "patented",
    "superior", "innovative", "unlike",
];

/// One content check in a field's validation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    NotEmpty,
    MinLength(usize),
    ContainsUnit,
    ContainsSteps,
    ContainsConditions,
    HasComparison,
    HasUniquePoints,
}

impl ValidationRule {
    /// Checks an already-trimmed value. On failure returns a message
    /// naming the field and the violated constraint.
    pub fn check(&self, field: &str, value: &str) -> Result<(), String> {
        let passed = match self {
            Self::NotEmpty => !value.is_empty(),
            Self::MinLength(min) => value.chars().count() >= *min,
            Self::ContainsUnit => contains_any(value, UNIT_VOCABULARY),
            Self::ContainsSteps => contains_steps(value),
            Self::ContainsConditions => contains_any(value, STORAGE_CONDITIONS),
            Self::HasComparison => contains_any(value, COMPARISON_VOCABULARY),
            Self::HasUniquePoints => contains_any(value, UNIQUENESS_VOCABULARY),
        };

        if passed {
            return Ok(());
        }

        Err(match self {
            Self::NotEmpty => format!("{} is required", field),
            Self::MinLength(min) => format!("{} must be at least {} characters", field, min),
            Self::ContainsUnit => {
                format!("{} must include a unit of measure (ml, g, kg, ...)", field)
            }
            Self::ContainsSteps => format!("{} must describe the steps to follow", field),
            Self::ContainsConditions => {
                format!("{} must state storage conditions (temperature, humidity, ...)", field)
            }
            Self::HasComparison => format!("{} must compare against other products", field),
            Self::HasUniquePoints => format!("{} must state what makes the product unique", field),
        })
    }
}

/// Runs a pipeline against a raw value; returns every failure message.
pub fn run_rules(field: &str, raw: &str, rules: &[ValidationRule]) -> Vec<String> {
    let value = raw.trim();
    rules
        .iter()
        .filter_map(|rule| rule.check(field, value).err())
        .collect()
}

fn contains_any(value: &str, vocabulary: &[&str]) -> bool {
    let lower = value.to_lowercase();
    vocabulary.iter().any(|term| lower.contains(term))
}

fn numbered_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(^|\s)\d+\s*[.):]").expect("valid step marker pattern"))
}

fn contains_steps(value: &str) -> bool {
    contains_any(value, STEP_MARKERS) || numbered_marker().is_match(value)
}
