//! Field-level validation for application payloads
//!
//! Errors are collected rather than short-circuited so a form can show
//! every problem at once. Shape mirrors a flattened form error report:
//! `formErrors` for problems that are not tied to one field, `fieldErrors`
//! keyed by dotted field path.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Collected validation failures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error not attributable to a single field (e.g. malformed JSON)
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form_errors: vec![message.into()],
            field_errors: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(path.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    /// True if `path` has at least one error
    pub fn has_field(&self, path: &str) -> bool {
        self.field_errors.contains_key(path)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        for (path, messages) in &self.field_errors {
            parts.push(format!("{}: {}", path, messages.join("; ")));
        }
        write!(f, "{}", parts.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates field errors for one payload
pub(crate) struct Checks {
    errors: ValidationErrors,
}

impl Checks {
    pub(crate) fn new() -> Self {
        Self {
            errors: ValidationErrors::new(),
        }
    }

    pub(crate) fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }

    /// Required text, bounds in characters
    pub(crate) fn text(&mut self, path: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.errors.add(
                path,
                format!("String must contain at least {} character(s)", min),
            );
        } else if len > max {
            self.errors.add(
                path,
                format!("String must contain at most {} character(s)", max),
            );
        }
    }

    pub(crate) fn optional_text(&mut self, path: &str, value: Option<&str>, min: usize, max: usize) {
        if let Some(value) = value {
            self.text(path, value, min, max);
        }
    }

    pub(crate) fn email(&mut self, path: &str, value: &str) {
        if !is_valid_email(value) {
            self.errors.add(path, "Invalid email");
        }
    }

    pub(crate) fn optional_url(&mut self, path: &str, value: Option<&str>) {
        if let Some(value) = value {
            if url::Url::parse(value).is_err() {
                self.errors.add(path, "Invalid url");
            }
        }
    }

    /// List with a maximum item count; every item is length-checked
    pub(crate) fn list(&mut self, path: &str, items: &[String], max_items: usize, min: usize, max: usize) {
        if items.len() > max_items {
            self.errors.add(
                path,
                format!("Array must contain at most {} element(s)", max_items),
            );
        }
        for (index, item) in items.iter().enumerate() {
            self.text(&format!("{}.{}", path, index), item, min, max);
        }
    }

    pub(crate) fn integer_range(&mut self, path: &str, value: i64, min: i64, max: i64) {
        if value < min {
            self.errors
                .add(path, format!("Number must be greater than or equal to {}", min));
        } else if value > max {
            self.errors
                .add(path, format!("Number must be less than or equal to {}", max));
        }
    }

    pub(crate) fn optional_non_negative(&mut self, path: &str, value: Option<f64>) {
        if let Some(value) = value {
            if value < 0.0 {
                self.errors
                    .add(path, "Number must be greater than or equal to 0");
            }
        }
    }

    pub(crate) fn must_be_true(&mut self, path: &str, value: bool) {
        if !value {
            self.errors.add(path, "Invalid literal value, expected true");
        }
    }
}

/// Structural e-mail check: one `@`, non-empty local part, dotted domain
/// without empty labels, no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}
