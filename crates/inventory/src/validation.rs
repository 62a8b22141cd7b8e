use std::collections::BTreeMap;

use serde::Serialize;

/// Field-level validation failures, keyed by input field name.
///
/// Handlers collect every problem with a request before rejecting it, so the
/// caller can report all invalid fields at once. Nothing is committed when
/// this is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error set with a single message.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.keys().copied().collect()
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(value)` when no field failed, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid fields: {}", self.field_names().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("quantity", "this field is required");
        errors.add("name", "this field is required");
        errors.add("name", "ensure this value has at most 200 characters");

        assert_eq!(errors.messages("name").len(), 2);
        assert_eq!(errors.field_names(), vec!["name", "quantity"]);
        assert_eq!(errors.to_string(), "invalid fields: name, quantity");
    }

    #[test]
    fn into_result_passes_value_through_when_empty() {
        assert_eq!(ValidationErrors::new().into_result(7), Ok(7));
        assert!(ValidationErrors::single("name", "x").into_result(7).is_err());
    }
}
