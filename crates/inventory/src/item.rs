use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{CategoryId, ItemId, UserId};

use crate::validation::ValidationErrors;

/// Longest accepted item or category name, in characters.
pub const NAME_MAX_CHARS: usize = 200;

/// Stock quantities, requested amounts and stored totals all fit a 32-bit
/// integer column.
pub const QUANTITY_MIN: i64 = i32::MIN as i64;
pub const QUANTITY_MAX: i64 = i32::MAX as i64;

/// An inventory item: the mutable side of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Current stock, within `QUANTITY_MIN..=QUANTITY_MAX`. Expected to stay
    /// non-negative, but decreases are not clamped.
    pub quantity: i64,
    pub category_id: Option<CategoryId>,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Whether `user` may see and mutate this item.
    pub fn is_visible_to(&self, user: UserId, superuser: bool) -> bool {
        superuser || self.owner == user
    }
}

/// An item category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Raw create/edit input, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemForm {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub category_id: Option<CategoryId>,
}

/// Create/edit input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidItem {
    /// Trimmed and upper-cased.
    pub name: String,
    pub quantity: i64,
    pub category_id: Option<CategoryId>,
}

impl ItemForm {
    /// Validate the form. Category existence is checked by the caller, which
    /// owns the category store.
    pub fn validate(self) -> Result<ValidItem, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = match validate_name(self.name.as_deref()) {
            Ok(name) => normalize_item_name(&name),
            Err(e) => {
                errors.merge(e);
                String::new()
            }
        };

        let quantity = match self.quantity {
            Some(q) => match check_quantity_range(q) {
                Ok(q) => q,
                Err(e) => {
                    errors.merge(e);
                    0
                }
            },
            None => {
                errors.add("quantity", "this field is required");
                0
            }
        };

        errors.into_result(ValidItem {
            name,
            quantity,
            category_id: self.category_id,
        })
    }
}

/// Raw category input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryForm {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCategory {
    pub name: String,
}

impl CategoryForm {
    pub fn validate(self) -> Result<ValidCategory, ValidationErrors> {
        let name = validate_name(self.name.as_deref())?;
        Ok(ValidCategory { name })
    }
}

/// Item names are stored upper-case.
pub fn normalize_item_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Reject quantities outside `QUANTITY_MIN..=QUANTITY_MAX`.
pub(crate) fn check_quantity_range(quantity: i64) -> Result<i64, ValidationErrors> {
    if quantity > QUANTITY_MAX {
        return Err(ValidationErrors::single(
            "quantity",
            format!("ensure this value is less than or equal to {QUANTITY_MAX}"),
        ));
    }
    if quantity < QUANTITY_MIN {
        return Err(ValidationErrors::single(
            "quantity",
            format!("ensure this value is greater than or equal to {QUANTITY_MIN}"),
        ));
    }
    Ok(quantity)
}

fn validate_name(raw: Option<&str>) -> Result<String, ValidationErrors> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ValidationErrors::single("name", "this field is required"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(ValidationErrors::single(
            "name",
            format!("ensure this value has at most {NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_upper_cases_and_trims_name() {
        let form = ItemForm {
            name: Some("  hex bolt ".to_string()),
            quantity: Some(10),
            category_id: None,
        };
        let valid = form.validate().unwrap();
        assert_eq!(valid.name, "HEX BOLT");
        assert_eq!(valid.quantity, 10);
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let errors = ItemForm::default().validate().unwrap_err();
        assert_eq!(errors.field_names(), vec!["name", "quantity"]);
    }

    #[test]
    fn blank_name_is_missing() {
        let form = ItemForm {
            name: Some("   ".to_string()),
            quantity: Some(1),
            category_id: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.messages("name"), ["this field is required"]);
    }

    #[test]
    fn overlong_name_is_rejected() {
        let form = CategoryForm {
            name: Some("x".repeat(NAME_MAX_CHARS + 1)),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn negative_quantity_is_accepted() {
        let form = ItemForm {
            name: Some("washer".to_string()),
            quantity: Some(-2),
            category_id: None,
        };
        assert_eq!(form.validate().unwrap().quantity, -2);
    }

    #[test]
    fn quantity_must_fit_the_stored_column() {
        let form = |quantity| ItemForm {
            name: Some("washer".to_string()),
            quantity: Some(quantity),
            category_id: None,
        };

        assert_eq!(form(QUANTITY_MAX).validate().unwrap().quantity, QUANTITY_MAX);
        assert_eq!(form(QUANTITY_MIN).validate().unwrap().quantity, QUANTITY_MIN);

        let errors = form(i64::MAX).validate().unwrap_err();
        assert_eq!(
            errors.messages("quantity"),
            ["ensure this value is less than or equal to 2147483647"]
        );
        let errors = form(QUANTITY_MIN - 1).validate().unwrap_err();
        assert_eq!(
            errors.messages("quantity"),
            ["ensure this value is greater than or equal to -2147483648"]
        );
    }

    #[test]
    fn category_names_keep_their_case() {
        let form = CategoryForm {
            name: Some(" Fasteners ".to_string()),
        };
        assert_eq!(form.validate().unwrap().name, "Fasteners");
    }
}
