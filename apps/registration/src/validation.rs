//! Declarative form validation.
//!
//! The schema is a table of field → rules. Rules for a field run in order
//! and the first failure is that field's error.

use crate::types::{FieldName, FormDraft};
use std::collections::BTreeMap;

/// Kind of validation failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The field is empty or unset
    Required,
    /// The field is filled but malformed
    InvalidFormat,
}

/// Error attached to one field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Message shown beside the field
    pub message: String,
}

impl FieldError {
    /// Required-field error
    #[must_use]
    pub fn required(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Required,
            message: message.into(),
        }
    }

    /// Malformed-value error
    #[must_use]
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidFormat,
            message: message.into(),
        }
    }
}

/// Errors keyed by field, in form order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<FieldName, FieldError>,
}

impl ValidationErrors {
    /// No errors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Error for `field`, if any
    #[must_use]
    pub fn get(&self, field: FieldName) -> Option<&FieldError> {
        self.errors.get(&field)
    }

    /// Message for `field`, if any
    #[must_use]
    pub fn message(&self, field: FieldName) -> Option<&str> {
        self.get(field).map(|e| e.message.as_str())
    }

    /// Whether `field` has an error
    #[must_use]
    pub fn contains(&self, field: FieldName) -> bool {
        self.errors.contains_key(&field)
    }

    /// Sets the error for `field`
    pub fn insert(&mut self, field: FieldName, error: FieldError) {
        self.errors.insert(field, error);
    }

    /// Clears the error for `field`
    pub fn remove(&mut self, field: FieldName) -> Option<FieldError> {
        self.errors.remove(&field)
    }

    /// Clears everything
    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Fields with errors, in form order
    pub fn fields(&self) -> impl Iterator<Item = FieldName> + '_ {
        self.errors.keys().copied()
    }

    /// `(field, error)` pairs, in form order
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldError)> {
        self.errors.iter().map(|(field, error)| (*field, error))
    }

    /// Number of fields with errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when every field passed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A single check
#[derive(Clone, Copy, Debug)]
enum Rule {
    /// Fails when the field is not present
    Required(&'static str),
    /// Fails when a non-empty value is not an email address
    Email(&'static str),
}

#[derive(Clone, Copy, Debug)]
struct FieldRules {
    field: FieldName,
    rules: &'static [Rule],
}

const REGISTRATION_SCHEMA: [FieldRules; 5] = [
    FieldRules {
        field: FieldName::FullName,
        rules: &[Rule::Required("Full Name is required")],
    },
    FieldRules {
        field: FieldName::Email,
        rules: &[
            Rule::Required("Email is required"),
            Rule::Email("Invalid email"),
        ],
    },
    FieldRules {
        field: FieldName::Avatar,
        rules: &[Rule::Required("Avatar is required")],
    },
    FieldRules {
        field: FieldName::TicketPrice,
        rules: &[Rule::Required("Ticket selection is required")],
    },
    FieldRules {
        field: FieldName::TicketQuantity,
        rules: &[Rule::Required("Ticket quantity is required")],
    },
];

/// Field value as the rules see it
enum FieldValue<'a> {
    Text(&'a str),
    Present(bool),
}

impl FieldValue<'_> {
    fn of(draft: &FormDraft, field: FieldName) -> FieldValue<'_> {
        match field {
            FieldName::FullName => FieldValue::Text(&draft.full_name),
            FieldName::Email => FieldValue::Text(&draft.email),
            FieldName::Avatar => FieldValue::Present(draft.avatar.is_present()),
            FieldName::TicketPrice => FieldValue::Present(draft.ticket_price.is_some()),
            FieldName::TicketQuantity => FieldValue::Present(draft.ticket_quantity.is_some()),
        }
    }

    fn is_present(&self) -> bool {
        match self {
            Self::Text(text) => !text.is_empty(),
            Self::Present(present) => *present,
        }
    }
}

impl Rule {
    fn check(self, value: &FieldValue<'_>) -> Option<FieldError> {
        match self {
            Self::Required(message) => (!value.is_present()).then(|| FieldError::required(message)),
            Self::Email(message) => match value {
                FieldValue::Text(text) if !text.is_empty() && !is_valid_email(text) => {
                    Some(FieldError::invalid_format(message))
                },
                _ => None,
            },
        }
    }
}

/// Validator for the registration form
#[derive(Clone, Debug)]
pub struct Validator {
    schema: &'static [FieldRules],
}

impl Default for Validator {
    fn default() -> Self {
        Self::registration()
    }
}

impl Validator {
    /// The registration form's rules
    #[must_use]
    pub const fn registration() -> Self {
        Self {
            schema: &REGISTRATION_SCHEMA,
        }
    }

    /// Validates every field
    ///
    /// # Errors
    ///
    /// Returns every failing field at once; there is no partial success.
    pub fn validate(&self, draft: &FormDraft) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for entry in self.schema {
            if let Some(error) = Self::check_field(entry, draft) {
                errors.insert(entry.field, error);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(fields = ?errors.fields().collect::<Vec<_>>(), "Validation failed");
            Err(errors)
        }
    }

    /// Validates one field, e.g. after it changes
    #[must_use]
    pub fn validate_field(&self, draft: &FormDraft, field: FieldName) -> Option<FieldError> {
        self.schema
            .iter()
            .find(|entry| entry.field == field)
            .and_then(|entry| Self::check_field(entry, draft))
    }

    fn check_field(entry: &FieldRules, draft: &FormDraft) -> Option<FieldError> {
        let value = FieldValue::of(draft, entry.field);
        entry.rules.iter().find_map(|rule| rule.check(&value))
    }
}

/// Symbols allowed in an unquoted local part besides alphanumerics and dots
const LOCAL_SYMBOLS: &str = "!#$%&'*+/=?^_`{|}~-";

/// Validate email address format.
///
/// - exactly one `@`, with non-empty local and domain parts
/// - the domain has at least one dot and no empty labels
/// - local part: alphanumerics, `.` and the atext symbols ``!#$%&'*+/=?^_`{|}~-``
/// - domain: alphanumerics and `.-`
/// - 3 to 255 characters
///
/// ```
/// use confpass_registration::validation::is_valid_email;
///
/// assert!(is_valid_email("person@example.com"));
/// assert!(!is_valid_email("not-an-email"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local_chars = |c: char| c.is_alphanumeric() || c == '.' || LOCAL_SYMBOLS.contains(c);
    let valid_domain_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    if !local.chars().all(valid_local_chars) || !domain.chars().all(valid_domain_chars) {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}
