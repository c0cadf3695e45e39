use serde::Deserialize;

use crate::CoreError;

const MAX_USER_NAME_LEN: usize = 50;

/// Trimmed name of 1 to 50 characters.
///
/// # Errors
///
/// Returns [`CoreError::InvalidField`] on `name`.
pub fn validate_user_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_USER_NAME_LEN {
        return Err(CoreError::InvalidField {
            field: "name",
            reason: format!("must be 1-{MAX_USER_NAME_LEN} characters"),
        });
    }
    Ok(trimmed.to_owned())
}

/// Lowercased address with a non-empty local part and a dotted domain.
///
/// # Errors
///
/// Returns [`CoreError::InvalidField`] on `email`.
pub fn validate_email(email: &str) -> Result<String, CoreError> {
    let normalized = email.trim().to_lowercase();
    let valid = match normalized.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
                && !normalized.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(CoreError::InvalidField {
            field: "email",
            reason: format!("'{}' is not a valid address", email.trim()),
        });
    }
    Ok(normalized)
}

/// Sparse profile update from the user themselves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidField`] when neither field is present or
    /// either one is invalid.
    pub fn validate(self) -> Result<UserChanges, CoreError> {
        if self.name.is_none() && self.email.is_none() {
            return Err(CoreError::InvalidField {
                field: "body",
                reason: "must set name or email".to_string(),
            });
        }
        Ok(UserChanges {
            name: self.name.as_deref().map(validate_user_name).transpose()?,
            email: self.email.as_deref().map(validate_email).transpose()?,
        })
    }
}
