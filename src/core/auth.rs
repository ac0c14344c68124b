//! Sign-in form handling
//!
//! The catalog authenticates with a session cookie obtained by posting a
//! name and email. Input is validated locally before any request is made.

use crate::core::dog::Credentials;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sign-in input rejected before contacting the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Invalid sign-in details: {details}")]
    Invalid { details: String },
}

impl LoginError {
    pub fn error_code(&self) -> &'static str {
        match self {
            LoginError::Invalid { .. } => "INVALID_LOGIN",
        }
    }
}

/// Sign-in form as entered by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[validate(email(message = "email is not valid"))]
    pub email: String,
}

impl LoginForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Validate and turn into credentials for the login endpoint
    ///
    /// Leading/trailing whitespace is ignored.
    pub fn into_credentials(self) -> Result<Credentials, LoginError> {
        let form = LoginForm {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
        };
        form.validate().map_err(|errors| {
            let mut fields: Vec<String> = errors
                .field_errors()
                .into_iter()
                .map(|(field, errs)| {
                    let messages: Vec<String> = errs
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    format!("{}: {}", field, messages.join(", "))
                })
                .collect();
            fields.sort();
            LoginError::Invalid {
                details: fields.join("; "),
            }
        })?;

        Ok(Credentials {
            name: form.name,
            email: form.email,
        })
    }
}
