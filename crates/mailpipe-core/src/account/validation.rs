//! Account validation.

use std::fmt;

use super::model::Account;

/// A field that would make dialing or login pointless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is empty.
    EmptyEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// Password is empty.
    EmptyPassword,
    /// Host is empty.
    EmptyHost,
    /// Port is zero.
    InvalidPort,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyEmail => "Email address is required",
            Self::InvalidEmail => "Invalid email address format",
            Self::EmptyPassword => "Password is required",
            Self::EmptyHost => "IMAP server is required",
            Self::InvalidPort => "IMAP port must be 1-65535",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::EmptyPassword => "password",
            Self::EmptyHost => "host",
            Self::InvalidPort => "port",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field(), self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Checks every field and reports all problems at once.
///
/// # Errors
///
/// Returns the list of invalid fields.
pub fn validate_account(account: &Account) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if account.email.trim().is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !is_valid_email(&account.email) {
        errors.push(ValidationError::InvalidEmail);
    }
    if account.password.is_empty() {
        errors.push(ValidationError::EmptyPassword);
    }
    if account.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if account.port == Some(0) {
        errors.push(ValidationError::InvalidPort);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::account::AccountId;

    fn valid() -> Account {
        Account {
            id: AccountId::new(1),
            email: "user@example.com".into(),
            password: "secret".into(),
            host: "imap.example.com".into(),
            port: None,
            secure: true,
        }
    }

    #[test]
    fn test_valid_account() {
        assert!(validate_account(&valid()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let account = Account {
            email: "not-an-address".into(),
            password: String::new(),
            host: "  ".into(),
            port: Some(0),
            ..valid()
        };
        assert_eq!(
            validate_account(&account).unwrap_err(),
            vec![
                ValidationError::InvalidEmail,
                ValidationError::EmptyPassword,
                ValidationError::EmptyHost,
                ValidationError::InvalidPort,
            ]
        );
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b"));
        assert!(!is_valid_email("@b"));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email("a@b@c"));
        assert!(!is_valid_email("a@.b"));
    }
}
