//! Caller resolution.
//!
//! The engine does not authenticate anyone itself. The host hands it a
//! [`CallerResolver`] that turns request credentials into a [`Principal`]
//! or rejects them; pull and push refuse to run for a rejected caller.

use std::collections::HashMap;
use thiserror::Error;

/// Credentials presented with a sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Email and password (HTTP basic style)
    Basic { email: String, password: String },
    /// Opaque bearer token
    Token(String),
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub clinic_id: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("unknown caller")]
    UnknownCaller,

    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Resolves credentials to a principal.
pub trait CallerResolver: Send + Sync {
    fn resolve(&self, credentials: &Credentials) -> Result<Principal, AuthError>;
}

/// Fixed credential table, for tests and local tooling.
#[derive(Debug, Clone, Default)]
pub struct StaticCallerResolver {
    passwords: HashMap<String, (String, Principal)>,
    tokens: HashMap<String, Principal>,
}

impl StaticCallerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `email`/`password` as `principal`.
    pub fn with_user(mut self, email: &str, password: &str, principal: Principal) -> Self {
        self.passwords
            .insert(email.to_string(), (password.to_string(), principal));
        self
    }

    /// Accept a bearer token as `principal`.
    pub fn with_token(mut self, token: &str, principal: Principal) -> Self {
        self.tokens.insert(token.to_string(), principal);
        self
    }
}

impl CallerResolver for StaticCallerResolver {
    fn resolve(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        match credentials {
            Credentials::Basic { email, password } => {
                let (expected, principal) =
                    self.passwords.get(email).ok_or(AuthError::UnknownCaller)?;
                if expected == password {
                    Ok(principal.clone())
                } else {
                    Err(AuthError::InvalidCredentials)
                }
            }
            Credentials::Token(token) => self
                .tokens
                .get(token)
                .cloned()
                .ok_or(AuthError::InvalidCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Principal {
        Principal {
            user_id: "u-1".to_string(),
            clinic_id: Some("c-1".to_string()),
        }
    }

    #[test]
    fn test_resolves_known_user() {
        let resolver = StaticCallerResolver::new().with_user("nurse@clinic.org", "pw", provider());
        let creds = Credentials::Basic {
            email: "nurse@clinic.org".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(resolver.resolve(&creds), Ok(provider()));
    }

    #[test]
    fn test_rejects_bad_password_and_unknown_token() {
        let resolver = StaticCallerResolver::new()
            .with_user("nurse@clinic.org", "pw", provider())
            .with_token("t-1", provider());

        let wrong = Credentials::Basic {
            email: "nurse@clinic.org".to_string(),
            password: "nope".to_string(),
        };
        assert_eq!(resolver.resolve(&wrong), Err(AuthError::InvalidCredentials));

        let stranger = Credentials::Basic {
            email: "x@y.z".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(resolver.resolve(&stranger), Err(AuthError::UnknownCaller));

        assert!(resolver.resolve(&Credentials::Token("t-1".to_string())).is_ok());
        assert!(resolver.resolve(&Credentials::Token("t-2".to_string())).is_err());
    }
}
