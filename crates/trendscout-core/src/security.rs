use std::env;

use crate::TrendScoutError;

/// Wrapper around sensitive values to reduce accidental logging.
#[derive(Clone)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***redacted***")
    }
}

/// Require that a given environment variable is set and non-empty.
pub fn require_env(var: &str) -> Result<SecretValue, TrendScoutError> {
    lookup_env(var).ok_or_else(|| TrendScoutError::MissingSecret(var.to_string()))
}

/// Like [`require_env`], but absence is not an error.
pub fn lookup_env(var: &str) -> Option<SecretValue> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(SecretValue(value)),
        _ => None,
    }
}
