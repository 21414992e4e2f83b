//! Box Authentication
//!
//! Resolves the bearer token used for API calls. Token acquisition (OAuth,
//! JWT app auth) happens outside this crate; callers hand us an access token
//! directly, through the environment, or through the config file.

use super::error::{Error, Result};
use std::fmt;

/// Environment variables checked for an access token, in order
pub const TOKEN_ENV_VARS: &[&str] = &["BOX_ACCESS_TOKEN", "BOX_DEVELOPER_TOKEN"];

/// Bearer credentials for API calls
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    /// Wrap an access token
    /// Security: Rejects empty tokens and tokens containing whitespace
    pub fn new(token: &str) -> Result<Self> {
        let token = token.trim();
        if !validate_token(token) {
            return Err(Error::Config("Access token is empty or malformed".to_string()));
        }

        Ok(Self {
            token: token.to_string(),
        })
    }

    /// Resolve credentials: explicit token > environment > config file
    pub fn resolve(explicit: Option<&str>, configured: Option<&str>) -> Result<Self> {
        if let Some(token) = explicit {
            return Self::new(token);
        }

        if let Some(token) = token_from_env() {
            return Self::new(&token);
        }

        match configured {
            Some(token) => Self::new(token),
            None => Err(Error::Config(format!(
                "No access token configured. Set {} or use --token",
                TOKEN_ENV_VARS[0]
            ))),
        }
    }

    /// Get the access token for API calls
    pub fn token(&self) -> &str {
        &self.token
    }
}

// Security: never print the token itself
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Read an access token from the environment
pub fn token_from_env() -> Option<String> {
    for var in TOKEN_ENV_VARS {
        if let Ok(token) = std::env::var(var) {
            if validate_token(token.trim()) {
                return Some(token);
            }
            tracing::warn!("Ignoring malformed access token in {}", var);
        }
    }
    None
}

fn validate_token(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(|c| c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_and_accepts_token() {
        let creds = Credentials::new("  abc123  ").unwrap();
        assert_eq!(creds.token(), "abc123");
    }

    #[test]
    fn test_new_rejects_empty_or_spaced_tokens() {
        assert!(Credentials::new("").is_err());
        assert!(Credentials::new("abc def").is_err());
    }

    #[test]
    fn test_explicit_token_wins() {
        let creds = Credentials::resolve(Some("explicit"), Some("configured")).unwrap();
        assert_eq!(creds.token(), "explicit");
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::new("secret-token").unwrap();
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("redacted"));
    }
}
