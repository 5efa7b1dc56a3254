//! Authentication modes
//!
//! ChartMuseum supports anonymous access and HTTP basic auth. Credentials can
//! be given inline or as environment variable names (CI/CD friendly), and are
//! resolved once when the client is built.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ClientError, Result};

/// Authentication as written in configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    /// Anonymous access
    #[default]
    None,

    /// Basic authentication (username/password)
    Basic { username: String, password: String },

    /// Basic authentication read from environment variables
    #[serde(rename_all = "camelCase")]
    Env {
        username_var: String,
        password_var: String,
    },
}

impl AuthConfig {
    /// Create basic auth credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthConfig::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create environment variable credentials
    pub fn from_env(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        AuthConfig::Env {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }

    /// Resolve to concrete credentials
    pub fn resolve(&self) -> Result<Auth> {
        match self {
            AuthConfig::None => Ok(Auth::None),
            AuthConfig::Basic { username, password } => Ok(Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            AuthConfig::Env {
                username_var,
                password_var,
            } => {
                let username = std::env::var(username_var).map_err(|_| {
                    ClientError::config(format!("Environment variable {} not set", username_var))
                })?;
                let password = std::env::var(password_var).map_err(|_| {
                    ClientError::config(format!("Environment variable {} not set", password_var))
                })?;
                Ok(Auth::Basic { username, password })
            }
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::None => f.write_str("None"),
            AuthConfig::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            AuthConfig::Env {
                username_var,
                password_var,
            } => f
                .debug_struct("Env")
                .field("username_var", username_var)
                .field("password_var", password_var)
                .finish(),
        }
    }
}

/// Resolved credentials attached to every request
#[derive(Clone, Default)]
pub enum Auth {
    #[default]
    None,
    Basic { username: String, password: String },
}

impl Auth {
    /// Authorization header value, if any
    pub fn header_value(&self) -> Option<HeaderValue> {
        match self {
            Auth::None => None,
            Auth::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                let mut value = HeaderValue::from_str(&format!("Basic {}", encoded)).ok()?;
                value.set_sensitive(true);
                Some(value)
            }
        }
    }

    /// Set the Authorization header, leaving requests untouched without credentials
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some(value) = self.header_value() {
            headers.insert(AUTHORIZATION, value);
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Auth::None)
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header() {
        let auth = AuthConfig::basic("admin", "password").resolve().unwrap();
        let value = auth.header_value().unwrap();
        // base64("admin:password")
        assert_eq!(value.to_str().unwrap(), "Basic YWRtaW46cGFzc3dvcmQ=");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_anonymous_leaves_headers_alone() {
        let mut headers = HeaderMap::new();
        Auth::None.apply(&mut headers);
        assert!(headers.get(AUTHORIZATION).is_none());
        assert!(Auth::None.is_anonymous());
    }

    #[test]
    fn test_debug_redacts_password() {
        let auth = Auth::Basic {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", auth);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));

        let config = AuthConfig::basic("admin", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_env_credentials() {
        // SAFETY: Test runs in single thread, no concurrent access to env vars
        unsafe {
            std::env::set_var("CM_TEST_USER_VAR", "ci-user");
            std::env::set_var("CM_TEST_PASS_VAR", "ci-pass");
        }

        let resolved = AuthConfig::from_env("CM_TEST_USER_VAR", "CM_TEST_PASS_VAR")
            .resolve()
            .unwrap();
        match resolved {
            Auth::Basic { username, password } => {
                assert_eq!(username, "ci-user");
                assert_eq!(password, "ci-pass");
            }
            Auth::None => panic!("Expected Basic credentials"),
        }

        // SAFETY: Test runs in single thread, no concurrent access to env vars
        unsafe {
            std::env::remove_var("CM_TEST_USER_VAR");
            std::env::remove_var("CM_TEST_PASS_VAR");
        }
    }

    #[test]
    fn test_env_credentials_missing() {
        let err = AuthConfig::from_env("CM_TEST_DEFINITELY_UNSET_U", "CM_TEST_DEFINITELY_UNSET_P")
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[test]
    fn test_config_yaml_shape() {
        let config: AuthConfig =
            serde_yaml::from_str("type: basic\nusername: admin\npassword: secret\n").unwrap();
        assert!(matches!(config, AuthConfig::Basic { .. }));

        let config: AuthConfig =
            serde_yaml::from_str("type: env\nusernameVar: CM_USER\npasswordVar: CM_PASS\n")
                .unwrap();
        assert!(matches!(config, AuthConfig::Env { .. }));
    }
}
