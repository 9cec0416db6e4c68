//! Authentication for the catalog API.

use base64::Engine;
use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};

/// Trait for attaching authentication headers to every request
pub trait AuthManager: Send + Sync {
    /// Get the authentication headers for a request
    fn get_headers(&self) -> HeaderMap;

    /// Validate the configured credentials before any network call
    fn validate_credentials(&self) -> Result<(), String>;
}

/// HTTP Basic authentication manager
pub struct BasicAuthManager {
    username: String,
    password: SecretString,
}

impl BasicAuthManager {
    /// Create a new basic authentication manager
    pub fn new(username: String, password: SecretString) -> Self {
        Self { username, password }
    }

    fn authorization_value(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

impl AuthManager for BasicAuthManager {
    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = self.authorization_value().parse() {
            headers.insert("authorization", value);
        }

        if let Ok(value) = "application/json".parse::<http::HeaderValue>() {
            headers.insert("content-type", value.clone());
            headers.insert("accept", value);
        }

        headers
    }

    fn validate_credentials(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("Username cannot be empty".to_string());
        }

        if self.password.expose_secret().is_empty() {
            return Err("Password cannot be empty".to_string());
        }

        Ok(())
    }
}
