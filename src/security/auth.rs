//! Shared-password authentication.
//!
//! The session cookie `key` holds the SHA-256 of the password. There is no
//! server-side session store: every request is re-validated from its cookie.

use std::io;
use std::path::Path;

use constant_time_eq::constant_time_eq;
use tokio::io::AsyncWriteExt;
use sha2::{Digest, Sha256};

use crate::config::AuthMode;
use crate::http::error::GatewayError;
use crate::http::request::Cookies;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "key";

/// Lowercase hex SHA-256 of `value`.
pub fn hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when the caller may proceed under `mode`.
pub fn authenticated(mode: AuthMode, credential: Option<&str>, password: Option<&str>) -> bool {
    match mode {
        AuthMode::None => true,
        AuthMode::Password => match (password, credential) {
            (Some(password), Some(credential)) if !password.is_empty() => {
                constant_time_eq(credential.as_bytes(), hash(password).as_bytes())
            }
            _ => false,
        },
    }
}

/// [`authenticated`], failing with `Unauthorized` for routes that cannot
/// redirect to the login page.
pub fn ensure_authenticated(
    mode: AuthMode,
    credential: Option<&str>,
    password: Option<&str>,
) -> Result<(), GatewayError> {
    if authenticated(mode, credential, password) {
        Ok(())
    } else {
        Err(GatewayError::Unauthorized)
    }
}

/// Cookie-reading shorthand over [`authenticated`].
pub fn is_authenticated(auth: &crate::config::AuthConfig, cookies: &Cookies) -> bool {
    authenticated(auth.mode, cookies.get(SESSION_COOKIE), auth.password.as_deref())
}

/// Cookie-reading shorthand over [`ensure_authenticated`].
pub fn require_authenticated(
    auth: &crate::config::AuthConfig,
    cookies: &Cookies,
) -> Result<(), GatewayError> {
    ensure_authenticated(auth.mode, cookies.get(SESSION_COOKIE), auth.password.as_deref())
}

/// Write a generated password to `path`, readable by the owner only.
pub async fn store_generated_password(path: &Path, password: &str) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(password.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}
