//! Environment-based configuration (spec.md §6.3).
//!
//! Loaded once at startup via `dotenvy` (an optional `.env` file layered
//! under real process environment variables) and `anyhow::Context` for
//! readable failure messages, the same pattern the pack's services use
//! for their own `AppConfig::from_env`.

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Connection string for a future real store; unused by
    /// [`crate::store::InMemoryStore`] but required and validated
    /// non-empty so swapping stores later doesn't also require a
    /// deployment change.
    pub storage_connection_string: String,
    pub token_signing_secret: String,
    pub port: u16,
    /// When true, `AppError::Internal` responses include the underlying
    /// cause instead of a generic message — only safe for local
    /// development.
    pub verbose_errors: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err).context("failed to load .env file");
            }
        }

        let token_signing_secret = std::env::var("TOKEN_SIGNING_SECRET")
            .context("TOKEN_SIGNING_SECRET must be set")?;
        let storage_connection_string = std::env::var("STORAGE_CONNECTION_STRING")
            .context("STORAGE_CONNECTION_STRING must be set")?;
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid u16")?;
        let verbose_errors = std::env::var("VERBOSE_ERRORS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        crate::error::set_verbose_errors(verbose_errors);

        Ok(Self {
            storage_connection_string,
            token_signing_secret,
            port,
            verbose_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_parses_from_env() {
        std::env::set_var("TOKEN_SIGNING_SECRET", "test-secret");
        std::env::set_var("STORAGE_CONNECTION_STRING", "memory://test");
        std::env::set_var("PORT", "9090");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.token_signing_secret, "test-secret");
        std::env::remove_var("PORT");
        std::env::remove_var("TOKEN_SIGNING_SECRET");
        std::env::remove_var("STORAGE_CONNECTION_STRING");
    }
}
