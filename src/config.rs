use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Email format check on registration. Presence of every field is always checked.
    pub strict_validation: bool,
    pub host: String,
    pub port: u16,
}

/// Tokens are valid for exactly this long after issue.
pub const TOKEN_TTL_MINUTES: i64 = 60;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        // Secret first so a half-configured deployment reports the signing key before the store.
        let secret = required_var(&var, "JWT_SECRET")?;
        let database_url = required_var(&var, "DATABASE_URL")?;
        let jwt = JwtConfig {
            secret,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "gatekeep".into()),
            ttl_minutes: TOKEN_TTL_MINUTES,
        };
        let strict_validation = var("STRICT_VALIDATION")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);
        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match var("APP_PORT") {
            Some(v) => v.parse::<u16>().context("APP_PORT must be a port number")?,
            None => 3000,
        };
        Ok(Self {
            database_url,
            jwt,
            strict_validation,
            host,
            port,
        })
    }

    /// Only the store connection is needed by maintenance tooling.
    pub fn database_url_from_env() -> anyhow::Result<String> {
        required_var(|name| std::env::var(name).ok(), "DATABASE_URL")
    }
}

fn required_var(var: impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<String> {
    match var(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => anyhow::bail!("{name} is not defined in the environment variables"),
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
