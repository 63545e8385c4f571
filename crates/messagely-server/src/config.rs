use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use argon2::Params;

use messagely_api::tokens::DEFAULT_TTL_HOURS;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl_hours: i64,
    pub hash_params: Params,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("MESSAGELY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("MESSAGELY_JWT_SECRET is unset or still a placeholder");
        }

        let db_path = var("MESSAGELY_DB_PATH").unwrap_or_else(|| "messagely.db".into()).into();
        let host = var("MESSAGELY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&var, "MESSAGELY_PORT", 3000)?;
        let addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let token_ttl_hours = parse_or(&var, "MESSAGELY_TOKEN_TTL_HOURS", DEFAULT_TTL_HOURS)?;
        if token_ttl_hours <= 0 {
            bail!("MESSAGELY_TOKEN_TTL_HOURS must be positive");
        }

        let memory_kib = parse_or(&var, "MESSAGELY_HASH_MEMORY_KIB", Params::DEFAULT_M_COST)?;
        let iterations = parse_or(&var, "MESSAGELY_HASH_ITERATIONS", Params::DEFAULT_T_COST)?;
        let hash_params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow::anyhow!("invalid Argon2 parameters: {}", e))?;

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            token_ttl_hours,
            hash_params,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse().with_context(|| format!("{} is not valid: {:?}", key, raw)),
        None => Ok(default),
    }
}
