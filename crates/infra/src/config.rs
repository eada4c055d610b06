use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use bazaar_listings::ResubmissionPolicy;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "bazaar-dev-secret-change-me";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres event store when set; in-memory otherwise.
    pub database_url: Option<String>,
    pub resubmission_policy: ResubmissionPolicy,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8080")?;

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let resubmission_policy = match lookup("RESUBMISSION_POLICY") {
            Some(raw) => raw
                .parse::<ResubmissionPolicy>()
                .with_context(|| format!("RESUBMISSION_POLICY '{raw}' is not restart or return_to_stage"))?,
            None => ResubmissionPolicy::default(),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url,
            resubmission_policy,
        })
    }
}
