//! Process configuration, read from the environment at startup.

use std::net::SocketAddr;

use anyhow::{Context, bail};

use stockledger_infra::ListingSettings;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres when set, in-memory store otherwise.
    pub database_url: Option<String>,
    pub listing: ListingSettings,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8080")?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let defaults = ListingSettings::default();
        let low_stock_threshold = match get("LOW_STOCK_THRESHOLD") {
            Some(raw) => raw
                .parse::<i64>()
                .with_context(|| format!("LOW_STOCK_THRESHOLD must be an integer, got '{raw}'"))?,
            None => defaults.low_stock_threshold,
        };
        let page_size = match get("PAGE_SIZE") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("PAGE_SIZE must be a positive integer, got '{raw}'"))?,
            None => defaults.page_size,
        };
        if page_size == 0 {
            bail!("PAGE_SIZE must be at least 1");
        }

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url: get("DATABASE_URL"),
            listing: ListingSettings {
                low_stock_threshold,
                page_size,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ApiConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.listing, ListingSettings::default());
    }

    #[test]
    fn reads_every_setting() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/stock"),
            ("LOW_STOCK_THRESHOLD", "10"),
            ("PAGE_SIZE", "25"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/stock"));
        assert_eq!(cfg.listing.low_stock_threshold, 10);
        assert_eq!(cfg.listing.page_size, 25);
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let cfg = config(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(cfg.database_url, None);
    }

    #[test]
    fn invalid_values_fail_startup() {
        assert!(config(&[("LOW_STOCK_THRESHOLD", "five")]).is_err());
        assert!(config(&[("PAGE_SIZE", "0")]).is_err());
        assert!(config(&[("PAGE_SIZE", "-3")]).is_err());
        assert!(config(&[("BIND_ADDR", "not-an-addr")]).is_err());
    }
}
