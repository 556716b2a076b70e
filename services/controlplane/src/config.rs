use crate::governance::{DEFAULT_CACHE_TTL, DEFAULT_STORE_TIMEOUT, EngineSettings};
use crate::store::StoreConfig;
use anyhow::{Context, Result};
use gatehouse_authz::ActorId;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_ACCESS_LOG_RETENTION: usize = 100_000;

// Governance service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct GovernanceConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub cache_ttl: Duration,
    pub store_timeout: Duration,
    pub access_log_retention: usize,
    pub log_granted_attempts: bool,
    pub bootstrap_admin: Option<ActorId>,
}

#[derive(Debug, Deserialize)]
struct GovernanceConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    cache_ttl_secs: Option<u64>,
    store_timeout_ms: Option<u64>,
    access_log_retention: Option<usize>,
    log_granted_attempts: Option<bool>,
    bootstrap_admin: Option<String>,
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("parse {key}")),
        Err(_) => Ok(None),
    }
}

fn actor_from(value: String) -> Option<ActorId> {
    let value = value.trim();
    (!value.is_empty()).then(|| ActorId::new(value))
}

impl GovernanceConfig {
    pub fn from_env() -> Result<Self> {
        let metrics_bind = std::env::var("GATEHOUSE_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse GATEHOUSE_METRICS_BIND")?;
        let bind_addr = std::env::var("GATEHOUSE_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse GATEHOUSE_BIND")?;
        let cache_ttl = env_parse::<u64>("GATEHOUSE_CACHE_TTL_SECS")?
            .map_or(DEFAULT_CACHE_TTL, Duration::from_secs);
        let store_timeout = env_parse::<u64>("GATEHOUSE_STORE_TIMEOUT_MS")?
            .map_or(DEFAULT_STORE_TIMEOUT, Duration::from_millis);
        let access_log_retention = env_parse("GATEHOUSE_ACCESS_LOG_RETENTION")?
            .unwrap_or(DEFAULT_ACCESS_LOG_RETENTION);
        let log_granted_attempts = env_parse("GATEHOUSE_LOG_GRANTED_ATTEMPTS")?.unwrap_or(true);
        let bootstrap_admin = std::env::var("GATEHOUSE_BOOTSTRAP_ADMIN")
            .ok()
            .and_then(actor_from);
        Ok(Self {
            bind_addr,
            metrics_bind,
            cache_ttl,
            store_timeout,
            access_log_retention,
            log_granted_attempts,
            bootstrap_admin,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("GATEHOUSE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read GATEHOUSE_CONFIG: {path}"))?;
            let override_cfg: GovernanceConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse gatehouse config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.cache_ttl_secs {
                config.cache_ttl = Duration::from_secs(value);
            }
            if let Some(value) = override_cfg.store_timeout_ms {
                config.store_timeout = Duration::from_millis(value);
            }
            if let Some(value) = override_cfg.access_log_retention {
                config.access_log_retention = value;
            }
            if let Some(value) = override_cfg.log_granted_attempts {
                config.log_granted_attempts = value;
            }
            if let Some(value) = override_cfg.bootstrap_admin {
                config.bootstrap_admin = actor_from(value);
            }
        }
        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            cache_ttl: self.cache_ttl,
            store_timeout: self.store_timeout,
            log_granted_attempts: self.log_granted_attempts,
            ..EngineSettings::default()
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            access_log_retention: self.access_log_retention,
        }
    }
}
