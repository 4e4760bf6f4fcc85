//! Process configuration.
//!
//! All settings are read from `APPLINKS_*` environment variables exactly once
//! at startup and carried in a single validated struct. The core never looks
//! up configuration keys at request time.

use crate::{ApplinksError, Result};
use std::env;
use std::time::Duration;

pub const GRAFANA_BASE_URL_VAR: &str = "APPLINKS_GRAFANA_BASE_URL";
pub const VAULT_BASE_URL_VAR: &str = "APPLINKS_VAULT_BASE_URL";
pub const CACHE_URL_VAR: &str = "APPLINKS_CACHE_URL";
pub const CAPTAIN_DOMAIN_VAR: &str = "APPLINKS_CAPTAIN_DOMAIN";
pub const TEMPO_DATASOURCE_UID_VAR: &str = "APPLINKS_TEMPO_DATASOURCE_UID";
pub const ARGOCD_NAMESPACE_VAR: &str = "APPLINKS_ARGOCD_NAMESPACE";
pub const CACHE_TTL_SECONDS_VAR: &str = "APPLINKS_CACHE_TTL_SECONDS";
pub const CACHE_TIMEOUT_MS_VAR: &str = "APPLINKS_CACHE_TIMEOUT_MS";
pub const LOOKUP_TIMEOUT_MS_VAR: &str = "APPLINKS_LOOKUP_TIMEOUT_MS";
pub const MAX_ROWS_VAR: &str = "APPLINKS_MAX_ROWS";
pub const BIND_VAR: &str = "APPLINKS_BIND";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the dashboard tool, no trailing slash.
    pub grafana_base_url: String,
    /// Base URL of the secret-management tool, no trailing slash.
    pub vault_base_url: String,
    /// Cache store URL (`redis://...`). Absent means in-process cache.
    pub cache_url: Option<String>,
    /// Captain domain used by the static quick links.
    pub captain_domain: String,
    /// Grafana datasource UID for trace search links.
    pub tempo_datasource_uid: Option<String>,
    /// Control namespace where Argo CD Application objects live.
    pub argocd_namespace: String,
    pub cache_ttl: Duration,
    pub cache_timeout: Duration,
    pub lookup_timeout: Duration,
    /// UI row-count hint, passed through to the catalog untouched.
    pub max_rows: u32,
    pub bind: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings = Self {
            grafana_base_url: required_url(&lookup, GRAFANA_BASE_URL_VAR)?,
            vault_base_url: required_url(&lookup, VAULT_BASE_URL_VAR)?,
            cache_url: optional(&lookup, CACHE_URL_VAR),
            captain_domain: optional(&lookup, CAPTAIN_DOMAIN_VAR)
                .unwrap_or_else(|| "nonprod.glueops.rocks".to_string()),
            tempo_datasource_uid: optional(&lookup, TEMPO_DATASOURCE_UID_VAR),
            argocd_namespace: optional(&lookup, ARGOCD_NAMESPACE_VAR)
                .unwrap_or_else(|| "argocd".to_string()),
            cache_ttl: Duration::from_secs(parsed(&lookup, CACHE_TTL_SECONDS_VAR, 30)?),
            cache_timeout: Duration::from_millis(parsed(&lookup, CACHE_TIMEOUT_MS_VAR, 500)?),
            lookup_timeout: Duration::from_millis(parsed(&lookup, LOOKUP_TIMEOUT_MS_VAR, 5_000)?),
            max_rows: parsed(&lookup, MAX_ROWS_VAR, 4)?,
            bind: optional(&lookup, BIND_VAR).unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(ApplinksError::Config(format!(
                "{CACHE_TTL_SECONDS_VAR} must be greater than zero"
            )));
        }
        if self.lookup_timeout.is_zero() {
            return Err(ApplinksError::Config(format!(
                "{LOOKUP_TIMEOUT_MS_VAR} must be greater than zero"
            )));
        }
        Ok(())
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_url(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    optional(lookup, name)
        .map(|v| v.trim_end_matches('/').to_string())
        .ok_or_else(|| ApplinksError::Config(format!("{name} must be set")))
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match optional(lookup, name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ApplinksError::Config(format!("{name} is not a valid number: {raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(entries: &[(&str, &str)]) -> Result<Settings> {
        let map = vars(entries);
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn missing_grafana_url_is_fatal() {
        let err = load(&[(VAULT_BASE_URL_VAR, "https://vault.example.com")])
            .expect_err("grafana url is required");
        assert!(err.to_string().contains(GRAFANA_BASE_URL_VAR));
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let settings = load(&[
            (GRAFANA_BASE_URL_VAR, "https://grafana.example.com/"),
            (VAULT_BASE_URL_VAR, "https://vault.example.com/"),
        ])
        .unwrap();
        assert_eq!(settings.grafana_base_url, "https://grafana.example.com");
        assert_eq!(settings.vault_base_url, "https://vault.example.com");
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = load(&[
            (GRAFANA_BASE_URL_VAR, "https://grafana.example.com"),
            (VAULT_BASE_URL_VAR, "https://vault.example.com"),
        ])
        .unwrap();
        assert_eq!(settings.argocd_namespace, "argocd");
        assert_eq!(settings.cache_ttl, Duration::from_secs(30));
        assert_eq!(settings.max_rows, 4);
        assert!(settings.cache_url.is_none());
        assert!(settings.tempo_datasource_uid.is_none());
    }

    #[test]
    fn empty_optional_values_are_treated_as_unset() {
        let settings = load(&[
            (GRAFANA_BASE_URL_VAR, "https://grafana.example.com"),
            (VAULT_BASE_URL_VAR, "https://vault.example.com"),
            (TEMPO_DATASOURCE_UID_VAR, ""),
        ])
        .unwrap();
        assert!(settings.tempo_datasource_uid.is_none());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = load(&[
            (GRAFANA_BASE_URL_VAR, "https://grafana.example.com"),
            (VAULT_BASE_URL_VAR, "https://vault.example.com"),
            (CACHE_TTL_SECONDS_VAR, "soon"),
        ])
        .expect_err("non-numeric ttl");
        assert!(err.to_string().contains(CACHE_TTL_SECONDS_VAR));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = load(&[
            (GRAFANA_BASE_URL_VAR, "https://grafana.example.com"),
            (VAULT_BASE_URL_VAR, "https://vault.example.com"),
            (CACHE_TTL_SECONDS_VAR, "0"),
        ])
        .expect_err("zero ttl");
        assert!(err.to_string().contains("greater than zero"));
    }
}
