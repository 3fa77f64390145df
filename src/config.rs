// src/config.rs
use anyhow::{Context, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BASE_URL: &str = "https://api.navy/v1";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub base_url: String,
    /// Fallback credential for submissions that carry no key.
    pub api_key: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let max_upload_bytes = match lookup("FLUX_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("FLUX_MAX_UPLOAD_BYTES is not a byte count: {raw}"))?,
            None => defaults.max_upload_bytes,
        };

        Ok(Self {
            bind_addr: lookup("FLUX_BIND_ADDR").unwrap_or(defaults.bind_addr),
            base_url: lookup("FLUX_BASE_URL").unwrap_or(defaults.base_url),
            api_key: lookup("FLUX_API_KEY").filter(|key| !key.trim().is_empty()),
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_env() {
        assert_eq!(settings(&[]).unwrap(), Settings::default());
    }

    #[test]
    fn env_overrides_defaults() {
        let s = settings(&[
            ("FLUX_BIND_ADDR", "127.0.0.1:9000"),
            ("FLUX_BASE_URL", "http://localhost:4000/v1"),
            ("FLUX_API_KEY", "sk-local"),
            ("FLUX_MAX_UPLOAD_BYTES", "2048"),
        ])
        .unwrap();

        assert_eq!(s.bind_addr, "127.0.0.1:9000");
        assert_eq!(s.base_url, "http://localhost:4000/v1");
        assert_eq!(s.api_key.as_deref(), Some("sk-local"));
        assert_eq!(s.max_upload_bytes, 2048);
    }

    #[test]
    fn blank_key_counts_as_unset() {
        assert_eq!(settings(&[("FLUX_API_KEY", "  ")]).unwrap().api_key, None);
    }

    #[test]
    fn bad_upload_limit_fails() {
        let err = settings(&[("FLUX_MAX_UPLOAD_BYTES", "lots")]).unwrap_err();
        assert!(err.to_string().contains("FLUX_MAX_UPLOAD_BYTES"));
    }
}
