use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub ledger_path: String,
    pub spark_url: String,
    pub mlr3_url: String,
    pub default_owner: String,
    /// None waits on the oracle for as long as it takes.
    pub oracle_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_addr = or("VALIDATOR_BIND_ADDR", "0.0.0.0:9111");
        let ledger_path = or("LEDGER_PATH", "validator_ledger.json");
        let spark_url = or("ORACLE_SPARK_URL", "http://127.0.0.1:8080");
        let mlr3_url = or("ORACLE_MLR3_URL", "http://127.0.0.1:1030");
        let default_owner = or("DEFAULT_OWNER", "owner");

        let oracle_timeout = match lookup("ORACLE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("ORACLE_TIMEOUT_SECS is not a number: {raw:?}"))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        // Tiny sanity checks (fail fast, fail loud)
        if !spark_url.starts_with("http://") && !spark_url.starts_with("https://") {
            bail!("ORACLE_SPARK_URL must start with http:// or https://");
        }
        if !mlr3_url.starts_with("http://") && !mlr3_url.starts_with("https://") {
            bail!("ORACLE_MLR3_URL must start with http:// or https://");
        }
        if default_owner.trim().is_empty() {
            bail!("DEFAULT_OWNER must not be empty");
        }

        Ok(Self {
            bind_addr,
            ledger_path,
            spark_url,
            mlr3_url,
            default_owner,
            oracle_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9111");
        assert_eq!(cfg.default_owner, "owner");
        assert!(cfg.oracle_timeout.is_none());
    }

    #[test]
    fn timeout_parses() {
        let cfg = AppConfig::from_lookup(lookup(&[("ORACLE_TIMEOUT_SECS", "15")])).unwrap();
        assert_eq!(cfg.oracle_timeout, Some(Duration::from_secs(15)));
        assert!(AppConfig::from_lookup(lookup(&[("ORACLE_TIMEOUT_SECS", "soon")])).is_err());
    }

    #[test]
    fn oracle_urls_must_be_http() {
        let err = AppConfig::from_lookup(lookup(&[("ORACLE_MLR3_URL", "192.168.144.3:1030")])).unwrap_err();
        assert!(err.to_string().contains("ORACLE_MLR3_URL"));
    }
}
