use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub api_keys: String,
    pub repair_sample_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: lookup("HOST").context("Cannot load HOST env variable")?,
            port: lookup("PORT")
                .context("Cannot load PORT env variable")?
                .parse::<u16>()
                .context("PORT must be a number")?,
            database_url: lookup("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .map(|v| v.parse::<u32>())
                .transpose()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?
                .unwrap_or(10),
            api_keys: lookup("API_KEYS").unwrap_or_default(),
            repair_sample_limit: lookup("REPAIR_SAMPLE_LIMIT")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("REPAIR_SAMPLE_LIMIT must be a number")?
                .unwrap_or(storage::services::participant_count::DEFAULT_REPAIR_SAMPLE_LIMIT),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn optional_settings_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/padel"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.repair_sample_limit, 50);
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "eighty"),
            ("DATABASE_URL", "postgres://localhost/padel"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn missing_database_url_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("HOST", "0.0.0.0"), ("PORT", "8080")]));
        assert!(result.is_err());
    }
}
