use crate::error::ConfigError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|value| !value.trim().is_empty());
        let max_connections = match lookup("GRADES_DB_MAX_CONNECTIONS") {
            Some(value) => {
                let parsed = value.trim().parse::<u32>().ok().filter(|count| *count > 0);
                parsed.ok_or(ConfigError::Invalid {
                    name: "GRADES_DB_MAX_CONNECTIONS",
                    value,
                })?
            }
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.max_connections, 5);
        assert!(matches!(
            settings.database_url(),
            Err(ConfigError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn reads_database_settings() {
        let settings = settings(&[
            ("DATABASE_URL", "postgres://localhost/grades"),
            ("GRADES_DB_MAX_CONNECTIONS", "12"),
        ])
        .unwrap();
        assert_eq!(settings.database_url().unwrap(), "postgres://localhost/grades");
        assert_eq!(settings.max_connections, 12);
    }

    #[test]
    fn rejects_bad_pool_size() {
        assert!(matches!(
            settings(&[("GRADES_DB_MAX_CONNECTIONS", "zero")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(settings(&[("GRADES_DB_MAX_CONNECTIONS", "0")]).is_err());
    }

    #[test]
    fn blank_database_url_counts_as_missing() {
        let settings = settings(&[("DATABASE_URL", "  ")]).unwrap();
        assert!(settings.database_url.is_none());
    }
}
