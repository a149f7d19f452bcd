use std::env;

/// Invalid or inconsistent environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid port number, got '{value}'")]
    InvalidPort { name: &'static str, value: String },

    #[error("ADMIN_USERNAME and ADMIN_PASSWORD must be set together")]
    PartialAdmin,
}

/// Credentials for the admin account created at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    /// Default log filter; `RUST_LOG` takes precedence.
    pub log_level: String,
    pub admin: Option<AdminCredentials>,
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_port = match non_empty("SERVER_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort {
                name: "SERVER_PORT",
                value: raw,
            })?,
            None => 8080,
        };

        let admin = match (non_empty("ADMIN_USERNAME"), non_empty("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialAdmin),
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            server_port,
            server_host: non_empty("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            admin,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
