use crate::error::{CardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub smtp: SmtpConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

/// Deployment mode; production hides error details and turns on rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub environment: Environment,
    #[serde(default = "default_body_limit")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmtpConfig {
    /// When false, e-mails are logged instead of sent
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: String,
    /// Implicit TLS; defaults to true on port 465
    pub secure: Option<bool>,
    #[serde(default = "default_true")]
    pub starttls: bool,
    /// Reject invalid certificates; defaults to true in production
    pub verify_tls: Option<bool>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
    #[serde(default = "default_greeting_timeout")]
    pub greeting_timeout_secs: u64,
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_secs: u64,
}

impl SmtpConfig {
    pub fn is_secure(&self) -> bool {
        self.secure.unwrap_or(self.port == 465)
    }

    pub fn verify_tls(&self, environment: Environment) -> bool {
        self.verify_tls.unwrap_or(environment.is_production())
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn greeting_timeout(&self) -> Duration {
        Duration::from_secs(self.greeting_timeout_secs)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Defaults to on in production, off otherwise
    pub enabled: Option<bool>,
    pub window_secs: u64,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            window_secs: 15 * 60,
            max_requests: 100,
        }
    }
}

impl RateLimitConfig {
    pub fn is_enabled(&self, environment: Environment) -> bool {
        self.enabled.unwrap_or(environment.is_production())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    pub production_origins: Vec<String>,
    pub development_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            production_origins: vec![
                "https://your-frontend-domain.vercel.app".to_string(),
                "https://thankyoucards.com".to_string(),
            ],
            development_origins: vec![
                "http://localhost:4200".to_string(),
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

impl CorsConfig {
    pub fn origins(&self, environment: Environment) -> &[String] {
        match environment {
            Environment::Production => &self.production_origins,
            Environment::Development => &self.development_origins,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_true() -> bool {
    true
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_messages() -> u32 {
    100
}

fn default_connection_timeout() -> u64 {
    60
}

fn default_greeting_timeout() -> u64 {
    30
}

fn default_socket_timeout() -> u64 {
    60
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CardError::Config(e.to_string()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CardError::Config(e.to_string()))
    }

    /// Override settings from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = var("APP_ENV").or_else(|| var("NODE_ENV")) {
            self.server.environment = Environment::parse(&env);
        }
        if let Some(port) = var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| CardError::Config(format!("Invalid PORT: {}", port)))?;
            let host = self
                .server
                .listen_addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.listen_addr = format!("{}:{}", host, port);
        }
        if let Some(host) = var("SMTP_HOST") {
            self.smtp.host = host;
        }
        if let Some(port) = var("SMTP_PORT") {
            self.smtp.port = port
                .parse()
                .map_err(|_| CardError::Config(format!("Invalid SMTP_PORT: {}", port)))?;
        }
        if let Some(user) = var("SMTP_USER").filter(|v| !v.is_empty()) {
            self.smtp.username = Some(user);
        }
        if let Some(pass) = var("SMTP_PASS").filter(|v| !v.is_empty()) {
            self.smtp.password = Some(pass);
        }
        if let Some(from) = var("FROM_EMAIL") {
            self.smtp.from_email = from;
        }
        if let Some(name) = var("FROM_NAME") {
            self.smtp.from_name = name;
        }
        if let Some(url) = var("DATABASE_URL") {
            self.storage.backend = StorageBackend::Sqlite;
            self.storage.database_url = url;
        }
        Ok(())
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: "0.0.0.0:3000".to_string(),
                environment: Environment::Development,
                max_body_bytes: default_body_limit(),
            },
            smtp: SmtpConfig {
                enabled: true,
                host: "localhost".to_string(),
                port: 1026,
                username: None,
                password: None,
                from_email: "noreply@thankyoucards.local".to_string(),
                from_name: "Thank You Cards".to_string(),
                secure: None,
                starttls: true,
                verify_tls: None,
                max_connections: default_max_connections(),
                max_messages: default_max_messages(),
                connection_timeout_secs: default_connection_timeout(),
                greeting_timeout_secs: default_greeting_timeout(),
                socket_timeout_secs: default_socket_timeout(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                database_url: "sqlite://cards.db".to_string(),
            },
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_development() {
        let config = Config::default();
        assert_eq!(config.server.environment, Environment::Development);
        assert!(!config.rate_limit.is_enabled(config.server.environment));
        assert!(!config.smtp.verify_tls(config.server.environment));
        assert!(!config.smtp.is_secure());
        assert_eq!(config.smtp.endpoint(), "localhost:1026");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NODE_ENV", "production"),
            ("PORT", "8080"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASS", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert!(config.server.environment.is_production());
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.smtp.endpoint(), "smtp.example.com:465");
        assert!(config.smtp.is_secure());
        assert_eq!(config.smtp.username.as_deref(), Some("mailer"));
        assert!(config.smtp.password.is_none());
        assert!(config.rate_limit.is_enabled(config.server.environment));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_vars(|key| (key == "SMTP_PORT").then(|| "abc".to_string()));
        assert!(matches!(result, Err(CardError::Config(_))));
    }

    #[test]
    fn test_from_toml_fills_optional_sections() {
        let config = Config::from_toml(
            r#"
            [server]
            listen_addr = "127.0.0.1:3000"
            environment = "production"

            [smtp]
            host = "mail.example.com"
            port = 587
            from_email = "cards@example.com"
            from_name = "Cards"

            [storage]
            backend = "sqlite"
            database_url = "sqlite::memory:"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.smtp.max_connections, 5);
        assert_eq!(config.smtp.max_messages, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert!(config.smtp.verify_tls(config.server.environment));
        assert_eq!(config.cors.origins(Environment::Production).len(), 2);
    }
}
