use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub posts: PostsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(cfg: &DatabaseConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            max_connections: cfg.max_connections,
            min_connections: cfg.min_connections,
            connect_timeout_secs: cfg.connect_timeout_secs,
            idle_timeout_secs: cfg.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Session lifetime and cookie attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Adds the `Secure` attribute; disable only for plain-HTTP development.
    #[serde(default = "default_true")]
    pub cookie_secure: bool,

    /// `Strict`, `Lax` or `None`.
    #[serde(default = "default_same_site")]
    pub cookie_same_site: String,

    /// How often expired sessions are swept from memory.
    #[serde(default = "default_cleanup_interval")]
    pub purge_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
            cookie_name: default_cookie_name(),
            cookie_secure: true,
            cookie_same_site: default_same_site(),
            purge_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Remote posts/comments service.
#[derive(Debug, Clone, Deserialize)]
pub struct PostsConfig {
    #[serde(default = "default_posts_base_url")]
    pub base_url: String,

    #[serde(default = "default_posts_timeout")]
    pub timeout_secs: u64,

    /// Sent as `X-Service-Token` when set.
    #[serde(default)]
    pub service_token: String,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            base_url: default_posts_base_url(),
            timeout_secs: default_posts_timeout(),
            service_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Lifetime of friend-request and event-invite notifications.
    #[serde(default = "default_notification_ttl_days")]
    pub ttl_days: i64,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_notification_ttl_days(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_session_ttl_days() -> i64 {
    domain::services::DEFAULT_SESSION_TTL_DAYS
}
fn default_cookie_name() -> String {
    "session_id".to_string()
}
fn default_true() -> bool {
    true
}
fn default_same_site() -> String {
    "Lax".to_string()
}
fn default_posts_base_url() -> String {
    "http://backend_python:8000".to_string()
}
fn default_posts_timeout() -> u64 {
    10
}
fn default_notification_ttl_days() -> i64 {
    domain::services::DEFAULT_NOTIFICATION_TTL_DAYS
}
fn default_cleanup_interval() -> u64 {
    3600
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml (optional)
    /// 2. config/local.toml (optional, not in git)
    /// 3. Environment variables with SQUADRA__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("SQUADRA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Built entirely from embedded defaults so tests never touch config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [session]
            ttl_days = 7
            cookie_name = "session_id"
            cookie_secure = false
            cookie_same_site = "Lax"
            purge_interval_secs = 3600

            [posts]
            base_url = "http://backend_python:8000"
            timeout_secs = 10

            [notifications]
            ttl_days = 30
            cleanup_interval_secs = 3600

            [security]
            cors_origins = []
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        // Validation is left to the caller so partial configs can be inspected.
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SQUADRA__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.session.ttl_days <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "session.ttl_days must be positive".to_string(),
            ));
        }

        if self.session.purge_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "session.purge_interval_secs must be positive".to_string(),
            ));
        }

        if self.notifications.cleanup_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "notifications.cleanup_interval_secs must be positive".to_string(),
            ));
        }

        if reqwest::Url::parse(&self.posts.base_url).is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "posts.base_url is not a valid URL: {}",
                self.posts.base_url
            )));
        }

        if !matches!(self.session.cookie_same_site.as_str(), "Strict" | "Lax" | "None") {
            return Err(ConfigValidationError::InvalidValue(
                "session.cookie_same_site must be Strict, Lax or None".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session.ttl_days)
    }

    pub fn notification_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.notifications.ttl_days)
    }
}
