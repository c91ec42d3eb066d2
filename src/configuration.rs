use config::ConfigError;
use std::fmt;
use std::time::Duration;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub cookie: CookieSettings,
    #[serde(default)]
    pub store: StoreSettings,
    /// Postgres backing store. Without it the in-memory store is used.
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// JWT signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_access_token_expiry_minutes")]
    pub access_token_expiry_minutes: i64,
    #[serde(default = "default_refresh_token_expiry_days")]
    pub refresh_token_expiry_days: i64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl JwtSettings {
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }

    pub fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_expiry_days * 24 * 60 * 60
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[REDACTED]")
            .field("access_token_expiry_minutes", &self.access_token_expiry_minutes)
            .field("refresh_token_expiry_days", &self.refresh_token_expiry_days)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct CookieSettings {
    /// Overrides the environment default (secure only in production).
    pub secure: Option<bool>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct StoreSettings {
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .finish()
    }
}

impl Settings {
    pub fn cookie_secure(&self) -> bool {
        self.cookie
            .secure
            .unwrap_or_else(|| self.application.environment.is_production())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message("jwt.secret is required".to_string()));
        }
        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(ConfigError::Message(
                "jwt.access_token_expiry_minutes must be positive".to_string(),
            ));
        }
        if self.jwt.refresh_token_expiry_days <= 0 {
            return Err(ConfigError::Message(
                "jwt.refresh_token_expiry_days must be positive".to_string(),
            ));
        }
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::Message("store.timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_access_token_expiry_minutes() -> i64 {
    30
}

fn default_refresh_token_expiry_days() -> i64 {
    30
}

fn default_issuer() -> String {
    "simple-auth".to_string()
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_max_connections() -> u32 {
    5
}

/// Load settings from `configuration.*` and `APP_`-prefixed variables,
/// e.g. `APP_JWT__SECRET` or `APP_APPLICATION__ENVIRONMENT=production`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.port", 3000)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
