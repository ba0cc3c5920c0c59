use chrono::{Offset, Utc};
use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub portal: PortalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Root of the barangay REST backend, e.g. `http://localhost:4000/api`.
    pub base_url: String,
    pub timeout_secs: u64,
    /// Cookie name the backend expects its session token under.
    pub session_cookie: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub csrf_secret: String,
    pub session_duration_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    /// Delay added to "publish now" so the backend's activation job sees a
    /// future instant.
    pub publish_buffer_secs: i64,
    /// Offset used to interpret the schedule date/time typed by staff.
    pub utc_offset_minutes: i32,
    pub max_upload_bytes: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            publish_buffer_secs: 120,
            utc_offset_minutes: 8 * 60,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl PortalConfig {
    pub fn publish_buffer(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.publish_buffer_secs.max(1))
    }

    pub fn utc_offset(&self) -> chrono::FixedOffset {
        chrono::FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("backend.base_url", "http://localhost:4000/api")?
            .set_default("backend.timeout_secs", 15)?
            .set_default("backend.session_cookie", "sid")?
            .set_default("auth.csrf_secret", "change-me-in-production")?
            .set_default("auth.session_duration_hours", 24)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with BARANGAY__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("BARANGAY").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
                secure_cookies: false,
            },
            backend: BackendConfig {
                base_url: "http://localhost:4000/api".to_string(),
                timeout_secs: 15,
                session_cookie: "sid".to_string(),
            },
            auth: AuthConfig {
                csrf_secret: "change-me-in-production".to_string(),
                session_duration_hours: 24,
            },
            portal: PortalConfig::default(),
        }
    }
}
