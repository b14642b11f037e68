use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.read_timeout_ms == 0 || self.server.write_timeout_ms == 0 {
            return Err("server timeouts must be > 0".into());
        }
        // Upstream validations
        if self.upstream.probe_timeout_ms == 0 {
            return Err("upstream.probe_timeout_ms must be > 0".into());
        }
        if self.upstream.probe_concurrency == 0 {
            return Err("upstream.probe_concurrency must be > 0".into());
        }
        if !self.upstream.calendar_url_template.contains("{service}")
            || !self.upstream.calendar_url_template.contains("{location}")
        {
            return Err(
                "upstream.calendar_url_template must contain {service} and {location}".into(),
            );
        }
        if !self.upstream.locations_url_template.contains("{service}") {
            return Err("upstream.locations_url_template must contain {service}".into());
        }
        // Push validations
        if self.push.server_key.is_empty() {
            return Err("push.server_key must be set".into());
        }
        if self.push.send_timeout_ms == 0 {
            return Err("push.send_timeout_ms must be > 0".into());
        }
        // Poll validations
        if self.poll.trigger_secret.is_empty() {
            return Err("poll.trigger_secret must be set".into());
        }
        if self.poll.max_subscription_age_days == 0 {
            return Err("poll.max_subscription_age_days must be > 0".into());
        }
        // Storage validation
        if self.storage.backend != "memory" {
            return Err("storage.backend must be 'memory'".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Returns the base URL for the server.
    /// If `base_url` is configured, returns that; otherwise computes from host:port.
    pub fn base_url(&self) -> String {
        self.server
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.probe_timeout_ms)
    }

    pub fn push_send_timeout(&self) -> Duration {
        Duration::from_millis(self.push.send_timeout_ms)
    }

    pub fn max_subscription_age(&self) -> time::Duration {
        time::Duration::days(i64::from(self.poll.max_subscription_age_days))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL for the server, used in links and responses.
    /// If not set, defaults to http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u32,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u32,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_read_timeout_ms() -> u32 {
    15_000
}
fn default_write_timeout_ms() -> u32 {
    15_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

/// Booking-site endpoints the engine polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Calendar endpoint; `{service}` and `{location}` are substituted per
    /// probe.
    #[serde(default = "default_calendar_url_template")]
    pub calendar_url_template: String,
    /// Listing of bookable services.
    #[serde(default = "default_services_url")]
    pub services_url: String,
    /// Listing of a service's locations; `{service}` is substituted.
    #[serde(default = "default_locations_url_template")]
    pub locations_url_template: String,
    /// Independent timeout for each probe.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Upper bound on concurrently outstanding probes per tick.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
}

fn default_calendar_url_template() -> String {
    "http://www.valencia.es/qsige.localizador/citaPrevia/disponible/centro/{location}/servicio/{service}/calendario".into()
}
fn default_services_url() -> String {
    "https://www.valencia.es/qsige.localizador/citaPrevia/servicios/disponibles/".into()
}
fn default_locations_url_template() -> String {
    "http://www.valencia.es/qsige.localizador/citaPrevia/centros/servicio/disponible/{service}"
        .into()
}
fn default_probe_timeout_ms() -> u64 {
    5_000
}
fn default_probe_concurrency() -> usize {
    8
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            calendar_url_template: default_calendar_url_template(),
            services_url: default_services_url(),
            locations_url_template: default_locations_url_template(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_concurrency: default_probe_concurrency(),
        }
    }
}

/// Push provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_endpoint")]
    pub endpoint: String,
    /// Provider server key. Usually supplied via SLOTWATCH_PUSH_SERVER_KEY.
    #[serde(default)]
    pub server_key: String,
    #[serde(default = "default_icon_url")]
    pub icon_url: String,
    /// Click-through target of every notification.
    #[serde(default = "default_portal_url")]
    pub portal_url: String,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

fn default_push_endpoint() -> String {
    "https://fcm.googleapis.com/fcm/send".into()
}
fn default_icon_url() -> String {
    "https://www.valencia.es/qsige.localizador/img/logo.png".into()
}
fn default_portal_url() -> String {
    "https://www.valencia.es/cas/tramites/cita-previa".into()
}
fn default_send_timeout_ms() -> u64 {
    10_000
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: default_push_endpoint(),
            server_key: String::new(),
            icon_url: default_icon_url(),
            portal_url: default_portal_url(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

/// Tick trigger and reconciliation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Bearer credential the external scheduler must present. Usually
    /// supplied via SLOTWATCH_TRIGGER_SECRET.
    #[serde(default)]
    pub trigger_secret: String,
    /// Watches older than this are pruned regardless of delivery history.
    #[serde(default = "default_max_subscription_age_days")]
    pub max_subscription_age_days: u32,
}

fn default_max_subscription_age_days() -> u32 {
    60
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            trigger_secret: String::new(),
            max_subscription_age_days: default_max_subscription_age_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

fn default_storage_backend() -> String {
    "memory".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file; `None` yields the defaults.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

/// Applies secret overrides from the environment, so credentials never have
/// to live in the config file.
pub fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(secret) = std::env::var("SLOTWATCH_TRIGGER_SECRET") {
        if !secret.is_empty() {
            cfg.poll.trigger_secret = secret;
        }
    }
    if let Ok(key) = std::env::var("SLOTWATCH_PUSH_SERVER_KEY") {
        if !key.is_empty() {
            cfg.push.server_key = key;
        }
    }
}
