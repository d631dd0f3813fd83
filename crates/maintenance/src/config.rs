use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Upper bound on any retention window, roughly a century.
const MAX_RETENTION_DAYS: u32 = 36500;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub bunny: BunnyConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply the bundled migrations on startup (local development only; the
    /// LMS owns the production schema).
    #[serde(default)]
    pub run_migrations: bool,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
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

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// How long to wait for in-flight jobs after a shutdown signal.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// First retry delay after a failed iteration; doubles per consecutive
    /// failure and never exceeds the job's own interval.
    #[serde(default = "default_retry_initial")]
    pub retry_initial_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout(),
            retry_initial_secs: default_retry_initial(),
        }
    }
}

/// Settings for a job that only needs a polling period.
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalJobConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub interval_secs: u64,
}

impl IntervalJobConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Settings for a job that purges rows older than a retention window.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionJobConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub interval_secs: u64,

    pub retention_days: u32,
}

impl RetentionJobConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Hard-delete lessons soft-deleted longer than `retention_days` ago.
    #[serde(default = "default_purge_deleted_lessons")]
    pub purge_deleted_lessons: RetentionJobConfig,

    /// Mark expired course access grants as revoked.
    #[serde(default = "default_revoke_expired_access")]
    pub revoke_expired_access: IntervalJobConfig,

    /// Delete grants revoked or expired more than `retention_days` ago.
    #[serde(default = "default_purge_stale_access")]
    pub purge_stale_access: RetentionJobConfig,

    /// Delete remote videos no live lesson references.
    #[serde(default = "default_cleanup_orphaned_videos")]
    pub cleanup_orphaned_videos: IntervalJobConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            purge_deleted_lessons: default_purge_deleted_lessons(),
            revoke_expired_access: default_revoke_expired_access(),
            purge_stale_access: default_purge_stale_access(),
            cleanup_orphaned_videos: default_cleanup_orphaned_videos(),
        }
    }
}

/// Bunny Stream API settings. Per-library API keys come from the categories table.
#[derive(Debug, Clone, Deserialize)]
pub struct BunnyConfig {
    #[serde(default = "default_bunny_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_bunny_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_bunny_page_size")]
    pub page_size: u32,
}

impl Default for BunnyConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_bunny_api_base_url(),
            request_timeout_secs: default_bunny_timeout(),
            page_size: default_bunny_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics on `listen_addr`.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_listen_addr")]
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_listen_addr(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
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
fn default_shutdown_timeout() -> u64 {
    30
}
fn default_retry_initial() -> u64 {
    30
}
fn default_purge_deleted_lessons() -> RetentionJobConfig {
    RetentionJobConfig {
        enabled: true,
        interval_secs: 86400, // daily
        retention_days: 30,
    }
}
fn default_revoke_expired_access() -> IntervalJobConfig {
    IntervalJobConfig {
        enabled: true,
        interval_secs: 900, // 15 minutes
    }
}
fn default_purge_stale_access() -> RetentionJobConfig {
    RetentionJobConfig {
        enabled: true,
        interval_secs: 86400,
        retention_days: 90,
    }
}
fn default_cleanup_orphaned_videos() -> IntervalJobConfig {
    IntervalJobConfig {
        enabled: true,
        interval_secs: 21600, // 6 hours
    }
}
fn default_bunny_api_base_url() -> String {
    "https://video.bunnycdn.com".to_string()
}
fn default_bunny_timeout() -> u64 {
    30
}
fn default_bunny_page_size() -> u32 {
    100
}
fn default_metrics_listen_addr() -> String {
    "0.0.0.0:9464".to_string()
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
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with LMS prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("LMS").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults instead of `config/` files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [database]
            url = ""
            max_connections = 5
            min_connections = 1
            connect_timeout_secs = 10
            idle_timeout_secs = 600
            run_migrations = false

            [logging]
            level = "info"
            format = "json"

            [scheduler]
            shutdown_timeout_secs = 30
            retry_initial_secs = 30

            [jobs.purge_deleted_lessons]
            enabled = true
            interval_secs = 86400
            retention_days = 30

            [jobs.revoke_expired_access]
            enabled = true
            interval_secs = 900

            [jobs.purge_stale_access]
            enabled = true
            interval_secs = 86400
            retention_days = 90

            [jobs.cleanup_orphaned_videos]
            enabled = true
            interval_secs = 21600

            [bunny]
            api_base_url = "https://video.bunnycdn.com"
            request_timeout_secs = 30
            page_size = 100

            [metrics]
            enabled = false
            listen_addr = "0.0.0.0:9464"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "LMS__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        let jobs = &self.jobs;
        let intervals = [
            ("purge_deleted_lessons", jobs.purge_deleted_lessons.enabled, jobs.purge_deleted_lessons.interval_secs),
            ("revoke_expired_access", jobs.revoke_expired_access.enabled, jobs.revoke_expired_access.interval_secs),
            ("purge_stale_access", jobs.purge_stale_access.enabled, jobs.purge_stale_access.interval_secs),
            ("cleanup_orphaned_videos", jobs.cleanup_orphaned_videos.enabled, jobs.cleanup_orphaned_videos.interval_secs),
        ];
        for (name, enabled, interval_secs) in intervals {
            if enabled && interval_secs == 0 {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "jobs.{}.interval_secs must be greater than 0",
                    name
                )));
            }
        }

        let retentions = [
            ("purge_deleted_lessons", &jobs.purge_deleted_lessons),
            ("purge_stale_access", &jobs.purge_stale_access),
        ];
        for (name, job) in retentions {
            if job.enabled && job.retention_days == 0 {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "jobs.{}.retention_days must be greater than 0",
                    name
                )));
            }
            if job.retention_days > MAX_RETENTION_DAYS {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "jobs.{}.retention_days must not exceed {}",
                    name, MAX_RETENTION_DAYS
                )));
            }
        }

        if jobs.cleanup_orphaned_videos.enabled && self.bunny.api_base_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "bunny.api_base_url is required when cleanup_orphaned_videos is enabled"
                    .to_string(),
            ));
        }

        if self.scheduler.retry_initial_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "scheduler.retry_initial_secs must be greater than 0".to_string(),
            ));
        }

        if self.metrics.enabled {
            self.metrics_addr()?;
        }

        Ok(())
    }

    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        self.metrics.listen_addr.parse().map_err(|_| {
            ConfigValidationError::InvalidValue(format!(
                "metrics.listen_addr '{}' is not a socket address",
                self.metrics.listen_addr
            ))
        })
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.scheduler.shutdown_timeout_secs)
    }
}
