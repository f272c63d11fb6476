//! Configuration model for the hatchery orchestrator.

use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Root directory for generated artifact workspaces
    #[serde(default = "default_workspace_root")]
    pub workspace_root: String,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generation pipeline configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Deployment configuration
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Quality monitoring configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Control loop configuration
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_workspace_root() -> String {
    ".hatchery/workspace".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            generation: GenerationConfig::default(),
            deploy: DeployConfig::default(),
            monitor: MonitorConfig::default(),
            daemon: DaemonConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".hatchery/hatchery.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Generation pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Default model identifier used when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Remote pipeline endpoint. When unset, the embedded stub pipeline
    /// is used instead.
    #[serde(default)]
    pub pipeline_endpoint: Option<String>,

    /// Upper bound on one pipeline invocation
    #[serde(default = "default_pipeline_timeout_secs")]
    pub pipeline_timeout_secs: u64,

    /// Expected generation duration, drives the display-only progress
    /// estimate
    #[serde(default = "default_expected_duration_secs")]
    pub expected_duration_secs: u64,
}

fn default_model() -> String {
    "anthropic/claude-3.5-sonnet".to_string()
}

const fn default_pipeline_timeout_secs() -> u64 {
    1_800
}

const fn default_expected_duration_secs() -> u64 {
    300
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            pipeline_endpoint: None,
            pipeline_timeout_secs: default_pipeline_timeout_secs(),
            expected_duration_secs: default_expected_duration_secs(),
        }
    }
}

/// Deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeployConfig {
    /// First port of the allocation range (inclusive)
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// End of the allocation range (exclusive)
    #[serde(default = "default_max_port")]
    pub max_port: u16,

    /// Host used when constructing externally reachable URLs
    #[serde(default = "default_public_host")]
    pub public_host: String,

    /// Interface the process host binds to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Command template for the process host. Placeholders: {module},
    /// {symbol}, {host}, {port}.
    #[serde(default = "default_command_template")]
    pub command_template: Vec<String>,

    /// Symbol served when static detection finds nothing conclusive
    #[serde(default = "default_entry_symbol")]
    pub default_entry_symbol: String,

    /// How long the precheck probe waits before declaring the process alive
    #[serde(default = "default_precheck_wait_ms")]
    pub precheck_wait_ms: u64,

    /// Graceful-stop timeout before escalating to a forceful kill
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// Upper bound on captured crash output, per stream
    #[serde(default = "default_diagnostic_tail_bytes")]
    pub diagnostic_tail_bytes: usize,

    /// Health check probe timeout
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
}

const fn default_base_port() -> u16 {
    8100
}

const fn default_max_port() -> u16 {
    8200
}

fn default_public_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_command_template() -> Vec<String> {
    [
        "python3",
        "-m",
        "uvicorn",
        "{module}:{symbol}",
        "--host",
        "{host}",
        "--port",
        "{port}",
        "--workers",
        "1",
        "--log-level",
        "info",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_entry_symbol() -> String {
    "app".to_string()
}

const fn default_precheck_wait_ms() -> u64 {
    800
}

const fn default_stop_timeout_secs() -> u64 {
    5
}

const fn default_diagnostic_tail_bytes() -> usize {
    8_192
}

const fn default_health_timeout_secs() -> u64 {
    5
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            base_port: default_base_port(),
            max_port: default_max_port(),
            public_host: default_public_host(),
            bind_host: default_bind_host(),
            command_template: default_command_template(),
            default_entry_symbol: default_entry_symbol(),
            precheck_wait_ms: default_precheck_wait_ms(),
            stop_timeout_secs: default_stop_timeout_secs(),
            diagnostic_tail_bytes: default_diagnostic_tail_bytes(),
            health_timeout_secs: default_health_timeout_secs(),
        }
    }
}

/// Quality monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    /// Error-rate threshold, as a fraction
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,

    /// P99 latency threshold in milliseconds
    #[serde(default = "default_p99_latency_threshold_ms")]
    pub p99_latency_threshold_ms: f64,

    /// Average latency threshold in milliseconds (report display only)
    #[serde(default = "default_avg_latency_threshold_ms")]
    pub avg_latency_threshold_ms: f64,

    /// Minimum invocations in the window before evaluation is meaningful
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,
}

const fn default_error_rate_threshold() -> f64 {
    0.05
}

const fn default_p99_latency_threshold_ms() -> f64 {
    1_000.0
}

const fn default_avg_latency_threshold_ms() -> f64 {
    500.0
}

const fn default_min_sample_size() -> u64 {
    5
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            error_rate_threshold: default_error_rate_threshold(),
            p99_latency_threshold_ms: default_p99_latency_threshold_ms(),
            avg_latency_threshold_ms: default_avg_latency_threshold_ms(),
            min_sample_size: default_min_sample_size(),
        }
    }
}

/// Control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DaemonConfig {
    /// Seconds between control loop ticks
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Minutes after which a Generating record is declared stuck
    #[serde(default = "default_stuck_timeout_mins")]
    pub stuck_timeout_mins: i64,

    /// Days of invocation telemetry to retain
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Whether degraded deployed artifacts are automatically refined
    #[serde(default = "default_enable_auto_refine")]
    pub enable_auto_refine: bool,
}

const fn default_tick_interval_secs() -> u64 {
    5
}

const fn default_stuck_timeout_mins() -> i64 {
    30
}

const fn default_retention_days() -> i64 {
    7
}

const fn default_enable_auto_refine() -> bool {
    true
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            stuck_timeout_mins: default_stuck_timeout_mins(),
            retention_days: default_retention_days(),
            enable_auto_refine: default_enable_auto_refine(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotifyConfig {
    /// Webhook URL for completion/error pushes. Unset disables pushes.
    #[serde(default)]
    pub webhook_url: Option<String>,
}
