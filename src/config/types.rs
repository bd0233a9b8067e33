use crate::scheduler::{DataArgs, RequestArgs};
use serde::Deserialize;

/// Main configuration structure of the finder
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URL the crawl starts from
    #[serde(rename = "first-url")]
    pub first_url: String,

    /// Frontier parameters
    pub request: RequestArgs,

    /// Buffer pool parameters
    pub data: DataArgs,

    #[serde(default)]
    pub components: ComponentsConfig,

    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    pub output: OutputConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// How many components of each role to create
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComponentsConfig {
    pub downloaders: u32,
    pub analyzers: u32,
    pub pipelines: u32,

    /// Whether pipelines stop at the first failing processor
    #[serde(rename = "fail-fast")]
    pub fail_fast: bool,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            downloaders: 1,
            analyzers: 1,
            pipelines: 1,
            fail_fast: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory images are saved into
    pub dir: String,
}

/// Monitor configuration
///
/// Values below the monitor's lower bounds are raised to them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Pause between two idle checks (milliseconds)
    #[serde(rename = "check-interval-ms")]
    pub check_interval_ms: u64,

    /// Pause between two summary records (milliseconds)
    #[serde(rename = "summarize-interval-ms")]
    pub summarize_interval_ms: u64,

    /// Consecutive idle checks before the crawl counts as finished
    #[serde(rename = "max-idle-count")]
    pub max_idle_count: u32,

    /// Whether to stop the scheduler once the crawl is finished
    #[serde(rename = "auto-stop")]
    pub auto_stop: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 1000,
            summarize_interval_ms: 1000,
            max_idle_count: 10,
            auto_stop: true,
        }
    }
}
