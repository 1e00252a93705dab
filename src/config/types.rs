use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for doc-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
    #[serde(default, rename = "circuit-breaker")]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl engine behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of distinct pages visited per run
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Pause between consecutive page fetches (milliseconds)
    #[serde(rename = "rate-limit-ms")]
    pub rate_limit_ms: u64,

    /// Maximum number of characters kept from a page's content
    #[serde(rename = "content-limit")]
    pub content_limit: usize,
}

impl CrawlerConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            rate_limit_ms: 500,
            content_limit: 50_000,
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

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Deployment environment, which selects the default call timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Retry and timeout settings for outbound calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub environment: Environment,

    /// Additional attempts after the first failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Overrides the environment's default page fetch timeout
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: Option<u64>,

    /// Overrides the environment's default completion timeout
    #[serde(rename = "completion-timeout-ms")]
    pub completion_timeout_ms: Option<u64>,
}

impl ResilienceConfig {
    pub fn fetch_timeout(&self) -> Duration {
        let default_ms = match self.environment {
            Environment::Development => 10_000,
            Environment::Production => 30_000,
        };
        Duration::from_millis(self.fetch_timeout_ms.unwrap_or(default_ms))
    }

    pub fn completion_timeout(&self) -> Duration {
        let default_ms = match self.environment {
            Environment::Development => 30_000,
            Environment::Production => 60_000,
        };
        Duration::from_millis(self.completion_timeout_ms.unwrap_or(default_ms))
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            max_retries: 3,
            fetch_timeout_ms: None,
            completion_timeout_ms: None,
        }
    }
}

/// Circuit breaker guarding the completion service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Terminal failures needed to open the breaker
    #[serde(rename = "failure-threshold")]
    pub failure_threshold: u32,

    /// Cooldown after the last failure before calls are attempted again (milliseconds)
    #[serde(rename = "reset-timeout-ms")]
    pub reset_timeout_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
        }
    }
}

/// Documentation search strategy settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on each strategy's running time (milliseconds)
    #[serde(rename = "strategy-timeout-ms")]
    pub strategy_timeout_ms: u64,

    /// Retries for a single strategy probe
    #[serde(rename = "probe-retries")]
    pub probe_retries: u32,

    /// Base URL of the DevDocs site
    #[serde(rename = "devdocs-url")]
    pub devdocs_url: String,

    /// Read the Docs URL template; `{framework}` is substituted
    #[serde(rename = "readthedocs-template")]
    pub readthedocs_template: String,
}

impl SearchConfig {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy_timeout_ms: 5_000,
            probe_retries: 1,
            devdocs_url: "https://devdocs.io".to_string(),
            readthedocs_template: "https://{framework}.readthedocs.io/".to_string(),
        }
    }
}

/// Text completion service endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended)
    pub endpoint: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-flash-1.5".to_string(),
            api_key_env: "DOC_HARVEST_API_KEY".to_string(),
        }
    }
}

/// Task lifecycle settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Delay between a task reaching a terminal state and its removal (seconds)
    #[serde(rename = "cleanup-delay-secs")]
    pub cleanup_delay_secs: u64,
}

impl TaskConfig {
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            cleanup_delay_secs: 300,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one sub-directory of JSON files per framework
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./docs".to_string(),
        }
    }
}
