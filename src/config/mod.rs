use std::env;
use std::time::Duration;

use crate::error::AppError;

/// Ceiling for a single backoff wait unless `retry_delay_ms` itself is larger.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub graph: GraphConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
}

/// Anthropic API configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Neo4j connection configuration
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// HTTP endpoint of the Neo4j server (e.g. `http://localhost:7474`).
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Upper bound on distinct values sampled per property.
    pub sample_limit: usize,
}

/// Pipeline behaviour flags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentConfig {
    pub conversation_memory: bool,
    pub chain_of_thought: bool,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let llm = LlmConfig {
            api_key: env::var("ANTHROPIC_API_KEY").map_err(|_| AppError::Config {
                message: "ANTHROPIC_API_KEY is required".to_string(),
            })?,
            base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
        };

        let graph = GraphConfig {
            uri: http_endpoint(
                "NEO4J_URI",
                env::var("NEO4J_URI").unwrap_or_else(|_| "http://localhost:7474".to_string()),
            )?,
            user: env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".to_string()),
            password: env::var("NEO4J_PASSWORD").unwrap_or_default(),
            database: env::var("NEO4J_DATABASE").unwrap_or_else(|_| "neo4j".to_string()),
            sample_limit: env::var("PROPERTY_SAMPLE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
        };

        let agent = AgentConfig {
            conversation_memory: flag("CONVERSATION_MEMORY"),
            chain_of_thought: flag("CHAIN_OF_THOUGHT"),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        Ok(Config {
            llm,
            graph,
            agent,
            logging,
            request,
        })
    }
}

/// The graph is reached over the Neo4j HTTP API, so Bolt and other schemes
/// are refused up front instead of failing on the first request.
fn http_endpoint(name: &str, value: String) -> Result<String, AppError> {
    match reqwest::Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
        Ok(url) => Err(AppError::Config {
            message: format!(
                "{} must be an http:// or https:// URL for the Neo4j HTTP API \
                 (usually port 7474); scheme '{}' is not supported: {}",
                name,
                url.scheme(),
                value
            ),
        }),
        Err(e) => Err(AppError::Config {
            message: format!("{} is not a valid URL ({}): {}", name, e, value),
        }),
    }
}

/// Boolean env flag; only the literal `true` (any case) enables it.
fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl RequestConfig {
    /// Wait before retry number `retry` (1-based): `retry_delay_ms` doubled
    /// for each earlier retry, saturating, and capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u64
            .checked_pow(retry.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let cap = MAX_BACKOFF_MS.max(self.retry_delay_ms);
        Duration::from_millis(self.retry_delay_ms.saturating_mul(factor).min(cap))
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            sample_limit: 20,
        }
    }
}
