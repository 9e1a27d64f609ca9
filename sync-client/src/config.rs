//! Sync engine configuration

use std::time::Duration;

/// Log verbosity recognized from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// No log output
    Disabled,
    /// Info-level output
    #[default]
    Minimal,
    /// Debug-level output
    Verbose,
}

impl LogLevel {
    /// Parse a configuration value; unknown values fall back to `Minimal`
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "disabled" | "off" => LogLevel::Disabled,
            "verbose" | "debug" => LogLevel::Verbose,
            _ => LogLevel::Minimal,
        }
    }

    /// Directive string for `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Disabled => "off",
            LogLevel::Minimal => "info",
            LogLevel::Verbose => "debug",
        }
    }
}

/// Sync engine configuration
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | API_BASE_URL | http://localhost:4000/api | 数据源 HTTP 根地址 |
/// | SOCKET_ADDR | 127.0.0.1:4001 | 推送通道地址 |
/// | POLL_DELAY_MS | 180000 | 回退拉取窗口(毫秒) |
/// | MIN_FETCH_INTERVAL_MS | 1000 | 同族拉取最小间隔(毫秒) |
/// | REQUEST_TIMEOUT_MS | 10000 | HTTP 请求超时(毫秒) |
/// | LOG_LEVEL | minimal | disabled / minimal / verbose |
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// HTTP endpoint root of the data source
    pub api_base_url: String,
    /// Push transport endpoint
    pub socket_addr: String,
    /// Fallback window: a pull is issued when the push channel has been
    /// silent for this long
    pub poll_delay: Duration,
    /// Minimum spacing between consecutive pulls of the same family
    pub min_fetch_interval: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Log verbosity
    pub log_level: LogLevel,
}

impl SyncConfig {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/api".into()),
            socket_addr: std::env::var("SOCKET_ADDR").unwrap_or_else(|_| "127.0.0.1:4001".into()),
            poll_delay: Duration::from_millis(
                std::env::var("POLL_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(180_000),
            ),
            min_fetch_interval: Duration::from_millis(
                std::env::var("MIN_FETCH_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_000),
            ),
            request_timeout: Duration::from_millis(
                std::env::var("REQUEST_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),
            log_level: LogLevel::parse(
                &std::env::var("LOG_LEVEL").unwrap_or_else(|_| "minimal".into()),
            ),
        }
    }

    /// Set the API base URL
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the push transport endpoint
    pub fn with_socket_addr(mut self, addr: impl Into<String>) -> Self {
        self.socket_addr = addr.into();
        self
    }

    /// Set the fallback window
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Set the minimum pull spacing
    pub fn with_min_fetch_interval(mut self, interval: Duration) -> Self {
        self.min_fetch_interval = interval;
        self
    }

    /// Set the HTTP request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("disabled"), LogLevel::Disabled);
        assert_eq!(LogLevel::parse("VERBOSE"), LogLevel::Verbose);
        assert_eq!(LogLevel::parse("minimal"), LogLevel::Minimal);
        // Unknown values fall back to minimal
        assert_eq!(LogLevel::parse("shouty"), LogLevel::Minimal);
    }

    #[test]
    fn test_config_builder() {
        let config = SyncConfig::from_env()
            .with_api_base_url("http://example.test/api")
            .with_poll_delay(Duration::from_secs(30))
            .with_min_fetch_interval(Duration::from_millis(250));

        assert_eq!(config.api_base_url, "http://example.test/api");
        assert_eq!(config.poll_delay, Duration::from_secs(30));
        assert_eq!(config.min_fetch_interval, Duration::from_millis(250));
    }
}
