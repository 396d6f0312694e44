use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub origin: OriginConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub cipher: CipherConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    /// Base URL every endpoint is derived from
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Interface language sent as `hl`
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_base_url() -> String {
    "https://www.youtube.com".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Proxy URL applied to every request
    #[serde(default)]
    pub proxy: Option<String>,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        .to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            proxy: None,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Retries per endpoint after the first attempt (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Extra attempts when the info endpoint answers with a reload request
    #[serde(default = "default_reload_retries")]
    pub reload_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    250
}
fn default_max_delay() -> u64 {
    8000
}
fn default_reload_retries() -> u32 {
    2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            reload_retries: default_reload_retries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CipherConfig {
    /// Maximum cached transform programs, 0 for unbounded (default: 64)
    #[serde(default = "default_max_programs")]
    pub max_programs: usize,
}

fn default_max_programs() -> usize {
    64
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            max_programs: default_max_programs(),
        }
    }
}
