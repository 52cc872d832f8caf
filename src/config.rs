use crate::detector::DEFAULT_URL_PATTERNS;
use std::path::PathBuf;

pub const DATA_PATH_VAR: &str = "REPLY_COUNTER_DATA_PATH";
pub const PORT_VAR: &str = "PORT";
pub const URLS_VAR: &str = "REPLY_COUNTER_URLS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_path: PathBuf,
    pub port: u16,
    /// Request URLs inspected for replies.
    pub url_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/state.json"),
            port: 8080,
            url_patterns: DEFAULT_URL_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from `lookup`; unset or unparseable values keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(DATA_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(port) = lookup(PORT_VAR).and_then(|value| value.trim().parse::<u16>().ok()) {
            config.port = port;
        }
        if let Some(urls) = lookup(URLS_VAR) {
            let patterns: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if !patterns.is_empty() {
                config.url_patterns = patterns;
            }
        }

        config
    }
}
