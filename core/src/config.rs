/// Configuration management
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the REST API (no trailing slash required)
    pub api_url: String,

    /// Directory holding the session database
    pub data_dir: PathBuf,

    /// Per-request timeout applied by the HTTP gateway
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: default_data_dir(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

fn default_data_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".gptinder"),
        Err(_) => PathBuf::from(".gptinder"),
    }
}

impl Config {
    /// Build config from command line arguments.
    ///
    /// Flags are consumed wherever they appear; the remaining arguments
    /// (after the program name) are returned as the command.
    pub fn from_args(args: &[String]) -> Result<(Self, Vec<String>)> {
        let mut api_url: Option<String> = None;
        let mut data_dir: Option<PathBuf> = None;
        let mut timeout_secs: Option<u64> = None;
        let mut rest = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--api-url" => {
                    let url = args.get(i + 1).ok_or_else(|| {
                        ClientError::Config("--api-url requires a URL argument".to_string())
                    })?;
                    api_url = Some(url.clone());
                    i += 2;
                }
                "--data-dir" => {
                    let path = args.get(i + 1).ok_or_else(|| {
                        ClientError::Config("--data-dir requires a path argument".to_string())
                    })?;
                    data_dir = Some(PathBuf::from(path));
                    i += 2;
                }
                "--timeout" => {
                    let secs = args.get(i + 1).ok_or_else(|| {
                        ClientError::Config("--timeout requires a number of seconds".to_string())
                    })?;
                    timeout_secs = Some(secs.parse::<u64>().map_err(|_| {
                        ClientError::Config("--timeout must be a whole number of seconds".to_string())
                    })?);
                    i += 2;
                }
                other => {
                    rest.push(other.to_string());
                    i += 1;
                }
            }
        }

        // Env overrides (nice for scripts)
        if let Ok(url) = std::env::var("GPTINDER_API_URL") {
            if !url.is_empty() {
                api_url = Some(url);
            }
        }
        if let Ok(dir) = std::env::var("GPTINDER_DATA_DIR") {
            if !dir.is_empty() {
                data_dir = Some(PathBuf::from(dir));
            }
        }
        if let Some(secs) = std::env::var("GPTINDER_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            timeout_secs = Some(secs);
        }

        let defaults = Self::default();
        let api_url = api_url.unwrap_or(defaults.api_url);
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "API URL must start with http:// or https://, got {}",
                api_url
            )));
        }

        let config = Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            data_dir: data_dir.unwrap_or(defaults.data_dir),
            request_timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        };
        Ok((config, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flags_are_split_from_command() {
        let (config, rest) = Config::from_args(&args(&[
            "gptinder",
            "--api-url",
            "https://example.test/api/",
            "ask",
            "3",
            "--timeout",
            "5",
            "hello",
        ]))
        .unwrap();

        if std::env::var("GPTINDER_API_URL").is_err() {
            assert_eq!(config.api_url, "https://example.test/api");
        }
        if std::env::var("GPTINDER_TIMEOUT").is_err() {
            assert_eq!(config.request_timeout, Duration::from_secs(5));
        }
        assert_eq!(rest, args(&["ask", "3", "hello"]));
    }

    #[test]
    fn test_missing_flag_value() {
        let err = Config::from_args(&args(&["gptinder", "--data-dir"])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_bad_timeout() {
        let err = Config::from_args(&args(&["gptinder", "--timeout", "soon"])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
