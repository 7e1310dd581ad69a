// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator.
//
// Loads lumi.yaml, validates values, and resolves ${VAR} environment
// interpolation in the backend URL. Raw deserialization types are kept
// separate from the validated public config.

use std::path::PathBuf;

/// Backend used when no config file or override is present — the
/// development server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// History page size used when the config does not set one.
pub const DEFAULT_HISTORY_LIMIT: usize = 30;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// All errors that can occur during config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config source: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("undefined variable ${{{name}}} in config (not set in environment)")]
    UndefinedVariable { name: String },
}

// ---------------------------------------------------------------------------
// ConfigSource trait (interface-first, dependency injection)
// ---------------------------------------------------------------------------

/// Abstraction over where config YAML comes from.
///
/// `FileSource` reads from disk; `StringSource` provides content
/// directly (used in tests to avoid file I/O).
pub trait ConfigSource {
    fn load(&self) -> Result<String, ConfigError>;
}

/// Loads config from a file on disk.
pub struct FileSource {
    pub path: PathBuf,
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// Provides config content directly as a string. Used for testing.
pub struct StringSource {
    pub content: String,
}

impl ConfigSource for StringSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(self.content.clone())
    }
}

// ---------------------------------------------------------------------------
// Typed config structs
// ---------------------------------------------------------------------------

/// Top-level parsed and validated client config.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend: BackendConfig,
    pub history: HistoryConfig,
}

/// Where and how to reach the chat backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in milliseconds. `None` leaves requests
    /// untimed so long answers are not killed mid-stream.
    pub timeout_ms: Option<u64>,
}

/// History view settings.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Page size for history listing.
    pub limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_ms: None,
            },
            history: HistoryConfig {
                limit: DEFAULT_HISTORY_LIMIT,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Raw YAML deserialization types (internal)
// ---------------------------------------------------------------------------
// Separate from the public structs so defaults and validation happen in
// one place between raw and public.

mod raw {
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    pub struct RawConfig {
        #[serde(default)]
        pub backend: Option<RawBackend>,
        #[serde(default)]
        pub history: Option<RawHistory>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawBackend {
        pub base_url: Option<String>,
        pub timeout_ms: Option<u64>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawHistory {
        pub limit: Option<usize>,
    }
}

// ---------------------------------------------------------------------------
// Variable interpolation
// ---------------------------------------------------------------------------

/// Resolves `${VAR_NAME}` references in a string from environment
/// variables. Returns `ConfigError::UndefinedVariable` if a referenced
/// variable is not set. Malformed interpolations are kept literally.
fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                var_name.push(c);
            }
            if !found_close || var_name.is_empty() {
                result.push('$');
                result.push('{');
                result.push_str(&var_name);
                continue;
            }
            let value = std::env::var(&var_name).map_err(|_| ConfigError::UndefinedVariable {
                name: var_name.clone(),
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Config loading and validation
// ---------------------------------------------------------------------------

/// Load and validate a client config from the given source.
///
/// An empty source yields the defaults; partial configs fill in the
/// missing sections from the defaults.
pub fn load_config(source: &dyn ConfigSource) -> Result<ClientConfig, ConfigError> {
    let raw_yaml = source.load()?;
    let raw: raw::RawConfig = if raw_yaml.trim().is_empty() {
        raw::RawConfig::default()
    } else {
        serde_yaml::from_str(&raw_yaml)?
    };
    build_config(raw)
}

fn build_config(raw: raw::RawConfig) -> Result<ClientConfig, ConfigError> {
    let base_url = raw
        .backend
        .as_ref()
        .and_then(|b| b.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = resolve_variables(&base_url)?;
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "backend.base_url must start with http:// or https://, got \"{base_url}\""
        )));
    }
    let base_url = base_url.trim_end_matches('/').to_string();

    let timeout_ms = raw.backend.as_ref().and_then(|b| b.timeout_ms);
    if timeout_ms == Some(0) {
        return Err(ConfigError::Validation(
            "backend.timeout_ms must be greater than zero".to_string(),
        ));
    }

    let limit = raw
        .history
        .as_ref()
        .and_then(|h| h.limit)
        .unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit == 0 {
        return Err(ConfigError::Validation(
            "history.limit must be greater than zero".to_string(),
        ));
    }

    Ok(ClientConfig {
        backend: BackendConfig {
            base_url,
            timeout_ms,
        },
        history: HistoryConfig { limit },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(name: &str, value: &str, f: F) {
        let _guard = ENV_MUTEX.lock().unwrap();
        let previous = std::env::var(name).ok();
        std::env::set_var(name, value);
        f();
        match previous {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }

    fn make_source(yaml: &str) -> StringSource {
        StringSource {
            content: yaml.to_string(),
        }
    }

    // ---------------------------------------------------------------
    // 1. Full config parses into typed struct
    // ---------------------------------------------------------------

    #[test]
    fn full_config_parses_all_fields() {
        let yaml = r#"
backend:
  base_url: "https://lumi.example.com/"
  timeout_ms: 120000
history:
  limit: 10
"#;
        let config = load_config(&make_source(yaml)).unwrap();
        // Trailing slash is stripped so joins stay clean.
        assert_eq!(config.backend.base_url, "https://lumi.example.com");
        assert_eq!(config.backend.timeout_ms, Some(120000));
        assert_eq!(config.history.limit, 10);
    }

    // ---------------------------------------------------------------
    // 2. Missing sections fall back to defaults
    // ---------------------------------------------------------------

    #[test]
    fn empty_config_uses_defaults() {
        let config = load_config(&make_source("")).unwrap();
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.backend.timeout_ms, None);
        assert_eq!(config.history.limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let yaml = "backend:\n  timeout_ms: 5000\n";
        let config = load_config(&make_source(yaml)).unwrap();
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.backend.timeout_ms, Some(5000));
        assert_eq!(config.history.limit, DEFAULT_HISTORY_LIMIT);
    }

    // ---------------------------------------------------------------
    // 3. Variable interpolation in base_url
    // ---------------------------------------------------------------

    #[test]
    fn variable_interpolation_resolves_from_env() {
        with_env("LUMI_TEST_HOST", "https://backend.internal:8000", || {
            let yaml = "backend:\n  base_url: \"${LUMI_TEST_HOST}\"\n";
            let config = load_config(&make_source(yaml)).unwrap();
            assert_eq!(config.backend.base_url, "https://backend.internal:8000");
        });
    }

    #[test]
    fn undefined_variable_fails_with_clear_error() {
        std::env::remove_var("LUMI_TEST_UNDEFINED_12345");
        let yaml = "backend:\n  base_url: \"${LUMI_TEST_UNDEFINED_12345}\"\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        let msg = err.to_string();
        assert!(
            msg.contains("LUMI_TEST_UNDEFINED_12345"),
            "error should name the missing variable: {msg}"
        );
        assert!(
            msg.contains("undefined variable"),
            "error should say undefined: {msg}"
        );
    }

    #[test]
    fn malformed_interpolation_kept_literally() {
        let result = resolve_variables("http://host/${unterminated").unwrap();
        assert_eq!(result, "http://host/${unterminated");
    }

    #[test]
    fn string_without_variables_unchanged() {
        let result = resolve_variables("no variables here").unwrap();
        assert_eq!(result, "no variables here");
    }

    // ---------------------------------------------------------------
    // 4. Validation failures produce actionable errors
    // ---------------------------------------------------------------

    #[test]
    fn non_http_base_url_rejected() {
        let yaml = "backend:\n  base_url: \"ftp://example.com\"\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        let msg = err.to_string();
        assert!(
            msg.contains("ftp://example.com"),
            "error should echo the bad URL: {msg}"
        );
    }

    #[test]
    fn zero_timeout_rejected() {
        let yaml = "backend:\n  timeout_ms: 0\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn zero_history_limit_rejected() {
        let yaml = "history:\n  limit: 0\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        assert!(err.to_string().contains("history.limit"));
    }

    #[test]
    fn invalid_yaml_rejected() {
        let err = load_config(&make_source("backend: [unclosed")).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    // ---------------------------------------------------------------
    // 5. Sources
    // ---------------------------------------------------------------

    #[test]
    fn string_source_returns_content() {
        let source = StringSource {
            content: "backend:\n  base_url: \"http://x\"\n".to_string(),
        };
        assert!(source.load().unwrap().contains("base_url"));
    }

    #[test]
    fn file_source_missing_file_is_io_error() {
        let source = FileSource {
            path: PathBuf::from("/nonexistent/lumi-test/lumi.yaml"),
        };
        let err = load_config(&source).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
