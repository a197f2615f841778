//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable {var} has invalid value `{value}`")]
    Env { var: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config<I>(path: Option<&Path>, env: I) -> Result<GateConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GateConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply recognised environment variables on top of `config`.
///
/// Unknown variables are ignored. List values are comma-separated.
pub fn apply_env_overrides<I>(config: &mut GateConfig, env: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (var, value) in env {
        match var.as_str() {
            "PORT" => {
                let port: u16 = parse_env(&var, &value)?;
                config.listener.bind_address = format!("0.0.0.0:{port}");
            }
            "GATE_BIND_ADDRESS" => config.listener.bind_address = value,
            "GATE_RATE_LIMIT" => config.rate_limit.limit = parse_env(&var, &value)?,
            "GATE_RATE_WINDOW_SECS" => config.rate_limit.window_secs = parse_env(&var, &value)?,
            "GATE_TRUSTED_PROXIES" => config.proxy.trusted_cidrs = split_list(&value),
            "GATE_CLIENT_IP_HEADERS" => config.proxy.client_ip_headers = split_list(&value),
            "GATE_ALLOWED_ORIGINS" => config.cors.allowed_origins = split_list(&value),
            "GATE_PROTECTED_PREFIX" => config.auth.protected_prefix = value,
            "GATE_LOG_LEVEL" => config.observability.log_level = value,
            _ => {}
        }
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides() {
        let config = load_config(
            None,
            vars(&[
                ("PORT", "9000"),
                ("GATE_RATE_LIMIT", "7"),
                ("GATE_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
                ("HOME", "/root"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.rate_limit.limit, 7);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_bad_env_value() {
        let err = load_config(None, vars(&[("GATE_RATE_WINDOW_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == "GATE_RATE_WINDOW_SECS"));
    }

    #[test]
    fn test_env_override_is_validated() {
        let err = load_config(None, vars(&[("GATE_RATE_WINDOW_SECS", "0")])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::ZeroWindow]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("admission-gate-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[listener]\nbind_address = \"127.0.0.1:7000\"\n[rate_limit]\nlimit = 3\n",
        )
        .unwrap();

        let config = load_config(Some(&path), Vec::new()).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.listener.bind_address, "127.0.0.1:7000");
        assert_eq!(config.rate_limit.limit, 3);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/gate.toml")), Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
