use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Read `key` from the environment and parse it, falling back to `default`
/// when the variable is unset.
pub fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

/// Parse a configuration value, reporting the key on failure.
pub fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u64>("TIMEOUT", " 30 ").unwrap(), 30);
        assert!(parse_value::<bool>("FLAG", "true").unwrap());

        let err = parse_value::<u64>("TIMEOUT", "soon").unwrap_err();
        assert!(err.to_string().contains("TIMEOUT"));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_env_or_default_when_unset() {
        let value: u32 = env_or("FORECAST_CORE_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }
}
