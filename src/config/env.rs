//! Environment variable readers used by the configuration merge step.

use std::str::FromStr;

use super::ConfigError;

/// Read a string variable, treating empty and whitespace-only values as unset.
pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read and parse a variable, reporting malformed values instead of ignoring them.
pub(crate) fn env_parse<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                message: format!("'{raw}': {e}"),
            }),
        None => Ok(None),
    }
}
