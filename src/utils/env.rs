// src/utils/env.rs

use log::debug;
use std::env;
use std::str::FromStr;

use crate::error::{DedupeError, DedupeResult};

/// Loads variables from a `.env` file in the working directory, if present.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(_) => debug!("No .env file found, using process environment only"),
    }
}

/// Reads and parses an optional environment variable. Unparseable values are
/// configuration errors rather than silently replaced by a default.
pub fn parse_env_var<T>(name: &str) -> DedupeResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            DedupeError::config(format!("{} has invalid value '{}': {}", name, raw, e))
        }),
        Err(_) => Ok(None),
    }
}

/// Comma-separated list variable; empty entries are dropped.
pub fn list_env_var(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_var() {
        env::set_var("DEDUPE_TEST_PARSE_OK", "7");
        env::set_var("DEDUPE_TEST_PARSE_BAD", "seven");

        assert_eq!(parse_env_var::<usize>("DEDUPE_TEST_PARSE_OK").unwrap(), Some(7));
        assert!(parse_env_var::<usize>("DEDUPE_TEST_PARSE_BAD").is_err());
        assert_eq!(parse_env_var::<usize>("DEDUPE_TEST_PARSE_MISSING").unwrap(), None);

        env::remove_var("DEDUPE_TEST_PARSE_OK");
        env::remove_var("DEDUPE_TEST_PARSE_BAD");
    }

    #[test]
    fn test_list_env_var() {
        env::set_var("DEDUPE_TEST_LIST", "title, name,,");
        assert_eq!(
            list_env_var("DEDUPE_TEST_LIST"),
            Some(vec!["title".to_string(), "name".to_string()])
        );
        env::remove_var("DEDUPE_TEST_LIST");
    }
}
