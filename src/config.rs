//! Runtime configuration
//!
//! Read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::engine::LimitPolicy;

pub const ENV_DATABASE_PATH: &str = "HEALTHENFORCER_DATABASE_PATH";
pub const ENV_DEFAULT_DAILY_GOAL: &str = "HEALTHENFORCER_DEFAULT_DAILY_GOAL";
pub const ENV_DEFAULT_TDEE: &str = "HEALTHENFORCER_DEFAULT_TDEE";
pub const ENV_KCAL_PER_KG: &str = "HEALTHENFORCER_KCAL_PER_KG";
pub const ENV_MIN_DAILY_LIMIT: &str = "HEALTHENFORCER_MIN_DAILY_LIMIT";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub limits: LimitPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LimitPolicy::default();

        let limits = LimitPolicy {
            default_daily_goal: parse_or(&lookup, ENV_DEFAULT_DAILY_GOAL, defaults.default_daily_goal),
            default_tdee: parse_or(&lookup, ENV_DEFAULT_TDEE, defaults.default_tdee),
            kcal_per_kg: parse_or(&lookup, ENV_KCAL_PER_KG, defaults.kcal_per_kg),
            min_daily_limit: parse_or(&lookup, ENV_MIN_DAILY_LIMIT, defaults.min_daily_limit),
        };

        let database_path = lookup(ENV_DATABASE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        Self {
            database_path,
            limits,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, default = %default, "ignoring unparseable setting");
                default
            }
        },
        None => default,
    }
}

/// `<project>/data/healthenforcer.db`, where the project root is found by
/// walking up out of `target/{debug,release}`
fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("healthenforcer.db");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.limits, LimitPolicy::default());
        assert!(config.database_path.ends_with("data/healthenforcer.db"));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_DATABASE_PATH, "/tmp/he.db"),
            (ENV_MIN_DAILY_LIMIT, "1500"),
            (ENV_DEFAULT_TDEE, "lots"),
        ]));
        assert_eq!(config.database_path, PathBuf::from("/tmp/he.db"));
        assert_eq!(config.limits.min_daily_limit, 1500);
        assert_eq!(config.limits.default_tdee, LimitPolicy::default().default_tdee);
    }
}
