//! Engine configuration.
//!
//! Defaults, environment overrides and a deterministic `params_hash` that
//! reports carry as provenance.
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `REP_SIDE` | `side` | `white` |
//! | `REP_START_FEN` | `start_position` | standard initial position |
//! | `REP_MAX_PLIES` | `max_plies` | 1000 |
//! | `REP_DESCRIPTION_PLIES` | `description_plies` | 6 |
//! | `REP_ON_LINE_ERROR` | `line_error_policy` | `skip` |
//! | `REP_CACHE_CAPACITY` | `cache_capacity` | 10000 |

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::canonicalizer::{self, PositionError};
use crate::export::RowOptions;
use crate::graph::{LineErrorPolicy, Repertoire};
use crate::provider::{AnalysisProvider, CachingAnalysisProvider};
use crate::types::Side;

/// Error from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("Invalid value for {variable}: {value:?} ({reason})")]
    Invalid {
        /// Environment variable name.
        variable: &'static str,
        /// Offending value.
        value: String,
        /// What was expected.
        reason: &'static str,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Side that owns the repertoire.
    pub side: Side,
    /// Root position text (six fields).
    pub start_position: String,
    /// Ply cap per split chunk (at least 1).
    pub max_plies: usize,
    /// Tokens in the fallback row description.
    pub description_plies: usize,
    /// What a batch does with a bad line.
    pub line_error_policy: LineErrorPolicy,
    /// Evaluation cache entries.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            side: Side::White,
            start_position: canonicalizer::STANDARD_START.to_string(),
            max_plies: 1000,
            description_plies: 6,
            line_error_policy: LineErrorPolicy::Skip,
            cache_capacity: 10_000,
        }
    }
}

fn parse_count(variable: &'static str, value: String, min: usize) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n >= min => Ok(n),
        _ => Err(ConfigError::Invalid {
            variable,
            value,
            reason: if min > 0 {
                "expected a positive integer"
            } else {
                "expected a non-negative integer"
            },
        }),
    }
}

impl EngineConfig {
    /// Load configuration from environment variables over defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any `name -> value` source over defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("REP_SIDE") {
            config.side = Side::from_str(&value).ok_or(ConfigError::Invalid {
                variable: "REP_SIDE",
                value,
                reason: "expected white or black",
            })?;
        }
        if let Some(value) = lookup("REP_START_FEN") {
            if canonicalizer::canonicalize(&value).is_err() {
                return Err(ConfigError::Invalid {
                    variable: "REP_START_FEN",
                    value,
                    reason: "expected a six-field position",
                });
            }
            config.start_position = value;
        }
        if let Some(value) = lookup("REP_MAX_PLIES") {
            config.max_plies = parse_count("REP_MAX_PLIES", value, 1)?;
        }
        if let Some(value) = lookup("REP_DESCRIPTION_PLIES") {
            config.description_plies = parse_count("REP_DESCRIPTION_PLIES", value, 0)?;
        }
        if let Some(value) = lookup("REP_ON_LINE_ERROR") {
            config.line_error_policy =
                LineErrorPolicy::from_str(&value).ok_or(ConfigError::Invalid {
                    variable: "REP_ON_LINE_ERROR",
                    value,
                    reason: "expected skip or abort",
                })?;
        }
        if let Some(value) = lookup("REP_CACHE_CAPACITY") {
            config.cache_capacity = parse_count("REP_CACHE_CAPACITY", value, 1)?;
        }
        Ok(config)
    }

    /// Hash of every parameter, for report provenance.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Empty repertoire for this side and start position.
    pub fn repertoire(&self) -> Result<Repertoire, PositionError> {
        Repertoire::from_start(self.side, &self.start_position)
    }

    /// Wrap `inner` in an evaluation cache sized by `cache_capacity`.
    pub fn analysis_cache<P: AnalysisProvider>(&self, inner: P) -> CachingAnalysisProvider<P> {
        CachingAnalysisProvider::new(inner, self.cache_capacity)
    }

    /// Row options using the configured description length.
    pub fn row_options(&self) -> RowOptions {
        RowOptions {
            description_plies: self.description_plies,
            ..RowOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_plies, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("REP_SIDE", "Black"),
            ("REP_MAX_PLIES", "12"),
            ("REP_ON_LINE_ERROR", "abort"),
        ]))
        .unwrap();
        assert_eq!(config.side, Side::Black);
        assert_eq!(config.max_plies, 12);
        assert_eq!(config.line_error_policy, LineErrorPolicy::Abort);
        assert!(config.repertoire().unwrap().is_empty());
    }

    #[test]
    fn test_analysis_cache_uses_configured_capacity() {
        let config = EngineConfig::from_lookup(lookup(&[("REP_CACHE_CAPACITY", "64")])).unwrap();
        let cache = config.analysis_cache(crate::provider::InMemoryProvider::new());
        assert_eq!(cache.cache_stats().cap, 64);
        assert_eq!(cache.cache_stats().len, 0);

        let err = EngineConfig::from_lookup(lookup(&[("REP_CACHE_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { variable: "REP_CACHE_CAPACITY", .. }));
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_lookup(lookup(&[("REP_MAX_PLIES", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { variable: "REP_MAX_PLIES", .. }));
        assert!(EngineConfig::from_lookup(lookup(&[("REP_SIDE", "green")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("REP_START_FEN", "8/8 w")])).is_err());
    }

    #[test]
    fn test_params_hash_determinism() {
        let a = EngineConfig::default();
        let b = EngineConfig::default();
        assert_eq!(a.params_hash(), b.params_hash());

        let c = EngineConfig {
            max_plies: 20,
            ..EngineConfig::default()
        };
        assert_ne!(a.params_hash(), c.params_hash());
    }
}
