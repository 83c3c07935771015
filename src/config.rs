//! Runtime configuration for the client, read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

/// Board layout knobs
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Hex size used when the viewport cannot be measured
    pub default_hex_size: f64,
    /// Used when the viewport carries no override of its own
    pub hex_size_override: Option<f64>,
    /// Computed sizes are scaled by this on mobile layouts
    pub mobile_scale: f64,
    /// Length of a fallback road, as a fraction of the hex size
    pub fallback_edge_ratio: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_hex_size: 60.0,
            hex_size_override: None,
            mobile_scale: 0.9,
            fallback_edge_ratio: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// How long a dispatched action may wait for the server
    pub action_timeout: Duration,
    pub layout: LayoutConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_millis(5000),
            layout: LayoutConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Read the configuration, rejecting malformed values
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration, falling back to defaults on malformed values
    pub fn from_env() -> Self {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{}, using default configuration", e);
                Self::default()
            }
        }
    }

    pub(crate) fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timeout_ms = parse_var(&lookup, "CATAN_ACTION_TIMEOUT_MS")?
            .unwrap_or(defaults.action_timeout.as_millis() as u64);
        let default_hex_size = parse_var(&lookup, "CATAN_DEFAULT_HEX_SIZE")?
            .unwrap_or(defaults.layout.default_hex_size);
        let hex_size_override = parse_var::<f64, _>(&lookup, "CATAN_HEX_SIZE")?;
        let mobile_scale =
            parse_var(&lookup, "CATAN_MOBILE_SCALE")?.unwrap_or(defaults.layout.mobile_scale);
        let fallback_edge_ratio = parse_var(&lookup, "CATAN_FALLBACK_EDGE_RATIO")?
            .unwrap_or(defaults.layout.fallback_edge_ratio);

        for (key, value) in [
            ("CATAN_DEFAULT_HEX_SIZE", Some(default_hex_size)),
            ("CATAN_HEX_SIZE", hex_size_override),
            ("CATAN_MOBILE_SCALE", Some(mobile_scale)),
            ("CATAN_FALLBACK_EDGE_RATIO", Some(fallback_edge_ratio)),
        ] {
            if let Some(value) = value {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            action_timeout: Duration::from_millis(timeout_ms),
            layout: LayoutConfig {
                default_hex_size,
                hex_size_override,
                mobile_scale,
                fallback_edge_ratio,
            },
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::try_from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.action_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_values_are_read() {
        let config = ClientConfig::try_from_lookup(lookup(&[
            ("CATAN_ACTION_TIMEOUT_MS", "2500"),
            ("CATAN_HEX_SIZE", "42.5"),
            ("CATAN_MOBILE_SCALE", "0.75"),
        ]))
        .unwrap();
        assert_eq!(config.action_timeout, Duration::from_millis(2500));
        assert_eq!(config.layout.hex_size_override, Some(42.5));
        assert_eq!(config.layout.mobile_scale, 0.75);
        assert_eq!(config.layout.default_hex_size, 60.0);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        let err = ClientConfig::try_from_lookup(lookup(&[("CATAN_ACTION_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "CATAN_ACTION_TIMEOUT_MS".to_string(),
                value: "soon".to_string()
            }
        );
        assert!(ClientConfig::try_from_lookup(lookup(&[("CATAN_HEX_SIZE", "-3")])).is_err());
    }
}
