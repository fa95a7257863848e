//! Configuration for the adversarial core.
//!
//! Serializable with sensible defaults; invalid values are rejected by
//! [`AdversarialConfig::validate`] before a core is built with them.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

fn default_eps() -> f64 {
    1e-12
}

fn default_meter_decay() -> f64 {
    crate::meter::DEFAULT_DECAY
}

/// Tunables of [`AdversarialCore`](crate::AdversarialCore).
///
/// | Parameter | Default | Description |
/// |-----------|---------|-------------|
/// | `eps` | 1e-12 | Stabilizer handed to the generator criterion |
/// | `meter_decay` | 0.98 | EMA decay of the running loss meters |
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdversarialConfig {
    /// Small constant passed to the generator criterion to guard against
    /// log-of-zero in adversarial terms.
    #[serde(default = "default_eps")]
    pub eps: f64,

    /// EMA decay used by the per-channel loss meters.
    #[serde(default = "default_meter_decay")]
    pub meter_decay: f64,
}

impl Default for AdversarialConfig {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            meter_decay: default_meter_decay(),
        }
    }
}

impl AdversarialConfig {
    /// Checks the configuration for out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if `eps` is negative or non-finite, or
    /// if `meter_decay` is outside `(0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(CoreError::Config(format!(
                "eps must be finite and non-negative, got {}",
                self.eps
            )));
        }
        if !(self.meter_decay > 0.0 && self.meter_decay < 1.0) {
            return Err(CoreError::Config(format!(
                "meter_decay must be in (0, 1), got {}",
                self.meter_decay
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AdversarialConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.eps - 1e-12).abs() < 1e-20);
        assert!((config.meter_decay - 0.98).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_decay() {
        let config = AdversarialConfig {
            meter_decay: 1.5,
            ..AdversarialConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_eps() {
        let config = AdversarialConfig {
            eps: -1.0,
            ..AdversarialConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: AdversarialConfig = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
    }
}
