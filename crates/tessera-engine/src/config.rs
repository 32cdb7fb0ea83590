//! World and run-loop configuration.
//!
//! Both structs deserialize from JSON with every field optional:
//!
//! ```
//! use tessera_engine::config::RunConfig;
//!
//! let config = RunConfig::from_json_str(r#"{ "fixed_dt": 0.02 }"#).unwrap();
//! assert_eq!(config.max_fixed_steps, 8);
//! ```

use serde::{Deserialize, Serialize};

use crate::EngineError;

// ---------------------------------------------------------------------------
// WorldConfig
// ---------------------------------------------------------------------------

/// Initial state of a world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Names of tags switched on at creation.
    pub tags: Vec<String>,
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Timing for the [`Runner`](crate::runner::Runner).
///
/// `fixed_dt` is the duration in seconds of each fixed pass. A value of
/// `1.0 / 60.0` gives 60 fixed passes per simulated second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Fixed time step in seconds. Must be positive and finite.
    pub fixed_dt: f64,
    /// Upper bound on fixed passes per frame. Excess time is dropped.
    pub max_fixed_steps: u32,
}

impl Default for RunConfig {
    /// 60 Hz, at most 8 fixed passes per frame.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_fixed_steps: 8,
        }
    }
}

impl RunConfig {
    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] if `fixed_dt` is not positive and
    /// finite, or `max_fixed_steps` is zero.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "fixed_dt must be positive and finite, got {}",
                self.fixed_dt
            )));
        }
        if self.max_fixed_steps == 0 {
            return Err(EngineError::InvalidConfig(
                "max_fixed_steps must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sixty_hertz() {
        let config = RunConfig::default();
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_fixed_dt() {
        for dt in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            let config = RunConfig {
                fixed_dt: dt,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(EngineError::InvalidConfig(_))),
                "fixed_dt {dt} accepted"
            );
        }
    }

    #[test]
    fn rejects_zero_step_budget() {
        let err = RunConfig::from_json_str(r#"{ "max_fixed_steps": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("max_fixed_steps"));
    }

    #[test]
    fn world_config_parses_tags() {
        let config = WorldConfig::from_json_str(r#"{ "tags": ["render", "imgui"] }"#).unwrap();
        assert_eq!(config.tags, ["render", "imgui"]);
        assert_eq!(WorldConfig::from_json_str("{}").unwrap(), WorldConfig::default());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            WorldConfig::from_json_str("{ tags: }"),
            Err(EngineError::ConfigParse(_))
        ));
    }
}
