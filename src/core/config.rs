/// Director tuning, loadable from RON.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Timing and presentation knobs for the dialogue director.
///
/// Every field has a default, so a RON file only needs to name the values
/// it changes:
///
/// ```text
/// (
///     auto_advance_delay_secs: (1.0, 1.0),
///     exit_delay_secs: 0.5,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Inclusive range the auto-advance wait is drawn from.
    pub auto_advance_delay_secs: (f32, f32),
    /// Input lock armed on dialogue entry.
    pub input_cooldown_secs: f32,
    /// Input lock re-armed after every accepted signal. Zero disables it.
    pub signal_debounce_secs: f32,
    /// Pause between starting the outro and tearing the UI down.
    pub exit_delay_secs: f32,
    /// Max camera pitch handed back to the movement controller.
    pub look_limit_degrees: f32,
    pub portrait_bobbing: bool,
    /// Seed for the auto-advance delay draw.
    pub seed: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay_secs: (1.0, 1.5),
            input_cooldown_secs: 0.3,
            signal_debounce_secs: 0.1,
            exit_delay_secs: 0.2,
            look_limit_degrees: 80.0,
            portrait_bobbing: true,
            seed: 0,
        }
    }
}

impl DialogueConfig {
    pub fn load_from_ron(path: &Path) -> Result<DialogueConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<DialogueConfig, ConfigError> {
        let config: DialogueConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = self.auto_advance_delay_secs;
        if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max) {
            return Err(ConfigError::Invalid {
                field: "auto_advance_delay_secs",
                reason: format!("expected 0 <= min <= max, got ({}, {})", min, max),
            });
        }
        for (field, value) in [
            ("input_cooldown_secs", self.input_cooldown_secs),
            ("signal_debounce_secs", self.signal_debounce_secs),
            ("exit_delay_secs", self.exit_delay_secs),
            ("look_limit_degrees", self.look_limit_degrees),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected a non-negative number, got {}", value),
                });
            }
        }
        Ok(())
    }

    /// Draw one auto-advance wait from the configured range.
    pub fn sample_auto_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let (min, max) = self.auto_advance_delay_secs;
        let secs = if max > min { rng.gen_range(min..=max) } else { min };
        secs_f32(secs)
    }

    pub fn input_cooldown(&self) -> Duration {
        secs_f32(self.input_cooldown_secs)
    }

    pub fn signal_debounce(&self) -> Duration {
        secs_f32(self.signal_debounce_secs)
    }

    pub fn exit_delay(&self) -> Duration {
        secs_f32(self.exit_delay_secs)
    }
}

fn secs_f32(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs).unwrap_or(Duration::ZERO)
}
