// src/config.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::gate::GateError;

/// Parameters of the blink-gated window analysis. Read once at construction.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Blink strengths at or above this value open a mask.
    pub blink_threshold: u32,
    pub post_mask_secs: f64,
    pub window_secs: f64,
    pub hop_secs: f64,
    /// Extra retention beyond the window so the next hop still sees its samples.
    pub prune_slack_secs: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            blink_threshold: 20,
            post_mask_secs: 0.30,
            window_secs: 2.0,
            hop_secs: 1.0,
            prune_slack_secs: 1.0,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<(), GateError> {
        let positive = [("window_secs", self.window_secs), ("hop_secs", self.hop_secs)];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(GateError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        let non_negative = [
            ("post_mask_secs", self.post_mask_secs),
            ("prune_slack_secs", self.prune_slack_secs),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(GateError::InvalidConfig(format!(
                    "{name} must be zero or positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// How far back the sample buffer keeps entries.
    pub fn retention_secs(&self) -> f64 {
        self.window_secs + self.prune_slack_secs
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of the external tick that checks hop deadlines between samples.
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub sample_rate_hz: f64,
    pub theta_base: f64,
    pub theta_amplitude: f64,
    pub noise: f64,
    /// Chance per sample that a blink event is emitted as well.
    pub blink_probability: f64,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 2.0,
            theta_base: 5.0,
            theta_amplitude: 1.0,
            noise: 0.2,
            blink_probability: 0.05,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gate: GateConfig,
    pub engine: EngineConfig,
    pub sim: SimConfig,
    pub output_csv: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: AppConfig =
            serde_json::from_str(text).context("failed to parse configuration JSON")?;
        config.gate.validate()?;
        if !(config.sim.sample_rate_hz.is_finite() && config.sim.sample_rate_hz > 0.0) {
            return Err(GateError::InvalidConfig(format!(
                "sim.sample_rate_hz must be positive, got {}",
                config.sim.sample_rate_hz
            ))
            .into());
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_two_second_window_one_second_hop() {
        let config = GateConfig::default();
        assert_eq!(config.blink_threshold, 20);
        assert_eq!(config.window_secs, 2.0);
        assert_eq!(config.hop_secs, 1.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.retention_secs(), 3.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            AppConfig::from_json_str(r#"{"gate": {"post_mask_secs": 0.5}, "engine": {"tick_interval_ms": 20}}"#)
                .unwrap();
        assert_eq!(config.gate.post_mask_secs, 0.5);
        assert_eq!(config.gate.window_secs, 2.0);
        assert_eq!(config.engine.tick_interval_ms, 20);
        assert!(config.output_csv.is_none());
    }

    #[test]
    fn rejects_zero_hop() {
        let err = AppConfig::from_json_str(r#"{"gate": {"hop_secs": 0.0}}"#).unwrap_err();
        assert!(format!("{err:#}").contains("hop_secs"));
    }

    #[test]
    fn rejects_negative_mask() {
        let config = GateConfig {
            post_mask_secs: -0.1,
            ..GateConfig::default()
        };
        assert!(matches!(config.validate(), Err(GateError::InvalidConfig(_))));
    }
}
