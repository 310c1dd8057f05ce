//! Runtime configuration read from the host page.
//!
//! The page may embed a `<script id="parallax-config" type="application/json">`
//! block. Any field it omits keeps its default, so an empty object (or no
//! block at all) yields the stock eight-layer composition.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::collections::HashSet;

use serde::Deserialize;

use crate::consts::{
    DEFAULT_CANVAS_ID, DEFAULT_IMAGE_DIR, DEFAULT_IMAGE_EXT, DEFAULT_LAYER_NAMES, DEFAULT_LOADING_ID,
    DEFAULT_SENSOR_FREQUENCY_HZ, DEFAULT_START_BUTTON_ID,
};
use crate::error::ParallaxError;

/// How a `denied` answer from the generic permissions query is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbePolicy {
    /// Denial halts the pipeline before the sensor is constructed.
    #[default]
    Blocking,
    /// Denial is logged and the sensor is started anyway.
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub canvas_id: String,
    pub start_button_id: String,
    pub loading_id: String,
    pub image_dir: String,
    pub image_ext: String,
    /// Layer asset names, back to front.
    pub layers: Vec<String>,
    pub sensor_frequency_hz: f64,
    pub probe_policy: ProbePolicy,
    /// Hold the first frame until every layer image has loaded or failed.
    pub wait_for_assets: bool,
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            canvas_id: DEFAULT_CANVAS_ID.to_owned(),
            start_button_id: DEFAULT_START_BUTTON_ID.to_owned(),
            loading_id: DEFAULT_LOADING_ID.to_owned(),
            image_dir: DEFAULT_IMAGE_DIR.to_owned(),
            image_ext: DEFAULT_IMAGE_EXT.to_owned(),
            layers: DEFAULT_LAYER_NAMES.iter().map(|n| (*n).to_owned()).collect(),
            sensor_frequency_hz: DEFAULT_SENSOR_FREQUENCY_HZ,
            probe_policy: ProbePolicy::default(),
            wait_for_assets: false,
            log_level: "info".to_owned(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a JSON config block. Blank input yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ParallaxError::Config`] for malformed JSON, unknown fields,
    /// or values that fail [`AppConfig::validate`].
    pub fn from_json(raw: &str) -> Result<Self, ParallaxError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(raw).map_err(|e| ParallaxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ParallaxError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), ParallaxError> {
        if self.layers.is_empty() {
            return Err(ParallaxError::Config("layers must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for name in &self.layers {
            if name.trim().is_empty() {
                return Err(ParallaxError::Config("layer names must not be blank".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ParallaxError::Config(format!("duplicate layer name: {name}")));
            }
        }
        if !self.sensor_frequency_hz.is_finite() || self.sensor_frequency_hz <= 0.0 {
            return Err(ParallaxError::Config(format!(
                "sensor_frequency_hz must be positive, got {}",
                self.sensor_frequency_hz
            )));
        }
        for (field, value) in [
            ("canvas_id", &self.canvas_id),
            ("start_button_id", &self.start_button_id),
            ("image_ext", &self.image_ext),
        ] {
            if value.trim().is_empty() {
                return Err(ParallaxError::Config(format!("{field} must not be blank")));
            }
        }
        self.level()?;
        Ok(())
    }

    /// The configured log level.
    ///
    /// # Errors
    ///
    /// Returns [`ParallaxError::Config`] for an unrecognized level name.
    pub fn level(&self) -> Result<log::Level, ParallaxError> {
        self.log_level
            .parse::<log::Level>()
            .map_err(|_| ParallaxError::Config(format!("unknown log_level: {}", self.log_level)))
    }
}
