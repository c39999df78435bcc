//! Configuration management.
//!
//! `Settings` is deserialized from `config/<name>.toml` with the `config`
//! crate, defaulting every field so a missing or partial file still yields a
//! working configuration. Processing defaults feed the resolver's implied
//! conversion steps and the request-building helpers; they are parameters
//! like any other and therefore participate in fingerprints.

use serde::Deserialize;

use crate::descriptor::{Operation, TaperEnd};
use crate::error::GmResult;

/// Top-level crate configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Log level filter string (consumed by the embedding application).
    pub log_level: String,
    /// Numeric defaults for processing steps.
    pub processing: ProcessingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            processing: ProcessingSettings::default(),
        }
    }
}

/// Defaults for processing parameters not spelled out by a request.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProcessingSettings {
    /// Counts-to-velocity gain applied when a raw record is converted.
    pub raw_gain: f64,
    /// Kaiser window shape parameter for tapers.
    pub taper_beta: f64,
    /// Damping ratio for response spectra.
    pub damping_ratio: f64,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            raw_gain: 1.0,
            taper_beta: 6.0,
            damping_ratio: 0.05,
        }
    }
}

impl ProcessingSettings {
    /// A taper step using the configured Kaiser beta.
    pub fn taper(&self, end: TaperEnd, fraction: f64) -> Operation {
        Operation::Taper {
            end,
            fraction,
            beta: self.taper_beta,
        }
    }

    /// A response-spectrum step using the configured damping ratio.
    pub fn response_spectrum(&self, periods: Vec<f64>) -> Operation {
        Operation::ResponseSpectrum {
            periods,
            damping: self.damping_ratio,
        }
    }
}

impl Settings {
    /// Loads `config/<config_name>.toml`, falling back to `config/default`.
    pub fn new(config_name: Option<&str>) -> GmResult<Self> {
        let config_path = format!("config/{}", config_name.unwrap_or("default"));
        let s = config::Config::builder()
            .add_source(config::File::with_name(&config_path))
            .build()?;
        Ok(s.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.log_level, "info");
        assert_eq!(s.processing.raw_gain, 1.0);
        assert!(s.processing.damping_ratio > 0.0 && s.processing.damping_ratio < 1.0);
    }

    #[test]
    fn loads_the_shipped_default_file() {
        let s = Settings::new(None).expect("config/default.toml should parse");
        assert_eq!(s.processing.taper_beta, 6.0);
    }

    #[test]
    fn helpers_thread_the_configured_defaults() {
        let p = ProcessingSettings {
            raw_gain: 2.0,
            taper_beta: 4.5,
            damping_ratio: 0.02,
        };
        match p.taper(TaperEnd::Front, 0.1) {
            Operation::Taper { beta, .. } => assert_eq!(beta, 4.5),
            other => panic!("unexpected operation: {other:?}"),
        }
        match p.response_spectrum(vec![1.0]) {
            Operation::ResponseSpectrum { damping, .. } => assert_eq!(damping, 0.02),
            other => panic!("unexpected operation: {other:?}"),
        }
    }
}
