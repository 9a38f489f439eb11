//! Radiometric configuration of a band and per-instance diagnostic context

use crate::core::functions::ProcessingFunction;
use crate::types::{AtmosphereModel, RasterError, RasterResult, ThermalConstants, Units};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Calibration and processing parameters for a single band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiometricConfig {
    /// Multiplicative calibration constant
    pub gain: f64,
    /// Additive calibration constant
    pub offset: f64,
    /// No-data sentinel, if the band declares one
    pub nodata: Option<f64>,
    /// Minimum valid digital count
    pub min_dc: f64,
    /// Maximum valid digital count (saturation level)
    pub max_dc: f64,
    /// Physical units of the linearized values
    pub units: Units,
    /// Units requested by the reader
    pub units_out: Units,
    /// Exo-atmospheric solar irradiance
    pub esun: f64,
    /// Present for thermal bands
    pub thermal: Option<ThermalConstants>,
    pub atmosphere: Option<AtmosphereModel>,
    /// Applied in order after unit conversion
    pub functions: Vec<ProcessingFunction>,
}

impl Default for RadiometricConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
            nodata: None,
            min_dc: 0.0,
            max_dc: 255.0,
            units: Units::Raw,
            units_out: Units::Raw,
            esun: 1.0,
            thermal: None,
            atmosphere: None,
            functions: Vec::new(),
        }
    }
}

impl RadiometricConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> RasterResult<Self> {
        let config: RadiometricConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> RasterResult<Self> {
        log::debug!("Loading radiometric configuration from {}", path.as_ref().display());
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn is_thermal(&self) -> bool {
        self.thermal.is_some()
    }

    /// Whether the gain/offset linearization is a no-op
    pub fn is_identity_scaling(&self) -> bool {
        self.gain == 1.0 && self.offset == 0.0
    }

    /// Whether a radiance to reflectance (or temperature) conversion is requested
    pub fn converts_to_reflectance(&self) -> bool {
        self.units == Units::Radiance && self.units_out == Units::Reflectance
    }

    /// Value masked pixels are stamped with
    pub fn fill_value(&self) -> f64 {
        self.nodata.unwrap_or(0.0)
    }

    /// Check the parameters for values the correction math cannot use
    pub fn validate(&self) -> RasterResult<()> {
        if !self.gain.is_finite() || self.gain == 0.0 {
            return Err(RasterError::Config(format!(
                "Gain must be finite and non-zero, got {}",
                self.gain
            )));
        }
        if !self.offset.is_finite() {
            return Err(RasterError::Config(format!("Offset must be finite, got {}", self.offset)));
        }
        if self.min_dc > self.max_dc {
            return Err(RasterError::Config(format!(
                "Digital count bounds inverted: min {} > max {}",
                self.min_dc, self.max_dc
            )));
        }
        if let Some(atm) = &self.atmosphere {
            if !atm.t.is_finite() || atm.t <= 0.0 {
                return Err(RasterError::Config(format!(
                    "Atmospheric transmittance must be positive, got {}",
                    atm.t
                )));
            }
        }
        if self.converts_to_reflectance() && !self.is_thermal() {
            match &self.atmosphere {
                Some(atm) if atm.ld <= 0.0 || !atm.ld.is_finite() => {
                    return Err(RasterError::Config(format!(
                        "Downwelling radiance must be positive for reflectance conversion, got {}",
                        atm.ld
                    )));
                }
                None if self.esun <= 0.0 || !self.esun.is_finite() => {
                    return Err(RasterError::Config(format!(
                        "Solar irradiance must be positive for reflectance conversion, got {}",
                        self.esun
                    )));
                }
                _ => {}
            }
        }
        if self.units_out == Units::Reflectance && self.units == Units::Raw {
            log::warn!("Reflectance requested from raw units; no unit conversion will be applied");
        }
        Ok(())
    }
}

/// Per-instance diagnostic settings threaded into every read and write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoContext {
    pub verbosity: u8,
}

impl IoContext {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    /// Step-by-step pipeline tracing
    pub fn traces_steps(&self) -> bool {
        self.verbosity > 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let config = RadiometricConfig::default();
        assert!(config.is_identity_scaling());
        assert!(!config.converts_to_reflectance());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml_text = r#"
            gain = 0.5
            offset = 10.0
            nodata = 0.0
            units = "radiance"
            units_out = "reflectance"
            esun = 1536.0
            functions = [
                { op = ">", operand = 0.2 },
                { op = "+", operand = 1.0 },
            ]

            [atmosphere]
            lu = 1.2
            ld = 3.4
            t = 0.9
        "#;

        let config = RadiometricConfig::from_toml_str(toml_text).unwrap();
        assert_eq!(config.gain, 0.5);
        assert_eq!(config.nodata, Some(0.0));
        assert_eq!(config.units, Units::Radiance);
        assert!(config.converts_to_reflectance());
        assert_eq!(config.atmosphere, Some(AtmosphereModel::new(1.2, 3.4, 0.9)));
        assert_eq!(
            config.functions,
            vec![ProcessingFunction::Greater(0.2), ProcessingFunction::Add(1.0)]
        );
        // Unspecified fields keep their defaults
        assert_eq!(config.max_dc, 255.0);
    }

    #[test]
    fn test_validate_rejects_zero_gain() {
        let config = RadiometricConfig {
            gain: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RasterError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_transmittance() {
        let config = RadiometricConfig {
            atmosphere: Some(AtmosphereModel::new(0.0, 1.0, 0.0)),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_esun_for_reflectance() {
        let config = RadiometricConfig {
            units: Units::Radiance,
            units_out: Units::Reflectance,
            esun: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_function_symbol_fails_to_parse() {
        let result = RadiometricConfig::from_toml_str(r#"functions = [{ op = "!=", operand = 1.0 }]"#);
        assert!(matches!(result, Err(RasterError::Toml(_))));
    }

    #[test]
    fn test_verbosity_threshold() {
        assert!(!IoContext::new(3).traces_steps());
        assert!(IoContext::new(4).traces_steps());
    }
}
