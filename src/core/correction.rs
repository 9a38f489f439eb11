use crate::config::RadiometricConfig;
use crate::types::{RasterError, RasterResult, ThermalConstants};
use ndarray::{Array2, Zip};

/// Celsius offset applied to recovered brightness temperatures
pub const KELVIN_OFFSET: f64 = 273.15;

/// Surface emissivity assumed for thermal bands (water)
pub const THERMAL_EMISSIVITY: f64 = 0.95;

/// Radiometric correction steps applied, in fixed order, to a raw chunk:
/// gain/offset linearization, atmospheric correction, unit conversion and
/// the user function list.
pub struct CorrectionPipeline<'a> {
    config: &'a RadiometricConfig,
    label: Option<&'a str>,
}

impl<'a> CorrectionPipeline<'a> {
    pub fn new(config: &'a RadiometricConfig) -> Self {
        Self { config, label: None }
    }

    /// Emit per-step traces tagged with `label`
    pub fn with_trace(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// Run every applicable step on `buffer`.
    ///
    /// `invalid` flags pixels that held the no-data sentinel before correction; they
    /// are exempt from the domain checks of temperature recovery. Returns whether any
    /// step modified the buffer.
    pub fn apply(&self, buffer: &mut Array2<f64>, invalid: Option<&Array2<bool>>) -> RasterResult<bool> {
        let mut updated = false;
        updated |= self.linearize(buffer);
        updated |= self.correct_atmosphere(buffer);
        updated |= self.convert_units(buffer, invalid)?;
        updated |= self.apply_functions(buffer);
        Ok(updated)
    }

    /// gain * (dc - min_dc) + offset
    pub fn linearize(&self, buffer: &mut Array2<f64>) -> bool {
        let config = self.config;
        if config.is_identity_scaling() {
            return false;
        }
        self.trace(format_args!("linearizing ({}x + {})", config.gain, config.offset));
        buffer.mapv_inplace(|v| config.gain * (v - config.min_dc) + config.offset);
        true
    }

    /// Remove path radiance and transmittance losses
    pub fn correct_atmosphere(&self, buffer: &mut Array2<f64>) -> bool {
        let atm = match &self.config.atmosphere {
            Some(atm) => *atm,
            None => return false,
        };
        self.trace(format_args!("applying atmosphere (Lu={}, Ld={}, t={})", atm.lu, atm.ld, atm.t));

        let e = if self.config.is_thermal() { THERMAL_EMISSIVITY } else { 1.0 };
        let path = atm.lu + (1.0 - e) * atm.ld;
        let scale = atm.t * e;
        buffer.mapv_inplace(|v| (v - path) / scale);
        true
    }

    /// Radiance to reflectance, or to brightness temperature for thermal bands
    pub fn convert_units(&self, buffer: &mut Array2<f64>, invalid: Option<&Array2<bool>>) -> RasterResult<bool> {
        if !self.config.converts_to_reflectance() {
            return Ok(false);
        }

        match &self.config.thermal {
            Some(constants) => {
                self.trace(format_args!("converting radiance to temperature"));
                brightness_temperature(buffer, constants, invalid)?;
            }
            None => {
                let normrad = match &self.config.atmosphere {
                    Some(atm) => 1.0 / atm.ld,
                    None => 1.0 / self.config.esun,
                };
                self.trace(format_args!("converting radiance to reflectance (x{})", normrad));
                buffer.mapv_inplace(|v| v * normrad);
            }
        }
        Ok(true)
    }

    /// User functions in list order
    pub fn apply_functions(&self, buffer: &mut Array2<f64>) -> bool {
        for function in &self.config.functions {
            self.trace(format_args!("applying function {}", function));
            function.apply(buffer);
        }
        !self.config.functions.is_empty()
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if let Some(label) = self.label {
            log::debug!("{}: {}", label, message);
        }
    }
}

/// K2 / ln(K1 / L + 1) - 273.15, in degrees Celsius.
///
/// Fails on the first valid pixel for which the logarithm is undefined or the
/// result is not finite.
pub fn brightness_temperature(
    buffer: &mut Array2<f64>,
    constants: &ThermalConstants,
    invalid: Option<&Array2<bool>>,
) -> RasterResult<()> {
    let convert = |(row, col): (usize, usize), v: &mut f64| -> RasterResult<()> {
        let arg = constants.k1 / *v + 1.0;
        let temperature = constants.k2 / arg.ln() - KELVIN_OFFSET;
        if !(arg.is_finite() && arg > 0.0) || !temperature.is_finite() {
            return Err(RasterError::Domain(format!(
                "brightness temperature undefined for radiance {} at row {}, col {}",
                v, row, col
            )));
        }
        *v = temperature;
        Ok(())
    };

    match invalid {
        Some(mask) => {
            let mut result = Ok(());
            Zip::indexed(buffer).and(mask).for_each(|idx, v, &skip| {
                if !skip && result.is_ok() {
                    result = convert(idx, v);
                }
            });
            result
        }
        None => {
            for (idx, v) in buffer.indexed_iter_mut() {
                convert(idx, v)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::ProcessingFunction;
    use crate::types::{AtmosphereModel, Units};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_linearization() {
        let config = RadiometricConfig {
            gain: 0.5,
            offset: 10.0,
            ..Default::default()
        };
        let mut buffer = array![[100.0]];
        let updated = CorrectionPipeline::new(&config).apply(&mut buffer, None).unwrap();

        assert!(updated);
        assert_abs_diff_eq!(buffer[[0, 0]], 60.0);
    }

    #[test]
    fn test_linearization_subtracts_min_dc() {
        let config = RadiometricConfig {
            gain: 2.0,
            offset: 1.0,
            min_dc: 5.0,
            ..Default::default()
        };
        let mut buffer = array![[10.0, 5.0]];
        CorrectionPipeline::new(&config).linearize(&mut buffer);
        assert_eq!(buffer, array![[11.0, 1.0]]);
    }

    #[test]
    fn test_identity_config_leaves_buffer_untouched() {
        let config = RadiometricConfig::default();
        let mut buffer = array![[1.0, 2.0]];
        let updated = CorrectionPipeline::new(&config).apply(&mut buffer, None).unwrap();
        assert!(!updated);
        assert_eq!(buffer, array![[1.0, 2.0]]);
    }

    #[test]
    fn test_atmospheric_correction_reflective() {
        let config = RadiometricConfig {
            atmosphere: Some(AtmosphereModel::new(2.0, 8.0, 0.5)),
            ..Default::default()
        };
        let mut buffer = array![[12.0]];
        CorrectionPipeline::new(&config).correct_atmosphere(&mut buffer);
        // (12 - 2) / 0.5
        assert_abs_diff_eq!(buffer[[0, 0]], 20.0);
    }

    #[test]
    fn test_atmospheric_correction_thermal_uses_emissivity() {
        let config = RadiometricConfig {
            atmosphere: Some(AtmosphereModel::new(1.0, 4.0, 0.8)),
            thermal: Some(ThermalConstants { k1: 774.89, k2: 1321.08 }),
            ..Default::default()
        };
        let mut buffer = array![[10.0]];
        CorrectionPipeline::new(&config).correct_atmosphere(&mut buffer);
        let expected = (10.0 - (1.0 + 0.05 * 4.0)) / (0.8 * 0.95);
        assert_abs_diff_eq!(buffer[[0, 0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_reflectance_uses_esun_without_atmosphere() {
        let config = RadiometricConfig {
            units: Units::Radiance,
            units_out: Units::Reflectance,
            esun: 200.0,
            ..Default::default()
        };
        let mut buffer = array![[50.0]];
        CorrectionPipeline::new(&config).convert_units(&mut buffer, None).unwrap();
        assert_abs_diff_eq!(buffer[[0, 0]], 0.25);
    }

    #[test]
    fn test_reflectance_uses_downwelling_with_atmosphere() {
        let config = RadiometricConfig {
            units: Units::Radiance,
            units_out: Units::Reflectance,
            esun: 200.0,
            atmosphere: Some(AtmosphereModel::new(0.0, 4.0, 1.0)),
            ..Default::default()
        };
        let mut buffer = array![[2.0]];
        CorrectionPipeline::new(&config).apply(&mut buffer, None).unwrap();
        assert_abs_diff_eq!(buffer[[0, 0]], 0.5);
    }

    #[test]
    fn test_no_conversion_unless_radiance_to_reflectance() {
        let config = RadiometricConfig {
            units: Units::Raw,
            units_out: Units::Reflectance,
            esun: 200.0,
            ..Default::default()
        };
        let mut buffer = array![[50.0]];
        let updated = CorrectionPipeline::new(&config).convert_units(&mut buffer, None).unwrap();
        assert!(!updated);
        assert_eq!(buffer[[0, 0]], 50.0);
    }

    #[test]
    fn test_brightness_temperature() {
        let constants = ThermalConstants { k1: 774.89, k2: 1321.08 };
        let mut buffer = array![[10.0]];
        brightness_temperature(&mut buffer, &constants, None).unwrap();
        let expected = 1321.08 / (774.89f64 / 10.0 + 1.0).ln() - 273.15;
        assert_abs_diff_eq!(buffer[[0, 0]], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_brightness_temperature_domain_error() {
        let constants = ThermalConstants { k1: 774.89, k2: 1321.08 };

        // K1 / L + 1 <= 0
        let mut negative = array![[-100.0]];
        let err = brightness_temperature(&mut negative, &constants, None).unwrap_err();
        assert!(matches!(err, RasterError::Domain(_)));

        // Zero radiance drives the logarithm to infinity
        let mut zero = array![[0.0]];
        assert!(brightness_temperature(&mut zero, &constants, None).is_err());
    }

    #[test]
    fn test_brightness_temperature_skips_invalid_pixels() {
        let constants = ThermalConstants { k1: 774.89, k2: 1321.08 };
        let mut buffer = array![[0.0, 10.0]];
        let invalid = array![[true, false]];
        brightness_temperature(&mut buffer, &constants, Some(&invalid)).unwrap();
        assert_eq!(buffer[[0, 0]], 0.0);
        assert!(buffer[[0, 1]] > 0.0);
    }

    #[test]
    fn test_functions_apply_in_order() {
        let config = RadiometricConfig {
            functions: vec![ProcessingFunction::Add(5.0), ProcessingFunction::Greater(50.0)],
            ..Default::default()
        };
        let mut buffer = array![[40.0, 46.0, 60.0]];
        let updated = CorrectionPipeline::new(&config).apply(&mut buffer, None).unwrap();
        assert!(updated);
        assert_eq!(buffer, array![[0.0, 1.0, 1.0]]);
    }
}
