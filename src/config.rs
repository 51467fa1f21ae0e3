use crate::error::{KeyerError, Result};
use crate::{
    Waveform, DEFAULT_AMPLITUDE, DEFAULT_FREQUENCY_HZ, DEFAULT_WPM, PARIS_UNIT_SECONDS,
};

/// Keying parameters. Fields are private so a constructed value is always
/// inside its valid domain; mutation goes through the validating setters.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    unit_seconds: f64,
    frequency_hz: f32,
    amplitude: f32,
    waveform: Waveform,
}

impl TimingConfig {
    pub fn new(
        unit_seconds: f64,
        frequency_hz: f32,
        amplitude: f32,
        waveform: Waveform,
    ) -> Result<Self> {
        let mut config = Self::default();
        config.set_unit_seconds(unit_seconds)?;
        config.set_frequency_hz(frequency_hz)?;
        config.set_amplitude(amplitude)?;
        config.set_waveform(waveform);
        Ok(config)
    }

    pub fn from_wpm(
        wpm: f64,
        frequency_hz: f32,
        amplitude: f32,
        waveform: Waveform,
    ) -> Result<Self> {
        let mut config = Self::default();
        config.set_wpm(wpm)?;
        config.set_frequency_hz(frequency_hz)?;
        config.set_amplitude(amplitude)?;
        config.set_waveform(waveform);
        Ok(config)
    }

    /// Duration of one dot, in seconds.
    pub fn unit_seconds(&self) -> f64 {
        self.unit_seconds
    }

    /// Speed in words per minute under the PARIS calibration.
    pub fn wpm(&self) -> f64 {
        PARIS_UNIT_SECONDS / self.unit_seconds
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_unit_seconds(&mut self, unit_seconds: f64) -> Result<()> {
        if !unit_seconds.is_finite() || unit_seconds <= 0.0 {
            return Err(KeyerError::InvalidConfiguration {
                field: "unit_seconds",
                reason: format!("must be a positive number of seconds, got {unit_seconds}"),
            });
        }
        self.unit_seconds = unit_seconds;
        Ok(())
    }

    /// Setting the speed recomputes the unit duration and vice versa.
    pub fn set_wpm(&mut self, wpm: f64) -> Result<()> {
        if !wpm.is_finite() || wpm <= 0.0 {
            return Err(KeyerError::InvalidConfiguration {
                field: "wpm",
                reason: format!("must be a positive speed, got {wpm}"),
            });
        }
        self.unit_seconds = PARIS_UNIT_SECONDS / wpm;
        Ok(())
    }

    pub fn set_frequency_hz(&mut self, frequency_hz: f32) -> Result<()> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(KeyerError::InvalidConfiguration {
                field: "frequency_hz",
                reason: format!("must be a positive frequency, got {frequency_hz}"),
            });
        }
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    pub fn set_amplitude(&mut self, amplitude: f32) -> Result<()> {
        if !amplitude.is_finite() || !(0.0..=1.0).contains(&amplitude) {
            return Err(KeyerError::InvalidConfiguration {
                field: "amplitude",
                reason: format!("must be within 0.0..=1.0, got {amplitude}"),
            });
        }
        self.amplitude = amplitude;
        Ok(())
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            unit_seconds: PARIS_UNIT_SECONDS / DEFAULT_WPM,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            amplitude: DEFAULT_AMPLITUDE,
            waveform: Waveform::Sine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wpm_unit_roundtrip() {
        let mut config = TimingConfig::default();
        config.set_wpm(20.0).unwrap();
        assert!((config.wpm() - 20.0).abs() < 1e-9);
        assert!((config.unit_seconds() - 0.06).abs() < 1e-9);

        config.set_unit_seconds(0.12).unwrap();
        assert!((config.wpm() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_out_of_range_amplitude() {
        let mut config = TimingConfig::default();
        let before = config.clone();

        let err = config.set_amplitude(1.5).unwrap_err();
        assert!(matches!(
            err,
            KeyerError::InvalidConfiguration { field: "amplitude", .. }
        ));
        assert_eq!(config, before);

        assert!(config.set_amplitude(-0.1).is_err());
        assert!(config.set_amplitude(0.0).is_ok());
        assert!(config.set_amplitude(1.0).is_ok());
    }

    #[test]
    fn test_rejects_non_positive_timing() {
        let mut config = TimingConfig::default();
        assert!(config.set_unit_seconds(0.0).is_err());
        assert!(config.set_unit_seconds(-0.06).is_err());
        assert!(config.set_unit_seconds(f64::NAN).is_err());
        assert!(config.set_wpm(0.0).is_err());
        assert!(config.set_frequency_hz(0.0).is_err());
        assert!(config.set_frequency_hz(f32::INFINITY).is_err());
    }

    #[test]
    fn test_invalid_constructor_names_field() {
        let err = TimingConfig::new(0.06, -440.0, 0.5, Waveform::Sine).unwrap_err();
        match err {
            KeyerError::InvalidConfiguration { field, .. } => {
                assert_eq!(field, "frequency_hz")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_wpm() {
        let config = TimingConfig::from_wpm(25.0, 700.0, 0.8, Waveform::Square).unwrap();
        assert!((config.unit_seconds() - 0.048).abs() < 1e-9);
        assert_eq!(config.frequency_hz(), 700.0);
        assert_eq!(config.amplitude(), 0.8);
        assert_eq!(config.waveform(), Waveform::Square);
    }
}
