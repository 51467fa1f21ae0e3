pub mod alphabet;
pub mod audio;
pub mod config;
pub mod error;
pub mod keyer;
pub mod schedule;
pub mod synth;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use alphabet::*;
pub use audio::*;
pub use config::*;
pub use error::*;
pub use keyer::*;
pub use schedule::*;
pub use synth::*;

pub const SAMPLE_RATE: u32 = 48000;

/// Seconds per dot at 1 WPM, from the 50-unit "PARIS" calibration word.
pub const PARIS_UNIT_SECONDS: f64 = 1.2;

pub const DEFAULT_WPM: f64 = 20.0;
pub const DEFAULT_FREQUENCY_HZ: f32 = 600.0;
pub const DEFAULT_AMPLITUDE: f32 = 0.5;

/// Gain ramp between envelope targets; keeps keying free of clicks.
pub const GAIN_RAMP_SECONDS: f32 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

impl std::str::FromStr for Waveform {
    type Err = error::KeyerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            other => Err(error::KeyerError::InvalidConfiguration {
                field: "waveform",
                reason: format!(
                    "unknown waveform '{other}' (expected sine, square, sawtooth or triangle)"
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_parse() {
        assert_eq!("sine".parse::<Waveform>().unwrap(), Waveform::Sine);
        assert_eq!("SQUARE".parse::<Waveform>().unwrap(), Waveform::Square);
        assert_eq!("sawtooth".parse::<Waveform>().unwrap(), Waveform::Sawtooth);
        assert_eq!("Triangle".parse::<Waveform>().unwrap(), Waveform::Triangle);
        assert!("noise".parse::<Waveform>().is_err());
    }

    #[test]
    fn test_waveform_name_roundtrip() {
        for wf in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Sawtooth,
            Waveform::Triangle,
        ] {
            assert_eq!(wf.name().parse::<Waveform>().unwrap(), wf);
        }
    }
}
