use crate::alphabet::Symbol;
use crate::config::TimingConfig;

/// A single gain transition for the tone generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEvent {
    /// Absolute timestamp in seconds against the keyer's clock.
    pub at: f64,
    /// Gain level to apply at that instant.
    pub gain: f32,
}

/// Time-stamped gain envelope for one playback. Built once per play from a
/// configuration snapshot; configuration changes after the fact do not move
/// these timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    events: Vec<GainEvent>,
    origin: f64,
    end: f64,
}

impl Schedule {
    pub fn build(symbols: &[Symbol], config: &TimingConfig, origin: f64) -> Self {
        let unit = config.unit_seconds();
        let amplitude = config.amplitude();

        let mut events = Vec::with_capacity(symbols.len() * 2);
        let mut cursor = origin;

        for &symbol in symbols {
            if symbol.is_mark() {
                events.push(GainEvent {
                    at: cursor,
                    gain: amplitude,
                });
                cursor += f64::from(symbol.mark_units()) * unit;
                events.push(GainEvent { at: cursor, gain: 0.0 });
                // Trailing inter-element gap, one unit.
                cursor += unit;
            } else {
                cursor += f64::from(symbol.advance_units()) * unit;
            }
        }

        Self {
            events,
            origin,
            end: cursor,
        }
    }

    pub fn events(&self) -> &[GainEvent] {
        &self.events
    }

    pub fn origin(&self) -> f64 {
        self.origin
    }

    /// The instant the generator must fall silent.
    pub fn end_time(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.origin
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::encode;
    use crate::Waveform;

    fn config_at(unit_seconds: f64, amplitude: f32) -> TimingConfig {
        TimingConfig::new(unit_seconds, 600.0, amplitude, Waveform::Sine).unwrap()
    }

    #[test]
    fn test_single_dot() {
        // 0.06 s per unit is 20 WPM under the PARIS calibration.
        let config = config_at(0.06, 0.5);
        let schedule = Schedule::build(&[Symbol::Dot], &config, 10.0);

        let events = schedule.events();
        assert_eq!(events.len(), 2);
        assert!((events[0].at - 10.0).abs() < 1e-9);
        assert_eq!(events[0].gain, 0.5);
        assert!((events[1].at - 10.06).abs() < 1e-9);
        assert_eq!(events[1].gain, 0.0);
        assert!((schedule.end_time() - 10.12).abs() < 1e-9);
    }

    #[test]
    fn test_single_dash() {
        let config = config_at(0.06, 0.5);
        let schedule = Schedule::build(&[Symbol::Dash], &config, 10.0);

        let events = schedule.events();
        assert_eq!(events.len(), 2);
        assert!((events[0].at - 10.0).abs() < 1e-9);
        assert_eq!(events[0].gain, 0.5);
        assert!((events[1].at - 10.18).abs() < 1e-9);
        assert_eq!(events[1].gain, 0.0);
        assert!((schedule.end_time() - 10.24).abs() < 1e-9);
    }

    #[test]
    fn test_two_character_end_time_matches_symbol_sum() {
        let unit = 0.05;
        let config = config_at(unit, 0.5);
        let symbols = encode("et");
        assert_eq!(symbols, vec![Symbol::Dot, Symbol::CharGap, Symbol::Dash]);

        let schedule = Schedule::build(&symbols, &config, 0.0);
        let expected: f64 = symbols
            .iter()
            .map(|s| f64::from(s.advance_units()) * unit)
            .sum();
        assert!((schedule.end_time() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_word_gap_advances_seven_units() {
        let unit = 0.04;
        let config = config_at(unit, 0.5);
        let schedule = Schedule::build(&[Symbol::WordGap], &config, 2.0);

        assert!(schedule.is_empty());
        assert!((schedule.duration() - 7.0 * unit).abs() < 1e-9);
    }

    #[test]
    fn test_transitions_strictly_increase_and_bracket_silence() {
        let config = config_at(0.06, 0.8);
        let symbols = encode("cq cq");
        let schedule = Schedule::build(&symbols, &config, 0.0);

        let events = schedule.events();
        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[0].at < pair[1].at, "timestamps must strictly increase");
        }
        assert!(events.first().unwrap().gain > 0.0);
        assert_eq!(events.last().unwrap().gain, 0.0);
        assert!(schedule.end_time() > events.last().unwrap().at);
    }

    #[test]
    fn test_deterministic() {
        let config = config_at(0.06, 0.5);
        let symbols = encode("paris");
        let a = Schedule::build(&symbols, &config, 1.5);
        let b = Schedule::build(&symbols, &config, 1.5);
        assert_eq!(a, b);
    }
}
