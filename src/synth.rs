use crate::config::TimingConfig;
use crate::schedule::Schedule;
use crate::{Waveform, GAIN_RAMP_SECONDS};
use std::f32::consts::PI;

/// One oscillator sample for a phase in cycles [0, 1).
pub fn waveform_sample(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (2.0 * PI * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
    }
}

/// Sample-by-sample keyed oscillator. Walks a schedule's gain transitions
/// and slews the gain over a short ramp so keying stays click-free. Shared
/// by the live cpal backend and the offline renderer.
#[derive(Debug)]
pub struct Voice {
    sample_rate: f32,
    frequency: f32,
    waveform: Waveform,
    phase: f32,
    gain: f32,
    target_gain: f32,
    ramp_step: f32,
    events: Vec<(u64, f32)>,
    next_event: usize,
    position: u64,
    end_sample: u64,
}

impl Voice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            frequency: 600.0,
            waveform: Waveform::Sine,
            phase: 0.0,
            gain: 0.0,
            target_gain: 0.0,
            ramp_step: 1.0 / (GAIN_RAMP_SECONDS * sample_rate as f32),
            events: Vec::new(),
            next_event: 0,
            position: 0,
            end_sample: 0,
        }
    }

    /// Arms the voice with a schedule and a tone snapshot. Timestamps are
    /// rebased so sample 0 corresponds to the schedule origin.
    pub fn load(&mut self, schedule: &Schedule, config: &TimingConfig) {
        let origin = schedule.origin();
        self.events = schedule
            .events()
            .iter()
            .map(|event| {
                let offset = ((event.at - origin) * f64::from(self.sample_rate)).round() as u64;
                (offset, event.gain)
            })
            .collect();
        self.end_sample =
            (schedule.duration() * f64::from(self.sample_rate)).ceil() as u64;
        self.frequency = config.frequency_hz();
        self.waveform = config.waveform();
        self.phase = 0.0;
        self.gain = 0.0;
        self.target_gain = 0.0;
        self.next_event = 0;
        self.position = 0;
    }

    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency = frequency_hz;
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Retargets the keyed level: pending mark transitions and a mark
    /// already underway pick up the new amplitude.
    pub fn set_amplitude(&mut self, amplitude: f32) {
        for event in &mut self.events[self.next_event..] {
            if event.1 > 0.0 {
                event.1 = amplitude;
            }
        }
        if self.target_gain > 0.0 {
            self.target_gain = amplitude;
        }
    }

    pub fn finished(&self) -> bool {
        self.position >= self.end_sample
    }

    pub fn next_sample(&mut self) -> f32 {
        while self.next_event < self.events.len() && self.events[self.next_event].0 <= self.position
        {
            self.target_gain = self.events[self.next_event].1;
            self.next_event += 1;
        }

        let delta = self.target_gain - self.gain;
        self.gain += delta.clamp(-self.ramp_step, self.ramp_step);

        let value = waveform_sample(self.waveform, self.phase) * self.gain;

        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.position += 1;

        value
    }
}

/// Renders a schedule to raw samples with the same envelope the live
/// backend produces. Used for WAV export, wasm hosts and tests.
pub struct OfflineRenderer {
    sample_rate: u32,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn render(&self, schedule: &Schedule, config: &TimingConfig) -> Vec<f32> {
        let mut voice = Voice::new(self.sample_rate);
        voice.load(schedule, config);

        let mut samples =
            Vec::with_capacity((schedule.duration() * f64::from(self.sample_rate)).ceil() as usize);
        while !voice.finished() {
            samples.push(voice.next_sample());
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Symbol;
    use crate::SAMPLE_RATE;

    fn dot_schedule(unit: f64, amplitude: f32) -> (Schedule, TimingConfig) {
        let config = TimingConfig::new(unit, 600.0, amplitude, Waveform::Sine).unwrap();
        let schedule = Schedule::build(&[Symbol::Dot], &config, 0.0);
        (schedule, config)
    }

    #[test]
    fn test_waveform_samples() {
        assert!(waveform_sample(Waveform::Sine, 0.0).abs() < 1e-6);
        assert!((waveform_sample(Waveform::Sine, 0.25) - 1.0).abs() < 1e-6);
        assert_eq!(waveform_sample(Waveform::Square, 0.1), 1.0);
        assert_eq!(waveform_sample(Waveform::Square, 0.9), -1.0);
        assert!((waveform_sample(Waveform::Sawtooth, 0.0) + 1.0).abs() < 1e-6);
        assert!((waveform_sample(Waveform::Triangle, 0.5) - 1.0).abs() < 1e-6);
        assert!((waveform_sample(Waveform::Triangle, 0.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_render_length_matches_schedule() {
        let (schedule, config) = dot_schedule(0.06, 0.5);
        let samples = OfflineRenderer::new(SAMPLE_RATE).render(&schedule, &config);
        let expected = (schedule.duration() * f64::from(SAMPLE_RATE)).ceil() as usize;
        assert_eq!(samples.len(), expected);
    }

    #[test]
    fn test_mark_carries_energy_and_gap_is_silent() {
        let (schedule, config) = dot_schedule(0.06, 0.5);
        let sr = SAMPLE_RATE as usize;
        let samples = OfflineRenderer::new(SAMPLE_RATE).render(&schedule, &config);

        // Middle of the mark: well past the attack ramp.
        let mark_mid = &samples[sr * 3 / 100..sr * 4 / 100];
        let peak = mark_mid.iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!(peak > 0.4, "expected keyed tone, peak was {peak}");

        // Middle of the trailing gap: ramp has long since decayed.
        let gap_mid = &samples[sr * 9 / 100..sr * 10 / 100];
        let residue = gap_mid.iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!(residue < 1e-3, "expected silence in the gap, got {residue}");
    }

    #[test]
    fn test_gain_never_exceeds_amplitude() {
        let (schedule, config) = dot_schedule(0.06, 0.3);
        let samples = OfflineRenderer::new(SAMPLE_RATE).render(&schedule, &config);
        for &s in &samples {
            assert!(s.abs() <= 0.3 + 1e-4);
        }
    }

    #[test]
    fn test_live_amplitude_change_applies_to_pending_marks() {
        let config = TimingConfig::new(0.06, 600.0, 0.5, Waveform::Square).unwrap();
        let schedule = Schedule::build(&[Symbol::Dot, Symbol::Dot], &config, 0.0);

        let mut voice = Voice::new(SAMPLE_RATE);
        voice.load(&schedule, &config);
        voice.set_amplitude(1.0);

        let mut peak = 0.0f32;
        while !voice.finished() {
            peak = peak.max(voice.next_sample().abs());
        }
        assert!(peak > 0.9, "retargeted amplitude not reached, peak {peak}");
    }

    #[test]
    fn test_fresh_voice_is_finished() {
        let voice = Voice::new(SAMPLE_RATE);
        assert!(voice.finished());
    }
}
