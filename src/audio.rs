use crate::config::TimingConfig;
use crate::error::{KeyerError, Result};
use crate::schedule::Schedule;
use crate::synth::Voice;
use crate::Waveform;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Fired exactly once when a schedule plays out to its end time. Must not
/// fire after `stop`.
pub type EndedCallback = Box<dyn FnOnce() + Send>;

/// Tone-generation capability the keyer drives. Implementations take a
/// gain-envelope schedule plus a tone snapshot, and report natural
/// completion through the one-shot callback.
pub trait ToneGenerator: Send {
    /// Begins producing the scheduled envelope immediately. Replaces any
    /// previous playback on this generator.
    fn start(
        &mut self,
        schedule: &Schedule,
        config: &TimingConfig,
        on_ended: EndedCallback,
    ) -> Result<()>;

    /// Silences output now and discards the pending ended callback.
    fn stop(&mut self);

    fn set_frequency(&mut self, frequency_hz: f32);
    fn set_amplitude(&mut self, amplitude: f32);
    fn set_waveform(&mut self, waveform: Waveform);
}

struct ActiveVoice {
    voice: Voice,
    on_ended: Option<EndedCallback>,
}

impl ActiveVoice {
    fn next_output(&mut self) -> f32 {
        let value = self.voice.next_sample();
        if self.voice.finished() {
            if let Some(ended) = self.on_ended.take() {
                ended();
            }
        }
        value
    }
}

/// Real audio backend: a mono output stream on the default device.
pub struct CpalToneGenerator {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    state: Arc<Mutex<ActiveVoice>>,
    stream: Option<Stream>,
}

// Stream is !Send on some platforms; the generator never moves it across
// threads after construction.
unsafe impl Send for CpalToneGenerator {}

impl CpalToneGenerator {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| KeyerError::AudioDevice("No output device found".into()))?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| KeyerError::AudioDevice(e.to_string()))?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(crate::SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let state = Arc::new(Mutex::new(ActiveVoice {
            voice: Voice::new(crate::SAMPLE_RATE),
            on_ended: None,
        }));

        Ok(Self {
            device,
            config,
            sample_format: supported_config.sample_format(),
            state,
            stream: None,
        })
    }
}

impl ToneGenerator for CpalToneGenerator {
    fn start(
        &mut self,
        schedule: &Schedule,
        config: &TimingConfig,
        on_ended: EndedCallback,
    ) -> Result<()> {
        self.stream = None;

        {
            let mut state = self.state.lock().unwrap();
            state.voice = Voice::new(self.config.sample_rate.0);
            state.voice.load(schedule, config);
            state.on_ended = Some(on_ended);
        }

        let stream = match self.sample_format {
            SampleFormat::F32 => {
                build_stream::<f32>(&self.device, &self.config, Arc::clone(&self.state))?
            }
            SampleFormat::I16 => {
                build_stream::<i16>(&self.device, &self.config, Arc::clone(&self.state))?
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&self.device, &self.config, Arc::clone(&self.state))?
            }
            other => {
                return Err(KeyerError::AudioDevice(format!(
                    "Unsupported sample format: {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| KeyerError::AudioDevice(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the stream tears the callback down; clearing the
        // pending callback guarantees no late completion fires.
        self.stream = None;
        let mut state = self.state.lock().unwrap();
        state.on_ended = None;
        state.voice = Voice::new(self.config.sample_rate.0);
    }

    fn set_frequency(&mut self, frequency_hz: f32) {
        self.state.lock().unwrap().voice.set_frequency(frequency_hz);
    }

    fn set_amplitude(&mut self, amplitude: f32) {
        self.state.lock().unwrap().voice.set_amplitude(amplitude);
    }

    fn set_waveform(&mut self, waveform: Waveform) {
        self.state.lock().unwrap().voice.set_waveform(waveform);
    }
}

fn build_stream<S>(
    device: &Device,
    config: &StreamConfig,
    state: Arc<Mutex<ActiveVoice>>,
) -> Result<Stream>
where
    S: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [S], _: &cpal::OutputCallbackInfo| {
                let mut state = state.lock().unwrap();
                for frame in data.chunks_mut(channels) {
                    let out = S::from_sample(state.next_output());
                    for sample in frame.iter_mut() {
                        *sample = out;
                    }
                }
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| KeyerError::AudioDevice(e.to_string()))?;
    Ok(stream)
}

/// Timing-accurate backend with no sound output. Useful for rehearsing a
/// transmission and for no-audio builds.
pub struct SilentToneGenerator {
    cancel: Arc<AtomicBool>,
}

impl SilentToneGenerator {
    pub fn new() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for SilentToneGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneGenerator for SilentToneGenerator {
    fn start(
        &mut self,
        schedule: &Schedule,
        _config: &TimingConfig,
        on_ended: EndedCallback,
    ) -> Result<()> {
        self.cancel.store(true, Ordering::SeqCst);
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Arc::clone(&cancel);

        let duration = std::time::Duration::from_secs_f64(schedule.duration());
        std::thread::spawn(move || {
            std::thread::sleep(duration);
            if !cancel.load(Ordering::SeqCst) {
                on_ended();
            }
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn set_frequency(&mut self, _frequency_hz: f32) {}
    fn set_amplitude(&mut self, _amplitude: f32) {}
    fn set_waveform(&mut self, _waveform: Waveform) {}
}

pub fn list_output_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let Ok(name) = device.name() {
                devices.push(name);
            }
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Symbol;
    use std::sync::mpsc;
    use std::time::Duration;

    fn short_schedule() -> (Schedule, TimingConfig) {
        let config = TimingConfig::new(0.01, 600.0, 0.5, Waveform::Sine).unwrap();
        let schedule = Schedule::build(&[Symbol::Dot], &config, 0.0);
        (schedule, config)
    }

    #[test]
    fn test_silent_generator_reports_completion() {
        let (schedule, config) = short_schedule();
        let mut generator = SilentToneGenerator::new();
        let (tx, rx) = mpsc::channel();

        generator
            .start(&schedule, &config, Box::new(move || tx.send(()).unwrap()))
            .unwrap();

        rx.recv_timeout(Duration::from_secs(2))
            .expect("completion never fired");
    }

    #[test]
    fn test_silent_generator_stop_suppresses_completion() {
        let (schedule, config) = short_schedule();
        let mut generator = SilentToneGenerator::new();
        let (tx, rx) = mpsc::channel();

        generator
            .start(&schedule, &config, Box::new(move || tx.send(()).unwrap()))
            .unwrap();
        generator.stop();

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
