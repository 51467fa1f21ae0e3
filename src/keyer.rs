use crate::alphabet::encode;
use crate::audio::ToneGenerator;
use crate::config::TimingConfig;
use crate::error::{KeyerError, Result};
use crate::schedule::Schedule;
use crate::Waveform;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Monotonic time source used as the origin for scheduling.
pub trait Clock: Send {
    /// Seconds elapsed on this clock; never decreases.
    fn now(&self) -> f64;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// One playback session: the playing flag plus an epoch that invalidates
/// completion callbacks from plays that were stopped or superseded.
#[derive(Default)]
struct SessionState {
    playing: AtomicBool,
    epoch: AtomicU64,
}

impl SessionState {
    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn begin(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.playing.store(true, Ordering::SeqCst);
        epoch
    }

    /// Returns true when this natural completion is current and actually
    /// ended the session.
    fn finish_natural(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch && self.playing.swap(false, Ordering::SeqCst)
    }

    /// Returns true when a session was active to stop.
    fn finish_forced(&self) -> bool {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.playing.swap(false, Ordering::SeqCst)
    }
}

type EndedListener = Box<dyn FnMut() + Send>;

/// Keying engine: encodes text, schedules the gain envelope against a
/// monotonic clock and drives a tone generator through it. One playback at
/// a time; completion is asynchronous.
pub struct Keyer {
    config: TimingConfig,
    generator: Box<dyn ToneGenerator>,
    clock: Box<dyn Clock>,
    session: Arc<SessionState>,
    listeners: Arc<Mutex<Vec<EndedListener>>>,
}

impl std::fmt::Debug for Keyer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Keyer {
    pub fn builder() -> KeyerBuilder {
        KeyerBuilder::default()
    }

    /// Replaces the whole configuration. Frequency, amplitude and waveform
    /// reach a playback already in flight; the unit duration only affects
    /// future plays because schedules are precomputed.
    pub fn configure(&mut self, config: TimingConfig) {
        self.generator.set_frequency(config.frequency_hz());
        self.generator.set_amplitude(config.amplitude());
        self.generator.set_waveform(config.waveform());
        self.config = config;
    }

    pub fn set_wpm(&mut self, wpm: f64) -> Result<()> {
        self.config.set_wpm(wpm)
    }

    pub fn set_unit_seconds(&mut self, unit_seconds: f64) -> Result<()> {
        self.config.set_unit_seconds(unit_seconds)
    }

    pub fn set_frequency_hz(&mut self, frequency_hz: f32) -> Result<()> {
        self.config.set_frequency_hz(frequency_hz)?;
        self.generator.set_frequency(frequency_hz);
        Ok(())
    }

    pub fn set_amplitude(&mut self, amplitude: f32) -> Result<()> {
        self.config.set_amplitude(amplitude)?;
        self.generator.set_amplitude(amplitude);
        Ok(())
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.config.set_waveform(waveform);
        self.generator.set_waveform(waveform);
    }

    pub fn wpm(&self) -> f64 {
        self.config.wpm()
    }

    pub fn unit_seconds(&self) -> f64 {
        self.config.unit_seconds()
    }

    pub fn frequency_hz(&self) -> f32 {
        self.config.frequency_hz()
    }

    pub fn amplitude(&self) -> f32 {
        self.config.amplitude()
    }

    pub fn waveform(&self) -> Waveform {
        self.config.waveform()
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    /// Registers a listener fired exactly once per natural completion.
    /// Listeners are not fired for a forced `stop`.
    pub fn on_playback_ended(&mut self, listener: impl FnMut() + Send + 'static) {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }

    /// Encodes `text`, schedules it from the clock's current instant and
    /// starts the generator. Returns immediately; sound production and
    /// completion happen asynchronously.
    pub fn play(&mut self, text: &str) -> Result<()> {
        if self.session.is_playing() {
            return Err(KeyerError::AlreadyPlaying);
        }

        let symbols = encode(text);
        if symbols.is_empty() {
            return Err(KeyerError::NothingToPlay);
        }

        let schedule = Schedule::build(&symbols, &self.config, self.clock.now());
        log::debug!(
            "keying {} symbols over {:.2}s at {:.0} WPM",
            symbols.len(),
            schedule.duration(),
            self.config.wpm()
        );

        let epoch = self.session.begin();
        let session = Arc::clone(&self.session);
        let listeners = Arc::clone(&self.listeners);
        let on_ended = Box::new(move || {
            if session.finish_natural(epoch) {
                for listener in listeners.lock().unwrap().iter_mut() {
                    listener();
                }
            }
        });

        if let Err(e) = self.generator.start(&schedule, &self.config, on_ended) {
            self.session.finish_forced();
            return Err(e);
        }
        Ok(())
    }

    /// Stops playback now. A no-op when idle; when playing, the session
    /// ends immediately and the completion listeners stay silent.
    pub fn stop(&mut self) {
        if self.session.finish_forced() {
            self.generator.stop();
        }
    }
}

#[derive(Default)]
pub struct KeyerBuilder {
    config: TimingConfig,
    generator: Option<Box<dyn ToneGenerator>>,
    clock: Option<Box<dyn Clock>>,
}

impl KeyerBuilder {
    pub fn config(mut self, config: TimingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn generator(mut self, generator: Box<dyn ToneGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Keyer> {
        let generator = self.generator.ok_or(KeyerError::MissingGenerator)?;
        Ok(Keyer {
            config: self.config,
            generator,
            clock: self
                .clock
                .unwrap_or_else(|| Box::new(MonotonicClock::new())),
            session: Arc::new(SessionState::default()),
            listeners: Arc::new(Mutex::new(Vec::new())),
        })
    }
}
