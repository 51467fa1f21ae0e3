#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use crate::{
    alphabet::encode,
    config::TimingConfig,
    schedule::Schedule,
    synth::OfflineRenderer,
    Waveform, SAMPLE_RATE,
};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct MorseKeyerWasm {
    config: TimingConfig,
    sample_rate: u32,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl MorseKeyerWasm {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();

        Self {
            config: TimingConfig::default(),
            sample_rate: SAMPLE_RATE,
        }
    }

    #[wasm_bindgen]
    pub fn set_wpm(&mut self, wpm: f64) -> Result<(), JsValue> {
        self.config
            .set_wpm(wpm)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn set_frequency(&mut self, frequency_hz: f32) -> Result<(), JsValue> {
        self.config
            .set_frequency_hz(frequency_hz)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn set_volume(&mut self, volume: f32) -> Result<(), JsValue> {
        self.config
            .set_amplitude(volume)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn set_waveform(&mut self, waveform: &str) -> Result<(), JsValue> {
        let waveform: Waveform = waveform
            .parse()
            .map_err(|e: crate::error::KeyerError| JsValue::from_str(&e.to_string()))?;
        self.config.set_waveform(waveform);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn get_wpm(&self) -> f64 {
        self.config.wpm()
    }

    #[wasm_bindgen]
    pub fn get_frequency(&self) -> f32 {
        self.config.frequency_hz()
    }

    #[wasm_bindgen]
    pub fn get_volume(&self) -> f32 {
        self.config.amplitude()
    }

    #[wasm_bindgen]
    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Renders the text's keying envelope to raw audio samples the host
    /// can hand to an AudioContext buffer.
    #[wasm_bindgen]
    pub fn render(&self, text: &str) -> Result<Vec<f32>, JsValue> {
        let symbols = encode(text);
        if symbols.is_empty() {
            return Err(JsValue::from_str(
                "Nothing to play: text is empty or contains no encodable characters",
            ));
        }

        let schedule = Schedule::build(&symbols, &self.config, 0.0);
        Ok(OfflineRenderer::new(self.sample_rate).render(&schedule, &self.config))
    }

    /// Seconds of audio `render` would produce for this text.
    #[wasm_bindgen]
    pub fn duration_seconds(&self, text: &str) -> f64 {
        Schedule::build(&encode(text), &self.config, 0.0).duration()
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();
}
