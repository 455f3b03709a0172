pub mod artwork;
pub mod config;
pub mod dsp;
pub mod error;

use crate::config::SoundscapeConfig;
use crate::dsp::engine::AmbientEngine;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the salon-ambience version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed soundscape player, driven by an AudioWorklet.
///
/// The page toggles `start()` / `stop()` and reads `is_playing()` for its
/// button state; the worklet pulls audio with `render()`.
#[wasm_bindgen]
pub struct AmbientPlayer {
    engine: AmbientEngine,
}

#[wasm_bindgen]
impl AmbientPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f32) -> AmbientPlayer {
        AmbientPlayer {
            engine: AmbientEngine::new(sample_rate as f64),
        }
    }

    /// Build a player from a (partial) soundscape config object.
    pub fn with_config(sample_rate: f32, config: JsValue) -> Result<AmbientPlayer, JsValue> {
        let config: SoundscapeConfig = serde_wasm_bindgen::from_value(config)?;
        let engine = AmbientEngine::new(sample_rate as f64)
            .with_config(config)
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        Ok(AmbientPlayer { engine })
    }

    /// Start the soundscape. Returns false if audio is unavailable; the
    /// page should simply leave the toggle off.
    pub fn start(&mut self) -> bool {
        self.engine.start().is_ok()
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    /// Next `frames` frames as interleaved stereo f32.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        self.engine.render_interleaved(frames)
    }

    /// Engine snapshot as a plain JS object.
    pub fn status(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.engine.status()).map_err(|e| JsValue::from_str(&format!("{e}")))
    }
}

/// Render a seeded soundscape preview to a WAV byte array.
pub fn render_preview(seconds: f64, sample_rate: u32, seed: u64) -> Result<Vec<u8>, error::EngineError> {
    dsp::renderer::render_preview_wav(SoundscapeConfig::default(), seed, seconds, sample_rate)
}

/// WASM-exposed: render a seeded preview of the default soundscape to WAV.
#[wasm_bindgen]
pub fn render_preview_wav(seconds: f64, sample_rate: u32, seed: u32) -> Result<Vec<u8>, JsValue> {
    render_preview(seconds, sample_rate, seed as u64).map_err(|e| JsValue::from_str(&format!("{e}")))
}
