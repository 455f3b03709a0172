//! DSP engine: pure Rust generative soundscape.
//!
//! Everything is rendered sample-by-sample in Rust, so the same code drives
//! WebAudio (via AudioWorklet + WASM) and offline WAV previews.

pub mod compressor;
pub mod context;
pub mod delay;
pub mod drone;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod melody;
pub mod oscillator;
pub mod panner;
pub mod ramp;
pub mod registry;
pub mod renderer;
pub mod timer;
pub mod voice;
