//! Tone generators for drone layers, melody notes and LFOs.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Waveform shapes used by the soundscape. Both are smooth enough that no
/// band-limiting correction is needed at ambient pitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
}

/// A phase-accumulating oscillator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: f64,
    pub detune: f64, // in cents
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            frequency,
            detune: 0.0,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn with_detune(mut self, cents: f64) -> Self {
        self.detune = cents;
        self
    }

    /// Effective frequency accounting for detune (in cents).
    pub fn effective_freq(&self) -> f64 {
        self.frequency * (2.0_f64).powf(self.detune / 1200.0)
    }

    /// Generate the next sample at the oscillator's own frequency.
    pub fn next_sample(&mut self) -> f64 {
        self.next_sample_offset(0.0)
    }

    /// Generate the next sample with `offset_hz` added to the base frequency
    /// before detune is applied. This is where frequency modulation lands.
    pub fn next_sample_offset(&mut self, offset_hz: f64) -> f64 {
        let freq = (self.frequency + offset_hz).max(0.0) * (2.0_f64).powf(self.detune / 1200.0);
        let inc = freq / self.sample_rate;

        let sample = match self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Triangle => self.triangle(),
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }

    /// Piecewise linear, starting at zero and rising like the sine:
    /// 0 → +1 → -1 → 0 over one period.
    fn triangle(&self) -> f64 {
        let p = self.phase;
        if p < 0.25 {
            4.0 * p
        } else if p < 0.75 {
            2.0 - 4.0 * p
        } else {
            4.0 * p - 4.0
        }
    }
}
