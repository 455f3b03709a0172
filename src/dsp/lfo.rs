//! Low-frequency modulation: slow sine LFOs wired to a voice's pitch or level.

use std::f64::consts::PI;

/// Which parameter of the owning voice a modulation link drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationTarget {
    /// Adds `depth` Hz of drift/vibrato to the oscillator frequency.
    Frequency,
    /// Scales the voice gain by `1 + depth * lfo` ("breathing").
    Gain,
}

/// A sub-audio sine oscillator.
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Rate in Hz (typically well under 1 Hz here).
    pub rate: f64,
    /// Peak deviation, in the target's units.
    pub depth: f64,
    phase: f64,
    sample_rate: f64,
}

impl Lfo {
    pub fn new(rate: f64, depth: f64, sample_rate: f64) -> Self {
        Lfo {
            rate,
            depth,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Next modulation value in `[-depth, depth]`.
    #[inline]
    pub fn next_value(&mut self) -> f64 {
        let value = (2.0 * PI * self.phase).sin() * self.depth;
        self.phase += self.rate / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }
}

/// A directed modulation relation from an LFO to one parameter of the voice
/// that owns the link. The voice owns its links, so the source is always
/// torn down together with its target.
#[derive(Debug, Clone)]
pub struct ModulationLink {
    pub source: Lfo,
    pub target: ModulationTarget,
}

impl ModulationLink {
    pub fn breathing(rate: f64, depth: f64, sample_rate: f64) -> Self {
        ModulationLink {
            source: Lfo::new(rate, depth, sample_rate),
            target: ModulationTarget::Gain,
        }
    }

    pub fn drift(rate: f64, depth_hz: f64, sample_rate: f64) -> Self {
        ModulationLink {
            source: Lfo::new(rate, depth_hz, sample_rate),
            target: ModulationTarget::Frequency,
        }
    }
}

/// Accumulated per-sample modulation for a single voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulation {
    pub frequency_offset: f64,
    pub gain_scale: f64,
}

impl Default for Modulation {
    fn default() -> Self {
        Modulation {
            frequency_offset: 0.0,
            gain_scale: 1.0,
        }
    }
}

/// Advance every link one sample and combine their outputs.
pub fn step_links(links: &mut [ModulationLink]) -> Modulation {
    let mut m = Modulation::default();
    for link in links.iter_mut() {
        let v = link.source.next_value();
        match link.target {
            ModulationTarget::Frequency => m.frequency_offset += v,
            ModulationTarget::Gain => m.gain_scale *= 1.0 + v,
        }
    }
    m
}
