//! Drone layer bank: the sustained harmonic bed under the melody.
//!
//! Each layer is one voice with a freshly drawn detune and a gain LFO of
//! randomized rate. Layers never stop themselves; they are registered with
//! the engine's voice registry and reclaimed only by teardown.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::SoundscapeConfig;

use super::lfo::ModulationLink;
use super::oscillator::{Oscillator, Waveform};
use super::registry::VoiceRegistry;
use super::voice::{Voice, VoiceId};

/// What was actually instantiated for one layer this session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneLayer {
    pub voice: VoiceId,
    pub frequency: f64,
    pub waveform: Waveform,
    pub gain: f64,
    pub detune: f64,
    pub breathing_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DroneBank {
    layers: Vec<DroneLayer>,
}

impl DroneBank {
    /// Build every configured layer and register its voice.
    pub fn build<R: Rng + ?Sized>(
        config: &SoundscapeConfig,
        rng: &mut R,
        sample_rate: f64,
        registry: &mut VoiceRegistry,
    ) -> Self {
        let layers = config
            .drone_layers
            .iter()
            .map(|layer| {
                let detune = rng.gen_range(-config.detune_cents..=config.detune_cents);
                let breathing_rate = config.breathing_rate.sample(rng);

                let mut links = vec![ModulationLink::breathing(
                    breathing_rate,
                    config.breathing_depth,
                    sample_rate,
                )];
                if let Some(drift) = layer.drift {
                    links.push(ModulationLink::drift(drift.rate, drift.depth, sample_rate));
                }

                let osc = Oscillator::new(layer.waveform, layer.frequency, sample_rate)
                    .with_detune(detune);
                let voice = registry.register(Voice::drone(osc, layer.gain, links));
                debug!(
                    voice = voice.0,
                    frequency = layer.frequency,
                    detune,
                    breathing_rate,
                    "drone layer started"
                );

                DroneLayer {
                    voice,
                    frequency: layer.frequency,
                    waveform: layer.waveform,
                    gain: layer.gain,
                    detune,
                    breathing_rate,
                }
            })
            .collect();

        DroneBank { layers }
    }

    pub fn layers(&self) -> &[DroneLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DETUNE_CENTS, DRONE_CHORD};
    use crate::dsp::voice::VoiceKind;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn builds_the_configured_chord() {
        let config = SoundscapeConfig::default();
        let mut reg = VoiceRegistry::new();
        let mut rng = StdRng::seed_from_u64(1);
        let bank = DroneBank::build(&config, &mut rng, 44100.0, &mut reg);

        assert_eq!(bank.len(), DRONE_CHORD.len());
        assert_eq!(reg.count(VoiceKind::Drone), DRONE_CHORD.len());
        for (layer, &(freq, wave, gain)) in bank.layers().iter().zip(DRONE_CHORD.iter()) {
            assert_eq!(layer.frequency, freq);
            assert_eq!(layer.waveform, wave);
            assert_eq!(layer.gain, gain);
            assert!(reg.get(layer.voice).is_some(), "layer voice must be registered");
        }
    }

    #[test]
    fn randomization_stays_in_bounds() {
        let config = SoundscapeConfig::default();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let mut reg = VoiceRegistry::new();
            let bank = DroneBank::build(&config, &mut rng, 44100.0, &mut reg);
            for layer in bank.layers() {
                assert!(layer.detune.abs() <= DETUNE_CENTS);
                assert!(config.breathing_rate.contains(layer.breathing_rate));
            }
        }
    }

    #[test]
    fn detune_differs_between_sessions() {
        let config = SoundscapeConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut reg = VoiceRegistry::new();
        let first = DroneBank::build(&config, &mut rng, 44100.0, &mut reg);
        let second = DroneBank::build(&config, &mut rng, 44100.0, &mut reg);
        let d1: Vec<f64> = first.layers().iter().map(|l| l.detune).collect();
        let d2: Vec<f64> = second.layers().iter().map(|l| l.detune).collect();
        assert_ne!(d1, d2);
    }

    #[test]
    fn fundamental_carries_drift() {
        let config = SoundscapeConfig::default();
        let mut reg = VoiceRegistry::new();
        let mut rng = StdRng::seed_from_u64(3);
        let bank = DroneBank::build(&config, &mut rng, 44100.0, &mut reg);
        let root = reg.get(bank.layers()[0].voice).unwrap();
        let fifth = reg.get(bank.layers()[2].voice).unwrap();
        assert_eq!(root.links.len(), 2);
        assert_eq!(fifth.links.len(), 1);
    }
}
