//! Voice, the smallest sound-producing unit: one oscillator feeding its own
//! amplifier, with optional modulation links, pluck envelope and pan.

use serde::Serialize;

use super::envelope::Envelope;
use super::lfo::{step_links, ModulationLink};
use super::oscillator::Oscillator;
use super::panner::pan_mono;

/// Registry-assigned voice identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VoiceId(pub u64);

/// Which layer created the voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceKind {
    Drone,
    Note,
}

#[derive(Debug, Clone)]
pub struct Voice {
    pub kind: VoiceKind,
    pub oscillator: Oscillator,
    /// Amplifier level [0, 1].
    pub gain: f64,
    /// Stereo position [-1, 1].
    pub pan: f64,
    pub links: Vec<ModulationLink>,
    pub envelope: Option<Envelope>,
    /// Also feed the spatial processor, not just the master bus.
    pub send_to_spatial: bool,
    /// Sample at which the voice releases itself. `None` lives until teardown.
    pub stop_sample: Option<u64>,
}

impl Voice {
    /// A sustained layer that only the lifecycle controller can stop.
    pub fn drone(oscillator: Oscillator, gain: f64, links: Vec<ModulationLink>) -> Self {
        Voice {
            kind: VoiceKind::Drone,
            oscillator,
            gain,
            pan: 0.0,
            links,
            envelope: None,
            send_to_spatial: false,
            stop_sample: None,
        }
    }

    /// A transient melody note that stops itself at `stop_sample`.
    pub fn note(oscillator: Oscillator, mut envelope: Envelope, pan: f64, stop_sample: u64) -> Self {
        envelope.trigger();
        Voice {
            kind: VoiceKind::Note,
            oscillator,
            gain: 1.0,
            pan,
            links: Vec::new(),
            envelope: Some(envelope),
            send_to_spatial: true,
            stop_sample: Some(stop_sample),
        }
    }

    /// Next stereo frame, after amplifier, modulation, envelope and pan.
    #[inline]
    pub fn next_frame(&mut self) -> (f64, f64) {
        let m = step_links(&mut self.links);
        let osc = self.oscillator.next_sample_offset(m.frequency_offset);
        let env = match self.envelope.as_mut() {
            Some(e) => e.next_sample(),
            None => 1.0,
        };
        pan_mono(osc * self.gain * m.gain_scale * env, self.pan)
    }

    /// Has the voice's own scheduled lifetime elapsed at `now`?
    pub fn is_expired(&self, now: u64) -> bool {
        self.stop_sample.is_some_and(|stop| now >= stop)
    }
}
