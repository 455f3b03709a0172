//! Spatial processor: a damped stereo feedback delay simulating room echoes.
//!
//! Signal flow per channel:
//!
//! ```text
//! input ──► (+) ──► delay line ──► low-pass ──┬──► × wet ──► master bus
//!            ▲                                │
//!            └────────── × feedback ◄─────────┘
//! ```
//!
//! The feedback gain is always kept strictly below 1 so repeats decay.

use super::filter::LowpassFilter;

/// Highest feedback gain the processor will accept.
pub const MAX_FEEDBACK: f64 = 0.95;

/// Fixed per-session room settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialState {
    /// Delay time in seconds.
    pub delay_time: f64,
    /// Gain of the damped signal fed back into the delay input.
    pub feedback: f64,
    /// Low-pass cutoff in the feedback path, in Hz.
    pub damping_cutoff: f64,
    /// Level of the delayed signal sent to the master bus.
    pub wet: f64,
}

#[derive(Debug, Clone)]
pub struct SpatialProcessor {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
    damping_l: LowpassFilter,
    damping_r: LowpassFilter,
    state: SpatialState,
}

impl SpatialProcessor {
    pub fn new(state: SpatialState, sample_rate: f64) -> Self {
        let delay_samples = ((state.delay_time.max(0.0) * sample_rate) as usize).max(1);
        let state = SpatialState {
            feedback: state.feedback.clamp(0.0, MAX_FEEDBACK),
            ..state
        };
        SpatialProcessor {
            buffer_l: vec![0.0; delay_samples],
            buffer_r: vec![0.0; delay_samples],
            write_pos: 0,
            delay_samples,
            damping_l: LowpassFilter::new(state.damping_cutoff, sample_rate),
            damping_r: LowpassFilter::new(state.damping_cutoff, sample_rate),
            state,
        }
    }

    pub fn state(&self) -> SpatialState {
        self.state
    }

    pub fn feedback(&self) -> f64 {
        self.state.feedback
    }

    /// Push one stereo frame into the network and return its wet output.
    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        // Buffer length equals the delay, so the slot we're about to
        // overwrite holds the sample written `delay_samples` ago.
        let delayed_l = self.buffer_l[self.write_pos] as f64;
        let delayed_r = self.buffer_r[self.write_pos] as f64;

        let damped_l = self.damping_l.process(delayed_l);
        let damped_r = self.damping_r.process(delayed_r);

        let fb = self.state.feedback;
        self.buffer_l[self.write_pos] = (left + damped_l * fb) as f32;
        self.buffer_r[self.write_pos] = (right + damped_r * fb) as f32;

        self.write_pos = (self.write_pos + 1) % self.delay_samples;

        (damped_l * self.state.wet, damped_r * self.state.wet)
    }
}
