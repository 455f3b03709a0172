//! The shared signal-processing context: sample clock plus run state.
//!
//! One context exists per session. The lifecycle controller creates it
//! lazily through a [`ContextFactory`] and afterwards only suspends and
//! resumes it.

use serde::Serialize;
use tracing::info;

use crate::error::EngineError;

/// Sample rates the default factory accepts (WebAudio's supported range).
pub const MIN_SAMPLE_RATE: f64 = 3_000.0;
pub const MAX_SAMPLE_RATE: f64 = 768_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    Running,
    Suspended,
}

#[derive(Debug)]
pub struct AudioContext {
    id: u64,
    sample_rate: f64,
    current_sample: u64,
    state: ContextState,
}

impl AudioContext {
    pub fn new(id: u64, sample_rate: f64) -> Self {
        AudioContext {
            id,
            sample_rate,
            current_sample: 0,
            state: ContextState::Running,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ContextState::Running
    }

    /// Clock position in samples.
    pub fn current_sample(&self) -> u64 {
        self.current_sample
    }

    pub fn current_time(&self) -> f64 {
        self.current_sample as f64 / self.sample_rate
    }

    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate).round() as u64
    }

    /// Advance the clock; a suspended context does not move.
    pub fn advance(&mut self, samples: u64) {
        if self.is_running() {
            self.current_sample = self.current_sample.saturating_add(samples);
        }
    }

    pub fn suspend(&mut self) {
        self.state = ContextState::Suspended;
    }

    pub fn resume(&mut self) {
        self.state = ContextState::Running;
    }
}

/// Creates audio contexts. Construction may fail in environments without
/// audio support, and the engine treats that as recoverable.
pub trait ContextFactory {
    fn create(&mut self, sample_rate: f64) -> Result<AudioContext, EngineError>;
}

/// Default factory for pull-based hosts (AudioWorklet, offline render).
#[derive(Debug, Default)]
pub struct OfflineContextFactory {
    created: u64,
}

impl OfflineContextFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> u64 {
        self.created
    }
}

impl ContextFactory for OfflineContextFactory {
    fn create(&mut self, sample_rate: f64) -> Result<AudioContext, EngineError> {
        if !sample_rate.is_finite() || !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(EngineError::ContextUnavailable { sample_rate });
        }
        self.created += 1;
        info!(id = self.created, sample_rate, "audio context created");
        Ok(AudioContext::new(self.created, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspended_clock_does_not_advance() {
        let mut ctx = AudioContext::new(1, 1000.0);
        ctx.advance(10);
        ctx.suspend();
        ctx.advance(500);
        assert_eq!(ctx.current_sample(), 10);
        ctx.resume();
        ctx.advance(5);
        assert_eq!(ctx.current_sample(), 15);
        assert!((ctx.current_time() - 0.015).abs() < 1e-12);
    }

    #[test]
    fn factory_rejects_unsupported_rates() {
        let mut f = OfflineContextFactory::new();
        assert!(matches!(
            f.create(0.0),
            Err(EngineError::ContextUnavailable { .. })
        ));
        assert!(f.create(f64::NAN).is_err());
        assert!(f.create(1_000_000.0).is_err());
        assert_eq!(f.created(), 0);
    }

    #[test]
    fn factory_assigns_fresh_ids() {
        let mut f = OfflineContextFactory::new();
        let a = f.create(44100.0).unwrap();
        let b = f.create(48000.0).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(f.created(), 2);
    }

    #[test]
    fn seconds_convert_to_samples() {
        let ctx = AudioContext::new(1, 44100.0);
        assert_eq!(ctx.seconds_to_samples(2.0), 88200);
        assert_eq!(ctx.seconds_to_samples(-1.0), 0);
    }
}
