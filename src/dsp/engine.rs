//! Ambient engine: lifecycle controller for the gallery soundscape.
//!
//! The engine owns the audio context, the master chain (fade-in gain,
//! spatial processor, limiter), the voice registry and the timer queue.
//! Hosts pull audio with [`AmbientEngine::render`]; melody ticks fire from
//! inside that call at their exact sample, so there is only ever one
//! logical actor and no locking.
//!
//! ```text
//! drones ─────────────────────────────┐
//! notes ──┬───────────────────────────┼──► master gain ──► limiter ──► tanh ──► out
//!         └──► spatial processor ─────┘
//! ```

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SoundscapeConfig;
use crate::error::EngineError;

use super::compressor::Limiter;
use super::context::{AudioContext, ContextFactory, ContextState, OfflineContextFactory};
use super::delay::SpatialProcessor;
use super::drone::DroneBank;
use super::melody::{MelodyScheduler, ScheduledNote, TickEnv};
use super::ramp::LinearRamp;
use super::registry::{BusFrame, ReclaimedVoice, VoiceRegistry};
use super::timer::TimerQueue;
use super::voice::VoiceKind;

/// Frames rendered between timer and lifetime checks.
const BLOCK_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Active,
}

/// Payloads carried by the engine's timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    MelodyTick,
}

/// What a `stop()` reclaimed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownReport {
    pub stopped_at: u64,
    pub cancelled_tick: bool,
    pub reclaimed: Vec<ReclaimedVoice>,
}

impl TeardownReport {
    pub fn count(&self, kind: VoiceKind) -> usize {
        self.reclaimed.iter().filter(|v| v.kind == kind).count()
    }
}

/// Snapshot for host UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub state: EngineState,
    pub is_playing: bool,
    pub context_id: Option<u64>,
    pub context_state: Option<ContextState>,
    pub current_time: f64,
    pub active_voices: usize,
    pub drone_layers: usize,
    pub notes_started: u64,
}

/// Output stage rebuilt on every Idle → Active start.
struct MasterChain {
    gain: LinearRamp,
    spatial: SpatialProcessor,
    limiter: Limiter,
}

impl MasterChain {
    fn new(config: &SoundscapeConfig, sample_rate: f64) -> Self {
        let mut gain = LinearRamp::new(0.0);
        gain.start(0.0, config.master_gain, config.fade_in_seconds, sample_rate);
        MasterChain {
            gain,
            spatial: SpatialProcessor::new(config.spatial.into(), sample_rate),
            limiter: Limiter::new(config.limiter.into(), sample_rate),
        }
    }

    #[inline]
    fn process(&mut self, bus: BusFrame) -> (f32, f32) {
        let (wet_l, wet_r) = self.spatial.process(bus.spatial_send.0, bus.spatial_send.1);
        let g = self.gain.next_value();
        let (l, r) = self
            .limiter
            .process((bus.master.0 + wet_l) * g, (bus.master.1 + wet_r) * g);
        (l.tanh() as f32, r.tanh() as f32)
    }
}

pub struct AmbientEngine {
    sample_rate: f64,
    config: SoundscapeConfig,
    factory: Box<dyn ContextFactory>,
    context: Option<AudioContext>,
    state: EngineState,
    master: Option<MasterChain>,
    drones: DroneBank,
    melody: MelodyScheduler,
    registry: VoiceRegistry,
    timers: TimerQueue<EngineEvent>,
    rng: StdRng,
    last_note: Option<ScheduledNote>,
}

impl AmbientEngine {
    /// Engine with the default soundscape, seeded from entropy.
    pub fn new(sample_rate: f64) -> Self {
        Self::from_parts(sample_rate, StdRng::from_entropy())
    }

    /// Engine with a deterministic random sequence.
    pub fn with_seed(sample_rate: f64, seed: u64) -> Self {
        Self::from_parts(sample_rate, StdRng::seed_from_u64(seed))
    }

    fn from_parts(sample_rate: f64, rng: StdRng) -> Self {
        AmbientEngine {
            sample_rate,
            config: SoundscapeConfig::default(),
            factory: Box::new(OfflineContextFactory::new()),
            context: None,
            state: EngineState::Idle,
            master: None,
            drones: DroneBank::default(),
            melody: MelodyScheduler::new(),
            registry: VoiceRegistry::new(),
            timers: TimerQueue::new(),
            rng,
            last_note: None,
        }
    }

    /// Replace the soundscape. Takes effect on the next Idle → Active start.
    pub fn with_config(mut self, config: SoundscapeConfig) -> Result<Self, EngineError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_factory(mut self, factory: Box<dyn ContextFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Begin playback.
    ///
    /// Creates the audio context on first use and resumes it afterwards.
    /// Starting while already active only resumes a suspended context. If
    /// the context cannot be created the engine stays Idle and the error is
    /// returned for the host to report.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.state == EngineState::Active {
            if let Some(ctx) = self.context.as_mut() {
                ctx.resume();
            }
            return Ok(());
        }

        match self.context.as_mut() {
            Some(ctx) => ctx.resume(),
            None => {
                let ctx = self
                    .factory
                    .create(self.sample_rate)
                    .inspect_err(|e| warn!("audio unavailable, soundscape disabled: {e}"))?;
                self.context = Some(ctx);
            }
        }
        let (sample_rate, now) = match self.context.as_ref() {
            Some(ctx) => (ctx.sample_rate(), ctx.current_sample()),
            None => return Err(EngineError::ContextUnavailable {
                sample_rate: self.sample_rate,
            }),
        };

        self.master = Some(MasterChain::new(&self.config, sample_rate));
        self.drones = DroneBank::build(&self.config, &mut self.rng, sample_rate, &mut self.registry);
        self.melody.launch(TickEnv {
            config: &self.config,
            rng: &mut self.rng,
            registry: &mut self.registry,
            timers: &mut self.timers,
            now,
            sample_rate,
        });
        self.state = EngineState::Active;

        info!(
            context = self.context_id(),
            layers = self.drones.len(),
            "soundscape started"
        );
        Ok(())
    }

    /// Stop playback: cancel the pending melody tick, force-stop every
    /// voice and suspend the context. Returns `None` if already Idle.
    pub fn stop(&mut self) -> Option<TeardownReport> {
        if self.state == EngineState::Idle {
            return None;
        }

        let cancelled_tick = self.melody.cancel(&mut self.timers);
        // Only melody ticks live in the queue; drop any straggler too.
        self.timers.clear();

        let stopped_at = self.now();
        let reclaimed = self.registry.stop_all(stopped_at);
        self.master = None;
        self.drones = DroneBank::default();
        if let Some(ctx) = self.context.as_mut() {
            ctx.suspend();
        }
        self.state = EngineState::Idle;

        info!(
            voices = reclaimed.len(),
            cancelled_tick, "soundscape stopped"
        );
        Some(TeardownReport {
            stopped_at,
            cancelled_tick,
            reclaimed,
        })
    }

    /// Fill `left`/`right` with the next frames. Silent unless Active.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        left.fill(0.0);
        right.fill(0.0);

        let running = self.context.as_ref().is_some_and(AudioContext::is_running);
        if self.state != EngineState::Active || !running {
            return;
        }

        let mut pos = 0;
        while pos < frames {
            let now = self.now();
            self.fire_due_timers(now);
            self.registry.release_expired(now);

            let mut block = BLOCK_SIZE.min(frames - pos);
            if let Some(due) = self.timers.next_due() {
                if due > now {
                    block = block.min((due - now) as usize);
                }
            }

            if let Some(master) = self.master.as_mut() {
                for i in pos..pos + block {
                    let (l, r) = master.process(self.registry.next_frame());
                    left[i] = l;
                    right[i] = r;
                }
            }
            if let Some(ctx) = self.context.as_mut() {
                ctx.advance(block as u64);
            }
            pos += block;
        }
    }

    /// Render `frames` frames as interleaved stereo.
    pub fn render_interleaved(&mut self, frames: usize) -> Vec<f32> {
        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        self.render(&mut left, &mut right);
        left.iter()
            .zip(right.iter())
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }

    fn fire_due_timers(&mut self, now: u64) {
        let sample_rate = self.sample_rate();
        while let Some((token, event)) = self.timers.pop_due(now) {
            // Liveness is checked at fire time, not only at schedule time.
            if self.state != EngineState::Active {
                debug!("timer fired after stop, ignored");
                continue;
            }
            match event {
                EngineEvent::MelodyTick => {
                    let note = self.melody.fire(
                        token,
                        TickEnv {
                            config: &self.config,
                            rng: &mut self.rng,
                            registry: &mut self.registry,
                            timers: &mut self.timers,
                            now,
                            sample_rate,
                        },
                    );
                    if note.is_some() {
                        self.last_note = note;
                    }
                }
            }
        }
    }

    fn now(&self) -> u64 {
        self.context.as_ref().map_or(0, AudioContext::current_sample)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == EngineState::Active
    }

    /// The live context's rate, which may differ from the one requested.
    pub fn sample_rate(&self) -> f64 {
        self.context
            .as_ref()
            .map_or(self.sample_rate, AudioContext::sample_rate)
    }

    pub fn config(&self) -> &SoundscapeConfig {
        &self.config
    }

    pub fn context_id(&self) -> Option<u64> {
        self.context.as_ref().map(AudioContext::id)
    }

    pub fn drones(&self) -> &DroneBank {
        &self.drones
    }

    pub fn active_voice_count(&self) -> usize {
        self.registry.len()
    }

    pub fn notes_started(&self) -> u64 {
        self.melody.notes_started()
    }

    /// Most recent melody note, if any has played.
    pub fn last_note(&self) -> Option<&ScheduledNote> {
        self.last_note.as_ref()
    }

    /// Feedback gain of the live spatial processor.
    pub fn spatial_feedback(&self) -> Option<f64> {
        self.master.as_ref().map(|m| m.spatial.feedback())
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            is_playing: self.is_playing(),
            context_id: self.context_id(),
            context_state: self.context.as_ref().map(AudioContext::state),
            current_time: self.context.as_ref().map_or(0.0, AudioContext::current_time),
            active_voices: self.registry.len(),
            drone_layers: self.drones.len(),
            notes_started: self.notes_started(),
        }
    }
}

impl Drop for AmbientEngine {
    fn drop(&mut self) {
        // Unmount path: safe whether or not the engine ever started.
        self.stop();
    }
}
