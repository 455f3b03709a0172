//! Melody scheduler: sparse plucked notes at randomized intervals.
//!
//! The scheduler is a two-state machine. While **Scheduled** exactly one
//! melody tick is pending in the engine's timer queue; firing it plays a
//! note and queues the next tick. **Stopped** is reached only through
//! [`MelodyScheduler::cancel`]. A tick whose token no longer matches the
//! pending one is stale and does nothing.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::SoundscapeConfig;

use super::engine::EngineEvent;
use super::envelope::{Envelope, PluckShape};
use super::oscillator::{Oscillator, Waveform};
use super::registry::VoiceRegistry;
use super::timer::{TimerQueue, TimerToken};
use super::voice::{Voice, VoiceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Scheduled,
    Stopped,
}

/// The randomized choices for one note, before any voice exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotePlan {
    pub waveform: Waveform,
    pub frequency: f64,
    pub pan: f64,
    /// Seconds.
    pub duration: f64,
}

impl NotePlan {
    pub fn draw<R: Rng + ?Sized>(config: &SoundscapeConfig, rng: &mut R) -> Self {
        let waveform = if rng.gen_bool(config.sine_probability) {
            Waveform::Sine
        } else {
            Waveform::Triangle
        };
        let frequency = config.melody_scale[rng.gen_range(0..config.melody_scale.len())];
        let pan = rng.gen_range(-config.pan_spread..=config.pan_spread);
        let duration = config.note_duration.sample(rng);
        NotePlan {
            waveform,
            frequency,
            pan,
            duration,
        }
    }
}

/// A note the scheduler has started. The voice stops itself at `stop_sample`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNote {
    pub voice: VoiceId,
    pub plan: NotePlan,
    pub envelope: PluckShape,
    pub start_sample: u64,
    pub stop_sample: u64,
}

/// Everything a tick needs from the engine for one firing.
pub struct TickEnv<'a, R: Rng + ?Sized> {
    pub config: &'a SoundscapeConfig,
    pub rng: &'a mut R,
    pub registry: &'a mut VoiceRegistry,
    pub timers: &'a mut TimerQueue<EngineEvent>,
    pub now: u64,
    pub sample_rate: f64,
}

#[derive(Debug)]
pub struct MelodyScheduler {
    pending: Option<TimerToken>,
    notes_started: u64,
}

impl Default for MelodyScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MelodyScheduler {
    pub fn new() -> Self {
        MelodyScheduler {
            pending: None,
            notes_started: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.pending.is_some() {
            SchedulerState::Scheduled
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn notes_started(&self) -> u64 {
        self.notes_started
    }

    /// Queue the first tick. Any tick already pending is replaced.
    pub fn launch<R: Rng + ?Sized>(&mut self, env: TickEnv<'_, R>) {
        if let Some(old) = self.pending.take() {
            env.timers.cancel(old);
        }
        let delay = env.config.first_note_delay.sample(env.rng);
        self.queue_tick(env.timers, env.now, delay, env.sample_rate);
    }

    /// Cancel the pending tick. Returns true if one was pending.
    pub fn cancel(&mut self, timers: &mut TimerQueue<EngineEvent>) -> bool {
        match self.pending.take() {
            Some(token) => {
                timers.cancel(token);
                true
            }
            None => false,
        }
    }

    /// Handle a fired melody timer. Returns the note it started, or `None`
    /// if the token was stale.
    pub fn fire<R: Rng + ?Sized>(
        &mut self,
        token: TimerToken,
        env: TickEnv<'_, R>,
    ) -> Option<ScheduledNote> {
        if self.pending != Some(token) {
            debug!("stale melody tick ignored");
            return None;
        }
        self.pending = None;

        let TickEnv {
            config,
            rng,
            registry,
            timers,
            now,
            sample_rate,
        } = env;

        let plan = NotePlan::draw(config, rng);
        let envelope = PluckShape {
            attack: config.note_attack,
            peak: config.note_peak,
            floor: config.note_floor,
            duration: plan.duration,
        };
        let lifetime = plan.duration + config.note_stop_margin;
        let stop_sample = now.saturating_add((lifetime * sample_rate).round() as u64);

        let osc = Oscillator::new(plan.waveform, plan.frequency, sample_rate);
        let voice = registry.register(Voice::note(
            osc,
            Envelope::new(envelope, sample_rate),
            plan.pan,
            stop_sample,
        ));
        self.notes_started += 1;
        debug!(
            voice = voice.0,
            frequency = plan.frequency,
            duration = plan.duration,
            pan = plan.pan,
            "melody note"
        );

        let delay = config.note_interval.sample(rng);
        self.queue_tick(timers, now, delay, sample_rate);

        Some(ScheduledNote {
            voice,
            plan,
            envelope,
            start_sample: now,
            stop_sample,
        })
    }

    fn queue_tick(
        &mut self,
        timers: &mut TimerQueue<EngineEvent>,
        now: u64,
        delay_secs: f64,
        sample_rate: f64,
    ) {
        // At least one sample ahead so a tick can never re-fire within itself.
        let due = now.saturating_add(((delay_secs * sample_rate).round() as u64).max(1));
        self.pending = Some(timers.schedule(due, EngineEvent::MelodyTick));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MELODY_SCALE, NOTE_DURATION_SECS, NOTE_INTERVAL_SECS, PAN_SPREAD};
    use rand::{rngs::StdRng, SeedableRng};

    const SR: f64 = 1000.0;

    struct Rig {
        config: SoundscapeConfig,
        rng: StdRng,
        registry: VoiceRegistry,
        timers: TimerQueue<EngineEvent>,
    }

    impl Rig {
        fn new(seed: u64) -> Self {
            Rig {
                config: SoundscapeConfig::default(),
                rng: StdRng::seed_from_u64(seed),
                registry: VoiceRegistry::new(),
                timers: TimerQueue::new(),
            }
        }

        fn env(&mut self, now: u64) -> TickEnv<'_, StdRng> {
            TickEnv {
                config: &self.config,
                rng: &mut self.rng,
                registry: &mut self.registry,
                timers: &mut self.timers,
                now,
                sample_rate: SR,
            }
        }
    }

    #[test]
    fn thousand_ticks_respect_every_bound() {
        let mut rig = Rig::new(2024);
        let mut sched = MelodyScheduler::new();
        sched.launch(rig.env(0));

        let (dmin, dmax) = NOTE_DURATION_SECS;
        let (imin, imax) = NOTE_INTERVAL_SECS;
        let mut sines = 0;

        for _ in 0..1000 {
            let (due, token) = {
                let due = rig.timers.next_due().unwrap();
                let (token, _) = rig.timers.pop_due(due).unwrap();
                (due, token)
            };
            let note = sched.fire(token, rig.env(due)).unwrap();

            let plan = note.plan;
            assert!((dmin..=dmax).contains(&plan.duration), "duration {}", plan.duration);
            assert!(MELODY_SCALE.contains(&plan.frequency));
            assert!(plan.pan.abs() <= PAN_SPREAD);
            assert!(note.stop_sample > note.start_sample);
            if plan.waveform == Waveform::Sine {
                sines += 1;
            }

            let next = rig.timers.next_due().unwrap();
            let interval = (next - due) as f64 / SR;
            assert!(
                (imin..=imax).contains(&interval),
                "inter-note delay {interval} out of range"
            );
            rig.registry.release_expired(due);
        }

        // 60 % sine bias, loose statistical bound
        assert!((500..700).contains(&sines), "sine count {sines} far from 600");
    }

    #[test]
    fn stop_margin_outlasts_duration() {
        let mut rig = Rig::new(11);
        let mut sched = MelodyScheduler::new();
        sched.launch(rig.env(0));
        let due = rig.timers.next_due().unwrap();
        let (token, _) = rig.timers.pop_due(due).unwrap();
        let note = sched.fire(token, rig.env(due)).unwrap();

        let audible = (note.plan.duration * SR).round() as u64;
        assert!(note.stop_sample >= note.start_sample + audible + 99);
    }

    #[test]
    fn deadlines_saturate_at_the_end_of_the_clock() {
        let mut rig = Rig::new(5);
        let mut sched = MelodyScheduler::new();
        let late = u64::MAX - 10;
        sched.launch(rig.env(late));
        assert_eq!(rig.timers.next_due(), Some(u64::MAX));

        let (token, _) = rig.timers.pop_due(u64::MAX).unwrap();
        let note = sched.fire(token, rig.env(late)).unwrap();
        assert_eq!(note.stop_sample, u64::MAX);
        assert_eq!(rig.timers.next_due(), Some(u64::MAX));
    }

    #[test]
    fn cancel_stops_the_chain() {
        let mut rig = Rig::new(3);
        let mut sched = MelodyScheduler::new();
        sched.launch(rig.env(0));
        assert_eq!(sched.state(), SchedulerState::Scheduled);

        assert!(sched.cancel(&mut rig.timers));
        assert_eq!(sched.state(), SchedulerState::Stopped);
        assert!(rig.timers.is_empty(), "cancel must remove the queued tick");
        assert!(!sched.cancel(&mut rig.timers));
    }

    #[test]
    fn stale_token_is_ignored() {
        let mut rig = Rig::new(4);
        let mut sched = MelodyScheduler::new();
        sched.launch(rig.env(0));
        let due = rig.timers.next_due().unwrap();
        let (token, _) = rig.timers.pop_due(due).unwrap();

        // A newer launch supersedes the popped token.
        sched.launch(rig.env(due));
        assert!(sched.fire(token, rig.env(due)).is_none());
        assert_eq!(sched.notes_started(), 0);
        assert!(rig.registry.is_empty());
    }

    #[test]
    fn first_tick_is_delayed() {
        let mut rig = Rig::new(8);
        let mut sched = MelodyScheduler::new();
        sched.launch(rig.env(500));
        let due = rig.timers.next_due().unwrap();
        let delay = (due - 500) as f64 / SR;
        assert!(rig.config.first_note_delay.contains(delay), "first delay {delay}");
        assert!(rig.registry.is_empty(), "launch alone must not start a note");
    }
}
