//! Soundscape configuration.
//!
//! Every randomization boundary the engine draws from is a named field here,
//! defaulting to the named constants below. Hosts may override any subset
//! from JSON; missing fields keep their defaults.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dsp::compressor::LimiterSettings;
use crate::dsp::delay::{SpatialState, MAX_FEEDBACK};
use crate::dsp::oscillator::Waveform;
use crate::error::EngineError;

// ── Drone bed ───────────────────────────────────────────────

/// A1 fundamental, octave, fifth, seventh and ninth: (Hz, waveform, gain).
pub const DRONE_CHORD: [(f64, Waveform, f64); 5] = [
    (55.00, Waveform::Sine, 0.12),
    (110.00, Waveform::Sine, 0.08),
    (164.81, Waveform::Triangle, 0.05),
    (196.00, Waveform::Sine, 0.035),
    (246.94, Waveform::Sine, 0.025),
];
pub const MIN_DRONE_LAYERS: usize = 2;
pub const MAX_DRONE_LAYERS: usize = 5;
/// Per-layer detune is drawn from ±this many cents on every start.
pub const DETUNE_CENTS: f64 = 3.0;
pub const BREATHING_RATE_HZ: (f64, f64) = (0.03, 0.15);
pub const BREATHING_DEPTH: f64 = 0.35;
/// Slow pitch drift on the fundamental: (rate Hz, depth Hz).
pub const FUNDAMENTAL_DRIFT: (f64, f64) = (0.04, 0.3);

// ── Melody ──────────────────────────────────────────────────

/// A dorian, A4 to A5.
pub const MELODY_SCALE: [f64; 8] = [
    440.00, 493.88, 523.25, 587.33, 659.25, 739.99, 783.99, 880.00,
];
/// Probability a note uses a sine rather than a triangle.
pub const SINE_PROBABILITY: f64 = 0.6;
/// Notes are panned uniformly within ±this.
pub const PAN_SPREAD: f64 = 0.7;
pub const NOTE_DURATION_SECS: (f64, f64) = (2.0, 5.0);
pub const NOTE_INTERVAL_SECS: (f64, f64) = (2.0, 7.0);
pub const NOTE_ATTACK_SECS: f64 = 0.04;
pub const NOTE_PEAK: f64 = 0.08;
pub const NOTE_FLOOR: f64 = 0.0001;
/// Extra lifetime past the note duration so the decay tail completes.
pub const NOTE_STOP_MARGIN_SECS: f64 = 0.1;

// ── Room and master ─────────────────────────────────────────

pub const SPATIAL_DELAY_SECS: f64 = 0.45;
pub const SPATIAL_FEEDBACK: f64 = 0.4;
pub const SPATIAL_DAMPING_HZ: f64 = 2200.0;
pub const SPATIAL_WET: f64 = 0.35;
pub const MASTER_GAIN: f64 = 0.5;
pub const FADE_IN_SECS: f64 = 3.0;

// ── Validation limits ───────────────────────────────────────

/// One octave either way.
pub const MAX_DETUNE_CENTS: f64 = 1200.0;
/// Upper bound for every duration, delay and margin, in seconds.
pub const MAX_TIME_SECS: f64 = 60.0;
/// LFOs stay sub-audio.
pub const MAX_MODULATION_RATE_HZ: f64 = 20.0;
pub const MAX_SPATIAL_DELAY_SECS: f64 = 5.0;

/// Inclusive range of seconds or Hz to draw from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    pub const fn new((min, max): (f64, f64)) -> Self {
        Span { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min..=self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn check(&self, name: &str, limit: f64) -> Result<(), EngineError> {
        let ordered = self.min >= 0.0 && self.min <= self.max && self.max <= limit;
        if !ordered {
            return Err(EngineError::InvalidConfig(format!(
                "{name} must be an ordered range within [0, {limit}] (got {}..{})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    pub rate: f64,
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneLayerConfig {
    pub frequency: f64,
    pub waveform: Waveform,
    pub gain: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift: Option<DriftConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpatialConfig {
    pub delay_time: f64,
    pub feedback: f64,
    pub damping_cutoff: f64,
    pub wet: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        SpatialConfig {
            delay_time: SPATIAL_DELAY_SECS,
            feedback: SPATIAL_FEEDBACK,
            damping_cutoff: SPATIAL_DAMPING_HZ,
            wet: SPATIAL_WET,
        }
    }
}

impl From<SpatialConfig> for SpatialState {
    fn from(c: SpatialConfig) -> Self {
        SpatialState {
            delay_time: c.delay_time,
            feedback: c.feedback,
            damping_cutoff: c.damping_cutoff,
            wet: c.wet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub threshold: f64,
    pub ratio: f64,
    pub knee: f64,
    pub attack: f64,
    pub release: f64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        let d = LimiterSettings::default();
        LimiterConfig {
            threshold: d.threshold,
            ratio: d.ratio,
            knee: d.knee,
            attack: d.attack,
            release: d.release,
        }
    }
}

impl From<LimiterConfig> for LimiterSettings {
    fn from(c: LimiterConfig) -> Self {
        LimiterSettings {
            threshold: c.threshold,
            ratio: c.ratio,
            knee: c.knee,
            attack: c.attack,
            release: c.release,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoundscapeConfig {
    pub drone_layers: Vec<DroneLayerConfig>,
    pub detune_cents: f64,
    pub breathing_rate: Span,
    pub breathing_depth: f64,

    pub melody_scale: Vec<f64>,
    pub sine_probability: f64,
    pub pan_spread: f64,
    pub note_duration: Span,
    pub note_interval: Span,
    /// Delay before the first note after a start.
    pub first_note_delay: Span,
    pub note_attack: f64,
    pub note_peak: f64,
    pub note_floor: f64,
    pub note_stop_margin: f64,

    pub spatial: SpatialConfig,
    pub master_gain: f64,
    pub fade_in_seconds: f64,
    pub limiter: LimiterConfig,
}

impl Default for SoundscapeConfig {
    fn default() -> Self {
        let drone_layers = DRONE_CHORD
            .iter()
            .enumerate()
            .map(|(i, &(frequency, waveform, gain))| DroneLayerConfig {
                frequency,
                waveform,
                gain,
                drift: (i == 0).then_some(DriftConfig {
                    rate: FUNDAMENTAL_DRIFT.0,
                    depth: FUNDAMENTAL_DRIFT.1,
                }),
            })
            .collect();

        SoundscapeConfig {
            drone_layers,
            detune_cents: DETUNE_CENTS,
            breathing_rate: Span::new(BREATHING_RATE_HZ),
            breathing_depth: BREATHING_DEPTH,
            melody_scale: MELODY_SCALE.to_vec(),
            sine_probability: SINE_PROBABILITY,
            pan_spread: PAN_SPREAD,
            note_duration: Span::new(NOTE_DURATION_SECS),
            note_interval: Span::new(NOTE_INTERVAL_SECS),
            first_note_delay: Span::new(NOTE_INTERVAL_SECS),
            note_attack: NOTE_ATTACK_SECS,
            note_peak: NOTE_PEAK,
            note_floor: NOTE_FLOOR,
            note_stop_margin: NOTE_STOP_MARGIN_SECS,
            spatial: SpatialConfig::default(),
            master_gain: MASTER_GAIN,
            fade_in_seconds: FADE_IN_SECS,
            limiter: LimiterConfig::default(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig(msg.into())
}

impl SoundscapeConfig {
    /// Parse a (possibly partial) JSON override and validate the result.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: SoundscapeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject any value the engine could not render. NaN fails every check.
    pub fn validate(&self) -> Result<(), EngineError> {
        let n = self.drone_layers.len();
        if !(MIN_DRONE_LAYERS..=MAX_DRONE_LAYERS).contains(&n) {
            return Err(invalid(format!(
                "drone bank needs {MIN_DRONE_LAYERS}-{MAX_DRONE_LAYERS} layers, got {n}"
            )));
        }
        for layer in &self.drone_layers {
            positive("drone frequency", layer.frequency)?;
            within("drone gain", layer.gain, 0.0, 1.0)?;
            if let Some(drift) = layer.drift {
                within("drift rate", drift.rate, 0.0, MAX_MODULATION_RATE_HZ)?;
                within("drift depth", drift.depth, 0.0, layer.frequency)?;
            }
        }
        if !(0.0..1.0).contains(&self.breathing_depth) {
            return Err(invalid("breathing depth must be in [0, 1)"));
        }
        within("detune range", self.detune_cents, 0.0, MAX_DETUNE_CENTS)?;
        self.breathing_rate.check("breathing rate", MAX_MODULATION_RATE_HZ)?;

        if self.melody_scale.is_empty() {
            return Err(invalid("melody scale is empty"));
        }
        for &f in &self.melody_scale {
            positive("melody frequency", f)?;
        }
        within("sine probability", self.sine_probability, 0.0, 1.0)?;
        within("pan spread", self.pan_spread, 0.0, 1.0)?;
        self.note_duration.check("note duration", MAX_TIME_SECS)?;
        self.note_interval.check("note interval", MAX_TIME_SECS)?;
        self.first_note_delay.check("first note delay", MAX_TIME_SECS)?;
        within("note attack", self.note_attack, 0.0, MAX_TIME_SECS)?;
        within("note stop margin", self.note_stop_margin, 0.0, MAX_TIME_SECS)?;
        if !(self.note_floor > 0.0 && self.note_peak > self.note_floor && self.note_peak <= 1.0) {
            return Err(invalid("note envelope needs 0 < floor < peak <= 1"));
        }

        let s = &self.spatial;
        if !(0.0..1.0).contains(&s.feedback) || s.feedback > MAX_FEEDBACK {
            return Err(invalid(format!(
                "spatial feedback {} must be in [0, {MAX_FEEDBACK}]",
                s.feedback
            )));
        }
        within("spatial delay", s.delay_time, f64::MIN_POSITIVE, MAX_SPATIAL_DELAY_SECS)?;
        positive("spatial damping cutoff", s.damping_cutoff)?;
        within("spatial wet level", s.wet, 0.0, 1.0)?;

        within("master gain", self.master_gain, 0.0, 1.0)?;
        within("fade-in", self.fade_in_seconds, 0.0, MAX_TIME_SECS)?;

        let l = &self.limiter;
        let finite = [l.threshold, l.ratio, l.knee, l.attack, l.release];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(invalid("limiter settings must be finite"));
        }
        Ok(())
    }
}

/// `value` must lie in `[lo, hi]`. NaN never does.
fn within(name: &str, value: f64, lo: f64, hi: f64) -> Result<(), EngineError> {
    if (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{name} {value} must be in [{lo}, {hi}]")))
    }
}

fn positive(name: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} {value} must be finite and > 0")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn defaults_are_valid() {
        let c = SoundscapeConfig::default();
        c.validate().unwrap();
        assert_eq!(c.drone_layers.len(), 5);
        assert!(c.drone_layers[0].drift.is_some());
        assert!(c.drone_layers[1..].iter().all(|l| l.drift.is_none()));
        assert!(c.spatial.feedback < 1.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = SoundscapeConfig::from_json(r#"{ "masterGain": 0.3, "spatial": { "wet": 0.1 } }"#)
            .unwrap();
        assert_eq!(c.master_gain, 0.3);
        assert_eq!(c.spatial.wet, 0.1);
        assert_eq!(c.spatial.feedback, SPATIAL_FEEDBACK);
        assert_eq!(c.melody_scale, MELODY_SCALE.to_vec());
    }

    #[test]
    fn runaway_feedback_rejected() {
        let err = SoundscapeConfig::from_json(r#"{ "spatial": { "feedback": 1.0 } }"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)), "got {err}");
    }

    #[test]
    fn layer_count_bounds() {
        let mut c = SoundscapeConfig::default();
        c.drone_layers.truncate(1);
        assert!(c.validate().is_err());

        let mut c = SoundscapeConfig::default();
        let extra = c.drone_layers[0].clone();
        c.drone_layers.push(extra);
        assert!(c.validate().is_err());
    }

    #[test]
    fn inverted_span_rejected() {
        let mut c = SoundscapeConfig::default();
        c.note_duration = Span { min: 5.0, max: 2.0 };
        assert!(c.validate().is_err());
    }

    #[test]
    fn oversized_values_rejected() {
        for json in [
            r#"{ "detuneCents": 1e308 }"#,
            r#"{ "noteInterval": { "min": 1e300, "max": 1e300 } }"#,
            r#"{ "noteDuration": { "min": 2.0, "max": 61.0 } }"#,
            r#"{ "firstNoteDelay": { "min": 0.0, "max": 1e20 } }"#,
            r#"{ "noteStopMargin": 1e300 }"#,
            r#"{ "spatial": { "delayTime": 3600.0 } }"#,
        ] {
            let err = SoundscapeConfig::from_json(json).unwrap_err();
            assert!(matches!(err, EngineError::InvalidConfig(_)), "{json} gave {err}");
        }
    }

    #[test]
    fn nan_fields_rejected() {
        let fields: [fn(&mut SoundscapeConfig); 6] = [
            |c| c.detune_cents = f64::NAN,
            |c| c.note_attack = f64::NAN,
            |c| c.note_floor = f64::NAN,
            |c| c.note_stop_margin = f64::NAN,
            |c| c.breathing_rate.max = f64::NAN,
            |c| c.limiter.release = f64::NAN,
        ];
        for (i, poison) in fields.iter().enumerate() {
            let mut c = SoundscapeConfig::default();
            poison(&mut c);
            assert!(c.validate().is_err(), "NaN field #{i} slipped through");
        }
    }

    #[test]
    fn values_at_the_limits_accepted() {
        let mut c = SoundscapeConfig::default();
        c.detune_cents = MAX_DETUNE_CENTS;
        c.note_duration = Span::new((MAX_TIME_SECS, MAX_TIME_SECS));
        c.note_interval = Span::new((MAX_TIME_SECS, MAX_TIME_SECS));
        c.note_stop_margin = MAX_TIME_SECS;
        c.spatial.delay_time = MAX_SPATIAL_DELAY_SECS;
        c.validate().unwrap();
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = SoundscapeConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn waveform_names_are_lowercase() {
        let json = r#"{ "droneLayers": [
            { "frequency": 65.41, "waveform": "sine", "gain": 0.1 },
            { "frequency": 98.0, "waveform": "triangle", "gain": 0.05 }
        ] }"#;
        let c = SoundscapeConfig::from_json(json).unwrap();
        assert_eq!(c.drone_layers[1].waveform, Waveform::Triangle);
    }

    #[test]
    fn span_samples_inside_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let span = Span::new(NOTE_INTERVAL_SECS);
        for _ in 0..1000 {
            assert!(span.contains(span.sample(&mut rng)));
        }
    }
}
