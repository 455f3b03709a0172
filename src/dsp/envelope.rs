//! Pluck envelope for transient melody notes.
//!
//! Shape: starts at `floor`, rises linearly to `peak` over `attack` seconds,
//! then decays exponentially back to `floor` by the end of the note. An
//! exponential curve can never reach zero, so `floor` must be positive.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Tail,
}

/// Parameters of a single pluck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PluckShape {
    /// Attack time in seconds.
    pub attack: f64,
    /// Peak level reached at the end of the attack.
    pub peak: f64,
    /// Level at note start and end of decay. Must be > 0.
    pub floor: f64,
    /// Total note duration in seconds, attack included.
    pub duration: f64,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub shape: PluckShape,

    stage: Stage,
    level: f64,
    sample_rate: f64,
    stage_samples: usize,
    stage_counter: usize,
    /// Per-sample multiplier during the decay stage.
    decay_ratio: f64,
}

impl Envelope {
    pub fn new(shape: PluckShape, sample_rate: f64) -> Self {
        let floor = shape.floor.max(f64::MIN_POSITIVE);
        Envelope {
            shape: PluckShape { floor, ..shape },
            stage: Stage::Idle,
            level: floor,
            sample_rate,
            stage_samples: 0,
            stage_counter: 0,
            decay_ratio: 1.0,
        }
    }

    /// Start the pluck from the floor level.
    pub fn trigger(&mut self) {
        self.level = self.shape.floor;
        self.stage = Stage::Attack;
        self.stage_samples = (self.shape.attack * self.sample_rate) as usize;
        self.stage_counter = 0;
    }

    /// Generate the next envelope level.
    pub fn next_sample(&mut self) -> f64 {
        let out = self.level;
        match self.stage {
            Stage::Idle | Stage::Tail => {}
            Stage::Attack => {
                self.stage_counter += 1;
                if self.stage_counter >= self.stage_samples {
                    self.level = self.shape.peak;
                    self.enter_decay();
                } else {
                    let t = self.stage_counter as f64 / self.stage_samples as f64;
                    self.level = self.shape.floor + (self.shape.peak - self.shape.floor) * t;
                }
            }
            Stage::Decay => {
                self.stage_counter += 1;
                self.level *= self.decay_ratio;
                if self.stage_counter >= self.stage_samples {
                    self.level = self.shape.floor;
                    self.stage = Stage::Tail;
                }
            }
        }
        out
    }

    /// True once the decay has reached the floor.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Tail
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    fn enter_decay(&mut self) {
        let decay_secs = (self.shape.duration - self.shape.attack).max(0.0);
        self.stage_samples = (decay_secs * self.sample_rate) as usize;
        self.stage_counter = 0;
        if self.stage_samples == 0 {
            self.level = self.shape.floor;
            self.stage = Stage::Tail;
            return;
        }
        // peak * ratio^n == floor after n samples
        self.decay_ratio =
            (self.shape.floor / self.shape.peak).powf(1.0 / self.stage_samples as f64);
        self.stage = Stage::Decay;
    }
}
