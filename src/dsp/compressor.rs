//! Master dynamics stage: a fast, high-ratio compressor acting as a limiter.
//!
//! Same gain computer as WebAudio's DynamicsCompressorNode (threshold,
//! ratio, soft knee) with a peak envelope follower. Attack/release
//! coefficients are computed once at construction.

/// Limiter settings, in dB and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterSettings {
    pub threshold: f64,
    pub ratio: f64,
    pub knee: f64,
    pub attack: f64,
    pub release: f64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        LimiterSettings {
            threshold: -12.0,
            ratio: 12.0,
            knee: 6.0,
            attack: 0.003,
            release: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Limiter {
    settings: LimiterSettings,
    attack_coef: f64,
    release_coef: f64,
    envelope: f64,
}

impl Limiter {
    pub fn new(settings: LimiterSettings, sample_rate: f64) -> Self {
        let settings = LimiterSettings {
            threshold: settings.threshold.clamp(-60.0, 0.0),
            ratio: settings.ratio.clamp(1.0, 20.0),
            knee: settings.knee.clamp(0.0, 40.0),
            attack: settings.attack.clamp(0.0001, 1.0),
            release: settings.release.clamp(0.001, 5.0),
        };
        Limiter {
            attack_coef: (-1.0 / (settings.attack * sample_rate)).exp(),
            release_coef: (-1.0 / (settings.release * sample_rate)).exp(),
            settings,
            envelope: 0.0,
        }
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain change (≤ 0 dB) for a detector level in dB.
    fn gain_reduction_db(&self, input_db: f64) -> f64 {
        let LimiterSettings {
            threshold,
            ratio,
            knee,
            ..
        } = self.settings;
        let slope = 1.0 - 1.0 / ratio;
        let half_knee = knee / 2.0;

        if input_db <= threshold - half_knee {
            0.0
        } else if knee <= 0.0 || input_db >= threshold + half_knee {
            (threshold - input_db) * slope
        } else {
            let x = input_db - (threshold - half_knee);
            -slope * x * x / (2.0 * knee)
        }
    }

    /// Process one stereo frame; both channels share a single detector.
    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let level = left.abs().max(right.abs());
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let gain = Self::db_to_linear(self.gain_reduction_db(Self::linear_to_db(self.envelope)));
        (left * gain, right * gain)
    }

    /// Current gain reduction in dB (positive number), for metering.
    pub fn gain_reduction(&self) -> f64 {
        -self.gain_reduction_db(Self::linear_to_db(self.envelope))
    }
}
