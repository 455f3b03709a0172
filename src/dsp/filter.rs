//! Biquad low-pass: matches WebAudio BiquadFilterNode "lowpass" coefficients.
//!
//! Used as the damping filter in the feedback path of the spatial delay.

use std::f64::consts::PI;

/// A 2nd-order low-pass IIR filter.
///
/// Implements the standard Direct Form II Transposed structure.
/// Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct LowpassFilter {
    cutoff: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
}

impl LowpassFilter {
    pub fn new(cutoff: f64, sample_rate: f64) -> Self {
        let mut f = LowpassFilter {
            cutoff,
            q: std::f64::consts::FRAC_1_SQRT_2, // Butterworth
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        };
        f.update_coefficients();
        f
    }

    fn update_coefficients(&mut self) {
        // Keep the cutoff below Nyquist so the coefficients stay stable.
        let cutoff = self.cutoff.clamp(10.0, self.sample_rate * 0.49);
        let w0 = 2.0 * PI * cutoff / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    /// Process a single sample through the filter.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_passes_dc() {
        let mut f = LowpassFilter::new(2200.0, 44100.0);
        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!(
            (output - 1.0).abs() < 0.001,
            "Lowpass should pass DC, got {output}"
        );
    }

    #[test]
    fn lowpass_attenuates_high_freq() {
        let mut f = LowpassFilter::new(200.0, 44100.0);

        let freq = 10000.0;
        let mut max_out = 0.0_f64;
        for i in 0..4410 {
            let t = i as f64 / 44100.0;
            let input = (2.0 * PI * freq * t).sin();
            let out = f.process(input);
            if i > 1000 {
                // skip transient
                max_out = max_out.max(out.abs());
            }
        }
        assert!(
            max_out < 0.01,
            "Lowpass@200Hz should strongly attenuate 10kHz, got amplitude {max_out}"
        );
    }

    #[test]
    fn cutoff_above_nyquist_stays_finite() {
        let mut f = LowpassFilter::new(40000.0, 22050.0);
        for i in 0..10000 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            let out = f.process(input);
            assert!(out.is_finite(), "Filter output not finite at sample {i}");
        }
    }}
