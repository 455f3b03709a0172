//! Linear parameter ramp, used for the master fade-in.

#[derive(Debug, Clone)]
pub struct LinearRamp {
    value: f64,
    target: f64,
    step: f64,
    remaining: usize,
}

impl LinearRamp {
    pub fn new(value: f64) -> Self {
        LinearRamp {
            value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Ramp from `from` to `to` over `seconds`.
    pub fn start(&mut self, from: f64, to: f64, seconds: f64, sample_rate: f64) {
        let samples = (seconds.max(0.0) * sample_rate) as usize;
        self.value = from;
        self.target = to;
        if samples == 0 {
            self.value = to;
            self.remaining = 0;
            self.step = 0.0;
        } else {
            self.remaining = samples;
            self.step = (to - from) / samples as f64;
        }
    }

    #[inline]
    pub fn next_value(&mut self) -> f64 {
        let out = self.value;
        if self.remaining > 0 {
            self.remaining -= 1;
            self.value = if self.remaining == 0 {
                self.target
            } else {
                self.value + self.step
            };
        }
        out
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramps_linearly_to_target() {
        let mut r = LinearRamp::new(0.0);
        r.start(0.0, 0.5, 1.0, 100.0);
        assert_eq!(r.next_value(), 0.0);
        for _ in 0..49 {
            r.next_value();
        }
        assert!((r.value() - 0.25).abs() < 1e-9, "halfway should be 0.25, got {}", r.value());
        for _ in 0..50 {
            r.next_value();
        }
        assert!(!r.is_ramping());
        assert_eq!(r.value(), 0.5);
    }

    #[test]
    fn zero_length_ramp_jumps() {
        let mut r = LinearRamp::new(0.0);
        r.start(0.0, 0.8, 0.0, 44100.0);
        assert_eq!(r.next_value(), 0.8);
    }}
