//! Equal-power stereo panner, matching WebAudio's StereoPannerNode for a
//! mono input.

use std::f64::consts::FRAC_PI_2;

/// Gains for a mono source at `pan` in [-1, 1] (values outside are clamped).
#[inline]
pub fn pan_gains(pan: f64) -> (f64, f64) {
    let x = (pan.clamp(-1.0, 1.0) + 1.0) / 2.0;
    ((x * FRAC_PI_2).cos(), (x * FRAC_PI_2).sin())
}

/// Place a mono sample in the stereo field.
#[inline]
pub fn pan_mono(sample: f64, pan: f64) -> (f64, f64) {
    let (gl, gr) = pan_gains(pan);
    (sample * gl, sample * gr)
}
