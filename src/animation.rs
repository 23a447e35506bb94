//! Drives the drone's animation mixer from a scalar input.
//!
//! The input (nominally desired altitude) is remapped through two linear
//! segments into the delta handed to the external mixer each frame.

use crate::config::AnimationConfig;
use crate::{Result, SimError};

/// Validated two-segment remap: `[in_min, in_mid] -> [out_min, out_mid]` and
/// `(in_mid, in_max] -> (out_mid, out_max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemapRange {
    in_min: f64,
    in_mid: f64,
    in_max: f64,
    out_min: f64,
    out_mid: f64,
    out_max: f64,
}

impl RemapRange {
    /// Rejects segments of zero input width.
    pub fn new(
        in_min: f64,
        in_mid: f64,
        in_max: f64,
        out_min: f64,
        out_mid: f64,
        out_max: f64,
    ) -> Result<Self> {
        if in_min == in_mid {
            return Err(SimError::DegenerateRange {
                from: in_min,
                to: in_mid,
            });
        }
        if in_mid == in_max {
            return Err(SimError::DegenerateRange {
                from: in_mid,
                to: in_max,
            });
        }
        Ok(Self {
            in_min,
            in_mid,
            in_max,
            out_min,
            out_mid,
            out_max,
        })
    }

    pub fn from_config(config: &AnimationConfig) -> Result<Self> {
        Self::new(
            config.in_min,
            config.in_mid,
            config.in_max,
            config.out_min,
            config.out_mid,
            config.out_max,
        )
    }

    /// Remap `value`. Segment endpoints map exactly onto their outputs.
    pub fn apply(&self, value: f64) -> f64 {
        if value <= self.in_mid {
            let t = (value - self.in_min) / (self.in_mid - self.in_min);
            mix(self.out_min, self.out_mid, t)
        } else {
            let t = (value - self.in_mid) / (self.in_max - self.in_mid);
            mix(self.out_mid, self.out_max, t)
        }
    }
}

fn mix(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Piecewise-linear remap in one call.
pub fn scale(
    value: f64,
    in_min: f64,
    in_mid: f64,
    in_max: f64,
    out_min: f64,
    out_mid: f64,
    out_max: f64,
) -> Result<f64> {
    Ok(RemapRange::new(in_min, in_mid, in_max, out_min, out_mid, out_max)?.apply(value))
}

/// Feeds the animation mixer once per frame.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    range: RemapRange,
    input: f64,
    clip_time: f64,
}

impl AnimationDriver {
    pub fn new(range: RemapRange) -> Self {
        Self {
            range,
            input: 0.0,
            clip_time: 0.0,
        }
    }

    pub fn set_input(&mut self, value: f64) {
        self.input = value;
    }

    pub fn input(&self) -> f64 {
        self.input
    }

    /// Delta for this frame. Also advances the accumulated clip time.
    pub fn advance(&mut self) -> f64 {
        let delta = self.range.apply(self.input);
        self.clip_time += delta;
        delta
    }

    /// Total time handed to the mixer so far.
    pub fn clip_time(&self) -> f64 {
        self.clip_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact() {
        let cases = [
            (-1.0, 0.0, 1.0, 0.0, 0.5, 5.0),
            (0.1, 0.7, 3.3, -2.2, 1.9, 0.3),
            (10.0, 13.0, 17.0, 0.1, 0.2, 0.3),
        ];
        for (in_min, in_mid, in_max, out_min, out_mid, out_max) in cases {
            let s = |v| scale(v, in_min, in_mid, in_max, out_min, out_mid, out_max).unwrap();
            assert_eq!(s(in_min), out_min);
            assert_eq!(s(in_mid), out_mid);
            assert_eq!(s(in_max), out_max);
        }
    }

    #[test]
    fn test_segments_are_linear() {
        let range = RemapRange::new(-1.0, 0.0, 1.0, 0.0, 0.5, 5.0).unwrap();
        assert!((range.apply(-0.5) - 0.25).abs() < 1e-12);
        assert!((range.apply(0.5) - 2.75).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_segments_rejected() {
        assert!(matches!(
            RemapRange::new(0.0, 0.0, 1.0, 0.0, 0.5, 1.0),
            Err(SimError::DegenerateRange { .. })
        ));
        assert!(scale(0.5, 0.0, 1.0, 1.0, 0.0, 0.5, 1.0).is_err());
    }

    #[test]
    fn test_driver_static_input() {
        let range = RemapRange::from_config(&AnimationConfig::default()).unwrap();
        let mut driver = AnimationDriver::new(range);
        assert_eq!(driver.advance(), 0.5);
        assert_eq!(driver.advance(), 0.5);
        assert_eq!(driver.clip_time(), 1.0);

        driver.set_input(1.0);
        assert_eq!(driver.advance(), 5.0);
    }
}
