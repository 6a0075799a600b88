//! Easing curves for tweens

pub use crate::config::EasingType;

impl EasingType {
    /// Map linear progress to eased progress, both in [0, 1]
    ///
    /// Non-finite input maps to 0 so a bad clock reading never yields NaN
    /// property values.
    #[inline]
    pub fn ease(self, progress: f64) -> f64 {
        if !progress.is_finite() {
            return 0.0;
        }
        let t = progress.clamp(0.0, 1.0);
        match self {
            EasingType::None => t.floor(),
            EasingType::Linear => t,
            EasingType::Cubic => out_pow(t, 3),
            EasingType::Quintic => out_pow(t, 5),
            EasingType::EaseOut if t >= 1.0 => 1.0,
            EasingType::EaseOut => 1.0 - (-10.0 * t).exp2(),
            EasingType::CubicInOut if t < 0.5 => 4.0 * t.powi(3),
            EasingType::CubicInOut => 1.0 - (2.0 - 2.0 * t).powi(3) / 2.0,
        }
    }
}

/// Polynomial ease-out: 1 - (1 - t)^n
#[inline]
fn out_pow(t: f64, n: i32) -> f64 {
    1.0 - (1.0 - t).powi(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVES: [EasingType; 5] = [
        EasingType::Linear,
        EasingType::Cubic,
        EasingType::Quintic,
        EasingType::EaseOut,
        EasingType::CubicInOut,
    ];

    #[test]
    fn test_curves_hit_endpoints() {
        for easing in CURVES {
            assert!(easing.ease(0.0).abs() < 1e-3, "{:?} at 0", easing);
            assert!((easing.ease(1.0) - 1.0).abs() < 1e-3, "{:?} at 1", easing);
        }
        assert_eq!(EasingType::None.ease(0.99), 0.0);
        assert_eq!(EasingType::None.ease(1.0), 1.0);
    }

    #[test]
    fn test_curves_never_decrease() {
        for easing in CURVES {
            let samples: Vec<f64> = (0..=20).map(|i| easing.ease(i as f64 / 20.0)).collect();
            assert!(samples.windows(2).all(|w| w[1] >= w[0]), "{:?}", easing);
        }
    }

    #[test]
    fn test_out_of_range_and_nan_are_clamped() {
        assert_eq!(EasingType::Cubic.ease(f64::NAN), 0.0);
        assert_eq!(EasingType::Linear.ease(-0.5), 0.0);
        assert_eq!(EasingType::Quintic.ease(3.0), 1.0);
        assert!((EasingType::CubicInOut.ease(0.5) - 0.5).abs() < 1e-9);
    }
}
