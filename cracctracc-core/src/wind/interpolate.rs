//! One dimensional interpolation for sparse wind series

/// Remove jumps larger than half a period from a periodic series
pub fn unwrap(values: &[f64], period: f64) -> Vec<f64> {
    let half = period / 2.0;
    let mut out = Vec::with_capacity(values.len());
    let mut correction = 0.0;

    for (i, &v) in values.iter().enumerate() {
        if i > 0 {
            let delta = v - values[i - 1];
            if delta.abs() >= half {
                let mut wrapped = (delta + half).rem_euclid(period) - half;
                if wrapped == -half && delta > 0.0 {
                    wrapped = half;
                }
                correction += wrapped - delta;
            }
        }
        out.push(v + correction);
    }
    out
}

/// Piecewise linear interpolation at `x`, clamped to the end values
///
/// `xp` must be increasing and the same length as `fp`.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // First index with xp > x, always in 1..n here
    let j = xp[..n].partition_point(|&p| p <= x);
    let (x0, x1) = (xp[j - 1], xp[j]);
    let (f0, f1) = (fp[j - 1], fp[j]);
    f0 + (f1 - f0) * (x - x0) / (x1 - x0)
}

/// Interpolate a periodic quantity: unwrap, interpolate, wrap into [0, period)
pub fn angular_interpolation(x: &[f64], xp: &[f64], fp: &[f64], period: f64) -> Vec<f64> {
    let unwrapped = unwrap(fp, period);
    x.iter()
        .map(|&xi| interp(xi, xp, &unwrapped).rem_euclid(period))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap() {
        assert_eq!(
            unwrap(&[10.0, 20.0, 350.0, 10.0], 360.0),
            vec![10.0, 20.0, -10.0, 10.0]
        );
        assert_eq!(unwrap(&[350.0, 10.0, 30.0], 360.0), vec![350.0, 370.0, 390.0]);
    }

    #[test]
    fn test_interp_clamps() {
        let xp = [1.0, 2.0, 4.0];
        let fp = [10.0, 20.0, 40.0];
        assert_eq!(interp(0.0, &xp, &fp), 10.0);
        assert_eq!(interp(5.0, &xp, &fp), 40.0);
        assert_eq!(interp(3.0, &xp, &fp), 30.0);
        assert_eq!(interp(2.0, &xp, &fp), 20.0);
    }

    #[test]
    fn test_angular_interpolation_crosses_north() {
        let xp = [1.0, 2.0, 3.0, 4.0];
        let fp = [10.0, 20.0, 350.0, 10.0];
        let result = angular_interpolation(&[1.0, 2.0, 3.0, 4.0], &xp, &fp, 360.0);
        assert_eq!(result, vec![10.0, 20.0, 350.0, 10.0]);

        // Halfway between 20 and 350 is 5, not 185
        let mid = angular_interpolation(&[2.5, 3.5], &xp, &fp, 360.0);
        assert!((mid[0] - 5.0).abs() < 1e-9);
        assert!(mid[1].abs() < 1e-9);
    }
}
