/// Arithmetic over nullable samples. Missing or undefined operands yield
/// `None` instead of panicking or producing NaN.
pub struct StatsHelper;

impl StatsHelper {
    pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
        match (numerator, denominator) {
            (Some(n), Some(d)) if d != 0.0 => Self::finite(n / d),
            _ => None,
        }
    }

    pub fn difference(lhs: Option<f64>, rhs: Option<f64>) -> Option<f64> {
        match (lhs, rhs) {
            (Some(l), Some(r)) => Self::finite(l - r),
            _ => None,
        }
    }

    /// Divisor used for normalization; 1.0 when the sample is absent or zero.
    pub fn neutral_factor(sample: Option<f64>) -> f64 {
        match sample {
            Some(value) if value != 0.0 && value.is_finite() => value,
            _ => 1.0,
        }
    }

    pub fn finite(value: f64) -> Option<f64> {
        value.is_finite().then_some(value)
    }
}
