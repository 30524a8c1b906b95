//! Box constraints for solver parameters.

/// Closed interval `[min, max]` constraining one solver parameter.
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::ParameterBounds;
///
/// let b = ParameterBounds::new(-0.99, 0.99);
/// assert!(b.contains(0.5));
/// assert_eq!(b.clamp(1.5), 0.99);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterBounds {
    /// Minimum allowed value.
    pub min: f64,
    /// Maximum allowed value.
    pub max: f64,
}

impl ParameterBounds {
    /// Create new bounds.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Create bounds for a strictly positive parameter.
    pub fn positive() -> Self {
        Self {
            min: 1e-10,
            max: f64::INFINITY,
        }
    }

    /// Create unbounded.
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// True when `min <= max` and neither end is NaN.
    pub fn is_valid(&self) -> bool {
        !self.min.is_nan() && !self.max.is_nan() && self.min <= self.max
    }

    /// Check if a value is within bounds.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp a value to bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Width of the interval.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl From<(f64, f64)> for ParameterBounds {
    fn from((min, max): (f64, f64)) -> Self {
        Self::new(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_and_contains() {
        let b = ParameterBounds::new(0.01, 5.0);
        assert_eq!(b.clamp(-1.0), 0.01);
        assert_eq!(b.clamp(10.0), 5.0);
        assert_eq!(b.clamp(1.0), 1.0);
        assert!(b.contains(0.01));
        assert!(!b.contains(5.1));
    }

    #[test]
    fn test_validity() {
        assert!(ParameterBounds::new(0.0, 0.0).is_valid());
        assert!(!ParameterBounds::new(1.0, 0.0).is_valid());
        assert!(!ParameterBounds::new(f64::NAN, 1.0).is_valid());
        assert!(ParameterBounds::unbounded().is_valid());
    }
}
