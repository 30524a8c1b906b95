//! Correlated standard-normal pairs for the Heston asset/variance drivers.

use thiserror::Error;

use super::prng::PricerRng;

/// Random variate source errors.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RngError {
    /// Correlation outside `[-1, 1]` or NaN.
    #[error("Invalid correlation {0}: must lie in [-1, 1]")]
    InvalidCorrelation(f64),
}

/// Maps independent normals `(n1, n2)` to a pair with correlation `rho`:
///
/// ```text
/// z1 = n1
/// z2 = rho * n1 + sqrt(1 - rho^2) * n2
/// ```
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::rng::{CorrelatedNormals, PricerRng};
///
/// let normals = CorrelatedNormals::new(-0.7).unwrap();
/// let mut rng = PricerRng::from_seed(1);
/// let (z1, z2) = normals.next(&mut rng);
/// assert!(z1.is_finite() && z2.is_finite());
///
/// assert!(CorrelatedNormals::new(1.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelatedNormals {
    rho: f64,
    rho_bar: f64,
}

impl CorrelatedNormals {
    /// Create for correlation `rho`.
    ///
    /// # Errors
    ///
    /// `RngError::InvalidCorrelation` unless `-1 <= rho <= 1`.
    pub fn new(rho: f64) -> Result<Self, RngError> {
        if !(-1.0..=1.0).contains(&rho) {
            return Err(RngError::InvalidCorrelation(rho));
        }
        Ok(Self {
            rho,
            rho_bar: (1.0 - rho * rho).max(0.0).sqrt(),
        })
    }

    /// The target correlation.
    #[inline]
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Correlate one pair of independent normals.
    #[inline]
    pub fn correlate(&self, n1: f64, n2: f64) -> (f64, f64) {
        (n1, self.rho * n1 + self.rho_bar * n2)
    }

    /// Draw one correlated pair.
    #[inline]
    pub fn next(&self, rng: &mut PricerRng) -> (f64, f64) {
        let n1 = rng.gen_normal();
        let n2 = rng.gen_normal();
        self.correlate(n1, n2)
    }

    /// Fill `drivers` with interleaved correlated pairs `[z1, z2, z1, z2, ...]`.
    ///
    /// An odd-length buffer leaves its last slot untouched.
    pub fn fill(&self, rng: &mut PricerRng, drivers: &mut [f64]) {
        rng.fill_normal(drivers);
        for pair in drivers.chunks_exact_mut(2) {
            let (z1, z2) = self.correlate(pair[0], pair[1]);
            pair[0] = z1;
            pair[1] = z2;
        }
    }
}
