//! # Random Number Generation Infrastructure
//!
//! Random variate sources for the Heston path simulator.
//!
//! - **Reproducibility**: every generator is seeded; the same seed gives
//!   the same sequence
//! - **Partitioned streams**: [`PricerRng::for_stream`] derives an
//!   independent generator per work chunk
//! - **Correlation**: [`CorrelatedNormals`] maps independent normals to the
//!   `(z1, z2)` pair driving asset and variance
//!
//! ## Usage Example
//!
//! ```rust
//! use pricer_pricing::rng::{CorrelatedNormals, PricerRng};
//!
//! let mut rng = PricerRng::for_stream(12345, 0);
//! let normals = CorrelatedNormals::new(-0.5).unwrap();
//!
//! let mut drivers = vec![0.0; 2 * 252];
//! normals.fill(&mut rng, &mut drivers);
//! ```

mod correlated;
mod prng;

pub use correlated::{CorrelatedNormals, RngError};
pub use prng::PricerRng;
