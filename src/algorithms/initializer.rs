use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const INIT_LOW: f64 = -1.0;
const INIT_HIGH: f64 = 1.0;

/// Source of the random values new parameters start from.
///
/// Every coordinate is drawn independently and uniformly from `[-1, 1]`.
/// Seed it to make training runs reproducible.
#[derive(Debug, Clone)]
pub struct ParameterInitializer {
    rng: StdRng,
}

impl ParameterInitializer {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn uniform_vector(&mut self, dimension: usize) -> DVector<f64> {
        DVector::from_iterator(dimension, (0..dimension).map(|_| self.uniform_scalar()))
    }

    pub fn uniform_scalar(&mut self) -> f64 {
        self.rng.gen_range(INIT_LOW..=INIT_HIGH)
    }
}

impl Default for ParameterInitializer {
    fn default() -> Self {
        Self::from_entropy()
    }
}
