use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Result, TickgraphError};

pub fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

/// Gaussian offset applied to each detected tick, in samples
pub struct TimingJitter {
    normal: Option<Normal<f64>>,
}

impl TimingJitter {
    pub fn new(std_dev: f64) -> Result<Self> {
        if std_dev == 0.0 {
            return Ok(Self { normal: None });
        }
        let normal = Normal::new(0.0, std_dev)
            .map_err(|e| TickgraphError::Simulation(format!("Invalid jitter {}: {}", std_dev, e)))?;
        Ok(Self {
            normal: Some(normal),
        })
    }

    pub fn sample(&self, rng: &mut ChaCha8Rng) -> f64 {
        self.normal.as_ref().map_or(0.0, |n| n.sample(rng))
    }

    pub fn is_enabled(&self) -> bool {
        self.normal.is_some()
    }
}
