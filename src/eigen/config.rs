use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Numerical settings for power iteration and deflation.
///
/// Tolerances are relative to `max(1, ‖A‖_F)` of the matrix being decomposed.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenConfig {
    /// Largest change between successive Rayleigh quotients accepted as converged.
    pub tolerance: f64,
    /// Residual level `‖Ab - μb‖` expected of a converged pair. It does not
    /// stop the iteration; a larger residual is only logged. It also bounds the
    /// exhausted-remainder test and the step size that ends inverse iteration.
    pub residual_tolerance: f64,
    /// Iteration budget for a single power-iteration run.
    pub max_iterations: usize,
    /// Independent runs per eigenpair; the largest-magnitude result wins.
    pub restarts: usize,
    /// Relative threshold below which a norm counts as zero. A deflated matrix
    /// is also treated as exhausted once it falls under the residual floor.
    pub zero_tolerance: f64,
    /// Eigenvalues closer than this are reported as a degenerate pair.
    pub degeneracy_tolerance: f64,
    /// Redraw budget when an iterate collapses to the zero vector.
    pub max_reseeds: usize,
    /// Seed for the default random source. `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-13,
            residual_tolerance: 1e-10,
            max_iterations: 100_000,
            restarts: 2,
            zero_tolerance: 1e-12,
            degeneracy_tolerance: 1e-8,
            max_reseeds: 100,
            seed: None,
        }
    }
}

impl EigenConfig {
    pub fn builder() -> EigenConfigBuilder {
        EigenConfigBuilder::new()
    }

    /// Random source for one decomposition. `stream` separates independent
    /// decompositions that share a seed.
    pub(crate) fn rng(&self, stream: u64) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(stream);
                rng
            }
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}

pub struct EigenConfigBuilder {
    config: EigenConfig,
}

impl EigenConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EigenConfig::default(),
        }
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn residual_tolerance(mut self, residual_tolerance: f64) -> Self {
        self.config.residual_tolerance = residual_tolerance;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations.max(1);
        self
    }

    pub fn restarts(mut self, restarts: usize) -> Self {
        self.config.restarts = restarts.max(1);
        self
    }

    pub fn zero_tolerance(mut self, zero_tolerance: f64) -> Self {
        self.config.zero_tolerance = zero_tolerance;
        self
    }

    pub fn degeneracy_tolerance(mut self, degeneracy_tolerance: f64) -> Self {
        self.config.degeneracy_tolerance = degeneracy_tolerance;
        self
    }

    pub fn max_reseeds(mut self, max_reseeds: usize) -> Self {
        self.config.max_reseeds = max_reseeds;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> EigenConfig {
        self.config
    }
}

impl Default for EigenConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
