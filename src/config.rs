//! Configuration of the analysis and of the built-in decision procedure.

/// Options of a monotonicity analysis run.
///
/// # Examples
///
/// ```
/// use reach_order::config::AnalysisConfig;
///
/// let config = AnalysisConfig {
///     number_of_samples: 10,
///     ..AnalysisConfig::default()
/// };
/// assert!(config.check_monotonicity);
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Number of sample points per parameter used to refute assumptions numerically.
    /// Zero disables the sample-based check.
    pub number_of_samples: usize,
    /// Distance of the default region from 0 and 1.
    pub precision: f64,
    /// Accept an assumption as valid when every sample agrees.
    ///
    /// Sampling is not a proof. When disabled, agreeing samples only let the
    /// symbolic check run; disagreeing samples always refute.
    pub trust_samples: bool,
    /// Explore independent branches of the assumption search with rayon.
    pub parallel: bool,
    /// Upper bound on the number of branches created by the assumption search.
    pub max_branches: usize,
    /// Derive per-parameter monotonicity from every finished order.
    pub check_monotonicity: bool,
    /// Iteration bound of the value iteration used for sampling.
    pub max_iterations: usize,
    /// Options of the built-in decision procedure.
    pub solver: SolverConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            number_of_samples: 0,
            precision: 1e-6,
            trust_samples: false,
            parallel: false,
            max_branches: 64,
            check_monotonicity: true,
            max_iterations: 10_000,
            solver: SolverConfig::default(),
        }
    }
}

/// Resource limits of the decision procedures.
///
/// `timeout_ms` applies to z3; the remaining fields bound the
/// [`IntervalSolver`][crate::solver::IntervalSolver].
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Time limit of a single z3 check in milliseconds (0: no limit).
    pub timeout_ms: u32,
    /// Maximum number of bisections along one path of the box tree.
    pub max_depth: usize,
    /// Maximum number of boxes examined per conjunction.
    pub max_boxes: usize,
    /// Number of random witness points tried per box before splitting.
    pub witness_samples: usize,
    /// Seed of the witness generator.
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_depth: 24,
            max_boxes: 4096,
            witness_samples: 4,
            seed: 42,
        }
    }
}
