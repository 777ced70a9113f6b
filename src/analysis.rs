//! The monotonicity analysis driver.
//!
//! Orders are extended until they are complete or need an assumption. Every
//! viable assumption spawns a branch with its own copy of the order; the
//! branches are explored generation by generation, optionally in parallel.

use std::fmt;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::assumption::Assumption;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::extender::{Extension, OrderExtender};
use crate::model::ParametricModel;
use crate::monotonicity::{Monotonicity, MonotonicityResult};
use crate::order::Order;
use crate::property::Property;
use crate::region::Region;
use crate::sampling::Sampler;
use crate::smt::DecisionProcedure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchStatus {
    Complete,
    Partial { reason: String },
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchStatus::Complete => write!(f, "complete"),
            BranchStatus::Partial { reason } => write!(f, "partial: {}", reason),
        }
    }
}

/// A finished branch of the assumption search.
#[derive(Debug, Clone)]
pub struct Branch {
    pub order: Order,
    /// Assumptions under which the order holds, in the order they were made.
    pub assumptions: Vec<Assumption>,
    pub monotonicity: MonotonicityResult,
    pub status: BranchStatus,
}

impl Branch {
    pub fn is_complete(&self) -> bool {
        self.status == BranchStatus::Complete
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub branches: Vec<Branch>,
}

impl AnalysisResult {
    pub fn complete_branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(|b| b.is_complete())
    }

    /// Monotonicity of the property value in `parameter` over the whole region.
    ///
    /// Exactly one branch describes the true order, so a verdict shared by all
    /// branches holds. Any partial branch makes the verdict unknown unless
    /// samples refuted monotonicity.
    pub fn verdict(&self, parameter: &str) -> Monotonicity {
        let mut verdicts = self.branches.iter().map(|b| b.monotonicity.get(parameter));
        let Some(first) = verdicts.next() else {
            return Monotonicity::Unknown;
        };
        verdicts.fold(first, Monotonicity::combine)
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, branch) in self.branches.iter().enumerate() {
            let assumptions: Vec<String> = branch.assumptions.iter().map(|a| a.to_string()).collect();
            writeln!(
                f,
                "branch {} ({}) [{}]: {}",
                i,
                branch.status,
                assumptions.join(", "),
                branch.monotonicity
            )?;
        }
        Ok(())
    }
}

/// A branch waiting to be extended.
struct Pending {
    order: Order,
    assumptions: Vec<Assumption>,
    monotonicity: MonotonicityResult,
    next: Option<Assumption>,
}

impl Pending {
    fn finish(self, status: BranchStatus) -> Branch {
        Branch {
            order: self.order,
            assumptions: self.assumptions,
            monotonicity: self.monotonicity,
            status,
        }
    }
}

fn explore(extender: &OrderExtender<'_>, mut pending: Pending) -> (Pending, Extension) {
    let next = pending.next.take();
    if let Some(assumption) = next {
        pending.assumptions.push(assumption);
    }
    let extension = extender.extend_order(&mut pending.order, &mut pending.monotonicity, next.as_ref());
    (pending, extension)
}

/// Builds the orders of `property` over `region` and derives monotonicity from them.
///
/// Without a region every parameter ranges over `[precision, 1 - precision]`.
pub fn analyze(
    model: &ParametricModel,
    property: &Property,
    region: Option<&Region>,
    solver: &dyn DecisionProcedure,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    property.validate(model)?;
    let region = match region {
        Some(region) => region.clone(),
        None => Region::default_for(model.parameters(), config.precision)?,
    };
    region.check_covers(model.parameters())?;
    info!("analyzing {} state(s) over {}", model.num_states(), region);

    let extender = OrderExtender::new(model, property, &region, solver, config)?;
    let mut worklist = vec![Pending {
        order: extender.initial_order(),
        assumptions: Vec::new(),
        monotonicity: extender.initial_monotonicity(),
        next: None,
    }];
    let mut created = 1;
    let mut result = AnalysisResult::default();

    while !worklist.is_empty() {
        let generation = std::mem::take(&mut worklist);
        debug!("exploring {} branch(es)", generation.len());
        let outcomes: Vec<(Pending, Extension)> = if config.parallel {
            generation.into_par_iter().map(|p| explore(&extender, p)).collect()
        } else {
            generation.into_iter().map(|p| explore(&extender, p)).collect()
        };

        for (pending, extension) in outcomes {
            match extension {
                Extension::Complete => result.branches.push(pending.finish(BranchStatus::Complete)),
                Extension::Halted { reason, .. } => {
                    result.branches.push(pending.finish(BranchStatus::Partial { reason }));
                }
                Extension::Inconsistent => {
                    debug!("discarding inconsistent branch under {:?}", pending.assumptions);
                }
                Extension::Branch { state, pair, hypotheses } => {
                    debug!(
                        "state {} branches on {} and {} into {} hypotheses",
                        state,
                        pair.0,
                        pair.1,
                        hypotheses.len()
                    );
                    let room = config.max_branches.saturating_sub(created);
                    for hypothesis in hypotheses.iter().take(room) {
                        worklist.push(Pending {
                            order: pending.order.clone(),
                            assumptions: pending.assumptions.clone(),
                            monotonicity: pending.monotonicity.clone(),
                            next: Some(*hypothesis),
                        });
                    }
                    created += hypotheses.len().min(room);
                    if hypotheses.len() > room {
                        warn!("branch limit of {} reached", config.max_branches);
                        let reason = format!("branch limit of {} reached", config.max_branches);
                        result.branches.push(pending.finish(BranchStatus::Partial { reason }));
                    }
                }
            }
        }
    }

    if config.number_of_samples > 2 {
        let sampler = Sampler::new(model, property, config.max_iterations, config.precision)?.parallel(config.parallel);
        let trends = sampler.monotonicity_on_samples(&region, config.number_of_samples);
        for branch in &mut result.branches {
            for (parameter, trend) in &trends {
                branch.monotonicity.refute_with_samples(parameter, *trend);
            }
        }
    }

    info!(
        "{} branch(es), {} complete",
        result.branches.len(),
        result.complete_branches().count()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bitset::BitSet;
    use crate::model::ModelBuilder;
    use crate::smt::tests::MockSolver;
    use crate::solver::IntervalSolver;

    fn undecided() -> (ParametricModel, Property) {
        let mut b = ModelBuilder::new(5);
        b.add_action_str(0, &[(0, "1")]).unwrap();
        b.add_action_str(1, &[(0, "p"), (4, "1-p")]).unwrap();
        b.add_action_str(2, &[(0, "q"), (4, "1-q")]).unwrap();
        b.add_action_str(3, &[(1, "1/2"), (2, "1/2")]).unwrap();
        b.add_action_str(4, &[(4, "1")]).unwrap();
        b.initial(3);
        (b.build().unwrap(), Property::eventually(BitSet::from_indices(5, [0])))
    }

    #[test]
    fn test_default_region_and_branches() {
        let (model, property) = undecided();
        let solver = MockSolver::new(Vec::new());
        let result = analyze(&model, &property, None, &solver, &AnalysisConfig::default()).unwrap();
        // 1 > 2, 1 < 2 and 1 = 2 are all undecided by the scripted solver
        assert_eq!(result.branches.len(), 3);
        assert!(result.branches.iter().all(|b| b.is_complete()));
        assert!(result.branches.iter().all(|b| b.assumptions.len() == 1));
        assert_eq!(result.to_string().lines().count(), 3);
    }

    #[test]
    fn test_branch_limit() {
        let (model, property) = undecided();
        let solver = MockSolver::new(Vec::new());
        let config = AnalysisConfig {
            max_branches: 2,
            ..AnalysisConfig::default()
        };
        let result = analyze(&model, &property, None, &solver, &config).unwrap();
        assert_eq!(result.branches.len(), 2);
        assert_eq!(result.complete_branches().count(), 1);
        assert_eq!(result.verdict("p"), Monotonicity::Unknown);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (model, property) = undecided();
        let region = Region::parse("0.6<=p<=0.9, 0.1<=q<=0.4").unwrap();
        let solver = IntervalSolver::default();
        let sequential = analyze(&model, &property, Some(&region), &solver, &AnalysisConfig::default()).unwrap();
        let config = AnalysisConfig {
            parallel: true,
            ..AnalysisConfig::default()
        };
        let parallel = analyze(&model, &property, Some(&region), &solver, &config).unwrap();
        assert_eq!(sequential.branches.len(), 1);
        assert_eq!(parallel.branches.len(), 1);
        assert_eq!(sequential.verdict("p"), Monotonicity::Incr);
        assert_eq!(parallel.verdict("q"), Monotonicity::Incr);
    }

    #[test]
    fn test_region_must_cover_parameters() {
        let (model, property) = undecided();
        let region = Region::parse("0.1<=p<=0.9").unwrap();
        let solver = IntervalSolver::default();
        assert!(analyze(&model, &property, Some(&region), &solver, &AnalysisConfig::default()).is_err());
    }
}
