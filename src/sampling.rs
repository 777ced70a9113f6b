//! Numeric evaluation of instantiated models.
//!
//! Sampling never proves anything. It is used to refute assumptions and to
//! refute monotonicity: a sample that contradicts a claim is evidence against
//! it, agreeing samples are not evidence for it.

use std::collections::BTreeMap;

use log::{debug, trace};
use num_traits::ToPrimitive;
use rayon::prelude::*;

use crate::bitset::BitSet;
use crate::error::Result;
use crate::model::ParametricModel;
use crate::property::Property;
use crate::region::Region;
use crate::types::{Direction, State};

/// A model with every weight evaluated at one parameter point.
pub type Instantiated = Vec<Vec<Vec<(State, f64)>>>;

/// Evaluates every transition weight at `point`.
pub fn instantiate(model: &ParametricModel, point: &BTreeMap<String, f64>) -> Instantiated {
    (0..model.num_states())
        .map(|s| {
            model
                .actions(s)
                .iter()
                .map(|action| action.iter().map(|t| (t.target, t.weight.eval_f64(point))).collect())
                .collect()
        })
        .collect()
}

/// Observed trend of the property value along one parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SampleTrend {
    /// No sample step decreased the value by more than the tolerance.
    pub increasing: bool,
    /// No sample step increased the value by more than the tolerance.
    pub decreasing: bool,
}

/// Value iteration on instantiated models.
#[derive(Debug, Clone)]
pub struct Sampler<'a> {
    model: &'a ParametricModel,
    property: &'a Property,
    bottom: BitSet,
    top: Option<BitSet>,
    rewards: Vec<f64>,
    max_iterations: usize,
    precision: f64,
    parallel: bool,
}

impl<'a> Sampler<'a> {
    pub fn new(model: &'a ParametricModel, property: &'a Property, max_iterations: usize, precision: f64) -> Result<Self> {
        let (bottom, top) = property.bottom_top_states(model)?;
        let rewards = (0..model.num_states())
            .map(|s| property.reward(s).to_f64().unwrap_or(0.0))
            .collect();
        Ok(Self {
            model,
            property,
            bottom,
            top,
            rewards,
            max_iterations,
            precision,
            parallel: false,
        })
    }

    /// Evaluate sample points in parallel.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Values of all states at one parameter point.
    ///
    /// Probability-1 states have value 1 for reachability; states with
    /// infinite expected reward have value infinity.
    pub fn values_at(&self, point: &BTreeMap<String, f64>) -> Vec<f64> {
        let inst = instantiate(self.model, point);
        let n = self.model.num_states();
        let reward = self.property.is_reward();
        let direction = self.property.direction();

        let mut fixed = self.bottom.clone();
        let mut x = vec![0.0; n];
        if let Some(top) = &self.top {
            for s in top {
                x[s] = if reward { f64::INFINITY } else { 1.0 };
            }
            fixed.union_with(top);
        }

        for iteration in 0..self.max_iterations {
            let mut delta: f64 = 0.0;
            for s in 0..n {
                if fixed.contains(s) {
                    continue;
                }
                let action_values = inst[s]
                    .iter()
                    .map(|action| self.rewards[s] + action.iter().map(|&(t, w)| w * x[t]).sum::<f64>());
                let v = match direction {
                    Some(Direction::Minimize) => action_values.fold(f64::INFINITY, f64::min),
                    _ => action_values.fold(f64::NEG_INFINITY, f64::max),
                };
                delta = delta.max((v - x[s]).abs());
                x[s] = v;
            }
            if delta < self.precision {
                trace!("value iteration converged after {} iterations", iteration + 1);
                break;
            }
        }
        x
    }

    /// State values at `n` points on the diagonal of the region.
    pub fn diagonal(&self, region: &Region, n: usize) -> Vec<Vec<f64>> {
        let points = region.diagonal_samples(n);
        debug!("evaluating {} diagonal samples", points.len());
        if self.parallel {
            points.par_iter().map(|p| self.values_at(p)).collect()
        } else {
            points.iter().map(|p| self.values_at(p)).collect()
        }
    }

    /// Sum of the values of the initial states.
    fn initial_value(&self, point: &BTreeMap<String, f64>) -> f64 {
        let values = self.values_at(point);
        self.model.initial_states().iter().map(|s| values[s]).sum()
    }

    /// Checks monotonicity of the initial value along each parameter by sweeping
    /// it through the region while the other parameters stay at their lower bound.
    ///
    /// Needs at least three samples; returns an empty map otherwise.
    pub fn monotonicity_on_samples(&self, region: &Region, n: usize) -> BTreeMap<String, SampleTrend> {
        let mut result = BTreeMap::new();
        if n < 3 {
            return result;
        }
        for param in self.model.parameters() {
            let points = region.sweep(param, n);
            let values: Vec<f64> = if self.parallel {
                points.par_iter().map(|p| self.initial_value(p)).collect()
            } else {
                points.iter().map(|p| self.initial_value(p)).collect()
            };
            let mut trend = SampleTrend {
                increasing: true,
                decreasing: true,
            };
            for pair in values.windows(2) {
                let diff = pair[0] - pair[1];
                trend.increasing &= diff <= self.precision;
                trend.decreasing &= diff >= -self.precision;
            }
            debug!("samples along {}: {:?}", param, trend);
            result.insert(param.clone(), trend);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::model::ModelBuilder;

    /// 0 -> 1 (p), 2 (1-p) with 1 the goal; 3 -> 0 (q), 2 (1-q)
    fn chain() -> ParametricModel {
        let mut b = ModelBuilder::new(4);
        b.add_action_str(0, &[(1, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        b.add_action_str(3, &[(0, "q"), (2, "1-q")]).unwrap();
        b.initial(3);
        b.build().unwrap()
    }

    fn point(p: f64, q: f64) -> BTreeMap<String, f64> {
        [("p".to_string(), p), ("q".to_string(), q)].into_iter().collect()
    }

    #[test]
    fn test_values_at() {
        let model = chain();
        let property = Property::eventually(BitSet::from_indices(4, [1]));
        let sampler = Sampler::new(&model, &property, 1000, 1e-9).unwrap();
        let values = sampler.values_at(&point(0.3, 0.5));
        assert_eq!(values[1], 1.0);
        assert_eq!(values[2], 0.0);
        assert!((values[0] - 0.3).abs() < 1e-9);
        assert!((values[3] - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_cycle_converges() {
        // 0 -> 0 (1/2), 1 (1/4), 2 (1/4): value 1/2
        let mut b = ModelBuilder::new(3);
        b.add_action_str(0, &[(0, "1/2"), (1, "1/4"), (2, "1/4")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        let model = b.build().unwrap();
        let property = Property::eventually(BitSet::from_indices(3, [1]));
        let sampler = Sampler::new(&model, &property, 10_000, 1e-12).unwrap();
        let values = sampler.values_at(&BTreeMap::new());
        assert!((values[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mdp_direction() {
        let mut b = ModelBuilder::new(3);
        b.add_action_str(0, &[(1, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(0, &[(1, "1/2"), (2, "1/2")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        let model = b.build().unwrap();
        let goal = BitSet::from_indices(3, [1]);
        let at = [("p".to_string(), 0.8)].into_iter().collect();

        let max = Property::eventually(goal.clone()).maximize();
        let values = Sampler::new(&model, &max, 100, 1e-9).unwrap().values_at(&at);
        assert!((values[0] - 0.8).abs() < 1e-9);

        let min = Property::eventually(goal).minimize();
        let values = Sampler::new(&model, &min, 100, 1e-9).unwrap().values_at(&at);
        assert!((values[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_monotonicity_on_samples() {
        let model = chain();
        let property = Property::eventually(BitSet::from_indices(4, [1]));
        let region = Region::parse("0.1<=p<=0.9, 0.1<=q<=0.9").unwrap();
        let sampler = Sampler::new(&model, &property, 1000, 1e-9).unwrap().parallel(true);
        let trends = sampler.monotonicity_on_samples(&region, 5);
        assert_eq!(
            trends["p"],
            SampleTrend {
                increasing: true,
                decreasing: false
            }
        );
        assert!(trends["q"].increasing);
        assert!(sampler.monotonicity_on_samples(&region, 2).is_empty());
        assert_eq!(sampler.diagonal(&region, 3).len(), 3);
    }

    #[test]
    fn test_reward_values() {
        // 0 -> 1 (target) with p, stays with 1-p; reward 1 per step: 1/p
        let mut b = ModelBuilder::new(2);
        b.add_action_str(0, &[(1, "p"), (0, "1-p")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        let model = b.build().unwrap();
        let rewards = vec![crate::polynomial::ratio(1, 1), crate::polynomial::ratio(0, 1)];
        let property = Property::expected_reward(BitSet::from_indices(2, [1]), rewards);
        let sampler = Sampler::new(&model, &property, 100_000, 1e-12).unwrap();
        let values = sampler.values_at(&[("p".to_string(), 0.25)].into_iter().collect());
        assert!((values[0] - 4.0).abs() < 1e-6);
        assert_eq!(values[1], 0.0);
    }
}
