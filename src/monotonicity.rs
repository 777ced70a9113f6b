//! Monotonicity verdicts derived from orders.
//!
//! The value of a state is monotone increasing in a parameter if every state
//! locally increases: with successors sorted from highest to lowest, the
//! derivative of the one-step equation is
//!
//! ```text
//! sum_j (sum_{i <= j} dw_i/dp) * (v_j - v_{j+1})  +  d/dp r/(1 - w_s)
//! ```
//!
//! and every gap `v_j - v_{j+1}` is non-negative, so the signs of the prefix
//! sums decide.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, trace, warn};

use crate::encoding::Encoder;
use crate::function::RationalFunction;
use crate::order::Order;
use crate::sampling::SampleTrend;
use crate::smt::Relation;
use crate::types::{Comparison, State};

/// Monotonicity of a value in one parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Monotonicity {
    Incr,
    Decr,
    /// Independent of the parameter.
    Constant,
    /// Shown to be neither increasing nor decreasing.
    Not,
    Unknown,
}

impl Monotonicity {
    /// The verdict for a value built from two parts with these verdicts.
    pub fn combine(self, other: Monotonicity) -> Monotonicity {
        use Monotonicity::*;
        match (self, other) {
            (Not, _) | (_, Not) => Not,
            (Unknown, _) | (_, Unknown) => Unknown,
            (Constant, m) | (m, Constant) => m,
            (Incr, Incr) => Incr,
            (Decr, Decr) => Decr,
            (Incr, Decr) | (Decr, Incr) => Unknown,
        }
    }

    pub fn is_monotone(self) -> bool {
        matches!(self, Monotonicity::Incr | Monotonicity::Decr | Monotonicity::Constant)
    }
}

impl fmt::Display for Monotonicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Monotonicity::Incr => "increasing",
            Monotonicity::Decr => "decreasing",
            Monotonicity::Constant => "constant",
            Monotonicity::Not => "not monotone",
            Monotonicity::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Per-parameter verdicts of one branch.
///
/// Local verdicts are folded in while the order grows; they describe the
/// property value only once the order is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonotonicityResult {
    results: BTreeMap<String, Monotonicity>,
    done: bool,
}

impl MonotonicityResult {
    pub fn new(parameters: &BTreeSet<String>) -> Self {
        Self {
            results: parameters.iter().map(|p| (p.clone(), Monotonicity::Constant)).collect(),
            done: false,
        }
    }

    /// Folds a local verdict into the verdict of `parameter`.
    ///
    /// # Panics
    ///
    /// Panics if the result was already finalized.
    pub fn update(&mut self, parameter: &str, local: Monotonicity) {
        assert!(!self.done, "Cannot update a finalized monotonicity result");
        let entry = self.results.entry(parameter.to_string()).or_insert(Monotonicity::Constant);
        *entry = entry.combine(local);
    }

    /// Finalizes the result.
    pub fn set_done(&mut self) {
        self.done = true;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The verdict for `parameter`; `Unknown` until finalized unless refuted.
    pub fn get(&self, parameter: &str) -> Monotonicity {
        match self.results.get(parameter) {
            Some(Monotonicity::Not) => Monotonicity::Not,
            Some(&m) if self.done => m,
            _ => Monotonicity::Unknown,
        }
    }

    pub fn results(&self) -> &BTreeMap<String, Monotonicity> {
        &self.results
    }

    /// Marks `parameter` as not monotone if the samples move both ways.
    pub fn refute_with_samples(&mut self, parameter: &str, trend: SampleTrend) {
        let Some(entry) = self.results.get_mut(parameter) else {
            return;
        };
        match (*entry, trend.increasing, trend.decreasing) {
            (_, false, false) => {
                debug!("samples show {} is not monotone", parameter);
                *entry = Monotonicity::Not;
            }
            (Monotonicity::Incr, false, _) | (Monotonicity::Decr, _, false) => {
                warn!("samples along {} disagree with the derived verdict {}", parameter, entry);
            }
            _ => {}
        }
    }
}

impl fmt::Display for MonotonicityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, parameter) in self.results.keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", parameter, self.get(parameter))?;
        }
        Ok(())
    }
}

/// Local monotonicity of a state's one-step equation.
#[derive(Debug, Clone)]
pub struct MonotonicityChecker<'a> {
    encoder: Encoder<'a>,
}

impl<'a> MonotonicityChecker<'a> {
    pub fn new(encoder: Encoder<'a>) -> Self {
        Self { encoder }
    }

    /// Monotonicity of the value of `state` under `action` in `parameter`,
    /// assuming every successor value is monotone the same way.
    pub fn local(&self, order: &mut Order, state: State, action: usize, parameter: &str) -> Monotonicity {
        let model = self.encoder.model();
        let transitions = model.transitions(state, action);
        let stay = transitions
            .iter()
            .find(|t| t.target == state)
            .map_or_else(RationalFunction::zero, |t| t.weight.clone());
        let reward = RationalFunction::constant(self.encoder.property().reward(state));
        let depends = stay.variables().contains(parameter)
            || transitions.iter().any(|t| t.weight.variables().contains(parameter));
        if !depends {
            return Monotonicity::Constant;
        }
        let Some(leave) = (&RationalFunction::one() - &stay).recip() else {
            return Monotonicity::Unknown;
        };

        let successors: Vec<State> = model
            .action_successors(state, action)
            .into_iter()
            .filter(|&t| t != state)
            .collect();
        let sorted = order.sort_states(&successors);
        if !sorted.is_complete() {
            trace!("successors of {} are not ordered", state);
            return Monotonicity::Unknown;
        }

        let mut terms = Vec::new();
        let mut prefix = RationalFunction::zero();
        for (i, &succ) in sorted.states.iter().enumerate() {
            let weight = model.weight(state, action, succ);
            prefix = &prefix + &(&weight * &leave).derivative(parameter);
            if let Some(&next) = sorted.states.get(i + 1) {
                if order.compare(succ, next) != Comparison::Same {
                    terms.push(prefix.clone());
                }
            }
        }
        if !reward.is_zero() {
            terms.push((&reward * &leave).derivative(parameter));
        }

        let result = self.sign_of_terms(&terms);
        trace!("state {} is locally {} in {}", state, result, parameter);
        result
    }

    fn sign_of_terms(&self, terms: &[RationalFunction]) -> Monotonicity {
        if terms.iter().all(|t| t.is_zero()) {
            return Monotonicity::Constant;
        }
        let products: Vec<_> = terms
            .iter()
            .filter(|t| !t.is_zero())
            .map(|t| t.numerator() * t.denominator())
            .collect();
        if products.iter().all(|p| self.encoder.holds_everywhere(p, Relation::Ge)) {
            Monotonicity::Incr
        } else if products.iter().all(|p| self.encoder.holds_everywhere(p, Relation::Le)) {
            Monotonicity::Decr
        } else {
            Monotonicity::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bitset::BitSet;
    use crate::model::{ModelBuilder, ParametricModel};
    use crate::property::Property;
    use crate::region::Region;
    use crate::solver::IntervalSolver;

    fn params(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_combine() {
        use Monotonicity::*;
        assert_eq!(Constant.combine(Incr), Incr);
        assert_eq!(Incr.combine(Incr), Incr);
        assert_eq!(Incr.combine(Decr), Unknown);
        assert_eq!(Unknown.combine(Decr), Unknown);
        assert_eq!(Not.combine(Unknown), Not);
        assert_eq!(Decr.combine(Constant), Decr);
    }

    #[test]
    fn test_result_lifecycle() {
        let mut result = MonotonicityResult::new(&params(&["p", "q"]));
        result.update("p", Monotonicity::Incr);
        assert_eq!(result.get("p"), Monotonicity::Unknown);
        result.set_done();
        assert_eq!(result.get("p"), Monotonicity::Incr);
        assert_eq!(result.get("q"), Monotonicity::Constant);
        assert_eq!(result.to_string(), "p: increasing, q: constant");
    }

    #[test]
    fn test_refute_with_samples() {
        let mut result = MonotonicityResult::new(&params(&["p"]));
        result.refute_with_samples(
            "p",
            SampleTrend {
                increasing: false,
                decreasing: false,
            },
        );
        assert_eq!(result.get("p"), Monotonicity::Not);
    }

    /// 1 -> 0 (p), 2 (1-p) with goal 0 and sink 2; 3 -> 2 (p), 0 (1-p)
    fn model() -> ParametricModel {
        let mut b = ModelBuilder::new(4);
        b.add_action_str(0, &[(0, "1")]).unwrap();
        b.add_action_str(1, &[(0, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        b.add_action_str(3, &[(2, "p"), (0, "1-p")]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_local_reachability() {
        let model = model();
        let property = Property::eventually(BitSet::from_indices(4, [0]));
        let region = Region::parse("0.1<=p<=0.9").unwrap();
        let solver = IntervalSolver::default();
        let checker = MonotonicityChecker::new(Encoder::new(&model, &property, &region, &solver));

        let mut order = Order::with_extremes(4, &[0], &[2]);
        assert_eq!(checker.local(&mut order, 1, 0, "p"), Monotonicity::Incr);
        assert_eq!(checker.local(&mut order, 3, 0, "p"), Monotonicity::Decr);
        assert_eq!(checker.local(&mut order, 0, 0, "p"), Monotonicity::Constant);
    }

    #[test]
    fn test_local_reward() {
        // expected steps 1/p until leaving 0
        let mut b = ModelBuilder::new(2);
        b.add_action_str(0, &[(0, "1-p"), (1, "p")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        let model = b.build().unwrap();
        let rewards = vec![crate::polynomial::ratio(1, 1), crate::polynomial::ratio(0, 1)];
        let property = Property::expected_reward(BitSet::from_indices(2, [1]), rewards);
        let region = Region::parse("0.1<=p<=0.9").unwrap();
        let solver = IntervalSolver::default();
        let checker = MonotonicityChecker::new(Encoder::new(&model, &property, &region, &solver));

        let bottom = BitSet::from_indices(2, [1]);
        let mut order = Order::new(2, None, &bottom, BitSet::full(2), Vec::new());
        assert_eq!(checker.local(&mut order, 0, 0, "p"), Monotonicity::Decr);
    }

    #[test]
    fn test_unordered_successors() {
        let mut b = ModelBuilder::new(5);
        b.add_action_str(0, &[(0, "1")]).unwrap();
        b.add_action_str(1, &[(2, "p"), (3, "1-p")]).unwrap();
        b.add_action_str(2, &[(0, "1/2"), (4, "1/2")]).unwrap();
        b.add_action_str(3, &[(0, "1/3"), (4, "2/3")]).unwrap();
        b.add_action_str(4, &[(4, "1")]).unwrap();
        let model = b.build().unwrap();
        let property = Property::eventually(BitSet::from_indices(5, [0]));
        let region = Region::parse("0.1<=p<=0.9").unwrap();
        let solver = IntervalSolver::default();
        let checker = MonotonicityChecker::new(Encoder::new(&model, &property, &region, &solver));

        let mut order = Order::with_extremes(5, &[0], &[4]);
        order.add(2);
        order.add(3);
        assert_eq!(checker.local(&mut order, 1, 0, "p"), Monotonicity::Unknown);
        order.add_relation(2, 3);
        assert_eq!(checker.local(&mut order, 1, 0, "p"), Monotonicity::Incr);
    }
}
