//! Symbolic encoding of state values.
//!
//! Deciding a relation between two states means comparing their one-step
//! equations `v(s) = (r(s) + sum w(s, t) * v(t)) / (1 - w(s, s))` over the
//! parameter region, where the successor values `v(t)` are unknown but
//! constrained by the order.
//!
//! When the successors are totally ordered, their values are written with
//! additive gap variables, so that differences of weighted sums cancel to
//! products such as `(p - q) * $d3`, whose sign interval arithmetic can decide:
//!
//! - reachability: `v = 1 - d1 - ... - dj` from the top down, `d in (0, 1)`,
//!   with the lowest value kept positive;
//! - rewards: `v = dk + ... + dj` from the bottom up, `d in (0, inf)`.
//!
//! Otherwise every class gets an independent value variable and the known
//! relations become atoms of the query. Top is 1 and bottom is 0; distinct
//! classes are treated as strictly ordered.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::trace;
use num_rational::BigRational;
use num_traits::Zero;

use crate::function::RationalFunction;
use crate::interval::Interval;
use crate::model::ParametricModel;
use crate::order::Order;
use crate::polynomial::Polynomial;
use crate::property::Property;
use crate::region::Region;
use crate::smt::{DecisionProcedure, Formula, Query, Relation, SatResult};
use crate::types::{Comparison, State};

/// Symbolic values of a set of states together with the constraints on them.
#[derive(Debug, Clone, Default)]
pub struct SymbolicValues {
    values: BTreeMap<State, Polynomial>,
    fixed: BTreeSet<State>,
    domains: BTreeMap<String, Interval>,
    constraints: Vec<Formula>,
}

impl SymbolicValues {
    /// The value of an encoded state.
    pub fn value(&self, state: State) -> Option<&Polynomial> {
        self.values.get(&state)
    }

    /// True for top and bottom states, whose value is a constant.
    pub fn is_fixed(&self, state: State) -> bool {
        self.fixed.contains(&state)
    }

    pub fn domains(&self) -> &BTreeMap<String, Interval> {
        &self.domains
    }

    pub fn constraints(&self) -> &[Formula] {
        &self.constraints
    }

    fn set(&mut self, state: State, value: Polynomial) {
        self.values.insert(state, value);
    }

    fn fix(&mut self, state: State, value: i64) {
        self.fixed.insert(state);
        self.values.insert(state, Polynomial::from_int(value));
    }
}

/// Builds symbolic values from an order and decides queries over them.
#[derive(Clone)]
pub struct Encoder<'a> {
    model: &'a ParametricModel,
    property: &'a Property,
    solver: &'a dyn DecisionProcedure,
    parameters: BTreeMap<String, Interval>,
}

impl std::fmt::Debug for Encoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder").field("parameters", &self.parameters).finish_non_exhaustive()
    }
}

impl<'a> Encoder<'a> {
    pub fn new(model: &'a ParametricModel, property: &'a Property, region: &Region, solver: &'a dyn DecisionProcedure) -> Self {
        Self {
            model,
            property,
            solver,
            parameters: region.domains(),
        }
    }

    pub fn model(&self) -> &'a ParametricModel {
        self.model
    }

    pub fn property(&self) -> &'a Property {
        self.property
    }

    /// Encodes the values of `states` as constrained by the order.
    ///
    /// Returns `None` if a state with infinite expected reward is involved.
    pub fn encode(&self, order: &mut Order, states: &BTreeSet<State>) -> Option<SymbolicValues> {
        let states: Vec<State> = states.iter().copied().collect();
        let sorted = order.sort_states(&states);
        let mut values = SymbolicValues::default();
        if sorted.is_complete() {
            self.encode_chain(order, &sorted.states, &mut values)?;
        } else {
            self.encode_classes(order, &states, &mut values)?;
        }
        trace!("encoded {} state(s) with {} constraint(s)", states.len(), values.constraints.len());
        Some(values)
    }

    /// Fixes the sentinels; returns false for an infinite-reward state.
    fn encode_sentinel(&self, order: &Order, state: State, values: &mut SymbolicValues) -> Option<bool> {
        if order.is_bottom_state(state) {
            values.fix(state, 0);
            Some(true)
        } else if order.is_top_state(state) {
            if self.property.is_reward() {
                return None;
            }
            values.fix(state, 1);
            Some(true)
        } else {
            Some(false)
        }
    }

    fn value_domain(&self) -> Interval {
        if self.property.is_reward() {
            Interval::positive()
        } else {
            Interval::unit_open()
        }
    }

    fn encode_chain(&self, order: &mut Order, sorted: &[State], values: &mut SymbolicValues) -> Option<()> {
        // Levels of equal states, highest first.
        let mut levels: Vec<Vec<State>> = Vec::new();
        for &s in sorted {
            let same = levels.last().is_some_and(|level| order.compare(level[0], s) == Comparison::Same);
            match levels.last_mut() {
                Some(level) if same => level.push(s),
                _ => levels.push(vec![s]),
            }
        }

        let mut interior = Vec::new();
        for level in levels {
            let mut sentinel = false;
            for &s in &level {
                sentinel |= self.encode_sentinel(order, s, values)?;
            }
            if !sentinel {
                interior.push(level);
            }
        }

        let gap = |level: &[State]| format!("$d{}", level[0]);
        if self.property.is_reward() {
            let mut acc = Polynomial::zero();
            for level in interior.iter().rev() {
                let name = gap(level);
                values.domains.insert(name.clone(), Interval::positive());
                acc = &acc + &Polynomial::var(&name);
                for &s in level {
                    values.set(s, acc.clone());
                }
            }
        } else {
            let mut acc = Polynomial::one();
            for level in &interior {
                let name = gap(level);
                values.domains.insert(name.clone(), Interval::unit_open());
                acc = &acc - &Polynomial::var(&name);
                for &s in level {
                    values.set(s, acc.clone());
                }
            }
            if !interior.is_empty() {
                values
                    .constraints
                    .push(Formula::atom(&acc, Relation::Gt, &Polynomial::zero()));
            }
        }
        Some(())
    }

    fn encode_classes(&self, order: &mut Order, states: &[State], values: &mut SymbolicValues) -> Option<()> {
        let mut free = Vec::new();
        for &s in states {
            if !self.encode_sentinel(order, s, values)? {
                let name = match order.try_node_of(s) {
                    Some(node) => format!("$v{}", order.node(node).representative()),
                    None => format!("$v{}", s),
                };
                values.domains.insert(name.clone(), self.value_domain());
                values.set(s, Polynomial::var(&name));
                free.push(s);
            }
        }
        for (i, &a) in free.iter().enumerate() {
            for &b in &free[i + 1..] {
                let relation = match order.compare(a, b) {
                    Comparison::Above => Relation::Gt,
                    Comparison::Below => Relation::Lt,
                    Comparison::Same | Comparison::Unknown => continue,
                };
                let (va, vb) = (&values.values[&a], &values.values[&b]);
                let atom = Formula::atom(va, relation, vb);
                values.constraints.push(atom);
            }
        }
        Some(())
    }

    /// The one-step value function of `state` under `action`.
    ///
    /// Returns `None` if a successor is not encoded.
    pub fn state_function(&self, values: &SymbolicValues, state: State, action: usize) -> Option<RationalFunction> {
        if values.is_fixed(state) {
            return values.value(state).map(|v| RationalFunction::from(v.clone()));
        }
        let mut stay = RationalFunction::zero();
        let mut sum = RationalFunction::constant(self.property.reward(state));
        for t in self.model.transitions(state, action) {
            if t.target == state {
                stay = t.weight.clone();
                continue;
            }
            let v = RationalFunction::from(values.value(t.target)?.clone());
            sum = &sum + &(&t.weight * &v);
        }
        if stay.is_zero() {
            Some(sum)
        } else {
            let leave = &RationalFunction::one() - &stay;
            Some(&sum * &leave.recip()?)
        }
    }

    /// A polynomial with the sign of `f1 - f2` everywhere in the region.
    ///
    /// Returns `None` if the sign of the common denominator cannot be determined.
    pub fn difference(&self, f1: &RationalFunction, f2: &RationalFunction) -> Option<Polynomial> {
        let diff = &(f1.numerator() * f2.denominator()) - &(f2.numerator() * f1.denominator());
        let den = f1.denominator() * f2.denominator();
        match self.sign(&den)? {
            Ordering::Greater => Some(diff),
            Ordering::Less => Some(-diff),
            Ordering::Equal => None,
        }
    }

    /// Strict sign of a parameter polynomial over the whole region.
    pub fn sign(&self, poly: &Polynomial) -> Option<Ordering> {
        if let Some(c) = poly.constant_value() {
            return Some(c.cmp(&BigRational::zero()));
        }
        if self.holds_everywhere(poly, Relation::Gt) {
            Some(Ordering::Greater)
        } else if self.holds_everywhere(poly, Relation::Lt) {
            Some(Ordering::Less)
        } else {
            None
        }
    }

    /// True if `poly ⋈ 0` holds at every point of the region.
    pub fn holds_everywhere(&self, poly: &Polynomial, relation: Relation) -> bool {
        self.check(None, Formula::atom(poly, relation.negate(), &Polynomial::zero()))
            .is_unsat()
    }

    /// True if `poly ⋈ 0` holds for all parameters and values allowed by `values`.
    pub fn proves(&self, values: &SymbolicValues, poly: &Polynomial, relation: Relation) -> bool {
        self.check(Some(values), Formula::atom(poly, relation.negate(), &Polynomial::zero()))
            .is_unsat()
    }

    /// Satisfiability of `formula` together with the constraints of `values`.
    pub fn check(&self, values: Option<&SymbolicValues>, formula: Formula) -> SatResult {
        let mut domains = self.parameters.clone();
        let mut parts = Vec::new();
        if let Some(values) = values {
            domains.extend(values.domains.iter().map(|(k, v)| (k.clone(), v.clone())));
            parts.extend(values.constraints.iter().cloned());
        }
        parts.push(formula);
        let result = self.solver.check(&Query::new(domains, Formula::and(parts)));
        trace!("query result: {:?}", result);
        result
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bitset::BitSet;
    use crate::model::ModelBuilder;
    use crate::solver::IntervalSolver;

    /// 1 and 2 both go to top (0) and bottom (4) with different weights; 3 has a placed successor 1.
    fn model() -> ParametricModel {
        let mut b = ModelBuilder::new(5);
        b.add_action_str(0, &[(0, "1")]).unwrap();
        b.add_action_str(1, &[(0, "p"), (4, "1-p")]).unwrap();
        b.add_action_str(2, &[(0, "q"), (4, "1-q")]).unwrap();
        b.add_action_str(3, &[(1, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(4, &[(4, "1")]).unwrap();
        b.build().unwrap()
    }

    fn property() -> Property {
        Property::eventually(BitSet::from_indices(5, [0]))
    }

    #[test]
    fn test_chain_encoding() {
        let model = model();
        let property = property();
        let region = Region::parse("0.6<=p<=0.9, 0.1<=q<=0.4").unwrap();
        let solver = IntervalSolver::default();
        let encoder = Encoder::new(&model, &property, &region, &solver);

        let mut order = Order::with_extremes(5, &[0], &[4]);
        order.add(1);
        order.add_between_states(2, 1, 4);
        let states: BTreeSet<State> = [0, 1, 2, 4].into_iter().collect();
        let values = encoder.encode(&mut order, &states).unwrap();
        assert_eq!(values.value(0), Some(&Polynomial::one()));
        assert_eq!(values.value(4), Some(&Polynomial::zero()));
        assert_eq!(values.value(1).unwrap().to_string(), "1 - $d1");
        assert!(values.domains().contains_key("$d2"));
        assert_eq!(values.constraints().len(), 1);
    }

    #[test]
    fn test_state_functions_compare() {
        let model = model();
        let property = property();
        let region = Region::parse("0.6<=p<=0.9, 0.1<=q<=0.4").unwrap();
        let solver = IntervalSolver::default();
        let encoder = Encoder::new(&model, &property, &region, &solver);

        let mut order = Order::with_extremes(5, &[0], &[4]);
        let states: BTreeSet<State> = [0, 4].into_iter().collect();
        let values = encoder.encode(&mut order, &states).unwrap();
        let f1 = encoder.state_function(&values, 1, 0).unwrap();
        let f2 = encoder.state_function(&values, 2, 0).unwrap();
        let diff = encoder.difference(&f1, &f2).unwrap();
        assert_eq!(diff.to_string(), "p - q");
        assert!(encoder.proves(&values, &diff, Relation::Gt));
        assert!(encoder.state_function(&values, 3, 0).is_none());
    }

    #[test]
    fn test_class_encoding_for_incomparable_states() {
        let model = model();
        let property = property();
        let region = Region::parse("0.6<=p<=0.9, 0.1<=q<=0.4").unwrap();
        let solver = IntervalSolver::default();
        let encoder = Encoder::new(&model, &property, &region, &solver);

        let mut order = Order::with_extremes(5, &[0], &[4]);
        order.add(1);
        order.add(2);
        order.add(3);
        order.add_relation(1, 3);
        let states: BTreeSet<State> = [1, 2, 3].into_iter().collect();
        let values = encoder.encode(&mut order, &states).unwrap();
        assert_eq!(values.value(1).unwrap().to_string(), "$v1");
        // only 1 > 3 is known
        assert_eq!(values.constraints().len(), 1);
        assert!(encoder.proves(&values, &(values.value(1).unwrap() - values.value(3).unwrap()), Relation::Gt));
    }

    #[test]
    fn test_self_loop_is_normalized() {
        let mut b = ModelBuilder::new(3);
        b.add_action_str(0, &[(0, "1")]).unwrap();
        b.add_action_str(1, &[(1, "1/2"), (0, "p/2"), (2, "(1-p)/2")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        let model = b.build().unwrap();
        let property = Property::eventually(BitSet::from_indices(3, [0]));
        let region = Region::parse("0.1<=p<=0.9").unwrap();
        let solver = IntervalSolver::default();
        let encoder = Encoder::new(&model, &property, &region, &solver);

        let mut order = Order::with_extremes(3, &[0], &[2]);
        let states: BTreeSet<State> = [0, 2].into_iter().collect();
        let values = encoder.encode(&mut order, &states).unwrap();
        let f = encoder.state_function(&values, 1, 0).unwrap();
        assert_eq!(f.to_string(), "p");
    }

    #[test]
    fn test_reward_top_is_not_encodable() {
        let mut b = ModelBuilder::new(3);
        b.add_action_str(0, &[(1, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        let model = b.build().unwrap();
        let rewards = vec![crate::polynomial::ratio(1, 1); 3];
        let property = Property::expected_reward(BitSet::from_indices(3, [1]), rewards);
        let region = Region::parse("0.1<=p<=0.9").unwrap();
        let solver = IntervalSolver::default();
        let encoder = Encoder::new(&model, &property, &region, &solver);

        let (bottom, top) = property.bottom_top_states(&model).unwrap();
        let mut order = Order::new(3, top.as_ref(), &bottom, BitSet::full(3), Vec::new());
        let states: BTreeSet<State> = [1, 2].into_iter().collect();
        assert!(encoder.encode(&mut order, &states).is_none());
        let states: BTreeSet<State> = [1].into_iter().collect();
        assert!(encoder.encode(&mut order, &states).is_some());
    }
}
