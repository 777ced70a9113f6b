//! Growing an order state by state.
//!
//! [`OrderExtender::extend_order`] pulls states from the work queues of an
//! order and places each one using its successors. A state whose successors
//! cannot be ordered yields an unresolved pair; the assumption maker then
//! proposes relations for the pair, and the caller explores one branch per
//! viable relation. Reachability and reward properties differ only in how a
//! state is placed relative to its sorted successors, see [`ExtensionHooks`].

use std::collections::BTreeSet;

use log::{debug, info, trace, warn};

use crate::assumption::{Assumption, AssumptionKind, AssumptionMaker, AssumptionStatus};
use crate::bitset::BitSet;
use crate::checker::AssumptionChecker;
use crate::config::AnalysisConfig;
use crate::encoding::Encoder;
use crate::error::Result;
use crate::graph::{sccs, topological_sequence, trivial_states};
use crate::model::ParametricModel;
use crate::monotonicity::{MonotonicityChecker, MonotonicityResult};
use crate::order::Order;
use crate::property::Property;
use crate::region::Region;
use crate::smt::DecisionProcedure;
use crate::types::{Comparison, State};

mod mdp;
mod reachability;
mod reward;

pub use mdp::{ActionChoice, ActionSelector};
pub use reachability::ReachabilityHooks;
pub use reward::RewardHooks;

/// Outcome of [`OrderExtender::extend_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    /// Every state is placed.
    Complete,
    /// `state` needs one of the `hypotheses` about `pair` to continue.
    Branch {
        state: State,
        pair: (State, State),
        hypotheses: Vec<Assumption>,
    },
    /// No further progress is possible; the order is partial.
    Halted { state: Option<State>, reason: String },
    /// An assumption collapsed top and bottom.
    Inconsistent,
}

/// Placement rules that differ between property kinds.
pub trait ExtensionHooks: Send + Sync {
    /// Places `state` whose only successor besides itself is the placed `successor`.
    fn handle_one_successor(&self, order: &mut Order, state: State, successor: State);

    /// Places `state` given its successors sorted from highest to lowest.
    fn place_sorted(&self, order: &mut Order, state: State, sorted: &[State]);

    /// Whether `state` may be compared with its successors directly.
    fn allows_forward_reasoning(&self, _state: State) -> bool {
        true
    }
}

pub struct OrderExtender<'a> {
    model: &'a ParametricModel,
    config: AnalysisConfig,
    hooks: Box<dyn ExtensionHooks + 'a>,
    maker: AssumptionMaker<'a>,
    monotonicity: MonotonicityChecker<'a>,
    selector: Option<ActionSelector<'a>>,
    bottom: BitSet,
    top: Option<BitSet>,
    trivial: BitSet,
    sequence: Vec<State>,
}

impl<'a> OrderExtender<'a> {
    pub fn new(
        model: &'a ParametricModel,
        property: &'a Property,
        region: &Region,
        solver: &'a dyn DecisionProcedure,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let (bottom, top) = property.bottom_top_states(model)?;
        let components = sccs(model);
        let trivial = trivial_states(model.num_states(), &components);
        let sequence = topological_sequence(&components);
        debug!(
            "{} SCC(s), {} trivial state(s) out of {}",
            components.len(),
            trivial.count_ones(),
            model.num_states()
        );

        let hooks: Box<dyn ExtensionHooks + 'a> = if property.is_reward() {
            let rewards = (0..model.num_states()).map(|s| property.reward(s)).collect();
            Box::new(RewardHooks::new(rewards))
        } else {
            Box::new(ReachabilityHooks)
        };
        let encoder = Encoder::new(model, property, region, solver);
        let selector = match property.direction() {
            Some(direction) if !model.is_deterministic() => Some(ActionSelector::new(encoder.clone(), direction)),
            _ => None,
        };
        let checker = AssumptionChecker::new(model, property, region, solver, config)?;

        Ok(Self {
            model,
            config: config.clone(),
            hooks,
            maker: AssumptionMaker::new(checker),
            monotonicity: MonotonicityChecker::new(encoder),
            selector,
            bottom,
            top,
            trivial,
            sequence,
        })
    }

    pub fn model(&self) -> &'a ParametricModel {
        self.model
    }

    /// The order holding only the top and bottom states.
    pub fn initial_order(&self) -> Order {
        Order::new(
            self.model.num_states(),
            self.top.as_ref(),
            &self.bottom,
            self.trivial.clone(),
            self.sequence.clone(),
        )
    }

    pub fn initial_monotonicity(&self) -> MonotonicityResult {
        MonotonicityResult::new(self.model.parameters())
    }

    /// Extends `order` until it is complete or needs an assumption.
    ///
    /// `assumption` is applied first. Local monotonicity of every finished
    /// state is folded into `monotonicity`, which is finalized on completion.
    pub fn extend_order(
        &self,
        order: &mut Order,
        monotonicity: &mut MonotonicityResult,
        assumption: Option<&Assumption>,
    ) -> Extension {
        if let Some(assumption) = assumption {
            debug!("applying assumption {}", assumption);
            self.apply_assumption(order, assumption);
        }

        while let Some((state, from_sorted)) = order.next_state() {
            if order.is_inconsistent() {
                return Extension::Inconsistent;
            }
            if order.is_done(state) {
                continue;
            }
            trace!("handling state {} (from fallback: {})", state, from_sorted);

            let (s1, s2) = match self.place_state(order, state) {
                Ok(()) => {
                    self.finish_state(order, monotonicity, state);
                    continue;
                }
                Err(pair) => pair,
            };
            debug!("state {}: cannot order {} and {}", state, s1, s2);

            if order.compare(s1, s2) == Comparison::Unknown {
                let candidates = self.maker.create_and_check(s1, s2, order);
                if let [(assumption, AssumptionStatus::Valid)] = candidates.as_slice() {
                    debug!("assumption {} holds, applying it", assumption);
                    self.apply_assumption(order, assumption);
                    if order.is_inconsistent() {
                        return Extension::Inconsistent;
                    }
                    order.add_special_state_to_handle(state);
                    continue;
                }
                let hypotheses: Vec<Assumption> = candidates
                    .into_iter()
                    .filter(|(_, status)| *status != AssumptionStatus::Invalid)
                    .map(|(assumption, _)| assumption)
                    .collect();
                if !hypotheses.is_empty() {
                    order.add_state_sorted(state);
                    return Extension::Branch {
                        state,
                        pair: (s1, s2),
                        hypotheses,
                    };
                }
            }

            if !self.model.is_parametric_state(state) {
                debug!("placing non-parametric state {} between top and bottom", state);
                if !order.contains(state) {
                    order.add(state);
                }
                self.finish_state(order, monotonicity, state);
            } else if !from_sorted {
                trace!("skipping state {} for now", state);
            } else if order.mark_requeued(state) {
                debug!("re-queueing state {}", state);
                order.requeue_sorted(state);
            } else {
                order.add_state_sorted(state);
                warn!("state {} cannot be placed, halting", state);
                return Extension::Halted {
                    state: Some(state),
                    reason: format!("cannot order {} and {}", s1, s2),
                };
            }
        }

        if order.is_inconsistent() {
            return Extension::Inconsistent;
        }
        if !order.is_done_building() {
            warn!(
                "queues exhausted with {} of {} states sufficient",
                order.number_of_sufficient_states(),
                order.num_states()
            );
            return Extension::Halted {
                state: None,
                reason: "unplaced states remain".to_string(),
            };
        }
        monotonicity.set_done();
        info!("order complete with {} state(s)", order.number_of_added_states());
        Extension::Complete
    }

    /// Places one state; returns the pair blocking it.
    fn place_state(&self, order: &mut Order, state: State) -> std::result::Result<(), (State, State)> {
        let action = match &self.selector {
            Some(selector) if !order.is_action_set(state) => match selector.select(order, state) {
                ActionChoice::Chosen(action) | ActionChoice::Default(action) => {
                    order.set_action(state, action);
                    action
                }
                ActionChoice::Unordered(s1, s2) => return Err((s1, s2)),
            },
            _ => order.action_at(state),
        };

        let successors: Vec<State> = self
            .model
            .action_successors(state, action)
            .into_iter()
            .filter(|&s| s != state)
            .collect();

        match successors.as_slice() {
            [] => {
                if !order.contains(state) {
                    order.add(state);
                }
                Ok(())
            }
            &[successor] => {
                if !order.contains(successor) {
                    order.add(successor);
                }
                self.hooks.handle_one_successor(order, state, successor);
                Ok(())
            }
            _ => {
                let forward = !order.is_trivial(state) && self.hooks.allows_forward_reasoning(state);
                if order.is_only_initial() && !order.contains(state) {
                    order.add(state);
                }
                if forward && order.contains(state) {
                    match reachability::forward_reasoning(self.model, order, state, action, &successors) {
                        Ok(()) => return Ok(()),
                        Err(pair) => trace!("forward reasoning on {} stopped at {:?}", state, pair),
                    }
                }
                reachability::backward_reasoning(self.hooks.as_ref(), order, state, &successors)
            }
        }
    }

    /// Marks a placed state as finished and schedules predecessors that became ready.
    fn finish_state(&self, order: &mut Order, monotonicity: &mut MonotonicityResult, state: State) {
        if self.config.check_monotonicity {
            let action = order.action_at(state);
            for parameter in self.model.parameters_at(state) {
                let local = self.monotonicity.local(order, state, action, &parameter);
                monotonicity.update(&parameter, local);
            }
        }
        order.set_sufficient(state);
        order.set_done(state);

        for &pred in self.model.predecessors(state) {
            if pred == state || order.is_sufficient(pred) {
                continue;
            }
            let successors: BTreeSet<State> = if order.is_action_set(pred) {
                self.model.action_successors(pred, order.action_at(pred))
            } else {
                self.model.successors(pred)
            };
            if successors.iter().all(|&s| s == pred || order.is_sufficient(s)) {
                order.add_state_to_handle(pred);
            }
        }
    }

    /// Records an assumption in the order and schedules both states.
    pub fn apply_assumption(&self, order: &mut Order, assumption: &Assumption) {
        let assumption = assumption.normalized();
        let (lhs, rhs) = (assumption.lhs, assumption.rhs);
        match assumption.kind {
            AssumptionKind::Equal => match (order.contains(lhs), order.contains(rhs)) {
                (true, true) => {
                    order.merge(lhs, rhs);
                }
                (true, false) => order.add_to_node(rhs, order.node_of(lhs)),
                (false, true) => order.add_to_node(lhs, order.node_of(rhs)),
                (false, false) => {
                    order.add(lhs);
                    order.add_to_node(rhs, order.node_of(lhs));
                }
            },
            AssumptionKind::Greater | AssumptionKind::Less => {
                let (above, below) = (lhs, rhs);
                match (order.contains(above), order.contains(below)) {
                    (true, true) => order.add_relation(above, below),
                    (false, true) => match order.top() {
                        Some(top) => order.add_between(above, top, order.node_of(below)),
                        None => order.add_above(above, order.node_of(below)),
                    },
                    (true, false) => order.add_between(below, order.node_of(above), order.bottom()),
                    (false, false) => {
                        order.add(above);
                        order.add_between(below, order.node_of(above), order.bottom());
                    }
                }
            }
        }
        for state in [lhs, rhs] {
            if !order.is_done(state) {
                order.add_special_state_to_handle(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::model::ModelBuilder;
    use crate::monotonicity::Monotonicity;
    use crate::smt::tests::MockSolver;
    use crate::solver::IntervalSolver;

    /// 1 -> 0 (p), 2 (1-p); goal 0, sink 2
    fn chain() -> (ParametricModel, Property) {
        let mut b = ModelBuilder::new(3);
        b.add_action_str(0, &[(0, "1")]).unwrap();
        b.add_action_str(1, &[(0, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        b.initial(1);
        (b.build().unwrap(), Property::eventually(BitSet::from_indices(3, [0])))
    }

    #[test]
    fn test_single_state_between_extremes() {
        let (model, property) = chain();
        let region = Region::parse("0.1<=p<=0.9").unwrap();
        let solver = IntervalSolver::default();
        let extender = OrderExtender::new(&model, &property, &region, &solver, &AnalysisConfig::default()).unwrap();

        let mut order = extender.initial_order();
        let mut monotonicity = extender.initial_monotonicity();
        assert_eq!(extender.extend_order(&mut order, &mut monotonicity, None), Extension::Complete);
        assert_eq!(order.compare(0, 1), Comparison::Above);
        assert_eq!(order.compare(1, 2), Comparison::Above);
        assert_eq!(monotonicity.get("p"), Monotonicity::Incr);
    }

    /// 3 -> 1 (1/2), 2 (1/2) where 1 and 2 are only comparable through `p` and `q`.
    fn unresolved() -> (ParametricModel, Property) {
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
    fn test_valid_assumption_applied_in_place() {
        let (model, property) = unresolved();
        let region = Region::parse("0.6<=p<=0.9, 0.1<=q<=0.4").unwrap();
        let solver = IntervalSolver::default();
        let extender = OrderExtender::new(&model, &property, &region, &solver, &AnalysisConfig::default()).unwrap();

        let mut order = extender.initial_order();
        let mut monotonicity = extender.initial_monotonicity();
        assert_eq!(extender.extend_order(&mut order, &mut monotonicity, None), Extension::Complete);
        assert_eq!(order.compare(1, 2), Comparison::Above);
        assert_eq!(order.compare(1, 3), Comparison::Above);
        assert_eq!(order.compare(3, 2), Comparison::Above);
    }

    #[test]
    fn test_branch_on_undecided_pair() {
        let (model, property) = unresolved();
        let region = Region::parse("0.1<=p<=0.9, 0.1<=q<=0.9").unwrap();
        let solver = MockSolver::new(Vec::new());
        let extender = OrderExtender::new(&model, &property, &region, &solver, &AnalysisConfig::default()).unwrap();

        let mut order = extender.initial_order();
        let mut monotonicity = extender.initial_monotonicity();
        let Extension::Branch { state, pair, hypotheses } = extender.extend_order(&mut order, &mut monotonicity, None)
        else {
            panic!("expected a branch");
        };
        assert_eq!(state, 3);
        assert_eq!(hypotheses.len(), 3);
        assert!(hypotheses.iter().all(|h| (h.lhs, h.rhs) == pair));

        let mut branch = order.clone();
        let mut branch_monotonicity = monotonicity.clone();
        let outcome = extender.extend_order(&mut branch, &mut branch_monotonicity, Some(&hypotheses[0]));
        assert_eq!(outcome, Extension::Complete);
        assert_eq!(branch.compare(pair.0, pair.1), Comparison::Above);
        assert!(branch.is_done_building());
    }

    #[test]
    fn test_apply_assumption() {
        let (model, property) = unresolved();
        let region = Region::parse("0.1<=p<=0.9, 0.1<=q<=0.9").unwrap();
        let solver = MockSolver::new(Vec::new());
        let extender = OrderExtender::new(&model, &property, &region, &solver, &AnalysisConfig::default()).unwrap();

        let mut order = extender.initial_order();
        extender.apply_assumption(&mut order, &Assumption::less(2, 1));
        assert_eq!(order.compare(1, 2), Comparison::Above);
        assert_eq!(order.compare(0, 1), Comparison::Above);
        assert_eq!(order.compare(2, 4), Comparison::Above);

        let mut order = extender.initial_order();
        extender.apply_assumption(&mut order, &Assumption::equal(1, 2));
        assert_eq!(order.compare(1, 2), Comparison::Same);

        let mut order = extender.initial_order();
        extender.apply_assumption(&mut order, &Assumption::equal(0, 4));
        assert!(order.is_inconsistent());
    }
}
