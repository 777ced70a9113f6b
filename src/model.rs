//! Parametric Markov models.
//!
//! A model has a fixed number of states. Every state has at least one action
//! (exactly one for a Markov chain) and every action is a distribution over
//! successor states whose weights are [`RationalFunction`]s over the parameters.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use num_traits::One;

use crate::bitset::BitSet;
use crate::error::{AnalysisError, Result};
use crate::function::RationalFunction;
use crate::parse::parse_function;
use crate::types::State;

/// One weighted edge of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: State,
    pub weight: RationalFunction,
}

/// A validated parametric model. Read-only once built.
#[derive(Debug, Clone)]
pub struct ParametricModel {
    choices: Vec<Vec<Vec<Transition>>>,
    predecessors: Vec<Vec<State>>,
    initial: BitSet,
    labels: BTreeMap<String, BitSet>,
    parameters: BTreeSet<String>,
}

impl ParametricModel {
    pub fn num_states(&self) -> usize {
        self.choices.len()
    }

    pub fn num_actions(&self, state: State) -> usize {
        self.choices[state].len()
    }

    /// Transitions of the given action.
    pub fn transitions(&self, state: State, action: usize) -> &[Transition] {
        &self.choices[state][action]
    }

    /// All actions of a state.
    pub fn actions(&self, state: State) -> &[Vec<Transition>] {
        &self.choices[state]
    }

    /// True if every state has exactly one action.
    pub fn is_deterministic(&self) -> bool {
        self.choices.iter().all(|a| a.len() == 1)
    }

    /// Successors over all actions, in increasing order.
    pub fn successors(&self, state: State) -> BTreeSet<State> {
        self.choices[state].iter().flatten().map(|t| t.target).collect()
    }

    /// Successors of one action, in increasing order.
    pub fn action_successors(&self, state: State, action: usize) -> BTreeSet<State> {
        self.choices[state][action].iter().map(|t| t.target).collect()
    }

    /// States with an edge into `state`, without duplicates.
    pub fn predecessors(&self, state: State) -> &[State] {
        &self.predecessors[state]
    }

    pub fn initial_states(&self) -> &BitSet {
        &self.initial
    }

    pub fn label(&self, name: &str) -> Option<&BitSet> {
        self.labels.get(name)
    }

    /// All parameters occurring in some weight.
    pub fn parameters(&self) -> &BTreeSet<String> {
        &self.parameters
    }

    /// Parameters occurring in the outgoing weights of `state`.
    pub fn parameters_at(&self, state: State) -> BTreeSet<String> {
        self.choices[state]
            .iter()
            .flatten()
            .flat_map(|t| t.weight.variables())
            .collect()
    }

    /// True if some outgoing weight of `state` depends on a parameter.
    pub fn is_parametric_state(&self, state: State) -> bool {
        self.choices[state].iter().flatten().any(|t| !t.weight.is_constant())
    }

    /// Weight of the edge `state -> target` under `action` (zero if absent).
    pub fn weight(&self, state: State, action: usize, target: State) -> RationalFunction {
        self.choices[state][action]
            .iter()
            .find(|t| t.target == target)
            .map_or_else(RationalFunction::zero, |t| t.weight.clone())
    }
}

/// Builder for [`ParametricModel`].
///
/// # Examples
///
/// ```
/// use reach_order::model::ModelBuilder;
///
/// let mut builder = ModelBuilder::new(3);
/// builder.add_action_str(0, &[(1, "p"), (2, "1-p")]).unwrap();
/// builder.add_action_str(1, &[(1, "1")]).unwrap();
/// builder.add_action_str(2, &[(2, "1")]).unwrap();
/// builder.initial(0).label("goal", 1);
/// let model = builder.build().unwrap();
/// assert!(model.is_deterministic());
/// assert!(model.is_parametric_state(0));
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    num_states: usize,
    choices: Vec<Vec<Vec<Transition>>>,
    initial: BTreeSet<State>,
    labels: BTreeMap<String, BTreeSet<State>>,
}

impl ModelBuilder {
    pub fn new(num_states: usize) -> Self {
        Self {
            num_states,
            choices: vec![Vec::new(); num_states],
            initial: BTreeSet::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Appends an action to `state`. Edges to the same target are summed.
    ///
    /// # Panics
    ///
    /// Panics if `state` is out of range.
    pub fn add_action(&mut self, state: State, edges: impl IntoIterator<Item = (State, RationalFunction)>) -> &mut Self {
        assert!(state < self.num_states, "State {} out of range", state);
        let mut merged: Vec<Transition> = Vec::new();
        for (target, weight) in edges {
            match merged.iter_mut().find(|t| t.target == target) {
                Some(t) => t.weight = &t.weight + &weight,
                None => merged.push(Transition { target, weight }),
            }
        }
        merged.retain(|t| !t.weight.is_zero());
        self.choices[state].push(merged);
        self
    }

    /// Appends an action whose weights are given as text.
    pub fn add_action_str(&mut self, state: State, edges: &[(State, &str)]) -> Result<&mut Self> {
        let parsed = edges
            .iter()
            .map(|(t, w)| Ok((*t, parse_function(w)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.add_action(state, parsed))
    }

    pub fn initial(&mut self, state: State) -> &mut Self {
        self.initial.insert(state);
        self
    }

    pub fn label(&mut self, name: &str, state: State) -> &mut Self {
        self.labels.entry(name.to_string()).or_default().insert(state);
        self
    }

    /// Validates and builds the model.
    pub fn build(&self) -> Result<ParametricModel> {
        let n = self.num_states;
        let invalid = |state: State, reason: String| AnalysisError::InvalidModel { state, reason };

        for (state, actions) in self.choices.iter().enumerate() {
            if actions.is_empty() {
                return Err(invalid(state, "no outgoing action".to_string()));
            }
            for (a, transitions) in actions.iter().enumerate() {
                if let Some(t) = transitions.iter().find(|t| t.target >= n) {
                    return Err(invalid(state, format!("action {} targets unknown state {}", a, t.target)));
                }
                let total = transitions
                    .iter()
                    .fold(RationalFunction::zero(), |acc, t| &acc + &t.weight);
                if !matches!(total.constant_value(), Some(c) if c.is_one()) {
                    return Err(invalid(state, format!("weights of action {} sum to {}, not 1", a, total)));
                }
            }
        }
        let check_range = |s: State| {
            if s < n {
                Ok(())
            } else {
                Err(invalid(s, format!("state {} out of range", s)))
            }
        };
        for &s in &self.initial {
            check_range(s)?;
        }
        for states in self.labels.values() {
            for &s in states {
                check_range(s)?;
            }
        }

        let mut predecessors = vec![BTreeSet::new(); n];
        for (state, actions) in self.choices.iter().enumerate() {
            for t in actions.iter().flatten() {
                predecessors[t.target].insert(state);
            }
        }
        let parameters: BTreeSet<String> = self
            .choices
            .iter()
            .flatten()
            .flatten()
            .flat_map(|t| t.weight.variables())
            .collect();

        debug!("built model with {} states and parameters {:?}", n, parameters);
        Ok(ParametricModel {
            choices: self.choices.clone(),
            predecessors: predecessors.into_iter().map(|p| p.into_iter().collect()).collect(),
            initial: BitSet::from_indices(n, self.initial.iter().copied()),
            labels: self
                .labels
                .iter()
                .map(|(name, states)| (name.clone(), BitSet::from_indices(n, states.iter().copied())))
                .collect(),
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn chain() -> ParametricModel {
        let mut b = ModelBuilder::new(3);
        b.add_action_str(0, &[(1, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        b.initial(0).label("goal", 1);
        b.build().unwrap()
    }

    #[test]
    fn test_structure() {
        let model = chain();
        assert_eq!(model.num_states(), 3);
        assert_eq!(model.successors(0).into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(model.predecessors(1), &[0, 1]);
        assert!(model.initial_states().contains(0));
        assert!(model.label("goal").unwrap().contains(1));
        assert_eq!(model.parameters().len(), 1);
        assert!(model.is_parametric_state(0));
        assert!(!model.is_parametric_state(1));
        assert_eq!(model.weight(0, 0, 2).to_string(), "1 - p");
        assert!(model.weight(0, 0, 0).is_zero());
    }

    #[test]
    fn test_duplicate_targets_are_merged() {
        let mut b = ModelBuilder::new(2);
        b.add_action_str(0, &[(1, "p"), (1, "1-p")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        let model = b.build().unwrap();
        assert_eq!(model.transitions(0, 0).len(), 1);
        assert!(!model.is_parametric_state(0));
    }

    #[test]
    fn test_validation_errors() {
        let mut b = ModelBuilder::new(2);
        b.add_action_str(0, &[(1, "p")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        assert!(matches!(b.build(), Err(AnalysisError::InvalidModel { state: 0, .. })));

        let mut b = ModelBuilder::new(2);
        b.add_action_str(0, &[(1, "1")]).unwrap();
        assert!(matches!(b.build(), Err(AnalysisError::InvalidModel { state: 1, .. })));

        let mut b = ModelBuilder::new(1);
        b.add_action_str(0, &[(3, "1")]).unwrap();
        assert!(matches!(b.build(), Err(AnalysisError::InvalidModel { state: 0, .. })));

        let mut b = ModelBuilder::new(1);
        assert!(matches!(b.add_action_str(0, &[(0, "1 +")]), Err(AnalysisError::Parse(_))));
    }
}
