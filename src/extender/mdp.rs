//! Choosing the optimal action of a nondeterministic state.

use std::collections::BTreeSet;

use log::{debug, trace, warn};

use crate::encoding::Encoder;
use crate::order::Order;
use crate::smt::Relation;
use crate::types::{Direction, State};

/// Result of [`ActionSelector::select`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActionChoice {
    /// The action is optimal everywhere in the region.
    Chosen(usize),
    /// No single action was shown to be optimal; this one is used anyway.
    Default(usize),
    /// The successors could not be sorted.
    Unordered(State, State),
}

#[derive(Debug, Clone)]
pub struct ActionSelector<'a> {
    encoder: Encoder<'a>,
    direction: Direction,
}

impl<'a> ActionSelector<'a> {
    pub fn new(encoder: Encoder<'a>, direction: Direction) -> Self {
        Self { encoder, direction }
    }

    pub fn select(&self, order: &mut Order, state: State) -> ActionChoice {
        let model = self.encoder.model();
        let num_actions = model.num_actions(state);
        if num_actions <= 1 || order.is_top_state(state) || order.is_bottom_state(state) {
            return ActionChoice::Chosen(0);
        }

        let mut successors = model.successors(state);
        successors.remove(&state);
        let successors: Vec<State> = successors.into_iter().collect();
        let sorted = order.sort_states(&successors);
        if let Some((s1, s2)) = sorted.unresolved {
            return ActionChoice::Unordered(s1, s2);
        }
        let mut best_first = sorted.states;
        if !self.direction.is_max() {
            best_first.reverse();
        }

        if let Some(action) = self.simple_action_check(state, &best_first) {
            debug!("action {} of state {} leads to the best successors only", action, state);
            return ActionChoice::Chosen(action);
        }

        let survivors = self.symbolic_elimination(order, state, &successors);
        match survivors.as_slice() {
            &[action] => {
                debug!("action {} of state {} dominates", action, state);
                ActionChoice::Chosen(action)
            }
            _ => {
                let fallback = survivors.iter().copied().min().unwrap_or(0);
                warn!(
                    "no optimal action for state {} among {:?}, using action {}",
                    state, survivors, fallback
                );
                ActionChoice::Default(fallback)
            }
        }
    }

    /// The action whose successors all rank before the successors of every other action.
    fn simple_action_check(&self, state: State, best_first: &[State]) -> Option<usize> {
        let model = self.encoder.model();
        let hits: Vec<BTreeSet<usize>> = (0..model.num_actions(state))
            .map(|action| {
                let targets = model.action_successors(state, action);
                best_first
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| targets.contains(*s))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        let mut best = hits.iter().enumerate().filter(|(_, h)| h.contains(&0));
        let (action, own) = best.next()?;
        if best.next().is_some() {
            return None;
        }
        let worst_own = own.iter().next_back()?;
        let separated = hits
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != action)
            .all(|(_, h)| h.iter().next().map_or(true, |first| first > worst_own));
        separated.then_some(action)
    }

    /// Removes actions shown to be dominated by another action.
    fn symbolic_elimination(&self, order: &mut Order, state: State, successors: &[State]) -> Vec<usize> {
        let model = self.encoder.model();
        let num_actions = model.num_actions(state);
        let Some(values) = self.encoder.encode(order, &successors.iter().copied().collect()) else {
            return (0..num_actions).collect();
        };
        let functions: Vec<_> = (0..num_actions)
            .map(|action| self.encoder.state_function(&values, state, action))
            .collect();
        let (better, worse) = if self.direction.is_max() {
            (Relation::Ge, Relation::Le)
        } else {
            (Relation::Le, Relation::Ge)
        };

        let mut candidates: Vec<usize> = Vec::new();
        for action in 0..num_actions {
            let Some(f_new) = &functions[action] else {
                candidates.push(action);
                continue;
            };
            let mut dominated = false;
            candidates.retain(|&candidate| {
                if dominated {
                    return true;
                }
                let Some(f_old) = &functions[candidate] else {
                    return true;
                };
                let Some(diff) = self.encoder.difference(f_new, f_old) else {
                    return true;
                };
                if self.encoder.proves(&values, &diff, better) {
                    trace!("action {} of state {} dominates action {}", action, state, candidate);
                    false
                } else {
                    dominated = self.encoder.proves(&values, &diff, worse);
                    true
                }
            });
            if !dominated {
                candidates.push(action);
            }
        }
        candidates
    }
}
