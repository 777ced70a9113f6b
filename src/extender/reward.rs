use num_rational::BigRational;
use num_traits::Zero;

use crate::order::Order;
use crate::types::State;

use super::reachability::{ensure_below_top, place_between_extremes, ReachabilityHooks};
use super::ExtensionHooks;

/// Placement for expected rewards.
///
/// A state without reward behaves like a reachability state. A state with a
/// positive reward collects more than its lowest successor, so it is placed
/// above that successor and nothing more is concluded.
#[derive(Debug, Clone)]
pub struct RewardHooks {
    rewards: Vec<BigRational>,
}

impl RewardHooks {
    pub fn new(rewards: Vec<BigRational>) -> Self {
        Self { rewards }
    }

    fn has_reward(&self, state: State) -> bool {
        !self.rewards[state].is_zero()
    }
}

fn place_above(order: &mut Order, state: State, below: State) {
    if !order.contains(below) {
        ensure_below_top(order, below);
    }
    if order.contains(state) {
        order.add_relation(state, below);
    } else {
        order.add_above(state, order.node_of(below));
    }
}

impl ExtensionHooks for RewardHooks {
    fn handle_one_successor(&self, order: &mut Order, state: State, successor: State) {
        if self.has_reward(state) {
            place_above(order, state, successor);
        } else {
            ReachabilityHooks.handle_one_successor(order, state, successor);
        }
    }

    fn place_sorted(&self, order: &mut Order, state: State, sorted: &[State]) {
        if !self.has_reward(state) {
            place_between_extremes(order, state, sorted);
        } else if let Some(&last) = sorted.last() {
            place_above(order, state, last);
        }
    }

    fn allows_forward_reasoning(&self, state: State) -> bool {
        !self.has_reward(state)
    }
}
