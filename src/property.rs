//! Properties whose state values are ordered.
//!
//! A reachability property `phi U psi` (or `F psi`) assigns every state the
//! probability of reaching `psi` through `phi` states; an expected-reward
//! property assigns the expected reward accumulated before reaching the target.
//! Nondeterministic models need an optimization direction.

use log::debug;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use crate::bitset::BitSet;
use crate::error::{AnalysisError, Result};
use crate::graph::{prob0_all, prob0_exists, prob1_all, prob1_exists};
use crate::model::ParametricModel;
use crate::types::{Direction, State};

#[derive(Debug, Clone)]
pub enum Property {
    /// Probability of `phi U psi`; `phi = None` means `F psi`.
    Reachability {
        phi: Option<BitSet>,
        psi: BitSet,
        direction: Option<Direction>,
    },
    /// Expected accumulated state reward until `target` is reached.
    ExpectedReward {
        target: BitSet,
        rewards: Vec<BigRational>,
        direction: Option<Direction>,
    },
}

impl Property {
    pub fn eventually(psi: BitSet) -> Self {
        Property::Reachability {
            phi: None,
            psi,
            direction: None,
        }
    }

    pub fn until(phi: BitSet, psi: BitSet) -> Self {
        Property::Reachability {
            phi: Some(phi),
            psi,
            direction: None,
        }
    }

    /// Expected reward until `target`; `rewards[s]` is collected on leaving `s`.
    pub fn expected_reward(target: BitSet, rewards: Vec<BigRational>) -> Self {
        Property::ExpectedReward {
            target,
            rewards,
            direction: None,
        }
    }

    pub fn maximize(self) -> Self {
        self.with_direction(Direction::Maximize)
    }

    pub fn minimize(self) -> Self {
        self.with_direction(Direction::Minimize)
    }

    pub fn with_direction(mut self, dir: Direction) -> Self {
        match &mut self {
            Property::Reachability { direction, .. } | Property::ExpectedReward { direction, .. } => {
                *direction = Some(dir);
            }
        }
        self
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Property::Reachability { direction, .. } | Property::ExpectedReward { direction, .. } => *direction,
        }
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, Property::ExpectedReward { .. })
    }

    /// The reward of a state; zero for reachability properties.
    pub fn reward(&self, state: State) -> BigRational {
        match self {
            Property::Reachability { .. } => BigRational::zero(),
            Property::ExpectedReward { rewards, .. } => rewards[state].clone(),
        }
    }

    /// States whose value is fixed in advance: the target for rewards, `psi` for reachability.
    pub fn goal(&self) -> &BitSet {
        match self {
            Property::Reachability { psi, .. } => psi,
            Property::ExpectedReward { target, .. } => target,
        }
    }

    /// Checks the property against the model shape.
    pub fn validate(&self, model: &ParametricModel) -> Result<()> {
        let n = model.num_states();
        let unsupported = |reason: String| Err(AnalysisError::UnsupportedProperty { reason });
        if !model.is_deterministic() && self.direction().is_none() {
            return unsupported("nondeterministic model needs a min or max direction".to_string());
        }
        match self {
            Property::Reachability { phi, psi, .. } => {
                if psi.len() != n || phi.as_ref().is_some_and(|p| p.len() != n) {
                    return unsupported(format!("state sets must cover {} states", n));
                }
            }
            Property::ExpectedReward { target, rewards, .. } => {
                if target.len() != n || rewards.len() != n {
                    return unsupported(format!("target and rewards must cover {} states", n));
                }
                if let Some(s) = rewards.iter().position(|r| r.is_negative()) {
                    return unsupported(format!("negative reward at state {}", s));
                }
            }
        }
        Ok(())
    }

    /// Computes the bottom and top states of the order.
    ///
    /// For reachability these are the probability-0 and probability-1 states
    /// (both must exist). For rewards, bottom is the target and top are the
    /// states with infinite expected reward, if any.
    pub fn bottom_top_states(&self, model: &ParametricModel) -> Result<(BitSet, Option<BitSet>)> {
        self.validate(model)?;
        let n = model.num_states();
        let (bottom, top) = match self {
            Property::Reachability { phi, psi, direction } => {
                let phi = phi.clone().unwrap_or_else(|| BitSet::full(n));
                let (zero, one) = match direction {
                    _ if model.is_deterministic() => (prob0_all(model, &phi, psi), prob1_all(model, &phi, psi)),
                    Some(Direction::Maximize) => (prob0_all(model, &phi, psi), prob1_exists(model, &phi, psi)),
                    _ => (prob0_exists(model, &phi, psi), prob1_all(model, &phi, psi)),
                };
                if zero.is_empty() {
                    return Err(AnalysisError::NoBottomStates);
                }
                if one.is_empty() {
                    return Err(AnalysisError::NoTopStates);
                }
                (zero, Some(one))
            }
            Property::ExpectedReward { target, direction, .. } => {
                if target.is_empty() {
                    return Err(AnalysisError::NoBottomStates);
                }
                let all = BitSet::full(n);
                let almost_sure = match direction {
                    Some(Direction::Minimize) => prob1_exists(model, &all, target),
                    _ => prob1_all(model, &all, target),
                };
                let infinite = almost_sure.complement();
                (target.clone(), (!infinite.is_empty()).then_some(infinite))
            }
        };
        debug!(
            "bottom states: {}, top states: {}",
            bottom.count_ones(),
            top.as_ref().map_or(0, |t| t.count_ones())
        );
        Ok((bottom, top))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::model::ModelBuilder;
    use crate::polynomial::ratio;

    /// 0 -p-> 1 (goal), 0 -(1-p)-> 2 (sink)
    fn chain() -> ParametricModel {
        let mut b = ModelBuilder::new(3);
        b.add_action_str(0, &[(1, "p"), (2, "1-p")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_reachability_extremes() {
        let model = chain();
        let property = Property::eventually(BitSet::from_indices(3, [1]));
        let (bottom, top) = property.bottom_top_states(&model).unwrap();
        assert_eq!(bottom.iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(top.unwrap().iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_missing_extremes() {
        let model = chain();
        // every state reaches {0, 1, 2} trivially
        let property = Property::eventually(BitSet::full(3));
        assert!(matches!(property.bottom_top_states(&model), Err(AnalysisError::NoBottomStates)));

        let property = Property::eventually(BitSet::new(3));
        assert!(matches!(property.bottom_top_states(&model), Err(AnalysisError::NoTopStates)));
    }

    #[test]
    fn test_mdp_needs_direction() {
        let mut b = ModelBuilder::new(3);
        b.add_action_str(0, &[(1, "1")]).unwrap();
        b.add_action_str(0, &[(2, "1")]).unwrap();
        b.add_action_str(1, &[(1, "1")]).unwrap();
        b.add_action_str(2, &[(2, "1")]).unwrap();
        let model = b.build().unwrap();
        let goal = BitSet::from_indices(3, [1]);
        assert!(matches!(
            Property::eventually(goal.clone()).bottom_top_states(&model),
            Err(AnalysisError::UnsupportedProperty { .. })
        ));

        let (bottom, top) = Property::eventually(goal.clone()).maximize().bottom_top_states(&model).unwrap();
        assert_eq!(bottom.iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(top.unwrap().iter().collect::<Vec<_>>(), vec![0, 1]);

        let (bottom, top) = Property::eventually(goal).minimize().bottom_top_states(&model).unwrap();
        assert_eq!(bottom.iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(top.unwrap().iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_reward_extremes() {
        let model = chain();
        let rewards = vec![ratio(1, 1), ratio(0, 1), ratio(2, 1)];
        // from 0 the target 1 is missed with probability 1 - p
        let property = Property::expected_reward(BitSet::from_indices(3, [1]), rewards);
        let (bottom, top) = property.bottom_top_states(&model).unwrap();
        assert_eq!(bottom.iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(top.unwrap().iter().collect::<Vec<_>>(), vec![0, 2]);
        assert!(property.is_reward());
        assert_eq!(property.reward(2), ratio(2, 1));
    }

    #[test]
    fn test_reward_validation() {
        let model = chain();
        let property = Property::expected_reward(BitSet::from_indices(3, [1]), vec![ratio(-1, 1), ratio(0, 1), ratio(0, 1)]);
        assert!(matches!(
            property.bottom_top_states(&model),
            Err(AnalysisError::UnsupportedProperty { .. })
        ));
        let short = Property::expected_reward(BitSet::from_indices(3, [1]), vec![ratio(1, 1)]);
        assert!(short.validate(&model).is_err());
    }
}
