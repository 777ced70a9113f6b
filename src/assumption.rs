//! Hypothesized relations between two states, and their generation.

use std::fmt;

use log::debug;

use crate::checker::AssumptionChecker;
use crate::order::Order;
use crate::types::State;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AssumptionKind {
    Greater,
    Less,
    Equal,
}

/// `lhs ⋈ rhs` on the values of two states.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Assumption {
    pub lhs: State,
    pub rhs: State,
    pub kind: AssumptionKind,
}

impl Assumption {
    pub fn greater(lhs: State, rhs: State) -> Self {
        Self {
            lhs,
            rhs,
            kind: AssumptionKind::Greater,
        }
    }

    pub fn less(lhs: State, rhs: State) -> Self {
        Self {
            lhs,
            rhs,
            kind: AssumptionKind::Less,
        }
    }

    pub fn equal(lhs: State, rhs: State) -> Self {
        Self {
            lhs,
            rhs,
            kind: AssumptionKind::Equal,
        }
    }

    /// The same relation with `lhs` above `rhs`; `Equal` is returned unchanged.
    pub fn normalized(self) -> Self {
        match self.kind {
            AssumptionKind::Less => Self::greater(self.rhs, self.lhs),
            _ => self,
        }
    }
}

impl fmt::Display for Assumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self.kind {
            AssumptionKind::Greater => ">",
            AssumptionKind::Less => "<",
            AssumptionKind::Equal => "=",
        };
        write!(f, "{} {} {}", self.lhs, symbol, self.rhs)
    }
}

/// Verdict of the checker on an assumption.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AssumptionStatus {
    /// Holds everywhere in the region.
    Valid,
    /// Fails somewhere in the region.
    Invalid,
    /// Could not be decided.
    Unknown,
}

impl fmt::Display for AssumptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssumptionStatus::Valid => write!(f, "valid"),
            AssumptionStatus::Invalid => write!(f, "invalid"),
            AssumptionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Generates the candidate relations for an unresolved pair and validates them.
#[derive(Debug, Clone)]
pub struct AssumptionMaker<'a> {
    checker: AssumptionChecker<'a>,
}

impl<'a> AssumptionMaker<'a> {
    pub fn new(checker: AssumptionChecker<'a>) -> Self {
        Self { checker }
    }

    pub fn checker(&self) -> &AssumptionChecker<'a> {
        &self.checker
    }

    /// Candidates `s1 > s2`, `s1 < s2` and `s1 = s2` with their status.
    ///
    /// Relations the order already excludes are left out. If one candidate is
    /// valid, it is the only one returned.
    pub fn create_and_check(&self, s1: State, s2: State, order: &mut Order) -> Vec<(Assumption, AssumptionStatus)> {
        let mut result = Vec::with_capacity(3);
        for assumption in [Assumption::greater(s1, s2), Assumption::less(s1, s2), Assumption::equal(s1, s2)] {
            let status = match self.checker.validate_on_order(order, &assumption) {
                Some(AssumptionStatus::Invalid) => continue,
                Some(status) => status,
                None => self.checker.validate_by_evaluation(order, &assumption),
            };
            debug!("assumption {} is {}", assumption, status);
            if status == AssumptionStatus::Valid {
                return vec![(assumption, status)];
            }
            result.push((assumption, status));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::checker::tests::{fixture, Fixture};
    use crate::config::AnalysisConfig;
    use crate::smt::tests::MockSolver;
    use crate::solver::IntervalSolver;

    #[test]
    fn test_display() {
        assert_eq!(Assumption::greater(3, 5).to_string(), "3 > 5");
        assert_eq!(Assumption::less(3, 5).to_string(), "3 < 5");
        assert_eq!(Assumption::equal(3, 5).to_string(), "3 = 5");
        assert_eq!(Assumption::less(3, 5).normalized(), Assumption::greater(5, 3));
    }

    #[test]
    fn test_single_valid_candidate() {
        let Fixture { model, property, region } = fixture();
        let solver = IntervalSolver::default();
        let checker = AssumptionChecker::new(&model, &property, &region, &solver, &AnalysisConfig::default()).unwrap();
        let maker = AssumptionMaker::new(checker);

        let mut order = Order::with_extremes(5, &[0], &[4]);
        order.add(1);
        order.add(2);
        let candidates = maker.create_and_check(1, 2, &mut order);
        assert_eq!(candidates, vec![(Assumption::greater(1, 2), AssumptionStatus::Valid)]);

        let candidates = maker.create_and_check(2, 1, &mut order);
        assert_eq!(candidates, vec![(Assumption::less(2, 1), AssumptionStatus::Valid)]);
    }

    #[test]
    fn test_undecided_candidates() {
        let Fixture { model, property, region } = fixture();
        let solver = MockSolver::new(Vec::new());
        let checker = AssumptionChecker::new(&model, &property, &region, &solver, &AnalysisConfig::default()).unwrap();
        let maker = AssumptionMaker::new(checker);

        let mut order = Order::with_extremes(5, &[0], &[4]);
        order.add(1);
        order.add(2);
        let candidates = maker.create_and_check(1, 2, &mut order);
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|(_, status)| *status == AssumptionStatus::Unknown));
    }
}
