//! Decision procedure backed by z3's nonlinear real arithmetic.
//!
//! Queries are rendered to SMT-LIB2 and loaded into a fresh solver per check,
//! so [`Z3Solver`] itself only holds its limits and can be shared between
//! threads.

use log::{debug, trace};

use crate::config::SolverConfig;
use crate::smt::{DecisionProcedure, Query, SatResult};
use crate::smtlib::to_smtlib;

#[derive(Debug, Clone)]
pub struct Z3Solver {
    timeout_ms: u32,
}

impl Z3Solver {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
        }
    }

    fn solver(&self) -> z3::Solver {
        let solver = z3::Solver::new();
        if self.timeout_ms > 0 {
            let mut params = z3::Params::new();
            params.set_u32("timeout", self.timeout_ms);
            solver.set_params(&params);
        }
        solver
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new(&SolverConfig::default())
    }
}

impl DecisionProcedure for Z3Solver {
    fn check(&self, query: &Query) -> SatResult {
        let script = to_smtlib(query);
        trace!("z3 query:\n{}", script);
        let solver = self.solver();
        solver.from_string(script);
        match solver.check() {
            z3::SatResult::Sat => SatResult::Sat,
            z3::SatResult::Unsat => SatResult::Unsat,
            z3::SatResult::Unknown => {
                let reason = solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "z3 returned unknown".to_string());
                debug!("z3 gave up: {}", reason);
                SatResult::Unknown(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use test_log::test;

    use super::*;
    use crate::interval::Interval;
    use crate::polynomial::{ratio, Polynomial};
    use crate::smt::{Formula, Relation};

    fn unit_domain(lo: (i64, i64), hi: (i64, i64)) -> BTreeMap<String, Interval> {
        let mut domains = BTreeMap::new();
        domains.insert("p".to_string(), Interval::closed(ratio(lo.0, lo.1), ratio(hi.0, hi.1)));
        domains
    }

    #[test]
    fn test_hump_never_exceeds_a_quarter() {
        let p = Polynomial::var("p");
        let hump = &p * &(&Polynomial::one() - &p);
        let quarter = Polynomial::constant(ratio(1, 4));
        let solver = Z3Solver::default();

        let above = Query::new(unit_domain((0, 1), (1, 1)), Formula::atom(&hump, Relation::Gt, &quarter));
        assert_eq!(solver.check(&above), SatResult::Unsat);
        let touching = Query::new(unit_domain((0, 1), (1, 1)), Formula::atom(&hump, Relation::Eq, &quarter));
        assert_eq!(solver.check(&touching), SatResult::Sat);
    }

    #[test]
    fn test_equal_functions_cannot_differ() {
        let p = Polynomial::var("p");
        let lhs = &(&p * &p) - &(&p * &Polynomial::from_int(2));
        let rhs = &(&p - &Polynomial::from_int(2)) * &p;
        let query = Query::new(unit_domain((1, 10), (9, 10)), Formula::atom(&lhs, Relation::Ne, &rhs));
        assert_eq!(Z3Solver::default().check(&query), SatResult::Unsat);
    }

    #[test]
    fn test_sign_change_inside_region() {
        let p = Polynomial::var("p");
        let half = Polynomial::constant(ratio(1, 2));
        let solver = Z3Solver::default();
        for relation in [Relation::Lt, Relation::Gt] {
            let query = Query::new(unit_domain((1, 10), (9, 10)), Formula::atom(&p, relation, &half));
            assert_eq!(solver.check(&query), SatResult::Sat);
        }
        let outside = Query::new(unit_domain((6, 10), (9, 10)), Formula::atom(&p, Relation::Le, &half));
        assert_eq!(solver.check(&outside), SatResult::Unsat);
    }
}
