//! A built-in decision procedure based on interval branch-and-bound.
//!
//! The query is brought into disjunctive normal form. Every conjunction is
//! then explored box by box:
//!
//! - If the interval enclosure of some atom is entirely false on the box, the
//!   box holds no solution.
//! - If every atom is entirely true on the box, the conjunction is satisfiable.
//! - Otherwise a few witness points inside the box are evaluated exactly;
//!   one satisfying every atom proves satisfiability.
//! - Otherwise the widest relevant variable is bisected.
//!
//! Boxes that exhaust the depth or box budget make the answer
//! [`SatResult::Unknown`]. Both definite answers are sound: UNSAT follows
//! from exact interval reasoning, SAT from an exact witness.
//!
//! This procedure is the fallback when the `z3` feature is disabled; see
//! [`default_solver`]. It is incomplete: an `=` atom is never entirely true
//! on a box of positive width, so equalities are only decided at exact
//! witness points, and conjunctions that hinge on touching bounds (such as
//! `p * (1 - p) >= 1/4`) tend to end in `Unknown` once the box budget runs out.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::SolverConfig;
use crate::interval::{enclose, Interval};
use crate::smt::{Atom, DecisionProcedure, Query, Relation, SatResult};

/// The decision procedure used by the analysis: z3 when the `z3` feature is
/// enabled, the [`IntervalSolver`] otherwise.
pub fn default_solver(config: &SolverConfig) -> Box<dyn DecisionProcedure> {
    #[cfg(feature = "z3")]
    {
        Box::new(crate::z3_solver::Z3Solver::new(config))
    }
    #[cfg(not(feature = "z3"))]
    {
        Box::new(IntervalSolver::new(config.clone()))
    }
}

/// Verdict of an atom over a whole box.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Verdict {
    True,
    False,
    Open,
}

fn verdict(atom: &Atom, domains: &BTreeMap<String, Interval>) -> Verdict {
    let range = enclose(&atom.poly, domains);
    let (holds, fails) = match atom.relation {
        Relation::Lt => (range.is_negative(), range.is_nonnegative()),
        Relation::Le => (range.is_nonpositive(), range.is_positive()),
        Relation::Eq => (range.is_zero(), range.is_positive() || range.is_negative()),
        Relation::Ne => (range.is_positive() || range.is_negative(), range.is_zero()),
        Relation::Ge => (range.is_nonnegative(), range.is_negative()),
        Relation::Gt => (range.is_positive(), range.is_nonpositive()),
    };
    if fails {
        Verdict::False
    } else if holds {
        Verdict::True
    } else {
        Verdict::Open
    }
}

/// Interval branch-and-bound decision procedure.
#[derive(Debug, Clone, Default)]
pub struct IntervalSolver {
    config: SolverConfig,
}

impl IntervalSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    fn check_conjunction(
        &self,
        atoms: &[Atom],
        domains: &BTreeMap<String, Interval>,
        rng: &mut ChaCha8Rng,
    ) -> SatResult {
        if contradictory_pair(atoms) {
            trace!("conjunction refuted syntactically");
            return SatResult::Unsat;
        }
        let vars: BTreeSet<String> = atoms.iter().flat_map(|a| a.poly.variables()).collect();
        let mut root = BTreeMap::new();
        for v in &vars {
            let d = domains.get(v).cloned().unwrap_or_else(Interval::unbounded);
            if d.is_empty() {
                return SatResult::Unsat;
            }
            root.insert(v.clone(), d);
        }

        let mut stack = vec![(root, 0usize)];
        let mut boxes = 0usize;
        let mut exhausted = false;

        while let Some((current, depth)) = stack.pop() {
            boxes += 1;
            if boxes > self.config.max_boxes {
                debug!("box budget of {} exhausted", self.config.max_boxes);
                return SatResult::Unknown(format!("box budget of {} exhausted", self.config.max_boxes));
            }

            let mut open = Vec::new();
            let mut refuted = false;
            for atom in atoms {
                match verdict(atom, &current) {
                    Verdict::False => {
                        refuted = true;
                        break;
                    }
                    Verdict::Open => open.push(atom),
                    Verdict::True => {}
                }
            }
            if refuted {
                continue;
            }
            if open.is_empty() {
                trace!("all atoms hold on box at depth {}", depth);
                return SatResult::Sat;
            }
            if self.find_witness(atoms, &current, rng) {
                trace!("witness found at depth {}", depth);
                return SatResult::Sat;
            }
            if depth >= self.config.max_depth {
                exhausted = true;
                continue;
            }

            let relevant: BTreeSet<String> = open.iter().flat_map(|a| a.poly.variables()).collect();
            let Some(split_var) = widest(&current, &relevant) else {
                exhausted = true;
                continue;
            };
            let (left, right) = current[&split_var].split();
            let mut lower = current.clone();
            lower.insert(split_var.clone(), left);
            let mut upper = current;
            upper.insert(split_var, right);
            stack.push((lower, depth + 1));
            stack.push((upper, depth + 1));
        }

        if exhausted {
            SatResult::Unknown(format!("depth limit of {} reached", self.config.max_depth))
        } else {
            SatResult::Unsat
        }
    }

    /// Tries the box center and a few random points; every atom is evaluated exactly.
    fn find_witness(&self, atoms: &[Atom], current: &BTreeMap<String, Interval>, rng: &mut ChaCha8Rng) -> bool {
        let center: BTreeMap<String, BigRational> =
            current.iter().map(|(v, d)| (v.clone(), d.midpoint())).collect();
        if satisfies(atoms, &center) {
            return true;
        }
        for _ in 0..self.config.witness_samples {
            let point: BTreeMap<String, BigRational> = current
                .iter()
                .map(|(v, d)| {
                    let k: i64 = rng.random_range(1..1024);
                    let t = BigRational::new(BigInt::from(k), BigInt::from(1024));
                    (v.clone(), d.at(&t))
                })
                .collect();
            if point.iter().all(|(v, x)| current[v].contains(x)) && satisfies(atoms, &point) {
                return true;
            }
        }
        false
    }
}

/// True if two atoms constrain the same polynomial (up to sign) in incompatible ways.
fn contradictory_pair(atoms: &[Atom]) -> bool {
    let signs = [-1, 0, 1].map(|v| BigRational::from_integer(BigInt::from(v)));
    for (i, a) in atoms.iter().enumerate() {
        for b in &atoms[i + 1..] {
            let relation = if a.poly == b.poly {
                b.relation
            } else if a.poly == -&b.poly {
                b.relation.flip()
            } else {
                continue;
            };
            if !signs.iter().any(|x| a.relation.holds(x) && relation.holds(x)) {
                return true;
            }
        }
    }
    false
}

fn satisfies(atoms: &[Atom], point: &BTreeMap<String, BigRational>) -> bool {
    atoms.iter().all(|a| a.relation.holds(&a.poly.eval(point)))
}

/// The relevant variable with the widest domain; unbounded domains count as widest.
fn widest(current: &BTreeMap<String, Interval>, relevant: &BTreeSet<String>) -> Option<String> {
    let mut best: Option<(&String, Option<BigRational>)> = None;
    for v in relevant {
        let w = current[v].width();
        if w.as_ref().is_some_and(|w| w.is_zero()) {
            continue;
        }
        let better = match (&best, &w) {
            (None, _) => true,
            (Some((_, Some(_))), None) => true,
            (Some((_, Some(bw))), Some(cw)) => cw > bw,
            (Some((_, None)), _) => false,
        };
        if better {
            best = Some((v, w));
        }
    }
    best.map(|(v, _)| v.clone())
}

impl DecisionProcedure for IntervalSolver {
    fn check(&self, query: &Query) -> SatResult {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let conjunctions = query.formula.dnf();
        debug!("check: {} conjunction(s) over {} domain(s)", conjunctions.len(), query.domains.len());
        let mut unknown = None;
        for atoms in &conjunctions {
            match self.check_conjunction(atoms, &query.domains, &mut rng) {
                SatResult::Sat => return SatResult::Sat,
                SatResult::Unsat => {}
                SatResult::Unknown(reason) => unknown = Some(reason),
            }
        }
        match unknown {
            Some(reason) => SatResult::Unknown(reason),
            None => SatResult::Unsat,
        }
    }
}
