//! The decision-procedure boundary.
//!
//! The analysis only ever asks one question: is a boolean combination of
//! polynomial (in)equalities satisfiable over a box of variable domains? A
//! [`DecisionProcedure`] answers with [`SatResult::Sat`], [`SatResult::Unsat`]
//! or [`SatResult::Unknown`]. No models are extracted.

use std::collections::BTreeMap;
use std::fmt;

use num_rational::BigRational;

use crate::interval::Interval;
use crate::polynomial::Polynomial;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

impl SatResult {
    pub fn is_unsat(&self) -> bool {
        matches!(self, SatResult::Unsat)
    }
}

/// Relation of a polynomial to zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Relation {
    /// The relation holding exactly when `self` does not.
    pub fn negate(self) -> Relation {
        match self {
            Relation::Lt => Relation::Ge,
            Relation::Le => Relation::Gt,
            Relation::Eq => Relation::Ne,
            Relation::Ne => Relation::Eq,
            Relation::Ge => Relation::Lt,
            Relation::Gt => Relation::Le,
        }
    }

    /// The relation obtained by multiplying both sides with a negative number.
    pub fn flip(self) -> Relation {
        match self {
            Relation::Lt => Relation::Gt,
            Relation::Le => Relation::Ge,
            Relation::Ge => Relation::Le,
            Relation::Gt => Relation::Lt,
            other => other,
        }
    }

    /// Evaluates `value ⋈ 0`.
    pub fn holds(self, value: &BigRational) -> bool {
        let zero = BigRational::from_integer(0.into());
        match self {
            Relation::Lt => *value < zero,
            Relation::Le => *value <= zero,
            Relation::Eq => *value == zero,
            Relation::Ne => *value != zero,
            Relation::Ge => *value >= zero,
            Relation::Gt => *value > zero,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Eq => "=",
            Relation::Ne => "!=",
            Relation::Ge => ">=",
            Relation::Gt => ">",
        }
    }
}

/// `poly ⋈ 0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub poly: Polynomial,
    pub relation: Relation,
}

impl Atom {
    pub fn new(poly: Polynomial, relation: Relation) -> Self {
        Self { poly, relation }
    }

    /// `lhs ⋈ rhs`, normalized to `lhs - rhs ⋈ 0`.
    pub fn compare(lhs: &Polynomial, relation: Relation, rhs: &Polynomial) -> Self {
        Self::new(lhs - rhs, relation)
    }

    pub fn negate(&self) -> Atom {
        Atom::new(self.poly.clone(), self.relation.negate())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} 0", self.poly, self.relation.symbol())
    }
}

/// A boolean combination of atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    True,
    False,
    Atom(Atom),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Not(Box<Formula>),
}

impl Formula {
    pub fn atom(lhs: &Polynomial, relation: Relation, rhs: &Polynomial) -> Formula {
        Formula::Atom(Atom::compare(lhs, relation, rhs))
    }

    pub fn and(parts: impl IntoIterator<Item = Formula>) -> Formula {
        Formula::And(parts.into_iter().collect())
    }

    pub fn or(parts: impl IntoIterator<Item = Formula>) -> Formula {
        Formula::Or(parts.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Formula {
        Formula::Not(Box::new(self))
    }

    /// Pushes negations down to the atoms.
    pub fn nnf(&self) -> Formula {
        self.nnf_with(false)
    }

    fn nnf_with(&self, negated: bool) -> Formula {
        match (self, negated) {
            (Formula::True, false) | (Formula::False, true) => Formula::True,
            (Formula::True, true) | (Formula::False, false) => Formula::False,
            (Formula::Atom(a), false) => Formula::Atom(a.clone()),
            (Formula::Atom(a), true) => Formula::Atom(a.negate()),
            (Formula::And(parts), false) | (Formula::Or(parts), true) => {
                Formula::And(parts.iter().map(|p| p.nnf_with(negated)).collect())
            }
            (Formula::Or(parts), false) | (Formula::And(parts), true) => {
                Formula::Or(parts.iter().map(|p| p.nnf_with(negated)).collect())
            }
            (Formula::Not(inner), _) => inner.nnf_with(!negated),
        }
    }

    /// Disjunctive normal form: a list of conjunctions of atoms.
    ///
    /// `!=` atoms are split into `<` and `>`. An empty list is `false`; an
    /// empty conjunction is `true`.
    pub fn dnf(&self) -> Vec<Vec<Atom>> {
        fn go(f: &Formula) -> Vec<Vec<Atom>> {
            match f {
                Formula::True => vec![vec![]],
                Formula::False => vec![],
                Formula::Atom(a) if a.relation == Relation::Ne => vec![
                    vec![Atom::new(a.poly.clone(), Relation::Lt)],
                    vec![Atom::new(a.poly.clone(), Relation::Gt)],
                ],
                Formula::Atom(a) => vec![vec![a.clone()]],
                Formula::Or(parts) => parts.iter().flat_map(go).collect(),
                Formula::And(parts) => {
                    let mut acc: Vec<Vec<Atom>> = vec![vec![]];
                    for p in parts {
                        let rhs = go(p);
                        let mut next = Vec::with_capacity(acc.len() * rhs.len());
                        for left in &acc {
                            for right in &rhs {
                                next.push(left.iter().chain(right.iter()).cloned().collect());
                            }
                        }
                        acc = next;
                    }
                    acc
                }
                Formula::Not(_) => unreachable!("formula is in negation normal form"),
            }
        }
        go(&self.nnf())
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, parts: &[Formula], op: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ")")
        };
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Atom(a) => write!(f, "{}", a),
            Formula::And(parts) => join(f, parts, "&"),
            Formula::Or(parts) => join(f, parts, "|"),
            Formula::Not(inner) => write!(f, "!{}", inner),
        }
    }
}

/// A satisfiability question: a formula over variables ranging in the given domains.
///
/// Variables without a domain are unbounded.
#[derive(Debug, Clone)]
pub struct Query {
    pub domains: BTreeMap<String, Interval>,
    pub formula: Formula,
}

impl Query {
    pub fn new(domains: BTreeMap<String, Interval>, formula: Formula) -> Self {
        Self { domains, formula }
    }
}

/// Abstract decision procedure.
pub trait DecisionProcedure: Send + Sync {
    /// Checks satisfiability of the query.
    fn check(&self, query: &Query) -> SatResult;
}

#[cfg(test)]
pub(crate) mod tests {
    use test_log::test;

    use super::*;

    /// A decision procedure answering from a fixed script, for exercising callers.
    pub struct MockSolver {
        pub answers: std::sync::Mutex<Vec<SatResult>>,
    }

    impl MockSolver {
        pub fn new(answers: Vec<SatResult>) -> Self {
            Self {
                answers: std::sync::Mutex::new(answers),
            }
        }
    }

    impl DecisionProcedure for MockSolver {
        fn check(&self, _query: &Query) -> SatResult {
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                SatResult::Unknown("mock exhausted".to_string())
            } else {
                answers.remove(0)
            }
        }
    }

    #[test]
    fn test_nnf_pushes_negation() {
        let p = Polynomial::var("p");
        let f = Formula::and([
            Formula::atom(&p, Relation::Gt, &Polynomial::zero()),
            Formula::True,
        ])
        .not();
        let nnf = f.nnf();
        assert_eq!(nnf.to_string(), "(p <= 0 | false)");
    }

    #[test]
    fn test_dnf_splits_disequality() {
        let p = Polynomial::var("p");
        let q = Polynomial::var("q");
        let f = Formula::and([
            Formula::atom(&p, Relation::Ne, &q),
            Formula::or([Formula::atom(&p, Relation::Gt, &Polynomial::zero()), Formula::False]),
        ]);
        let dnf = f.dnf();
        assert_eq!(dnf.len(), 2);
        assert_eq!(dnf[0][0].relation, Relation::Lt);
        assert_eq!(dnf[1][0].relation, Relation::Gt);
        assert!(dnf.iter().all(|conj| conj.len() == 2));
        assert!(Formula::False.dnf().is_empty());
        assert_eq!(Formula::True.dnf(), vec![Vec::<Atom>::new()]);
    }

    #[test]
    fn test_mock_solver_script() {
        let solver = MockSolver::new(vec![SatResult::Unsat]);
        let query = Query::new(BTreeMap::new(), Formula::True);
        assert_eq!(solver.check(&query), SatResult::Unsat);
        assert!(matches!(solver.check(&query), SatResult::Unknown(_)));
    }
}
