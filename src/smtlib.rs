//! SMT-LIB2 rendering of queries over real arithmetic.

use std::collections::BTreeSet;

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::interval::{Bound, Ext};
use crate::polynomial::{Monomial, Polynomial};
use crate::smt::{Atom, Formula, Query, Relation};

/// Renders a query as a script of declarations and assertions.
///
/// Every variable of the formula or of the domains is declared `Real`. Finite
/// domain bounds become assertions, infinite ones are dropped.
pub fn to_smtlib(query: &Query) -> String {
    let mut vars: BTreeSet<String> = query.domains.keys().cloned().collect();
    collect_variables(&query.formula, &mut vars);

    let mut lines: Vec<String> = vars.iter().map(|v| format!("(declare-const {} Real)", symbol(v))).collect();
    for (var, domain) in &query.domains {
        if let Some(lower) = bound_to_smtlib(domain.lo(), var, true) {
            lines.push(format!("(assert {})", lower));
        }
        if let Some(upper) = bound_to_smtlib(domain.hi(), var, false) {
            lines.push(format!("(assert {})", upper));
        }
    }
    lines.push(format!("(assert {})", formula_to_smtlib(&query.formula)));
    lines.join("\n")
}

fn collect_variables(formula: &Formula, vars: &mut BTreeSet<String>) {
    match formula {
        Formula::True | Formula::False => {}
        Formula::Atom(atom) => vars.extend(atom.poly.variables()),
        Formula::And(parts) | Formula::Or(parts) => parts.iter().for_each(|p| collect_variables(p, vars)),
        Formula::Not(inner) => collect_variables(inner, vars),
    }
}

fn symbol(name: &str) -> String {
    format!("|{}|", name)
}

fn bound_to_smtlib(bound: &Bound, var: &str, lower: bool) -> Option<String> {
    let Ext::Finite(value) = &bound.value else {
        return None;
    };
    let op = if bound.open { "<" } else { "<=" };
    let (lhs, rhs) = if lower {
        (rational_to_smtlib(value), symbol(var))
    } else {
        (symbol(var), rational_to_smtlib(value))
    };
    Some(format!("({} {} {})", op, lhs, rhs))
}

pub fn rational_to_smtlib(value: &BigRational) -> String {
    let magnitude = value.abs();
    let text = if magnitude.is_integer() {
        format!("{}.0", magnitude.numer())
    } else {
        format!("(/ {}.0 {}.0)", magnitude.numer(), magnitude.denom())
    };
    if value.is_negative() {
        format!("(- {})", text)
    } else {
        text
    }
}

fn term_to_smtlib(monomial: &Monomial, coeff: &BigRational) -> String {
    let mut factors: Vec<String> = Vec::new();
    if !coeff.is_one() || monomial.is_one() {
        factors.push(rational_to_smtlib(coeff));
    }
    for (var, power) in monomial.factors() {
        for _ in 0..*power {
            factors.push(symbol(var));
        }
    }
    if factors.len() == 1 {
        factors.remove(0)
    } else {
        format!("(* {})", factors.join(" "))
    }
}

pub fn polynomial_to_smtlib(poly: &Polynomial) -> String {
    let mut terms: Vec<String> = poly.terms().map(|(m, c)| term_to_smtlib(m, c)).collect();
    match terms.len() {
        0 => rational_to_smtlib(&BigRational::zero()),
        1 => terms.remove(0),
        _ => format!("(+ {})", terms.join(" ")),
    }
}

fn atom_to_smtlib(atom: &Atom) -> String {
    let poly = polynomial_to_smtlib(&atom.poly);
    let op = match atom.relation {
        Relation::Lt => "<",
        Relation::Le => "<=",
        Relation::Eq | Relation::Ne => "=",
        Relation::Ge => ">=",
        Relation::Gt => ">",
    };
    let relation = format!("({} {} 0.0)", op, poly);
    if atom.relation == Relation::Ne {
        format!("(not {})", relation)
    } else {
        relation
    }
}

pub fn formula_to_smtlib(formula: &Formula) -> String {
    let join = |op: &str, parts: &[Formula], empty: &str| -> String {
        match parts {
            [] => empty.to_string(),
            [single] => formula_to_smtlib(single),
            _ => {
                let inner: Vec<String> = parts.iter().map(formula_to_smtlib).collect();
                format!("({} {})", op, inner.join(" "))
            }
        }
    };
    match formula {
        Formula::True => "true".to_string(),
        Formula::False => "false".to_string(),
        Formula::Atom(atom) => atom_to_smtlib(atom),
        Formula::And(parts) => join("and", parts, "true"),
        Formula::Or(parts) => join("or", parts, "false"),
        Formula::Not(inner) => format!("(not {})", formula_to_smtlib(inner)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use test_log::test;

    use super::*;
    use crate::interval::Interval;
    use crate::polynomial::ratio;

    #[test]
    fn test_rationals() {
        assert_eq!(rational_to_smtlib(&ratio(3, 1)), "3.0");
        assert_eq!(rational_to_smtlib(&ratio(-1, 2)), "(- (/ 1.0 2.0))");
        assert_eq!(rational_to_smtlib(&ratio(0, 1)), "0.0");
    }

    #[test]
    fn test_polynomials() {
        let p = Polynomial::var("p");
        assert_eq!(polynomial_to_smtlib(&Polynomial::zero()), "0.0");
        assert_eq!(polynomial_to_smtlib(&p), "|p|");

        // p^2 - 2p
        let poly = &(&p * &p) - &p.scale(&ratio(2, 1));
        let text = polynomial_to_smtlib(&poly);
        assert!(text.starts_with("(+ "));
        assert!(text.contains("(* |p| |p|)"));
        assert!(text.contains("(* (- 2.0) |p|)"));
    }

    #[test]
    fn test_relations() {
        let p = Polynomial::var("p");
        let ne = Formula::Atom(Atom::new(p.clone(), Relation::Ne));
        assert_eq!(formula_to_smtlib(&ne), "(not (= |p| 0.0))");
        let both = Formula::And(vec![
            Formula::Atom(Atom::new(p.clone(), Relation::Gt)),
            Formula::Atom(Atom::new(p, Relation::Le)),
        ]);
        assert_eq!(formula_to_smtlib(&both), "(and (> |p| 0.0) (<= |p| 0.0))");
        assert_eq!(formula_to_smtlib(&Formula::Or(Vec::new())), "false");
        assert_eq!(formula_to_smtlib(&Formula::And(Vec::new())), "true");
    }

    #[test]
    fn test_script_declares_and_bounds() {
        let mut domains = BTreeMap::new();
        domains.insert("p".to_string(), Interval::closed(ratio(1, 10), ratio(9, 10)));
        domains.insert("q".to_string(), Interval::positive());
        let formula = Formula::Atom(Atom::new(&Polynomial::var("p") - &Polynomial::var("r"), Relation::Lt));
        let script = to_smtlib(&Query::new(domains, formula));
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(
            lines,
            vec![
                "(declare-const |p| Real)",
                "(declare-const |q| Real)",
                "(declare-const |r| Real)",
                "(assert (<= (/ 1.0 10.0) |p|))",
                "(assert (<= |p| (/ 9.0 10.0)))",
                "(assert (< 0.0 |q|))",
                "(assert (< (+ |p| (* (- 1.0) |r|)) 0.0))",
            ]
        );
    }
}
