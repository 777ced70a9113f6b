//! Multivariate polynomials with exact rational coefficients.
//!
//! A [`Polynomial`] is a sparse map from [`Monomial`]s to non-zero
//! [`BigRational`] coefficients. Transition weights, state-value encodings and
//! derivatives are all built from these.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// A product of variables raised to positive powers, sorted by variable name.
///
/// The empty monomial is the constant 1.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Monomial(Vec<(String, u32)>);

impl Monomial {
    /// The constant monomial.
    pub fn one() -> Self {
        Monomial(Vec::new())
    }

    /// A single variable.
    pub fn var(name: &str) -> Self {
        Monomial(vec![(name.to_string(), 1)])
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    /// Variables and their exponents.
    pub fn factors(&self) -> &[(String, u32)] {
        &self.0
    }

    /// Exponent of `var` in this monomial (0 if absent).
    pub fn degree_in(&self, var: &str) -> u32 {
        self.0.iter().find(|(v, _)| v == var).map_or(0, |(_, e)| *e)
    }

    /// Total degree.
    pub fn degree(&self) -> u32 {
        self.0.iter().map(|(_, e)| e).sum()
    }

    fn mul(&self, other: &Monomial) -> Monomial {
        let mut factors: BTreeMap<&str, u32> = BTreeMap::new();
        for (v, e) in self.0.iter().chain(other.0.iter()) {
            *factors.entry(v.as_str()).or_insert(0) += e;
        }
        Monomial(factors.into_iter().map(|(v, e)| (v.to_string(), e)).collect())
    }

    /// Removes `var` from the monomial, returning the remaining monomial and the removed exponent.
    fn split_off(&self, var: &str) -> (Monomial, u32) {
        let mut rest = Vec::with_capacity(self.0.len());
        let mut exp = 0;
        for (v, e) in &self.0 {
            if v == var {
                exp = *e;
            } else {
                rest.push((v.clone(), *e));
            }
        }
        (Monomial(rest), exp)
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            return write!(f, "1");
        }
        for (i, (v, e)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            if *e == 1 {
                write!(f, "{}", v)?;
            } else {
                write!(f, "{}^{}", v, e)?;
            }
        }
        Ok(())
    }
}

/// A multivariate polynomial over the rationals.
///
/// # Examples
///
/// ```
/// use reach_order::polynomial::Polynomial;
///
/// let p = Polynomial::var("p");
/// let one_minus_p = &Polynomial::one() - &p;
/// let product = &p * &one_minus_p;
/// assert_eq!(product.to_string(), "p - p^2");
/// assert_eq!(product.derivative("p").to_string(), "1 - 2*p");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Polynomial {
    terms: BTreeMap<Monomial, BigRational>,
}

impl Polynomial {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(BigRational::one())
    }

    /// A constant polynomial.
    pub fn constant(value: BigRational) -> Self {
        let mut terms = BTreeMap::new();
        if !value.is_zero() {
            terms.insert(Monomial::one(), value);
        }
        Self { terms }
    }

    /// A constant polynomial from an integer.
    pub fn from_int(value: i64) -> Self {
        Self::constant(BigRational::from_integer(BigInt::from(value)))
    }

    /// The polynomial consisting of a single variable.
    pub fn var(name: &str) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(Monomial::var(name), BigRational::one());
        Self { terms }
    }

    /// Builds a polynomial from `(coefficient, monomial)` pairs, combining equal monomials.
    pub fn from_terms(terms: impl IntoIterator<Item = (BigRational, Monomial)>) -> Self {
        let mut result = Self::zero();
        for (c, m) in terms {
            result.add_term(m, c);
        }
        result
    }

    fn add_term(&mut self, monomial: Monomial, coeff: BigRational) {
        if coeff.is_zero() {
            return;
        }
        let entry = self.terms.entry(monomial.clone()).or_insert_with(BigRational::zero);
        *entry += coeff;
        if entry.is_zero() {
            self.terms.remove(&monomial);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns true if the polynomial does not depend on any variable.
    pub fn is_constant(&self) -> bool {
        self.terms.keys().all(Monomial::is_one)
    }

    /// Returns the value of a constant polynomial.
    pub fn constant_value(&self) -> Option<BigRational> {
        if self.is_constant() {
            Some(self.constant_term())
        } else {
            None
        }
    }

    /// Coefficient of the constant monomial.
    pub fn constant_term(&self) -> BigRational {
        self.terms.get(&Monomial::one()).cloned().unwrap_or_else(BigRational::zero)
    }

    /// Iterates over `(monomial, coefficient)` pairs in monomial order.
    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &BigRational)> {
        self.terms.iter()
    }

    /// Number of non-zero terms.
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// All variables occurring in the polynomial.
    pub fn variables(&self) -> BTreeSet<String> {
        self.terms
            .keys()
            .flat_map(|m| m.factors().iter().map(|(v, _)| v.clone()))
            .collect()
    }

    /// Number of terms in which `var` occurs.
    pub fn occurrences(&self, var: &str) -> usize {
        self.terms.keys().filter(|m| m.degree_in(var) > 0).count()
    }

    /// Highest exponent of `var`.
    pub fn degree_in(&self, var: &str) -> u32 {
        self.terms.keys().map(|m| m.degree_in(var)).max().unwrap_or(0)
    }

    /// Multiplies every coefficient by `c`.
    pub fn scale(&self, c: &BigRational) -> Polynomial {
        if c.is_zero() {
            return Polynomial::zero();
        }
        Polynomial {
            terms: self.terms.iter().map(|(m, k)| (m.clone(), k * c)).collect(),
        }
    }

    /// Raises the polynomial to a non-negative power.
    pub fn pow(&self, exp: u32) -> Polynomial {
        let mut result = Polynomial::one();
        let mut base = self.clone();
        let mut e = exp;
        while e > 0 {
            if e & 1 == 1 {
                result = &result * &base;
            }
            e >>= 1;
            if e > 0 {
                base = &base * &base;
            }
        }
        result
    }

    /// Partial derivative with respect to `var`.
    pub fn derivative(&self, var: &str) -> Polynomial {
        let mut result = Polynomial::zero();
        for (m, c) in &self.terms {
            let (rest, exp) = m.split_off(var);
            if exp == 0 {
                continue;
            }
            let mut factors = rest.0;
            if exp > 1 {
                factors.push((var.to_string(), exp - 1));
                factors.sort();
            }
            result.add_term(Monomial(factors), c * BigRational::from_integer(BigInt::from(exp)));
        }
        result
    }

    /// Coefficients of the polynomial viewed as univariate in `var`.
    ///
    /// Entry `i` is the coefficient of `var^i`; it does not contain `var`.
    pub fn coefficients_in(&self, var: &str) -> Vec<Polynomial> {
        let degree = self.degree_in(var) as usize;
        let mut coeffs = vec![Polynomial::zero(); degree + 1];
        for (m, c) in &self.terms {
            let (rest, exp) = m.split_off(var);
            coeffs[exp as usize].add_term(rest, c.clone());
        }
        coeffs
    }

    /// Evaluates the polynomial exactly.
    ///
    /// # Panics
    ///
    /// Panics if a variable of the polynomial has no value in `point`.
    pub fn eval(&self, point: &BTreeMap<String, BigRational>) -> BigRational {
        let mut sum = BigRational::zero();
        for (m, c) in &self.terms {
            let mut term = c.clone();
            for (v, e) in m.factors() {
                let value = point
                    .get(v)
                    .unwrap_or_else(|| panic!("No value for variable {} in evaluation point", v));
                term *= num_traits::pow(value.clone(), *e as usize);
            }
            sum += term;
        }
        sum
    }

    /// Evaluates the polynomial in floating point.
    ///
    /// # Panics
    ///
    /// Panics if a variable of the polynomial has no value in `point`.
    pub fn eval_f64(&self, point: &BTreeMap<String, f64>) -> f64 {
        let mut sum = 0.0;
        for (m, c) in &self.terms {
            let mut term = c.to_f64().unwrap_or(f64::NAN);
            for (v, e) in m.factors() {
                let value = point
                    .get(v)
                    .unwrap_or_else(|| panic!("No value for variable {} in evaluation point", v));
                term *= value.powi(*e as i32);
            }
            sum += term;
        }
        sum
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        // Constant first, then by increasing degree.
        let mut terms: Vec<_> = self.terms.iter().collect();
        terms.sort_by(|(a, _), (b, _)| a.degree().cmp(&b.degree()).then_with(|| a.cmp(b)));
        for (i, (m, c)) in terms.into_iter().enumerate() {
            let abs = c.abs();
            if i == 0 {
                if c.is_negative() {
                    write!(f, "-")?;
                }
            } else if c.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            if m.is_one() {
                write!(f, "{}", abs)?;
            } else if abs.is_one() {
                write!(f, "{}", m)?;
            } else {
                write!(f, "{}*{}", abs, m)?;
            }
        }
        Ok(())
    }
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let mut result = self.clone();
        for (m, c) in &rhs.terms {
            result.add_term(m.clone(), c.clone());
        }
        result
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        let mut result = self.clone();
        for (m, c) in &rhs.terms {
            result.add_term(m.clone(), -c.clone());
        }
        result
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        let mut result = Polynomial::zero();
        for (m1, c1) in &self.terms {
            for (m2, c2) in &rhs.terms {
                result.add_term(m1.mul(m2), c1 * c2);
            }
        }
        result
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        Polynomial {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), -c.clone())).collect(),
        }
    }
}

impl Add for Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: Polynomial) -> Polynomial {
        &self + &rhs
    }
}

impl Sub for Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: Polynomial) -> Polynomial {
        &self - &rhs
    }
}

impl Mul for Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: Polynomial) -> Polynomial {
        &self * &rhs
    }
}

impl Neg for Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        -&self
    }
}

/// Shorthand for a rational `n/d`.
///
/// # Panics
///
/// Panics if `d == 0`.
pub fn ratio(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}
