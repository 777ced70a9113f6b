//! Rational functions: quotients of two polynomials.
//!
//! Transition weights of a parametric model are rational functions over the
//! model parameters. A constant denominator is always folded into the
//! numerator, so polynomial weights have denominator exactly 1.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::polynomial::Polynomial;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RationalFunction {
    num: Polynomial,
    den: Polynomial,
}

impl RationalFunction {
    /// Creates `num / den`.
    ///
    /// # Panics
    ///
    /// Panics if `den` is the zero polynomial.
    pub fn new(num: Polynomial, den: Polynomial) -> Self {
        assert!(!den.is_zero(), "Denominator of a rational function must be non-zero");
        let mut f = Self { num, den };
        f.normalize();
        f
    }

    fn normalize(&mut self) {
        if self.num.is_zero() {
            self.den = Polynomial::one();
            return;
        }
        if let Some(c) = self.den.constant_value() {
            if !c.is_one() {
                self.num = self.num.scale(&(BigRational::one() / c));
                self.den = Polynomial::one();
            }
        } else if self.num == self.den {
            self.num = Polynomial::one();
            self.den = Polynomial::one();
        }
    }

    pub fn zero() -> Self {
        Self::from(Polynomial::zero())
    }

    pub fn one() -> Self {
        Self::from(Polynomial::one())
    }

    pub fn constant(value: BigRational) -> Self {
        Self::from(Polynomial::constant(value))
    }

    pub fn var(name: &str) -> Self {
        Self::from(Polynomial::var(name))
    }

    pub fn numerator(&self) -> &Polynomial {
        &self.num
    }

    pub fn denominator(&self) -> &Polynomial {
        &self.den
    }

    /// Returns true if the denominator is the constant 1.
    pub fn is_polynomial(&self) -> bool {
        self.den.is_constant()
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    /// Returns true if the function does not depend on any parameter.
    pub fn is_constant(&self) -> bool {
        self.num.is_constant() && self.den.is_constant()
    }

    pub fn constant_value(&self) -> Option<BigRational> {
        match (self.num.constant_value(), self.den.constant_value()) {
            (Some(n), Some(d)) => Some(n / d),
            _ => None,
        }
    }

    /// All parameters occurring in numerator or denominator.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars = self.num.variables();
        vars.extend(self.den.variables());
        vars
    }

    /// Inverse of the function.
    ///
    /// Returns `None` for the zero function.
    pub fn recip(&self) -> Option<RationalFunction> {
        if self.is_zero() {
            None
        } else {
            Some(RationalFunction::new(self.den.clone(), self.num.clone()))
        }
    }

    pub fn pow(&self, exp: u32) -> RationalFunction {
        RationalFunction::new(self.num.pow(exp), self.den.pow(exp))
    }

    /// Numerator of the partial derivative with respect to `var`.
    ///
    /// The derivative is `(n' d - n d') / d^2`. Since the squared denominator is
    /// positive wherever the function is defined, this numerator alone decides
    /// the sign of the derivative.
    pub fn derivative_numerator(&self, var: &str) -> Polynomial {
        if self.is_polynomial() {
            return self.num.derivative(var);
        }
        &(&self.num.derivative(var) * &self.den) - &(&self.num * &self.den.derivative(var))
    }

    /// Partial derivative with respect to `var`.
    pub fn derivative(&self, var: &str) -> RationalFunction {
        RationalFunction::new(self.derivative_numerator(var), self.den.pow(2))
    }

    /// Evaluates the function exactly. Returns `None` if the denominator vanishes.
    pub fn eval(&self, point: &BTreeMap<String, BigRational>) -> Option<BigRational> {
        let d = self.den.eval(point);
        if d.is_zero() {
            None
        } else {
            Some(self.num.eval(point) / d)
        }
    }

    /// Evaluates the function in floating point.
    pub fn eval_f64(&self, point: &BTreeMap<String, f64>) -> f64 {
        self.num.eval_f64(point) / self.den.eval_f64(point)
    }
}

impl From<Polynomial> for RationalFunction {
    fn from(num: Polynomial) -> Self {
        Self {
            num,
            den: Polynomial::one(),
        }
    }
}

impl fmt::Display for RationalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_polynomial() {
            write!(f, "{}", self.num)
        } else {
            write!(f, "({})/({})", self.num, self.den)
        }
    }
}

impl Add for &RationalFunction {
    type Output = RationalFunction;

    fn add(self, rhs: &RationalFunction) -> RationalFunction {
        if self.den == rhs.den {
            return RationalFunction::new(&self.num + &rhs.num, self.den.clone());
        }
        RationalFunction::new(
            &(&self.num * &rhs.den) + &(&rhs.num * &self.den),
            &self.den * &rhs.den,
        )
    }
}

impl Sub for &RationalFunction {
    type Output = RationalFunction;

    fn sub(self, rhs: &RationalFunction) -> RationalFunction {
        self + &(-rhs)
    }
}

impl Mul for &RationalFunction {
    type Output = RationalFunction;

    fn mul(self, rhs: &RationalFunction) -> RationalFunction {
        RationalFunction::new(&self.num * &rhs.num, &self.den * &rhs.den)
    }
}

impl Neg for &RationalFunction {
    type Output = RationalFunction;

    fn neg(self) -> RationalFunction {
        RationalFunction {
            num: -&self.num,
            den: self.den.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::polynomial::ratio;

    #[test]
    fn test_constant_denominator_is_folded() {
        let f = RationalFunction::new(Polynomial::var("p"), Polynomial::from_int(2));
        assert!(f.is_polynomial());
        assert_eq!(f.to_string(), "1/2*p");
    }

    #[test]
    fn test_sum_to_one() {
        let p = RationalFunction::var("p");
        let rest = &RationalFunction::one() - &p;
        let total = &p + &rest;
        assert_eq!(total.constant_value(), Some(BigRational::one()));
    }

    #[test]
    fn test_quotient_sum() {
        // p/(p+q) + q/(p+q) == 1
        let p = Polynomial::var("p");
        let q = Polynomial::var("q");
        let den = &p + &q;
        let f = RationalFunction::new(p, den.clone());
        let g = RationalFunction::new(q, den);
        let total = &f + &g;
        assert!(total.is_constant());
        assert_eq!(total.constant_value(), Some(BigRational::one()));
    }

    #[test]
    fn test_derivative_numerator_sign() {
        // p/(1+p) has derivative 1/(1+p)^2 > 0
        let p = Polynomial::var("p");
        let f = RationalFunction::new(p.clone(), &Polynomial::one() + &p);
        assert_eq!(f.derivative_numerator("p"), Polynomial::one());
        let at: BTreeMap<String, BigRational> = [("p".to_string(), ratio(1, 1))].into_iter().collect();
        assert_eq!(f.derivative("p").eval(&at), Some(ratio(1, 4)));
    }

    #[test]
    fn test_eval_undefined() {
        let p = Polynomial::var("p");
        let f = RationalFunction::new(Polynomial::one(), p);
        let at: BTreeMap<String, BigRational> = [("p".to_string(), ratio(0, 1))].into_iter().collect();
        assert_eq!(f.eval(&at), None);
        assert!(RationalFunction::zero().recip().is_none());
    }
}
