//! Exact interval arithmetic over the extended rationals.
//!
//! Each endpoint of an [`Interval`] is finite or infinite, and open or closed.
//! Open endpoints are what allow strict facts such as `d * (1 - d) > 0` for
//! `d` in `(0, 1)` to be proven. Products follow the convention `0 * inf = 0`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::polynomial::Polynomial;

/// An extended rational number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ext {
    NegInf,
    Finite(BigRational),
    PosInf,
}

impl Ext {
    pub fn zero() -> Self {
        Ext::Finite(BigRational::zero())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Ext::Finite(x) if x.is_zero())
    }

    pub fn finite(&self) -> Option<&BigRational> {
        match self {
            Ext::Finite(x) => Some(x),
            _ => None,
        }
    }

    fn signum(&self) -> i8 {
        match self {
            Ext::NegInf => -1,
            Ext::PosInf => 1,
            Ext::Finite(x) if x.is_positive() => 1,
            Ext::Finite(x) if x.is_negative() => -1,
            Ext::Finite(_) => 0,
        }
    }

    fn neg(&self) -> Ext {
        match self {
            Ext::NegInf => Ext::PosInf,
            Ext::PosInf => Ext::NegInf,
            Ext::Finite(x) => Ext::Finite(-x),
        }
    }

    /// Sum of two endpoints of the same side of an interval.
    ///
    /// # Panics
    ///
    /// Panics on `inf + -inf`, which cannot occur between endpoints of one side.
    fn add(&self, other: &Ext) -> Ext {
        match (self, other) {
            (Ext::Finite(a), Ext::Finite(b)) => Ext::Finite(a + b),
            (Ext::NegInf, Ext::PosInf) | (Ext::PosInf, Ext::NegInf) => {
                panic!("Indeterminate sum of opposite infinities")
            }
            (Ext::NegInf, _) | (_, Ext::NegInf) => Ext::NegInf,
            _ => Ext::PosInf,
        }
    }

    fn mul(&self, other: &Ext) -> Ext {
        match (self, other) {
            (Ext::Finite(a), Ext::Finite(b)) => Ext::Finite(a * b),
            _ => match self.signum() * other.signum() {
                0 => Ext::zero(),
                s if s > 0 => Ext::PosInf,
                _ => Ext::NegInf,
            },
        }
    }

    fn pow(&self, exp: u32) -> Ext {
        match self {
            Ext::Finite(x) => Ext::Finite(num_traits::pow(x.clone(), exp as usize)),
            Ext::PosInf => Ext::PosInf,
            Ext::NegInf if exp % 2 == 0 => Ext::PosInf,
            Ext::NegInf => Ext::NegInf,
        }
    }
}

impl PartialOrd for Ext {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ext {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Ext::Finite(a), Ext::Finite(b)) => a.cmp(b),
            (Ext::NegInf, Ext::NegInf) | (Ext::PosInf, Ext::PosInf) => Ordering::Equal,
            (Ext::NegInf, _) | (_, Ext::PosInf) => Ordering::Less,
            (Ext::PosInf, _) | (_, Ext::NegInf) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Ext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ext::NegInf => write!(f, "-inf"),
            Ext::PosInf => write!(f, "inf"),
            Ext::Finite(x) => write!(f, "{}", x),
        }
    }
}

/// One end of an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub value: Ext,
    pub open: bool,
}

impl Bound {
    fn closed(value: Ext) -> Self {
        let open = !matches!(value, Ext::Finite(_));
        Bound { value, open }
    }

    fn open(value: Ext) -> Self {
        Bound { value, open: true }
    }

    fn is_closed_zero(&self) -> bool {
        !self.open && self.value.is_zero()
    }

    /// Product of two endpoints; attained if both are attained or one is an attained zero.
    fn mul(&self, other: &Bound) -> Bound {
        let value = self.value.mul(&other.value);
        let closed = (!self.open && !other.open) || self.is_closed_zero() || other.is_closed_zero();
        Bound {
            open: !closed || !matches!(value, Ext::Finite(_)),
            value,
        }
    }
}

/// A non-empty interval of extended rationals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    lo: Bound,
    hi: Bound,
}

impl Interval {
    /// Creates an interval from its bounds. Infinite bounds are always open.
    pub fn new(lo: Bound, hi: Bound) -> Self {
        let fix = |b: Bound| Bound {
            open: b.open || !matches!(b.value, Ext::Finite(_)),
            value: b.value,
        };
        Interval { lo: fix(lo), hi: fix(hi) }
    }

    pub fn point(x: BigRational) -> Self {
        Interval::closed(x.clone(), x)
    }

    /// `[lo, hi]`
    pub fn closed(lo: BigRational, hi: BigRational) -> Self {
        Interval::new(Bound::closed(Ext::Finite(lo)), Bound::closed(Ext::Finite(hi)))
    }

    /// `(lo, hi)`
    pub fn open(lo: BigRational, hi: BigRational) -> Self {
        Interval::new(Bound::open(Ext::Finite(lo)), Bound::open(Ext::Finite(hi)))
    }

    /// `(0, 1)`
    pub fn unit_open() -> Self {
        Interval::open(BigRational::zero(), BigRational::one())
    }

    /// `(0, inf)`
    pub fn positive() -> Self {
        Interval::new(Bound::open(Ext::zero()), Bound::open(Ext::PosInf))
    }

    /// `(-inf, inf)`
    pub fn unbounded() -> Self {
        Interval::new(Bound::open(Ext::NegInf), Bound::open(Ext::PosInf))
    }

    pub fn lo(&self) -> &Bound {
        &self.lo
    }

    pub fn hi(&self) -> &Bound {
        &self.hi
    }

    pub fn is_empty(&self) -> bool {
        match self.lo.value.cmp(&self.hi.value) {
            Ordering::Greater => true,
            Ordering::Equal => self.lo.open || self.hi.open,
            Ordering::Less => false,
        }
    }

    pub fn contains(&self, x: &BigRational) -> bool {
        let x = Ext::Finite(x.clone());
        let above_lo = match self.lo.value.cmp(&x) {
            Ordering::Less => true,
            Ordering::Equal => !self.lo.open,
            Ordering::Greater => false,
        };
        let below_hi = match x.cmp(&self.hi.value) {
            Ordering::Less => true,
            Ordering::Equal => !self.hi.open,
            Ordering::Greater => false,
        };
        above_lo && below_hi
    }

    /// Width of a bounded interval, `None` if unbounded.
    pub fn width(&self) -> Option<BigRational> {
        match (&self.lo.value, &self.hi.value) {
            (Ext::Finite(a), Ext::Finite(b)) => Some(b - a),
            _ => None,
        }
    }

    /// A finite point strictly inside the interval (or the point itself for a degenerate one).
    pub fn midpoint(&self) -> BigRational {
        let one = BigRational::one();
        match (&self.lo.value, &self.hi.value) {
            (Ext::Finite(a), Ext::Finite(b)) => (a + b) / BigRational::from_integer(2.into()),
            (Ext::Finite(a), _) => a + a.abs().max(one),
            (_, Ext::Finite(b)) => b - b.abs().max(one),
            _ => BigRational::zero(),
        }
    }

    /// The point `lo + t * (hi - lo)` for `t` in `(0, 1)`; unbounded sides are mapped by `t / (1 - t)`.
    pub fn at(&self, t: &BigRational) -> BigRational {
        let one = BigRational::one();
        match (&self.lo.value, &self.hi.value) {
            (Ext::Finite(a), Ext::Finite(b)) => a + (b - a) * t,
            (Ext::Finite(a), _) => a + t / (&one - t),
            (_, Ext::Finite(b)) => b - (&one - t) / t,
            _ => (t - (&one - t)) / (t * (&one - t)),
        }
    }

    /// Splits at the midpoint. Both halves are closed at the split point.
    pub fn split(&self) -> (Interval, Interval) {
        let mid = Ext::Finite(self.midpoint());
        (
            Interval::new(self.lo.clone(), Bound::closed(mid.clone())),
            Interval::new(Bound::closed(mid), self.hi.clone()),
        )
    }

    pub fn neg(&self) -> Interval {
        Interval::new(
            Bound { value: self.hi.value.neg(), open: self.hi.open },
            Bound { value: self.lo.value.neg(), open: self.lo.open },
        )
    }

    pub fn add(&self, other: &Interval) -> Interval {
        Interval::new(
            Bound {
                value: self.lo.value.add(&other.lo.value),
                open: self.lo.open || other.lo.open,
            },
            Bound {
                value: self.hi.value.add(&other.hi.value),
                open: self.hi.open || other.hi.open,
            },
        )
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        let corners = [
            self.lo.mul(&other.lo),
            self.lo.mul(&other.hi),
            self.hi.mul(&other.lo),
            self.hi.mul(&other.hi),
        ];
        Interval::new(extreme(&corners, Ordering::Less), extreme(&corners, Ordering::Greater))
    }

    pub fn scale(&self, c: &BigRational) -> Interval {
        if c.is_zero() {
            return Interval::point(BigRational::zero());
        }
        let c = Ext::Finite(c.clone());
        let lo = Bound { value: self.lo.value.mul(&c), open: self.lo.open };
        let hi = Bound { value: self.hi.value.mul(&c), open: self.hi.open };
        if c > Ext::zero() {
            Interval::new(lo, hi)
        } else {
            Interval::new(hi, lo)
        }
    }

    pub fn pow(&self, exp: u32) -> Interval {
        if exp == 0 {
            return Interval::point(BigRational::one());
        }
        let lo = Bound { value: self.lo.value.pow(exp), open: self.lo.open };
        let hi = Bound { value: self.hi.value.pow(exp), open: self.hi.open };
        if exp % 2 == 1 || self.lo.value >= Ext::zero() {
            Interval::new(lo, hi)
        } else if self.hi.value <= Ext::zero() {
            Interval::new(hi, lo)
        } else {
            let top = extreme(&[lo, hi], Ordering::Greater);
            Interval::new(Bound::closed(Ext::zero()), top)
        }
    }

    /// Intersection of two enclosures of the same quantity.
    pub fn intersect(&self, other: &Interval) -> Interval {
        let lo = match self.lo.value.cmp(&other.lo.value) {
            Ordering::Greater => self.lo.clone(),
            Ordering::Less => other.lo.clone(),
            Ordering::Equal => Bound {
                value: self.lo.value.clone(),
                open: self.lo.open || other.lo.open,
            },
        };
        let hi = match self.hi.value.cmp(&other.hi.value) {
            Ordering::Less => self.hi.clone(),
            Ordering::Greater => other.hi.clone(),
            Ordering::Equal => Bound {
                value: self.hi.value.clone(),
                open: self.hi.open || other.hi.open,
            },
        };
        Interval::new(lo, hi)
    }

    /// Every value is `> 0`.
    pub fn is_positive(&self) -> bool {
        let zero = Ext::zero();
        self.lo.value > zero || (self.lo.value == zero && self.lo.open)
    }

    /// Every value is `>= 0`.
    pub fn is_nonnegative(&self) -> bool {
        self.lo.value >= Ext::zero()
    }

    /// Every value is `< 0`.
    pub fn is_negative(&self) -> bool {
        let zero = Ext::zero();
        self.hi.value < zero || (self.hi.value == zero && self.hi.open)
    }

    /// Every value is `<= 0`.
    pub fn is_nonpositive(&self) -> bool {
        self.hi.value <= Ext::zero()
    }

    /// The interval is exactly `[0, 0]`.
    pub fn is_zero(&self) -> bool {
        self.lo.value.is_zero() && self.hi.value.is_zero() && !self.lo.open && !self.hi.open
    }
}

/// Picks the smallest (`Less`) or largest (`Greater`) bound, preferring a closed one on ties.
fn extreme(bounds: &[Bound], direction: Ordering) -> Bound {
    let mut best = bounds[0].clone();
    for b in &bounds[1..] {
        match b.value.cmp(&best.value) {
            ord if ord == direction => best = b.clone(),
            Ordering::Equal => best.open &= b.open,
            _ => {}
        }
    }
    best
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.lo.open { "(" } else { "[" },
            self.lo.value,
            self.hi.value,
            if self.hi.open { ")" } else { "]" }
        )
    }
}

/// Encloses the range of `poly` over a box.
///
/// Variables missing from `domains` are unbounded. The result is the
/// intersection of a term-wise and a nested Horner evaluation.
pub fn enclose(poly: &Polynomial, domains: &BTreeMap<String, Interval>) -> Interval {
    let naive = enclose_terms(poly, domains);
    let horner = enclose_horner(poly, domains);
    naive.intersect(&horner)
}

fn domain_of(domains: &BTreeMap<String, Interval>, var: &str) -> Interval {
    domains.get(var).cloned().unwrap_or_else(Interval::unbounded)
}

fn enclose_terms(poly: &Polynomial, domains: &BTreeMap<String, Interval>) -> Interval {
    let mut acc = Interval::point(BigRational::zero());
    for (m, c) in poly.terms() {
        let mut term = Interval::point(BigRational::one());
        for (v, e) in m.factors() {
            term = term.mul(&domain_of(domains, v).pow(*e));
        }
        acc = acc.add(&term.scale(c));
    }
    acc
}

fn enclose_horner(poly: &Polynomial, domains: &BTreeMap<String, Interval>) -> Interval {
    if let Some(c) = poly.constant_value() {
        return Interval::point(c);
    }
    // Expand in the variable occurring in the most terms.
    let var = poly
        .variables()
        .into_iter()
        .max_by(|a, b| poly.occurrences(a).cmp(&poly.occurrences(b)).then_with(|| b.cmp(a)));
    let Some(var) = var else {
        return enclose_terms(poly, domains);
    };
    let x = domain_of(domains, &var);
    let coeffs = poly.coefficients_in(&var);
    let mut acc = Interval::point(BigRational::zero());
    for c in coeffs.iter().rev() {
        acc = acc.mul(&x).add(&enclose_horner(c, domains));
    }
    acc
}
