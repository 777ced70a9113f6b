//! Parameter regions: boxes of lower/upper bounds per parameter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use num_rational::BigRational;
use num_traits::{FromPrimitive, One, ToPrimitive};

use crate::error::{AnalysisError, ParseError, Result};
use crate::interval::Interval;
use crate::parse::parse_number;

/// A box `lower <= x <= upper` for every parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    bounds: BTreeMap<String, (BigRational, BigRational)>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds bounds for one parameter.
    pub fn with_bound(mut self, name: &str, lower: BigRational, upper: BigRational) -> Result<Self> {
        if lower > upper {
            return Err(AnalysisError::InvalidRegion {
                reason: format!("lower bound {} of {} exceeds upper bound {}", lower, name, upper),
            });
        }
        self.bounds.insert(name.to_string(), (lower, upper));
        Ok(self)
    }

    /// Parses a region such as `0.1<=p<=0.9, 0.2<=q<=0.5`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut region = Region::new();
        for part in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let pieces: Vec<&str> = part.split("<=").map(str::trim).collect();
            let [lower, name, upper] = pieces.as_slice() else {
                return Err(ParseError::MalformedBound { text: part.to_string() }.into());
            };
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(ParseError::MalformedBound { text: part.to_string() }.into());
            }
            region = region.with_bound(name, parse_number(lower)?, parse_number(upper)?)?;
        }
        Ok(region)
    }

    /// The default region `[precision, 1 - precision]` for every parameter.
    pub fn default_for(parameters: &BTreeSet<String>, precision: f64) -> Result<Self> {
        let lower = BigRational::from_f64(precision).ok_or_else(|| AnalysisError::InvalidRegion {
            reason: format!("precision {} is not a finite number", precision),
        })?;
        let upper = BigRational::one() - &lower;
        let mut region = Region::new();
        for p in parameters {
            region = region.with_bound(p, lower.clone(), upper.clone())?;
        }
        Ok(region)
    }

    pub fn bounds(&self, name: &str) -> Option<&(BigRational, BigRational)> {
        self.bounds.get(name)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &String> {
        self.bounds.keys()
    }

    /// Fails if any of the given parameters has no bounds.
    pub fn check_covers(&self, parameters: &BTreeSet<String>) -> Result<()> {
        match parameters.iter().find(|p| !self.bounds.contains_key(*p)) {
            Some(p) => Err(AnalysisError::UnboundedParameter { name: p.clone() }),
            None => Ok(()),
        }
    }

    /// Closed intervals for every parameter, as domains of a decision procedure query.
    pub fn domains(&self) -> BTreeMap<String, Interval> {
        self.bounds
            .iter()
            .map(|(p, (lo, hi))| (p.clone(), Interval::closed(lo.clone(), hi.clone())))
            .collect()
    }

    /// `n` points on the diagonal of the box, from the lower to the upper corner.
    ///
    /// A single point is the center of the box.
    pub fn diagonal_samples(&self, n: usize) -> Vec<BTreeMap<String, f64>> {
        (0..n)
            .map(|i| {
                let t = if n == 1 { 0.5 } else { i as f64 / (n - 1) as f64 };
                self.bounds
                    .iter()
                    .map(|(p, (lo, hi))| (p.clone(), lerp(lo, hi, t)))
                    .collect()
            })
            .collect()
    }

    /// `n >= 2` points varying only `param` from its lower to its upper bound, all
    /// other parameters fixed at their lower bound.
    pub fn sweep(&self, param: &str, n: usize) -> Vec<BTreeMap<String, f64>> {
        (0..n)
            .map(|i| {
                let t = i as f64 / (n.max(2) - 1) as f64;
                self.bounds
                    .iter()
                    .map(|(p, (lo, hi))| {
                        let value = if p == param { lerp(lo, hi, t) } else { to_f64(lo) };
                        (p.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

fn to_f64(x: &BigRational) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

fn lerp(lo: &BigRational, hi: &BigRational, t: f64) -> f64 {
    let (lo, hi) = (to_f64(lo), to_f64(hi));
    lo + (hi - lo) * t
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (p, (lo, hi))) in self.bounds.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}<={}<={}", lo, p, hi)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::polynomial::ratio;

    #[test]
    fn test_parse_region() {
        let region = Region::parse("0.1<=p<=0.9, 1/4 <= q <= 1/2").unwrap();
        assert_eq!(region.bounds("p"), Some(&(ratio(1, 10), ratio(9, 10))));
        assert_eq!(region.bounds("q"), Some(&(ratio(1, 4), ratio(1, 2))));
        assert_eq!(region.to_string(), "1/10<=p<=9/10, 1/4<=q<=1/2");
    }

    #[test]
    fn test_parse_region_errors() {
        assert!(matches!(
            Region::parse("0.1<=p"),
            Err(AnalysisError::Parse(ParseError::MalformedBound { .. }))
        ));
        assert!(matches!(Region::parse("0.9<=p<=0.1"), Err(AnalysisError::InvalidRegion { .. })));
    }

    #[test]
    fn test_default_region_and_coverage() {
        let params: BTreeSet<String> = ["p".to_string(), "q".to_string()].into_iter().collect();
        let region = Region::default_for(&params, 0.25).unwrap();
        assert_eq!(region.bounds("q"), Some(&(ratio(1, 4), ratio(3, 4))));
        assert!(region.check_covers(&params).is_ok());

        let partial = Region::parse("0<=p<=1").unwrap();
        assert!(matches!(
            partial.check_covers(&params),
            Err(AnalysisError::UnboundedParameter { name }) if name == "q"
        ));
    }

    #[test]
    fn test_samples() {
        let region = Region::parse("0<=p<=1, 0.5<=q<=1").unwrap();
        let diag = region.diagonal_samples(3);
        assert_eq!(diag.len(), 3);
        assert_eq!(diag[1]["p"], 0.5);
        assert_eq!(diag[1]["q"], 0.75);

        let sweep = region.sweep("q", 3);
        assert_eq!(sweep[2]["q"], 1.0);
        assert!(sweep.iter().all(|pt| pt["p"] == 0.0));
    }
}
