//! Parser for transition weights.
//!
//! Grammar (whitespace is ignored):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | power
//! power  := atom ('^' integer)?
//! atom   := number | ident | '(' expr ')'
//! ```
//!
//! Decimal numbers are converted exactly, so `0.3` is `3/10`.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Num, Zero};

use crate::error::ParseError;
use crate::function::RationalFunction;

/// Parses a rational function.
///
/// # Examples
///
/// ```
/// use reach_order::parse::parse_function;
///
/// let f = parse_function("1 - p*q/2").unwrap();
/// assert_eq!(f.to_string(), "1 - 1/2*p*q");
/// ```
pub fn parse_function(input: &str) -> Result<RationalFunction, ParseError> {
    let mut parser = Parser::new(input);
    let f = parser.expr()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(f),
        Some(c) => Err(parser.unexpected(c)),
    }
}

/// Parses an exact decimal or fraction literal such as `0.25`, `3` or `1/3`.
pub fn parse_number(text: &str) -> Result<BigRational, ParseError> {
    let text = text.trim();
    let invalid = || ParseError::InvalidNumber { text: text.to_string() };
    if let Some((n, d)) = text.split_once('/') {
        let n = parse_number(n)?;
        let d = parse_number(d)?;
        if d.is_zero() {
            return Err(invalid());
        }
        return Ok(n / d);
    }
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let mantissa = format!("{}{}", int_part, frac_part);
    let numer = BigInt::from_str_radix(&mantissa, 10).map_err(|_| invalid())?;
    let denom = num_traits::pow(BigInt::from(10), frac_part.len());
    let value = BigRational::new(numer, denom);
    Ok(if negative { -value } else { value })
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, found: char) -> ParseError {
        ParseError::UnexpectedChar {
            found,
            position: self.pos,
            input: self.input.to_string(),
        }
    }

    fn end(&self) -> ParseError {
        ParseError::UnexpectedEnd {
            input: self.input.to_string(),
        }
    }

    fn expr(&mut self) -> Result<RationalFunction, ParseError> {
        let mut acc = self.term()?;
        loop {
            if self.eat('+') {
                let rhs = self.term()?;
                acc = &acc + &rhs;
            } else if self.eat('-') {
                let rhs = self.term()?;
                acc = &acc - &rhs;
            } else {
                return Ok(acc);
            }
        }
    }

    fn term(&mut self) -> Result<RationalFunction, ParseError> {
        let mut acc = self.unary()?;
        loop {
            if self.eat('*') {
                let rhs = self.unary()?;
                acc = &acc * &rhs;
            } else if self.eat('/') {
                let rhs = self.unary()?;
                let inv = rhs.recip().ok_or_else(|| ParseError::DivisionByZero {
                    input: self.input.to_string(),
                })?;
                acc = &acc * &inv;
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<RationalFunction, ParseError> {
        if self.eat('-') {
            let inner = self.unary()?;
            return Ok(-&inner);
        }
        self.power()
    }

    fn power(&mut self) -> Result<RationalFunction, ParseError> {
        let base = self.atom()?;
        if self.eat('^') {
            self.skip_ws();
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            let exp: u32 = digits.parse().map_err(|_| ParseError::InvalidExponent {
                input: self.input.to_string(),
            })?;
            return Ok(base.pow(exp));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<RationalFunction, ParseError> {
        self.skip_ws();
        let c = self.peek().ok_or_else(|| self.end())?;
        if c == '(' {
            self.pos += 1;
            let inner = self.expr()?;
            if !self.eat(')') {
                self.skip_ws();
                return Err(match self.peek() {
                    Some(c) => self.unexpected(c),
                    None => self.end(),
                });
            }
            Ok(inner)
        } else if c.is_ascii_digit() || c == '.' {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                self.pos += 1;
            }
            let text: String = self.chars[start..self.pos].iter().collect();
            Ok(RationalFunction::constant(parse_number(&text)?))
        } else if c.is_alphabetic() || c == '_' {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                self.pos += 1;
            }
            let name: String = self.chars[start..self.pos].iter().collect();
            Ok(RationalFunction::var(&name))
        } else {
            Err(self.unexpected(c))
        }
    }
}
