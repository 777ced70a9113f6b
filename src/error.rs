//! Error types of the analysis.
//!
//! Only model-shape problems are errors. An inconclusive decision procedure is
//! reported as [`SatResult::Unknown`][crate::smt::SatResult::Unknown] and an
//! unresolvable state degrades its branch to a partial order; neither shows up here.

use thiserror::Error;

use crate::types::State;

/// Failure to parse a weight expression or a region description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of input in `{input}`")]
    UnexpectedEnd { input: String },

    #[error("unexpected character `{found}` at position {position} in `{input}`")]
    UnexpectedChar { found: char, position: usize, input: String },

    #[error("invalid number `{text}`")]
    InvalidNumber { text: String },

    #[error("division by zero in `{input}`")]
    DivisionByZero { input: String },

    #[error("exponent must be a non-negative integer in `{input}`")]
    InvalidExponent { input: String },

    #[error("malformed region bound `{text}`")]
    MalformedBound { text: String },
}

/// A model-shape error that aborts an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no bottom states: every state reaches the target with positive probability")]
    NoBottomStates,

    #[error("no top states: no state reaches the target with probability one")]
    NoTopStates,

    #[error("unsupported property: {reason}")]
    UnsupportedProperty { reason: String },

    #[error("parameter `{name}` has no bounds in the region")]
    UnboundedParameter { name: String },

    #[error("invalid region: {reason}")]
    InvalidRegion { reason: String },

    #[error("invalid model at state {state}: {reason}")]
    InvalidModel { state: State, reason: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Result alias used throughout the crate.
pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = AnalysisError::InvalidModel {
            state: 3,
            reason: "weights sum to 1/2".to_string(),
        };
        assert_eq!(err.to_string(), "invalid model at state 3: weights sum to 1/2");

        let parse = ParseError::InvalidNumber { text: "1.2.3".to_string() };
        let wrapped: AnalysisError = parse.clone().into();
        assert_eq!(wrapped.to_string(), parse.to_string());
    }
}
