use thiserror::Error;

use crate::controller::Status;
use crate::parse::ParseError;
use crate::transport::TransportError;
use crate::CompileError;

/// Unified error type covering parsing, compilation, JSON and I/O.
///
/// Returned by convenience methods like [`RuleSet::from_dsl()`](crate::RuleSet::from_dsl),
/// [`RuleSet::from_file()`](crate::RuleSet::from_file) and
/// [`RuleSet::from_json_str()`](crate::RuleSet::from_json_str).
#[derive(Debug, Error)]
pub enum PricingError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by the
/// [`RegistrationController`](crate::controller::RegistrationController).
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("cannot {action} while {status}")]
    InvalidTransition { action: &'static str, status: Status },

    #[error("no camper at index {index} ({count} campers)")]
    NoSuchCamper { index: usize, count: usize },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message() {
        let err = ControllerError::InvalidTransition {
            action: "edit",
            status: Status::Fetching,
        };
        assert_eq!(err.to_string(), "cannot edit while fetching");
    }

    #[test]
    fn compile_error_converts() {
        let err: PricingError = CompileError::EmptyName {
            scope: crate::Scope::Camper,
        }
        .into();
        assert!(matches!(err, PricingError::Compile(_)));
    }
}
