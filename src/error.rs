//! Error types for the synth wrapper.
//!
//! Every failure is fail-fast: the operation that raised it leaves the
//! wrapper counters untouched and the caller receives the specific reason.

use thiserror::Error;

use crate::utils::math::FixedPoint;

/// Result type alias for wrapper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the synth wrapper
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Precondition Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller has not authorized the engine to move enough tokens
    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance {
        /// Amount the operation needs to move
        required: FixedPoint,
        /// Amount currently authorized
        available: FixedPoint,
    },

    /// Caller does not hold enough tokens
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount the operation needs to move
        required: FixedPoint,
        /// Balance currently held
        available: FixedPoint,
    },

    /// Collateral reserve has reached the configured ceiling
    #[error("Wrapper is at its collateral ceiling, no capacity left")]
    NoCapacity,

    /// No collateral is held, nothing can be burned against
    #[error("Wrapper holds no collateral reserves")]
    NoReserves,

    /// Oracle reports the rate for this asset as invalid
    #[error("Invalid oracle rate for {0}")]
    InvalidRate(String),

    /// Collateral may only enter through mint
    #[error("Direct transfers to the wrapper are disabled")]
    DirectTransferDisabled,

    /// Mint and burn are suspended
    #[error("Wrapper is paused")]
    Paused,

    /// Accounting invariant does not hold
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller lacks the role required for this action
    #[error("Access denied: {0}")]
    AccessDenied(String),

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Result of a fixed-point computation cannot be represented
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that overflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Configuration / Registry Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// A wrapper already exists for the asset key
    #[error("Wrapper already exists for {0}")]
    InstanceExists(String),

    /// No wrapper registered under the key or address
    #[error("Wrapper not found: {0}")]
    InstanceNotFound(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Lock acquisition failed (poisoned by a panicking holder)
    #[error("Failed to acquire lock")]
    Lock,
}

impl Error {
    /// Shorthand for an overflow in the named operation
    pub fn overflow(operation: impl Into<String>) -> Self {
        Error::ArithmeticOverflow {
            operation: operation.into(),
        }
    }

    /// Returns true if the caller can succeed by resubmitting with
    /// different inputs or after external state changes
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientAllowance { .. }
                | Error::InsufficientBalance { .. }
                | Error::NoCapacity
                | Error::NoReserves
                | Error::InvalidRate(_)
                | Error::Paused
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::ArithmeticOverflow { .. } | Error::InvariantViolation(_) | Error::Lock
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Precondition errors: 1xxx
            Error::InsufficientAllowance { .. } => 1001,
            Error::InsufficientBalance { .. } => 1002,
            Error::NoCapacity => 1003,
            Error::NoReserves => 1004,
            Error::DirectTransferDisabled => 1005,
            Error::Paused => 1006,
            Error::InvariantViolation(_) => 1007,

            // Arithmetic errors: 2xxx
            Error::ArithmeticOverflow { .. } => 2001,

            // Oracle errors: 3xxx
            Error::InvalidRate(_) => 3001,

            // Authorization errors: 4xxx
            Error::AccessDenied(_) => 4001,

            // Registry / configuration errors: 5xxx
            Error::InvalidParameter { .. } => 5001,
            Error::InstanceExists(_) => 5002,
            Error::InstanceNotFound(_) => 5003,
            Error::Config(_) => 5004,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,

            // Internal errors: 9xxx
            Error::Lock => 9001,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::Lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let codes = vec![
            Error::InsufficientAllowance { required: FixedPoint::ZERO, available: FixedPoint::ZERO }.code(),
            Error::InsufficientBalance { required: FixedPoint::ZERO, available: FixedPoint::ZERO }.code(),
            Error::NoCapacity.code(),
            Error::NoReserves.code(),
            Error::InvalidRate("sETH".into()).code(),
            Error::DirectTransferDisabled.code(),
            Error::Paused.code(),
            Error::AccessDenied("".into()).code(),
            Error::overflow("x").code(),
            Error::InstanceExists("".into()).code(),
            Error::InstanceNotFound("".into()).code(),
            Error::Lock.code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientBalance {
            required: FixedPoint::from_integer(1000),
            available: FixedPoint::from_integer(500),
        };
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::NoCapacity.is_recoverable());
        assert!(Error::Paused.is_recoverable());
        assert!(!Error::DirectTransferDisabled.is_recoverable());
        assert!(!Error::AccessDenied("owner".into()).is_recoverable());
    }

    #[test]
    fn test_is_critical() {
        assert!(Error::overflow("mul_round").is_critical());
        assert!(Error::InvariantViolation("escrow".into()).is_critical());
        assert!(!Error::NoReserves.is_critical());
    }
}
