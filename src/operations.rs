//! Arithmetic operation vocabulary shared with the service under test.
//!
//! The driver computes expected calculation results locally and compares them
//! against what the service returns, so the wire names and evaluation rules
//! here must match the service exactly.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operations accepted by the calculations endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

/// Evaluation failure for operand combinations the service rejects.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("cannot divide by zero")]
    DivisionByZero,
}

impl Operation {
    /// Wire-format name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
        }
    }

    /// Evaluate the operation on two operands. Division by zero is an error,
    /// matching the service's rejection of such requests.
    pub fn evaluate(&self, a: f64, b: f64) -> Result<f64, EvalError> {
        match self {
            Operation::Add => Ok(a + b),
            Operation::Subtract => Ok(a - b),
            Operation::Multiply => Ok(a * b),
            Operation::Divide => {
                if b == 0.0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }
            Operation::Power => Ok(a.powf(b)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare a reported result against a locally computed expectation.
///
/// Results travel as JSON numbers, so exact bit equality cannot be assumed
/// for non-integer values.
pub fn results_match(expected: f64, actual: f64) -> bool {
    (expected - actual).abs() < 1e-9
}
