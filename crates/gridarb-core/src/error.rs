// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use thiserror::Error;

/// Errors raised by the optimisation core.
///
/// Everything except `SolverContract` is a configuration problem detected before the
/// solver runs. Infeasible models and solver failures are not errors; they come back as
/// a `SolveStatus` inside the result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizeError {
    #[error("Missing {kind} for key '{key}'")]
    MissingKey { kind: &'static str, key: String },

    #[error("Series '{series}' has length {actual}, expected {expected}")]
    SeriesLength {
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("Forecast horizon is empty")]
    EmptyHorizon,

    #[error("Negative {parameter} for '{key}': {value}")]
    NegativeParameter {
        parameter: &'static str,
        key: String,
        value: f64,
    },

    #[error("Invalid {parameter} for '{key}': {value}")]
    InvalidValue {
        parameter: &'static str,
        key: String,
        value: f64,
    },

    #[error("Duplicate {kind} '{key}'")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Solver contract violated: {0}")]
    SolverContract(String),
}

impl OptimizeError {
    /// True for every input problem detected before solving
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::SolverContract(_))
    }

    pub(crate) fn missing(kind: &'static str, key: impl Into<String>) -> Self {
        Self::MissingKey {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn series_length(series: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SeriesLength {
            series: series.into(),
            expected,
            actual,
        }
    }
}

pub type OptimizeResult<T> = Result<T, OptimizeError>;

/// Reject negative or non-finite model parameters
pub(crate) fn check_non_negative(
    parameter: &'static str,
    key: &str,
    value: f64,
) -> OptimizeResult<()> {
    if !value.is_finite() {
        return Err(OptimizeError::InvalidValue {
            parameter,
            key: key.to_owned(),
            value,
        });
    }
    if value < 0.0 {
        return Err(OptimizeError::NegativeParameter {
            parameter,
            key: key.to_owned(),
            value,
        });
    }
    Ok(())
}

/// Reject NaN or infinite prices; any sign is allowed
pub(crate) fn check_finite(parameter: &'static str, key: &str, value: f64) -> OptimizeResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(OptimizeError::InvalidValue {
            parameter,
            key: key.to_owned(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_grouping() {
        assert!(OptimizeError::EmptyHorizon.is_configuration());
        assert!(OptimizeError::missing("site", "TX").is_configuration());
        assert!(!OptimizeError::SolverContract("x".to_owned()).is_configuration());
    }

    #[test]
    fn test_messages_name_the_key() {
        let err = OptimizeError::missing("power cap", "TX");
        assert_eq!(err.to_string(), "Missing power cap for key 'TX'");

        let err = OptimizeError::series_length("hash", 3, 2);
        assert!(err.to_string().contains("'hash'"));
    }

    #[test]
    fn test_parameter_checks() {
        assert!(check_non_negative("power", "air", 0.0).is_ok());
        assert!(matches!(
            check_non_negative("power", "air", -1.0),
            Err(OptimizeError::NegativeParameter { .. })
        ));
        assert!(matches!(
            check_non_negative("power", "air", f64::NAN),
            Err(OptimizeError::InvalidValue { .. })
        ));
        assert!(check_finite("energy price", "t0", -5.0).is_ok());
        assert!(check_finite("energy price", "t0", f64::INFINITY).is_err());
    }
}
