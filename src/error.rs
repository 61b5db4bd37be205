//! Error types.
//!
//! - [`FitError`]: library-level failures (generation, fitting, diagnostics)
//! - [`AppError`]: binary-level failure carrying a process exit code

/// Errors produced by the generate → fit → diagnose pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("invalid histogram: {0}")]
    InvalidHistogram(String),

    #[error("sampling error: {0}")]
    Sampling(String),

    #[error("invalid fit range [{min}, {max}]: {reason}")]
    InvalidRange { min: f64, max: f64, reason: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("empty fit: {0}")]
    EmptyFit(String),

    #[error("{bins} usable bins cannot constrain {params} free parameters")]
    Underdetermined { bins: usize, params: usize },

    #[error("fit did not converge after {iterations} iterations: {reason}")]
    Convergence { iterations: u64, reason: String },

    #[error("parameter '{name}' = {value} is at its limit [{lower}, {upper}]")]
    ParameterAtLimit {
        name: String,
        value: f64,
        lower: f64,
        upper: f64,
    },
}

impl FitError {
    pub(crate) fn invalid_range(min: f64, max: f64, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            min,
            max,
            reason: reason.into(),
        }
    }

    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::InvalidHistogram(_)
            | FitError::Sampling(_)
            | FitError::InvalidRange { .. }
            | FitError::InvalidParameter { .. } => 2,
            FitError::EmptyFit(_) | FitError::Underdetermined { .. } => 3,
            FitError::Convergence { .. } | FitError::ParameterAtLimit { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_exit_codes() {
        let err: AppError = FitError::EmptyFit("no entries".into()).into();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "empty fit: no entries");

        let err: AppError = FitError::invalid_range(30.0, 20.0, "inverted").into();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "invalid fit range [30, 20]: inverted");
    }
}
