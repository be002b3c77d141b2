//! Error module for the spikefit library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum FitError {
    /// Error for fit names which are not part of the model parameter schema.
    NotFittable(String),
    /// Error for parameter vectors whose length does not match the fit layout.
    ParameterLength { expected: usize, actual: usize },
    /// Error for inconsistent per-sweep data, e.g., mismatched stimulus and target spike sequences.
    DatasetShape(String),
    /// Error for parameter names the model does not declare at all.
    UnknownParameter(String),
    /// Error for parameter values whose shape does not match the declared kind, e.g., a scalar written to a vector parameter.
    ParameterShape(String),
    /// Error for invalid parameters, e.g., a non-positive time step.
    InvalidParameter(String),
    /// Error from the simulation entry points of the model.
    Simulation(String),
    /// Error for I/O operations.
    Io(String),
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FitError::NotFittable(name) => {
                write!(f, "Parameter {} is not fittable on this model", name)
            }
            FitError::ParameterLength { expected, actual } => write!(
                f,
                "Parameter vector length mismatch: the fit layout requires {} slots but {} were provided",
                expected, actual
            ),
            FitError::DatasetShape(e) => write!(f, "Inconsistent sweep data: {}", e),
            FitError::UnknownParameter(name) => {
                write!(f, "Unknown model parameter: {}", name)
            }
            FitError::ParameterShape(e) => write!(f, "Parameter shape mismatch: {}", e),
            FitError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            FitError::Simulation(e) => write!(f, "Simulation error: {}", e),
            FitError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for FitError {}
