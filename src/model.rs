//! Model-facing structures and traits.
//!
//! The experiment harness drives any neuron model through the [`NeuronModel`]
//! trait: parameter introspection via a declared schema, parameter writes by
//! name, and two simulation entry points (free-running and target-driven).
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// The shape of a fittable model parameter.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum ParamKind {
    /// A single numeric value.
    Scalar,
    /// An ordered sequence of numeric values with a fixed length.
    Vector(usize),
}

impl ParamKind {
    /// The number of slots the parameter consumes in a flat parameter vector.
    pub fn num_slots(&self) -> usize {
        match self {
            ParamKind::Scalar => 1,
            ParamKind::Vector(len) => *len,
        }
    }
}

/// A fittable model parameter, as declared by the model parameter schema.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// The name under which the model exposes the parameter.
    pub name: String,
    /// The shape of the parameter.
    pub kind: ParamKind,
}

impl ParamDescriptor {
    /// Create a descriptor for a scalar parameter.
    pub fn scalar(name: &str) -> Self {
        ParamDescriptor {
            name: name.to_string(),
            kind: ParamKind::Scalar,
        }
    }

    /// Create a descriptor for a vector parameter with the specified length.
    pub fn vector(name: &str, len: usize) -> Self {
        ParamDescriptor {
            name: name.to_string(),
            kind: ParamKind::Vector(len),
        }
    }
}

/// A value read from or written to a named model parameter.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ParamValue<'a> {
    Scalar(f64),
    Vector(&'a [f64]),
}

impl<'a> ParamValue<'a> {
    /// Returns the scalar value, or an error if the value is a vector.
    pub fn as_scalar(&self, name: &str) -> Result<f64, FitError> {
        match *self {
            ParamValue::Scalar(value) => Ok(value),
            ParamValue::Vector(_) => Err(FitError::ParameterShape(format!(
                "{} expects a scalar value",
                name
            ))),
        }
    }

    /// Returns the vector value, or an error if the value is a scalar.
    pub fn as_vector(&self, name: &str) -> Result<&'a [f64], FitError> {
        match *self {
            ParamValue::Vector(values) => Ok(values),
            ParamValue::Scalar(_) => Err(FitError::ParameterShape(format!(
                "{} expects a vector value",
                name
            ))),
        }
    }
}

/// The state every sweep simulation starts from.
///
/// The same condition is applied at the top of every sweep; nothing carries
/// over between sweeps.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitialCondition {
    /// Membrane voltage at sweep start, in volts.
    pub voltage: f64,
    /// Firing threshold at sweep start, in volts.
    pub threshold: f64,
    /// After-spike current values at sweep start, one per channel, in amperes.
    pub adaptation_currents: Vec<f64>,
}

/// Per-sweep results of a free-running simulation.
#[derive(Debug, PartialEq, Clone)]
pub struct FreeRun {
    /// Simulated membrane voltage, one sample per grid step.
    pub voltage: Vec<f64>,
    /// Simulated firing threshold, one sample per grid step.
    pub threshold: Vec<f64>,
    /// After-spike currents, one row per channel and one column per grid step.
    pub adaptation_currents: DMatrix<f64>,
    /// Model spike times on the grid, in seconds from sweep start.
    pub grid_spike_times: Vec<f64>,
    /// Model spike times interpolated below the grid resolution, in seconds from sweep start.
    pub interp_spike_times: Vec<f64>,
    /// Grid indices of the model spikes.
    pub grid_spike_indices: Vec<usize>,
    /// Membrane voltage interpolated at each model spike time.
    pub interp_spike_voltages: Vec<f64>,
    /// Firing threshold interpolated at each model spike time.
    pub interp_spike_thresholds: Vec<f64>,
}

/// Per-sweep results of a target-driven simulation.
///
/// The voltage and threshold traces may be shorter than the stimulus: once
/// the model spikes ahead of the upcoming target spike, grid simulation for
/// the remainder of that segment is skipped.
#[derive(Debug, PartialEq, Clone)]
pub struct TargetRun {
    /// Simulated membrane voltage, one sample per simulated grid step.
    pub voltage: Vec<f64>,
    /// Simulated firing threshold, one sample per simulated grid step.
    pub threshold: Vec<f64>,
    /// After-spike currents, one row per channel and one column per simulated grid step.
    pub adaptation_currents: DMatrix<f64>,
    /// Model spike times on the grid, in seconds from sweep start.
    pub grid_spike_times: Vec<f64>,
    /// Model spike times interpolated below the grid resolution, in seconds from sweep start.
    pub interp_spike_times: Vec<f64>,
    /// Model spike times on the grid, measured from the previous target spike
    /// (sweep start before the first target spike).
    pub grid_isi_from_target: Vec<f64>,
    /// Interpolated model spike times, measured from the previous target spike.
    pub interp_isi_from_target: Vec<f64>,
    /// Membrane voltage of the model at each grid-aligned target spike time.
    pub voltage_at_grid_target_spikes: Vec<f64>,
    /// Firing threshold of the model at each grid-aligned target spike time.
    pub threshold_at_grid_target_spikes: Vec<f64>,
    /// Membrane voltage of the model at each interpolated target spike time.
    pub voltage_at_interp_target_spikes: Vec<f64>,
    /// Firing threshold of the model at each interpolated target spike time.
    pub threshold_at_interp_target_spikes: Vec<f64>,
}

/// Interface between the experiment harness and a parameterized neuron model.
///
/// The model owns its parameter schema: the ordered set of fittable
/// parameters, each scalar or vector-valued. Model variants declare their own
/// fittable sets without any change to the harness.
pub trait NeuronModel {
    /// The grid time step of the model, in seconds.
    fn dt(&self) -> f64;

    /// The ordered set of fittable parameters declared by the model.
    fn param_schema(&self) -> Vec<ParamDescriptor>;

    /// Read a named parameter.
    /// Returns `None` if the model does not declare the parameter.
    fn param(&self, name: &str) -> Option<ParamValue<'_>>;

    /// Write a named parameter.
    fn set_param(&mut self, name: &str, value: ParamValue<'_>) -> Result<(), FitError>;

    /// Simulate the model against a stimulus without target feedback.
    /// Spike times are absolute within the sweep.
    fn simulate_free(
        &self,
        init: &InitialCondition,
        stimulus: &[f64],
    ) -> Result<FreeRun, FitError>;

    /// Simulate the model against a stimulus with reference to a target spike
    /// train. The model state is reset at every target spike, and model spike
    /// times are reported as intervals from the previous target spike.
    fn simulate_against_target(
        &self,
        init: &InitialCondition,
        stimulus: &[f64],
        target_grid_indices: &[usize],
        target_mask: &[bool],
        target_interp_times: &[f64],
    ) -> Result<TargetRun, FitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_kind_num_slots() {
        assert_eq!(ParamKind::Scalar.num_slots(), 1);
        assert_eq!(ParamKind::Vector(3).num_slots(), 3);
        assert_eq!(ParamKind::Vector(0).num_slots(), 0);
    }

    #[test]
    fn test_param_value_as_scalar() {
        assert_eq!(ParamValue::Scalar(2.5).as_scalar("coeff_th"), Ok(2.5));
        assert_eq!(
            ParamValue::Vector(&[1.0, 2.0]).as_scalar("coeff_th"),
            Err(FitError::ParameterShape(
                "coeff_th expects a scalar value".to_string()
            ))
        );
    }

    #[test]
    fn test_param_value_as_vector() {
        assert_eq!(
            ParamValue::Vector(&[1.0, 2.0]).as_vector("coeff_asc"),
            Ok(&[1.0, 2.0][..])
        );
        assert_eq!(
            ParamValue::Scalar(1.0).as_vector("coeff_asc"),
            Err(FitError::ParameterShape(
                "coeff_asc expects a vector value".to_string()
            ))
        );
    }
}
