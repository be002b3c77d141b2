//! Reference generalized leaky integrate-and-fire (GLIF) neuron model.
//!
//! The experiment harness is written against the [`NeuronModel`] trait and
//! works with any production simulator behind it. This module provides a
//! self-contained forward-Euler GLIF implementation with an adaptive
//! threshold and exponentially decaying after-spike currents, so the harness
//! contract can be exercised end to end.
use itertools::izip;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::FitError;
use crate::model::{
    FreeRun, InitialCondition, NeuronModel, ParamDescriptor, ParamValue, TargetRun,
};

/// Structural parameters of a GLIF neuron.
///
/// These are measured or chosen once per cell; the fit coefficients scale
/// them during optimization.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GlifConfig {
    /// Grid time step, in seconds.
    pub dt: f64,
    /// Membrane capacitance, in farads.
    pub capacitance: f64,
    /// Membrane leak conductance, in siemens.
    pub conductance: f64,
    /// Resting potential, in volts.
    pub resting_potential: f64,
    /// Stationary firing threshold, in volts.
    pub threshold_inf: f64,
    /// Potential the membrane is reset to after a spike, in volts.
    pub reset_potential: f64,
    /// Amount added to the threshold at each spike, in volts.
    pub threshold_jump: f64,
    /// Rate at which the threshold relaxes back to its stationary value, in 1/s.
    pub threshold_decay: f64,
    /// Current pasted into each after-spike channel at a spike, in amperes.
    pub asc_amplitudes: Vec<f64>,
    /// Decay rate of each after-spike channel, in 1/s.
    pub asc_decays: Vec<f64>,
}

impl Default for GlifConfig {
    fn default() -> Self {
        GlifConfig {
            dt: 5e-5,
            capacitance: 6e-11,
            conductance: 5e-9,
            resting_potential: -0.07,
            threshold_inf: -0.045,
            reset_potential: -0.07,
            threshold_jump: 0.002,
            threshold_decay: 10.0,
            asc_amplitudes: vec![1e-11, -5e-12],
            asc_decays: vec![30.0, 300.0],
        }
    }
}

/// A GLIF neuron: structural parameters plus the fit coefficients the
/// experiment harness adjusts.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GlifNeuron {
    config: GlifConfig,
    /// Scales the stationary threshold.
    coeff_th: f64,
    /// Scales the membrane capacitance.
    coeff_c: f64,
    /// Scales the leak conductance.
    coeff_g: f64,
    /// Scales the spike-induced threshold jump.
    coeff_a: f64,
    /// Scales the threshold decay rate.
    coeff_b: f64,
    /// Scales the pasted amplitude of each after-spike channel.
    coeff_asc: Vec<f64>,
}

/// Running state of one simulation.
#[derive(Debug)]
struct GlifState {
    v: f64,
    th: f64,
    asc: Vec<f64>,
}

impl GlifNeuron {
    /// Create a neuron from its structural parameters, with all fit
    /// coefficients at their neutral value of one.
    pub fn new(config: GlifConfig) -> Result<Self, FitError> {
        if !(config.dt.is_finite() && config.dt > 0.0) {
            return Err(FitError::InvalidParameter(format!(
                "time step must be positive, got {}",
                config.dt
            )));
        }
        if !(config.capacitance > 0.0) {
            return Err(FitError::InvalidParameter(format!(
                "capacitance must be positive, got {}",
                config.capacitance
            )));
        }
        if config.asc_amplitudes.len() != config.asc_decays.len() {
            return Err(FitError::InvalidParameter(format!(
                "{} after-spike amplitudes for {} decay rates",
                config.asc_amplitudes.len(),
                config.asc_decays.len()
            )));
        }
        let num_channels = config.asc_amplitudes.len();
        Ok(GlifNeuron {
            config,
            coeff_th: 1.0,
            coeff_c: 1.0,
            coeff_g: 1.0,
            coeff_a: 1.0,
            coeff_b: 1.0,
            coeff_asc: vec![1.0; num_channels],
        })
    }

    /// Returns the structural parameters of the neuron.
    pub fn config(&self) -> &GlifConfig {
        &self.config
    }

    /// Save the neuron, structural parameters and fit coefficients alike, to
    /// a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), FitError> {
        let file = File::create(path).map_err(|e| FitError::Io(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| FitError::Io(e.to_string()))?;
        writer.flush().map_err(|e| FitError::Io(e.to_string()))
    }

    /// Load a neuron from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, FitError> {
        let file = File::open(path).map_err(|e| FitError::Io(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| FitError::Io(e.to_string()))
    }

    /// Returns the number of after-spike current channels.
    pub fn num_asc_channels(&self) -> usize {
        self.config.asc_amplitudes.len()
    }

    fn check_init(&self, init: &InitialCondition) -> Result<(), FitError> {
        if init.adaptation_currents.len() != self.num_asc_channels() {
            return Err(FitError::Simulation(format!(
                "initial condition has {} adaptation currents, the model has {} channels",
                init.adaptation_currents.len(),
                self.num_asc_channels()
            )));
        }
        Ok(())
    }

    /// Advance the state by one grid step under the given stimulus sample.
    fn advance(&self, state: &mut GlifState, stimulus: f64) {
        let total_asc: f64 = state.asc.iter().sum();
        let dv = (stimulus + total_asc
            - self.config.conductance * self.coeff_g * (state.v - self.config.resting_potential))
            / (self.config.capacitance * self.coeff_c);
        let dth = -self.config.threshold_decay
            * self.coeff_b
            * (state.th - self.config.threshold_inf * self.coeff_th);
        state.v += self.config.dt * dv;
        state.th += self.config.dt * dth;
        for (asc, decay) in state.asc.iter_mut().zip(self.config.asc_decays.iter()) {
            *asc *= (-decay * self.config.dt).exp();
        }
    }

    /// Reset the state after a spike, the model's own or a pasted target one.
    fn reset(&self, state: &mut GlifState) {
        state.v = self.config.reset_potential;
        state.th += self.config.threshold_jump * self.coeff_a;
        for (asc, amplitude, coeff) in izip!(
            state.asc.iter_mut(),
            self.config.asc_amplitudes.iter(),
            self.coeff_asc.iter()
        ) {
            *asc += amplitude * coeff;
        }
    }
}

/// Fraction of the step at which the voltage crossed the threshold, assuming
/// both vary linearly over the step.
fn crossing_fraction(v_prev: f64, v: f64, th_prev: f64, th: f64) -> f64 {
    let gap = (v - v_prev) - (th - th_prev);
    if gap.abs() < f64::EPSILON {
        return 1.0;
    }
    ((th_prev - v_prev) / gap).clamp(0.0, 1.0)
}

/// Stack per-step after-spike current columns into one matrix, one row per
/// channel.
fn asc_matrix(num_channels: usize, columns: &[DVector<f64>]) -> DMatrix<f64> {
    if columns.is_empty() || num_channels == 0 {
        return DMatrix::zeros(num_channels, columns.len());
    }
    DMatrix::from_columns(columns)
}

impl NeuronModel for GlifNeuron {
    fn dt(&self) -> f64 {
        self.config.dt
    }

    fn param_schema(&self) -> Vec<ParamDescriptor> {
        vec![
            ParamDescriptor::scalar("coeff_th"),
            ParamDescriptor::scalar("coeff_c"),
            ParamDescriptor::scalar("coeff_g"),
            ParamDescriptor::scalar("coeff_a"),
            ParamDescriptor::scalar("coeff_b"),
            ParamDescriptor::vector("coeff_asc", self.coeff_asc.len()),
        ]
    }

    fn param(&self, name: &str) -> Option<ParamValue<'_>> {
        match name {
            "coeff_th" => Some(ParamValue::Scalar(self.coeff_th)),
            "coeff_c" => Some(ParamValue::Scalar(self.coeff_c)),
            "coeff_g" => Some(ParamValue::Scalar(self.coeff_g)),
            "coeff_a" => Some(ParamValue::Scalar(self.coeff_a)),
            "coeff_b" => Some(ParamValue::Scalar(self.coeff_b)),
            "coeff_asc" => Some(ParamValue::Vector(&self.coeff_asc)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: ParamValue<'_>) -> Result<(), FitError> {
        match name {
            "coeff_th" => self.coeff_th = value.as_scalar(name)?,
            "coeff_c" => self.coeff_c = value.as_scalar(name)?,
            "coeff_g" => self.coeff_g = value.as_scalar(name)?,
            "coeff_a" => self.coeff_a = value.as_scalar(name)?,
            "coeff_b" => self.coeff_b = value.as_scalar(name)?,
            "coeff_asc" => {
                let values = value.as_vector(name)?;
                if values.len() != self.coeff_asc.len() {
                    return Err(FitError::ParameterShape(format!(
                        "coeff_asc expects {} values, got {}",
                        self.coeff_asc.len(),
                        values.len()
                    )));
                }
                self.coeff_asc = values.to_vec();
            }
            _ => return Err(FitError::UnknownParameter(name.to_string())),
        }
        Ok(())
    }

    fn simulate_free(
        &self,
        init: &InitialCondition,
        stimulus: &[f64],
    ) -> Result<FreeRun, FitError> {
        self.check_init(init)?;
        let dt = self.config.dt;
        let num_channels = self.num_asc_channels();
        let mut state = GlifState {
            v: init.voltage,
            th: init.threshold,
            asc: init.adaptation_currents.clone(),
        };

        let mut voltage = Vec::with_capacity(stimulus.len());
        let mut threshold = Vec::with_capacity(stimulus.len());
        let mut asc_columns = Vec::with_capacity(stimulus.len());
        let mut grid_spike_times = Vec::new();
        let mut interp_spike_times = Vec::new();
        let mut grid_spike_indices = Vec::new();
        let mut interp_spike_voltages = Vec::new();
        let mut interp_spike_thresholds = Vec::new();

        for (i, &sample) in stimulus.iter().enumerate() {
            let (v_prev, th_prev) = (state.v, state.th);
            self.advance(&mut state, sample);
            voltage.push(state.v);
            threshold.push(state.th);
            asc_columns.push(DVector::from_column_slice(&state.asc));

            if state.v >= state.th {
                let fraction = crossing_fraction(v_prev, state.v, th_prev, state.th);
                let interp_time = ((i as f64 - 1.0 + fraction) * dt).max(0.0);
                grid_spike_indices.push(i);
                grid_spike_times.push(i as f64 * dt);
                interp_spike_times.push(interp_time);
                interp_spike_voltages.push(v_prev + fraction * (state.v - v_prev));
                interp_spike_thresholds.push(th_prev + fraction * (state.th - th_prev));
                self.reset(&mut state);
            }
        }

        Ok(FreeRun {
            adaptation_currents: asc_matrix(num_channels, &asc_columns),
            voltage,
            threshold,
            grid_spike_times,
            interp_spike_times,
            grid_spike_indices,
            interp_spike_voltages,
            interp_spike_thresholds,
        })
    }

    fn simulate_against_target(
        &self,
        init: &InitialCondition,
        stimulus: &[f64],
        target_grid_indices: &[usize],
        target_mask: &[bool],
        target_interp_times: &[f64],
    ) -> Result<TargetRun, FitError> {
        self.check_init(init)?;
        let num_targets = target_grid_indices.len();
        if target_interp_times.len() != num_targets || target_mask.len() != num_targets {
            return Err(FitError::DatasetShape(format!(
                "{} target spike indices, {} interpolated times and {} mask entries",
                num_targets,
                target_interp_times.len(),
                target_mask.len()
            )));
        }
        if target_grid_indices
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err(FitError::DatasetShape(
                "target spike indices must be strictly ascending".to_string(),
            ));
        }
        if let Some(&last) = target_grid_indices.last() {
            if last >= stimulus.len() {
                return Err(FitError::DatasetShape(format!(
                    "target spike index {} exceeds the stimulus length {}",
                    last,
                    stimulus.len()
                )));
            }
        }

        let dt = self.config.dt;
        let num_channels = self.num_asc_channels();
        let mut state = GlifState {
            v: init.voltage,
            th: init.threshold,
            asc: init.adaptation_currents.clone(),
        };

        let mut voltage = Vec::with_capacity(stimulus.len());
        let mut threshold = Vec::with_capacity(stimulus.len());
        let mut asc_columns = Vec::with_capacity(stimulus.len());
        let mut grid_spike_times = Vec::new();
        let mut interp_spike_times = Vec::new();
        let mut grid_isi_from_target = Vec::new();
        let mut interp_isi_from_target = Vec::new();
        let mut voltage_at_grid_target_spikes = Vec::with_capacity(num_targets);
        let mut threshold_at_grid_target_spikes = Vec::with_capacity(num_targets);
        let mut voltage_at_interp_target_spikes = Vec::with_capacity(num_targets);
        let mut threshold_at_interp_target_spikes = Vec::with_capacity(num_targets);

        // Time reference of the running segment: the previous target spike,
        // or sweep start before the first one.
        let mut segment_ref = 0.0;
        let mut next_sample = 0;

        for (k, &target_index) in target_grid_indices.iter().enumerate() {
            // Integrate up to and including the target spike sample, stopping
            // early if the model spikes ahead of the target.
            let mut spiked_ahead = false;
            let mut last_step = (state.v, state.th);
            for i in next_sample..=target_index {
                let (v_prev, th_prev) = (state.v, state.th);
                self.advance(&mut state, stimulus[i]);
                voltage.push(state.v);
                threshold.push(state.th);
                asc_columns.push(DVector::from_column_slice(&state.asc));
                last_step = (v_prev, th_prev);

                if state.v >= state.th {
                    let fraction = crossing_fraction(v_prev, state.v, th_prev, state.th);
                    let interp_time = ((i as f64 - 1.0 + fraction) * dt).max(segment_ref);
                    grid_spike_times.push(i as f64 * dt);
                    interp_spike_times.push(interp_time);
                    grid_isi_from_target.push(i as f64 * dt - segment_ref);
                    interp_isi_from_target.push(interp_time - segment_ref);
                    if i < target_index {
                        spiked_ahead = true;
                    }
                    break;
                }
            }

            if spiked_ahead {
                // Grid simulation up to the target spike was skipped; the
                // values at the model spike stand in.
                voltage_at_grid_target_spikes.push(state.v);
                threshold_at_grid_target_spikes.push(state.th);
                voltage_at_interp_target_spikes.push(state.v);
                threshold_at_interp_target_spikes.push(state.th);
            } else {
                let (v_prev, th_prev) = last_step;
                voltage_at_grid_target_spikes.push(state.v);
                threshold_at_grid_target_spikes.push(state.th);
                // The interpolated target time falls inside the last step or
                // just beyond it; hold the segment's final sample past it.
                let fraction =
                    ((target_interp_times[k] / dt) - (target_index as f64 - 1.0)).clamp(0.0, 1.0);
                voltage_at_interp_target_spikes.push(v_prev + fraction * (state.v - v_prev));
                threshold_at_interp_target_spikes.push(th_prev + fraction * (state.th - th_prev));
            }

            // Paste in the target spike: the biological neuron fired here, so
            // the model state is reset exactly as after one of its own spikes.
            self.reset(&mut state);
            segment_ref = target_index as f64 * dt;
            next_sample = target_index + 1;
        }

        // Tail after the last target spike: fill the traces until the model
        // spikes on its own or the stimulus runs out.
        for i in next_sample..stimulus.len() {
            let (v_prev, th_prev) = (state.v, state.th);
            self.advance(&mut state, stimulus[i]);
            voltage.push(state.v);
            threshold.push(state.th);
            asc_columns.push(DVector::from_column_slice(&state.asc));

            if state.v >= state.th {
                let fraction = crossing_fraction(v_prev, state.v, th_prev, state.th);
                let interp_time = ((i as f64 - 1.0 + fraction) * dt).max(segment_ref);
                grid_spike_times.push(i as f64 * dt);
                interp_spike_times.push(interp_time);
                grid_isi_from_target.push(i as f64 * dt - segment_ref);
                interp_isi_from_target.push(interp_time - segment_ref);
                break;
            }
        }

        Ok(TargetRun {
            adaptation_currents: asc_matrix(num_channels, &asc_columns),
            voltage,
            threshold,
            grid_spike_times,
            interp_spike_times,
            grid_isi_from_target,
            interp_isi_from_target,
            voltage_at_grid_target_spikes,
            threshold_at_grid_target_spikes,
            voltage_at_interp_target_spikes,
            threshold_at_interp_target_spikes,
        })
    }
}
