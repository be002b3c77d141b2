//! Stimulus sweeps and target spike data.
//!
//! A [`Sweep`] is one stimulus-response trial: the injected current trace and
//! the spikes the biological neuron produced in response, on the simulation
//! grid and at interpolated sub-grid precision. A [`SweepDataset`] is the
//! ordered collection of sweeps a model is fitted against.
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::FitError;

/// One stimulus-response trial.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Sweep {
    /// Input current samples on the simulation grid, in amperes.
    stimulus: Vec<f64>,
    /// Grid indices at which the biological neuron spiked, strictly ascending.
    target_grid_indices: Vec<usize>,
    /// Target spike times at sub-grid precision, in seconds from sweep start.
    target_interp_times: Vec<f64>,
    /// Marks the target spikes eligible for comparison with the model.
    target_mask: Vec<bool>,
}

impl Sweep {
    /// Create a sweep with the specified stimulus and target spike data.
    ///
    /// The three target sequences must have equal lengths, the grid indices
    /// must be strictly ascending and within the stimulus, and the
    /// interpolated times must be finite.
    pub fn build(
        stimulus: Vec<f64>,
        target_grid_indices: Vec<usize>,
        target_interp_times: Vec<f64>,
        target_mask: Vec<bool>,
    ) -> Result<Self, FitError> {
        let sweep = Sweep {
            stimulus,
            target_grid_indices,
            target_interp_times,
            target_mask,
        };
        sweep.validate()?;
        Ok(sweep)
    }

    /// Check the internal consistency of the sweep.
    pub fn validate(&self) -> Result<(), FitError> {
        let num_spikes = self.target_grid_indices.len();
        if self.target_interp_times.len() != num_spikes || self.target_mask.len() != num_spikes {
            return Err(FitError::DatasetShape(format!(
                "{} target spike indices, {} interpolated times and {} mask entries",
                num_spikes,
                self.target_interp_times.len(),
                self.target_mask.len()
            )));
        }
        if self
            .target_grid_indices
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err(FitError::DatasetShape(
                "target spike indices must be strictly ascending".to_string(),
            ));
        }
        if let Some(&last) = self.target_grid_indices.last() {
            if last >= self.stimulus.len() {
                return Err(FitError::DatasetShape(format!(
                    "target spike index {} exceeds the stimulus length {}",
                    last,
                    self.stimulus.len()
                )));
            }
        }
        if self.target_interp_times.iter().any(|t| !t.is_finite()) {
            return Err(FitError::DatasetShape(
                "target spike times must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the stimulus trace of the sweep.
    pub fn stimulus(&self) -> &[f64] {
        &self.stimulus
    }

    /// Returns the grid indices of the target spikes.
    pub fn target_grid_indices(&self) -> &[usize] {
        &self.target_grid_indices
    }

    /// Returns the interpolated target spike times.
    pub fn target_interp_times(&self) -> &[f64] {
        &self.target_interp_times
    }

    /// Returns the eligibility mask of the target spikes.
    pub fn target_mask(&self) -> &[bool] {
        &self.target_mask
    }

    /// Returns the number of samples in the stimulus trace.
    pub fn num_samples(&self) -> usize {
        self.stimulus.len()
    }

    /// Returns the number of target spikes in the sweep.
    pub fn num_target_spikes(&self) -> usize {
        self.target_grid_indices.len()
    }
}

/// The ordered collection of sweeps a model is fitted against.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SweepDataset {
    sweeps: Vec<Sweep>,
}

impl SweepDataset {
    /// Create a dataset from sweeps, preserving their order.
    pub fn new(sweeps: Vec<Sweep>) -> Self {
        SweepDataset { sweeps }
    }

    /// Returns the sweeps of the dataset, in their original order.
    pub fn sweeps(&self) -> &[Sweep] {
        &self.sweeps
    }

    /// Returns the number of sweeps in the dataset.
    pub fn num_sweeps(&self) -> usize {
        self.sweeps.len()
    }

    /// Save the dataset to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), FitError> {
        let file = File::create(path).map_err(|e| FitError::Io(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| FitError::Io(e.to_string()))?;
        writer.flush().map_err(|e| FitError::Io(e.to_string()))
    }

    /// Load a dataset from a file, revalidating every sweep.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, FitError> {
        let file = File::open(path).map_err(|e| FitError::Io(e.to_string()))?;
        let reader = BufReader::new(file);
        let dataset: SweepDataset =
            serde_json::from_reader(reader).map_err(|e| FitError::Io(e.to_string()))?;
        for sweep in dataset.sweeps.iter() {
            sweep.validate()?;
        }
        Ok(dataset)
    }

    /// Returns a random dataset of noisy stimulus traces with target spikes
    /// drawn from a Poisson process with a two-step refractory floor.
    ///
    /// The firing rate is in spikes per second; the stimulus samples are
    /// drawn from a centered normal distribution with the given standard
    /// deviation.
    pub fn rand<R: Rng>(
        num_sweeps: usize,
        num_samples: usize,
        dt: f64,
        firing_rate: f64,
        stimulus_std: f64,
        rng: &mut R,
    ) -> Result<Self, FitError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(FitError::InvalidParameter(format!(
                "time step must be positive, got {}",
                dt
            )));
        }
        if firing_rate < 0.0 {
            return Err(FitError::InvalidParameter(format!(
                "firing rate must be non-negative, got {}",
                firing_rate
            )));
        }
        let stimulus_dist = Normal::new(0.0, stimulus_std)
            .map_err(|e| FitError::InvalidParameter(format!("stimulus distribution: {}", e)))?;
        let isi_dist = match firing_rate > 0.0 {
            true => Some(Exp::new(firing_rate).map_err(|e| {
                FitError::InvalidParameter(format!("firing rate distribution: {}", e))
            })?),
            false => None,
        };

        let refractory = 2.0 * dt;
        let mut sweeps = Vec::with_capacity(num_sweeps);
        for _ in 0..num_sweeps {
            let stimulus: Vec<f64> = (0..num_samples).map(|_| stimulus_dist.sample(rng)).collect();

            let mut target_grid_indices = Vec::new();
            let mut target_interp_times = Vec::new();
            if let Some(isi_dist) = &isi_dist {
                let mut t = 0.0;
                loop {
                    t += refractory + isi_dist.sample(rng);
                    let index = (t / dt).round() as usize;
                    if index >= num_samples {
                        break;
                    }
                    target_grid_indices.push(index);
                    target_interp_times.push(t);
                }
            }

            let target_mask = vec![true; target_grid_indices.len()];
            sweeps.push(Sweep::build(
                stimulus,
                target_grid_indices,
                target_interp_times,
                target_mask,
            )?);
        }
        Ok(SweepDataset::new(sweeps))
    }
}
