//! This crate provides tools for fitting spiking neuron models to recorded
//! spike trains.
//!
//! The optimizer itself is external: it repeatedly proposes a flat vector of
//! candidate parameters, and the experiment harness maps the candidate onto
//! the named model parameters, simulates every recorded stimulus sweep, and
//! collects per-sweep voltages, thresholds and spike timings for error
//! computation.
//!
//! # Running an Experiment
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use spikefit::dataset::SweepDataset;
//! use spikefit::experiment::Experiment;
//! use spikefit::glif::{GlifConfig, GlifNeuron};
//! use spikefit::model::InitialCondition;
//!
//! // A synthetic dataset of 5 sweeps with noisy stimuli and random target spikes
//! let mut rng = StdRng::seed_from_u64(42);
//! let dataset = SweepDataset::rand(5, 1000, 5e-5, 10.0, 2e-11, &mut rng).unwrap();
//!
//! // The reference GLIF model; any simulator behind the NeuronModel trait works
//! let neuron = GlifNeuron::new(GlifConfig::default()).unwrap();
//! let init = InitialCondition {
//!     voltage: -0.07,
//!     threshold: -0.045,
//!     adaptation_currents: vec![0.0; 2],
//! };
//!
//! // Fit the leak conductance coefficient and the after-spike current coefficients
//! let fit_names = vec!["coeff_g".to_string(), "coeff_asc".to_string()];
//! let mut experiment = Experiment::new(neuron, dataset, init, &fit_names).unwrap();
//!
//! // One candidate: 1 slot for coeff_g, 2 slots for coeff_asc
//! let runs = experiment.run(&[1.05, 0.9, 1.1]).unwrap();
//! assert_eq!(runs.len(), 5);
//!
//! // The free-running mode ignores the target spikes
//! let base_runs = experiment.run_base_model(&[1.05, 0.9, 1.1]).unwrap();
//! assert_eq!(base_runs.len(), 5);
//! ```
//!
//! # Mapping Parameters
//!
//! ```rust
//! use spikefit::glif::{GlifConfig, GlifNeuron};
//! use spikefit::model::{NeuronModel, ParamValue};
//! use spikefit::params::FitLayout;
//!
//! let mut neuron = GlifNeuron::new(GlifConfig::default()).unwrap();
//!
//! // One scalar and one vector parameter: 1 + 2 slots
//! let fit_names = vec!["coeff_th".to_string(), "coeff_asc".to_string()];
//! let layout = FitLayout::resolve(&fit_names, &neuron.param_schema()).unwrap();
//! assert_eq!(layout.num_slots(), 3);
//!
//! layout.apply(&mut neuron, &[0.95, 1.2, 0.8]).unwrap();
//! assert_eq!(neuron.param("coeff_th"), Some(ParamValue::Scalar(0.95)));
//! assert_eq!(neuron.param("coeff_asc"), Some(ParamValue::Vector(&[1.2, 0.8])));
//! ```

pub mod dataset;
pub mod error;
pub mod experiment;
pub mod glif;
pub mod model;
pub mod params;
