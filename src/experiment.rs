//! Experiment harness driving a neuron model over recorded sweeps.
//!
//! An [`Experiment`] owns one model instance, the dataset it is fitted
//! against, and the initial condition every sweep starts from. For each
//! candidate parameter vector it first distributes the candidate over the
//! model parameters, then simulates every sweep and collects the per-sweep
//! results in dataset order.
use log::debug;
use rayon::prelude::*;

use crate::dataset::{Sweep, SweepDataset};
use crate::error::FitError;
use crate::model::{FreeRun, InitialCondition, NeuronModel, TargetRun};
use crate::params::FitLayout;

/// Minimum number of sweeps to parallelize the simulation.
pub const MIN_SWEEPS_PAR: usize = 8;

/// Fitting harness around one model instance and one dataset.
///
/// Every call to [`run`](Experiment::run) or
/// [`run_base_model`](Experiment::run_base_model) is a pure function of the
/// model parameters, the dataset and the initial condition, apart from the
/// parameter update performed as its first step. Updating the model
/// parameters is the only side effect of fitting.
pub struct Experiment<M: NeuronModel> {
    model: M,
    dataset: SweepDataset,
    init: InitialCondition,
    layout: FitLayout,
}

impl<M: NeuronModel> Experiment<M> {
    /// Create an experiment over the specified model, dataset and initial
    /// condition, fitting the named parameters.
    ///
    /// The fit names are resolved against the model parameter schema once,
    /// here: a name the model does not declare fails immediately, before any
    /// parameter can be touched.
    pub fn new(
        model: M,
        dataset: SweepDataset,
        init: InitialCondition,
        fit_names: &[String],
    ) -> Result<Self, FitError> {
        let layout = FitLayout::resolve(fit_names, &model.param_schema())?;
        Ok(Experiment {
            model,
            dataset,
            init,
            layout,
        })
    }

    /// Returns the model driven by the experiment.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the experiment and return the model with its last applied
    /// parameters.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Returns the dataset of the experiment.
    pub fn dataset(&self) -> &SweepDataset {
        &self.dataset
    }

    /// Returns the initial condition applied at the top of every sweep.
    pub fn init(&self) -> &InitialCondition {
        &self.init
    }

    /// Returns the resolved layout of the fitted parameters.
    pub fn layout(&self) -> &FitLayout {
        &self.layout
    }

    /// Run the model against the target spike trains of every sweep.
    ///
    /// The candidate parameters are applied first; each sweep then starts
    /// from the initial condition and is simulated with reference to its
    /// target spikes. One [`TargetRun`] per sweep, in dataset order.
    pub fn run(&mut self, param_guess: &[f64]) -> Result<Vec<TargetRun>, FitError>
    where
        M: Sync,
    {
        self.layout.apply(&mut self.model, param_guess)?;
        debug!(
            "Running {} sweeps against their target spike trains",
            self.dataset.num_sweeps()
        );
        self.for_each_sweep(|model, init, sweep| {
            model.simulate_against_target(
                init,
                sweep.stimulus(),
                sweep.target_grid_indices(),
                sweep.target_mask(),
                sweep.target_interp_times(),
            )
        })
    }

    /// Run the model freely on the stimulus of every sweep, without target
    /// feedback.
    ///
    /// One [`FreeRun`] per sweep, in dataset order. Spike times are absolute
    /// within each sweep.
    pub fn run_base_model(&mut self, param_guess: &[f64]) -> Result<Vec<FreeRun>, FitError>
    where
        M: Sync,
    {
        self.layout.apply(&mut self.model, param_guess)?;
        debug!("Running {} sweeps freely", self.dataset.num_sweeps());
        self.for_each_sweep(|model, init, sweep| model.simulate_free(init, sweep.stimulus()))
    }

    /// Simulate every sweep with the provided entry point, preserving sweep
    /// order. Large datasets fan out over a thread pool; the parameter update
    /// has already completed, so the sweeps only share the model immutably.
    fn for_each_sweep<T, F>(&self, simulate: F) -> Result<Vec<T>, FitError>
    where
        T: Send,
        F: Fn(&M, &InitialCondition, &Sweep) -> Result<T, FitError> + Sync + Send,
        M: Sync,
    {
        let model = &self.model;
        let init = &self.init;
        if self.dataset.num_sweeps() >= MIN_SWEEPS_PAR {
            self.dataset
                .sweeps()
                .par_iter()
                .map(|sweep| simulate(model, &init.clone(), sweep))
                .collect()
        } else {
            self.dataset
                .sweeps()
                .iter()
                .map(|sweep| simulate(model, &init.clone(), sweep))
                .collect()
        }
    }
}
