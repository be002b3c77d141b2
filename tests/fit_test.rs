use rand::rngs::StdRng;
use rand::SeedableRng;

use spikefit::dataset::SweepDataset;
use spikefit::error::FitError;
use spikefit::experiment::Experiment;
use spikefit::glif::{GlifConfig, GlifNeuron};
use spikefit::model::{InitialCondition, NeuronModel, ParamValue};

fn reference_neuron() -> GlifNeuron {
    GlifNeuron::new(GlifConfig::default()).unwrap()
}

fn resting_state(neuron: &GlifNeuron) -> InitialCondition {
    InitialCondition {
        voltage: neuron.config().resting_potential,
        threshold: neuron.config().threshold_inf,
        adaptation_currents: vec![0.0; neuron.num_asc_channels()],
    }
}

fn fit_names() -> Vec<String> {
    ["coeff_th", "coeff_c", "coeff_g", "coeff_asc"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

#[test]
fn test_fit_pipeline_end_to_end() {
    let mut rng = StdRng::seed_from_u64(42);
    let dataset = SweepDataset::rand(12, 2000, 5e-5, 40.0, 2e-11, &mut rng).unwrap();
    let num_sweeps = dataset.num_sweeps();
    let num_samples: Vec<usize> = dataset.sweeps().iter().map(|s| s.num_samples()).collect();
    let num_targets: Vec<usize> = dataset
        .sweeps()
        .iter()
        .map(|s| s.num_target_spikes())
        .collect();

    let neuron = reference_neuron();
    let init = resting_state(&neuron);
    let mut experiment = Experiment::new(neuron, dataset, init, &fit_names()).unwrap();
    assert_eq!(experiment.layout().num_slots(), 5);

    let guess = [1.0, 0.95, 1.1, 0.9, 1.05];
    let runs = experiment.run(&guess).unwrap();
    assert_eq!(runs.len(), num_sweeps);
    for (run, (&len, &spikes)) in runs.iter().zip(num_samples.iter().zip(num_targets.iter())) {
        // Traces never outgrow the stimulus; sampled-state channels hold one
        // entry per target spike.
        assert!(run.voltage.len() <= len);
        assert_eq!(run.voltage.len(), run.threshold.len());
        assert_eq!(run.adaptation_currents.ncols(), run.voltage.len());
        assert_eq!(run.voltage_at_grid_target_spikes.len(), spikes);
        assert_eq!(run.threshold_at_grid_target_spikes.len(), spikes);
        assert_eq!(run.voltage_at_interp_target_spikes.len(), spikes);
        assert_eq!(run.threshold_at_interp_target_spikes.len(), spikes);
        assert_eq!(run.grid_spike_times.len(), run.interp_spike_times.len());
        assert_eq!(run.grid_spike_times.len(), run.grid_isi_from_target.len());
        assert_eq!(
            run.grid_spike_times.len(),
            run.interp_isi_from_target.len()
        );
    }

    let base_runs = experiment.run_base_model(&guess).unwrap();
    assert_eq!(base_runs.len(), num_sweeps);
    for (run, &len) in base_runs.iter().zip(num_samples.iter()) {
        // Free runs always span the full stimulus.
        assert_eq!(run.voltage.len(), len);
        assert_eq!(run.threshold.len(), len);
        assert_eq!(run.adaptation_currents.ncols(), len);
        assert_eq!(run.grid_spike_times.len(), run.grid_spike_indices.len());
        assert_eq!(run.grid_spike_times.len(), run.interp_spike_times.len());
        assert_eq!(run.grid_spike_times.len(), run.interp_spike_voltages.len());
        assert_eq!(
            run.grid_spike_times.len(),
            run.interp_spike_thresholds.len()
        );
    }

    // The last applied candidate is visible on the fitted model.
    assert_eq!(
        experiment.model().param("coeff_c"),
        Some(ParamValue::Scalar(0.95))
    );
    assert_eq!(
        experiment.model().param("coeff_asc"),
        Some(ParamValue::Vector(&[0.9, 1.05]))
    );
}

#[test]
fn test_fit_runs_are_reproducible() {
    let mut rng = StdRng::seed_from_u64(7);
    let dataset = SweepDataset::rand(10, 1500, 5e-5, 60.0, 3e-11, &mut rng).unwrap();

    let neuron = reference_neuron();
    let init = resting_state(&neuron);
    let mut experiment = Experiment::new(neuron, dataset, init, &fit_names()).unwrap();

    let guess = [1.02, 1.0, 0.98, 1.1, 0.9];
    let first = experiment.run(&guess).unwrap();
    let second = experiment.run(&guess).unwrap();
    assert_eq!(first, second);

    let first = experiment.run_base_model(&guess).unwrap();
    let second = experiment.run_base_model(&guess).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_fit_rejects_unknown_name_before_any_mutation() {
    let mut rng = StdRng::seed_from_u64(3);
    let dataset = SweepDataset::rand(2, 500, 5e-5, 20.0, 1e-11, &mut rng).unwrap();

    let neuron = reference_neuron();
    let init = resting_state(&neuron);
    let result = Experiment::new(
        neuron,
        dataset,
        init,
        &["coeff_th".to_string(), "spike_cut_length".to_string()],
    );
    assert_eq!(
        result.err(),
        Some(FitError::NotFittable("spike_cut_length".to_string()))
    );
}

#[test]
fn test_fit_rejects_truncating_guess() {
    let mut rng = StdRng::seed_from_u64(11);
    let dataset = SweepDataset::rand(2, 500, 5e-5, 20.0, 1e-11, &mut rng).unwrap();

    let neuron = reference_neuron();
    let init = resting_state(&neuron);
    let mut experiment = Experiment::new(neuron, dataset, init, &fit_names()).unwrap();

    // 5 slots are required; a short or long guess must not be silently
    // truncated or padded.
    assert_eq!(
        experiment.run(&[1.0, 1.0, 1.0]),
        Err(FitError::ParameterLength {
            expected: 5,
            actual: 3
        })
    );
    assert_eq!(
        experiment.run_base_model(&[1.0; 7]),
        Err(FitError::ParameterLength {
            expected: 5,
            actual: 7
        })
    );
    // The failed candidates left the model untouched.
    assert_eq!(
        experiment.model().param("coeff_th"),
        Some(ParamValue::Scalar(1.0))
    );
}
