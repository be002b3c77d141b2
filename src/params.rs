//! Mapping of flat parameter vectors onto named model parameters.
//!
//! An optimizer proposes candidate parameters as one flat vector of scalars.
//! The [`FitLayout`] is the layout contract between that vector and the
//! named, possibly vector-valued, parameters of a model: resolved once from
//! the model parameter schema, then applied to every candidate.
use log::debug;

use crate::error::FitError;
use crate::model::{NeuronModel, ParamDescriptor, ParamKind, ParamValue};

/// The layout contract between a flat parameter vector and the named
/// parameters of a model.
#[derive(Debug, PartialEq, Clone)]
pub struct FitLayout {
    entries: Vec<ParamDescriptor>,
    num_slots: usize,
}

impl FitLayout {
    /// Resolve an ordered list of fit names against a model parameter schema.
    ///
    /// Every requested name must be declared by the schema; otherwise the
    /// function fails without resolving anything, so a misspelled name can
    /// never cause a partial parameter update later on.
    pub fn resolve(fit_names: &[String], schema: &[ParamDescriptor]) -> Result<Self, FitError> {
        let entries = fit_names
            .iter()
            .map(|name| {
                schema
                    .iter()
                    .find(|descriptor| descriptor.name == *name)
                    .cloned()
                    .ok_or_else(|| FitError::NotFittable(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let num_slots = entries
            .iter()
            .map(|descriptor| descriptor.kind.num_slots())
            .sum();
        Ok(FitLayout { entries, num_slots })
    }

    /// Returns the resolved parameter descriptors, in fit order.
    pub fn entries(&self) -> &[ParamDescriptor] {
        &self.entries
    }

    /// Total number of slots a parameter vector must provide.
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Distribute a flat parameter vector across the named model parameters.
    ///
    /// A vector parameter of length `k` consumes `k` consecutive slots in the
    /// order the names were resolved; a scalar consumes one. The guess length
    /// must match the total slot count exactly; it is never truncated or
    /// padded.
    pub fn apply<M: NeuronModel>(&self, model: &mut M, guess: &[f64]) -> Result<(), FitError> {
        if guess.len() != self.num_slots {
            return Err(FitError::ParameterLength {
                expected: self.num_slots,
                actual: guess.len(),
            });
        }

        let mut cursor = 0;
        for descriptor in self.entries.iter() {
            match descriptor.kind {
                ParamKind::Scalar => {
                    model.set_param(&descriptor.name, ParamValue::Scalar(guess[cursor]))?;
                    cursor += 1;
                }
                ParamKind::Vector(len) => {
                    model.set_param(
                        &descriptor.name,
                        ParamValue::Vector(&guess[cursor..cursor + len]),
                    )?;
                    cursor += len;
                }
            }
        }
        debug!(
            "Mapped {} slots onto {} model parameters",
            self.num_slots,
            self.entries.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glif::{GlifConfig, GlifNeuron};

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn neuron() -> GlifNeuron {
        let config = GlifConfig {
            asc_amplitudes: vec![1e-11, -2e-11, 5e-12],
            asc_decays: vec![30.0, 100.0, 300.0],
            ..GlifConfig::default()
        };
        GlifNeuron::new(config).unwrap()
    }

    #[test]
    fn test_resolve_unknown_name() {
        let neuron = neuron();
        assert_eq!(
            FitLayout::resolve(&names(&["coeff_th", "spike_cut"]), &neuron.param_schema()),
            Err(FitError::NotFittable("spike_cut".to_string()))
        );
        // The model is untouched: nothing was resolved, so nothing can be applied.
        assert_eq!(neuron.param("coeff_th"), Some(ParamValue::Scalar(1.0)));
    }

    #[test]
    fn test_resolve_slot_count() {
        let neuron = neuron();
        let layout =
            FitLayout::resolve(&names(&["coeff_th", "coeff_asc"]), &neuron.param_schema()).unwrap();
        assert_eq!(layout.num_slots(), 4);
        assert_eq!(layout.entries().len(), 2);

        let layout = FitLayout::resolve(&names(&[]), &neuron.param_schema()).unwrap();
        assert_eq!(layout.num_slots(), 0);
    }

    #[test]
    fn test_apply_scalar_and_vector() {
        let mut neuron = neuron();
        let layout =
            FitLayout::resolve(&names(&["coeff_th", "coeff_asc"]), &neuron.param_schema()).unwrap();
        layout.apply(&mut neuron, &[0.5, 1.25, 0.75, 2.0]).unwrap();

        assert_eq!(neuron.param("coeff_th"), Some(ParamValue::Scalar(0.5)));
        assert_eq!(
            neuron.param("coeff_asc"),
            Some(ParamValue::Vector(&[1.25, 0.75, 2.0]))
        );
    }

    #[test]
    fn test_apply_order_invariance() {
        let mut first = neuron();
        let layout =
            FitLayout::resolve(&names(&["coeff_g", "coeff_asc"]), &first.param_schema()).unwrap();
        layout.apply(&mut first, &[0.9, 1.1, 1.2, 1.3]).unwrap();

        let mut second = neuron();
        let layout =
            FitLayout::resolve(&names(&["coeff_asc", "coeff_g"]), &second.param_schema()).unwrap();
        layout.apply(&mut second, &[1.1, 1.2, 1.3, 0.9]).unwrap();

        assert_eq!(first.param("coeff_g"), second.param("coeff_g"));
        assert_eq!(first.param("coeff_asc"), second.param("coeff_asc"));
    }

    #[test]
    fn test_apply_length_mismatch() {
        let mut neuron = neuron();
        let layout =
            FitLayout::resolve(&names(&["coeff_th", "coeff_asc"]), &neuron.param_schema()).unwrap();

        assert_eq!(
            layout.apply(&mut neuron, &[0.5, 1.0]),
            Err(FitError::ParameterLength {
                expected: 4,
                actual: 2
            })
        );
        assert_eq!(
            layout.apply(&mut neuron, &[0.5, 1.0, 1.0, 1.0, 1.0]),
            Err(FitError::ParameterLength {
                expected: 4,
                actual: 5
            })
        );
        // Nothing was written on either failure.
        assert_eq!(neuron.param("coeff_th"), Some(ParamValue::Scalar(1.0)));
        assert_eq!(
            neuron.param("coeff_asc"),
            Some(ParamValue::Vector(&[1.0, 1.0, 1.0]))
        );
    }
}
