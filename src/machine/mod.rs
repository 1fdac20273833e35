//! Inference engine over a trained model
//!
//! [`SupportVector`] wraps a shared model handle and turns dense input
//! vectors into predictions. Inputs are normalized feature by feature as
//! `(x - subtract) / divide` before they reach the solver.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ndarray::{array, Array1};
//! use svm_machine::machine::SupportVector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut machine = SupportVector::from_file("heart.svmmodel")?;
//! let input = array![0.7, -1.0, 0.3];
//! let label = machine.predict_class(input.view())?;
//!
//! let mut scores = Array1::zeros(machine.score_count());
//! let same = machine.predict_class_and_scores(input.view(), scores.view_mut())?;
//! assert_eq!(label, same);
//! # Ok(())
//! # }
//! ```

pub mod normalize;

pub use self::normalize::normalize;

use crate::core::{KernelType, MachineType, Result, SVMError, SvmNode};
use crate::solver::{ModelHandle, PredictStrategy, SvmModel};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};
use std::path::Path;
use std::sync::Arc;

/// Prediction engine bound to one model
///
/// Prediction methods reuse internal buffers and therefore take `&mut self`;
/// share an engine between threads behind a lock, or give each worker its
/// own engine over the same [`ModelHandle`].
///
/// Models with a precomputed kernel reference no feature indices, so their
/// `input_size` is 0. Inputs are accepted at any length but contribute
/// nothing, every kernel value is 0 and the decision reduces to `-rho`.
#[derive(Debug, Clone)]
pub struct SupportVector {
    model: ModelHandle,
    input_size: usize,
    output_size: usize,
    /// Node list handed to the solver, `input_size + 1` entries
    input_cache: Vec<SvmNode>,
    /// Per-class probability scratch, `number_of_classes` entries
    prob_cache: Vec<f64>,
    input_sub: Vec<f64>,
    input_div: Vec<f64>,
}

impl SupportVector {
    /// Engine owning a freshly built model
    pub fn new(model: SvmModel) -> Self {
        Self::from(Arc::new(model))
    }

    /// Load the model from a native model file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(SvmModel::load(path)?))
    }

    /// Adopt an existing handle
    pub fn from_handle(handle: Option<ModelHandle>) -> Result<Self> {
        handle.map(Self::from).ok_or(SVMError::NullModel)
    }

    /// Replace the model and reset everything derived from it
    pub fn set_model(&mut self, handle: ModelHandle) {
        self.model = handle;
        self.reset();
    }

    /// Recompute metadata from the current model
    ///
    /// Caches are reallocated and the normalization goes back to identity.
    pub fn reset(&mut self) {
        let n_classes = self.model.nr_class();
        self.input_size = self.model.max_index();
        self.output_size = if n_classes == 2 { 1 } else { n_classes };

        self.input_cache = vec![SvmNode::SENTINEL; self.input_size + 1];
        self.prob_cache = vec![0.0; n_classes];
        self.input_sub = vec![0.0; self.input_size];
        self.input_div = vec![1.0; self.input_size];

        log::debug!(
            "Reset {} machine: {} inputs, {} outputs, {} classes",
            self.model.machine_type(),
            self.input_size,
            self.output_size,
            n_classes
        );
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.model
    }

    pub fn model(&self) -> &SvmModel {
        &self.model
    }

    /// Expected length of an input vector
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// 1 for two-class and single-output machines, otherwise the class count
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// `(input_size, output_size)`
    pub fn shape(&self) -> (usize, usize) {
        (self.input_size, self.output_size)
    }

    pub fn number_of_classes(&self) -> usize {
        self.model.nr_class()
    }

    /// Number of decision values written by [`Self::predict_class_and_scores`]
    pub fn score_count(&self) -> usize {
        let n = self.output_size;
        if n < 2 {
            1
        } else {
            n * (n - 1) / 2
        }
    }

    /// Label of the `i`-th class, in decision order
    pub fn class_label(&self, i: usize) -> Result<i32> {
        let n_classes = self.number_of_classes();
        if i >= n_classes {
            return Err(SVMError::ClassIndex {
                index: i,
                n_classes,
            });
        }
        self.labels().map(|labels| labels[i]).ok_or_else(|| {
            SVMError::Unsupported(format!(
                "{} machines carry no class labels",
                self.machine_type()
            ))
        })
    }

    pub fn labels(&self) -> Option<&[i32]> {
        self.model.labels()
    }

    pub fn supports_probability(&self) -> bool {
        self.model.supports_probability()
    }

    pub fn machine_type(&self) -> MachineType {
        self.model.machine_type()
    }

    pub fn kernel_type(&self) -> KernelType {
        self.model.kernel_type()
    }

    pub fn polynomial_degree(&self) -> i32 {
        self.model.kernel_params().degree
    }

    pub fn gamma(&self) -> f64 {
        self.model.kernel_params().gamma
    }

    pub fn coefficient0(&self) -> f64 {
        self.model.kernel_params().coef0
    }

    pub fn input_subtraction(&self) -> &[f64] {
        &self.input_sub
    }

    pub fn input_division(&self) -> &[f64] {
        &self.input_div
    }

    /// Set the per-feature value subtracted from inputs
    ///
    /// Only the first `input_size` values are used.
    pub fn set_input_subtraction(&mut self, values: &[f64]) -> Result<()> {
        self.input_sub = self.checked_normalization(values, "input subtraction")?;
        Ok(())
    }

    /// Set the per-feature divisor applied after subtraction
    ///
    /// Only the first `input_size` values are used. Zero divisors are not
    /// rejected.
    pub fn set_input_division(&mut self, values: &[f64]) -> Result<()> {
        self.input_div = self.checked_normalization(values, "input division")?;
        Ok(())
    }

    fn checked_normalization(&self, values: &[f64], what: &'static str) -> Result<Vec<f64>> {
        if values.len() < self.input_size {
            return Err(SVMError::DimensionMismatch {
                what,
                expected: self.input_size,
                actual: values.len(),
            });
        }
        Ok(values[..self.input_size].to_vec())
    }

    fn check_input(&self, input: &ArrayView1<f64>) -> Result<()> {
        if input.len() < self.input_size {
            return Err(SVMError::DimensionMismatch {
                what: "input",
                expected: self.input_size,
                actual: input.len(),
            });
        }
        Ok(())
    }

    fn load_input(&mut self, input: ArrayView1<f64>) -> usize {
        normalize(
            input,
            self.input_size,
            &self.input_sub,
            &self.input_div,
            &mut self.input_cache,
        )
    }

    /// Predicted class label for `input`
    pub fn predict_class(&mut self, input: ArrayView1<f64>) -> Result<i32> {
        self.check_input(&input)?;
        self.load_input(input);
        Ok(round_label(self.model.predict(&self.input_cache)))
    }

    /// Predicted class label plus the raw pairwise decision values
    ///
    /// `scores` must be contiguous and hold exactly
    /// [`Self::score_count`] values.
    pub fn predict_class_and_scores(
        &mut self,
        input: ArrayView1<f64>,
        mut scores: ArrayViewMut1<f64>,
    ) -> Result<i32> {
        self.check_input(&input)?;
        let expected = self.score_count();
        let scores = scores.as_slice_mut().ok_or_else(|| {
            SVMError::LayoutError("scores output must be contiguous".to_string())
        })?;
        if scores.len() != expected {
            return Err(SVMError::DimensionMismatch {
                what: "scores output",
                expected,
                actual: scores.len(),
            });
        }

        self.load_input(input);
        let value =
            PredictStrategy::configured().predict_with_values(&self.model, &self.input_cache, scores);
        Ok(round_label(value))
    }

    /// Predicted class label plus per-class probability estimates
    ///
    /// `probabilities` must be contiguous and hold exactly
    /// [`Self::output_size`] values; estimates follow label order.
    pub fn predict_class_and_probabilities(
        &mut self,
        input: ArrayView1<f64>,
        mut probabilities: ArrayViewMut1<f64>,
    ) -> Result<i32> {
        if !self.supports_probability() {
            return Err(SVMError::Unsupported(
                "SVM does not support probability estimates".to_string(),
            ));
        }
        self.check_input(&input)?;
        let expected = self.output_size;
        let probabilities = probabilities.as_slice_mut().ok_or_else(|| {
            SVMError::LayoutError("probabilities output must be contiguous".to_string())
        })?;
        if probabilities.len() != expected {
            return Err(SVMError::DimensionMismatch {
                what: "probabilities output",
                expected,
                actual: probabilities.len(),
            });
        }

        self.load_input(input);
        self.prob_cache.fill(0.0);
        let value = self
            .model
            .predict_probability(&self.input_cache, &mut self.prob_cache);
        probabilities.copy_from_slice(&self.prob_cache[..expected]);
        Ok(round_label(value))
    }

    fn check_batch(&self, inputs: &ArrayView2<f64>) -> Result<()> {
        if inputs.ncols() < self.input_size {
            return Err(SVMError::DimensionMismatch {
                what: "input",
                expected: self.input_size,
                actual: inputs.ncols(),
            });
        }
        Ok(())
    }

    /// Class labels for every row of `inputs`
    pub fn predict_classes(&mut self, inputs: ArrayView2<f64>) -> Result<Array1<i32>> {
        self.check_batch(&inputs)?;
        inputs
            .rows()
            .into_iter()
            .map(|row| self.predict_class(row))
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    /// Class labels and decision values (one row per input) for every row
    pub fn predict_classes_and_scores(
        &mut self,
        inputs: ArrayView2<f64>,
    ) -> Result<(Array1<i32>, Array2<f64>)> {
        self.check_batch(&inputs)?;
        let mut labels = Array1::zeros(inputs.nrows());
        let mut scores = Array2::zeros((inputs.nrows(), self.score_count()));
        for (i, row) in inputs.rows().into_iter().enumerate() {
            labels[i] = self.predict_class_and_scores(row, scores.row_mut(i))?;
        }
        Ok((labels, scores))
    }

    /// Class labels and probability estimates (one row per input) for every row
    pub fn predict_classes_and_probabilities(
        &mut self,
        inputs: ArrayView2<f64>,
    ) -> Result<(Array1<i32>, Array2<f64>)> {
        if !self.supports_probability() {
            return Err(SVMError::Unsupported(
                "SVM does not support probability estimates".to_string(),
            ));
        }
        self.check_batch(&inputs)?;
        let mut labels = Array1::zeros(inputs.nrows());
        let mut probabilities = Array2::zeros((inputs.nrows(), self.output_size));
        for (i, row) in inputs.rows().into_iter().enumerate() {
            labels[i] = self.predict_class_and_probabilities(row, probabilities.row_mut(i))?;
        }
        Ok((labels, probabilities))
    }

    /// Save the model in native format
    ///
    /// Normalization vectors are not part of the native format; use the
    /// structured container to keep them.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.model.save(path)
    }
}

impl From<ModelHandle> for SupportVector {
    fn from(model: ModelHandle) -> Self {
        let mut machine = Self {
            model,
            input_size: 0,
            output_size: 0,
            input_cache: Vec::new(),
            prob_cache: Vec::new(),
            input_sub: Vec::new(),
            input_div: Vec::new(),
        };
        machine.reset();
        machine
    }
}

fn round_label(value: f64) -> i32 {
    value.round() as i32
}
