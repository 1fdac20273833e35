//! Trained model representation and prediction

use crate::core::{KernelParams, KernelType, MachineType, Result, SVMError, SvmNode};
use crate::kernel::{Kernel, KernelFunction};
use crate::solver::probability::{multiclass_probability, sigmoid_predict, MIN_PROB};

/// Everything needed to assemble a model produced outside this crate
///
/// Coefficients use the solver layout: `sv_coef` has `nr_class - 1` rows
/// (one row for regression and one-class machines), each with one entry per
/// support vector; support vectors of a class are contiguous and ordered as
/// in `labels`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParts {
    pub machine_type: MachineType,
    pub kernel: KernelParams,
    pub nr_class: usize,
    pub support_vectors: Vec<Vec<SvmNode>>,
    pub sv_coef: Vec<Vec<f64>>,
    pub rho: Vec<f64>,
    pub labels: Option<Vec<i32>>,
    pub nr_sv: Option<Vec<usize>>,
    pub prob_a: Option<Vec<f64>>,
    pub prob_b: Option<Vec<f64>>,
}

/// A trained support vector machine
#[derive(Debug, Clone, PartialEq)]
pub struct SvmModel {
    pub(crate) machine_type: MachineType,
    pub(crate) kernel: KernelParams,
    pub(crate) nr_class: usize,
    /// Support vectors, each terminated by the sentinel node
    pub(crate) sv: Vec<Vec<SvmNode>>,
    pub(crate) sv_coef: Vec<Vec<f64>>,
    pub(crate) rho: Vec<f64>,
    pub(crate) prob_a: Option<Vec<f64>>,
    pub(crate) prob_b: Option<Vec<f64>>,
    /// Positions of the support vectors in the training set; only known
    /// for freshly trained models
    pub(crate) sv_indices: Option<Vec<usize>>,
    pub(crate) label: Option<Vec<i32>>,
    pub(crate) n_sv: Option<Vec<usize>>,
}

impl SvmModel {
    /// Adopt a model assembled elsewhere
    pub fn from_parts(parts: ModelParts) -> Result<Self> {
        let model = Self {
            machine_type: parts.machine_type,
            kernel: parts.kernel,
            nr_class: parts.nr_class,
            sv: parts
                .support_vectors
                .into_iter()
                .map(|mut nodes| {
                    if !nodes.last().is_some_and(SvmNode::is_sentinel) {
                        nodes.push(SvmNode::SENTINEL);
                    }
                    nodes
                })
                .collect(),
            sv_coef: parts.sv_coef,
            rho: parts.rho,
            prob_a: parts.prob_a,
            prob_b: parts.prob_b,
            sv_indices: None,
            label: parts.labels,
            n_sv: parts.nr_sv,
        };
        model.validate().map_err(SVMError::InvalidParameter)?;
        Ok(model)
    }

    /// Check the structural invariants prediction relies on
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        let l = self.sv.len();
        let classifier = self.machine_type.is_classifier();

        if classifier {
            if self.nr_class == 0 {
                return Err("a classifier needs at least one class".to_string());
            }
        } else if self.nr_class != 2 {
            return Err(format!(
                "{} models carry nr_class 2, found {}",
                self.machine_type, self.nr_class
            ));
        }

        let rows = if classifier { self.nr_class - 1 } else { 1 };
        if self.sv_coef.len() != rows {
            return Err(format!(
                "expected {rows} coefficient rows, found {}",
                self.sv_coef.len()
            ));
        }
        if let Some(row) = self.sv_coef.iter().find(|row| row.len() != l) {
            return Err(format!(
                "coefficient row has {} entries for {l} support vectors",
                row.len()
            ));
        }

        let pairs = self.decision_value_count();
        if self.rho.len() != pairs {
            return Err(format!("expected {pairs} rho values, found {}", self.rho.len()));
        }

        if classifier {
            match &self.label {
                Some(labels) if labels.len() == self.nr_class => {}
                Some(labels) => {
                    return Err(format!(
                        "expected {} labels, found {}",
                        self.nr_class,
                        labels.len()
                    ))
                }
                None => return Err("classification model without labels".to_string()),
            }
            match &self.n_sv {
                Some(n_sv) if n_sv.len() != self.nr_class => {
                    return Err(format!(
                        "expected {} per-class support vector counts, found {}",
                        self.nr_class,
                        n_sv.len()
                    ))
                }
                Some(n_sv) if n_sv.iter().sum::<usize>() != l => {
                    return Err(format!(
                        "per-class support vector counts add up to {}, total is {l}",
                        n_sv.iter().sum::<usize>()
                    ))
                }
                Some(_) => {}
                None => {
                    return Err("classification model without per-class counts".to_string())
                }
            }
        }

        let expected_prob = if classifier { pairs } else { 1 };
        for (name, values) in [("probA", &self.prob_a), ("probB", &self.prob_b)] {
            if let Some(values) = values {
                if values.len() != expected_prob {
                    return Err(format!(
                        "expected {expected_prob} {name} values, found {}",
                        values.len()
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn machine_type(&self) -> MachineType {
        self.machine_type
    }

    pub fn kernel_params(&self) -> &KernelParams {
        &self.kernel
    }

    pub fn kernel_type(&self) -> KernelType {
        self.kernel.kernel_type
    }

    /// Number of classes (2 for regression and one-class machines)
    pub fn nr_class(&self) -> usize {
        self.nr_class
    }

    /// Total number of support vectors
    pub fn total_sv(&self) -> usize {
        self.sv.len()
    }

    pub fn support_vectors(&self) -> &[Vec<SvmNode>] {
        &self.sv
    }

    pub fn sv_coef(&self) -> &[Vec<f64>] {
        &self.sv_coef
    }

    pub fn rho(&self) -> &[f64] {
        &self.rho
    }

    /// Class labels in decision order (classification only)
    pub fn labels(&self) -> Option<&[i32]> {
        self.label.as_deref()
    }

    /// Support vectors per class (classification only)
    pub fn nr_sv(&self) -> Option<&[usize]> {
        self.n_sv.as_deref()
    }

    pub fn prob_a(&self) -> Option<&[f64]> {
        self.prob_a.as_deref()
    }

    pub fn prob_b(&self) -> Option<&[f64]> {
        self.prob_b.as_deref()
    }

    pub fn sv_indices(&self) -> Option<&[usize]> {
        self.sv_indices.as_deref()
    }

    /// Reset the training-set index cache to its empty state
    pub(crate) fn clear_sv_indices(&mut self) {
        self.sv_indices = None;
    }

    /// Whether the model carries the calibration needed for probabilities
    pub fn supports_probability(&self) -> bool {
        (self.machine_type.is_classifier() && self.prob_a.is_some() && self.prob_b.is_some())
            || (self.machine_type.is_regression() && self.prob_a.is_some())
    }

    /// Scale of the Laplace noise model of a probabilistic regression machine
    pub fn svr_probability(&self) -> Option<f64> {
        if self.machine_type.is_regression() {
            self.prob_a.as_ref().and_then(|a| a.first().copied())
        } else {
            None
        }
    }

    /// Largest feature index referenced by any support vector
    pub fn max_index(&self) -> usize {
        self.sv
            .iter()
            .flat_map(|nodes| nodes.iter().take_while(|node| !node.is_sentinel()))
            .map(|node| node.index.max(0) as usize)
            .max()
            .unwrap_or(0)
    }

    /// Number of decision values produced per prediction
    pub fn decision_value_count(&self) -> usize {
        if self.machine_type.is_classifier() {
            self.nr_class * (self.nr_class - 1) / 2
        } else {
            1
        }
    }

    /// Compute decision values for `x` and return the predicted value
    ///
    /// Classifiers write one value per class pair `(i, j)`, `i < j`, in
    /// row-major order and return the label winning the one-vs-one vote.
    /// Regression machines return the regression value, one-class machines
    /// `+1`/`-1`.
    ///
    /// # Panics
    /// Panics if `dec_values` is shorter than [`Self::decision_value_count`].
    pub fn predict_values(&self, x: &[SvmNode], dec_values: &mut [f64]) -> f64 {
        let kernel = KernelFunction::from_params(&self.kernel);

        if !self.machine_type.is_classifier() {
            let mut sum = 0.0;
            for (coef, sv) in self.sv_coef[0].iter().zip(&self.sv) {
                sum += coef * kernel.compute(x, sv);
            }
            sum -= self.rho[0];
            dec_values[0] = sum;

            return match self.machine_type {
                MachineType::OneClass => {
                    if sum > 0.0 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                _ => sum,
            };
        }

        let nr_class = self.nr_class;
        let n_sv = self.n_sv.as_deref().unwrap_or_default();
        let labels = self.label.as_deref().unwrap_or_default();
        let kvalue: Vec<f64> = self.sv.iter().map(|sv| kernel.compute(x, sv)).collect();

        let mut start = vec![0usize; nr_class];
        for i in 1..nr_class {
            start[i] = start[i - 1] + n_sv[i - 1];
        }

        let mut vote = vec![0usize; nr_class];
        let mut p = 0;
        for i in 0..nr_class {
            for j in (i + 1)..nr_class {
                let (si, sj) = (start[i], start[j]);
                let coef1 = &self.sv_coef[j - 1];
                let coef2 = &self.sv_coef[i];

                let mut sum = 0.0;
                for k in si..si + n_sv[i] {
                    sum += coef1[k] * kvalue[k];
                }
                for k in sj..sj + n_sv[j] {
                    sum += coef2[k] * kvalue[k];
                }
                sum -= self.rho[p];
                dec_values[p] = sum;

                if sum > 0.0 {
                    vote[i] += 1;
                } else {
                    vote[j] += 1;
                }
                p += 1;
            }
        }

        let winner = first_argmax_by(&vote, |a, b| a > b);
        labels[winner] as f64
    }

    /// Predicted value for `x` (label, regression value or +1/-1)
    pub fn predict(&self, x: &[SvmNode]) -> f64 {
        let mut dec_values = vec![0.0; self.decision_value_count().max(1)];
        self.predict_values(x, &mut dec_values)
    }

    /// Per-class probability estimates for calibrated classifiers
    ///
    /// Writes `nr_class` estimates in label order and returns the most
    /// probable label. Models without classification calibration fall back
    /// to [`Self::predict`] and leave `prob_estimates` untouched.
    ///
    /// # Panics
    /// Panics if `prob_estimates` is shorter than `nr_class` for a calibrated
    /// classifier.
    pub fn predict_probability(&self, x: &[SvmNode], prob_estimates: &mut [f64]) -> f64 {
        let (prob_a, prob_b) = match (&self.prob_a, &self.prob_b) {
            (Some(a), Some(b)) if self.machine_type.is_classifier() => (a, b),
            _ => return self.predict(x),
        };

        let nr_class = self.nr_class;
        let mut dec_values = vec![0.0; self.decision_value_count()];
        self.predict_values(x, &mut dec_values);

        let mut pairwise = vec![vec![0.0; nr_class]; nr_class];
        let mut k = 0;
        for i in 0..nr_class {
            for j in (i + 1)..nr_class {
                let prob = sigmoid_predict(dec_values[k], prob_a[k], prob_b[k])
                    .max(MIN_PROB)
                    .min(1.0 - MIN_PROB);
                pairwise[i][j] = prob;
                pairwise[j][i] = 1.0 - prob;
                k += 1;
            }
        }

        if nr_class == 2 {
            prob_estimates[0] = pairwise[0][1];
            prob_estimates[1] = pairwise[1][0];
        } else {
            multiclass_probability(nr_class, &pairwise, prob_estimates);
        }

        let labels = self.label.as_deref().unwrap_or_default();
        let winner = first_argmax_by(&prob_estimates[..nr_class], |a, b| a > b);
        labels[winner] as f64
    }
}

/// Index of the first element no other element beats
fn first_argmax_by<T: Copy>(values: &[T], better: impl Fn(T, T) -> bool) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if better(value, values[best]) {
            best = i;
        }
    }
    best
}
