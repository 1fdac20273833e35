//! Solver collaborator
//!
//! Owns the trained-model representation and everything the inference layer
//! consumes from it: the native text model format (load/save), decision
//! values, class prediction and probability estimates. Models and the text
//! format are compatible with libsvm; training is not provided here.

pub mod io;
pub mod model;
pub mod probability;

pub use self::model::*;

use crate::core::SvmNode;
use std::sync::Arc;

/// Format version written next to serialized models (`major * 100 + minor`)
pub const SOLVER_VERSION: u64 = 325;

/// Shared model handle
///
/// A model may back several engines at once; it is released when the last
/// holder drops its handle.
pub type ModelHandle = Arc<SvmModel>;

/// Major part of a version tag
pub fn major_version(version: u64) -> u64 {
    version / 100
}

/// How decision values and the predicted class are obtained together
///
/// Older solver interfaces could not return the class from the
/// decision-value call; `Separate` reproduces that two-call path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictStrategy {
    /// One call produces both the decision values and the class
    Combined,
    /// Decision values first, then a separate class prediction
    Separate,
}

impl PredictStrategy {
    /// Strategy selected by the `legacy-predict` cargo feature
    pub const fn configured() -> Self {
        if cfg!(feature = "legacy-predict") {
            PredictStrategy::Separate
        } else {
            PredictStrategy::Combined
        }
    }

    /// Fill `dec_values` and return the raw predicted value
    ///
    /// `x` must already be in node-list form; both calls of the `Separate`
    /// strategy see the same list.
    pub fn predict_with_values(self, model: &SvmModel, x: &[SvmNode], dec_values: &mut [f64]) -> f64 {
        match self {
            PredictStrategy::Combined => model.predict_values(x, dec_values),
            PredictStrategy::Separate => {
                model.predict_values(x, dec_values);
                model.predict(x)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node_list;

    const MULTICLASS: &str = "svm_type c_svc
kernel_type rbf
gamma 0.5
nr_class 3
total_sv 3
rho 0 0 0
label 1 2 3
nr_sv 1 1 1
SV
1 1 1:1
-1 1 2:1
-1 -1 1:-1 2:-1
";

    #[test]
    fn test_strategies_agree() {
        let model = SvmModel::read_from(MULTICLASS.as_bytes()).unwrap();
        for input in [
            node_list([(1, 1.0)]),
            node_list([(2, 1.0)]),
            node_list([(1, -1.0), (2, -1.0)]),
            node_list([(1, 0.3), (2, 0.2)]),
        ] {
            let mut combined = vec![0.0; 3];
            let mut separate = vec![0.0; 3];
            let a = PredictStrategy::Combined.predict_with_values(&model, &input, &mut combined);
            let b = PredictStrategy::Separate.predict_with_values(&model, &input, &mut separate);
            assert_eq!(a, b);
            assert_eq!(combined, separate);
        }
    }

    #[test]
    fn test_configured_strategy() {
        let expected = if cfg!(feature = "legacy-predict") {
            PredictStrategy::Separate
        } else {
            PredictStrategy::Combined
        };
        assert_eq!(PredictStrategy::configured(), expected);
    }

    #[test]
    fn test_major_version() {
        assert_eq!(major_version(SOLVER_VERSION), 3);
        assert_eq!(major_version(289), 2);
        assert_eq!(major_version(0), 0);
    }
}
