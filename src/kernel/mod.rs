//! Kernel functions for SVM

pub mod linear;
pub mod polynomial;
pub mod precomputed;
pub mod rbf;
pub mod sigmoid;
pub mod traits;

pub use self::linear::*;
pub use self::polynomial::*;
pub use self::precomputed::*;
pub use self::rbf::*;
pub use self::sigmoid::*;
pub use self::traits::*;

use crate::core::{KernelParams, KernelType, SvmNode};

/// Kernel selected at runtime from the parameters stored in a model
#[derive(Debug, Clone)]
pub enum KernelFunction {
    Linear(LinearKernel),
    Polynomial(PolynomialKernel),
    Rbf(RBFKernel),
    Sigmoid(SigmoidKernel),
    Precomputed(PrecomputedKernel),
}

impl KernelFunction {
    pub fn from_params(params: &KernelParams) -> Self {
        match params.kernel_type {
            KernelType::Linear => KernelFunction::Linear(LinearKernel::new()),
            KernelType::Polynomial => KernelFunction::Polynomial(PolynomialKernel::new(
                params.degree,
                params.gamma,
                params.coef0,
            )),
            KernelType::Rbf => KernelFunction::Rbf(RBFKernel::new(params.gamma)),
            KernelType::Sigmoid => {
                KernelFunction::Sigmoid(SigmoidKernel::new(params.gamma, params.coef0))
            }
            KernelType::Precomputed => KernelFunction::Precomputed(PrecomputedKernel),
        }
    }
}

impl Kernel for KernelFunction {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        match self {
            KernelFunction::Linear(k) => k.compute(x, y),
            KernelFunction::Polynomial(k) => k.compute(x, y),
            KernelFunction::Rbf(k) => k.compute(x, y),
            KernelFunction::Sigmoid(k) => k.compute(x, y),
            KernelFunction::Precomputed(k) => k.compute(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node_list;

    #[test]
    fn test_dispatch_matches_concrete_kernels() {
        let x = node_list([(1, 0.5), (2, -1.0)]);
        let y = node_list([(1, 1.5), (3, 2.0)]);

        let params = KernelParams::new(KernelType::Polynomial)
            .with_degree(3)
            .with_gamma(0.5)
            .with_coef0(1.0);
        let dispatched = KernelFunction::from_params(&params);
        let direct = PolynomialKernel::new(3, 0.5, 1.0);
        assert_eq!(dispatched.compute(&x, &y), direct.compute(&x, &y));

        let dispatched = KernelFunction::from_params(&KernelParams::linear());
        assert_eq!(dispatched.compute(&x, &y), 0.75);

        let params = KernelParams::new(KernelType::Rbf).with_gamma(2.0);
        let dispatched = KernelFunction::from_params(&params);
        assert_eq!(
            dispatched.compute(&x, &y),
            RBFKernel::new(2.0).compute(&x, &y)
        );
    }
}
