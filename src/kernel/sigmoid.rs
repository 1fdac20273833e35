//! Sigmoid (Tanh) Kernel Implementation
//!
//! K(x, y) = tanh(γ * <x, y> + r)
//!
//! The kernel is not positive semi-definite for every parameter choice;
//! stored models are evaluated with whatever parameters they carry.

use crate::core::SvmNode;
use crate::kernel::linear::dot;
use crate::kernel::traits::Kernel;

/// Sigmoid (Hyperbolic Tangent) kernel
#[derive(Debug, Clone)]
pub struct SigmoidKernel {
    /// Scaling parameter for the dot product
    pub gamma: f64,
    /// Bias/offset parameter
    pub coef0: f64,
}

impl SigmoidKernel {
    pub fn new(gamma: f64, coef0: f64) -> Self {
        Self { gamma, coef0 }
    }
}

impl Kernel for SigmoidKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        (self.gamma * dot(x, y) + self.coef0).tanh()
    }
}
