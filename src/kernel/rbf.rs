//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) is a hyperparameter that controls the kernel width.

use crate::core::{active_nodes, SvmNode};
use crate::kernel::Kernel;

/// RBF (Radial Basis Function) kernel: K(x, y) = exp(-γ * ||x - y||²)
#[derive(Debug, Clone, Copy)]
pub struct RBFKernel {
    gamma: f64,
}

impl RBFKernel {
    /// Create a new RBF kernel with specified gamma parameter
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Kernel for RBFKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        let squared_distance = squared_euclidean_distance(x, y);
        (-self.gamma * squared_distance).exp()
    }
}

/// Compute squared Euclidean distance between two node lists
///
/// ||x - y||² = Σᵢ (xᵢ - yᵢ)², where an index missing from one list
/// contributes the square of the other list's value.
fn squared_euclidean_distance(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let x = active_nodes(x);
    let y = active_nodes(y);

    let mut distance_sq = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() {
        if x[i].index == y[j].index {
            let diff = x[i].value - y[j].value;
            distance_sq += diff * diff;
            i += 1;
            j += 1;
        } else if x[i].index > y[j].index {
            distance_sq += y[j].value * y[j].value;
            j += 1;
        } else {
            distance_sq += x[i].value * x[i].value;
            i += 1;
        }
    }

    while i < x.len() {
        distance_sq += x[i].value * x[i].value;
        i += 1;
    }

    while j < y.len() {
        distance_sq += y[j].value * y[j].value;
        j += 1;
    }

    distance_sq
}
