//! Linear kernel implementation

use crate::core::{active_nodes, SvmNode};
use crate::kernel::Kernel;

/// Linear kernel: K(x, y) = x^T * y
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        dot(x, y)
    }
}

/// Dot product of two node lists
///
/// Both lists have sorted indices, so this is a merge over the non-zero
/// entries in O(nnz(x) + nnz(y)).
pub(crate) fn dot(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let x = active_nodes(x);
    let y = active_nodes(y);

    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() {
        if x[i].index == y[j].index {
            result += x[i].value * y[j].value;
            i += 1;
            j += 1;
        } else if x[i].index < y[j].index {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}
