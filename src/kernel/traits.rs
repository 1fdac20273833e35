//! Kernel trait definition

use crate::core::SvmNode;

/// Kernel function trait
///
/// Both arguments are node lists in the solver's layout (1-based, sorted
/// indices, optionally terminated by the `-1` sentinel). `x` is the input
/// being classified and `y` a support vector; the distinction only matters
/// for the precomputed kernel.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64;
}
