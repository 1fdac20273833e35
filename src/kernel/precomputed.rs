//! Precomputed kernel
//!
//! With a precomputed kernel the support vectors hold a single node
//! `0:serial` and the input carries the kernel values of the sample against
//! every training instance, so K(x, sv) is the value stored in `x` at the
//! position named by the support vector's serial number.
//!
//! Serials are not feature indices: a precomputed model reports an input
//! size of 0, and an input node list that stops before a serial yields 0.

use crate::core::SvmNode;
use crate::kernel::Kernel;

#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedKernel;

impl Kernel for PrecomputedKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        let serial = match y.first() {
            Some(node) if !node.is_sentinel() => node.value as usize,
            _ => return 0.0,
        };
        x.get(serial)
            .filter(|node| !node.is_sentinel())
            .map_or(0.0, |node| node.value)
    }
}
