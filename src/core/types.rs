//! Core type definitions shared by the solver and the inference engine

use crate::core::{Result, SVMError};
use std::fmt;
use std::str::FromStr;

/// One entry of a sparse node list
///
/// Node lists follow the libsvm convention: 1-based feature indices in
/// increasing order, terminated by a sentinel whose index is `-1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmNode {
    pub index: i32,
    pub value: f64,
}

impl SvmNode {
    /// List terminator
    pub const SENTINEL: SvmNode = SvmNode {
        index: -1,
        value: 0.0,
    };

    pub fn new(index: i32, value: f64) -> Self {
        Self { index, value }
    }

    pub fn is_sentinel(&self) -> bool {
        self.index == -1
    }
}

impl Default for SvmNode {
    fn default() -> Self {
        Self::SENTINEL
    }
}

/// The entries of a node list before its sentinel
///
/// A list without sentinel is taken whole.
pub fn active_nodes(list: &[SvmNode]) -> &[SvmNode] {
    match list.iter().position(SvmNode::is_sentinel) {
        Some(end) => &list[..end],
        None => list,
    }
}

/// Build a sentinel-terminated node list from `(index, value)` pairs
pub fn node_list<I>(pairs: I) -> Vec<SvmNode>
where
    I: IntoIterator<Item = (i32, f64)>,
{
    let mut list: Vec<SvmNode> = pairs
        .into_iter()
        .map(|(index, value)| SvmNode::new(index, value))
        .collect();
    list.push(SvmNode::SENTINEL);
    list
}

/// Kind of machine stored in a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineType {
    /// C-support vector classification
    CSvc,
    /// nu-support vector classification
    NuSvc,
    /// Distribution estimation
    OneClass,
    /// epsilon-support vector regression
    EpsilonSvr,
    /// nu-support vector regression
    NuSvr,
}

impl MachineType {
    pub const ALL: [MachineType; 5] = [
        MachineType::CSvc,
        MachineType::NuSvc,
        MachineType::OneClass,
        MachineType::EpsilonSvr,
        MachineType::NuSvr,
    ];

    /// Name used in the native model file
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::CSvc => "c_svc",
            MachineType::NuSvc => "nu_svc",
            MachineType::OneClass => "one_class",
            MachineType::EpsilonSvr => "epsilon_svr",
            MachineType::NuSvr => "nu_svr",
        }
    }

    /// True for the two classification machines
    pub fn is_classifier(&self) -> bool {
        matches!(self, MachineType::CSvc | MachineType::NuSvc)
    }

    /// True for the two regression machines
    pub fn is_regression(&self) -> bool {
        matches!(self, MachineType::EpsilonSvr | MachineType::NuSvr)
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineType {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "c_svc" => Ok(MachineType::CSvc),
            "nu_svc" => Ok(MachineType::NuSvc),
            "one_class" => Ok(MachineType::OneClass),
            "epsilon_svr" => Ok(MachineType::EpsilonSvr),
            "nu_svr" => Ok(MachineType::NuSvr),
            _ => Err(SVMError::ParseError(format!("unknown svm type: {s}"))),
        }
    }
}

/// Kernel function family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelType {
    Linear,
    Polynomial,
    Rbf,
    Sigmoid,
    /// Kernel values supplied by the caller
    Precomputed,
}

impl KernelType {
    pub const ALL: [KernelType; 5] = [
        KernelType::Linear,
        KernelType::Polynomial,
        KernelType::Rbf,
        KernelType::Sigmoid,
        KernelType::Precomputed,
    ];

    /// Name used in the native model file
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelType::Linear => "linear",
            KernelType::Polynomial => "polynomial",
            KernelType::Rbf => "rbf",
            KernelType::Sigmoid => "sigmoid",
            KernelType::Precomputed => "precomputed",
        }
    }

    pub fn uses_degree(&self) -> bool {
        matches!(self, KernelType::Polynomial)
    }

    pub fn uses_gamma(&self) -> bool {
        matches!(
            self,
            KernelType::Polynomial | KernelType::Rbf | KernelType::Sigmoid
        )
    }

    pub fn uses_coef0(&self) -> bool {
        matches!(self, KernelType::Polynomial | KernelType::Sigmoid)
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelType {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(KernelType::Linear),
            "polynomial" | "poly" => Ok(KernelType::Polynomial),
            "rbf" => Ok(KernelType::Rbf),
            "sigmoid" => Ok(KernelType::Sigmoid),
            "precomputed" => Ok(KernelType::Precomputed),
            _ => Err(SVMError::ParseError(format!("unknown kernel type: {s}"))),
        }
    }
}

/// Kernel hyperparameters carried by a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub kernel_type: KernelType,
    /// Polynomial degree
    pub degree: i32,
    /// For polynomial, rbf and sigmoid
    pub gamma: f64,
    /// For polynomial and sigmoid
    pub coef0: f64,
}

impl KernelParams {
    pub fn linear() -> Self {
        Self::new(KernelType::Linear)
    }

    /// Parameters with libsvm's defaults: degree 3, gamma 0, coef0 0
    pub fn new(kernel_type: KernelType) -> Self {
        Self {
            kernel_type,
            degree: 3,
            gamma: 0.0,
            coef0: 0.0,
        }
    }

    pub fn with_degree(mut self, degree: i32) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_coef0(mut self, coef0: f64) -> Self {
        self.coef0 = coef0;
        self
    }
}

impl Default for KernelParams {
    fn default() -> Self {
        Self::new(KernelType::Rbf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_nodes_stops_at_sentinel() {
        let list = vec![
            SvmNode::new(1, 0.5),
            SvmNode::new(3, 1.5),
            SvmNode::SENTINEL,
            SvmNode::new(7, 9.0),
        ];
        let active = active_nodes(&list);
        assert_eq!(active.len(), 2);
        assert_eq!(active[1].index, 3);
    }

    #[test]
    fn test_active_nodes_without_sentinel() {
        let list = vec![SvmNode::new(1, 0.5)];
        assert_eq!(active_nodes(&list).len(), 1);
        assert!(active_nodes(&[]).is_empty());
    }

    #[test]
    fn test_node_list_is_terminated() {
        let list = node_list([(1, 1.0), (4, -2.0)]);
        assert_eq!(list.len(), 3);
        assert!(list[2].is_sentinel());
        assert_eq!(active_nodes(&list), &list[..2]);
    }

    #[test]
    fn test_machine_type_names() {
        for machine in MachineType::ALL {
            assert_eq!(machine.as_str().parse::<MachineType>().unwrap(), machine);
        }
        assert_eq!("C_SVC".parse::<MachineType>().unwrap(), MachineType::CSvc);
        assert!("svc".parse::<MachineType>().is_err());
        assert!(MachineType::NuSvc.is_classifier());
        assert!(MachineType::NuSvr.is_regression());
        assert!(!MachineType::OneClass.is_classifier());
    }

    #[test]
    fn test_kernel_type_names() {
        for kernel in KernelType::ALL {
            assert_eq!(kernel.to_string().parse::<KernelType>().unwrap(), kernel);
        }
        assert_eq!("POLY".parse::<KernelType>().unwrap(), KernelType::Polynomial);
        assert!("gaussian".parse::<KernelType>().is_err());
    }

    #[test]
    fn test_kernel_params_builder() {
        let params = KernelParams::new(KernelType::Polynomial)
            .with_degree(2)
            .with_gamma(0.5)
            .with_coef0(1.0);
        assert_eq!(params.degree, 2);
        assert_eq!(params.gamma, 0.5);
        assert_eq!(params.coef0, 1.0);
        assert!(params.kernel_type.uses_coef0());
        assert!(!KernelType::Rbf.uses_coef0());
        assert!(KernelType::Rbf.uses_gamma());
        assert!(!KernelType::Linear.uses_gamma());
    }
}
