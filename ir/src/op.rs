//! Operator descriptors attached to tree nodes.

use smallvec::SmallVec;

use crate::shape::Shape;
use crate::types::{BinaryOp, LoopSpec, ReduceOp, UnaryOp};

/// Storage layout of a buffer leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferSpec {
    /// Element stride of each axis.
    pub strides: Shape,
    /// Element offset of the first element.
    pub start: usize,
}

impl BufferSpec {
    pub fn new(strides: &[usize], start: usize) -> Self {
        Self { strides: Shape::from_slice(strides), start }
    }
}

/// Operation performed by a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum Op {
    // Leaves
    Buffer(BufferSpec),
    HostScalar,
    Placeholder { level: usize },

    // Arithmetic
    Unary(UnaryOp),
    Binary(BinaryOp),

    /// Collapse the operand along one or two axes.
    Reduce { op: ReduceOp, axes: SmallVec<[usize; 2]> },

    // Index modifiers
    Reshape,
    Trans,
    DiagVector,

    /// Structured scalar loop around the body in `lhs`.
    Sfor(LoopSpec),
}

/// Closed classification of operators, one per code-generation object family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum OpFamily {
    Leaf,
    Arithmetic,
    Reduction,
    IndexModifier,
    ControlFlow,
}

impl Op {
    pub fn family(&self) -> OpFamily {
        match self {
            Self::Buffer(_) | Self::HostScalar | Self::Placeholder { .. } => OpFamily::Leaf,
            Self::Unary(_) | Self::Binary(_) => OpFamily::Arithmetic,
            Self::Reduce { .. } => OpFamily::Reduction,
            Self::Reshape | Self::Trans | Self::DiagVector => OpFamily::IndexModifier,
            Self::Sfor(_) => OpFamily::ControlFlow,
        }
    }
}
