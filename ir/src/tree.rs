//! The expression-tree arena.
//!
//! Nodes are appended bottom-up: a node may only reference positions that
//! already exist, so every position is larger than its children's. The engine
//! relies on this for its child-before-parent walk.

use smallvec::{SmallVec, smallvec};
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::op::{BufferSpec, Op};
use crate::shape::{self, Shape};
use crate::types::{BinaryOp, LoopSpec, ReduceOp, UnaryOp};
use kernmap_dtype::ScalarDType;

/// A single tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub op: Op,
    pub dtype: ScalarDType,
    pub shape: Shape,
    pub lhs: Option<usize>,
    pub rhs: Option<usize>,
}

impl Node {
    pub fn leaf(op: Op, dtype: ScalarDType, shape: &[usize]) -> Self {
        Self { op, dtype, shape: Shape::from_slice(shape), lhs: None, rhs: None }
    }

    /// Child positions in operand order.
    pub fn children(&self) -> impl Iterator<Item = usize> + '_ {
        self.lhs.into_iter().chain(self.rhs)
    }
}

/// Append-only arena of expression nodes addressed by position.
#[derive(Debug, Clone, Default)]
pub struct ExpressionTree {
    nodes: Vec<Node>,
}

impl ExpressionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Node> {
        self.nodes.get(position)
    }

    /// Position of the most recently pushed node.
    pub fn root(&self) -> Result<usize> {
        self.nodes.len().checked_sub(1).context(EmptyTreeSnafu)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// Append a node, checking that its children exist.
    pub fn push(&mut self, node: Node) -> Result<usize> {
        let position = self.nodes.len();
        for child in node.children() {
            ensure!(child < position, InvalidChildSnafu { position, child });
        }
        self.nodes.push(node);
        Ok(position)
    }

    /// Positions reachable from `root`, each once, children before parents.
    pub fn toposort(&self, root: usize) -> Result<Vec<usize>> {
        ensure!(root < self.nodes.len(), InvalidChildSnafu { position: root, child: root });

        let mut visited = vec![false; root + 1];
        let mut order = Vec::new();
        // (position, children_pushed)
        let mut stack = vec![(root, false)];
        while let Some((position, expanded)) = stack.pop() {
            if expanded {
                order.push(position);
                continue;
            }
            if visited[position] {
                continue;
            }
            visited[position] = true;
            stack.push((position, true));
            let node = &self.nodes[position];
            for child in [node.rhs, node.lhs].into_iter().flatten() {
                if !visited[child] {
                    stack.push((child, false));
                }
            }
        }
        Ok(order)
    }

    fn node(&self, position: usize) -> Result<&Node> {
        self.nodes.get(position).context(InvalidChildSnafu { position: self.nodes.len(), child: position })
    }

    // =========================================================================
    // Leaves
    // =========================================================================

    /// Strided buffer leaf. Stride count is not checked here.
    pub fn buffer(&mut self, dtype: ScalarDType, shape: &[usize], spec: BufferSpec) -> Result<usize> {
        self.push(Node::leaf(Op::Buffer(spec), dtype, shape))
    }

    /// Dense row-major buffer leaf starting at offset 0.
    pub fn dense(&mut self, dtype: ScalarDType, shape: &[usize]) -> Result<usize> {
        let spec = BufferSpec::new(&shape::dense_strides(shape), 0);
        self.buffer(dtype, shape, spec)
    }

    pub fn host_scalar(&mut self, dtype: ScalarDType) -> Result<usize> {
        self.push(Node::leaf(Op::HostScalar, dtype, &[]))
    }

    /// Induction variable of the loop at `level`.
    pub fn placeholder(&mut self, level: usize) -> Result<usize> {
        self.push(Node::leaf(Op::Placeholder { level }, ScalarDType::Int32, &[]))
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    pub fn unary(&mut self, op: UnaryOp, operand: usize) -> Result<usize> {
        let dtype = self.node(operand)?.dtype;
        self.unary_as(op, operand, dtype)
    }

    /// Unary op with an explicit result dtype (casts).
    pub fn unary_as(&mut self, op: UnaryOp, operand: usize, dtype: ScalarDType) -> Result<usize> {
        let shape = self.node(operand)?.shape.clone();
        self.push(Node { op: Op::Unary(op), dtype, shape, lhs: Some(operand), rhs: None })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: usize, rhs: usize) -> Result<usize> {
        let (l, r) = (self.node(lhs)?, self.node(rhs)?);
        let shape = if op.writes_lhs() { l.shape.clone() } else { shape::broadcast_shapes(&l.shape, &r.shape)? };
        let dtype = if op.is_comparison() { ScalarDType::Bool } else { l.dtype };
        self.push(Node { op: Op::Binary(op), dtype, shape, lhs: Some(lhs), rhs: Some(rhs) })
    }

    pub fn assign(&mut self, target: usize, value: usize) -> Result<usize> {
        self.binary(BinaryOp::Assign, target, value)
    }

    // =========================================================================
    // Reductions
    // =========================================================================

    pub fn reduce(&mut self, op: ReduceOp, operand: usize, axes: &[usize]) -> Result<usize> {
        let node = self.node(operand)?;
        let rank = node.shape.len();
        for (i, &axis) in axes.iter().enumerate() {
            ensure!(axis < rank, InvalidAxisSnafu { axis, rank });
            ensure!(!axes[..i].contains(&axis), DuplicateAxisSnafu { axis });
        }
        let shape: Shape =
            node.shape.iter().enumerate().filter(|(axis, _)| !axes.contains(axis)).map(|(_, &d)| d).collect();
        let dtype = node.dtype;
        let op = Op::Reduce { op, axes: SmallVec::from_slice(axes) };
        self.push(Node { op, dtype, shape, lhs: Some(operand), rhs: None })
    }

    // =========================================================================
    // Index modifiers
    // =========================================================================

    pub fn reshape(&mut self, operand: usize, new_shape: &[usize]) -> Result<usize> {
        let node = self.node(operand)?;
        let input_size = shape::numel(&node.shape);
        let output_size = shape::numel(new_shape);
        ensure!(input_size == output_size, ReshapeSizeMismatchSnafu { input_size, output_size });
        let dtype = node.dtype;
        self.push(Node { op: Op::Reshape, dtype, shape: Shape::from_slice(new_shape), lhs: Some(operand), rhs: None })
    }

    /// Reverse the axis order (a swap for matrices).
    pub fn trans(&mut self, operand: usize) -> Result<usize> {
        let node = self.node(operand)?;
        let shape: Shape = node.shape.iter().rev().copied().collect();
        let dtype = node.dtype;
        self.push(Node { op: Op::Trans, dtype, shape, lhs: Some(operand), rhs: None })
    }

    pub fn diag_vector(&mut self, operand: usize) -> Result<usize> {
        let node = self.node(operand)?;
        let actual = node.shape.len();
        ensure!(actual == 2, RankMismatchSnafu { op: "diag_vector", expected: 2usize, actual });
        let shape: Shape = smallvec![node.shape[0].min(node.shape[1])];
        let dtype = node.dtype;
        self.push(Node { op: Op::DiagVector, dtype, shape, lhs: Some(operand), rhs: None })
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    pub fn sfor(&mut self, body: usize, spec: LoopSpec) -> Result<usize> {
        let node = self.node(body)?;
        let (dtype, shape) = (node.dtype, node.shape.clone());
        self.push(Node { op: Op::Sfor(spec), dtype, shape, lhs: Some(body), rhs: None })
    }
}
