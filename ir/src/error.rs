use snafu::Snafu;

use crate::shape::Shape;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A node referenced a child position that does not exist yet.
    #[snafu(display("node at position {position} references missing child {child}"))]
    InvalidChild { position: usize, child: usize },

    /// Reshape size mismatch.
    #[snafu(display("reshape size mismatch: input size {input_size} != output size {output_size}"))]
    ReshapeSizeMismatch { input_size: usize, output_size: usize },

    /// Reduction or index-modifier axis outside the operand's rank.
    #[snafu(display("axis {axis} is out of range for rank {rank}"))]
    InvalidAxis { axis: usize, rank: usize },

    /// Reduction axes repeat.
    #[snafu(display("axis {axis} is reduced more than once"))]
    DuplicateAxis { axis: usize },

    /// Operand shapes cannot be broadcast together.
    #[snafu(display("cannot broadcast {lhs:?} with {rhs:?}"))]
    BroadcastMismatch { lhs: Shape, rhs: Shape },

    /// Operation requires an operand of a different rank.
    #[snafu(display("{op} expects a rank-{expected} operand, got rank {actual}"))]
    RankMismatch { op: &'static str, expected: usize, actual: usize },

    /// The tree has no nodes to walk.
    #[snafu(display("expression tree is empty"))]
    EmptyTree,
}
