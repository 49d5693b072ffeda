//! Error types for the mapping engine.
//!
//! Every variant is a contract violation detected while building or rendering
//! a symbol table; none of them is retried, the current pass is aborted.

use kernmap_ir::Shape;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Lookup of a position that was never inserted (child visited after parent).
    #[snafu(display("unknown node at position {position}"))]
    UnknownNode { position: usize },

    /// Second insertion at the same position (node visited twice).
    #[snafu(display("node at position {position} is already registered"))]
    DuplicateNode { position: usize },

    /// Read of an attribute no construction step registered.
    #[snafu(display("object {object} has no attribute '{name}'"))]
    MissingAttribute { object: String, name: String },

    /// Buffer stride tuple disagrees with its dimensionality.
    #[snafu(display("buffer {object}: {strides} strides for a rank-{dim} shape"))]
    ShapeMismatch { object: String, dim: usize, strides: usize },

    /// A node was evaluated without the rendered text of one of its operands.
    #[snafu(display("object {object} evaluated without operand slot \"{slot}\""))]
    MissingOperand { object: String, slot: String },

    /// Source shape cannot be broadcast against the requested target.
    #[snafu(display("cannot broadcast {source_shape:?} to {target:?}"))]
    BroadcastMismatch { source_shape: Shape, target: Shape },

    /// A node's operand is of a kind or rank the node cannot wrap.
    #[snafu(display("invalid operand for node at position {position}: {reason}"))]
    InvalidOperand { position: usize, reason: String },

    /// Error from the expression tree.
    #[snafu(display("tree error: {source}"))]
    Tree {
        #[snafu(source)]
        source: kernmap_ir::Error,
    },
}

impl From<kernmap_ir::Error> for Error {
    fn from(source: kernmap_ir::Error) -> Self {
        Self::Tree { source }
    }
}
