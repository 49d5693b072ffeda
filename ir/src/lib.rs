//! Array-expression trees for the kernmap mapping engine.
//!
//! The tree is the engine's read-only input: an append-only arena of nodes,
//! each carrying an operator descriptor, a result scalar type, a shape and up
//! to two child positions.
//!
//! # Module Organization
//!
//! - [`types`] - Operator enums (unary, binary, reduction) and loop bounds
//! - [`op`] - Operator descriptor attached to every node
//! - [`shape`] - Concrete shapes and broadcasting helpers
//! - [`tree`] - The node arena and its constructors
//! - [`error`] - Error types and result handling

pub mod error;
pub mod op;
pub mod shape;
pub mod tree;
pub mod types;


pub use error::{Error, Result};
pub use op::{BufferSpec, Op, OpFamily};
pub use shape::Shape;
pub use tree::{ExpressionTree, Node};
pub use types::{BinaryOp, LoopSpec, ReduceOp, UnaryOp};

pub use kernmap_dtype::ScalarDType;
