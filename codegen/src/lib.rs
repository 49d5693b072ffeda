//! Symbolic-to-source mapping for generated array kernels.
//!
//! For each compiled kernel, the engine walks an array-expression tree once and
//! builds a [`SymbolTable`] holding one code-generation [`Object`] per visited
//! node. Objects render the text of their node, carry the helper macros that
//! text calls and expose the attributes (pointer names, strides, accumulators)
//! a kernel-body synthesizer needs.
//!
//! # Architecture
//!
//! - **Objects**: closed set of kinds (leaves, arithmetic, reductions, index
//!   modifiers, loops) with a shared attribute/macro/scope contract
//! - **Templating**: `#attribute` substitution used to build every fragment
//! - **Symbol table**: position-keyed arena, prelude and kernel arguments
//! - **Mapping**: the child-before-parent tree walk
//!
//! # Usage
//!
//! ```ignore
//! use kernmap_codegen::{Context, SymbolTable};
//!
//! let table = SymbolTable::build(&tree, &Context::default())?;
//! let source = format!("{}{}", table.prelude(), table.render(root)?);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod macros;
pub mod mapping;
pub mod object;
pub mod table;
pub mod template;
pub mod types;

#[cfg(test)]
pub mod test;

pub use config::MappingConfig;
pub use context::Context;
pub use error::*;
pub use macros::Macro;
pub use mapping::map_tree;
pub use object::{BufferLayout, IndexModifier, NodeLinks, Object, ObjectId, ObjectKind, OperatorForm};
pub use table::SymbolTable;
pub use types::*;
