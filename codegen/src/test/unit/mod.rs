pub mod mapping;
pub mod table;

use kernmap_ir::ExpressionTree;

use crate::{Context, MappingConfig, SymbolTable, map_tree};

/// Map `root` with the CPU context and default configuration.
pub(crate) fn map(tree: &ExpressionTree, root: usize) -> SymbolTable {
    map_tree(tree, root, &Context::default(), &MappingConfig::default()).expect("mapping failed")
}
