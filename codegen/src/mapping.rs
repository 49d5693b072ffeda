//! Tree walker building a [`SymbolTable`] from an expression tree.

use std::collections::BTreeSet;

use kernmap_ir::{BinaryOp, ExpressionTree, Op, OpFamily};
use snafu::OptionExt;

use crate::config::MappingConfig;
use crate::context::Context;
use crate::error::*;
use crate::object::{Object, ObjectId};
use crate::table::SymbolTable;

/// Map the subtree rooted at `root` to code-generation objects.
///
/// Nodes are visited children first. Every node but a placeholder receives the
/// next generated id. Array objects read by some node (or returned at the root)
/// get their load helpers, assignment targets their store helpers, before
/// the object is inserted.
#[tracing::instrument(skip_all, fields(root = root, nodes = tree.len()))]
pub fn map_tree(
    tree: &ExpressionTree,
    root: usize,
    context: &Context,
    config: &MappingConfig,
) -> Result<SymbolTable> {
    let order = tree.toposort(root)?;
    let (read, written) = access_sets(tree, &order, root)?;

    let mut table = SymbolTable::new();
    let mut next_id = 0u32;
    for &position in &order {
        let node = tree.get(position).context(UnknownNodeSnafu { position })?;
        let mut id = || {
            let id = ObjectId::generated(&config.name_prefix, next_id);
            next_id += 1;
            id
        };

        let mut object = match &node.op {
            Op::Buffer(spec) => {
                Object::buffer(context.device(), node.dtype, id(), &node.shape, &spec.strides, spec.start)?
            }
            Op::HostScalar => Object::host_scalar(context.device(), node.dtype, id()),
            Op::Placeholder { level } => Object::placeholder(context.device(), *level, &config.induction_prefix),
            Op::Binary(_) => Object::binary_arithmetic(context, id(), position, node, &table)?,
            Op::Unary(_) => Object::unary_arithmetic(context, id(), position, node, &table)?,
            Op::Reduce { .. } => Object::reduction(context, id(), position, node, &table)?,
            Op::Reshape | Op::Trans | Op::DiagVector => Object::index_modifier(context, id(), position, node, &table)?,
            Op::Sfor(_) => Object::sfor(context, id(), position, node, &table, &config.induction_prefix)?,
        };

        if written.contains(&position) {
            object.add_store(config.contiguous_loads);
        }
        if read.contains(&position) {
            object.add_load(config.contiguous_loads);
        }

        tracing::debug!(
            position,
            op = node.op.as_ref(),
            handle = %object.id(),
            kind = object.kind_name(),
            "mapped node"
        );
        table.insert(position, object)?;
    }

    tracing::debug!(
        backend = context.backend().as_ref(),
        objects = table.len(),
        macros = table.macros().len(),
        "symbol table built"
    );
    Ok(table)
}

/// Positions read and written by the visited nodes.
///
/// The left operand of an assignment is written, every other operand and the
/// root are read. A written view also writes the storage it wraps.
fn access_sets(tree: &ExpressionTree, order: &[usize], root: usize) -> Result<(BTreeSet<usize>, BTreeSet<usize>)> {
    let mut read = BTreeSet::from([root]);
    let mut written = BTreeSet::new();

    // Parents come after their children in `order`.
    for &position in order.iter().rev() {
        let node = tree.get(position).context(UnknownNodeSnafu { position })?;
        match node.op {
            Op::Binary(BinaryOp::Assign) => {
                written.extend(node.lhs);
                read.extend(node.rhs);
            }
            _ => read.extend(node.children()),
        }
        if node.op.family() == OpFamily::IndexModifier && written.contains(&position) {
            written.extend(node.lhs);
        }
    }
    Ok((read, written))
}

impl SymbolTable {
    /// Map a whole tree from its root, configured from the environment.
    pub fn build(tree: &ExpressionTree, context: &Context) -> Result<Self> {
        map_tree(tree, tree.root()?, context, &MappingConfig::from_env())
    }
}
