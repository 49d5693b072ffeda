//! Code-generation objects.
//!
//! One [`Object`] exists per visited tree node. The object kinds form a closed
//! set ([`ObjectKind`]); a single match on the kind selects how an object is
//! rendered. Objects never own each other: node kinds keep the positions of
//! their operands and resolve them through the [`SymbolTable`].

mod leaf;
mod node;

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use kernmap_dtype::{DeviceSpec, ScalarDType};
use kernmap_ir::{LoopSpec, Op, Shape};
use snafu::OptionExt;

use crate::error::*;
use crate::macros::Macro;
use crate::table::SymbolTable;
use crate::template;

pub use leaf::BufferLayout;
pub use node::{IndexModifier, OperatorForm};

/// Identity of an object: a generated numeric id or an externally supplied name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectId {
    Generated { prefix: String, id: u32 },
    Named(String),
}

impl ObjectId {
    pub fn generated(prefix: &str, id: u32) -> Self {
        Self::Generated { prefix: prefix.to_string(), id }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated { prefix, id } => write!(f, "{prefix}{id}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Operand links of a non-leaf object.
///
/// Children are kept as tree positions and looked up in the table on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLinks {
    position: usize,
    op: Op,
    shape: Shape,
    lhs: Option<usize>,
    rhs: Option<usize>,
}

impl NodeLinks {
    /// Capture the links of the node at `position`; both children must already be in `table`.
    pub fn new(position: usize, node: &kernmap_ir::Node, table: &SymbolTable) -> Result<Self> {
        for child in node.children() {
            table.lookup(child)?;
        }
        Ok(Self { position, op: node.op.clone(), shape: node.shape.clone(), lhs: node.lhs, rhs: node.rhs })
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    /// Output shape of the node.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn lhs_position(&self) -> Option<usize> {
        self.lhs
    }

    pub fn rhs_position(&self) -> Option<usize> {
        self.rhs
    }

    pub fn lhs<'t>(&self, table: &'t SymbolTable) -> Result<Option<&'t Object>> {
        self.lhs.map(|p| table.lookup(p)).transpose()
    }

    pub fn rhs<'t>(&self, table: &'t SymbolTable) -> Result<Option<&'t Object>> {
        self.rhs.map(|p| table.lookup(p)).transpose()
    }

    /// The operand a unary-shaped node wraps.
    pub(crate) fn operand<'t>(&self, table: &'t SymbolTable) -> Result<&'t Object> {
        self.lhs(table)?.context(InvalidOperandSnafu { position: self.position, reason: "missing operand" })
    }
}

/// Closed set of object kinds.
#[derive(Debug, Clone, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ObjectKind {
    Buffer(BufferLayout),
    HostScalar,
    Placeholder { level: usize },
    BinaryArithmetic { links: NodeLinks, form: OperatorForm },
    UnaryArithmetic { links: NodeLinks, form: OperatorForm },
    /// Collapses its operand along `scopes` (1 or 2) axes.
    Reduction { links: NodeLinks, scopes: usize },
    IndexModifier { links: NodeLinks, modifier: IndexModifier, shape: Shape },
    Sfor { links: NodeLinks, spec: LoopSpec },
}

/// A per-node code-generation object.
#[derive(Debug, Clone)]
pub struct Object {
    id: ObjectId,
    dtype: ScalarDType,
    device: DeviceSpec,
    attributes: BTreeMap<String, String>,
    macros: BTreeSet<Macro>,
    hierarchy: Vec<String>,
    kind: ObjectKind,
}

impl Object {
    /// Base state shared by every kind: `handle`, `name` and `scalartype` attributes.
    fn with_kind(device: DeviceSpec, dtype: ScalarDType, id: ObjectId, kind: ObjectKind) -> Self {
        let handle = id.to_string();
        let attributes = BTreeMap::from([
            ("handle".to_string(), handle.clone()),
            ("name".to_string(), handle),
            ("scalartype".to_string(), dtype.c_style().to_string()),
        ]);
        Self { id, dtype, device, attributes, macros: BTreeSet::new(), hierarchy: Vec::new(), kind }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn dtype(&self) -> ScalarDType {
        self.dtype
    }

    pub fn device(&self) -> DeviceSpec {
        self.device
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Kind name as used in logs (`buffer`, `reduce_1d`, `trans`, ...).
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Reduction { scopes: 1, .. } => "reduce_1d",
            ObjectKind::Reduction { .. } => "reduce_2d",
            ObjectKind::IndexModifier { modifier, .. } => modifier.into(),
            kind => kind.into(),
        }
    }

    pub fn links(&self) -> Option<&NodeLinks> {
        match &self.kind {
            ObjectKind::Buffer(_) | ObjectKind::HostScalar | ObjectKind::Placeholder { .. } => None,
            ObjectKind::BinaryArithmetic { links, .. }
            | ObjectKind::UnaryArithmetic { links, .. }
            | ObjectKind::Reduction { links, .. }
            | ObjectKind::IndexModifier { links, .. }
            | ObjectKind::Sfor { links, .. } => Some(links),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.links().is_none()
    }

    /// Whether the object exposes array storage (buffers and views over them).
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Buffer(_) | ObjectKind::IndexModifier { .. })
    }

    /// Shape of array objects.
    pub fn shape(&self) -> Option<&[usize]> {
        match &self.kind {
            ObjectKind::Buffer(layout) => Some(&layout.shape),
            ObjectKind::IndexModifier { shape, .. } => Some(shape),
            _ => None,
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn hasattr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attr(&self, name: &str) -> Result<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .context(MissingAttributeSnafu { object: self.handle(), name })
    }

    /// Own identifier; differs from `name` for views that expose their operand's storage.
    pub fn handle(&self) -> String {
        self.id.to_string()
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Substitute `#attribute` tokens, see [`crate::template`].
    pub fn process(&self, template: &str) -> String {
        template::substitute(template, &self.attributes)
    }

    // =========================================================================
    // Naming scopes
    // =========================================================================

    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    /// Push a naming-scope token.
    pub fn add_base(&mut self, token: &str) {
        self.hierarchy.push(token.to_string());
    }

    /// `<handle>_<scope tokens>_<suffix>`, using every scope token.
    pub fn qualify(&self, suffix: &str) -> String {
        self.qualify_at(self.hierarchy.len(), suffix)
    }

    /// Qualified name using only the outermost `depth` scope tokens.
    pub fn qualify_at(&self, depth: usize, suffix: &str) -> String {
        let mut parts = vec![self.handle()];
        parts.extend(self.hierarchy.iter().take(depth).cloned());
        parts.push(suffix.to_string());
        parts.join("_")
    }

    // =========================================================================
    // Macros
    // =========================================================================

    pub fn macros(&self) -> &BTreeSet<Macro> {
        &self.macros
    }

    pub(crate) fn add_macro(&mut self, m: Macro) {
        self.macros.insert(m);
    }

    /// Register the element-access helpers used to read this object.
    ///
    /// Only buffers own storage; other kinds either compose their operand's
    /// helpers at construction or are plain names, so this is a no-op for them.
    pub fn add_load(&mut self, contiguous: bool) {
        self.add_access(contiguous, false);
    }

    /// Register the element-access helpers used to write this object.
    pub fn add_store(&mut self, contiguous: bool) {
        self.add_access(contiguous, true);
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render this object's fragment.
    ///
    /// Leaves and index modifiers ignore `operands` and return their access
    /// expression. Other nodes substitute the already rendered text of their
    /// operands, found under slots `"0"` (lhs) and `"1"` (rhs).
    pub fn evaluate<K, V>(&self, operands: &BTreeMap<K, V>) -> Result<String>
    where
        K: Borrow<str> + Ord,
        V: AsRef<str>,
    {
        let slot = |slot: &str| -> Result<&str> {
            operands
                .get(slot)
                .map(|text| text.as_ref())
                .context(MissingOperandSnafu { object: self.handle(), slot })
        };

        match &self.kind {
            ObjectKind::Buffer(layout) => self.make_broadcast(&layout.shape),
            ObjectKind::IndexModifier { shape, .. } => self.make_broadcast(shape),
            ObjectKind::HostScalar | ObjectKind::Placeholder { .. } => Ok(self.attr("name")?.to_string()),
            ObjectKind::BinaryArithmetic { form, .. } => Ok(form.render_binary(slot("0")?, slot("1")?)),
            ObjectKind::UnaryArithmetic { form, .. } => Ok(form.render_unary(slot("0")?)),
            ObjectKind::Reduction { .. } => {
                let target = if self.hasattr("acc_inner") { self.attr("acc_inner")? } else { self.attr("acc")? };
                Ok(format!("{target} = {}({target}, {})", self.attr("combine")?, slot("0")?))
            }
            // Loop header and footer belong to the kernel-body synthesizer.
            ObjectKind::Sfor { .. } => Ok(slot("0")?.to_string()),
        }
    }

    /// Index expression of an array object broadcast against `target`.
    ///
    /// Source axes are right-aligned with the target. An axis of source extent 1
    /// is pinned to `0`, any other axis reads the loop index `$<target axis>`.
    pub fn make_broadcast(&self, target: &[usize]) -> Result<String> {
        let source = self.shape().context(InvalidOperandSnafu {
            position: self.links().map_or(0, NodeLinks::position),
            reason: format!("{} is not an array", self.kind_name()),
        })?;
        let mismatch =
            || BroadcastMismatchSnafu { source_shape: Shape::from_slice(source), target: Shape::from_slice(target) };
        snafu::ensure!(source.len() <= target.len(), mismatch());

        let offset = target.len() - source.len();
        let args = source
            .iter()
            .enumerate()
            .map(|(axis, &extent)| {
                let target_extent = target[axis + offset];
                match extent {
                    1 => Ok("0".to_string()),
                    _ if extent == target_extent => Ok(format!("${}", axis + offset)),
                    _ => mismatch().fail(),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self.process(&format!("#handle_at({})", args.join(", "))))
    }
}
