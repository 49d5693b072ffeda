//! The per-pass symbol table.

use std::collections::{BTreeMap, BTreeSet};

use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::macros::{self, Macro};
use crate::object::{Object, ObjectKind};
use crate::types::KernelArg;

/// Code-generation objects keyed by tree position.
///
/// One entry per visited node; entries are never replaced once inserted.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    objects: BTreeMap<usize, Object>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the object built for the node at `position`.
    pub fn insert(&mut self, position: usize, object: Object) -> Result<()> {
        ensure!(!self.objects.contains_key(&position), DuplicateNodeSnafu { position });
        self.objects.insert(position, object);
        Ok(())
    }

    pub fn lookup(&self, position: usize) -> Result<&Object> {
        self.objects.get(&position).context(UnknownNodeSnafu { position })
    }

    pub fn get(&self, position: usize) -> Option<&Object> {
        self.objects.get(&position)
    }

    pub fn contains(&self, position: usize) -> bool {
        self.objects.contains_key(&position)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Entries in position order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Object)> {
        self.objects.iter().map(|(&position, object)| (position, object))
    }

    /// Every helper requested by any object, deduplicated.
    pub fn macros(&self) -> BTreeSet<&Macro> {
        self.objects.values().flat_map(Object::macros).collect()
    }

    /// `#define` lines for [`Self::macros`], one per distinct helper.
    pub fn prelude(&self) -> String {
        macros::render_definitions(self.macros())
    }

    /// Inline every known helper call in `text`.
    pub fn expand(&self, text: &str) -> String {
        macros::expand_all(text, self.macros())
    }

    /// Kernel parameters in position order.
    ///
    /// Buffers contribute their pointer followed by their start offset and
    /// strides; host scalars contribute themselves. Names shared by several
    /// objects (views, uniform strides) are listed once.
    pub fn kernel_args(&self) -> Result<Vec<KernelArg>> {
        let mut args = Vec::new();
        let mut seen = BTreeSet::new();
        let mut push = |arg: KernelArg, args: &mut Vec<KernelArg>| {
            if seen.insert(arg.name.clone()) {
                args.push(KernelArg { index: args.len(), ..arg });
            }
        };

        for object in self.objects.values() {
            match object.kind() {
                ObjectKind::Buffer(layout) => {
                    push(KernelArg::pointer(0, object.attr("pointer")?, object.dtype(), layout.written), &mut args);
                    push(KernelArg::layout(0, object.attr("start")?, layout.start), &mut args);
                    for (axis, &stride) in layout.strides.iter().enumerate() {
                        push(KernelArg::layout(0, object.attr(&format!("stride{axis}"))?, stride), &mut args);
                    }
                }
                ObjectKind::HostScalar => push(KernelArg::scalar(0, object.attr("name")?, object.dtype()), &mut args),
                _ => {}
            }
        }
        Ok(args)
    }

    /// Compose the text of the subtree rooted at `position`.
    ///
    /// Leaves and views evaluate to their access expression. Array operands are
    /// broadcast against the loop domain of the enclosing expression: the shape
    /// of `position` itself, or under a reduction the reduced operand's shape.
    /// Reductions feed their accumulator to the parent. Infix children are
    /// parenthesised.
    pub fn render(&self, position: usize) -> Result<String> {
        self.render_in(position, None)
    }

    fn render_in(&self, position: usize, domain: Option<&[usize]>) -> Result<String> {
        let object = self.lookup(position)?;
        let links = match object.kind() {
            ObjectKind::IndexModifier { .. } => None,
            _ => object.links(),
        };
        let Some(links) = links else {
            return object.evaluate(&BTreeMap::<&str, &str>::new());
        };

        let domain = match object.kind() {
            ObjectKind::Reduction { .. } => None,
            _ => Some(domain.unwrap_or(links.shape())),
        };
        let mut operands = BTreeMap::new();
        for (slot, child) in [("0", links.lhs_position()), ("1", links.rhs_position())] {
            if let Some(child) = child {
                operands.insert(slot, self.render_operand(child, domain)?);
            }
        }
        object.evaluate(&operands)
    }

    fn render_operand(&self, position: usize, domain: Option<&[usize]>) -> Result<String> {
        let object = self.lookup(position)?;
        match (object.kind(), domain) {
            (ObjectKind::Reduction { .. }, _) => Ok(object.attr("acc")?.to_string()),
            (ObjectKind::BinaryArithmetic { form, .. }, _) if form.needs_grouping() => {
                Ok(format!("({})", self.render_in(position, domain)?))
            }
            (_, Some(domain)) if object.is_array() => object.make_broadcast(domain),
            _ => self.render_in(position, domain),
        }
    }
}
