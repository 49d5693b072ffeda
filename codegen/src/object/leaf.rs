//! Leaf objects: buffers, host scalars and loop placeholders.

use kernmap_dtype::{DeviceSpec, ScalarDType};
use kernmap_ir::Shape;
use snafu::ensure;

use super::{Object, ObjectId, ObjectKind};
use crate::error::*;
use crate::macros::Macro;

/// Concrete layout of a buffer leaf. Values become kernel arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLayout {
    pub shape: Shape,
    pub strides: Shape,
    pub start: usize,
    /// Set once the buffer is registered as an assignment target.
    pub written: bool,
}

impl BufferLayout {
    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    /// Innermost axis has unit stride (vacuously true for rank 0).
    pub fn is_unit_inner(&self) -> bool {
        self.strides.last().is_none_or(|&s| s == 1)
    }

    pub fn is_uniform(&self) -> bool {
        self.strides.windows(2).all(|w| w[0] == w[1])
    }
}

impl Object {
    /// Strided buffer.
    ///
    /// Registers `pointer`, `start`, `dim`, one `stride<k>` per axis and `ld`
    /// for rank 2 and up. When every axis shares a stride the shared `stride`
    /// attribute is registered and each `stride<k>` aliases it, so the kernel
    /// receives a single parameter.
    pub fn buffer(
        device: DeviceSpec,
        dtype: ScalarDType,
        id: ObjectId,
        shape: &[usize],
        strides: &[usize],
        start: usize,
    ) -> Result<Self> {
        let layout =
            BufferLayout { shape: Shape::from_slice(shape), strides: Shape::from_slice(strides), start, written: false };
        let mut object = Self::with_kind(device, dtype, id, ObjectKind::Buffer(layout.clone()));
        ensure!(
            strides.len() == shape.len(),
            ShapeMismatchSnafu { object: object.handle(), dim: shape.len(), strides: strides.len() }
        );

        object.set_attr("pointer", object.process("#name"));
        object.set_attr("start", object.process("#name_start"));
        object.set_attr("dim", layout.dim().to_string());

        if layout.dim() > 0 && layout.is_uniform() {
            let shared = object.process("#name_stride");
            object.set_attr("stride", shared.clone());
            for axis in 0..layout.dim() {
                object.set_attr(&format!("stride{axis}"), shared.clone());
            }
        } else {
            for axis in 0..layout.dim() {
                object.set_attr(&format!("stride{axis}"), object.process(&format!("#name_stride{axis}")));
            }
        }
        if layout.dim() >= 2 {
            let leading = object.process("#stride0");
            object.set_attr("ld", leading);
        }
        Ok(object)
    }

    /// Scalar passed by value from the host.
    pub fn host_scalar(device: DeviceSpec, dtype: ScalarDType, id: ObjectId) -> Self {
        Self::with_kind(device, dtype, id, ObjectKind::HostScalar)
    }

    /// Induction variable of the loop at `level`, named `<prefix><level>`.
    pub fn placeholder(device: DeviceSpec, level: usize, prefix: &str) -> Self {
        let id = ObjectId::Named(format!("{prefix}{level}"));
        let mut object = Self::with_kind(device, ScalarDType::Int32, id, ObjectKind::Placeholder { level });
        object.set_attr("level", level.to_string());
        object
    }

    /// Register the `<handle>_at(i0, ..)` element helper of a buffer.
    ///
    /// The contiguous path needs a unit innermost stride; it drops that stride
    /// and, for matrices, indexes rows through `ld`. A contiguous request on a
    /// buffer without unit innermost stride falls back to the strided path.
    pub(super) fn add_access(&mut self, contiguous: bool, store: bool) {
        if !matches!(self.kind, ObjectKind::Buffer(_)) {
            tracing::trace!(handle = %self.id, kind = self.kind_name(), "no storage to access");
            return;
        }
        let ObjectKind::Buffer(layout) = &mut self.kind else { return };
        layout.written |= store;
        let dim = layout.dim();
        let contiguous = contiguous && dim > 0 && layout.is_unit_inner();

        let params: Vec<String> = (0..dim).map(|axis| format!("i{axis}")).collect();
        let mut terms = vec!["#start".to_string()];
        for (axis, param) in params.iter().enumerate() {
            let is_inner = axis + 1 == dim;
            terms.push(match (contiguous, is_inner) {
                (true, true) => format!("({param})"),
                (true, false) if dim == 2 => format!("({param})*#ld"),
                _ => format!("({param})*#stride{axis}"),
            });
        }

        let body = self.process(&format!("#pointer[{}]", terms.join(" + ")));
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        let helper = Macro::new(self.process("#handle_at"), &params, body);
        tracing::debug!(handle = %self.id, contiguous, store, helper = %helper, "registered access helper");

        self.set_attr("access", if contiguous { "contiguous" } else { "strided" });
        self.add_macro(helper);
    }
}
