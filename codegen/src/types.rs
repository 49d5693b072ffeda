//! Kernel parameter metadata.

use kernmap_dtype::ScalarDType;

/// Role of a kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ArgKind {
    /// Buffer base pointer.
    Pointer,
    /// Scalar passed by value from the host.
    Scalar,
    /// Integer layout parameter (start offset or stride) of a buffer.
    Layout,
}

/// Information about one argument of the generated kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelArg {
    /// Argument index.
    pub index: usize,

    /// Parameter name as referenced by the rendered text.
    pub name: String,

    /// Element type for pointers, value type otherwise.
    pub dtype: ScalarDType,

    pub kind: ArgKind,

    /// Whether the kernel writes through this pointer.
    pub is_output: bool,

    /// Value known at mapping time (layout parameters only).
    pub value: Option<usize>,
}

impl KernelArg {
    pub fn pointer(index: usize, name: impl Into<String>, dtype: ScalarDType, is_output: bool) -> Self {
        Self { index, name: name.into(), dtype, kind: ArgKind::Pointer, is_output, value: None }
    }

    pub fn scalar(index: usize, name: impl Into<String>, dtype: ScalarDType) -> Self {
        Self { index, name: name.into(), dtype, kind: ArgKind::Scalar, is_output: false, value: None }
    }

    pub fn layout(index: usize, name: impl Into<String>, value: usize) -> Self {
        let name = name.into();
        Self { index, name, dtype: ScalarDType::Index, kind: ArgKind::Layout, is_output: false, value: Some(value) }
    }

    /// Parameter declaration, e.g. `float* obj0` or `long long obj0_start`.
    pub fn declaration(&self) -> String {
        match self.kind {
            ArgKind::Pointer if self.is_output => format!("{}* {}", self.dtype.c_style(), self.name),
            ArgKind::Pointer => format!("const {}* {}", self.dtype.c_style(), self.name),
            ArgKind::Scalar | ArgKind::Layout => format!("{} {}", self.dtype.c_style(), self.name),
        }
    }
}
