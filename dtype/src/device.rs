//! Device tags attached to code-generation objects.

/// Device a kernel is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceSpec {
    /// Host CPU, kernels compiled as plain C.
    #[default]
    Cpu,
    /// CUDA device by ordinal.
    Cuda(usize),
    /// OpenCL device by ordinal.
    OpenCl(usize),
}

/// Source dialect of generated kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    C,
    Cuda,
    OpenCl,
}

impl DeviceSpec {
    pub const fn backend(&self) -> Backend {
        match self {
            Self::Cpu => Backend::C,
            Self::Cuda(_) => Backend::Cuda,
            Self::OpenCl(_) => Backend::OpenCl,
        }
    }
}

impl Backend {
    /// Whether math builtins are overloaded on the argument type.
    ///
    /// C needs the `f`-suffixed variants for `float` (`sqrtf`), the GPU dialects do not.
    pub const fn has_overloaded_math(&self) -> bool {
        !matches!(self, Self::C)
    }
}
