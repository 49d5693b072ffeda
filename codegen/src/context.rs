//! Device context handle shared by mapping passes.

use kernmap_dtype::{Backend, DeviceSpec, ScalarDType};

/// Read-only device context.
///
/// Leaves are tagged with its device; its backend decides how math builtins and
/// special float literals are spelled. Passes running on different threads share
/// one context through `Arc`, nothing in the engine mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Context {
    device: DeviceSpec,
}

impl Context {
    pub fn new(device: DeviceSpec) -> Self {
        Self { device }
    }

    pub fn device(&self) -> DeviceSpec {
        self.device
    }

    pub fn backend(&self) -> Backend {
        self.device.backend()
    }

    /// Name of a floating-point math builtin for `dtype` (`sqrtf` on C, `sqrt` on GPUs).
    pub fn math_fn(&self, name: &str, dtype: ScalarDType) -> String {
        match dtype {
            ScalarDType::Float64 => name.to_string(),
            _ if self.backend().has_overloaded_math() => name.to_string(),
            // For half, compute through float
            _ => format!("{name}f"),
        }
    }

    /// Positive infinity literal for a float dtype.
    pub fn infinity(&self, dtype: ScalarDType) -> String {
        let is_f64 = matches!(dtype, ScalarDType::Float64);
        match self.backend() {
            Backend::C if is_f64 => "__builtin_inf()".to_string(),
            Backend::C => "__builtin_inff()".to_string(),
            Backend::OpenCl => "INFINITY".to_string(),
            Backend::Cuda if is_f64 => "__longlong_as_double(0x7ff0000000000000LL)".to_string(),
            Backend::Cuda => "__int_as_float(0x7f800000)".to_string(),
        }
    }
}
