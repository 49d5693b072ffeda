pub mod device;

#[cfg(any(test, feature = "proptest"))]
pub mod proptest_gen;


pub use device::{Backend, DeviceSpec};

/// Scalar data types carried by expression-tree nodes and code-generation objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::FromRepr, strum::AsRefStr)]
pub enum ScalarDType {
    Bool = 0,

    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Int64 = 7,
    UInt64 = 8,

    Float16 = 9,
    Float32 = 10,
    Float64 = 11,

    /// Index type for array indexing and loop iteration.
    Index = 12,
}

impl ScalarDType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int32 => 4,
            Self::Int64 => 8,
            Self::UInt8 => 1,
            Self::UInt16 => 2,
            Self::UInt32 => 4,
            Self::UInt64 => 8,
            Self::Float16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
            Self::Index => 8, // Treat as 64-bit index
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned() || matches!(self, Self::Index)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// C-family spelling, shared by the C, OpenCL and CUDA dialects.
    pub const fn c_style(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "signed char",
            Self::Int16 => "short",
            Self::Int32 => "int",
            Self::Int64 => "long long",
            Self::UInt8 => "unsigned char",
            Self::UInt16 => "unsigned short",
            Self::UInt32 => "unsigned int",
            Self::UInt64 => "unsigned long long",
            Self::Float16 => "half",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Index => "long long",
        }
    }

    /// Short tag used inside generated identifiers (`reduce_max_f32`).
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Bool => "b",
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::UInt8 => "u8",
            Self::UInt16 => "u16",
            Self::UInt32 => "u32",
            Self::UInt64 => "u64",
            Self::Float16 => "f16",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Index => "idx",
        }
    }

    /// Smallest representable value as a C literal, `None` for floats and bool.
    pub fn min_literal(&self) -> Option<String> {
        Some(match self {
            Self::Int8 => i8::MIN.to_string(),
            Self::Int16 => i16::MIN.to_string(),
            // `-2147483648` is parsed as negation of an out-of-range literal
            Self::Int32 => format!("({} - 1)", i32::MIN + 1),
            Self::Int64 | Self::Index => format!("({}LL - 1)", i64::MIN + 1),
            Self::UInt8 | Self::UInt16 => "0".to_string(),
            Self::UInt32 => "0u".to_string(),
            Self::UInt64 => "0ULL".to_string(),
            Self::Bool | Self::Float16 | Self::Float32 | Self::Float64 => return None,
        })
    }

    /// Largest representable value as a C literal, `None` for floats and bool.
    pub fn max_literal(&self) -> Option<String> {
        Some(match self {
            Self::Int8 => i8::MAX.to_string(),
            Self::Int16 => i16::MAX.to_string(),
            Self::Int32 => i32::MAX.to_string(),
            Self::Int64 | Self::Index => format!("{}LL", i64::MAX),
            Self::UInt8 => u8::MAX.to_string(),
            Self::UInt16 => u16::MAX.to_string(),
            Self::UInt32 => format!("{}u", u32::MAX),
            Self::UInt64 => format!("{}ULL", u64::MAX),
            Self::Bool | Self::Float16 | Self::Float32 | Self::Float64 => return None,
        })
    }
}

impl std::fmt::Display for ScalarDType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.c_style())
    }
}
