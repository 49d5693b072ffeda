//! Operator enums for tree nodes.

/// Unary operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum UnaryOp {
    /// Negation: -x
    Neg,
    /// Logical not: !x
    Not,
    /// Absolute value: |x|
    Abs,
    /// Square root: √x
    Sqrt,
    /// Natural exponential: e^x
    Exp,
    /// Natural logarithm: ln(x)
    Log,
    /// Sine: sin(x)
    Sin,
    /// Cosine: cos(x)
    Cos,
    /// Hyperbolic tangent: tanh(x)
    Tanh,
    /// Round towards negative infinity
    Floor,
    /// Round towards positive infinity
    Ceil,
    /// Conversion to the node's result dtype.
    Cast,
}

/// Binary operation types.
///
/// Comparison operations (Lt, Le, Gt, Ge, Eq, Ne) produce Bool.
/// `Assign` writes the right operand into the left one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// C-style remainder (sign of the dividend).
    Mod,
    Max,
    Min,
    Pow,

    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,

    And,
    Or,
    Xor,
    Shl,
    Shr,

    Assign,
}

impl BinaryOp {
    /// Returns true if this is a comparison operation.
    pub fn is_comparison(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne)
    }

    /// Returns true if this operation is rendered as a function call rather than infix.
    pub fn is_function(self) -> bool {
        matches!(self, Self::Max | Self::Min | Self::Pow)
    }

    /// Returns true if the left operand is written rather than read.
    pub fn writes_lhs(self) -> bool {
        matches!(self, Self::Assign)
    }
}

/// Reduction operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ReduceOp {
    /// Sum reduction (a + b).
    Add,
    /// Product reduction (a * b).
    Mul,
    /// Maximum reduction (max(a, b)).
    Max,
    /// Minimum reduction (min(a, b)).
    Min,
}

/// Bounds of a structured scalar loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopSpec {
    /// Nesting level; names the induction variable of the matching placeholder.
    pub level: usize,
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl LoopSpec {
    pub const fn new(level: usize, start: i64, end: i64, step: i64) -> Self {
        Self { level, start, end, step }
    }

    /// Number of iterations the loop performs.
    pub fn trip_count(&self) -> usize {
        if self.step == 0 || (self.end - self.start).signum() != self.step.signum() {
            return 0;
        }
        ((self.end - self.start).unsigned_abs()).div_ceil(self.step.unsigned_abs()) as usize
    }
}
