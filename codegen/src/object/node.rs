//! Node objects: arithmetic, reductions, index modifiers and scalar loops.

use kernmap_dtype::{Backend, ScalarDType};
use kernmap_ir::{BinaryOp, Node, Op, ReduceOp, Shape, UnaryOp};
use snafu::ensure;

use super::{NodeLinks, Object, ObjectId, ObjectKind};
use crate::context::Context;
use crate::error::*;
use crate::macros::Macro;
use crate::table::SymbolTable;

/// How an operator wraps its operand texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorForm {
    /// `a OP b`
    Infix(&'static str),
    /// `f(a, b)` or `f(x)`
    Function(String),
    /// `OP(x)`
    Prefix(&'static str),
    /// `(T)(x)`
    Cast(&'static str),
    /// `((a) CMP (b) ? (a) : (b))`, integer max/min where no builtin exists.
    Select(&'static str),
}

impl OperatorForm {
    fn binary(op: BinaryOp, dtype: ScalarDType, context: &Context) -> Self {
        let float = dtype.is_float();
        match op {
            BinaryOp::Add => Self::Infix("+"),
            BinaryOp::Sub => Self::Infix("-"),
            BinaryOp::Mul => Self::Infix("*"),
            BinaryOp::Div => Self::Infix("/"),
            BinaryOp::Mod if float => Self::Function(context.math_fn("fmod", dtype)),
            BinaryOp::Mod => Self::Infix("%"),
            BinaryOp::Max if float => Self::Function(context.math_fn("fmax", dtype)),
            BinaryOp::Min if float => Self::Function(context.math_fn("fmin", dtype)),
            BinaryOp::Max if context.backend() == Backend::C => Self::Select(">"),
            BinaryOp::Min if context.backend() == Backend::C => Self::Select("<"),
            BinaryOp::Max => Self::Function("max".to_string()),
            BinaryOp::Min => Self::Function("min".to_string()),
            BinaryOp::Pow => Self::Function(context.math_fn("pow", dtype)),
            BinaryOp::Lt => Self::Infix("<"),
            BinaryOp::Le => Self::Infix("<="),
            BinaryOp::Gt => Self::Infix(">"),
            BinaryOp::Ge => Self::Infix(">="),
            BinaryOp::Eq => Self::Infix("=="),
            BinaryOp::Ne => Self::Infix("!="),
            BinaryOp::And if dtype.is_bool() => Self::Infix("&&"),
            BinaryOp::Or if dtype.is_bool() => Self::Infix("||"),
            BinaryOp::And => Self::Infix("&"),
            BinaryOp::Or => Self::Infix("|"),
            BinaryOp::Xor => Self::Infix("^"),
            BinaryOp::Shl => Self::Infix("<<"),
            BinaryOp::Shr => Self::Infix(">>"),
            BinaryOp::Assign => Self::Infix("="),
        }
    }

    fn unary(op: UnaryOp, operand: ScalarDType, result: ScalarDType, context: &Context) -> Self {
        let math = |name: &str| Self::Function(context.math_fn(name, operand));
        match op {
            UnaryOp::Neg => Self::Prefix("-"),
            UnaryOp::Not => Self::Prefix("!"),
            UnaryOp::Abs if operand.is_float() => math("fabs"),
            UnaryOp::Abs if context.backend() == Backend::C && operand.bytes() == 8 => {
                Self::Function("llabs".to_string())
            }
            UnaryOp::Abs => Self::Function("abs".to_string()),
            UnaryOp::Sqrt => math("sqrt"),
            UnaryOp::Exp => math("exp"),
            UnaryOp::Log => math("log"),
            UnaryOp::Sin => math("sin"),
            UnaryOp::Cos => math("cos"),
            UnaryOp::Tanh => math("tanh"),
            UnaryOp::Floor => math("floor"),
            UnaryOp::Ceil => math("ceil"),
            UnaryOp::Cast => Self::Cast(result.c_style()),
        }
    }

    /// Operator spelling stored in the `op` attribute.
    pub fn spelling(&self) -> String {
        match self {
            Self::Infix(op) | Self::Prefix(op) | Self::Select(op) => op.to_string(),
            Self::Function(name) => name.clone(),
            Self::Cast(ty) => format!("({ty})"),
        }
    }

    /// Whether the rendered text needs parentheses when nested in another expression.
    pub fn needs_grouping(&self) -> bool {
        matches!(self, Self::Infix(_))
    }

    pub fn render_binary(&self, lhs: &str, rhs: &str) -> String {
        match self {
            Self::Infix(op) => format!("{lhs} {op} {rhs}"),
            Self::Function(name) => format!("{name}({lhs}, {rhs})"),
            Self::Select(cmp) => format!("(({lhs}) {cmp} ({rhs}) ? ({lhs}) : ({rhs}))"),
            Self::Prefix(op) => format!("{op}({lhs}, {rhs})"),
            Self::Cast(ty) => format!("({ty})({lhs})"),
        }
    }

    pub fn render_unary(&self, operand: &str) -> String {
        match self {
            Self::Function(name) => format!("{name}({operand})"),
            Self::Prefix(op) => format!("{op}({operand})"),
            Self::Cast(ty) => format!("({ty})({operand})"),
            Self::Infix(op) | Self::Select(op) => format!("{op}({operand})"),
        }
    }
}

/// Derived views over an array operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum IndexModifier {
    Reshape,
    Trans,
    DiagVector,
}

/// Storage attributes a view shares with its operand.
const STORAGE_ATTRIBUTES: [&str; 3] = ["name", "pointer", "start"];

impl Object {
    /// Elementwise binary operator node.
    pub fn binary_arithmetic(
        context: &Context,
        id: ObjectId,
        position: usize,
        node: &Node,
        table: &SymbolTable,
    ) -> Result<Self> {
        let links = NodeLinks::new(position, node, table)?;
        let Op::Binary(op) = node.op else {
            return InvalidOperandSnafu { position, reason: format!("{} is not a binary operator", node.op.as_ref()) }
                .fail();
        };
        // Comparisons produce Bool; the operator is spelled for the operand type.
        let operand_dtype = links.lhs(table)?.map_or(node.dtype, Object::dtype);
        let form = OperatorForm::binary(op, operand_dtype, context);
        let mut object = Self::with_kind(
            context.device(),
            node.dtype,
            id,
            ObjectKind::BinaryArithmetic { links, form: form.clone() },
        );
        object.set_attr("op", form.spelling());
        Ok(object)
    }

    /// Elementwise unary operator node.
    pub fn unary_arithmetic(
        context: &Context,
        id: ObjectId,
        position: usize,
        node: &Node,
        table: &SymbolTable,
    ) -> Result<Self> {
        let links = NodeLinks::new(position, node, table)?;
        let Op::Unary(op) = node.op else {
            return InvalidOperandSnafu { position, reason: format!("{} is not a unary operator", node.op.as_ref()) }
                .fail();
        };
        let operand_dtype = links.operand(table)?.dtype();
        let form = OperatorForm::unary(op, operand_dtype, node.dtype, context);
        let mut object =
            Self::with_kind(context.device(), node.dtype, id, ObjectKind::UnaryArithmetic { links, form: form.clone() });
        object.set_attr("op", form.spelling());
        Ok(object)
    }

    /// Reduction over one (`reduce_1d`) or two (`reduce_2d`) axes.
    ///
    /// Each collapsed axis opens a naming scope. `acc` names the final
    /// accumulator; `reduce_2d` also gets `acc_inner`, the per-scope partial
    /// that [`Object::evaluate`] updates.
    pub fn reduction(
        context: &Context,
        id: ObjectId,
        position: usize,
        node: &Node,
        table: &SymbolTable,
    ) -> Result<Self> {
        let links = NodeLinks::new(position, node, table)?;
        let Op::Reduce { op, axes } = &node.op else {
            return InvalidOperandSnafu { position, reason: format!("{} is not a reduction", node.op.as_ref()) }.fail();
        };
        let (op, scopes) = (*op, axes.len());
        ensure!(
            (1..=2).contains(&scopes),
            InvalidOperandSnafu { position, reason: format!("cannot reduce over {scopes} axes at once") }
        );
        links.operand(table)?;

        let dtype = node.dtype;
        let mut object = Self::with_kind(context.device(), dtype, id, ObjectKind::Reduction { links, scopes });
        for scope in 0..scopes {
            object.add_base(&format!("r{scope}"));
        }
        object.set_attr("acc", object.qualify_at(1, "acc"));
        if scopes == 2 {
            object.set_attr("acc_inner", object.qualify("acc"));
        }
        object.set_attr("init", reduce_identity(op, dtype, context));

        let name = format!("reduce_{}_{}", op.as_ref(), dtype.suffix());
        let combine = Macro::new(name, &["a", "b"], reduce_combine(op, dtype, context));
        object.set_attr("combine", combine.name());
        object.add_macro(combine);
        Ok(object)
    }

    /// Reshape, transpose or diagonal view over an array operand.
    ///
    /// The view keeps its operand's storage attributes and inherits its
    /// helpers, but defines its own `<handle>_at` helper.
    pub fn index_modifier(
        context: &Context,
        id: ObjectId,
        position: usize,
        node: &Node,
        table: &SymbolTable,
    ) -> Result<Self> {
        let links = NodeLinks::new(position, node, table)?;
        let modifier = match node.op {
            Op::Reshape => IndexModifier::Reshape,
            Op::Trans => IndexModifier::Trans,
            Op::DiagVector => IndexModifier::DiagVector,
            ref op => {
                return InvalidOperandSnafu { position, reason: format!("{} is not an index modifier", op.as_ref()) }
                    .fail();
            }
        };
        let operand = links.operand(table)?;
        let Some(source) = operand.shape() else {
            let reason = format!("{} cannot wrap a {}", <&str>::from(modifier), operand.kind_name());
            return InvalidOperandSnafu { position, reason }.fail();
        };
        let source = Shape::from_slice(source);
        let shape = node.shape.clone();

        let kind = ObjectKind::IndexModifier { links, modifier, shape: shape.clone() };
        let mut object = Self::with_kind(context.device(), node.dtype, id, kind);
        for name in STORAGE_ATTRIBUTES {
            if let Some(value) = operand.attributes().get(name) {
                object.set_attr(name, value.clone());
            }
        }
        for helper in operand.macros() {
            object.add_macro(helper.clone());
        }

        let inner = operand.process("#handle_at");
        let params: Vec<String> = (0..shape.len()).map(|axis| format!("i{axis}")).collect();
        let body = match modifier {
            IndexModifier::Reshape => {
                let flat = flatten_index(&params, &shape);
                format!("{inner}({})", unflatten_index(&flat, &source).join(", "))
            }
            IndexModifier::Trans => {
                for axis in 0..source.len() {
                    let mirrored = format!("stride{}", source.len() - 1 - axis);
                    if let Some(stride) = operand.attributes().get(&mirrored) {
                        object.set_attr(&format!("stride{axis}"), stride.clone());
                    }
                }
                if let Some(leading) = object.attributes().get("stride0").filter(|_| source.len() >= 2).cloned() {
                    object.set_attr("ld", leading);
                }
                let reversed: Vec<&str> = params.iter().rev().map(String::as_str).collect();
                format!("{inner}({})", reversed.join(", "))
            }
            IndexModifier::DiagVector => {
                ensure!(
                    source.len() == 2,
                    InvalidOperandSnafu { position, reason: format!("diag_vector of a rank-{} operand", source.len()) }
                );
                let composite = ["stride0", "stride1", "pointer", "start"].iter().all(|a| operand.hasattr(a));
                if composite {
                    let stride = operand.process("(#stride0 + #stride1)");
                    object.set_attr("stride", stride.clone());
                    object.set_attr("stride0", stride);
                    object.process("#pointer[#start + (i0)*#stride]")
                } else {
                    format!("{inner}(i0, i0)")
                }
            }
        };

        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        let helper = Macro::new(object.process("#handle_at"), &params, body);
        tracing::debug!(handle = %object.id, modifier = <&str>::from(modifier), helper = %helper, "composed view");
        object.add_macro(helper);
        Ok(object)
    }

    /// Structured scalar loop around a body.
    ///
    /// Only bookkeeping: the induction variable and bounds become attributes,
    /// and the loop opens the `sfor<level>` naming scope.
    pub fn sfor(
        context: &Context,
        id: ObjectId,
        position: usize,
        node: &Node,
        table: &SymbolTable,
        prefix: &str,
    ) -> Result<Self> {
        let links = NodeLinks::new(position, node, table)?;
        let Op::Sfor(spec) = node.op else {
            return InvalidOperandSnafu { position, reason: format!("{} is not a loop", node.op.as_ref()) }.fail();
        };
        links.operand(table)?;

        let mut object = Self::with_kind(context.device(), node.dtype, id, ObjectKind::Sfor { links, spec });
        object.add_base(&format!("sfor{}", spec.level));
        object.set_attr("induction", format!("{prefix}{}", spec.level));
        object.set_attr("init", spec.start.to_string());
        object.set_attr("end", spec.end.to_string());
        object.set_attr("inc", spec.step.to_string());
        Ok(object)
    }
}

/// Identity element of a reduction as a literal.
///
/// Max/min start from the extremal value of the type, infinities for floats.
fn reduce_identity(op: ReduceOp, dtype: ScalarDType, context: &Context) -> String {
    let is_f64 = matches!(dtype, ScalarDType::Float64);
    let float = |value: &str| if is_f64 { value.to_string() } else { format!("{value}f") };
    match op {
        ReduceOp::Add if dtype.is_float() => float("0.0"),
        ReduceOp::Add => "0".to_string(),
        ReduceOp::Mul if dtype.is_float() => float("1.0"),
        ReduceOp::Mul => "1".to_string(),
        ReduceOp::Max if dtype.is_float() => format!("-{}", context.infinity(dtype)),
        ReduceOp::Min if dtype.is_float() => context.infinity(dtype),
        ReduceOp::Max => dtype.min_literal().unwrap_or_else(|| "0".to_string()),
        ReduceOp::Min => dtype.max_literal().unwrap_or_else(|| "1".to_string()),
    }
}

/// Body of the `reduce_<op>_<dtype>(a, b)` helper.
///
/// Integer max/min keep the accumulator `a` on ties. Float max/min use
/// `fmax`/`fmin`, which return the non-NaN argument when one side is NaN.
fn reduce_combine(op: ReduceOp, dtype: ScalarDType, context: &Context) -> String {
    match op {
        ReduceOp::Add => "((a) + (b))".to_string(),
        ReduceOp::Mul => "((a) * (b))".to_string(),
        ReduceOp::Max if dtype.is_float() => format!("{}((a), (b))", context.math_fn("fmax", dtype)),
        ReduceOp::Min if dtype.is_float() => format!("{}((a), (b))", context.math_fn("fmin", dtype)),
        ReduceOp::Max => "((a) >= (b) ? (a) : (b))".to_string(),
        ReduceOp::Min => "((a) <= (b) ? (a) : (b))".to_string(),
    }
}

/// Wrap `expr` in parentheses unless it is already a single atom or group.
fn group(expr: &str) -> String {
    let atom = expr.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    let single_group = expr.starts_with('(') && expr.ends_with(')') && {
        let mut depth = 0i32;
        expr.char_indices().all(|(i, c)| {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            depth > 0 || i + 1 == expr.len()
        })
    };
    if atom || single_group { expr.to_string() } else { format!("({expr})") }
}

/// Row-major flat offset of `indices` in `shape`.
fn flatten_index(indices: &[String], shape: &[usize]) -> String {
    if shape.contains(&0) {
        return "0".to_string();
    }
    let terms: Vec<String> = indices
        .iter()
        .enumerate()
        .filter(|(axis, _)| shape[*axis] != 1)
        .map(|(axis, index)| match shape[axis + 1..].iter().product::<usize>() {
            1 => format!("({index})"),
            factor => format!("({index})*{factor}"),
        })
        .collect();
    match terms.len() {
        0 => "0".to_string(),
        _ => terms.join(" + "),
    }
}

/// Multi-index of flat offset `flat` in the row-major `shape`.
fn unflatten_index(flat: &str, shape: &[usize]) -> Vec<String> {
    // An empty shape has no element to address.
    if shape.contains(&0) {
        return vec!["0".to_string(); shape.len()];
    }
    let flat = group(flat);
    (0..shape.len())
        .map(|axis| {
            let extent = shape[axis];
            match (axis, shape[axis + 1..].iter().product::<usize>()) {
                _ if extent == 1 => "0".to_string(),
                (0, 1) => flat.clone(),
                (0, divisor) => format!("{flat}/{divisor}"),
                (_, 1) => format!("{flat}%{extent}"),
                (_, divisor) => format!("({flat}/{divisor})%{extent}"),
            }
        })
        .collect()
}
