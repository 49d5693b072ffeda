//! Symbol table tests.

use kernmap_dtype::{DeviceSpec, ScalarDType};
use kernmap_ir::{BinaryOp, ExpressionTree, Node, Op, ReduceOp, UnaryOp};
use smallvec::smallvec;

use super::map;
use crate::error::Error;
use crate::object::{NodeLinks, Object, ObjectId};
use crate::types::ArgKind;
use crate::SymbolTable;

fn scalar(id: u32) -> Object {
    Object::host_scalar(DeviceSpec::Cpu, ScalarDType::Float32, ObjectId::generated("obj", id))
}

#[test]
fn test_insert_twice_is_rejected() {
    let mut table = SymbolTable::new();
    table.insert(0, scalar(0)).unwrap();

    assert!(matches!(table.insert(0, scalar(1)), Err(Error::DuplicateNode { position: 0 })));
    assert_eq!(table.len(), 1);
    assert_eq!(table.lookup(0).unwrap().handle(), "obj0");
}

#[test]
fn test_lookup_of_unvisited_position() {
    let table = SymbolTable::new();

    assert!(table.is_empty());
    assert!(table.get(7).is_none());
    assert!(matches!(table.lookup(7), Err(Error::UnknownNode { position: 7 })));
}

#[test]
fn test_links_require_children_first() {
    let table = SymbolTable::new();
    let node =
        Node { op: Op::Unary(UnaryOp::Neg), dtype: ScalarDType::Float32, shape: smallvec![4], lhs: Some(5), rhs: None };

    assert!(matches!(NodeLinks::new(6, &node, &table), Err(Error::UnknownNode { position: 5 })));
}

#[test]
fn test_identical_helpers_emitted_once() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Float32, &[4, 4]).unwrap();
    let b = tree.dense(ScalarDType::Float32, &[4, 4]).unwrap();
    let sa = tree.reduce(ReduceOp::Add, a, &[1]).unwrap();
    let sb = tree.reduce(ReduceOp::Add, b, &[1]).unwrap();
    let root = tree.binary(BinaryOp::Add, sa, sb).unwrap();
    let table = map(&tree, root);

    let combines = table.macros().into_iter().filter(|m| m.name().starts_with("reduce_")).count();
    assert_eq!(combines, 1);
    assert_eq!(table.prelude().matches("#define reduce_add_f32(a, b)").count(), 1);
    assert_eq!(table.prelude().lines().count(), table.macros().len());
    assert_eq!(table.render(root).unwrap(), "obj1_r0_acc + obj3_r0_acc");
}

#[test]
fn test_view_helpers_are_not_duplicated() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Float32, &[4, 4]).unwrap();
    let t = tree.trans(a).unwrap();
    let root = tree.binary(BinaryOp::Add, a, t).unwrap();
    let table = map(&tree, root);

    let names: Vec<&str> = table.macros().into_iter().map(|m| m.name()).collect();
    assert_eq!(names, ["obj0_at", "obj1_at"]);
    assert_eq!(table.render(root).unwrap(), "obj0_at($0, $1) + obj1_at($0, $1)");
}

#[test]
fn test_render_broadcasts_against_parent() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Float32, &[4, 1]).unwrap();
    let b = tree.dense(ScalarDType::Float32, &[1, 3]).unwrap();
    let sum = tree.binary(BinaryOp::Add, a, b).unwrap();
    let c = tree.dense(ScalarDType::Float32, &[3]).unwrap();
    let root = tree.binary(BinaryOp::Mul, sum, c).unwrap();
    let table = map(&tree, root);

    assert_eq!(table.render(root).unwrap(), "(obj0_at($0, 0) + obj1_at(0, $1)) * obj3_at($1)");
}

#[test]
fn test_render_nested_operands_use_root_domain() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Float32, &[3]).unwrap();
    let b = tree.dense(ScalarDType::Float32, &[3]).unwrap();
    let sum = tree.binary(BinaryOp::Add, a, b).unwrap();
    let c = tree.dense(ScalarDType::Float32, &[4, 3]).unwrap();
    let root = tree.binary(BinaryOp::Mul, sum, c).unwrap();
    let table = map(&tree, root);

    assert_eq!(table.render(root).unwrap(), "(obj0_at($1) + obj1_at($1)) * obj3_at($0, $1)");
}

#[test]
fn test_render_under_reduction_uses_operand_domain() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Float32, &[4]).unwrap();
    let b = tree.dense(ScalarDType::Float32, &[4]).unwrap();
    let product = tree.binary(BinaryOp::Mul, a, b).unwrap();
    let total = tree.reduce(ReduceOp::Add, product, &[0]).unwrap();
    let table = map(&tree, total);

    assert_eq!(table.render(product).unwrap(), "obj0_at($0) * obj1_at($0)");
}

#[test]
fn test_kernel_args() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Float32, &[4, 4]).unwrap();
    let s = tree.host_scalar(ScalarDType::Float32).unwrap();
    let scaled = tree.binary(BinaryOp::Mul, a, s).unwrap();
    let out = tree.dense(ScalarDType::Float32, &[4, 4]).unwrap();
    let root = tree.assign(out, scaled).unwrap();
    let table = map(&tree, root);

    // Visit order: out, a, s, scaled, assign.
    assert_eq!(table.render(root).unwrap(), "obj0_at($0, $1) = (obj1_at($0, $1) * obj2)");

    let args = table.kernel_args().unwrap();
    let names: Vec<&str> = args.iter().map(|arg| arg.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "obj1",
            "obj1_start",
            "obj1_stride0",
            "obj1_stride1",
            "obj2",
            "obj0",
            "obj0_start",
            "obj0_stride0",
            "obj0_stride1"
        ]
    );
    assert!(args.iter().enumerate().all(|(index, arg)| arg.index == index));

    let input = &args[0];
    assert_eq!(input.kind, ArgKind::Pointer);
    assert!(!input.is_output);
    assert_eq!(input.declaration(), "const float* obj1");

    let output = args.iter().find(|arg| arg.name == "obj0").unwrap();
    assert!(output.is_output);
    assert_eq!(output.declaration(), "float* obj0");

    let ld = args.iter().find(|arg| arg.name == "obj1_stride0").unwrap();
    assert_eq!((ld.kind, ld.value), (ArgKind::Layout, Some(4)));
    assert_eq!(ld.declaration(), "long long obj1_stride0");
    assert_eq!(args[4].kind, ArgKind::Scalar);
}

#[test]
fn test_uniform_stride_is_one_argument() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Int32, &[8]).unwrap();
    let t = tree.reshape(a, &[2, 4]).unwrap();
    let table = map(&tree, t);

    let args = table.kernel_args().unwrap();
    let names: Vec<&str> = args.iter().map(|arg| arg.name.as_str()).collect();
    assert_eq!(names, ["obj0", "obj0_start", "obj0_stride"]);
}

#[test]
fn test_written_view_marks_storage() {
    let mut tree = ExpressionTree::new();
    let out = tree.dense(ScalarDType::Float32, &[4, 4]).unwrap();
    let t = tree.trans(out).unwrap();
    let value = tree.dense(ScalarDType::Float32, &[4, 4]).unwrap();
    let root = tree.assign(t, value).unwrap();
    let table = map(&tree, root);

    let args = table.kernel_args().unwrap();
    let pointers: Vec<(&str, bool)> =
        args.iter().filter(|arg| arg.kind == ArgKind::Pointer).map(|arg| (arg.name.as_str(), arg.is_output)).collect();
    assert_eq!(pointers, [("obj0", true), ("obj2", false)]);
}
