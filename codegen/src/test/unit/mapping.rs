//! Tree walker tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use kernmap_dtype::{DeviceSpec, ScalarDType};
use kernmap_ir::{BinaryOp, BufferSpec, ExpressionTree, ReduceOp, UnaryOp};
use proptest::prelude::*;
use test_case::test_case;

use super::map;
use crate::error::Error;
use crate::{Context, MappingConfig, SymbolTable, map_tree};

/// `buffer(4, 4; strides 4, 1) -> trans -> reduce_1d(sum)`.
fn transposed_sum() -> (ExpressionTree, [usize; 3]) {
    let mut tree = ExpressionTree::new();
    let a = tree.buffer(ScalarDType::Float32, &[4, 4], BufferSpec::new(&[4, 1], 0)).unwrap();
    let t = tree.trans(a).unwrap();
    let sum = tree.reduce(ReduceOp::Add, t, &[1]).unwrap();
    (tree, [a, t, sum])
}

#[test]
fn test_transposed_sum_scenario() {
    let (tree, [a, t, sum]) = transposed_sum();
    let table = map(&tree, sum);

    assert_eq!(table.len(), 3);
    let buffer = table.lookup(a).unwrap();
    let trans = table.lookup(t).unwrap();
    let reduce = table.lookup(sum).unwrap();
    assert_eq!(buffer.kind_name(), "buffer");
    assert_eq!(trans.kind_name(), "trans");
    assert_eq!(reduce.kind_name(), "reduce_1d");

    // The view swaps the stride attributes of the raw buffer.
    assert_eq!(buffer.attr("stride0").unwrap(), trans.attr("stride1").unwrap());
    assert_eq!(buffer.attr("stride1").unwrap(), trans.attr("stride0").unwrap());
    assert_eq!(table.expand("obj1_at(i, j)"), "obj0[obj0_start + (j)*obj0_stride0 + (i)]");

    // The accumulator update reads through the transposed index, not the buffer's.
    let update = table.render(sum).unwrap();
    assert_eq!(update, "obj2_r0_acc = reduce_add_f32(obj2_r0_acc, obj1_at($0, $1))");
    assert!(!update.contains("obj0_at"));
    assert_eq!(
        table.expand(&update),
        "obj2_r0_acc = ((obj2_r0_acc) + (obj0[obj0_start + ($1)*obj0_stride0 + ($0)]))"
    );
}

#[test]
fn test_strided_configuration() {
    let (tree, [.., sum]) = transposed_sum();
    let config = MappingConfig::builder().contiguous_loads(false).build();
    let table = map_tree(&tree, sum, &Context::default(), &config).unwrap();

    assert_eq!(table.expand("obj1_at(i, j)"), "obj0[obj0_start + (j)*obj0_stride0 + (i)*obj0_stride1]");
    assert_eq!(table.lookup(0).unwrap().attr("access").unwrap(), "strided");
}

#[test]
fn test_name_prefixes() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Int32, &[4]).unwrap();
    let i = tree.placeholder(1).unwrap();
    let root = tree.binary(BinaryOp::Mul, a, i).unwrap();
    let config = MappingConfig::builder().name_prefix("k").induction_prefix("ridx").build();
    let table = map_tree(&tree, root, &Context::default(), &config).unwrap();

    let handles: Vec<String> = table.iter().map(|(_, object)| object.handle()).collect();
    assert_eq!(handles, ["k0", "ridx1", "k1"]);
    assert_eq!(table.render(root).unwrap(), "k0_at($0) * ridx1");
}

#[test]
fn test_builder_defaults_match_default() {
    assert_eq!(MappingConfig::builder().build(), MappingConfig::default());
}

fn config_from(vars: &[(&str, &str)]) -> MappingConfig {
    let vars: BTreeMap<&str, &str> = vars.iter().copied().collect();
    MappingConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()))
}

#[test]
fn test_config_lookup_fallbacks() {
    assert_eq!(config_from(&[]), MappingConfig::default());

    let config = config_from(&[("KERNMAP_NAME_PREFIX", "k"), ("KERNMAP_INDUCTION_PREFIX", "")]);
    assert_eq!(config.name_prefix, "k");
    assert_eq!(config.induction_prefix, "sforidx");
    assert!(config.contiguous_loads);
}

#[test_case("1" ; "set")]
#[test_case("" ; "set but empty")]
fn test_config_force_strided(value: &str) {
    let config = config_from(&[("KERNMAP_FORCE_STRIDED", value)]);
    assert!(!config.contiguous_loads);
    assert_eq!(config.name_prefix, "obj");
}

#[test]
fn test_shared_subtree_mapped_once() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Float32, &[4]).unwrap();
    let e = tree.unary(UnaryOp::Exp, a).unwrap();
    let root = tree.binary(BinaryOp::Div, e, e).unwrap();
    let table = map(&tree, root);

    assert_eq!(table.len(), 3);
    assert_eq!(table.render(root).unwrap(), "expf(obj0_at($0)) / expf(obj0_at($0))");
}

#[test]
fn test_unreachable_nodes_are_skipped() {
    let mut tree = ExpressionTree::new();
    let a = tree.dense(ScalarDType::Float32, &[4]).unwrap();
    let _unused = tree.dense(ScalarDType::Float32, &[4]).unwrap();
    let root = tree.unary(UnaryOp::Neg, a).unwrap();
    let table = map(&tree, root);

    assert_eq!(table.len(), 2);
    assert!(!table.contains(1));
}

#[test]
fn test_build_uses_last_node_as_root() {
    let mut tree = ExpressionTree::new();
    assert!(matches!(SymbolTable::build(&tree, &Context::default()), Err(Error::Tree { .. })));

    let a = tree.dense(ScalarDType::Float32, &[4]).unwrap();
    tree.unary(UnaryOp::Neg, a).unwrap();
    let table = SymbolTable::build(&tree, &Context::default()).unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn test_objects_tagged_with_device() {
    let (tree, [.., sum]) = transposed_sum();
    let context = Context::new(DeviceSpec::Cuda(2));
    let table = map_tree(&tree, sum, &context, &MappingConfig::default()).unwrap();

    assert!(table.iter().all(|(_, object)| object.device() == DeviceSpec::Cuda(2)));
}

#[test]
fn test_concurrent_passes_share_context() {
    let (tree, [.., sum]) = transposed_sum();
    let context = Arc::new(Context::default());

    let preludes: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let context = Arc::clone(&context);
                let tree = &tree;
                scope.spawn(move || {
                    let table = map_tree(tree, sum, &context, &MappingConfig::default()).unwrap();
                    table.prelude()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(preludes[0], preludes[1]);
    assert!(preludes[0].contains("#define obj1_at(i0, i1) obj0_at(i1, i0)"));
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Neg,
    AddBuffer,
    MulScalar,
    Trans,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Neg), Just(Step::AddBuffer), Just(Step::MulScalar), Just(Step::Trans)]
}

proptest! {
    #[test]
    fn test_one_entry_per_visited_node(steps in prop::collection::vec(step(), 0..12)) {
        let mut tree = ExpressionTree::new();
        let mut root = tree.dense(ScalarDType::Float32, &[3, 3]).unwrap();
        let mut is_array = true;
        for step in steps {
            root = match step {
                Step::Neg => {
                    is_array = false;
                    tree.unary(UnaryOp::Neg, root).unwrap()
                }
                Step::AddBuffer => {
                    let leaf = tree.dense(ScalarDType::Float32, &[3, 3]).unwrap();
                    is_array = false;
                    tree.binary(BinaryOp::Add, root, leaf).unwrap()
                }
                Step::MulScalar => {
                    let leaf = tree.host_scalar(ScalarDType::Float32).unwrap();
                    is_array = false;
                    tree.binary(BinaryOp::Mul, root, leaf).unwrap()
                }
                Step::Trans if is_array => tree.trans(root).unwrap(),
                Step::Trans => continue,
            };
        }

        let table = map(&tree, root);
        prop_assert_eq!(table.len(), tree.len());
        for (position, object) in table.iter() {
            let node = tree.get(position).unwrap();
            match object.links() {
                Some(links) => {
                    prop_assert_eq!(links.lhs_position(), node.lhs);
                    prop_assert_eq!(links.rhs_position(), node.rhs);
                    prop_assert!(links.lhs(&table).unwrap().is_some());
                }
                None => prop_assert!(node.lhs.is_none() && object.is_leaf()),
            }
        }
        prop_assert!(table.render(root).is_ok());
    }
}
