use smallvec::smallvec;
use test_case::test_case;

use crate::error::Error;
use crate::shape::{Shape, broadcast_shapes, dense_strides, numel};

#[test_case(&[4, 4], &[4, 1]; "matrix")]
#[test_case(&[2, 3, 5], &[15, 5, 1]; "rank3")]
#[test_case(&[7], &[1]; "vector")]
#[test_case(&[], &[]; "scalar")]
fn test_dense_strides(shape: &[usize], expected: &[usize]) {
    assert_eq!(dense_strides(shape).as_slice(), expected);
}

#[test_case(&[4, 1], &[1, 3], &[4, 3]; "outer")]
#[test_case(&[3], &[2, 3], &[2, 3]; "rank_extension")]
#[test_case(&[], &[5], &[5]; "scalar")]
fn test_broadcast_shapes(lhs: &[usize], rhs: &[usize], expected: &[usize]) {
    assert_eq!(broadcast_shapes(lhs, rhs).unwrap().as_slice(), expected);
}

#[test]
fn test_broadcast_incompatible() {
    let result = broadcast_shapes(&[3, 2], &[4, 2]);
    let expected: (Shape, Shape) = (smallvec![3, 2], smallvec![4, 2]);
    assert_eq!(result, Err(Error::BroadcastMismatch { lhs: expected.0, rhs: expected.1 }));
}

#[test]
fn test_numel_of_scalar_is_one() {
    assert_eq!(numel(&[]), 1);
    assert_eq!(numel(&[2, 0, 3]), 0);
}
