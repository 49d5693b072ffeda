//! Concrete shapes and broadcasting helpers.
//!
//! Shapes are row-major: the last axis varies fastest in flat order.

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::*;

/// Shape type - sequence of concrete extents.
///
/// Uses SmallVec with inline capacity of 4 to avoid heap allocation for
/// common tensor ranks (1D-4D).
pub type Shape = SmallVec<[usize; 4]>;

/// Number of elements described by a shape (1 for rank 0).
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Row-major strides for a dense array of the given shape.
pub fn dense_strides(shape: &[usize]) -> Shape {
    let mut strides: Shape = SmallVec::from_elem(1, shape.len());
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Result shape of an elementwise operation, broadcasting right-aligned axes of extent 1.
pub fn broadcast_shapes(lhs: &[usize], rhs: &[usize]) -> Result<Shape> {
    let rank = lhs.len().max(rhs.len());
    let mut result = Shape::with_capacity(rank);
    for axis in 0..rank {
        let l = axis.checked_sub(rank - lhs.len()).map_or(1, |a| lhs[a]);
        let r = axis.checked_sub(rank - rhs.len()).map_or(1, |a| rhs[a]);
        ensure!(
            l == r || l == 1 || r == 1,
            BroadcastMismatchSnafu { lhs: Shape::from_slice(lhs), rhs: Shape::from_slice(rhs) }
        );
        result.push(l.max(r));
    }
    Ok(result)
}
