use crate::{algorithms::sweep::{sweep_1d, SweepFunction}, iterators::grid_iterator::GridIterator, storage::GridStorage};

pub trait HierarchisationOperation
{
    fn hierarchize(&self, node_values: &mut [f64], storage: &GridStorage);
    fn dehierarchize(&self, alpha: &mut [f64], storage: &GridStorage);
}

///
/// Boundary values of the fiber, copied through unchanged. Leaves the iterator on the
/// level-one key of the fiber and returns false if that key is not stored.
///
fn copy_boundary(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize) -> (f64, f64, bool)
{
    let left = iterator.seq().map_or(0.0, |seq| { result[seq] = source[seq]; source[seq] });
    iterator.reset_to_right_level_zero(dim);
    let right = iterator.seq().map_or(0.0, |seq| { result[seq] = source[seq]; source[seq] });
    let has_interior = !iterator.is_leaf() && iterator.reset_to_level_one(dim);
    (left, right, has_interior)
}

struct LinearHierarchisation;

impl LinearHierarchisation
{
    fn recurse(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, left_value: f64, right_value: f64)
    {
        let Some(seq) = iterator.seq() else { return };
        let mid_value = source[seq];
        if iterator.can_descend(dim)
        {
            if iterator.left_child(dim)
            {
                Self::recurse(source, result, iterator, dim, left_value, mid_value);
            }
            if iterator.step_right(dim)
            {
                Self::recurse(source, result, iterator, dim, mid_value, right_value);
            }
            iterator.up(dim);
        }
        result[seq] = mid_value - 0.5 * (left_value + right_value);
    }
}

impl SweepFunction for LinearHierarchisation
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        if !iterator.storage().has_boundary()
        {
            Self::recurse(source, result, iterator, dim, 0.0, 0.0);
            return;
        }
        let (left, right, has_interior) = copy_boundary(source, result, iterator, dim);
        if has_interior
        {
            Self::recurse(source, result, iterator, dim, left, right);
        }
        iterator.reset_to_left_level_zero(dim);
    }
}

struct LinearDehierarchisation;

impl LinearDehierarchisation
{
    fn recurse(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, left_value: f64, right_value: f64)
    {
        let Some(seq) = iterator.seq() else { return };
        let mid_value = source[seq] + 0.5 * (left_value + right_value);
        result[seq] = mid_value;
        if iterator.can_descend(dim)
        {
            if iterator.left_child(dim)
            {
                Self::recurse(source, result, iterator, dim, left_value, mid_value);
            }
            if iterator.step_right(dim)
            {
                Self::recurse(source, result, iterator, dim, mid_value, right_value);
            }
            iterator.up(dim);
        }
    }
}

impl SweepFunction for LinearDehierarchisation
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        if !iterator.storage().has_boundary()
        {
            Self::recurse(source, result, iterator, dim, 0.0, 0.0);
            return;
        }
        let (left, right, has_interior) = copy_boundary(source, result, iterator, dim);
        if has_interior
        {
            Self::recurse(source, result, iterator, dim, left, right);
        }
        iterator.reset_to_left_level_zero(dim);
    }
}

fn sweep_all_dims<F: SweepFunction>(function: &F, values: &mut [f64], storage: &GridStorage)
{
    let mut buffer = vec![0.0; values.len()];
    for d in 0..storage.num_inputs()
    {
        sweep_1d(function, storage, values, &mut buffer, d);
        values.copy_from_slice(&buffer);
    }
}

#[derive(Clone, Copy, Default)]
pub struct LinearHierarchisationOperation;

impl HierarchisationOperation for LinearHierarchisationOperation
{
    ///
    /// Converts nodal values to hierarchical surpluses in place.
    ///
    #[inline]
    fn hierarchize(&self, node_values: &mut [f64], storage: &GridStorage)
    {
        sweep_all_dims(&LinearHierarchisation, node_values, storage);
    }

    ///
    /// Converts hierarchical surpluses back to nodal values in place.
    ///
    #[inline]
    fn dehierarchize(&self, alpha: &mut [f64], storage: &GridStorage)
    {
        sweep_all_dims(&LinearDehierarchisation, alpha, storage);
    }
}

#[cfg(test)]
mod tests
{
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::generators;

    fn nodal_values(storage: &GridStorage, f: impl Fn(&[f64]) -> f64) -> Vec<f64>
    {
        storage.points().map(|x| f(&x)).collect()
    }

    #[test]
    fn test_round_trip()
    {
        let f = |x: &[f64]| (x[0] * 3.0).sin() * (1.0 + x[1] * x[1]) + x[2];
        for boundary in [false, true]
        {
            let mut storage = GridStorage::new(3).unwrap();
            if boundary
            {
                generators::regular_with_boundaries(&mut storage, 3, Some(1)).expect("Could not generate grid");
            }
            else
            {
                generators::regular(&mut storage, 4).expect("Could not generate grid");
            }
            let values = nodal_values(&storage, f);
            let mut alpha = values.clone();
            LinearHierarchisationOperation.hierarchize(&mut alpha, &storage);
            let mut restored = alpha.clone();
            LinearHierarchisationOperation.dehierarchize(&mut restored, &storage);
            for (a, b) in values.iter().zip(&restored)
            {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_surpluses_1d()
    {
        let mut storage = GridStorage::new(1).unwrap();
        generators::full(&mut storage, 2).expect("Could not generate grid");
        // f(x) = x(1-x): nodal 1/4 at 1/2, 3/16 at 1/4 and 3/4
        let mut alpha = nodal_values(&storage, |x| x[0] * (1.0 - x[0]));
        LinearHierarchisationOperation.hierarchize(&mut alpha, &storage);
        let root = storage.index_of(&crate::storage::GridPoint::root(1)).unwrap();
        for (seq, a) in alpha.iter().enumerate()
        {
            let expected = if seq == root { 0.25 } else { 0.0625 };
            assert_abs_diff_eq!(*a, expected, epsilon = 1e-15);
        }
    }
}
