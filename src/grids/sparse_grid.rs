use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::algorithms::coarsening::{self, CoarseningOptions, LiveChildrenPolicy};
use crate::algorithms::hierarchisation::{HierarchisationOperation, LinearHierarchisationOperation};
use crate::algorithms::refinement::{BaseRefinement, RefinementFunctor, RefinementOptions};
use crate::algorithms::up_down::{OperationMatrix, OperatorSpec, UpDownOperator};
use crate::basis::{base::Basis, linear::LinearBasis};
use crate::errors::SGError;
use crate::generators;
use crate::serialization::SerializationFormat;
use crate::storage::{BoundingBox, GridPoint, GridStorage, PointIterator, StorageDescription};

///
/// A sparse grid together with its surplus coefficients. Every operation that changes the
/// point set resizes `alpha` in the same call, so position `i` of `alpha` always belongs to
/// position `i` of the storage.
///
#[derive(Clone, Debug)]
pub struct SparseGrid
{
    pub(crate) storage: GridStorage,
    pub(crate) alpha: Vec<f64>,
}

impl SparseGrid
{
    /// Create an empty grid without boundary points.
    pub fn new(num_inputs: usize) -> Result<Self, SGError>
    {
        Ok(Self { storage: GridStorage::new(num_inputs)?, alpha: Vec::new() })
    }

    /// Create an empty grid with boundary points.
    pub fn with_boundary(num_inputs: usize) -> Result<Self, SGError>
    {
        Ok(Self { storage: GridStorage::with_boundary(num_inputs)?, alpha: Vec::new() })
    }

    #[inline]
    pub fn storage(&self) -> &GridStorage
    {
        &self.storage
    }

    /// Get the surplus coefficients for this grid.
    #[inline]
    pub fn alpha(&self) -> &[f64]
    {
        &self.alpha
    }

    /// Replace the surplus coefficients. The length must match the number of points.
    pub fn set_alpha(&mut self, alpha: Vec<f64>) -> Result<(), SGError>
    {
        self.check_len(&alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    pub fn num_inputs(&self) -> usize
    {
        self.storage.num_inputs()
    }

    pub fn len(&self) -> usize
    {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.storage.is_empty()
    }

    pub fn has_boundary(&self) -> bool
    {
        self.storage.has_boundary()
    }

    pub fn bounding_box(&self) -> &BoundingBox
    {
        self.storage.bounding_box()
    }

    pub fn bounding_box_mut(&mut self) -> &mut BoundingBox
    {
        self.storage.bounding_box_mut()
    }

    /// Get copy of points that make up this grid.
    pub fn points(&self) -> PointIterator<'_>
    {
        self.storage.points()
    }

    fn check_len(&self, values: &[f64]) -> Result<(), SGError>
    {
        if values.len() != self.len()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { expected: self.len(), actual: values.len() });
        }
        Ok(())
    }

    fn generate<F: FnOnce(&mut GridStorage) -> Result<(), SGError>>(&mut self, generator: F) -> Result<(), SGError>
    {
        let mut storage = GridStorage::new(self.num_inputs())?;
        storage.bounding_box = self.storage.bounding_box.clone();
        generator(&mut storage)?;
        self.storage = storage;
        self.alpha = vec![0.0; self.storage.len()];
        Ok(())
    }

    ///
    /// Generate a regular sparse grid. Replaces any existing points, zeroes `alpha`. A grid
    /// created with [`SparseGrid::with_boundary`] gets the truncated boundary variant.
    ///
    pub fn sparse_grid(&mut self, level: usize) -> Result<(), SGError>
    {
        if self.has_boundary()
        {
            return self.sparse_grid_with_boundaries(level);
        }
        self.generate(|storage| generators::regular(storage, level))
    }

    /// Generate a full grid, with boundary points if this grid has them.
    pub fn full_grid(&mut self, level: usize) -> Result<(), SGError>
    {
        if self.has_boundary()
        {
            return self.full_grid_with_boundaries(level);
        }
        self.generate(|storage| generators::full(storage, level))
    }

    /// Generate regular sparse grid with boundaries.
    pub fn sparse_grid_with_boundaries(&mut self, level: usize) -> Result<(), SGError>
    {
        self.generate(|storage| generators::regular_with_boundaries(storage, level, Some(1)))
    }

    /// Generate full grid with boundaries.
    pub fn full_grid_with_boundaries(&mut self, level: usize) -> Result<(), SGError>
    {
        self.generate(|storage| generators::full_with_boundaries(storage, level))
    }

    ///
    /// Compute the surpluses from function values given in position order.
    ///
    pub fn hierarchize(&mut self, values: &[f64]) -> Result<(), SGError>
    {
        self.check_len(values)?;
        let mut alpha = values.to_vec();
        LinearHierarchisationOperation.hierarchize(&mut alpha, &self.storage);
        self.alpha = alpha;
        Ok(())
    }

    ///
    /// Function values at the grid points, in position order.
    ///
    pub fn dehierarchize(&self) -> Vec<f64>
    {
        let mut values = self.alpha.clone();
        LinearHierarchisationOperation.dehierarchize(&mut values, &self.storage);
        values
    }

    /// Set values using a given evaluation function.
    pub fn update_values(&mut self, eval_fun: &mut dyn FnMut(&[f64]) -> f64) -> Result<(), SGError>
    {
        let values: Vec<f64> = self.points().map(|x| eval_fun(x.as_slice())).collect();
        self.hierarchize(&values)
    }

    /// Set values by using evaluation function in parallel.
    pub fn update_values_parallel<EF: Fn(&[f64]) -> f64 + Send + Sync>(&mut self, eval_fun: &EF) -> Result<(), SGError>
    {
        let points: Vec<Vec<f64>> = self.points().collect();
        let values: Vec<f64> = points.par_iter().map(|x| eval_fun(x.as_slice())).collect();
        self.hierarchize(&values)
    }

    ///
    /// Apply the operator described by `spec` to the surpluses of this grid.
    ///
    pub fn apply(&self, spec: OperatorSpec) -> Result<Vec<f64>, SGError>
    {
        self.apply_to(spec, &self.alpha)
    }

    ///
    /// Apply the operator described by `spec` to `x`, which must be aligned with the grid.
    ///
    pub fn apply_to(&self, spec: OperatorSpec, x: &[f64]) -> Result<Vec<f64>, SGError>
    {
        UpDownOperator::new(&self.storage, spec)?.mult(x)
    }

    ///
    /// Refine the grid based on the scores of `functor`. New points get a zero surplus, so the
    /// interpolant is unchanged. Returns the positions of the new points.
    ///
    pub fn refine(&mut self, functor: &dyn RefinementFunctor, options: &RefinementOptions) -> Result<Vec<usize>, SGError>
    {
        let new_points = BaseRefinement.refine(&mut self.storage, &self.alpha, functor, options)?;
        self.alpha.resize(self.storage.len(), 0.0);
        Ok(new_points)
    }

    ///
    /// Coarsen the grid based on the scores of `functor`. Returns the removed points.
    ///
    pub fn coarsen(&mut self, functor: &dyn RefinementFunctor, options: &CoarseningOptions) -> Result<Vec<GridPoint>, SGError>
    {
        coarsening::coarsen(&mut self.storage, &mut self.alpha, functor, options)
    }

    ///
    /// Remove a single point. Returns false if the point was kept because it has children
    /// and `policy` is [`LiveChildrenPolicy::Skip`].
    ///
    pub fn remove_point(&mut self, point: &GridPoint, policy: LiveChildrenPolicy) -> Result<bool, SGError>
    {
        let seq = self.storage.index_of(point).ok_or(SGError::PointNotFound)?;
        if self.storage.has_children(point)
        {
            return match policy
            {
                LiveChildrenPolicy::Skip =>
                {
                    log::warn!("not removing {:?}, point has children", point);
                    Ok(false)
                }
                LiveChildrenPolicy::Error => Err(SGError::PointHasChildren(seq)),
            };
        }
        let seq = self.storage.remove(point)?;
        self.alpha.swap_remove(seq);
        Ok(true)
    }

    ///
    /// Evaluate the interpolant at `x`. Checks that the point lies within the bounding box.
    ///
    pub fn evaluate(&self, x: &[f64]) -> Result<f64, SGError>
    {
        if x.len() != self.num_inputs()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { expected: self.num_inputs(), actual: x.len() });
        }
        if !self.bounding_box().contains(x)
        {
            return Err(SGError::OutOfDomain);
        }
        let unit = self.bounding_box().to_unit_coordinate(x);
        Ok(self.evaluate_unit(&unit))
    }

    fn evaluate_unit(&self, unit: &[f64]) -> f64
    {
        let basis = LinearBasis;
        let mut sum = 0.0;
        for (seq, &alpha) in self.alpha.iter().enumerate()
        {
            let mut value = alpha;
            for (d, &x) in unit.iter().enumerate()
            {
                if value == 0.0
                {
                    break;
                }
                value *= basis.eval(self.storage.level(seq, d) as u32, self.storage.index(seq, d), x);
            }
            sum += value;
        }
        sum
    }

    /// Evaluate the interpolant at multiple points in parallel.
    pub fn evaluate_batch(&self, x: &[Vec<f64>]) -> Vec<Result<f64, SGError>>
    {
        x.par_iter().map(|x| self.evaluate(x)).collect()
    }

    /// Serialize the points and surpluses of this grid.
    pub fn serialize(&self, format: SerializationFormat) -> Result<Vec<u8>, SGError>
    {
        let description = SparseGridDescription { storage: StorageDescription::from(&self.storage), alpha: self.alpha.clone() };
        crate::serialization::serialize(&description, format)
    }

    /// Read a grid from a buffer written by [`SparseGrid::serialize`].
    pub fn deserialize(buffer: &[u8], format: SerializationFormat) -> Result<Self, SGError>
    {
        let description: SparseGridDescription = crate::serialization::deserialize(buffer, format)?;
        let storage = GridStorage::try_from(description.storage)?;
        if description.alpha.len() != storage.len()
        {
            return Err(SGError::DeserializationFailed);
        }
        Ok(Self { storage, alpha: description.alpha })
    }
}

#[derive(Serialize, Deserialize)]
struct SparseGridDescription
{
    storage: StorageDescription,
    alpha: Vec<f64>,
}

#[cfg(test)]
mod tests
{
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::refinement::surplus::SurplusRefinement;

    fn f(x: &[f64]) -> f64
    {
        (2.0 * x[0]).sin() * (1.0 + x[1]) + 0.5 * x[1] * x[1]
    }

    #[test]
    fn test_interpolates_grid_points()
    {
        for boundary in [false, true]
        {
            let mut grid = SparseGrid::new(2).unwrap();
            if boundary
            {
                grid.sparse_grid_with_boundaries(4).unwrap();
            }
            else
            {
                grid.sparse_grid(4).unwrap();
            }
            *grid.bounding_box_mut() = BoundingBox::new(&[-1.0, 0.0], &[1.0, 3.0]);
            grid.update_values(&mut |x| f(x)).unwrap();
            for x in grid.points()
            {
                assert_abs_diff_eq!(grid.evaluate(&x).unwrap(), f(&x), epsilon = 1e-12);
            }
            let values: Vec<f64> = grid.points().map(|x| f(&x)).collect();
            for (a, b) in grid.dehierarchize().iter().zip(&values)
            {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_generators_keep_boundary()
    {
        let mut grid = SparseGrid::with_boundary(2).unwrap();
        grid.sparse_grid(2).unwrap();
        assert!(grid.has_boundary());
        assert_eq!(grid.len(), 21);
        grid.full_grid(2).unwrap();
        assert!(grid.has_boundary());
        assert_eq!(grid.len(), 25);
        grid.storage().check_admissibility().unwrap();

        let mut grid = SparseGrid::new(2).unwrap();
        grid.sparse_grid(3).unwrap();
        assert!(!grid.has_boundary());
        assert_eq!(grid.len(), 17);
    }

    #[test]
    fn test_update_values_parallel()
    {
        let mut grid = SparseGrid::new(2).unwrap();
        grid.sparse_grid(3).unwrap();
        grid.update_values_parallel(&f).unwrap();
        let serial = grid.alpha().to_vec();
        grid.update_values(&mut |x| f(x)).unwrap();
        assert_eq!(grid.alpha(), serial.as_slice());
    }

    #[test]
    fn test_evaluate_errors()
    {
        let mut grid = SparseGrid::new(2).unwrap();
        grid.sparse_grid(2).unwrap();
        assert_eq!(grid.evaluate(&[0.5, 1.5]), Err(SGError::OutOfDomain));
        assert!(matches!(grid.evaluate(&[0.5]), Err(SGError::NumberOfPointsAndValuesMismatch { .. })));
        let results = grid.evaluate_batch(&[vec![0.5, 0.5], vec![-0.1, 0.5]]);
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(SGError::OutOfDomain));
    }

    #[test]
    fn test_refine_keeps_interpolant()
    {
        let mut grid = SparseGrid::new(2).unwrap();
        grid.sparse_grid(3).unwrap();
        grid.update_values(&mut |x| f(x)).unwrap();
        let queries = vec![vec![0.3, 0.7], vec![0.11, 0.42], vec![0.9, 0.05]];
        let before: Vec<f64> = grid.evaluate_batch(&queries).into_iter().map(|r| r.unwrap()).collect();
        let len = grid.len();
        let new_points = grid.refine(&SurplusRefinement::new().with_max_num_refined(4), &RefinementOptions::new(1e-4)).unwrap();
        assert!(!new_points.is_empty());
        assert_eq!(grid.len(), len + new_points.len());
        assert_eq!(grid.alpha().len(), grid.len());
        assert!(new_points.iter().all(|&seq| grid.alpha()[seq] == 0.0));
        for (x, expected) in queries.iter().zip(before)
        {
            assert_abs_diff_eq!(grid.evaluate(x).unwrap(), expected, epsilon = 1e-14);
        }
        grid.storage().check_admissibility().unwrap();

        // hierarchizing on the refined grid reproduces f at the new points
        grid.update_values(&mut |x| f(x)).unwrap();
        for seq in new_points
        {
            let x: Vec<f64> = grid.points().nth(seq).unwrap();
            assert_abs_diff_eq!(grid.evaluate(&x).unwrap(), f(&x), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_coarsen_transaction()
    {
        let mut grid = SparseGrid::new(2).unwrap();
        grid.sparse_grid(4).unwrap();
        grid.update_values(&mut |x| x[0] * x[1]).unwrap();
        let tagged: Vec<(GridPoint, f64)> = (0..grid.len()).map(|seq| (grid.storage().point(seq), grid.alpha()[seq])).collect();
        let removed = grid.coarsen(&SurplusRefinement::new(), &CoarseningOptions::new(1e-3)).unwrap();
        assert!(!removed.is_empty());
        assert_eq!(grid.alpha().len(), grid.len());
        for (point, alpha) in tagged
        {
            if let Some(seq) = grid.storage().index_of(&point)
            {
                assert_eq!(grid.alpha()[seq], alpha);
            }
        }
        grid.storage().check_admissibility().unwrap();
    }

    #[test]
    fn test_remove_point()
    {
        let mut grid = SparseGrid::new(1).unwrap();
        grid.full_grid(2).unwrap();
        grid.set_alpha(vec![1.0, 2.0, 3.0]).unwrap();
        let root = GridPoint::root(1);
        assert_eq!(grid.remove_point(&root, LiveChildrenPolicy::Skip), Ok(false));
        assert_eq!(grid.remove_point(&root, LiveChildrenPolicy::Error), Err(SGError::PointHasChildren(0)));
        assert_eq!(grid.remove_point(&GridPoint::new(&[2], &[1]), LiveChildrenPolicy::Error), Ok(true));
        assert_eq!(grid.alpha(), &[1.0, 3.0]);
        assert_eq!(grid.remove_point(&GridPoint::new(&[2], &[1]), LiveChildrenPolicy::Skip), Err(SGError::PointNotFound));
        assert!(grid.set_alpha(vec![1.0]).is_err());
    }

    #[test]
    fn test_energy_of_linear_function()
    {
        // u(x, y) = x is represented exactly on a boundary grid
        let mut grid = SparseGrid::new(2).unwrap();
        grid.full_grid_with_boundaries(2).unwrap();
        grid.update_values(&mut |x| x[0]).unwrap();
        let mass = grid.apply(OperatorSpec::mass()).unwrap();
        let laplace = grid.apply(OperatorSpec::laplace()).unwrap();
        let dot = |a: &[f64]| a.iter().zip(grid.alpha()).map(|(a, b)| a * b).sum::<f64>();
        assert_relative_eq!(dot(&mass), 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(dot(&laplace), 1.0, epsilon = 1e-12);

        assert!(matches!(grid.apply_to(OperatorSpec::mass(), &[1.0]), Err(SGError::NumberOfPointsAndValuesMismatch { .. })));
    }

    #[test]
    fn test_serialization()
    {
        let mut grid = SparseGrid::new(3).unwrap();
        grid.sparse_grid_with_boundaries(2).unwrap();
        grid.update_values(&mut |x| x[0] + x[1] * x[2]).unwrap();
        for format in [SerializationFormat::Bincode, SerializationFormat::BincodeLz4]
        {
            let bytes = grid.serialize(format).unwrap();
            let restored = SparseGrid::deserialize(&bytes, format).unwrap();
            assert_eq!(restored.alpha(), grid.alpha());
            assert!(restored.has_boundary());
            for seq in 0..grid.len()
            {
                assert_eq!(restored.storage().point(seq), grid.storage().point(seq));
            }
        }
    }
}
