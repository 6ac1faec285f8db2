use crate::{algorithms::{sweep::{sweep_1d, SweepFunction}, up_down::UpDownKernel}, iterators::grid_iterator::GridIterator, storage::GridStorage};

use super::base::Basis;

#[derive(Copy, Clone, Debug, Default)]
pub struct LinearBasis;

impl Basis for LinearBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64 {
        if level == 0
        {
            if index == 0
            {
                1.0 - x
            }
            else
            {
                x
            }
        }
        else
        {
            0.0_f64.max(1.0-f64::abs((1_u64 << level) as f64 * x - index as f64 ))
        }
    }

    #[inline]
    fn eval_deriv(&self, level: u32, index: u32, x: f64) -> f64 {
        if level == 0
        {
            if index == 0 { -1.0 } else { 1.0 }
        }
        else
        {
            let scale = (1_u64 << level) as f64;
            let t = scale * x - index as f64;
            if t.abs() >= 1.0
            {
                0.0
            }
            else if t < 0.0
            {
                scale
            }
            else
            {
                -scale
            }
        }
    }
}

#[inline]
fn value(source: &[f64], seq: Option<usize>) -> f64
{
    seq.map_or(0.0, |seq| source[seq])
}

///
/// Positions of the two level-zero keys of the fiber. The iterator is left on the left one.
///
fn boundary_positions(iterator: &mut GridIterator, dim: usize) -> (Option<usize>, Option<usize>)
{
    iterator.reset_to_left_level_zero(dim);
    let left = iterator.seq();
    iterator.reset_to_right_level_zero(dim);
    let right = iterator.seq();
    iterator.reset_to_left_level_zero(dim);
    (left, right)
}

///
/// Bilinear form ⟨φ_i, φ_j⟩ of the piecewise linear hat basis.
///
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearMassKernel;

impl LinearMassKernel
{
    ///
    /// Post-order walk. Returns the accumulated weights at the left and right end of the
    /// support of the current key.
    ///
    fn rec_up(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, q: f64) -> (f64, f64)
    {
        let Some(seq) = iterator.seq() else { return (0.0, 0.0) };
        let (mut fl, mut fr, mut fml, mut fmr) = (0.0, 0.0, 0.0, 0.0);
        if iterator.can_descend(dim)
        {
            if iterator.left_child(dim)
            {
                (fl, fml) = Self::rec_up(source, result, iterator, dim, q);
            }
            if iterator.step_right(dim)
            {
                (fmr, fr) = Self::rec_up(source, result, iterator, dim, q);
            }
            iterator.up(dim);
        }
        let h = iterator.key(dim).mesh_width();
        let fm = fml + fmr;
        result[seq] = fm;
        let tmp = 0.5 * fm + 0.5 * q * h * source[seq];
        (fl + tmp, fr + tmp)
    }

    ///
    /// Pre-order walk. `fl` and `fr` are the values of the coarser expansion at the ends of
    /// the support of the current key.
    ///
    fn rec_down(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, q: f64, fl: f64, fr: f64)
    {
        let Some(seq) = iterator.seq() else { return };
        let alpha = source[seq];
        let h = iterator.key(dim).mesh_width();
        let tmp_m = 0.5 * (fl + fr);
        result[seq] = q * h * (tmp_m + 2.0 / 3.0 * alpha);
        let fm = tmp_m + alpha;
        if iterator.can_descend(dim)
        {
            if iterator.left_child(dim)
            {
                Self::rec_down(source, result, iterator, dim, q, fl, fm);
            }
            if iterator.step_right(dim)
            {
                Self::rec_down(source, result, iterator, dim, q, fm, fr);
            }
            iterator.up(dim);
        }
    }
}

struct MassUp;

impl SweepFunction for MassUp
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        let q = iterator.storage().bounding_box().width(dim);
        if !iterator.storage().has_boundary()
        {
            LinearMassKernel::rec_up(source, result, iterator, dim, q);
            return;
        }
        let (left, right) = boundary_positions(iterator, dim);
        let (mut fl, mut fr) = (0.0, 0.0);
        if iterator.reset_to_level_one(dim)
        {
            (fl, fr) = LinearMassKernel::rec_up(source, result, iterator, dim, q);
        }
        iterator.reset_to_left_level_zero(dim);
        if let Some(seq) = left
        {
            result[seq] = fl + q / 6.0 * value(source, right);
        }
        if let Some(seq) = right
        {
            result[seq] = fr;
        }
    }
}

struct MassDown;

impl SweepFunction for MassDown
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        let q = iterator.storage().bounding_box().width(dim);
        if !iterator.storage().has_boundary()
        {
            LinearMassKernel::rec_down(source, result, iterator, dim, q, 0.0, 0.0);
            return;
        }
        let (left, right) = boundary_positions(iterator, dim);
        let (left_value, right_value) = (value(source, left), value(source, right));
        if let Some(seq) = left
        {
            result[seq] = q / 3.0 * left_value;
        }
        if let Some(seq) = right
        {
            result[seq] = q / 3.0 * right_value + q / 6.0 * left_value;
        }
        if iterator.reset_to_level_one(dim)
        {
            LinearMassKernel::rec_down(source, result, iterator, dim, q, left_value, right_value);
        }
        iterator.reset_to_left_level_zero(dim);
    }
}

impl UpDownKernel for LinearMassKernel
{
    fn up(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize)
    {
        sweep_1d(&MassUp, storage, source, result, dim);
    }

    fn down(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize)
    {
        sweep_1d(&MassDown, storage, source, result, dim);
    }
}

///
/// Bilinear form ⟨φ_i', φ_j'⟩ of the piecewise linear hat basis. The derivative of a coarser
/// hat is constant on the support of a finer one, so only the diagonal and the boundary
/// coupling remain.
///
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearLaplaceKernel;

impl LinearLaplaceKernel
{
    fn rec_down(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, q: f64)
    {
        let Some(seq) = iterator.seq() else { return };
        let h = iterator.key(dim).mesh_width();
        result[seq] = 2.0 / (h * q) * source[seq];
        if iterator.can_descend(dim)
        {
            if iterator.left_child(dim)
            {
                Self::rec_down(source, result, iterator, dim, q);
            }
            if iterator.step_right(dim)
            {
                Self::rec_down(source, result, iterator, dim, q);
            }
            iterator.up(dim);
        }
    }
}

struct LaplaceUp;

impl SweepFunction for LaplaceUp
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        let q = iterator.storage().bounding_box().width(dim);
        let (left, right) = boundary_positions(iterator, dim);
        if let Some(seq) = left
        {
            result[seq] = -value(source, right) / q;
        }
    }
}

struct LaplaceDown;

impl SweepFunction for LaplaceDown
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        let q = iterator.storage().bounding_box().width(dim);
        if !iterator.storage().has_boundary()
        {
            LinearLaplaceKernel::rec_down(source, result, iterator, dim, q);
            return;
        }
        let (left, right) = boundary_positions(iterator, dim);
        let (left_value, right_value) = (value(source, left), value(source, right));
        if let Some(seq) = left
        {
            result[seq] = left_value / q;
        }
        if let Some(seq) = right
        {
            result[seq] = (right_value - left_value) / q;
        }
        if iterator.reset_to_level_one(dim)
        {
            LinearLaplaceKernel::rec_down(source, result, iterator, dim, q);
        }
        iterator.reset_to_left_level_zero(dim);
    }
}

impl UpDownKernel for LinearLaplaceKernel
{
    fn up(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize)
    {
        // inner hats never couple to a coarser derivative
        if storage.has_boundary()
        {
            sweep_1d(&LaplaceUp, storage, source, result, dim);
        }
    }

    fn down(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize)
    {
        sweep_1d(&LaplaceDown, storage, source, result, dim);
    }
}

#[cfg(test)]
mod tests
{
    use approx::assert_relative_eq;

    use super::*;
    use crate::{generators, storage::{BoundingBox, GridPoint}};

    fn level_two_1d() -> GridStorage
    {
        let mut storage = GridStorage::new(1).unwrap();
        generators::full(&mut storage, 2).expect("Could not generate grid");
        storage
    }

    fn at(storage: &GridStorage, result: &[f64], level: u8, index: u32) -> f64
    {
        result[storage.index_of(&GridPoint::new(&[level], &[index])).unwrap()]
    }

    #[test]
    fn test_eval()
    {
        let basis = LinearBasis;
        assert_eq!(basis.eval(1, 1, 0.5), 1.0);
        assert_eq!(basis.eval(2, 3, 0.5), 0.0);
        assert_relative_eq!(basis.eval(2, 1, 0.375), 0.5);
        assert_relative_eq!(basis.eval(0, 0, 0.25), 0.75);
        assert_eq!(basis.eval_deriv(2, 1, 0.1), 4.0);
        assert_eq!(basis.eval_deriv(2, 1, 0.3), -4.0);
        assert_eq!(basis.eval_deriv(2, 1, 0.6), 0.0);
        assert_eq!(basis.eval_deriv(0, 0, 0.6), -1.0);
    }

    #[test]
    fn test_mass_up_down_1d()
    {
        let storage = level_two_1d();
        let ones = vec![1.0; storage.len()];
        let mut down = vec![0.0; storage.len()];
        LinearMassKernel.down(&storage, &ones, &mut down, 0);
        assert_relative_eq!(at(&storage, &down, 1, 1), 1.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(at(&storage, &down, 2, 1), 7.0 / 24.0, epsilon = 1e-14);
        assert_relative_eq!(at(&storage, &down, 2, 3), 7.0 / 24.0, epsilon = 1e-14);

        let mut up = vec![0.0; storage.len()];
        LinearMassKernel.up(&storage, &ones, &mut up, 0);
        assert_relative_eq!(at(&storage, &up, 1, 1), 0.25, epsilon = 1e-14);
        assert_eq!(at(&storage, &up, 2, 1), 0.0);
    }

    #[test]
    fn test_laplace_scales_with_width()
    {
        let mut storage = level_two_1d();
        *storage.bounding_box_mut() = BoundingBox::new(&[0.0], &[2.0]);
        let ones = vec![1.0; storage.len()];
        let mut up = vec![0.0; storage.len()];
        LinearLaplaceKernel.up(&storage, &ones, &mut up, 0);
        assert!(up.iter().all(|&v| v == 0.0));
        let mut down = vec![0.0; storage.len()];
        LinearLaplaceKernel.down(&storage, &ones, &mut down, 0);
        assert_relative_eq!(at(&storage, &down, 1, 1), 2.0, epsilon = 1e-14);
        assert_relative_eq!(at(&storage, &down, 2, 3), 4.0, epsilon = 1e-14);
    }

    #[test]
    fn test_boundary_mass_of_linear_functions()
    {
        let mut storage = GridStorage::new(1).unwrap();
        generators::full_with_boundaries(&mut storage, 1).expect("Could not generate grid");
        // only the two boundary hats carry weight: f(x) = 1 - x
        let mut alpha = vec![0.0; storage.len()];
        alpha[storage.index_of(&GridPoint::new(&[0], &[0])).unwrap()] = 1.0;
        let mut up = vec![0.0; storage.len()];
        let mut down = vec![0.0; storage.len()];
        LinearMassKernel.up(&storage, &alpha, &mut up, 0);
        LinearMassKernel.down(&storage, &alpha, &mut down, 0);
        let total: Vec<f64> = up.iter().zip(&down).map(|(a, b)| a + b).collect();
        assert_relative_eq!(at(&storage, &total, 0, 0), 1.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(at(&storage, &total, 0, 1), 1.0 / 6.0, epsilon = 1e-14);
        // ∫ (1 - x) φ_{1,1} = 1/4
        assert_relative_eq!(at(&storage, &total, 1, 1), 0.25, epsilon = 1e-14);
    }
}
