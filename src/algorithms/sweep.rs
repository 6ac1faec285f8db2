use crate::{iterators::grid_iterator::GridIterator, storage::GridStorage};

///
/// A 1d operation along `dim`. `execute` is called once per fiber with the iterator on
/// the fiber root: the level-one key in inner grids, the left level-zero key in boundary
/// grids. It reads `source` and writes the fiber's entries of `result`.
///
pub trait SweepFunction
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize);
}

fn sweep_recursive<F: SweepFunction + ?Sized>(function: &F, source: &[f64], result: &mut [f64], iterator: &mut GridIterator,
    dim_list: &[usize], dim_rem: usize, dim_sweep: usize)
{
    function.execute(source, result, iterator, dim_sweep);
    for d in 0..dim_rem
    {
        let cur_dim = dim_list[d];
        if !iterator.can_descend(cur_dim)
        {
            continue;
        }
        if iterator.left_child(cur_dim)
        {
            sweep_recursive(function, source, result, iterator, dim_list, d + 1, dim_sweep);
        }
        if iterator.step_right(cur_dim)
        {
            sweep_recursive(function, source, result, iterator, dim_list, d + 1, dim_sweep);
        }
        iterator.up(cur_dim);
    }
}

fn sweep_boundary_recursive<F: SweepFunction + ?Sized>(function: &F, source: &[f64], result: &mut [f64], iterator: &mut GridIterator,
    dim_list: &[usize], dim_rem: usize, dim_sweep: usize)
{
    if dim_rem == 0
    {
        function.execute(source, result, iterator, dim_sweep);
        return;
    }
    let d = dim_list[dim_rem - 1];
    if iterator.key(d).level > 0
    {
        sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep);
        if iterator.can_descend(d)
        {
            if iterator.left_child(d)
            {
                sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep);
            }
            if iterator.step_right(d)
            {
                sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep);
            }
            iterator.up(d);
        }
    }
    else
    {
        sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep);
        iterator.reset_to_right_level_zero(d);
        sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep);
        if !iterator.is_leaf() && iterator.reset_to_level_one(d)
        {
            sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep);
        }
        iterator.reset_to_left_level_zero(d);
    }
}

///
/// Applies `function` to every 1d fiber along `dim_sweep`.
///
pub fn sweep_1d<F: SweepFunction + ?Sized>(function: &F, storage: &GridStorage, source: &[f64], result: &mut [f64], dim_sweep: usize)
{
    let ndim = storage.num_inputs();
    let dim_list: Vec<usize> = (0..ndim).filter(|&d| d != dim_sweep).collect();
    let mut iterator = GridIterator::new(storage);
    if storage.has_boundary()
    {
        iterator.reset_to_level_zero();
        sweep_boundary_recursive(function, source, result, &mut iterator, &dim_list, ndim - 1, dim_sweep);
    }
    else if iterator.seq().is_some()
    {
        sweep_recursive(function, source, result, &mut iterator, &dim_list, ndim - 1, dim_sweep);
    }
}
