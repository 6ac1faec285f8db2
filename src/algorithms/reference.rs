//! Dense reference assembly by exact quadrature, used to check the matrix-free operators.

use crate::{basis::{base::Basis, linear::LinearBasis}, storage::{GridStorage, LevelIndex}};

pub(crate) enum Form
{
    Mass,
    Laplace,
    Scaled(f64, &'static Form),
}

/// Composite Simpson on the dyadic cells of width 2^-`level`, exact for piecewise quadratics.
fn simpson<F: Fn(f64) -> f64>(f: F, level: u8) -> f64
{
    let n = 1_u64 << level;
    let h = 1.0 / n as f64;
    (0..n).map(|k|
    {
        let a = k as f64 * h;
        h / 6.0 * (f(a) + 4.0 * f(a + 0.5 * h) + f(a + h))
    }).sum()
}

/// Midpoint rule on the same cells, exact for piecewise constants.
fn midpoint<F: Fn(f64) -> f64>(f: F, level: u8) -> f64
{
    let n = 1_u64 << level;
    let h = 1.0 / n as f64;
    (0..n).map(|k| h * f((k as f64 + 0.5) * h)).sum()
}

fn form_1d(form: &Form, a: LevelIndex, b: LevelIndex, width: f64) -> f64
{
    let basis = LinearBasis;
    let level = a.level.max(b.level).max(1);
    let (la, ia, lb, ib) = (a.level as u32, a.index, b.level as u32, b.index);
    match form
    {
        Form::Mass => width * simpson(|x| basis.eval(la, ia, x) * basis.eval(lb, ib, x), level),
        Form::Laplace => midpoint(|x| basis.eval_deriv(la, ia, x) * basis.eval_deriv(lb, ib, x), level) / width,
        Form::Scaled(factor, form) => factor * form_1d(form, a, b, width),
    }
}

///
/// Multiplies `alpha` by the explicitly assembled matrix of the operator described by the
/// kernel table `forms`, using the same slot and coefficient conventions as the engine.
/// Dimensions outside `algorithmic_dims` act as the identity.
///
pub(crate) fn apply_dense(storage: &GridStorage, forms: &[Form], algorithmic_dims: &[usize], coefficients: Option<&[f64]>, alpha: &[f64]) -> Vec<f64>
{
    let k = forms.len().trailing_zeros() as usize;
    let n_algo = algorithmic_dims.len();
    let n = storage.len();
    let mut result = vec![0.0; n];
    if n_algo == 0
    {
        return result;
    }
    for term in 0..n_algo.pow(k as u32)
    {
        let coefficient = coefficients.map_or(1.0, |c| c[term]);
        let mut active = vec![0; k];
        let mut t = term;
        for slot in (0..k).rev()
        {
            active[slot] = algorithmic_dims[t % n_algo];
            t /= n_algo;
        }
        for i in 0..n
        {
            for j in 0..n
            {
                let mut entry = coefficient;
                for d in 0..storage.num_inputs()
                {
                    let (a, b) = (storage.level_index(i, d), storage.level_index(j, d));
                    if !algorithmic_dims.contains(&d)
                    {
                        if a != b
                        {
                            entry = 0.0;
                        }
                        continue;
                    }
                    let mask = active.iter().enumerate().filter(|&(_, &s)| s == d).fold(0, |m, (slot, _)| m | (1 << slot));
                    entry *= form_1d(&forms[mask], a, b, storage.bounding_box().width(d));
                }
                result[i] += entry * alpha[j];
            }
        }
    }
    result
}

///
/// ∫ φ_seq(x) Σ_j φ_j(x) dx over the unit cube by tensor Simpson quadrature on the finest
/// dyadic cells of the grid.
///
pub(crate) fn quadrature_row_sum(storage: &GridStorage, seq: usize) -> f64
{
    let basis = LinearBasis;
    let ndim = storage.num_inputs();
    let max_level = (0..storage.len()).flat_map(|s| (0..ndim).map(move |d| storage.level(s, d))).max().unwrap_or(1).max(1);
    let nodes = (1_usize << max_level) * 2 + 1;
    let h = 1.0 / (nodes - 1) as f64;
    let weight = |k: usize| if k == 0 || k == nodes - 1 { h / 3.0 } else if k % 2 == 1 { 4.0 * h / 3.0 } else { 2.0 * h / 3.0 };
    let phi = |s: usize, x: &[f64]| -> f64
    {
        (0..ndim).map(|d| basis.eval(storage.level(s, d) as u32, storage.index(s, d), x[d])).product()
    };
    let mut total = 0.0;
    let mut counter = vec![0_usize; ndim];
    loop
    {
        let x: Vec<f64> = counter.iter().map(|&k| k as f64 * h).collect();
        let w: f64 = counter.iter().map(|&k| weight(k)).product();
        let sum: f64 = (0..storage.len()).map(|s| phi(s, &x)).sum();
        total += w * phi(seq, &x) * sum;

        let mut d = 0;
        while d < ndim
        {
            counter[d] += 1;
            if counter[d] < nodes
            {
                break;
            }
            counter[d] = 0;
            d += 1;
        }
        if d == ndim
        {
            break;
        }
    }
    let volume: f64 = (0..ndim).map(|d| storage.bounding_box().width(d)).product();
    total * volume
}
