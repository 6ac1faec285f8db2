use std::sync::Arc;

use crate::{basis::linear::{LinearLaplaceKernel, LinearMassKernel}, errors::SGError, storage::GridStorage};

/// Largest number of simultaneously special dimensions an operator may declare.
pub const MAX_SPECIAL_DIMS: usize = 8;

/// Recursion levels, counted from the outermost dimension, whose two branches run in parallel.
pub const DEFAULT_MAX_PARALLEL_DIMS: usize = 4;

///
/// 1d leaf operation of a bilinear form along one axis, split by direction.
///
/// `up` accumulates the contributions of finer points into their coarser ancestors, `down`
/// those of coarser points (and the point itself) into finer ones. Together they realize the
/// full 1d form on every fiber along `dim`. `result` is zero on entry.
///
pub trait UpDownKernel : Send + Sync
{
    fn up(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize);
    fn down(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize);
}

///
/// Multiplies the wrapped kernel by a constant.
///
#[derive(Clone)]
pub struct ScaledKernel
{
    pub kernel: Arc<dyn UpDownKernel>,
    pub factor: f64,
}

impl ScaledKernel
{
    pub fn new(kernel: Arc<dyn UpDownKernel>, factor: f64) -> Self
    {
        Self { kernel, factor }
    }
}

impl UpDownKernel for ScaledKernel
{
    fn up(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize)
    {
        self.kernel.up(storage, source, result, dim);
        result.iter_mut().for_each(|r| *r *= self.factor);
    }

    fn down(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize)
    {
        self.kernel.down(storage, source, result, dim);
        result.iter_mut().for_each(|r| *r *= self.factor);
    }
}

///
/// Describes a (sum of) tensor-product bilinear form(s).
///
/// An operator has `k` special slots. Each term of the operator assigns one algorithmic
/// dimension to every slot; along a grid dimension `d` the term uses
/// `kernels[mask]`, where bit `s` of `mask` is set iff slot `s` is assigned to `d`. The table
/// therefore holds `2^k` kernels and entry 0 is the plain (mass-like) kernel.
///
/// [`UpDownOperator::mult`] sums every term, weighted by `coefficients` (row-major over the
/// slots, `n^k` entries for `n` algorithmic dimensions; all ones when absent).
///
#[derive(Clone)]
pub struct OperatorSpec
{
    pub kernels: Vec<Arc<dyn UpDownKernel>>,
    pub algorithmic_dims: Option<Vec<usize>>,
    pub coefficients: Option<Vec<f64>>,
    pub max_parallel_dims: usize,
}

impl OperatorSpec
{
    pub fn new(kernels: Vec<Arc<dyn UpDownKernel>>) -> Self
    {
        Self { kernels, algorithmic_dims: None, coefficients: None, max_parallel_dims: DEFAULT_MAX_PARALLEL_DIMS }
    }

    ///
    /// The mass matrix ⟨φ_i, φ_j⟩.
    ///
    pub fn mass() -> Self
    {
        Self::new(vec![Arc::new(LinearMassKernel)])
    }

    ///
    /// The stiffness matrix Σ_k ⟨∂_k φ_i, ∂_k φ_j⟩ summed over the algorithmic dimensions.
    ///
    pub fn laplace() -> Self
    {
        Self::new(vec![Arc::new(LinearMassKernel), Arc::new(LinearLaplaceKernel)])
    }

    pub fn with_algorithmic_dims(mut self, dims: Vec<usize>) -> Self
    {
        self.algorithmic_dims = Some(dims);
        self
    }

    pub fn with_coefficients(mut self, coefficients: Vec<f64>) -> Self
    {
        self.coefficients = Some(coefficients);
        self
    }

    pub fn with_max_parallel_dims(mut self, max_parallel_dims: usize) -> Self
    {
        self.max_parallel_dims = max_parallel_dims;
        self
    }

    ///
    /// Number of special slots `k`, or an error if the kernel table is not of size `2^k`.
    ///
    pub fn num_special_dims(&self) -> Result<usize, SGError>
    {
        let n = self.kernels.len();
        if n == 0 || !n.is_power_of_two()
        {
            return Err(SGError::InvalidOperator(format!("kernel table of size {n} is not a power of two")));
        }
        let k = n.trailing_zeros() as usize;
        if k > MAX_SPECIAL_DIMS
        {
            return Err(SGError::InvalidOperator(format!("{k} special dimensions exceed the maximum of {MAX_SPECIAL_DIMS}")));
        }
        Ok(k)
    }
}

///
/// Matrix-free operator application.
///
pub trait OperationMatrix
{
    fn mult(&self, alpha: &[f64]) -> Result<Vec<f64>, SGError>;
}

///
/// The Up/Down evaluator for one [`OperatorSpec`] on one storage. Borrowing the storage keeps
/// it immutable for as long as the operator lives.
///
pub struct UpDownOperator<'a>
{
    storage: &'a GridStorage,
    spec: OperatorSpec,
    algorithmic_dims: Vec<usize>,
    num_special_dims: usize,
}

impl<'a> UpDownOperator<'a>
{
    pub fn new(storage: &'a GridStorage, spec: OperatorSpec) -> Result<Self, SGError>
    {
        let num_special_dims = spec.num_special_dims()?;
        let num_inputs = storage.num_inputs();
        let algorithmic_dims = spec.algorithmic_dims.clone().unwrap_or_else(|| (0..num_inputs).collect());
        for (i, &dim) in algorithmic_dims.iter().enumerate()
        {
            if dim >= num_inputs
            {
                return Err(SGError::DimensionOutOfRange { dim, num_inputs });
            }
            if algorithmic_dims[..i].contains(&dim)
            {
                return Err(SGError::InvalidOperator(format!("algorithmic dimension {dim} listed twice")));
            }
        }
        let num_terms = algorithmic_dims.len().pow(num_special_dims as u32);
        if let Some(coefficients) = spec.coefficients.as_ref()
        {
            if coefficients.len() != num_terms
            {
                return Err(SGError::InvalidOperator(format!("expected {num_terms} coefficients, got {}", coefficients.len())));
            }
        }
        // the sweeps only reach points whose ancestors are all present
        storage.check_admissibility()?;
        log::debug!("up/down operator with {num_special_dims} special dimensions over {} algorithmic dimensions ({num_terms} terms)", algorithmic_dims.len());
        Ok(Self { storage, spec, algorithmic_dims, num_special_dims })
    }

    #[inline]
    pub fn storage(&self) -> &'a GridStorage
    {
        self.storage
    }

    #[inline]
    pub fn algorithmic_dims(&self) -> &[usize]
    {
        &self.algorithmic_dims
    }

    pub fn num_terms(&self) -> usize
    {
        self.algorithmic_dims.len().pow(self.num_special_dims as u32)
    }

    fn check_len(&self, alpha: &[f64]) -> Result<(), SGError>
    {
        if alpha.len() != self.storage.len()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { expected: self.storage.len(), actual: alpha.len() });
        }
        Ok(())
    }

    ///
    /// Grid dimensions assigned to the slots of term `term`, row-major with slot 0 slowest.
    ///
    fn term_dims(&self, mut term: usize) -> Vec<usize>
    {
        let n = self.algorithmic_dims.len();
        let mut dims = vec![0; self.num_special_dims];
        for slot in (0..self.num_special_dims).rev()
        {
            dims[slot] = self.algorithmic_dims[term % n];
            term /= n;
        }
        dims
    }

    ///
    /// Applies the single term whose slot `s` sits on grid dimension `active_dims[s]`.
    ///
    pub fn apply_term(&self, active_dims: &[usize], alpha: &[f64]) -> Result<Vec<f64>, SGError>
    {
        self.check_len(alpha)?;
        if active_dims.len() != self.num_special_dims
        {
            return Err(SGError::InvalidOperator(format!("expected {} active dimensions, got {}", self.num_special_dims, active_dims.len())));
        }
        for &dim in active_dims
        {
            if dim >= self.storage.num_inputs()
            {
                return Err(SGError::DimensionOutOfRange { dim, num_inputs: self.storage.num_inputs() });
            }
            if !self.algorithmic_dims.contains(&dim)
            {
                return Err(SGError::InvalidOperator(format!("dimension {dim} is not an algorithmic dimension")));
            }
        }
        Ok(self.term(active_dims, alpha))
    }

    fn term(&self, active_dims: &[usize], alpha: &[f64]) -> Vec<f64>
    {
        if self.algorithmic_dims.is_empty() || alpha.is_empty()
        {
            return vec![0.0; alpha.len()];
        }
        self.updown(alpha, self.algorithmic_dims.len() - 1, active_dims)
    }

    #[inline]
    fn kernel(&self, dim: usize, active_dims: &[usize]) -> &dyn UpDownKernel
    {
        let mask = active_dims.iter().enumerate().filter(|&(_, &a)| a == dim).fold(0, |mask, (slot, _)| mask | (1 << slot));
        self.spec.kernels[mask].as_ref()
    }

    ///
    /// Unidirectional recursion over the algorithmic dimensions `0..=algo_pos`.
    ///
    fn updown(&self, alpha: &[f64], algo_pos: usize, active_dims: &[usize]) -> Vec<f64>
    {
        let dim = self.algorithmic_dims[algo_pos];
        let kernel = self.kernel(dim, active_dims);
        let n = alpha.len();
        if algo_pos == 0
        {
            let mut result = vec![0.0; n];
            kernel.up(self.storage, alpha, &mut result, dim);
            let mut temp = vec![0.0; n];
            kernel.down(self.storage, alpha, &mut temp, dim);
            add_assign(&mut result, &temp);
            return result;
        }
        let up_branch = ||
        {
            let mut temp = vec![0.0; n];
            kernel.up(self.storage, alpha, &mut temp, dim);
            self.updown(&temp, algo_pos - 1, active_dims)
        };
        let down_branch = ||
        {
            let temp = self.updown(alpha, algo_pos - 1, active_dims);
            let mut result = vec![0.0; n];
            kernel.down(self.storage, &temp, &mut result, dim);
            result
        };
        let (mut result, temp) = if self.algorithmic_dims.len() - algo_pos <= self.spec.max_parallel_dims
        {
            rayon::join(up_branch, down_branch)
        }
        else
        {
            (up_branch(), down_branch())
        };
        add_assign(&mut result, &temp);
        result
    }
}

#[inline]
fn add_assign(result: &mut [f64], other: &[f64])
{
    result.iter_mut().zip(other).for_each(|(r, o)| *r += o);
}

impl OperationMatrix for UpDownOperator<'_>
{
    fn mult(&self, alpha: &[f64]) -> Result<Vec<f64>, SGError>
    {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        self.check_len(alpha)?;
        let n = alpha.len();
        if n == 0 || self.algorithmic_dims.is_empty()
        {
            return Ok(vec![0.0; n]);
        }
        let terms: Vec<(Vec<usize>, f64)> = (0..self.num_terms()).filter_map(|term|
        {
            let coefficient = self.spec.coefficients.as_ref().map_or(1.0, |c| c[term]);
            (coefficient != 0.0).then(|| (self.term_dims(term), coefficient))
        }).collect();
        let result = terms.into_par_iter().fold(|| vec![0.0; n], |mut acc, (active_dims, coefficient)|
        {
            let r = self.term(&active_dims, alpha);
            acc.iter_mut().zip(&r).for_each(|(a, r)| *a += coefficient * r);
            acc
        }).reduce(|| vec![0.0; n], |mut a, b|
        {
            add_assign(&mut a, &b);
            a
        });
        Ok(result)
    }
}
