use crate::{errors::SGError, storage::{GridPoint, GridStorage, MAX_LEVEL}};

#[derive(Default, Debug, Clone)]
pub struct RefinementOptions
{
    pub threshold: f64,
    pub level_limits: Option<Vec<u8>>,
}

impl RefinementOptions
{
    pub fn new(threshold: f64) -> Self
    {
        Self { threshold, ..Default::default() }
    }

    pub fn with_level_limits(mut self, level_limits: Vec<u8>) -> Self
    {
        self.level_limits = Some(level_limits);
        self
    }
}

///
/// This trait defines operations used for refinement or coarsening. These
/// two operations are never done simulataneously, but provide a common
/// interface to allow user-specified constraints to control either operation.
///
pub trait RefinementFunctor : Send + Sync
{
    ///
    /// Return the score of every point, in position order. `alpha` holds the surplus
    /// coefficients aligned with `storage`. A common choice is the absolute value of
    /// the surplus.
    ///
    fn eval(&self, storage: &GridStorage, alpha: &[f64]) -> Vec<f64>;

    ///
    /// Returns the maximum number of points to be refined. If
    /// set to none there is no limit to the maximum number of points.
    ///
    fn max_num_refined(&self) -> Option<usize>
    {
        None
    }

    ///
    /// Returns the maximum number of points that may be removed
    ///
    fn max_num_removed(&self) -> Option<usize>
    {
        None
    }
}

pub(crate) fn check_alpha(storage: &GridStorage, alpha: &[f64]) -> Result<(), SGError>
{
    if alpha.len() != storage.len()
    {
        return Err(SGError::NumberOfPointsAndValuesMismatch { expected: storage.len(), actual: alpha.len() });
    }
    Ok(())
}

fn level_limits(storage: &GridStorage, options: &RefinementOptions) -> Result<Vec<u8>, SGError>
{
    match options.level_limits.as_ref()
    {
        Some(limits) if limits.len() != storage.num_inputs() =>
        {
            Err(SGError::InvalidOptions(format!("expected {} level limits, got {}", storage.num_inputs(), limits.len())))
        }
        Some(limits) => Ok(limits.iter().map(|&l| l.min(MAX_LEVEL)).collect()),
        None => Ok(vec![MAX_LEVEL; storage.num_inputs()]),
    }
}

///
/// Calls `operation` with the position of every point that is missing a child in some
/// dimension below its level limit.
///
fn iterate_refinable_points<Op: FnMut(usize)>(storage: &GridStorage, level_limits: &[u8], mut operation: Op)
{
    for seq in 0..storage.len()
    {
        let point = storage.point(seq);
        let refinable = (0..storage.num_inputs()).any(|d|
        {
            point.level[d] < level_limits[d] && point.children(d).iter().any(|child| !storage.contains(child))
        });
        if refinable
        {
            operation(seq);
        }
    }
}

///
/// Adds points to a grid while keeping it admissible.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct BaseRefinement;

impl BaseRefinement
{
    ///
    /// Inserts `point` after all of its ancestors, recursively. Level-zero keys are
    /// completed with their sibling so both boundary functions of a fiber are present.
    ///
    pub(crate) fn create_point(&self, storage: &mut GridStorage, point: GridPoint) -> Result<(), SGError>
    {
        if storage.contains(&point)
        {
            return Ok(());
        }
        for dim in 0..storage.num_inputs()
        {
            for parent in point.parents(dim, storage.has_boundary())
            {
                self.create_point(storage, parent)?;
            }
        }
        storage.insert(point.clone())?;
        for dim in 0..storage.num_inputs()
        {
            if point.level[dim] == 0
            {
                for sibling in storage.required_neighbours(&point, dim)
                {
                    self.create_point(storage, sibling)?;
                }
            }
        }
        Ok(())
    }

    fn refine_gridpoint(&self, storage: &mut GridStorage, point: &GridPoint, level_limits: &[u8]) -> Result<(), SGError>
    {
        for dim in 0..storage.num_inputs()
        {
            if point.level[dim] >= level_limits[dim]
            {
                continue;
            }
            for child in point.children(dim)
            {
                self.create_point(storage, child)?;
            }
        }
        Ok(())
    }

    ///
    /// Ranked refinement candidates: refinable points scoring above the threshold, best
    /// first, capped by [`RefinementFunctor::max_num_refined`]. Pairs are (position, score).
    ///
    pub fn candidates(&self, storage: &GridStorage, alpha: &[f64], functor: &dyn RefinementFunctor, options: &RefinementOptions) -> Result<Vec<(usize, f64)>, SGError>
    {
        check_alpha(storage, alpha)?;
        let level_limits = level_limits(storage, options)?;
        let scores = functor.eval(storage, alpha);
        let mut candidates = Vec::new();
        iterate_refinable_points(storage, &level_limits, |seq|
        {
            if scores[seq] > options.threshold
            {
                candidates.push((seq, scores[seq]));
            }
        });
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        if let Some(max) = functor.max_num_refined()
        {
            candidates.truncate(max);
        }
        Ok(candidates)
    }

    ///
    /// Refine grid based on criteria computed using functor. Returns the positions of the
    /// new points, which are always appended at the end.
    ///
    pub(crate) fn refine(&self, storage: &mut GridStorage, alpha: &[f64], functor: &dyn RefinementFunctor, options: &RefinementOptions) -> Result<Vec<usize>, SGError>
    {
        let candidates = self.candidates(storage, alpha, functor, options)?;
        let level_limits = level_limits(storage, options)?;
        let original_number = storage.len();
        for &(seq, _) in &candidates
        {
            let point = storage.point(seq);
            self.refine_gridpoint(storage, &point, &level_limits)?;
        }
        log::debug!("refined {} of {} points, {} new points", candidates.len(), original_number, storage.len() - original_number);
        Ok((original_number..storage.len()).collect())
    }
}
