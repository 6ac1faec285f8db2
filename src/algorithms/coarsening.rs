use indexmap::IndexSet;

use crate::{errors::SGError, storage::{GridPoint, GridStorage}};

use super::refinement::{check_alpha, RefinementFunctor};

///
/// What to do with a coarsening candidate that still has children in the grid.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LiveChildrenPolicy
{
    /// Leave the point in place and continue with the next candidate.
    #[default]
    Skip,
    /// Abort with [`SGError::PointHasChildren`] before anything is removed.
    Error,
}

#[derive(Default, Debug, Clone, Copy)]
pub struct CoarseningOptions
{
    pub threshold: f64,
    pub live_children: LiveChildrenPolicy,
}

impl CoarseningOptions
{
    pub fn new(threshold: f64) -> Self
    {
        Self { threshold, ..Default::default() }
    }

    pub fn with_live_children(mut self, live_children: LiveChildrenPolicy) -> Self
    {
        self.live_children = live_children;
        self
    }
}

///
/// Ranked coarsening candidates: inner, non-root points scoring below the threshold, smallest
/// first, capped by [`RefinementFunctor::max_num_removed`]. Pairs are (position, score).
///
pub fn candidates(storage: &GridStorage, alpha: &[f64], functor: &dyn RefinementFunctor, options: &CoarseningOptions) -> Result<Vec<(usize, f64)>, SGError>
{
    check_alpha(storage, alpha)?;
    let scores = functor.eval(storage, alpha);
    let mut candidates: Vec<(usize, f64)> = (0..storage.len())
        .filter(|&seq| storage.is_inner_point(seq) && !storage.point(seq).is_root())
        .filter(|&seq| scores[seq] < options.threshold)
        .map(|seq| (seq, scores[seq]))
        .collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    if let Some(max) = functor.max_num_removed()
    {
        candidates.truncate(max);
    }
    Ok(candidates)
}

///
/// Removes low scoring points from `storage` and compacts `alpha` alongside, so that both
/// stay aligned. Returns the removed points in removal order.
///
pub(crate) fn coarsen(storage: &mut GridStorage, alpha: &mut Vec<f64>, functor: &dyn RefinementFunctor, options: &CoarseningOptions) -> Result<Vec<GridPoint>, SGError>
{
    let candidates = candidates(storage, alpha, functor, options)?;
    if options.live_children == LiveChildrenPolicy::Error
    {
        if let Some(&(seq, _)) = candidates.iter().find(|&&(seq, _)| !storage.is_leaf(seq))
        {
            return Err(SGError::PointHasChildren(seq));
        }
    }
    // positions move as points are removed, so work on keys
    let keys: IndexSet<GridPoint> = candidates.iter().map(|&(seq, _)| storage.point(seq)).collect();
    let mut removed = Vec::with_capacity(keys.len());
    for point in keys
    {
        if storage.has_children(&point)
        {
            log::warn!("skipping coarsening of {:?}, point has children", point);
            continue;
        }
        let seq = storage.remove(&point)?;
        alpha.swap_remove(seq);
        removed.push(point);
    }
    log::debug!("coarsened {} points, {} remain", removed.len(), storage.len());
    Ok(removed)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::generators;

    struct Magnitude(Option<usize>);

    impl RefinementFunctor for Magnitude
    {
        fn eval(&self, _storage: &GridStorage, alpha: &[f64]) -> Vec<f64>
        {
            alpha.iter().map(|a| a.abs()).collect()
        }

        fn max_num_removed(&self) -> Option<usize>
        {
            self.0
        }
    }

    fn parents_present(storage: &GridStorage) -> Vec<(GridPoint, Vec<GridPoint>)>
    {
        (0..storage.len()).map(|seq|
        {
            let point = storage.point(seq);
            let parents = (0..storage.num_inputs())
                .flat_map(|d| point.parents(d, storage.has_boundary()))
                .filter(|parent| storage.contains(parent))
                .collect();
            (point, parents)
        }).collect()
    }

    #[test]
    fn test_coarsen_keeps_alpha_aligned()
    {
        let mut storage = GridStorage::new(2).unwrap();
        generators::regular(&mut storage, 3).unwrap();
        // tag every point with a value identifying it, leaves get small scores
        let mut alpha: Vec<f64> = (0..storage.len()).map(|seq| if storage.is_leaf(seq) { 1e-3 * (seq + 1) as f64 } else { 10.0 + seq as f64 }).collect();
        let tags: Vec<(GridPoint, f64)> = (0..storage.len()).map(|seq| (storage.point(seq), alpha[seq])).collect();
        let before = parents_present(&storage);
        let removed = coarsen(&mut storage, &mut alpha, &Magnitude(None), &CoarseningOptions::new(1.0)).unwrap();

        assert_eq!(storage.len() + removed.len(), tags.len());
        assert_eq!(alpha.len(), storage.len());
        for (point, tag) in &tags
        {
            match storage.index_of(point)
            {
                Some(seq) => assert_eq!(alpha[seq], *tag),
                None => assert!(removed.contains(point)),
            }
        }
        // no surviving point lost a parent it had before
        for (point, parents) in before
        {
            if storage.contains(&point)
            {
                assert!(parents.iter().all(|parent| storage.contains(parent)));
            }
        }
        storage.check_admissibility().unwrap();
    }

    #[test]
    fn test_skip_points_with_children()
    {
        let mut storage = GridStorage::new(1).unwrap();
        generators::full(&mut storage, 3).unwrap();
        let mut alpha = vec![0.0; storage.len()];
        let removed = coarsen(&mut storage, &mut alpha, &Magnitude(None), &CoarseningOptions::new(1.0)).unwrap();
        // level 2 points are ranked before their children and are skipped
        assert_eq!(removed.len(), 4);
        assert!(removed.iter().all(|point| point.level[0] == 3));
        assert_eq!(storage.len(), 3);
        storage.check_admissibility().unwrap();
    }

    #[test]
    fn test_error_policy_aborts_before_mutation()
    {
        let mut storage = GridStorage::new(1).unwrap();
        generators::full(&mut storage, 3).unwrap();
        let mut alpha = vec![0.0; storage.len()];
        let options = CoarseningOptions::new(1.0).with_live_children(LiveChildrenPolicy::Error);
        let result = coarsen(&mut storage, &mut alpha, &Magnitude(None), &options);
        assert!(matches!(result, Err(SGError::PointHasChildren(_))));
        assert_eq!(storage.len(), 7);
        assert_eq!(alpha.len(), 7);
    }

    #[test]
    fn test_boundary_and_root_are_kept()
    {
        let mut storage = GridStorage::new(1).unwrap();
        generators::full_with_boundaries(&mut storage, 1).unwrap();
        let mut alpha = vec![0.0; storage.len()];
        let removed = coarsen(&mut storage, &mut alpha, &Magnitude(None), &CoarseningOptions::new(1.0)).unwrap();
        assert!(removed.is_empty());
        assert_eq!(storage.len(), 3);
    }

    #[test]
    fn test_cap()
    {
        let mut storage = GridStorage::new(1).unwrap();
        generators::full(&mut storage, 3).unwrap();
        let mut alpha: Vec<f64> = (0..storage.len()).map(|seq| if storage.level(seq, 0) == 3 { 0.0 } else { 0.5 }).collect();
        let removed = coarsen(&mut storage, &mut alpha, &Magnitude(Some(2)), &CoarseningOptions::new(1.0)).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(storage.len(), 5);
    }
}
