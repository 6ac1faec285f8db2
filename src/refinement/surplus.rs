use crate::{algorithms::refinement::RefinementFunctor, storage::GridStorage};

///
/// Scores every point by the magnitude of its surplus.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct SurplusRefinement
{
    pub max_num_refined: Option<usize>,
    pub max_num_removed: Option<usize>,
}

impl SurplusRefinement
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn with_max_num_refined(mut self, max: usize) -> Self
    {
        self.max_num_refined = Some(max);
        self
    }

    pub fn with_max_num_removed(mut self, max: usize) -> Self
    {
        self.max_num_removed = Some(max);
        self
    }
}

impl RefinementFunctor for SurplusRefinement
{
    fn eval(&self, _storage: &GridStorage, alpha: &[f64]) -> Vec<f64>
    {
        alpha.iter().map(|a| a.abs()).collect()
    }

    fn max_num_refined(&self) -> Option<usize>
    {
        self.max_num_refined
    }

    fn max_num_removed(&self) -> Option<usize>
    {
        self.max_num_removed
    }
}

#[test]
fn test_surplus_scores()
{
    let storage = GridStorage::new(1).unwrap();
    let functor = SurplusRefinement::new().with_max_num_refined(4);
    assert_eq!(functor.eval(&storage, &[-2.0, 0.5]), vec![2.0, 0.5]);
    assert_eq!(functor.max_num_refined(), Some(4));
    assert_eq!(functor.max_num_removed(), None);
}
