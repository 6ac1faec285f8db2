use crate::{algorithms::refinement::RefinementFunctor, storage::GridStorage};

///
/// A function that defines how refinement is performed.
///
/// # Arguments
/// - the point in the coordinates of the grid's bounding box.
/// - the surplus coefficient of the point.
///
pub type UserRefinementFunction = dyn Fn(&[f64], f64) -> f64 + Send + Sync;

pub struct UserDefinedRefinement<'a>
{
    pub fun_eval: &'a UserRefinementFunction,
    pub max_num_refined: Option<usize>,
    pub max_num_removed: Option<usize>,
}

impl<'a> UserDefinedRefinement<'a>
{
    pub fn new(fun_eval: &'a UserRefinementFunction) -> Self
    {
        Self { fun_eval, max_num_refined: None, max_num_removed: None }
    }
}

impl RefinementFunctor for UserDefinedRefinement<'_>
{
    fn eval(&self, storage: &GridStorage, alpha: &[f64]) -> Vec<f64>
    {
        storage.points().zip(alpha).map(|(x, &a)| (self.fun_eval)(x.as_slice(), a)).collect()
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
fn test_user_defined_scores()
{
    use crate::generators;
    let mut storage = GridStorage::new(1).unwrap();
    generators::full(&mut storage, 2).unwrap();
    storage.bounding_box_mut().upper[0] = 4.0;
    // favour points on the right half of [0, 4]
    let fun = |x: &[f64], alpha: f64| if x[0] > 2.0 { alpha.abs() } else { 0.0 };
    let functor = UserDefinedRefinement::new(&fun);
    let scores = functor.eval(&storage, &[1.0, 1.0, -3.0]);
    assert_eq!(scores, vec![0.0, 0.0, 3.0]);
}
