pub trait Basis
{
    fn eval(&self, level: u32, index: u32, x: f64) -> f64;
    fn eval_deriv(&self, level: u32, index: u32, x: f64) -> f64;
}
