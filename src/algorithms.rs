pub mod coarsening;
pub mod hierarchisation;
pub mod refinement;
pub mod sweep;
pub mod up_down;
#[cfg(test)]
pub(crate) mod reference;
