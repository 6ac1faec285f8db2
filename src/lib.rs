pub mod algorithms;
pub mod basis;
pub mod errors;
pub mod generators;
pub mod grids;
pub mod iterators;
pub mod refinement;
pub mod serialization;
pub mod storage;
