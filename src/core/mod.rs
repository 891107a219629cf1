pub mod engine;
pub mod matrix;
pub mod objective;

pub use engine::{CycleEngine, CycleResult, DeletedOperation, ReplayCursor};
pub use matrix::{build_matrix, MatrixCache, MatrixKey, PayoffMatrix};
pub use objective::Objective;
