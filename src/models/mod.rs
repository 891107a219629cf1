pub mod operation;

pub use operation::{CycleStatus, Operation, OperationStatus, Outcome};
