//! Expectation evaluation and control execution

pub mod clock;
pub mod comparisons;
pub mod evaluator;
pub mod runner;

pub use clock::{Clock, FixedClock, SystemClock};
pub use evaluator::{evaluate, EvaluationError, Verdict};
pub use runner::{ControlRunner, GroupState};
