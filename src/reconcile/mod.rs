mod engine;
mod outcome;
mod state;

pub use engine::Reconciler;
pub use outcome::{BatchReport, RecordFailure, RecordOutcome};
pub use state::{RecordState, Trace};
