use std::fmt;

use serde::{Deserialize, Serialize};

/// States a single student record moves through during reconciliation.
///
/// Happy path: START → LOOKUP_1 → MATCHED → RESOLVE → PERSISTED|DRY_RUN → DONE.
/// An expired token detours through EXPIRED → RENEW → LOOKUP_2, at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordState {
    Start,
    Lookup1,
    Expired,
    Renew,
    Lookup2,
    Matched,
    Failed,
    Resolve,
    Persisted,
    DryRun,
    ResolveFailed,
    Done,
    LoggedError,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordState::Start => "START",
            RecordState::Lookup1 => "LOOKUP_1",
            RecordState::Expired => "EXPIRED",
            RecordState::Renew => "RENEW",
            RecordState::Lookup2 => "LOOKUP_2",
            RecordState::Matched => "MATCHED",
            RecordState::Failed => "FAILED",
            RecordState::Resolve => "RESOLVE",
            RecordState::Persisted => "PERSISTED",
            RecordState::DryRun => "DRY_RUN",
            RecordState::ResolveFailed => "RESOLVE_FAILED",
            RecordState::Done => "DONE",
            RecordState::LoggedError => "LOGGED_ERROR",
        };
        write!(f, "{name}")
    }
}

impl RecordState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: RecordState) -> bool {
        use RecordState::*;
        matches!(
            (self, next),
            (Start, Lookup1)
                | (Lookup1, Matched | Expired | Failed)
                | (Expired, Renew)
                | (Renew, Lookup2 | Failed)
                | (Lookup2, Matched | Failed)
                | (Matched, Resolve)
                | (Resolve, Persisted | DryRun | ResolveFailed | Failed)
                | (Persisted | DryRun, Done)
                | (ResolveFailed | Failed, LoggedError)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RecordState::Done | RecordState::LoggedError)
    }
}

/// The path a record took through the state machine, starting at `Start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    states: Vec<RecordState>,
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace {
    pub fn new() -> Self {
        Self {
            states: vec![RecordState::Start],
        }
    }

    pub fn current(&self) -> RecordState {
        self.states.last().copied().unwrap_or(RecordState::Start)
    }

    /// Appends `next`. Illegal transitions are a programming error.
    pub fn advance(&mut self, next: RecordState) {
        debug_assert!(
            self.current().can_transition_to(next),
            "illegal transition {} -> {next}",
            self.current()
        );
        self.states.push(next);
    }

    /// Number of lookups issued for this record.
    pub fn lookups(&self) -> usize {
        self.states
            .iter()
            .filter(|s| matches!(s, RecordState::Lookup1 | RecordState::Lookup2))
            .count()
    }

    pub fn contains(&self, state: RecordState) -> bool {
        self.states.contains(&state)
    }
}
