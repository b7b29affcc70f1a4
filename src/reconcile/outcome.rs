use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{RecordState, Trace};
use crate::store::CandidateRecord;

/// Why a single record ended in `LOGGED_ERROR`. None of these stop the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordFailure {
    /// `outErro` returned by the service (e.g. student not found).
    Domain(String),
    /// Transport error or a response with no recognizable shape.
    UnknownResponse(String),
    /// Matched abbreviation missing from `bas_estados`.
    UnknownState(String),
    /// Authentication failed while renewing an expired token.
    TokenRenewal(String),
    /// Still `Unauthorized` after the single renewal.
    RejectedAfterRenewal,
    /// The UPDATE of the resolved code failed.
    Persist(String),
}

impl std::fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFailure::Domain(msg) => write!(f, "PRODESP error: {msg}"),
            RecordFailure::UnknownResponse(raw) => write!(f, "unknown response: {raw}"),
            RecordFailure::UnknownState(uf) => write!(f, "unknown state abbreviation {uf:?}"),
            RecordFailure::TokenRenewal(msg) => write!(f, "token renewal failed: {msg}"),
            RecordFailure::RejectedAfterRenewal => write!(f, "token rejected after renewal"),
            RecordFailure::Persist(msg) => write!(f, "failed to write UF code: {msg}"),
        }
    }
}

impl RecordFailure {
    /// State the record enters right before `LOGGED_ERROR`.
    pub fn failed_state(&self) -> RecordState {
        match self {
            RecordFailure::UnknownState(_) => RecordState::ResolveFailed,
            _ => RecordState::Failed,
        }
    }
}

/// Final result for one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub internal_id: i64,
    pub registration_number: String,
    pub trace: Trace,
    pub uf: Option<String>,
    pub uf_code: Option<i32>,
    pub failure: Option<RecordFailure>,
}

impl RecordOutcome {
    pub fn new(record: &CandidateRecord, trace: Trace) -> Self {
        Self {
            internal_id: record.internal_id,
            registration_number: record.registration_number.clone(),
            trace,
            uf: None,
            uf_code: None,
            failure: None,
        }
    }

    pub fn state(&self) -> RecordState {
        self.trace.current()
    }

    pub fn is_done(&self) -> bool {
        self.state() == RecordState::Done
    }

    pub fn persisted(&self) -> bool {
        self.is_done() && self.trace.contains(RecordState::Persisted)
    }
}

/// Summary of one run, produced when the batch ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub persist_writes: bool,
    pub total: usize,
    pub persisted: usize,
    pub dry_run: usize,
    pub failed: usize,
    pub token_renewals: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn start(persist_writes: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            persist_writes,
            total: 0,
            persisted: 0,
            dry_run: 0,
            failed: 0,
            token_renewals: 0,
            started_at: now,
            completed_at: now,
            duration_ms: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: RecordOutcome) {
        self.total += 1;
        if outcome.persisted() {
            self.persisted += 1;
        } else if outcome.is_done() {
            self.dry_run += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.completed_at = Utc::now();
        self.duration_ms = (self.completed_at - self.started_at).num_milliseconds();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> CandidateRecord {
        CandidateRecord {
            internal_id: id,
            registration_number: format!("RA{id}"),
            full_name: "ANA".into(),
            mother_name: "MARIA".into(),
            birth_date: "01/01/2010".into(),
        }
    }

    fn outcome(id: i64, path: &[RecordState]) -> RecordOutcome {
        let mut trace = Trace::new();
        for state in path {
            trace.advance(*state);
        }
        RecordOutcome::new(&record(id), trace)
    }

    #[test]
    fn report_counts_each_outcome_once() {
        use RecordState::*;
        let mut report = BatchReport::start(true);
        report.push(outcome(1, &[Lookup1, Matched, Resolve, Persisted, Done]));
        report.push(outcome(2, &[Lookup1, Matched, Resolve, DryRun, Done]));
        report.push(outcome(3, &[Lookup1, Failed, LoggedError]));
        report.finish();

        assert_eq!(report.total, 3);
        assert_eq!(report.persisted, 1);
        assert_eq!(report.dry_run, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total, report.persisted + report.dry_run + report.failed);
        assert!(report.duration_ms >= 0);
    }

    #[test]
    fn failed_state_for_each_failure() {
        assert_eq!(
            RecordFailure::UnknownState("ZZ".into()).failed_state(),
            RecordState::ResolveFailed
        );
        assert_eq!(RecordFailure::RejectedAfterRenewal.failed_state(), RecordState::Failed);
        assert_eq!(RecordFailure::Persist("x".into()).failed_state(), RecordState::Failed);
    }

    #[test]
    fn failure_display() {
        assert_eq!(
            RecordFailure::Domain("Aluno nao encontrado".into()).to_string(),
            "PRODESP error: Aluno nao encontrado"
        );
        assert_eq!(
            RecordFailure::UnknownState("ZZ".into()).to_string(),
            r#"unknown state abbreviation "ZZ""#
        );
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = BatchReport::start(false);
        report.push(outcome(9, &[RecordState::Lookup1, RecordState::Failed, RecordState::LoggedError]));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["persist_writes"], false);
        assert_eq!(json["outcomes"][0]["registration_number"], "RA9");
    }
}
