use tracing::{debug, error, info, warn};

use super::outcome::{BatchReport, RecordFailure, RecordOutcome};
use super::state::{RecordState, Trace};
use crate::error::SyncError;
use crate::prodesp::{LookupQuery, LookupResult, StudentLookup, classify};
use crate::store::{CandidateRecord, RecordStore};
use crate::token::TokenStore;
use crate::uf::UfDirectory;
use crate::ui::BatchProgress;

/// Drives every pending record through lookup, renewal, resolution and write.
///
/// Records are processed strictly one after another. A record's failure is
/// logged and recorded in its outcome; only a failure to persist a renewed
/// token aborts the batch.
pub struct Reconciler<'a, L, S, T> {
    lookup: &'a L,
    store: &'a S,
    tokens: &'a mut T,
    directory: UfDirectory,
    persist_writes: bool,
    progress: BatchProgress,
    token_renewals: u32,
}

impl<'a, L, S, T> Reconciler<'a, L, S, T>
where
    L: StudentLookup,
    S: RecordStore,
    T: TokenStore,
{
    pub fn new(
        lookup: &'a L,
        store: &'a S,
        tokens: &'a mut T,
        directory: UfDirectory,
        persist_writes: bool,
    ) -> Self {
        Self {
            lookup,
            store,
            tokens,
            directory,
            persist_writes,
            progress: BatchProgress::hidden(),
            token_renewals: 0,
        }
    }

    pub fn with_progress(mut self, progress: BatchProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Processes each record exactly once and returns one outcome per record.
    pub async fn run_batch(
        &mut self,
        records: Vec<CandidateRecord>,
    ) -> Result<BatchReport, SyncError> {
        let mut report = BatchReport::start(self.persist_writes);
        info!(
            run_id = %report.run_id,
            pending = records.len(),
            persist_writes = self.persist_writes,
            "starting reconciliation batch"
        );

        for record in &records {
            self.progress.lookup(record);
            let outcome = self.process_record(record).await?;
            debug_assert!(outcome.state().is_terminal());
            debug!(
                id = outcome.internal_id,
                state = %outcome.state(),
                lookups = outcome.trace.lookups(),
                "record finished"
            );
            self.progress.record(record, &outcome);
            report.push(outcome);
        }

        report.token_renewals = self.token_renewals;
        report.finish();
        self.progress.finish(&report);
        info!(
            run_id = %report.run_id,
            total = report.total,
            persisted = report.persisted,
            dry_run = report.dry_run,
            failed = report.failed,
            token_renewals = report.token_renewals,
            duration_ms = report.duration_ms,
            "reconciliation batch finished"
        );
        Ok(report)
    }

    async fn process_record(
        &mut self,
        record: &CandidateRecord,
    ) -> Result<RecordOutcome, SyncError> {
        let mut trace = Trace::new();
        let query = LookupQuery::from_record(record);
        info!(id = record.internal_id, name = %record.full_name, "looking up student");

        trace.advance(RecordState::Lookup1);
        let (mut result, mut raw) = self.lookup_once(&query).await;

        if result == LookupResult::Unauthorized {
            trace.advance(RecordState::Expired);
            trace.advance(RecordState::Renew);
            if let Err(failure) = self.renew_token().await? {
                return Ok(self.fail(record, trace, failure));
            }
            trace.advance(RecordState::Lookup2);
            (result, raw) = self.lookup_once(&query).await;
        }

        let uf = match result {
            LookupResult::Matched(uf) => uf,
            LookupResult::DomainError(msg) => {
                return Ok(self.fail(record, trace, RecordFailure::Domain(msg)));
            }
            LookupResult::UnknownFailure => {
                return Ok(self.fail(record, trace, RecordFailure::UnknownResponse(raw)));
            }
            // A first Unauthorized always renews, so this one came after renewal.
            LookupResult::Unauthorized => {
                return Ok(self.fail(record, trace, RecordFailure::RejectedAfterRenewal));
            }
        };

        trace.advance(RecordState::Matched);
        trace.advance(RecordState::Resolve);
        info!(id = record.internal_id, uf = %uf, "student matched");

        let code = match self.directory.resolve(&uf) {
            Ok(code) => code,
            Err(unknown) => {
                return Ok(self.fail(record, trace, RecordFailure::UnknownState(unknown.0)));
            }
        };

        if self.persist_writes {
            info!(id = record.internal_id, uf_code = code, "writing UF code");
            if let Err(e) = self.store.persist(record.internal_id, code).await {
                let mut outcome = self.fail(record, trace, RecordFailure::Persist(e.to_string()));
                outcome.uf = Some(uf);
                outcome.uf_code = Some(code);
                return Ok(outcome);
            }
            trace.advance(RecordState::Persisted);
        } else {
            info!(id = record.internal_id, uf_code = code, "dry run, UF code not written");
            trace.advance(RecordState::DryRun);
        }
        trace.advance(RecordState::Done);

        let mut outcome = RecordOutcome::new(record, trace);
        outcome.uf = Some(uf);
        outcome.uf_code = Some(code);
        Ok(outcome)
    }

    /// Issues one search with the latest known token. Transport and decode
    /// errors become `UnknownFailure`. Also returns the raw payload for logs.
    async fn lookup_once(&self, query: &LookupQuery) -> (LookupResult, String) {
        match self.lookup.lookup(self.tokens.current(), query).await {
            Ok(body) => (classify(&body), body.to_string()),
            Err(e) => {
                warn!(error = %e, "phonetic search failed");
                (LookupResult::UnknownFailure, e.to_string())
            }
        }
    }

    /// Outer error: the new token could not be persisted (fatal).
    /// Inner error: authentication itself failed (this record only).
    async fn renew_token(&mut self) -> Result<Result<(), RecordFailure>, SyncError> {
        info!("token expired, requesting a new one");
        let token = match self.lookup.authenticate().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "token renewal failed");
                return Ok(Err(RecordFailure::TokenRenewal(e.to_string())));
            }
        };
        self.tokens.replace(token)?;
        self.token_renewals += 1;
        self.progress.token_renewed();
        info!("token renewed and saved");
        Ok(Ok(()))
    }

    fn fail(
        &self,
        record: &CandidateRecord,
        mut trace: Trace,
        failure: RecordFailure,
    ) -> RecordOutcome {
        error!(
            id = record.internal_id,
            ra = %record.registration_number,
            name = %record.full_name,
            mother = %record.mother_name,
            birth_date = %record.birth_date,
            error = %failure,
            "student reconciliation failed"
        );
        trace.advance(failure.failed_state());
        trace.advance(RecordState::LoggedError);
        let mut outcome = RecordOutcome::new(record, trace);
        outcome.failure = Some(failure);
        outcome
    }
}
