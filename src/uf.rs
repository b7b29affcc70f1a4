use std::collections::HashMap;

use thiserror::Error;

use crate::error::SyncError;
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown state abbreviation: {0:?}")]
pub struct UnknownState(pub String);

/// Sigla da UF → código numérico (`bas_estados`), somente leitura após a carga.
#[derive(Debug, Clone, Default)]
pub struct UfDirectory {
    codes: HashMap<String, i32>,
}

impl UfDirectory {
    /// Loads the whole table once. Failing here is fatal: without the
    /// directory no record can be resolved.
    pub async fn load(store: &impl RecordStore) -> Result<Self, SyncError> {
        let rows = store
            .fetch_uf_codes()
            .await
            .map_err(|e| SyncError::Directory(e.to_string()))?;
        let directory = Self::from_pairs(rows);
        if directory.is_empty() {
            return Err(SyncError::Directory("bas_estados is empty".into()));
        }
        Ok(directory)
    }

    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, i32)>) -> Self {
        let codes = pairs
            .into_iter()
            .map(|(abbrev, code)| {
                let abbrev: String = abbrev.into();
                (canonical(&abbrev), code)
            })
            .collect();
        Self { codes }
    }

    pub fn resolve(&self, abbreviation: &str) -> Result<i32, UnknownState> {
        self.codes
            .get(&canonical(abbreviation))
            .copied()
            .ok_or_else(|| UnknownState(abbreviation.to_string()))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

fn canonical(abbreviation: &str) -> String {
    abbreviation.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CandidateRecord;

    struct TableStore(Result<Vec<(String, i32)>, ()>);

    impl RecordStore for TableStore {
        async fn fetch_pending(&self) -> Result<Vec<CandidateRecord>, sqlx::Error> {
            Ok(Vec::new())
        }

        async fn fetch_uf_codes(&self) -> Result<Vec<(String, i32)>, sqlx::Error> {
            self.0.clone().map_err(|_| sqlx::Error::PoolClosed)
        }

        async fn persist(&self, _internal_id: i64, _uf_code: i32) -> Result<(), sqlx::Error> {
            Ok(())
        }
    }

    #[test]
    fn resolves_known_abbreviation() {
        let dir = UfDirectory::from_pairs([("SP", 35), ("MG", 31)]);
        assert_eq!(dir.resolve("SP"), Ok(35));
        assert_eq!(dir.resolve("MG"), Ok(31));
    }

    #[test]
    fn resolve_ignores_case_and_padding() {
        // bas_estados costuma vir como CHAR(2) com espaços.
        let dir = UfDirectory::from_pairs([("RJ ", 33)]);
        assert_eq!(dir.resolve(" rj"), Ok(33));
    }

    #[test]
    fn unknown_abbreviation_is_an_error() {
        let dir = UfDirectory::from_pairs([("SP", 35)]);
        assert_eq!(dir.resolve("ZZ"), Err(UnknownState("ZZ".into())));
    }

    #[tokio::test]
    async fn load_reads_store_table() {
        let store = TableStore(Ok(vec![("SP".into(), 35), ("BA".into(), 29)]));
        let dir = UfDirectory::load(&store).await.unwrap();
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.resolve("BA"), Ok(29));
    }

    #[tokio::test]
    async fn load_failure_is_fatal() {
        let err = UfDirectory::load(&TableStore(Err(()))).await.unwrap_err();
        assert!(matches!(err, SyncError::Directory(_)));
    }

    #[tokio::test]
    async fn empty_table_is_fatal() {
        let err = UfDirectory::load(&TableStore(Ok(Vec::new()))).await.unwrap_err();
        assert!(matches!(err, SyncError::Directory(_)));
    }
}
