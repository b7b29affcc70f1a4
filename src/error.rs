use thiserror::Error;

/// Erros fatais: qualquer um deles aborta a execução inteira.
///
/// Falhas por registro não passam por aqui; ficam em
/// [`RecordFailure`](crate::reconcile::RecordFailure).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("UF directory unavailable: {0}")]
    Directory(String),

    #[error("Failed to persist renewed token to {path}: {source}")]
    TokenPersist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_persist_display_names_the_file() {
        let err = SyncError::TokenPersist {
            path: "ufsync.toml".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to persist renewed token to ufsync.toml: read-only"
        );
    }

    #[test]
    fn database_error_converts() {
        let err = SyncError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, SyncError::Database(_)));
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[test]
    fn directory_display() {
        let err = SyncError::Directory("bas_estados is empty".into());
        assert_eq!(err.to_string(), "UF directory unavailable: bas_estados is empty");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
