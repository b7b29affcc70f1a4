//! Armazenamento do token bearer da PRODESP.
//!
//! O token é estado compartilhado por todo o lote: lido antes de cada
//! busca e substituído no máximo uma vez por expiração. [`ConfigTokenStore`]
//! grava o novo valor em `api.token` do arquivo de configuração, para que
//! a próxima execução reaproveite o token renovado.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::SyncError;

/// Acesso ao token atual e substituição durável.
pub trait TokenStore {
    /// Último token conhecido.
    fn current(&self) -> &str;

    /// Persiste `token` e passa a devolvê-lo em [`current`](TokenStore::current).
    /// Se a gravação falhar, o valor em memória não muda.
    fn replace(&mut self, token: String) -> Result<(), SyncError>;
}

/// Token mantido no próprio arquivo de configuração.
#[derive(Debug)]
pub struct ConfigTokenStore {
    path: PathBuf,
    token: String,
}

impl ConfigTokenStore {
    pub fn new(path: impl Into<PathBuf>, token: String) -> Self {
        Self {
            path: path.into(),
            token,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Relê o arquivo do disco em vez de serializar o AppConfig em memória:
    // as senhas vindas do ambiente não podem vazar para o arquivo.
    fn write_token(&self, token: &str) -> std::io::Result<()> {
        let contents = std::fs::read_to_string(&self.path)?;
        let mut table: toml::Table = toml::from_str(&contents).map_err(std::io::Error::other)?;

        let api = table
            .entry("api")
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        let Some(api) = api.as_table_mut() else {
            return Err(std::io::Error::other("[api] is not a table"));
        };
        api.insert("token".to_string(), toml::Value::String(token.to_string()));

        let rendered = toml::to_string(&table).map_err(std::io::Error::other)?;

        let tmp_path = self.path.with_extension("toml.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(rendered.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)
    }
}

impl TokenStore for ConfigTokenStore {
    fn current(&self) -> &str {
        &self.token
    }

    fn replace(&mut self, token: String) -> Result<(), SyncError> {
        self.write_token(&token)
            .map_err(|source| SyncError::TokenPersist {
                path: self.path.display().to_string(),
                source,
            })?;
        self.token = token;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    const CONFIG: &str = r#"
[db]
host = "localhost"
user = "edu"
pass = "db-secret"
name = "escola"

[api]
base_url = "http://prodesp"
auth_path = "/auth"
search_path = "/alunos"
user = "SME"
pass = "api-secret"
token = "old-token"

[behavior]
persist_writes = true
"#;

    fn write_config(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("ufsync.toml");
        std::fs::write(&path, CONFIG).unwrap();
        path
    }

    #[test]
    fn replace_updates_memory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir);
        let mut store = ConfigTokenStore::new(&path, "old-token".into());

        store.replace("new-token".into()).unwrap();
        assert_eq!(store.current(), "new-token");

        // A próxima execução enxerga o token novo.
        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.api.token, "new-token");
    }

    #[test]
    fn replace_preserves_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir);
        let mut store = ConfigTokenStore::new(&path, "old-token".into());

        store.replace("new-token".into()).unwrap();

        let reloaded = AppConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.db.pass, "db-secret");
        assert_eq!(reloaded.api.pass, "api-secret");
        assert_eq!(reloaded.api.search_path, "/alunos");
        assert!(reloaded.behavior.persist_writes);
        assert!(!dir.path().join("ufsync.toml.tmp").exists());
    }

    #[test]
    fn failed_write_keeps_old_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let mut store = ConfigTokenStore::new(&path, "old-token".into());

        let err = store.replace("new-token".into()).unwrap_err();
        assert!(matches!(err, SyncError::TokenPersist { .. }));
        assert_eq!(store.current(), "old-token");
    }

    #[test]
    fn non_table_api_section_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ufsync.toml");
        std::fs::write(&path, "api = 3\n").unwrap();
        let mut store = ConfigTokenStore::new(&path, String::new());

        assert!(store.replace("t".into()).is_err());
        assert_eq!(store.current(), "");
    }
}
