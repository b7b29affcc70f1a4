//! Configuração do ufsync carregada a partir de `ufsync.toml`.
//!
//! A struct [`AppConfig`] agrupa os parâmetros em três seções:
//! banco de dados (`[db]`), serviço da PRODESP (`[api]`) e comportamento
//! (`[behavior]`). As variáveis de ambiente `UFSYNC_DB_PASS` e
//! `UFSYNC_API_PASS` têm precedência sobre o arquivo para as senhas.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Arquivo de configuração padrão, relativo ao diretório atual.
pub const DEFAULT_CONFIG_PATH: &str = "ufsync.toml";

/// Configuração de nível superior carregada de `ufsync.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

/// Parâmetros de conexão com o PostgreSQL.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub pass: String,
    pub name: String,
}

/// Endereços e credenciais do serviço REST da PRODESP.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// URL base, concatenada diretamente com os sub-caminhos abaixo.
    pub base_url: String,
    pub auth_path: String,
    pub search_path: String,
    pub user: String,
    #[serde(default)]
    pub pass: String,
    /// Último token conhecido. Pode estar vazio na primeira execução.
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BehaviorConfig {
    /// Quando falso, os códigos resolvidos são apenas logados (dry run).
    #[serde(default)]
    pub persist_writes: bool,

    /// Tempo máximo de uma requisição HTTP, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Tempo máximo para estabelecer a conexão HTTP, em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

// Porta padrão do PostgreSQL.
fn default_db_port() -> u16 {
    5432
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            persist_writes: false,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Carrega a configuração do arquivo indicado. Arquivo ausente é erro.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str::<AppConfig>(contents)?)
    }

    // Variáveis de ambiente têm precedência sobre o arquivo para as senhas.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(pass) = lookup("UFSYNC_DB_PASS")
            && !pass.is_empty()
        {
            self.db.pass = pass;
        }
        if let Some(pass) = lookup("UFSYNC_API_PASS")
            && !pass.is_empty()
        {
            self.api.pass = pass;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [db]
        host = "localhost"
        user = "edu"
        pass = "secret"
        name = "escola"

        [api]
        base_url = "https://sed.educacao.sp.gov.br/ncaapi/api"
        auth_path = "/Usuario/ValidarUsuario"
        search_path = "/Aluno/ListarAlunos"
        user = "SME"
        pass = "api-secret"
    "#;

    #[test]
    fn deserialize_minimal_toml_uses_defaults() {
        let config = AppConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.db.port, 5432);
        assert_eq!(config.db.name, "escola");
        assert!(config.api.token.is_empty());
        assert!(!config.behavior.persist_writes);
        assert_eq!(config.behavior.request_timeout_secs, 30);
        assert_eq!(config.behavior.connect_timeout_secs, 10);
    }

    #[test]
    fn deserialize_behavior_section() {
        let toml_str = format!(
            "{MINIMAL}\n[behavior]\npersist_writes = true\nrequest_timeout_secs = 5\n"
        );
        let config = AppConfig::from_toml(&toml_str).unwrap();
        assert!(config.behavior.persist_writes);
        assert_eq!(config.behavior.request_timeout_secs, 5);
        assert_eq!(config.behavior.connect_timeout_secs, 10);
    }

    #[test]
    fn missing_section_is_an_error() {
        let err = AppConfig::from_toml("[db]\nhost = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn env_overrides_passwords() {
        let mut config = AppConfig::from_toml(MINIMAL).unwrap();
        config.apply_env_overrides(|key| match key {
            "UFSYNC_API_PASS" => Some("from-env".to_string()),
            "UFSYNC_DB_PASS" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api.pass, "from-env");
        // Valor vazio no ambiente não sobrescreve o arquivo.
        assert_eq!(config.db.pass, "secret");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/ufsync.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
