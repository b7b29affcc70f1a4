//! Interface de linha de comando do ufsync baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, pending,
//! renew-token) e flags globais (--config, --log-file, --dry-run,
//! --report-json).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// ufsync — Preenche a UF do RA dos alunos via busca fonética da PRODESP.
#[derive(Debug, Parser)]
#[command(name = "ufsync", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração. O token renovado é gravado nele.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH, env = "UFSYNC_CONFIG")]
    pub config: PathBuf,

    /// Arquivo de log (somente acréscimo).
    #[arg(long, global = true, default_value = "logs.log")]
    pub log_file: PathBuf,

    /// Não grava no banco, mesmo com `persist_writes = true`.
    #[arg(long, global = true, default_value_t = false)]
    pub dry_run: bool,

    /// Imprime o relatório do lote em JSON ao final.
    #[arg(long, global = true, default_value_t = false)]
    pub report_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Busca a UF de todos os alunos pendentes e grava o código.
    Run,

    /// Lista os alunos ainda sem UF, sem consultar a PRODESP.
    Pending,

    /// Solicita um token novo à PRODESP e o grava na configuração.
    RenewToken,
}
