//! ufsync - preenche `aluno_ra_estcod` dos alunos sem UF do RA.
//!
//! Para cada aluno pendente, consulta a busca fonética da PRODESP, renova o
//! token uma vez se ele tiver expirado, resolve a sigla da UF para o código
//! de `bas_estados` e grava o resultado quando a configuração permite.

mod cli;
mod config;
mod error;
mod normalize;
mod prodesp;
mod reconcile;
mod store;
mod token;
mod uf;
mod ui;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use config::AppConfig;
use prodesp::{ProdespClient, StudentLookup};
use reconcile::Reconciler;
use store::{PgRecordStore, RecordStore};
use token::{ConfigTokenStore, TokenStore};
use uf::UfDirectory;
use ui::BatchProgress;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;
    info!("--------------------- ufsync started ---------------------");

    let mut config = AppConfig::load(&cli.config)?;
    if cli.dry_run {
        config.behavior.persist_writes = false;
    }

    match cli.command {
        Command::Run => {
            let store = connect(&config).await?;
            let result = run(&config, &cli.config, &store, cli.report_json).await;
            store.close().await;
            result
        }
        Command::Pending => {
            let store = connect(&config).await?;
            let records = store.fetch_pending().await;
            store.close().await;
            let records = records.context("failed to read pending students")?;
            info!(pending = records.len(), "listed pending students");
            ui::print_pending(&records);
            Ok(())
        }
        Command::RenewToken => renew_token(&config, &cli.config).await,
    }
}

// Log em arquivo, somente acréscimo, sem cores.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ufsync=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

async fn connect(config: &AppConfig) -> Result<PgRecordStore> {
    PgRecordStore::connect(&config.db).await.with_context(|| {
        format!(
            "failed to connect to database {} on {}:{}",
            config.db.name, config.db.host, config.db.port
        )
    })
}

async fn run(
    config: &AppConfig,
    config_path: &Path,
    store: &PgRecordStore,
    report_json: bool,
) -> Result<()> {
    let persist_writes = config.behavior.persist_writes;
    ui::print_policy_banner(persist_writes);

    let directory = UfDirectory::load(store).await?;
    println!("- Códigos de estados carregados ({})", directory.len());

    let records = store
        .fetch_pending()
        .await
        .context("failed to read pending students")?;
    println!("- Encontrados {} alunos sem UF", records.len());
    info!(pending = records.len(), "pending students loaded");

    let client = ProdespClient::new(&config.api, &config.behavior)?;
    let mut tokens = ConfigTokenStore::new(config_path, config.api.token.clone());

    println!("- Iniciando buscas fonéticas dos alunos...");
    let progress = BatchProgress::new(records.len() as u64);
    let report = Reconciler::new(&client, store, &mut tokens, directory, persist_writes)
        .with_progress(progress)
        .run_batch(records)
        .await?;

    if report.failed > 0 {
        println!("- Para mais informações, consulte o log");
    }
    if report_json {
        ui::print_report(&report);
    }
    Ok(())
}

async fn renew_token(config: &AppConfig, config_path: &Path) -> Result<()> {
    let client = ProdespClient::new(&config.api, &config.behavior)?;
    let token = client
        .authenticate()
        .await
        .context("PRODESP authentication failed")?;

    let mut tokens = ConfigTokenStore::new(config_path, config.api.token.clone());
    tokens.replace(token)?;
    info!(path = %tokens.path().display(), "token renewed on request");
    println!("- Token renovado e gravado em {}", tokens.path().display());
    Ok(())
}
