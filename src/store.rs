//! Acesso ao banco acadêmico (PostgreSQL).
//!
//! [`PgRecordStore`] lê os alunos sem UF do RA, a tabela de estados e grava
//! o código resolvido. Todo SQL é verificado em tempo de execução
//! (`sqlx::query_as`), sem exigir banco na compilação.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::config::DbConfig;
use crate::error::SyncError;

/// Formato de data exigido pela busca fonética.
pub const BIRTH_DATE_FORMAT: &str = "%d/%m/%Y";

/// Aluno sem `aluno_ra_estcod`, candidato à reconciliação.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRecord {
    /// `edu_aluno.aluno_cod`.
    pub internal_id: i64,
    /// Número do RA.
    pub registration_number: String,
    pub full_name: String,
    pub mother_name: String,
    /// DD/MM/AAAA. Vazio quando o cadastro não tem data de nascimento.
    pub birth_date: String,
}

/// Operações do engine sobre o banco.
pub trait RecordStore {
    /// Alunos sem UF do RA. A ordem é a devolvida pelo banco (indefinida).
    async fn fetch_pending(&self) -> Result<Vec<CandidateRecord>, sqlx::Error>;

    /// Pares (sigla, código) de todos os estados.
    async fn fetch_uf_codes(&self) -> Result<Vec<(String, i32)>, sqlx::Error>;

    /// Grava o código da UF para exatamente um aluno.
    async fn persist(&self, internal_id: i64, uf_code: i32) -> Result<(), sqlx::Error>;
}

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    aluno_cod: i64,
    ra: Option<String>,
    nome: Option<String>,
    nome_mae: Option<String>,
    nascimento: Option<NaiveDate>,
}

impl From<PendingRow> for CandidateRecord {
    fn from(row: PendingRow) -> Self {
        Self {
            internal_id: row.aluno_cod,
            registration_number: row.ra.unwrap_or_default(),
            full_name: row.nome.unwrap_or_default(),
            mother_name: row.nome_mae.unwrap_or_default(),
            birth_date: row
                .nascimento
                .map(|d| d.format(BIRTH_DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Postgres-backed record store. Holds a single connection for the run.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub async fn connect(db: &DbConfig) -> Result<Self, SyncError> {
        let options = PgConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .username(&db.user)
            .password(&db.pass)
            .database(&db.name);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

impl RecordStore for PgRecordStore {
    async fn fetch_pending(&self) -> Result<Vec<CandidateRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT aluno.aluno_cod::int8 AS aluno_cod,
                   aluno.aluno_ra::text AS ra,
                   pessoa.pes_nome AS nome,
                   pessoa.pes_nomemae AS nome_mae,
                   pessoa.pes_dtnasc::date AS nascimento
            FROM edu_aluno AS aluno
            INNER JOIN bas_pessoa AS pessoa
                ON pessoa.pes_cod = aluno.aluno_pescod
            WHERE aluno.aluno_ra_estcod IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CandidateRecord::from).collect())
    }

    async fn fetch_uf_codes(&self) -> Result<Vec<(String, i32)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i32)>(
            "SELECT est_sigla::text, est_cod::int4 FROM bas_estados WHERE est_sigla IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn persist(&self, internal_id: i64, uf_code: i32) -> Result<(), sqlx::Error> {
        let result = sqlx::query("UPDATE edu_aluno SET aluno_ra_estcod = $1 WHERE aluno_cod = $2")
            .bind(uf_code)
            .bind(internal_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> PendingRow {
        PendingRow {
            aluno_cod: 42,
            ra: Some("000112233".into()),
            nome: Some("ANA LÚCIA".into()),
            nome_mae: Some("JOSEFA".into()),
            nascimento: NaiveDate::from_ymd_opt(2011, 2, 3),
        }
    }

    #[test]
    fn row_formats_birth_date_day_first() {
        let record = CandidateRecord::from(row());
        assert_eq!(record.internal_id, 42);
        assert_eq!(record.birth_date, "03/02/2011");
        // Acentos só são removidos na montagem da busca.
        assert_eq!(record.full_name, "ANA LÚCIA");
    }

    #[test]
    fn null_columns_become_empty_strings() {
        let record = CandidateRecord::from(PendingRow {
            ra: None,
            nome_mae: None,
            nascimento: None,
            ..row()
        });
        assert_eq!(record.registration_number, "");
        assert_eq!(record.mother_name, "");
        assert_eq!(record.birth_date, "");
    }
}
