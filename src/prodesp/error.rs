//! Tipos de erro para o cliente REST da PRODESP.
//!
//! [`ProdespError`] cobre apenas falhas de transporte e de formato. Erros de
//! domínio (aluno não encontrado, token expirado) chegam no corpo JSON e são
//! tratados por [`classify`](super::classify).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProdespError {
    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// O corpo da resposta não é JSON válido.
    #[error("invalid JSON in response (status {status}): {message}")]
    Decode { status: u16, message: String },

    /// A autenticação respondeu JSON sem `outAutenticacao`.
    #[error("authentication response has no token (status {status}): {body}")]
    MissingToken { status: u16, body: String },
}
