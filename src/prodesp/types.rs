//! Tipos trocados com o serviço de busca fonética da PRODESP.
//!
//! O serviço não tem um campo de status: o formato do JSON é que diz o que
//! aconteceu. `{"outListaAlunos": [...]}` indica sucesso e `{"outErro": "..."}`
//! indica erro, sendo `"Unauthorized"` o caso especial de token expirado.

use serde::Serialize;
use serde_json::Value;

use crate::normalize::remove_accents;
use crate::store::CandidateRecord;

/// Chave da lista de alunos encontrados.
pub const MATCH_LIST_KEY: &str = "outListaAlunos";
/// Chave da sigla da UF do RA dentro de cada aluno encontrado.
pub const STATE_ABBREV_KEY: &str = "outSiglaUFRA";
/// Chave de erro de domínio.
pub const ERROR_KEY: &str = "outErro";
/// Valor de [`ERROR_KEY`] que indica token expirado ou inválido.
pub const UNAUTHORIZED: &str = "Unauthorized";

/// Parâmetros da busca fonética, já sem acentos.
///
/// Os nomes dos campos seguem os parâmetros de query string do serviço.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupQuery {
    #[serde(rename = "inNomeAluno")]
    pub name: String,
    #[serde(rename = "inNomeMae")]
    pub mother_name: String,
    /// Data no formato DD/MM/AAAA, enviada sem alteração.
    #[serde(rename = "inDataNascimento")]
    pub birth_date: String,
}

impl LookupQuery {
    pub fn from_record(record: &CandidateRecord) -> Self {
        Self {
            name: remove_accents(&record.full_name),
            mother_name: remove_accents(&record.mother_name),
            birth_date: record.birth_date.clone(),
        }
    }
}

/// Classificação estrutural de uma resposta da busca.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// Sigla da UF do primeiro aluno da lista.
    Matched(String),
    DomainError(String),
    Unauthorized,
    UnknownFailure,
}

/// Classifies a raw search response.
///
/// When the match list has several entries the first one wins; homonyms are
/// not disambiguated. An empty list, or a first entry without a string
/// state abbreviation, is an `UnknownFailure`.
pub fn classify(response: &Value) -> LookupResult {
    if let Some(matches) = response.get(MATCH_LIST_KEY) {
        return matches
            .as_array()
            .and_then(|list| list.first())
            .and_then(|first| first.get(STATE_ABBREV_KEY))
            .and_then(Value::as_str)
            .map(|uf| LookupResult::Matched(uf.to_string()))
            .unwrap_or(LookupResult::UnknownFailure);
    }

    match response.get(ERROR_KEY) {
        Some(Value::String(msg)) if msg == UNAUTHORIZED => LookupResult::Unauthorized,
        Some(Value::String(msg)) => LookupResult::DomainError(msg.clone()),
        Some(other) => LookupResult::DomainError(other.to_string()),
        None => LookupResult::UnknownFailure,
    }
}
