//! Saída de terminal do ufsync: barra de progresso e linhas coloridas.
//!
//! Usa `indicatif` para a barra sobre o lote e `console` para as cores.
//! O log em arquivo é separado (via `tracing`); aqui fica só o que o
//! operador acompanha em tempo real.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::reconcile::{BatchReport, RecordOutcome};
use crate::store::CandidateRecord;

/// Progresso visual de um lote de reconciliação.
///
/// Sucesso gravado aparece em verde, dry run em amarelo e falha em vermelho.
pub struct BatchProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl BatchProgress {
    /// Barra visível para `total` alunos.
    pub fn new(total: u64) -> Self {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self::with_bar(pb)
    }

    /// Sem saída nenhuma. Usado nos testes.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(pb: ProgressBar) -> Self {
        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Mostra qual aluno está sendo buscado.
    pub fn lookup(&self, record: &CandidateRecord) {
        self.pb.set_message(format!(
            "Buscando {} (mãe: {}, nascimento: {})",
            record.full_name, record.mother_name, record.birth_date
        ));
    }

    pub fn token_renewed(&self) {
        self.pb
            .println(format!("  {} Token expirado, renovado", self.yellow.apply_to("↻")));
    }

    /// Imprime o resultado de um aluno e avança a barra.
    pub fn record(&self, record: &CandidateRecord, outcome: &RecordOutcome) {
        let line = match (&outcome.failure, outcome.persisted()) {
            (Some(failure), _) => format!(
                "  {} {} (RA {}): {failure}. Consulte o log",
                self.red.apply_to("✗"),
                record.full_name,
                record.registration_number
            ),
            (None, true) => format!(
                "  {} {} (RA {}): UF {} gravada",
                self.green.apply_to("✓"),
                record.full_name,
                record.registration_number,
                outcome.uf.as_deref().unwrap_or("?")
            ),
            (None, false) => format!(
                "  {} {} (RA {}): UF {} (não gravada)",
                self.yellow.apply_to("~"),
                record.full_name,
                record.registration_number,
                outcome.uf.as_deref().unwrap_or("?")
            ),
        };
        self.pb.println(line);
        self.pb.inc(1);
    }

    /// Finaliza a barra e imprime o resumo do lote.
    pub fn finish(&self, report: &BatchReport) {
        self.pb.finish_and_clear();
        if self.pb.is_hidden() {
            return;
        }
        println!(
            "- {} alunos processados: {} gravados, {} sem gravação, {} com erro",
            report.total,
            self.green.apply_to(report.persisted),
            self.yellow.apply_to(report.dry_run),
            self.red.apply_to(report.failed)
        );
    }
}

/// Informa se a gravação no banco está ativa nesta execução.
pub fn print_policy_banner(persist_writes: bool) {
    if persist_writes {
        println!("- Parâmetro de alteração de banco {}", Style::new().green().apply_to("ATIVO"));
    } else {
        println!("- Parâmetro de alteração de banco {}", Style::new().yellow().apply_to("INATIVO"));
    }
}

/// Imprime a lista de alunos pendentes (subcomando `pending`).
pub fn print_pending(records: &[CandidateRecord]) {
    println!("- Encontrados {} alunos sem UF", records.len());
    for record in records {
        println!(
            "  {:>10}  RA {:<14} {} ({})",
            record.internal_id, record.registration_number, record.full_name, record.birth_date
        );
    }
}

/// Imprime o relatório do lote em JSON.
pub fn print_report(report: &BatchReport) {
    println!();
    println!("{}", Style::new().cyan().apply_to("─── Relatório ───"));
    println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
}
