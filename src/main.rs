// Entry point and high-level terminal flow.
//
// The dashboard is a menu loop:
// - Option [1] compares two months across areas and draws the chart.
// - Options [2]-[4] export the last comparison or the complete base.
// - Option [5] opens the password-gated editing menu (manual save and
//   spreadsheet import).
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Datelike, Local};
use tracing::{error, info};

use treinamentos::chart::ChartLayout;
use treinamentos::comparison::{self, AreaFilter, ALL_AREAS};
use treinamentos::config::{AppConfig, StoreBackend};
use treinamentos::export::{self, pdf, xlsx};
use treinamentos::importer;
use treinamentos::loader;
use treinamentos::output;
use treinamentos::session::{EditSession, GateOutcome};
use treinamentos::store::{RecordStore, Records, RestStore, SqliteStore};
use treinamentos::types::{ComparisonTable, Month};
use treinamentos::util::format_int;
use treinamentos::{logging, AppError, Result};

/// Everything one dashboard session owns. The editing flag lives here and
/// nowhere else, so it ends with the session.
struct App<S> {
    records: Records<S>,
    config: AppConfig,
    session: EditSession,
    last: Option<ComparisonTable>,
}

/// Next trimmed line, or `None` once the input is closed.
fn read_trimmed(reader: &mut impl BufRead) -> Option<String> {
    let mut buf = String::new();
    match reader.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Read a single line of input after printing `label`.
fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    let _ = io::stdout().flush();
    read_trimmed(&mut io::stdin().lock())
}

fn read_choice() -> Option<String> {
    prompt("Escolha: ")
}

/// Ask for a month by number or name; blank input keeps `default`.
fn prompt_month(label: &str, default: Month) -> Option<Month> {
    for (i, m) in Month::ALL.iter().enumerate() {
        print!("[{:>2}] {:<10}", i + 1, m.display_name());
        if i % 4 == 3 {
            println!();
        }
    }
    loop {
        let input = prompt(&format!("{label} [{}]: ", default.display_name()))?;
        if input.is_empty() {
            return Some(default);
        }
        let parsed = input
            .parse::<u32>()
            .ok()
            .and_then(Month::from_number)
            .or_else(|| Month::parse(&input));
        match parsed {
            Some(m) => return Some(m),
            None => println!("Mês inválido. Informe 1-12 ou o nome do mês."),
        }
    }
}

/// Ask for an area from the stored list; `0`/blank means all areas unless
/// `allow_all` is false, and any other text is taken as a new area name.
fn prompt_area(areas: &[String], allow_all: bool) -> Option<String> {
    if allow_all {
        println!("[ 0] {ALL_AREAS}");
    }
    for (i, a) in areas.iter().enumerate() {
        println!("[{:>2}] {a}", i + 1);
    }
    loop {
        let input = prompt("Área: ")?;
        if input.is_empty() || input == "0" {
            if allow_all {
                return Some(ALL_AREAS.to_string());
            }
            println!("Informe uma área.");
            continue;
        }
        if let Ok(n) = input.parse::<usize>() {
            match n.checked_sub(1).and_then(|i| areas.get(i)) {
                Some(area) => return Some(area.clone()),
                None => {
                    println!("Número fora da lista.");
                    continue;
                }
            }
        }
        return Some(input);
    }
}

fn prompt_count(label: &str) -> Option<u32> {
    loop {
        let input = prompt(label)?;
        if input.is_empty() {
            return Some(0);
        }
        match input.parse::<u32>() {
            Ok(v) => return Some(v),
            Err(_) => println!("Informe um número inteiro não negativo."),
        }
    }
}

fn default_months() -> (Month, Month) {
    let current = Month::from_number(Local::now().month()).unwrap_or(Month::Junho);
    let previous = Month::from_number(current.number().saturating_sub(1)).unwrap_or(Month::Dezembro);
    (previous, current)
}

fn output_path(config: &AppConfig, file_name: &str) -> PathBuf {
    config.export.output_dir.join(file_name)
}

impl<S: RecordStore> App<S> {
    fn new(records: Records<S>, config: AppConfig) -> Self {
        Self {
            records,
            config,
            session: EditSession::new(),
            last: None,
        }
    }

    fn distinct_areas(&self) -> Result<Vec<String>> {
        Ok(self.records.fetch_distinct_areas()?.into_iter().collect())
    }

    /// Handle option [1]: pick two months and an area, then print the
    /// comparison table, month totals and write the chart as SVG.
    fn handle_compare(&mut self) -> Result<()> {
        let (def_a, def_b) = default_months();
        let Some(month_a) = prompt_month("Escolha o 1º mês", def_a) else {
            return Ok(());
        };
        let Some(month_b) = prompt_month("Escolha o 2º mês", def_b) else {
            return Ok(());
        };
        if month_a == month_b {
            println!("Selecione dois meses diferentes.\n");
            return Ok(());
        }
        let areas = self.distinct_areas()?;
        let Some(area) = prompt_area(&areas, true) else {
            return Ok(());
        };
        let area = AreaFilter::parse(&area);

        let all = self.records.fetch_all()?;
        let result = comparison::build_comparison(all.as_slice(), month_a, month_b, &area)?;
        if let Some(reason) = result.no_data {
            println!("{}\n", reason.message());
            self.last = None;
            return Ok(());
        }

        println!();
        output::preview_pivot(&result.table);
        output::preview_table_rows(&comparison::summarize(&result.table), 2);

        let svg = ChartLayout::from_table(&result.table)?.to_svg()?;
        let svg_path = output_path(&self.config, "grafico_comparativo.svg");
        export::write_file(&svg_path, svg.as_bytes())?;
        println!("Gráfico comparativo salvo em {}\n", svg_path.display());

        self.last = Some(result);
        Ok(())
    }

    fn last_comparison(&self) -> Option<&ComparisonTable> {
        let last = self.last.as_ref();
        if last.is_none() {
            println!("Faça uma comparação primeiro (opção 1).\n");
        }
        last
    }

    /// Handle option [2]: comparison rows to CSV and month totals to JSON.
    fn handle_export_csv(&self) -> Result<()> {
        let Some(result) = self.last_comparison() else {
            return Ok(());
        };
        let csv_path = output_path(&self.config, "comparacao.csv");
        let json_path = output_path(&self.config, "resumo.json");
        std::fs::create_dir_all(&self.config.export.output_dir)?;
        output::write_pivot_csv(&csv_path, &result.table)?;
        output::write_json(&json_path, &comparison::summarize(&result.table))?;
        println!("Arquivos salvos: {} e {}\n", csv_path.display(), json_path.display());
        Ok(())
    }

    /// Handle option [3]: the complete base (every month present) as xlsx,
    /// with the last comparison chart embedded when there is one.
    fn handle_export_xlsx(&self) -> Result<()> {
        let all = self.records.fetch_all()?;
        if all.is_empty() {
            println!("Nenhum dado encontrado na tabela 'treinamentos'.\n");
            return Ok(());
        }
        let base = comparison::build_full_table(all.as_slice());
        let png = match &self.last {
            Some(result) => Some(
                ChartLayout::from_table(&result.table)?
                    .to_raster()?
                    .to_png()?,
            ),
            None => None,
        };
        let bytes = xlsx::render_workbook(&base, png.as_deref())?;
        let path = output_path(&self.config, "treinamentos_completo.xlsx");
        export::write_file(&path, &bytes)?;
        println!(
            "Excel completo salvo em {} ({} áreas, {} meses)\n",
            path.display(),
            format_int(base.rows.len() as u64),
            base.months.len()
        );
        Ok(())
    }

    /// Handle option [4]: the last comparison and its chart as a PDF.
    fn handle_export_pdf(&self) -> Result<()> {
        let Some(result) = self.last_comparison() else {
            return Ok(());
        };
        let raster = ChartLayout::from_table(&result.table)?.to_raster()?;
        let subtitle = format!("Gerado em {}", Local::now().format("%d/%m/%Y %H:%M"));
        let bytes = pdf::render_document(
            &result.table,
            &self.config.export.title,
            &subtitle,
            Some(&raster),
        )?;
        let path = output_path(&self.config, "treinamentos_comparacao.pdf");
        export::write_file(&path, &bytes)?;
        println!("PDF salvo em {}\n", path.display());
        Ok(())
    }

    /// Handle option [5]: unlock with the shared secret, then loop over the
    /// editing actions until the user goes back or closes the session.
    fn handle_edit(&mut self) -> Result<()> {
        if !self.session.is_authorized() {
            let Some(attempt) = prompt("Senha de edição: ") else {
                return Ok(());
            };
            match self
                .session
                .unlock(&attempt, self.config.edit_secret.as_deref())
            {
                GateOutcome::Granted => println!("Acesso liberado\n"),
                GateOutcome::Denied => {
                    println!("Senha incorreta\n");
                    return Ok(());
                }
                GateOutcome::Blank => return Ok(()),
                GateOutcome::Disabled => {
                    println!("Edição desabilitada: defina SENHA_EDICAO.\n");
                    return Ok(());
                }
            }
        }

        loop {
            println!("Editar dados (restrito)");
            println!("[1] Salvar dados manualmente");
            println!("[2] Importar planilha (.xlsx/.csv)");
            println!("[3] Encerrar sessão de edição");
            println!("[0] Voltar\n");
            let Some(choice) = read_choice() else {
                return Ok(());
            };
            let outcome = match choice.as_str() {
                "1" => self.handle_manual_save(),
                "2" => self.handle_import(),
                "3" => {
                    self.session.logout();
                    println!("Sessão de edição encerrada.\n");
                    return Ok(());
                }
                "0" => return Ok(()),
                _ => {
                    println!("Opção inválida.\n");
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                report(&e);
            }
        }
    }

    fn handle_manual_save(&mut self) -> Result<()> {
        let Some(month) = prompt_month("Mês para editar", default_months().1) else {
            return Ok(());
        };
        let areas = self.distinct_areas()?;
        let Some(area) = prompt_area(&areas, false) else {
            return Ok(());
        };
        let (Some(on_time), Some(overdue)) = (prompt_count("Em dia: "), prompt_count("Vencido: "))
        else {
            return Ok(());
        };
        self.records
            .upsert_record(&area, &month.storage_name(), on_time, overdue)?;
        println!("Dados atualizados com sucesso!\n");
        Ok(())
    }

    fn handle_import(&mut self) -> Result<()> {
        let Some(path) = prompt("Caminho do arquivo: ") else {
            return Ok(());
        };
        if path.is_empty() {
            return Ok(());
        }
        let raw = loader::load_raw_table(&path)?;
        let imported = importer::import_wide_table(&raw)?;
        if imported.is_empty() {
            println!("Nenhuma coluna '<mês> em dia' / '<mês> vencido' encontrada.\n");
            return Ok(());
        }
        let summary = importer::apply_import(&mut self.records, &imported)?;
        println!(
            "Dados importados e aplicados com sucesso! ({} novos, {} atualizados)\n",
            format_int(summary.inserted as u64),
            format_int(summary.updated as u64)
        );
        Ok(())
    }
}

fn report(e: &AppError) {
    error!("{e}");
    match e {
        AppError::Comparison(_) | AppError::Import(_) => {
            println!("{e}\n")
        }
        _ => println!("Erro: {e}\n"),
    }
}

fn run<S: RecordStore>(mut app: App<S>) {
    loop {
        println!("{}", app.config.export.title);
        println!("[1] Comparar meses");
        println!("[2] Exportar comparação (CSV + resumo JSON)");
        println!("[3] Baixar Excel completo");
        println!("[4] Baixar PDF");
        println!("[5] Editar dados (restrito)");
        println!("[0] Sair\n");
        let Some(choice) = read_choice() else {
            println!("Encerrando.");
            break;
        };
        let outcome = match choice.as_str() {
            "1" => app.handle_compare(),
            "2" => app.handle_export_csv(),
            "3" => app.handle_export_xlsx(),
            "4" => app.handle_export_pdf(),
            "5" => app.handle_edit(),
            "0" => {
                println!("Encerrando.");
                break;
            }
            _ => {
                println!("Opção inválida. Informe 0 a 5.\n");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            report(&e);
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = logging::init() {
        eprintln!("{e}");
    }
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Erro de configuração: {e}");
            return ExitCode::FAILURE;
        }
    };

    match config.store.backend {
        StoreBackend::Rest => {
            let store = RestStore::new(
                config.store.url.as_deref().unwrap_or_default(),
                config.store.key.as_deref().unwrap_or_default(),
                &config.store.table,
            );
            info!(url = %store.table_url(), "Using REST record store");
            run(App::new(Records::new(store), config));
        }
        StoreBackend::Sqlite => match SqliteStore::open(&config.store.path) {
            Ok(store) => {
                info!(path = %config.store.path.display(), "Using SQLite record store");
                run(App::new(Records::new(store), config));
            }
            Err(e) => {
                eprintln!("Falha ao abrir o banco: {e}");
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_trimmed_stops_at_end_of_input() {
        let mut input = io::Cursor::new(" 1 \n\n");
        assert_eq!(read_trimmed(&mut input).as_deref(), Some("1"));
        assert_eq!(read_trimmed(&mut input).as_deref(), Some(""));
        assert_eq!(read_trimmed(&mut input), None);
        assert_eq!(read_trimmed(&mut input), None);
    }
}
