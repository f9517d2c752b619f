// Entry point and terminal front end.
//
// - Option [1] loads (or reloads) the four extracts and prints diagnostics.
// - Option [2] computes the KPIs, prints the cards and detail tables, and
//   exports them to CSV/JSON.
// - Option [3] changes the monthly budget used for the objective.
// With `--batch` the program loads, reports once and exits.
use anyhow::{Context, Result};
use clap::Parser;
use factory_kpi::cache::AggregateCache;
use factory_kpi::config::Cli;
use factory_kpi::schema::RawTables;
use factory_kpi::types::Dataset;
use factory_kpi::util::{format_currency, format_int, parse_f64_safe};
use factory_kpi::{calendar, compute_kpis_cached, loader, logging, output};
use once_cell::sync::Lazy;
use std::io::{self, BufRead, Write};
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info};

// Loaded tables and the aggregate memo live for the whole session so a
// report can be regenerated without re-reading the workbook.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState { raw: None, data: None, cache: AggregateCache::new(), budget: 0.0 })
});

struct AppState {
    raw: Option<RawTables>,
    data: Option<Dataset>,
    cache: AggregateCache,
    budget: f64,
}

fn state() -> MutexGuard<'static, AppState> {
    // A panic while holding the lock leaves plain data behind; keep going.
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One trimmed line from `reader`; `None` once input is closed or unreadable.
fn read_input<R: BufRead>(reader: &mut R) -> Option<String> {
    let mut buf = String::new();
    match reader.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    read_input(&mut io::stdin().lock())
}

/// Ask the user whether to go back to the menu after a report.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N` or
/// closed the input.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Back to menu (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: read the extracts and keep them in `APP_STATE`.
fn handle_load(cli: &Cli) -> Result<()> {
    let source = cli.source()?;
    let (raw, data, report) = loader::load(&source).context("failed to load extracts")?;
    println!(
        "Loaded {} movements, {} operations, {} order lines, {} BOM lines.",
        format_int(report.movement_rows),
        format_int(report.operation_rows),
        format_int(report.sales_rows),
        format_int(report.bom_rows)
    );
    let undated = report.undated_movements + report.undated_sales;
    if undated > 0 {
        println!("Note: {} rows have no readable date and are not counted.", format_int(undated));
    }
    println!();
    let mut st = state();
    st.raw = Some(raw);
    st.data = Some(data);
    Ok(())
}

/// Handle option [2]: compute, print and export the KPIs.
fn handle_report(cli: &Cli) -> Result<()> {
    let today = cli.date.unwrap_or_else(calendar::today);
    let summary = {
        let mut st = state();
        let budget = st.budget;
        let AppState { raw, data, cache, .. } = &mut *st;
        let (Some(raw), Some(data)) = (raw.as_ref(), data.as_ref()) else {
            println!("Error: No data loaded. Please load the extracts first (option 1).\n");
            return Ok(());
        };
        compute_kpis_cached(cache, raw, data, today, budget)
    };
    info!(%today, objective = summary.objective_to_date, "KPI report computed");

    println!("DX Fábrica - Panel de KPI");
    println!("Última actualización: {}", today);
    println!(
        "Objetivo a hoy: {} ({} de {} días hábiles)\n",
        format_currency(summary.objective_to_date),
        summary.business_days_elapsed,
        summary.business_days_month
    );

    println!("Indicadores\n");
    output::preview_table_rows(&output::kpi_cards(&summary), usize::MAX);

    println!("Producción por SKU\n");
    output::preview_table_rows(&output::production_rows(&summary.monthly.production), usize::MAX);

    println!("Ventas por SKU\n");
    output::preview_table_rows(&output::sales_rows(&summary.monthly.sales), usize::MAX);

    output::export_all(&cli.out_dir, &summary)
        .with_context(|| format!("failed to export to {}", cli.out_dir.display()))?;
    println!("(Full tables exported to {})\n", cli.out_dir.display());
    Ok(())
}

/// Handle option [3]: prompt for a new monthly budget.
fn handle_budget() {
    println!("Current monthly budget: {}", format_currency(state().budget));
    let answer = prompt("New monthly budget: ");
    match parse_f64_safe(answer.as_deref()) {
        Some(v) if v >= 0.0 => {
            state().budget = v;
            println!("Monthly budget set to {}\n", format_currency(v));
        }
        _ => println!("Invalid amount; budget unchanged.\n"),
    }
}

fn run_batch(cli: &Cli) -> Result<()> {
    handle_load(cli)?;
    handle_report(cli)
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    cli.validate()?;
    state().budget = cli.budget;

    if cli.batch {
        return run_batch(&cli);
    }

    loop {
        println!("DX Fábrica - KPI");
        println!("[1] Load the extracts");
        println!("[2] Generate KPI report");
        println!("[3] Change monthly budget\n");
        let Some(choice) = prompt("Enter choice: ") else {
            println!("\nInput closed. Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Err(e) = handle_load(&cli) {
                    error!("{:#}", e);
                    eprintln!("Failed to load: {:#}\n", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_report(&cli) {
                    error!("{:#}", e);
                    eprintln!("Report error: {:#}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_budget(),
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
    Ok(())
}
