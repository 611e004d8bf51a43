// Entry point and high-level CLI flow.
//
// - Option [1] loads and cleans the viewing CSV, printing diagnostics.
// - Option [2] builds every grouped report, writes them to the output
//   directory and prints previews.
// - After generating reports, the user can go back to the menu or exit.
// `--batch` runs both steps once without the menu.
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use viewing_report::aggregator::analyze;
use viewing_report::config::{AnalysisConfig, Cli};
use viewing_report::normalizer::Normalized;
use viewing_report::{loader, logging, output, util};

// Loaded once, reused for every report generation in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<Normalized>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// Returns `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and clean the CSV file.
fn handle_load(cli: &Cli) -> bool {
    match loader::load_and_clean(&cli.input) {
        Ok(normalized) => {
            let report = &normalized.report;
            println!(
                "Processing dataset... ({} rows loaded, {} sessions retained)",
                util::format_int(report.total_rows),
                util::format_int(report.retained)
            );
            println!(
                "Note: {} rows dropped for missing values, {} for unparsable values, {} duplicates removed.",
                util::format_int(report.missing_values),
                util::format_int(report.unparsable()),
                util::format_int(report.duplicates_removed)
            );
            println!();
            let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
            state.data = Some(normalized);
            true
        }
        Err(e) => {
            tracing::error!("Failed to load {}: {}", cli.input.display(), e);
            eprintln!("Failed to load file: {}\n", e);
            false
        }
    }
}

/// Handle option [2]: build, export and preview every report.
fn handle_generate_reports(cli: &Cli, config: &AnalysisConfig) {
    let data = {
        let state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
        state.data.clone()
    };
    let Some(Normalized { table, report }) = data else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };

    println!("Generating reports...\n");
    let analysis = match analyze(&table, &report, config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Analysis error: {}", e);
            return;
        }
    };

    output::print_previews(&analysis, cli.preview_rows);

    match output::write_all(&cli.output_dir, &table, &analysis) {
        Ok(paths) => println!(
            "({} files exported to {})\n",
            paths.len(),
            cli.output_dir.display()
        ),
        Err(e) => eprintln!("Write error: {}", e),
    }

    let summary = &analysis.summary;
    println!("Summary Stats ({}):", output::SUMMARY_FILE);
    println!(
        "{{\"total_sessions\": {}, \"total_duration\": {}, \"avg_duration\": {}}}\n",
        util::format_int(summary.total_sessions),
        util::format_number(summary.total_duration, 2),
        util::format_number(summary.avg_duration, 2)
    );
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(&cli.log_level)?;
    let config = cli.analysis_config()?;

    tracing::info!("viewing_report v{} starting", env!("CARGO_PKG_VERSION"));

    if cli.batch {
        if !handle_load(&cli) {
            anyhow::bail!("could not load {}", cli.input.display());
        }
        handle_generate_reports(&cli, &config);
        return Ok(());
    }

    loop {
        println!("Viewing Session Reports:");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            break;
        };
        match choice.as_str() {
            "1" => {
                handle_load(&cli);
            }
            "2" => {
                println!();
                handle_generate_reports(&cli, &config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
    Ok(())
}
