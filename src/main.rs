//! Network Speed Tester - Main CLI Application

use clap::Parser;
use network_speed_tester::{
    cli::Cli,
    config::{load_config, Config},
    engine::SpeedTestSession,
    error::{AppError, Result},
    geo::LocationDetector,
    models::HistoryStore,
    output::{export, ConsoleReporter},
    registry::EndpointRegistry,
    HttpProber, PKG_NAME, VERSION,
};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    // Load .env before clap resolves env-backed arguments
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(true));
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        println!("{} v{}", PKG_NAME, VERSION);
        println!("Debug mode enabled");
        println!();
    }

    let config = load_config(cli)?;

    if config.debug {
        println!("Configuration loaded successfully:");
        println!("  Server: {:?}", config.choice);
        println!("  Plan: {:?}", config.plan);
        println!("  Latency probes: {}", config.settings.latency_probes);
        println!("  Download budget: {}s x {} streams",
            config.settings.download_duration.as_secs(),
            config.settings.download_streams);
        println!("  Upload budget: {}s", config.settings.upload_duration.as_secs());
        println!("  History file: {}", config.history_file.display());
        println!();
    }

    let registry = EndpointRegistry::builtin();

    if config.list_servers {
        println!("Available servers:");
        for endpoint in registry.iter() {
            println!("  {:<16} {} ({})", endpoint.key, endpoint.display_name, endpoint.location);
        }
        return Ok(());
    }

    let reporter = ConsoleReporter::new(config.enable_color, config.verbose);
    let prober = Arc::new(HttpProber::new()?);
    let store = HistoryStore::new(&config.history_file);
    let history = store.load()?;

    let mut session =
        SpeedTestSession::new(registry, prober, config.settings).with_history(history);

    if config.survey {
        println!("Testing all international servers...");
        let ranking = session.survey(&reporter).await;
        println!();
        print!("{}", reporter.survey_table(&ranking));
        return Ok(());
    }

    if !config.export_only {
        if config.detect_location {
            let detector = LocationDetector::new()?;
            session.set_client_info(detector.detect().await);
        }

        let record = session
            .run(config.choice.clone(), config.plan, &reporter)
            .await?;

        println!();
        print!("{}", reporter.summary(&record));

        if config.save_history {
            store.save(session.history())?;
            if config.verbose {
                println!();
                println!(
                    "Saved {} result(s) to {}",
                    session.history().len(),
                    store.path().display()
                );
            }
        }
    }

    write_exports(&config, &session)?;

    Ok(())
}

/// Write any requested export files from the session's accumulated history
fn write_exports(config: &Config, session: &SpeedTestSession) -> Result<()> {
    let history = session.history();

    if let Some(path) = &config.export_csv {
        export::write_export(path, &export::to_csv(history)?)?;
        println!("CSV export written to {}", path.display());
    }

    if let Some(path) = &config.export_json {
        export::write_export(path, &export::to_json(history)?)?;
        println!("JSON export written to {}", path.display());
    }

    if let Some(path) = &config.report {
        export::write_export(path, &export::to_text_report(history)?)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Run with --list-servers to see valid server keys");
            eprintln!("  - Check flag values (--count, --streams, durations must be positive)");
        }
        AppError::Network(_) | AppError::HttpRequest(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Try a different server with --server");
            eprintln!("  - Run --survey to see which endpoints are reachable");
        }
        AppError::TestExecution(_) => {
            eprintln!();
            eprintln!("Execution troubleshooting:");
            eprintln!("  - This may be a temporary issue; try running the test again");
            eprintln!("  - Run --survey to check endpoint reachability");
        }
        AppError::Export(_) => {
            eprintln!();
            eprintln!("Export help:");
            eprintln!("  - Run a test first so there is history to export");
        }
        _ => {}
    }
}
