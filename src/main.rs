use chrono::Local;
use dotenvy::dotenv;
use family_finance::{
    config,
    core::{analysis, kpi, monthly, report, snapshot},
    errors::Result,
    store::Ledger,
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Load the snapshot; a path on the command line wins
    let snapshot_path = env::args_os()
        .nth(1)
        .map_or_else(|| config::get_snapshot_path(&app_config), Into::into);
    let mut ledger = Ledger::new(app_config.ledger_settings());
    if snapshot_path.exists() {
        snapshot::import_file(&mut ledger, &snapshot_path)
            .await
            .inspect_err(|e| error!("Failed to import {}: {}", snapshot_path.display(), e))?;
    } else {
        info!(
            "No snapshot at {}, starting from an empty ledger",
            snapshot_path.display()
        );
    }

    // 5. Compute and print the dashboard
    let today = Local::now().date_naive();
    let window = app_config.window(today)?;
    let kpis = kpi::compute_kpis(&ledger, window.as_ref(), today);
    let totals = kpi::compute_source_totals(&ledger, window.as_ref());
    let analyses = analysis::analyze(&ledger, window.as_ref());
    let gauges = monthly::monthly_gauges(&ledger);

    println!(
        "{}",
        report::format_dashboard(
            &kpis,
            &totals,
            Some(&analyses),
            gauges.as_ref(),
            &app_config.currency,
        )
    );

    Ok(())
}
