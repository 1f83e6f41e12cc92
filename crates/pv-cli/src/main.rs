//! Solar park inspection CLI

use clap::{Parser, Subcommand};
use pv_core::export::{write_bundle, write_file, Exporter};
use pv_core::intake::LegacyInspectionForm;
use pv_core::report::{self, DashboardReport, ReportFormat};
use pv_core::{CoreResult, DataStore, MemoryStore, PvConfig, Snapshot};
use std::path::PathBuf;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pv-inspect")]
#[command(about = "Solar park inspection dashboard and CSV export")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON snapshot to read parks, panels and findings from
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fleet status summary
    Summary {
        /// Only count panels of this park
        #[arg(short, long)]
        park: Option<i64>,

        /// Print the dashboard as JSON
        #[arg(long)]
        json: bool,
    },

    /// Panel table with effective status and diagnostic
    Panels {
        #[arg(short, long)]
        park: Option<i64>,
    },

    /// Write CSV exports
    Export {
        /// What to export (panels, inspections, all)
        #[arg(short, long, default_value = "all")]
        entity: String,

        /// Output directory (defaults to PV_EXPORT_DIR or ./exports)
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[arg(short, long)]
        park: Option<i64>,
    },

    /// Classify a single legacy inspection reading
    Classify {
        /// Hotspot temperature in ºC
        #[arg(long)]
        hotspot: String,

        /// Whether the mounting is secure
        #[arg(long)]
        mount_ok: Option<bool>,

        /// Cleanliness level (Alta, Media, Baja)
        #[arg(long)]
        cleanliness: Option<String>,
    },

    /// List parks
    Parks,

    /// List the defect catalog
    Defects,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let mut config = match PvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(path) = cli.snapshot {
        config.snapshot_path = path;
    }

    match cli.command {
        Commands::Summary { park, json } => cmd_summary(&config, park, json).await,
        Commands::Panels { park } => cmd_panels(&config, park).await,
        Commands::Export { entity, out, park } => cmd_export(&config, &entity, out, park).await,
        Commands::Classify {
            hotspot,
            mount_ok,
            cleanliness,
        } => cmd_classify(hotspot, mount_ok, cleanliness),
        Commands::Parks => cmd_parks(&config).await,
        Commands::Defects => cmd_defects(&config).await,
    }
}

fn open_store(config: &PvConfig) -> MemoryStore {
    debug!("Loading snapshot: {}", config.snapshot_path.display());
    match MemoryStore::load(&config.snapshot_path) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to load {}: {}", config.snapshot_path.display(), e);
            std::process::exit(1);
        }
    }
}

async fn load_snapshot(config: &PvConfig, park: Option<i64>) -> Snapshot {
    let store = open_store(config);
    match Snapshot::fetch(&store, park.or(config.park)).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to read panels: {}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_summary(config: &PvConfig, park: Option<i64>, json: bool) {
    let park = park.or(config.park);
    let snapshot = load_snapshot(config, park).await;
    info!("Summarizing {} panels", snapshot.panels.len());

    let format = if json { ReportFormat::Json } else { ReportFormat::Text };
    match report::generate_report(&snapshot, park, format) {
        Ok(content) => println!("{}", content),
        Err(e) => {
            error!("Failed to generate report: {}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_panels(config: &PvConfig, park: Option<i64>) {
    let snapshot = load_snapshot(config, park).await;
    let report = DashboardReport::build(&snapshot, park.or(config.park));

    if report.panels.is_empty() {
        println!("No hay paneles registrados.");
        return;
    }

    println!(
        "\n{:<8} {:<20} {:<24} {:<10} {:<28} {}",
        "Panel", "Serie", "Modelo", "Estado", "Diagnóstico", "Acción"
    );
    println!("{}", "-".repeat(110));
    for line in &report.panels {
        println!(
            "{:<8} {:<20} {:<24} {:<10} {:<28} {}",
            line.label, line.serial_number, line.model, line.status, line.diagnostic_text, line.action
        );
    }
}

async fn cmd_export(config: &PvConfig, entity: &str, out: Option<PathBuf>, park: Option<i64>) {
    let snapshot = load_snapshot(config, park).await;
    let dir = out.unwrap_or_else(|| config.export_dir.clone());
    let exporter = Exporter::new(&config.date_format);
    let today = chrono::Local::now().date_naive();

    let written: CoreResult<Vec<PathBuf>> = match entity.to_lowercase().as_str() {
        "panels" | "paneles" => {
            write_file(&exporter.panels(&snapshot.panels, today), &dir).map(|p| vec![p])
        }
        "inspections" | "inspecciones" => {
            write_file(&exporter.inspections(&snapshot.panels, today), &dir).map(|p| vec![p])
        }
        "all" => write_bundle(&snapshot.export(&exporter, today), &dir),
        other => {
            error!("Unknown export entity '{}' (expected panels, inspections or all)", other);
            std::process::exit(1);
        }
    };

    match written {
        Ok(paths) => {
            for path in paths {
                println!("{}", path.display());
            }
        }
        Err(e) => {
            error!("Export failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_classify(hotspot: String, mount_ok: Option<bool>, cleanliness: Option<String>) {
    let mut form = LegacyInspectionForm::new(0);
    form.hotspot_c = hotspot;
    form.mount_ok = mount_ok.or(form.mount_ok);
    if let Some(cleanliness) = cleanliness {
        form.cleanliness = cleanliness;
    }

    match form.validate() {
        Ok(submission) => {
            let reading = &submission.reading;
            println!("\nLegacy Classification\n{}", "=".repeat(50));
            if let Some(t) = reading.hotspot_c {
                println!("Hotspot:     {} ºC", t);
            }
            if let Some(ok) = reading.mount_ok {
                println!("Mount OK:    {}", if ok { "Sí" } else { "No" });
            }
            if let Some(c) = reading.cleanliness {
                println!("Cleanliness: {}", c);
            }
            println!("Status:      {}", submission.status);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_parks(config: &PvConfig) {
    let store = open_store(config);
    match store.fetch_parks().await {
        Ok(parks) => {
            println!("\nParques\n{}", "=".repeat(50));
            for park in parks {
                println!(
                    "  #{:<4} {} ({}, {} MWp)",
                    park.id, park.client_name, park.location, park.capacity_mwp
                );
            }
        }
        Err(e) => {
            error!("Failed to read parks: {}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_defects(config: &PvConfig) {
    let store = open_store(config);
    match store.fetch_defect_types().await {
        Ok(defects) => {
            println!("\nCatálogo de Defectos\n{}", "=".repeat(50));
            for defect in defects {
                println!(
                    "  #{:<4} {:<24} {:<14} {}",
                    defect.id,
                    defect.name,
                    defect.category.label(),
                    defect.suggested_severity
                );
            }
        }
        Err(e) => {
            error!("Failed to read defect catalog: {}", e);
            std::process::exit(1);
        }
    }
}
