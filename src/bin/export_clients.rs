use clap::Parser;
use shelf_audit::app::pipelines::clients_pipeline::ClientExportPipeline;
use shelf_audit::domain::ports::ConfigProvider;
use shelf_audit::utils::{logger, validation::Validate};
use shelf_audit::{AuditConfig, AuditEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "export_clients")]
#[command(about = "Convert clients.json into a CSV export")]
struct Args {
    /// clients.json to convert (defaults to the configured scrape output)
    input: Option<String>,

    /// Path to the audit configuration file
    #[arg(short, long, default_value = "audit.toml")]
    config: String,

    /// Destination CSV (defaults next to the input)
    #[arg(short, long)]
    output: Option<String>,

    /// Keep only entries tagged type = "client"
    #[arg(long)]
    only_clients: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Exporting clients to CSV");

    let config = match AuditConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 See configs/audit-example.toml for the expected format");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let input = args.input.clone().unwrap_or_else(|| {
        format!("{}/{}", config.output_path(), config.clients_json_output())
    });
    let output = args.output.clone().unwrap_or_else(|| {
        format!("{}/{}", config.output_path(), config.clients_csv_output())
    });
    let only_clients = args.only_clients || config.only_clients();

    let storage = LocalStorage::new(".".to_string());
    let pipeline = ClientExportPipeline::new(storage, input, output, only_clients);
    let engine = AuditEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Export complete!");
            println!("✅ Export complete! CSV saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                shelf_audit::utils::error::ErrorSeverity::Low => 0,
                shelf_audit::utils::error::ErrorSeverity::Medium => 2,
                shelf_audit::utils::error::ErrorSeverity::High => 1,
                shelf_audit::utils::error::ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
