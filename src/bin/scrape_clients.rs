use clap::Parser;
use shelf_audit::app::pipelines::clients_pipeline::ClientScrapePipeline;
use shelf_audit::domain::ports::ConfigProvider;
use shelf_audit::utils::{logger, validation::Validate};
use shelf_audit::{AuditConfig, AuditEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "scrape_clients")]
#[command(about = "Scrape saved listing pages into clients.json and clients.csv")]
struct Args {
    /// Path to the audit configuration file
    #[arg(short, long, default_value = "audit.toml")]
    config: String,

    /// Directory containing the saved p*.html pages (overrides the config)
    #[arg(short, long)]
    input_dir: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log system resource usage per phase
    #[arg(long)]
    monitor: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Scraping client listing pages");

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

    let input_dir = args
        .input_dir
        .clone()
        .unwrap_or_else(|| config.clients_input_dir().to_string());
    let json_output = format!("{}/{}", config.output_path(), config.clients_json_output());
    let csv_output = format!("{}/{}", config.output_path(), config.clients_csv_output());
    let page_prefix = config.clients_page_prefix().to_string();

    let storage = LocalStorage::new(".".to_string());
    let pipeline = ClientScrapePipeline::new(
        storage,
        config,
        input_dir,
        page_prefix,
        json_output,
        csv_output,
    );
    let engine = AuditEngine::new_with_monitoring(pipeline, args.monitor);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Scrape complete!");
            println!("✅ Scrape complete! Clients saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Scrape failed: {} (Category: {:?}, Severity: {:?})",
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
