use clap::Parser;
use shelf_audit::app::pipelines::check_pipeline::RepoCheckPipeline;
use shelf_audit::domain::ports::ConfigProvider;
use shelf_audit::utils::{logger, validation::Validate};
use shelf_audit::{AuditConfig, AuditEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "check_repos")]
#[command(about = "Probe repository pages directly and try alternative names for 404s")]
struct Args {
    /// Path to the audit configuration file
    #[arg(short, long, default_value = "audit.toml")]
    config: String,

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

    tracing::info!("🚀 Checking repository URLs directly");

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

    let targets = config.research_targets().to_vec();
    if targets.is_empty() {
        eprintln!("❌ No repository targets configured; add [[research.targets]] entries");
        std::process::exit(1);
    }
    tracing::info!("Checking {} repositories...", targets.len());

    let output = format!("{}/{}", config.output_path(), config.check_output());
    let storage = LocalStorage::new(".".to_string());
    let pipeline = RepoCheckPipeline::new(storage, config, targets, output)?;
    let engine = AuditEngine::new_with_monitoring(pipeline, args.monitor);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ URL check complete!");
            println!("✅ URL check complete! Results saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ URL check failed: {} (Category: {:?}, Severity: {:?})",
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
