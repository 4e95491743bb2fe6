use clap::Parser;
use shelf_audit::app::pipelines::fixup_pipeline::SiteUrlFixupPipeline;
use shelf_audit::domain::ports::ConfigProvider;
use shelf_audit::utils::{logger, validation::Validate};
use shelf_audit::{AuditConfig, AuditEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "fix_site_urls")]
#[command(about = "Rewrite broken github_url entries in a site source file")]
struct Args {
    /// Path to the audit configuration file
    #[arg(short, long, default_value = "audit.toml")]
    config: String,

    /// Site source file to rewrite (overrides the config)
    #[arg(short, long)]
    site_file: Option<String>,

    /// Replacement mapping JSON (defaults to the configured final output)
    #[arg(short, long)]
    replacements: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Fixing site GitHub URLs");

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

    let site_file = args
        .site_file
        .clone()
        .or_else(|| config.fixup.as_ref().map(|f| f.site_file.clone()));
    let Some(site_file) = site_file else {
        eprintln!("❌ No site file configured; add a [fixup] section or pass --site-file");
        std::process::exit(1);
    };

    let replacements = args.replacements.clone().unwrap_or_else(|| {
        format!("{}/{}", config.output_path(), config.final_output())
    });
    let report_output = format!("{}/{}", config.output_path(), config.fixup_report_output());

    let storage = LocalStorage::new(".".to_string());
    let pipeline = SiteUrlFixupPipeline::new(storage, site_file, replacements, report_output);
    let engine = AuditEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ URL fixes applied!");
            println!("✅ URL fixes applied! Report saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ URL fixing failed: {} (Category: {:?}, Severity: {:?})",
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
