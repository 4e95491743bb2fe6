use clap::Parser;
use shelf_audit::app::pipelines::finalize_pipeline::FinalReplacementsPipeline;
use shelf_audit::app::pipelines::research_pipeline::ReplacementResearchPipeline;
use shelf_audit::domain::ports::ConfigProvider;
use shelf_audit::utils::{logger, validation::Validate};
use shelf_audit::{AuditConfig, AuditEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "research_repos")]
#[command(about = "Check configured repositories against the GitHub API and rank replacements")]
struct Args {
    /// Path to the audit configuration file
    #[arg(short, long, default_value = "audit.toml")]
    config: String,

    /// Also derive the final replacement mapping after researching
    #[arg(long)]
    finalize: bool,

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

    tracing::info!("🚀 Researching repository replacements");

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
    tracing::info!("Researching {} repositories...", targets.len());

    let research_output = format!("{}/{}", config.output_path(), config.research_output());
    let final_output = format!("{}/{}", config.output_path(), config.final_output());

    let research = ReplacementResearchPipeline::new(
        LocalStorage::new(".".to_string()),
        config.clone(),
        targets,
        config.official_orgs(),
        config.search_count(),
        config.replacement_limit(),
        config.recent_days(),
        research_output.clone(),
    )?;
    let engine = AuditEngine::new_with_monitoring(research, args.monitor);

    if let Err(e) = run_and_report(&engine).await {
        std::process::exit(e);
    }

    if args.finalize {
        tracing::info!("📋 Deriving final replacement mapping");
        let finalize = FinalReplacementsPipeline::new(
            LocalStorage::new(".".to_string()),
            config.clone(),
            research_output,
            final_output,
            config.official_orgs(),
            config.official_mono_repo().to_string(),
        )?;
        let engine = AuditEngine::new_with_monitoring(finalize, args.monitor);

        if let Err(e) = run_and_report(&engine).await {
            std::process::exit(e);
        }
    }

    Ok(())
}

/// Runs one engine; returns the exit code to use on failure.
async fn run_and_report<P: shelf_audit::domain::ports::Pipeline>(
    engine: &AuditEngine<P>,
) -> Result<(), i32> {
    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Saved to: {}", output_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Research failed: {} (Category: {:?}, Severity: {:?})",
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
                Err(exit_code)
            } else {
                Ok(())
            }
        }
    }
}
