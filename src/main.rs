use clap::Parser;
use shelf_audit::app::pipelines::clients_pipeline::{ClientExportPipeline, ClientScrapePipeline};
use shelf_audit::app::pipelines::finalize_pipeline::FinalReplacementsPipeline;
use shelf_audit::app::pipelines::fixup_pipeline::SiteUrlFixupPipeline;
use shelf_audit::app::pipelines::report_pipeline::LinkReportPipeline;
use shelf_audit::app::pipelines::research_pipeline::ReplacementResearchPipeline;
use shelf_audit::core::sequence::{PipelineSequence, SequencedPipeline};
use shelf_audit::domain::ports::ConfigProvider;
use shelf_audit::utils::{logger, validation::Validate};
use shelf_audit::{AuditConfig, LocalStorage};

#[derive(Parser)]
#[command(name = "shelf-audit")]
#[command(about = "Link audit toolkit for the MCP Shelf directory")]
struct Args {
    /// Path to the audit configuration file
    #[arg(short, long, default_value = "configs/audit-example.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON logs instead of the compact console format
    #[arg(long)]
    log_json: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Show the execution plan without running anything
    #[arg(long)]
    dry_run: bool,

    /// Execution ID for this run
    #[arg(long)]
    execution_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting MCP Shelf link audit");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match AuditConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    let execution_id = args
        .execution_id
        .clone()
        .unwrap_or_else(|| format!("audit_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")));

    display_audit_summary(&config, &execution_id);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let mut sequence = PipelineSequence::new(execution_id).with_monitoring(monitor_enabled);
    let out = |name: &str| format!("{}/{}", config.output_path(), name);

    if let Some(report) = &config.report {
        let pipeline = LinkReportPipeline::new(
            LocalStorage::new(".".to_string()),
            config.clone(),
            report.input.clone(),
            out(config.report_output()),
        );
        sequence.add_pipeline(Box::new(SequencedPipeline::new("analyze", pipeline)));
    }

    if config.clients.is_some() {
        let scrape = ClientScrapePipeline::new(
            LocalStorage::new(".".to_string()),
            config.clone(),
            config.clients_input_dir().to_string(),
            config.clients_page_prefix().to_string(),
            out(config.clients_json_output()),
            out(config.clients_csv_output()),
        );
        sequence.add_pipeline(Box::new(SequencedPipeline::new("scrape", scrape)));

        let export = ClientExportPipeline::new(
            LocalStorage::new(".".to_string()),
            out(config.clients_json_output()),
            out(&format!("export_{}", config.clients_csv_output())),
            config.only_clients(),
        );
        sequence.add_pipeline(Box::new(
            SequencedPipeline::new("export", export).requires("scrape"),
        ));
    }

    if !config.research_targets().is_empty() {
        let research = ReplacementResearchPipeline::new(
            LocalStorage::new(".".to_string()),
            config.clone(),
            config.research_targets().to_vec(),
            config.official_orgs(),
            config.search_count(),
            config.replacement_limit(),
            config.recent_days(),
            out(config.research_output()),
        )?;
        sequence.add_pipeline(Box::new(SequencedPipeline::new("research", research)));

        let finalize = FinalReplacementsPipeline::new(
            LocalStorage::new(".".to_string()),
            config.clone(),
            out(config.research_output()),
            out(config.final_output()),
            config.official_orgs(),
            config.official_mono_repo().to_string(),
        )?;
        sequence.add_pipeline(Box::new(
            SequencedPipeline::new("finalize", finalize).requires("research"),
        ));

        if let Some(fixup) = &config.fixup {
            let pipeline = SiteUrlFixupPipeline::new(
                LocalStorage::new(".".to_string()),
                fixup.site_file.clone(),
                out(config.final_output()),
                out(config.fixup_report_output()),
            );
            sequence.add_pipeline(Box::new(
                SequencedPipeline::new("fixup", pipeline).requires("finalize"),
            ));
        }
    }

    tracing::info!("🎬 Starting audit sequence execution");

    match sequence.execute_all().await {
        Ok(results) => {
            let summary = PipelineSequence::get_execution_summary(&results);
            tracing::info!("✅ Audit completed successfully!");
            for result in &results {
                tracing::info!(
                    "  📁 {} → {} ({} records)",
                    result.pipeline_name,
                    result.output_path,
                    result.records.len()
                );
            }
            println!("✅ Audit completed: {} pipelines executed", results.len());
            if let Some(total) = summary.get("total_duration_ms") {
                println!("⏱️ Total duration: {}ms", total);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Audit failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

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

fn display_audit_summary(config: &AuditConfig, execution_id: &str) {
    println!("📋 Audit Summary:");
    println!(
        "  Audit: {} v{} ({})",
        config.audit.name, config.audit.version, execution_id
    );
    println!("  Site: {}", config.site.domain);
    println!("  Output: {}", config.output_path());

    if let Some(report) = &config.report {
        println!("  Report CSV: {}", report.input);
    }
    if config.clients.is_some() {
        println!(
            "  Listing pages: {}/{}*.html",
            config.clients_input_dir(),
            config.clients_page_prefix()
        );
    }
    if !config.research_targets().is_empty() {
        println!("  Repository targets: {}", config.research_targets().len());
        println!(
            "  GitHub: {} (pace {}ms)",
            config.github_api_base(),
            config.pace_delay_ms()
        );
    }
    if let Some(fixup) = &config.fixup {
        println!("  Site file to fix: {}", fixup.site_file);
    }

    println!();
}
