use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{GithubLinkFix, LinkIssue, ReportAnalysis, ReportSummary};
use crate::utils::error::{AuditError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Turns a LinkCanary CSV export into the aggregated analysis JSON.
pub struct LinkReportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    input: String,
    output: String,
}

impl<S: Storage, C: ConfigProvider> LinkReportPipeline<S, C> {
    pub fn new(storage: S, config: C, input: String, output: String) -> Self {
        Self {
            storage,
            config,
            input,
            output,
        }
    }
}

/// Rank used to order issues: critical first, unknown last.
pub fn priority_rank(priority: &str) -> u8 {
    match priority {
        "critical" => 0,
        "high" => 1,
        "medium" => 2,
        "low" => 3,
        _ => 4,
    }
}

/// Aggregate the parsed rows into the report analysis.
pub fn analyze(issues: &[LinkIssue], site_domain: &str) -> ReportAnalysis {
    let mut by_issue_type: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    let mut internal_404s = BTreeSet::new();
    let mut github_urls_to_update: BTreeMap<String, GithubLinkFix> = BTreeMap::new();

    for issue in issues {
        *by_issue_type
            .entry(issue.issue_type.clone())
            .or_default()
            .entry(issue.priority.clone())
            .or_default() += 1;

        if issue.issue_type == "broken"
            && issue.status_code == "404"
            && issue.link_url.contains(site_domain)
        {
            internal_404s.insert(issue.link_url.clone());
        }

        if issue.source_page.contains(site_domain) && issue.link_url.contains("github.com") {
            let qualifies = matches!(issue.issue_type.as_str(), "broken" | "redirect")
                && matches!(issue.status_code.as_str(), "404" | "301" | "302");

            if qualifies {
                github_urls_to_update
                    .entry(issue.link_url.clone())
                    .or_insert_with(|| GithubLinkFix {
                        status_code: issue.status_code.clone(),
                        final_url: issue.final_url.clone(),
                        recommended_fix: issue.recommended_fix.clone(),
                        source_pages: BTreeSet::new(),
                    });
            }

            // Any later sighting of a tracked URL contributes its source page.
            if let Some(entry) = github_urls_to_update.get_mut(&issue.link_url) {
                entry.source_pages.insert(issue.source_page.clone());
            }
        }
    }

    let mut all_issues = issues.to_vec();
    all_issues.sort_by(|a, b| {
        priority_rank(&a.priority)
            .cmp(&priority_rank(&b.priority))
            .then_with(|| a.issue_type.cmp(&b.issue_type))
    });

    ReportAnalysis {
        summary: ReportSummary {
            total_issues: issues.len(),
            by_issue_type,
        },
        internal_404s,
        github_urls_to_update,
        all_issues,
    }
}

fn record_to_issue(record: &Record) -> Result<LinkIssue> {
    let value = serde_json::to_value(&record.data)?;
    serde_json::from_value(value).map_err(AuditError::SerializationError)
}

fn log_analysis_summary(analysis: &ReportAnalysis) {
    tracing::info!("Total issues found: {}", analysis.summary.total_issues);

    // Keep the reporting order readers of earlier audits expect.
    for issue_type in ["broken", "redirect_chain", "redirect", "canonical_redirect", "error"] {
        if let Some(counts) = analysis.summary.by_issue_type.get(issue_type) {
            let total: usize = counts.values().sum();
            tracing::info!("  {}: {}", issue_type.replace('_', " "), total);
            for priority in ["critical", "high", "medium", "low"] {
                if let Some(count) = counts.get(priority) {
                    tracing::info!("    {}: {}", priority, count);
                }
            }
        }
    }

    tracing::info!(
        "Internal 404 URLs to fix: {}",
        analysis.internal_404s.len()
    );
    for url in &analysis.internal_404s {
        tracing::info!("  - {}", url);
    }

    tracing::info!(
        "GitHub URLs to update: {}",
        analysis.github_urls_to_update.len()
    );
    for (url, fix) in &analysis.github_urls_to_update {
        tracing::info!("  {} (status {}) fix: {}", url, fix.status_code, fix.recommended_fix);
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for LinkReportPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::info!("Analyzing LinkCanary report: {}", self.input);
        let bytes = self.storage.read_file(&self.input).await?;

        let mut reader = csv::ReaderBuilder::new().from_reader(bytes.as_slice());
        let mut records = Vec::new();
        for row in reader.deserialize::<LinkIssue>() {
            let issue = row?;
            records.push(Record::from_value(serde_json::to_value(&issue)?));
        }

        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let issues = data
            .iter()
            .map(record_to_issue)
            .collect::<Result<Vec<_>>>()?;

        let analysis = analyze(&issues, self.config.site_domain());
        log_analysis_summary(&analysis);

        let json_output = serde_json::to_string_pretty(&analysis)?;
        Ok(TransformResult {
            processed_records: data,
            json_output,
            csv_output: None,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        self.storage
            .write_file(&self.output, result.json_output.as_bytes())
            .await?;
        Ok(self.output.clone())
    }
}
