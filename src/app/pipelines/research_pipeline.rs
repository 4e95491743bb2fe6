use crate::adapters::github::GithubClient;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{ProbeOutcome, RepoTarget, ResearchEntry, SearchHit};
use crate::utils::error::Result;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// Whether a search hit looks like an actual MCP server.
fn is_mcp_hit(hit: &SearchHit) -> bool {
    let short_name = hit.full_name.split('/').nth(1).unwrap_or("");
    short_name.to_ascii_lowercase().contains("mcp")
        || hit
            .description
            .to_ascii_lowercase()
            .contains("model context protocol")
}

fn days_since_update(hit: &SearchHit) -> Option<i64> {
    let date_part = hit.updated.get(..10)?;
    let updated = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some((Utc::now().date_naive() - updated).num_days())
}

/// Linear weighted score used to rank replacement candidates:
/// stars, boosted for official orgs, MCP-looking repos and recent updates.
pub fn score_hit(hit: &SearchHit, official_orgs: &[String], recent_days: i64) -> f64 {
    let mut score = hit.stars as f64;

    let owner = hit.full_name.split('/').next().unwrap_or("");
    if official_orgs.iter().any(|org| org == owner) {
        score *= 1.5;
    }

    if is_mcp_hit(hit) {
        score *= 1.2;
    }

    if matches!(days_since_update(hit), Some(days) if days < recent_days) {
        score *= 1.1;
    }

    score
}

/// Rank hits by score descending and keep the best `limit`.
pub fn rank_hits(
    mut hits: Vec<SearchHit>,
    official_orgs: &[String],
    recent_days: i64,
    limit: usize,
) -> Vec<SearchHit> {
    hits.sort_by(|a, b| {
        score_hit(b, official_orgs, recent_days)
            .partial_cmp(&score_hit(a, official_orgs, recent_days))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(limit);
    hits
}

/// Checks each target against the GitHub API and, for missing repositories,
/// searches for ranked replacement candidates.
pub struct ReplacementResearchPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    github: GithubClient,
    targets: Vec<RepoTarget>,
    official_orgs: Vec<String>,
    search_count: usize,
    replacement_limit: usize,
    recent_days: i64,
    output: String,
}

impl<S: Storage, C: ConfigProvider> ReplacementResearchPipeline<S, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: S,
        config: C,
        targets: Vec<RepoTarget>,
        official_orgs: Vec<String>,
        search_count: usize,
        replacement_limit: usize,
        recent_days: i64,
        output: String,
    ) -> Result<Self> {
        let github = GithubClient::new(
            config.github_api_base(),
            config.github_web_base(),
            config.request_timeout_secs(),
        )?;
        Ok(Self {
            storage,
            config,
            github,
            targets,
            official_orgs,
            search_count,
            replacement_limit,
            recent_days,
            output,
        })
    }

    async fn pace(&self) {
        let delay = self.config.pace_delay_ms();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    async fn search_or_warn(&self, label: &str, query: &str) -> Vec<SearchHit> {
        match self.github.search_repositories(query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("{} search failed: {}", label, e);
                Vec::new()
            }
        }
    }

    async fn research_target(&self, target: &RepoTarget) -> ResearchEntry {
        match self.github.repo_info(&target.name).await {
            ProbeOutcome::Found(info) => {
                tracing::info!("✓ Found: {} ({} stars)", target.name, info.stars);
                return ResearchEntry::Found {
                    url: info.url,
                    stars: info.stars,
                    updated: info.updated,
                };
            }
            ProbeOutcome::Missing => {
                tracing::info!("✗ {} not found (404)", target.name);
            }
            ProbeOutcome::Failed { status, reason } => {
                tracing::warn!(
                    "? {} probe failed (status {:?}): {} - treating as missing",
                    target.name,
                    status,
                    reason
                );
            }
        }

        // Same-owner search first, then a global keyword search.
        tracing::info!("  Searching for alternatives in {}...", target.owner());
        let scoped_query = format!(
            "user:{} {} in:name,description",
            target.owner(),
            target.short_name()
        );
        let mut hits: Vec<SearchHit> = self
            .search_or_warn("Scoped", &scoped_query)
            .await
            .into_iter()
            .take(2)
            .collect();

        tracing::info!("  Searching globally for similar MCP servers...");
        let global_query = format!("{} mcp", target.search_keywords().join(" "));
        let global_hits = self.search_or_warn("Global", &global_query).await;
        hits.extend(global_hits.into_iter().take(self.search_count));

        // Drop the broken repo itself and dedup by full name.
        let mut seen = std::collections::HashSet::new();
        hits.retain(|hit| hit.full_name != target.name && seen.insert(hit.full_name.clone()));

        let alternatives = rank_hits(
            hits,
            &self.official_orgs,
            self.recent_days,
            self.replacement_limit,
        );
        for hit in &alternatives {
            tracing::info!("  → {} ({} stars)", hit.full_name, hit.stars);
        }

        ResearchEntry::NeedsReplacement {
            category: target.category.clone(),
            alternatives,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ReplacementResearchPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        self.targets
            .iter()
            .map(|target| Ok(Record::from_value(serde_json::to_value(target)?)))
            .collect()
    }

    async fn transform(&self, _data: Vec<Record>) -> Result<TransformResult> {
        let mut results: BTreeMap<String, ResearchEntry> = BTreeMap::new();

        for target in &self.targets {
            tracing::info!("Researching: {}", target.name);
            let entry = self.research_target(target).await;
            results.insert(target.name.clone(), entry);
            self.pace().await;
        }

        let json_output = serde_json::to_string_pretty(&results)?;
        let processed_records = results
            .iter()
            .map(|(name, entry)| {
                let mut value = serde_json::to_value(entry)?;
                if let serde_json::Value::Object(map) = &mut value {
                    map.insert(
                        "name".to_string(),
                        serde_json::Value::String(name.clone()),
                    );
                }
                Ok(Record::from_value(value))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TransformResult {
            processed_records,
            json_output,
            csv_output: None,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        self.storage
            .write_file(&self.output, result.json_output.as_bytes())
            .await?;
        tracing::info!("Research complete! Results saved to {}", self.output);
        Ok(self.output.clone())
    }
}
