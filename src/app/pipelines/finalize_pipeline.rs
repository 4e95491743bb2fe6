use crate::adapters::github::GithubClient;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{PageProbe, ReplacementRecord, ReplacementStatus, ResearchEntry};
use crate::utils::error::{AuditError, Result};
use std::collections::BTreeMap;
use std::time::Duration;

/// Derive the final mapping entry for one researched target.
pub fn classify_replacement(
    target_name: &str,
    entry: &ResearchEntry,
    official_orgs: &[String],
    official_mono_repo: &str,
) -> ReplacementRecord {
    match entry {
        ResearchEntry::Found { stars, .. } => ReplacementRecord {
            replacement: None,
            status: ReplacementStatus::Found,
            note: format!("Repository exists ({} stars); no replacement needed", stars),
        },
        ResearchEntry::NeedsReplacement { alternatives, .. } => {
            let Some(best) = alternatives.first() else {
                return ReplacementRecord {
                    replacement: None,
                    status: ReplacementStatus::NoSuitableReplacement,
                    note: "No replacement with significant traction found".to_string(),
                };
            };

            let broken_owner = target_name.split('/').next().unwrap_or("");
            let best_owner = best.full_name.split('/').next().unwrap_or("");

            let (status, note) = if best.full_name == official_mono_repo {
                (
                    ReplacementStatus::CommunityOfficial,
                    format!(
                        "Use the official MCP servers mono repo ({} stars)",
                        best.stars
                    ),
                )
            } else if best_owner == broken_owner {
                (
                    ReplacementStatus::OfficialFix,
                    format!(
                        "Same owner publishes {} - likely a renamed repository",
                        best.full_name
                    ),
                )
            } else if official_orgs.iter().any(|org| org == best_owner) {
                (
                    ReplacementStatus::Official,
                    format!("Official {} repository ({} stars)", best_owner, best.stars),
                )
            } else {
                (
                    ReplacementStatus::CommunityAlternative,
                    format!("Community-maintained alternative ({} stars)", best.stars),
                )
            };

            ReplacementRecord {
                replacement: Some(best.full_name.clone()),
                status,
                note,
            }
        }
    }
}

/// Turns the research results into the final replacement mapping and verifies
/// each chosen replacement with a HEAD probe.
pub struct FinalReplacementsPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    github: GithubClient,
    input: String,
    output: String,
    official_orgs: Vec<String>,
    official_mono_repo: String,
}

impl<S: Storage, C: ConfigProvider> FinalReplacementsPipeline<S, C> {
    pub fn new(
        storage: S,
        config: C,
        input: String,
        output: String,
        official_orgs: Vec<String>,
        official_mono_repo: String,
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
            input,
            output,
            official_orgs,
            official_mono_repo,
        })
    }

    async fn pace(&self) {
        let delay = self.config.pace_delay_ms();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    async fn verify_replacements(&self, replacements: &BTreeMap<String, ReplacementRecord>) {
        let mut distinct: Vec<&str> = replacements
            .values()
            .filter_map(|record| record.replacement.as_deref())
            .collect();
        distinct.sort_unstable();
        distinct.dedup();

        tracing::info!("Verifying {} distinct replacements...", distinct.len());
        for repo in distinct {
            match self.github.head_page(repo).await {
                PageProbe::Exists => tracing::info!("  ✓ {}", repo),
                PageProbe::Missing => tracing::warn!("  ✗ {} does not resolve", repo),
                PageProbe::Failed { status, reason } => {
                    tracing::warn!("  ? {} probe failed (status {:?}): {}", repo, status, reason)
                }
            }
            self.pace().await;
        }
    }

    fn log_status_summary(replacements: &BTreeMap<String, ReplacementRecord>) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in replacements.values() {
            *counts.entry(record.status.as_str()).or_default() += 1;
        }

        tracing::info!("Summary by status:");
        for (status, count) in counts {
            tracing::info!("  {}: {} repos", status, count);
        }
        tracing::info!("  Total: {}", replacements.len());
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for FinalReplacementsPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let bytes = self.storage.read_file(&self.input).await?;
        let research: BTreeMap<String, ResearchEntry> = serde_json::from_slice(&bytes)?;

        research
            .into_iter()
            .map(|(name, entry)| {
                let mut value = serde_json::to_value(&entry)?;
                if let serde_json::Value::Object(map) = &mut value {
                    map.insert("name".to_string(), serde_json::Value::String(name));
                }
                Ok(Record::from_value(value))
            })
            .collect()
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let mut replacements: BTreeMap<String, ReplacementRecord> = BTreeMap::new();

        for record in &data {
            let name = record
                .data
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| AuditError::ProcessingError {
                    message: "research record without a repository name".to_string(),
                })?
                .to_string();

            let mut value = serde_json::to_value(&record.data)?;
            if let serde_json::Value::Object(map) = &mut value {
                map.remove("name");
            }
            let entry: ResearchEntry = serde_json::from_value(value)?;

            let replacement = classify_replacement(
                &name,
                &entry,
                &self.official_orgs,
                &self.official_mono_repo,
            );
            replacements.insert(name, replacement);
        }

        self.verify_replacements(&replacements).await;
        Self::log_status_summary(&replacements);

        let json_output = serde_json::to_string_pretty(&replacements)?;
        let processed_records = replacements
            .iter()
            .map(|(name, record)| {
                let mut value = serde_json::to_value(record)?;
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
        tracing::info!(
            "Generated replacements for {} repositories",
            result.processed_records.len()
        );
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SearchHit;

    const MONO: &str = "modelcontextprotocol/servers";

    fn orgs() -> Vec<String> {
        vec![
            "modelcontextprotocol".to_string(),
            "awslabs".to_string(),
            "docker".to_string(),
            "hashicorp".to_string(),
        ]
    }

    fn hit(full_name: &str, stars: u64) -> SearchHit {
        SearchHit {
            full_name: full_name.to_string(),
            url: format!("https://github.com/{}", full_name),
            stars,
            description: String::new(),
            updated: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn needs(alternatives: Vec<SearchHit>) -> ResearchEntry {
        ResearchEntry::NeedsReplacement {
            category: "test".to_string(),
            alternatives,
        }
    }

    #[test]
    fn test_found_repo_needs_no_replacement() {
        let entry = ResearchEntry::Found {
            url: "https://github.com/docker/hub-mcp".to_string(),
            stars: 120,
            updated: "2026-07-01T00:00:00Z".to_string(),
        };

        let record = classify_replacement("docker/hub-mcp", &entry, &orgs(), MONO);
        assert_eq!(record.status, ReplacementStatus::Found);
        assert!(record.replacement.is_none());
    }

    #[test]
    fn test_no_alternatives_means_no_suitable_replacement() {
        let record = classify_replacement("telegram-mcp/server", &needs(vec![]), &orgs(), MONO);
        assert_eq!(record.status, ReplacementStatus::NoSuitableReplacement);
        assert!(record.replacement.is_none());
    }

    #[test]
    fn test_same_owner_is_official_fix() {
        let entry = needs(vec![hit("hashicorp/terraform-mcp-server", 900)]);
        let record = classify_replacement("hashicorp/terraform-mcp", &entry, &orgs(), MONO);

        assert_eq!(record.status, ReplacementStatus::OfficialFix);
        assert_eq!(
            record.replacement.as_deref(),
            Some("hashicorp/terraform-mcp-server")
        );
    }

    #[test]
    fn test_mono_repo_is_community_official() {
        let entry = needs(vec![hit(MONO, 50000)]);
        let record = classify_replacement("redis/redis-mcp", &entry, &orgs(), MONO);

        assert_eq!(record.status, ReplacementStatus::CommunityOfficial);
        assert_eq!(record.replacement.as_deref(), Some(MONO));
    }

    #[test]
    fn test_official_org_beats_community() {
        let entry = needs(vec![hit("awslabs/mcp", 7900)]);
        let record = classify_replacement("aws/bedrock-mcp-server", &entry, &orgs(), MONO);

        assert_eq!(record.status, ReplacementStatus::Official);
    }

    #[test]
    fn test_everything_else_is_community_alternative() {
        let entry = needs(vec![hit("v-3/discordmcp", 170)]);
        let record =
            classify_replacement("ubie-oss/discord-mcp-server", &entry, &orgs(), MONO);

        assert_eq!(record.status, ReplacementStatus::CommunityAlternative);
        assert_eq!(record.replacement.as_deref(), Some("v-3/discordmcp"));
    }
}
