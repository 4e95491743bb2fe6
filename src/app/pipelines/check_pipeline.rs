use crate::adapters::github::GithubClient;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{CheckEntry, PageProbe, RepoTarget};
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::time::Duration;

/// Name shapes that renamed MCP repos commonly move to.
fn alternative_names(target: &RepoTarget) -> [String; 3] {
    let owner = target.owner();
    let name = target.short_name();
    [
        format!("{}/{}-server", owner, name),
        format!("{}/mcp-{}", owner, name),
        format!("{}/{}-mcp", owner, name),
    ]
}

/// Probes each configured repository page directly and, on a 404, tries the
/// common alternative-name patterns.
pub struct RepoCheckPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    github: GithubClient,
    targets: Vec<RepoTarget>,
    output: String,
}

impl<S: Storage, C: ConfigProvider> RepoCheckPipeline<S, C> {
    pub fn new(storage: S, config: C, targets: Vec<RepoTarget>, output: String) -> Result<Self> {
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
            output,
        })
    }

    async fn pace(&self) {
        let delay = self.config.pace_delay_ms();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    async fn check_target(&self, target: &RepoTarget) -> CheckEntry {
        match self.github.get_page(&target.name).await {
            PageProbe::Exists => {
                tracing::info!("✓ {} exists", target.name);
                CheckEntry::Found {
                    url: self.github.repo_page_url(&target.name),
                }
            }
            PageProbe::Missing => {
                tracing::info!("✗ {} not found, trying alternatives", target.name);
                for alt in alternative_names(target) {
                    match self.github.head_page(&alt).await {
                        PageProbe::Exists => {
                            tracing::info!("  → Found alternative: {}", alt);
                            return CheckEntry::Alternative {
                                url: self.github.repo_page_url(&alt),
                            };
                        }
                        PageProbe::Missing => {}
                        PageProbe::Failed { status, reason } => {
                            tracing::warn!(
                                "  ? Probe of {} failed (status {:?}): {}",
                                alt,
                                status,
                                reason
                            );
                        }
                    }
                }
                CheckEntry::Missing
            }
            PageProbe::Failed { status, reason } => {
                tracing::warn!("? {} probe failed (status {:?}): {}", target.name, status, reason);
                CheckEntry::Failed {
                    http_status: status,
                    reason,
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for RepoCheckPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        self.targets
            .iter()
            .map(|target| Ok(Record::from_value(serde_json::to_value(target)?)))
            .collect()
    }

    async fn transform(&self, _data: Vec<Record>) -> Result<TransformResult> {
        let mut results: BTreeMap<String, CheckEntry> = BTreeMap::new();

        for target in &self.targets {
            tracing::info!("Checking {}...", target.name);
            let entry = self.check_target(target).await;
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
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternative_name_patterns() {
        let target = RepoTarget {
            name: "hangye/chrome".to_string(),
            category: "browser".to_string(),
            keywords: vec![],
        };
        let alts = alternative_names(&target);

        assert_eq!(alts[0], "hangye/chrome-server");
        assert_eq!(alts[1], "hangye/mcp-chrome");
        assert_eq!(alts[2], "hangye/chrome-mcp");
    }
}
