use crate::core::{Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{ReplacementRecord, ReplacementStatus};
use crate::utils::error::{AuditError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One rewritten URL in the site source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlSwap {
    pub broken: String,
    pub replacement: String,
    pub occurrences: usize,
}

/// Change report emitted next to the rewritten file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixReport {
    pub site_file: String,
    pub total_github_urls: usize,
    pub replaced: Vec<UrlSwap>,
    pub skipped: Vec<String>,
}

/// Replacement URL for a broken repo path, or None when the entry should be
/// left alone. Mono-repo replacements point at the archived per-server path.
pub fn replacement_url(broken_path: &str, record: &ReplacementRecord) -> Option<String> {
    let replacement = record.replacement.as_deref()?;

    match record.status {
        ReplacementStatus::Official
        | ReplacementStatus::OfficialFix
        | ReplacementStatus::CommunityAlternative => {
            Some(format!("https://github.com/{}", replacement))
        }
        ReplacementStatus::CommunityOfficial => {
            let server_name = broken_path.split('/').nth(1).unwrap_or(broken_path);
            Some(format!(
                "https://github.com/{}/tree/main/src/{}",
                replacement, server_name
            ))
        }
        ReplacementStatus::Found | ReplacementStatus::NoSuitableReplacement => None,
    }
}

/// Apply the replacement map to the file content. Returns the rewritten
/// content and the change report data.
pub fn rewrite_github_urls(
    content: &str,
    replacements: &BTreeMap<String, ReplacementRecord>,
) -> (String, Vec<UrlSwap>, Vec<String>, usize) {
    let url_re = Regex::new(r#"github_url:\s*['"](https?://github\.com/[^'"]+)['"]"#)
        .expect("static github_url pattern");
    let total_github_urls = url_re.captures_iter(content).count();

    let mut rewritten = content.to_string();
    let mut replaced = Vec::new();
    let mut skipped = Vec::new();

    for (broken_path, record) in replacements {
        let broken_url = format!("https://github.com/{}", broken_path);

        match replacement_url(broken_path, record) {
            Some(new_url) => {
                let occurrences = rewritten.matches(broken_url.as_str()).count();
                if occurrences > 0 {
                    rewritten = rewritten.replace(broken_url.as_str(), &new_url);
                    tracing::info!("Will replace: {} → {}", broken_url, new_url);
                    replaced.push(UrlSwap {
                        broken: broken_url,
                        replacement: new_url,
                        occurrences,
                    });
                }
            }
            None => skipped.push(broken_path.clone()),
        }
    }

    (rewritten, replaced, skipped, total_github_urls)
}

/// Rewrites `github_url: '…'` entries in a site source file using the final
/// replacement mapping, and writes a JSON change report.
pub struct SiteUrlFixupPipeline<S: Storage> {
    storage: S,
    site_file: String,
    replacements_input: String,
    report_output: String,
}

impl<S: Storage> SiteUrlFixupPipeline<S> {
    pub fn new(
        storage: S,
        site_file: String,
        replacements_input: String,
        report_output: String,
    ) -> Self {
        Self {
            storage,
            site_file,
            replacements_input,
            report_output,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for SiteUrlFixupPipeline<S> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let site_bytes = self.storage.read_file(&self.site_file).await?;
        let content = String::from_utf8(site_bytes).map_err(|e| AuditError::ScrapeError {
            file: self.site_file.clone(),
            reason: format!("not valid UTF-8: {}", e),
        })?;

        let map_bytes = self.storage.read_file(&self.replacements_input).await?;
        let replacements: BTreeMap<String, ReplacementRecord> =
            serde_json::from_slice(&map_bytes)?;

        let mut records = vec![Record::from_value(serde_json::json!({
            "site_content": content,
        }))];
        for (name, record) in replacements {
            let mut value = serde_json::to_value(&record)?;
            if let serde_json::Value::Object(map) = &mut value {
                map.insert("name".to_string(), serde_json::Value::String(name));
            }
            records.push(Record::from_value(value));
        }
        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let content = data
            .first()
            .and_then(|record| record.data.get("site_content"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuditError::ProcessingError {
                message: "missing site content record".to_string(),
            })?
            .to_string();

        let mut replacements: BTreeMap<String, ReplacementRecord> = BTreeMap::new();
        for record in &data[1..] {
            let name = record
                .data
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| AuditError::ProcessingError {
                    message: "replacement record without a repository name".to_string(),
                })?
                .to_string();
            let mut value = serde_json::to_value(&record.data)?;
            if let serde_json::Value::Object(map) = &mut value {
                map.remove("name");
            }
            replacements.insert(name, serde_json::from_value(value)?);
        }

        let (rewritten, replaced, skipped, total_github_urls) =
            rewrite_github_urls(&content, &replacements);

        let report = FixReport {
            site_file: self.site_file.clone(),
            total_github_urls,
            replaced,
            skipped,
        };
        tracing::info!(
            "Found {} GitHub URLs; {} replaced, {} left untouched",
            report.total_github_urls,
            report.replaced.len(),
            report.skipped.len()
        );

        let json_output = serde_json::to_string_pretty(&report)?;
        let processed_records = vec![Record::from_value(serde_json::json!({
            "site_content": rewritten,
            "replaced": report.replaced.len(),
        }))];

        Ok(TransformResult {
            processed_records,
            json_output,
            csv_output: None,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let rewritten = result
            .processed_records
            .first()
            .and_then(|record| record.data.get("site_content"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuditError::ProcessingError {
                message: "missing rewritten site content".to_string(),
            })?;

        self.storage
            .write_file(&self.site_file, rewritten.as_bytes())
            .await?;
        self.storage
            .write_file(&self.report_output, result.json_output.as_bytes())
            .await?;

        Ok(self.report_output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(replacement: Option<&str>, status: ReplacementStatus) -> ReplacementRecord {
        ReplacementRecord {
            replacement: replacement.map(|s| s.to_string()),
            status,
            note: String::new(),
        }
    }

    const SITE: &str = r#"
const servers = [
  { name: 'Terraform', github_url: 'https://github.com/hashicorp/terraform-mcp' },
  { name: 'Redis', github_url: 'https://github.com/redis/redis-mcp' },
  { name: 'Telegram', github_url: 'https://github.com/telegram-mcp/server' },
  { name: 'Docker', github_url: "https://github.com/docker/hub-mcp" },
];
"#;

    fn replacements() -> BTreeMap<String, ReplacementRecord> {
        let mut map = BTreeMap::new();
        map.insert(
            "hashicorp/terraform-mcp".to_string(),
            record(
                Some("hashicorp/terraform-mcp-server"),
                ReplacementStatus::OfficialFix,
            ),
        );
        map.insert(
            "redis/redis-mcp".to_string(),
            record(
                Some("modelcontextprotocol/servers"),
                ReplacementStatus::CommunityOfficial,
            ),
        );
        map.insert(
            "telegram-mcp/server".to_string(),
            record(None, ReplacementStatus::NoSuitableReplacement),
        );
        map.insert(
            "docker/hub-mcp".to_string(),
            record(None, ReplacementStatus::Found),
        );
        map
    }

    #[test]
    fn test_direct_replacement_url() {
        let rec = record(Some("v-3/discordmcp"), ReplacementStatus::CommunityAlternative);
        assert_eq!(
            replacement_url("ubie-oss/discord-mcp-server", &rec),
            Some("https://github.com/v-3/discordmcp".to_string())
        );
    }

    #[test]
    fn test_mono_repo_replacement_points_at_archived_path() {
        let rec = record(
            Some("modelcontextprotocol/servers"),
            ReplacementStatus::CommunityOfficial,
        );
        assert_eq!(
            replacement_url("redis/redis-mcp", &rec),
            Some("https://github.com/modelcontextprotocol/servers/tree/main/src/redis-mcp".to_string())
        );
    }

    #[test]
    fn test_found_and_unreplaceable_are_skipped() {
        let found = record(None, ReplacementStatus::Found);
        let none = record(None, ReplacementStatus::NoSuitableReplacement);
        assert_eq!(replacement_url("a/b", &found), None);
        assert_eq!(replacement_url("a/b", &none), None);
    }

    #[test]
    fn test_rewrite_counts_and_replaces() {
        let (rewritten, replaced, skipped, total) = rewrite_github_urls(SITE, &replacements());

        assert_eq!(total, 4);
        assert_eq!(replaced.len(), 2);
        assert_eq!(skipped.len(), 2);
        assert!(rewritten.contains("https://github.com/hashicorp/terraform-mcp-server"));
        assert!(rewritten
            .contains("https://github.com/modelcontextprotocol/servers/tree/main/src/redis-mcp"));
        // Untouched entries stay exactly as they were.
        assert!(rewritten.contains("https://github.com/telegram-mcp/server"));
        assert!(rewritten.contains("https://github.com/docker/hub-mcp"));
    }

    #[test]
    fn test_rewrite_reports_occurrence_counts() {
        let content = "github_url: 'https://github.com/redis/redis-mcp'\ngithub_url: 'https://github.com/redis/redis-mcp'";
        let mut map = BTreeMap::new();
        map.insert(
            "redis/redis-mcp".to_string(),
            record(Some("modelcontextprotocol/servers"), ReplacementStatus::CommunityOfficial),
        );

        let (_, replaced, _, total) = rewrite_github_urls(content, &map);
        assert_eq!(total, 2);
        assert_eq!(replaced[0].occurrences, 2);
    }
}
