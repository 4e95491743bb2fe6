use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Generic record passed between pipelines in a sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    /// Wrap a JSON value; objects keep their keys, anything else lands under "value".
    pub fn from_value(value: serde_json::Value) -> Self {
        let mut data = HashMap::new();
        match value {
            serde_json::Value::Object(obj) => {
                for (key, val) in obj {
                    data.insert(key, val);
                }
            }
            other => {
                data.insert("value".to_string(), other);
            }
        }
        Record { data }
    }
}

/// What a pipeline's transform stage hands to its load stage.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub processed_records: Vec<Record>,
    pub json_output: String,
    pub csv_output: Option<String>,
}

/// One row of the LinkCanary link-checker export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkIssue {
    pub source_page: String,
    pub link_url: String,
    pub link_text: String,
    pub status_code: String,
    pub issue_type: String,
    pub priority: String,
    pub final_url: String,
    pub recommended_fix: String,
}

/// A GitHub link on the site that needs its URL updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GithubLinkFix {
    pub status_code: String,
    pub final_url: String,
    pub recommended_fix: String,
    pub source_pages: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_issues: usize,
    pub by_issue_type: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Aggregated link-checker report, mirroring the CSV input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAnalysis {
    pub summary: ReportSummary,
    pub internal_404s: BTreeSet<String>,
    pub github_urls_to_update: BTreeMap<String, GithubLinkFix>,
    pub all_issues: Vec<LinkIssue>,
}

/// One card scraped from a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientCard {
    pub title: String,
    pub url: String,
    pub stars: u32,
    pub description: String,
    pub category: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Repository metadata from `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoInfo {
    pub full_name: String,
    pub url: String,
    pub stars: u64,
    pub description: String,
    pub updated: String,
}

/// One hit from `GET /search/repositories`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub full_name: String,
    pub url: String,
    pub stars: u64,
    pub description: String,
    pub updated: String,
}

/// Explicit outcome of probing a repository, instead of swallowing errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Found(RepoInfo),
    Missing,
    Failed { status: Option<u16>, reason: String },
}

/// Outcome of a plain GET/HEAD probe against a repository page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageProbe {
    Exists,
    Missing,
    Failed { status: Option<u16>, reason: String },
}

/// Result of the direct URL check for one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckEntry {
    Found { url: String },
    Alternative { url: String },
    Missing,
    Failed {
        http_status: Option<u16>,
        reason: String,
    },
}

/// Research result for one target: either the repo exists, or ranked alternatives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResearchEntry {
    Found {
        url: String,
        stars: u64,
        updated: String,
    },
    NeedsReplacement {
        #[serde(rename = "type")]
        category: String,
        alternatives: Vec<SearchHit>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementStatus {
    Found,
    Official,
    OfficialFix,
    CommunityOfficial,
    CommunityAlternative,
    NoSuitableReplacement,
}

impl ReplacementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplacementStatus::Found => "found",
            ReplacementStatus::Official => "official",
            ReplacementStatus::OfficialFix => "official_fix",
            ReplacementStatus::CommunityOfficial => "community_official",
            ReplacementStatus::CommunityAlternative => "community_alternative",
            ReplacementStatus::NoSuitableReplacement => "no_suitable_replacement",
        }
    }
}

/// Final mapping entry from a broken repository to its replacement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplacementRecord {
    pub replacement: Option<String>,
    pub status: ReplacementStatus,
    pub note: String,
}

/// A repository the audit keeps an eye on, with search keywords for fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoTarget {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_category() -> String {
    "unknown".to_string()
}

impl RepoTarget {
    pub fn owner(&self) -> &str {
        self.name.split('/').next().unwrap_or(&self.name)
    }

    pub fn short_name(&self) -> &str {
        self.name.split('/').nth(1).unwrap_or(&self.name)
    }

    /// Keywords to search with: the configured list, or tokens derived from
    /// the repository name with the noise words removed.
    pub fn search_keywords(&self) -> Vec<String> {
        if !self.keywords.is_empty() {
            return self.keywords.clone();
        }
        self.short_name()
            .split(['-', '_'])
            .filter(|tok| !tok.is_empty() && *tok != "mcp" && *tok != "server")
            .map(|tok| tok.to_string())
            .collect()
    }
}
