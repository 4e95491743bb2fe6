use crate::domain::model::RepoTarget;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AuditError, Result};
use crate::utils::validation::{
    self, validate_non_empty_string, validate_path, validate_positive_number, validate_repo_slug,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub audit: AuditMeta,
    pub site: SiteConfig,
    #[serde(default)]
    pub github: GithubConfig,
    pub load: LoadConfig,
    pub report: Option<ReportConfig>,
    pub clients: Option<ClientsConfig>,
    pub research: Option<ResearchConfig>,
    pub fixup: Option<FixupConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditMeta {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Links containing this domain count as internal.
    pub domain: String,
    /// Prefix for relative listing-card hrefs.
    pub listing_base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubConfig {
    pub api_base: Option<String>,
    pub web_base: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub pace_delay_ms: Option<u64>,
    pub official_orgs: Option<Vec<String>>,
    pub official_mono_repo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub input: String,
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsConfig {
    pub input_dir: Option<String>,
    pub page_prefix: Option<String>,
    pub json_output: Option<String>,
    pub csv_output: Option<String>,
    pub only_clients: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub targets: Vec<RepoTarget>,
    pub check_output: Option<String>,
    pub research_output: Option<String>,
    pub final_output: Option<String>,
    pub search_count: Option<usize>,
    pub replacement_limit: Option<usize>,
    pub recent_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixupConfig {
    pub site_file: String,
    pub report_output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

const DEFAULT_OFFICIAL_ORGS: [&str; 6] = [
    "modelcontextprotocol",
    "awslabs",
    "docker",
    "hashicorp",
    "stripe",
    "googleapis",
];

impl AuditConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AuditError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AuditError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GITHUB_API_BASE})
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static env-var pattern");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("site.domain", &self.site.domain)?;
        validate_url("site.listing_base_url", &self.site.listing_base_url)?;
        validate_url("github.api_base", self.github_api_base())?;
        validate_url("github.web_base", self.github_web_base())?;
        validate_path("load.output_path", &self.load.output_path)?;

        if let Some(report) = &self.report {
            validate_path("report.input", &report.input)?;
        }

        if let Some(research) = &self.research {
            validate_positive_number(
                "research.search_count",
                research.search_count.unwrap_or(5),
                1,
            )?;
            validate_positive_number(
                "research.replacement_limit",
                research.replacement_limit.unwrap_or(3),
                1,
            )?;

            let mut seen = HashSet::new();
            for target in &research.targets {
                validate_repo_slug("research.targets", &target.name)?;
                if !seen.insert(target.name.as_str()) {
                    return Err(AuditError::InvalidConfigValueError {
                        field: "research.targets".to_string(),
                        value: target.name.clone(),
                        reason: "Duplicate repository target".to_string(),
                    });
                }
            }
        }

        if let Some(fixup) = &self.fixup {
            validation::validate_path("fixup.site_file", &fixup.site_file)?;
        }

        Ok(())
    }

    pub fn github_api_base(&self) -> &str {
        self.github
            .api_base
            .as_deref()
            .unwrap_or("https://api.github.com")
    }

    pub fn github_web_base(&self) -> &str {
        self.github
            .web_base
            .as_deref()
            .unwrap_or("https://github.com")
    }

    pub fn official_orgs(&self) -> Vec<String> {
        self.github.official_orgs.clone().unwrap_or_else(|| {
            DEFAULT_OFFICIAL_ORGS
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }

    pub fn official_mono_repo(&self) -> &str {
        self.github
            .official_mono_repo
            .as_deref()
            .unwrap_or("modelcontextprotocol/servers")
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn report_output(&self) -> &str {
        self.report
            .as_ref()
            .and_then(|r| r.output.as_deref())
            .unwrap_or("linkcanary_analysis.json")
    }

    pub fn clients_input_dir(&self) -> &str {
        self.clients
            .as_ref()
            .and_then(|c| c.input_dir.as_deref())
            .unwrap_or(".")
    }

    pub fn clients_page_prefix(&self) -> &str {
        self.clients
            .as_ref()
            .and_then(|c| c.page_prefix.as_deref())
            .unwrap_or("p")
    }

    pub fn clients_json_output(&self) -> &str {
        self.clients
            .as_ref()
            .and_then(|c| c.json_output.as_deref())
            .unwrap_or("clients.json")
    }

    pub fn clients_csv_output(&self) -> &str {
        self.clients
            .as_ref()
            .and_then(|c| c.csv_output.as_deref())
            .unwrap_or("clients.csv")
    }

    pub fn only_clients(&self) -> bool {
        self.clients
            .as_ref()
            .and_then(|c| c.only_clients)
            .unwrap_or(false)
    }

    pub fn research_targets(&self) -> &[RepoTarget] {
        self.research
            .as_ref()
            .map(|r| r.targets.as_slice())
            .unwrap_or(&[])
    }

    pub fn check_output(&self) -> &str {
        self.research
            .as_ref()
            .and_then(|r| r.check_output.as_deref())
            .unwrap_or("repo_check_results.json")
    }

    pub fn research_output(&self) -> &str {
        self.research
            .as_ref()
            .and_then(|r| r.research_output.as_deref())
            .unwrap_or("replacement_research.json")
    }

    pub fn final_output(&self) -> &str {
        self.research
            .as_ref()
            .and_then(|r| r.final_output.as_deref())
            .unwrap_or("replacements_final.json")
    }

    pub fn search_count(&self) -> usize {
        self.research
            .as_ref()
            .and_then(|r| r.search_count)
            .unwrap_or(5)
    }

    pub fn replacement_limit(&self) -> usize {
        self.research
            .as_ref()
            .and_then(|r| r.replacement_limit)
            .unwrap_or(3)
    }

    pub fn recent_days(&self) -> i64 {
        self.research
            .as_ref()
            .and_then(|r| r.recent_days)
            .unwrap_or(180)
    }

    pub fn fixup_report_output(&self) -> &str {
        self.fixup
            .as_ref()
            .and_then(|f| f.report_output.as_deref())
            .unwrap_or("url_fix_report.json")
    }
}

impl ConfigProvider for AuditConfig {
    fn site_domain(&self) -> &str {
        &self.site.domain
    }

    fn listing_base_url(&self) -> &str {
        &self.site.listing_base_url
    }

    fn github_api_base(&self) -> &str {
        AuditConfig::github_api_base(self)
    }

    fn github_web_base(&self) -> &str {
        AuditConfig::github_web_base(self)
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn request_timeout_secs(&self) -> u64 {
        self.github.timeout_seconds.unwrap_or(10)
    }

    fn pace_delay_ms(&self) -> u64 {
        self.github.pace_delay_ms.unwrap_or(1000)
    }
}

impl Validate for AuditConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
