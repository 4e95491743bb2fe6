use crate::domain::model::{PageProbe, ProbeOutcome, RepoInfo, SearchHit};
use crate::utils::error::{AuditError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// GitHub rejects unauthenticated requests without a User-Agent.
const USER_AGENT: &str = "shelf-audit-link-checker/0.1";

/// Thin client over the GitHub REST API and plain repository pages.
/// Unauthenticated; callers pace themselves between requests.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    api_base: String,
    web_base: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    full_name: String,
    html_url: String,
    #[serde(default)]
    stargazers_count: u64,
    description: Option<String>,
    updated_at: Option<String>,
}

impl ApiRepo {
    fn into_info(self) -> RepoInfo {
        RepoInfo {
            full_name: self.full_name,
            url: self.html_url,
            stars: self.stargazers_count,
            description: self.description.unwrap_or_default(),
            updated: self.updated_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<ApiRepo>,
}

impl GithubClient {
    pub fn new(api_base: &str, web_base: &str, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            web_base: web_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn repo_page_url(&self, repo: &str) -> String {
        format!("{}/{}", self.web_base, repo)
    }

    /// `GET /repos/{owner}/{repo}`, classified instead of swallowed.
    pub async fn repo_info(&self, repo: &str) -> ProbeOutcome {
        let url = format!("{}/repos/{}", self.api_base, repo);
        tracing::debug!("Checking repository via API: {}", url);

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                return ProbeOutcome::Failed {
                    status: e.status().map(|s| s.as_u16()),
                    reason: e.to_string(),
                }
            }
        };

        match response.status().as_u16() {
            200 => match response.json::<ApiRepo>().await {
                Ok(raw) => ProbeOutcome::Found(raw.into_info()),
                Err(e) => ProbeOutcome::Failed {
                    status: Some(200),
                    reason: format!("unreadable repository payload: {}", e),
                },
            },
            404 => ProbeOutcome::Missing,
            status => ProbeOutcome::Failed {
                status: Some(status),
                reason: format!("unexpected HTTP status {}", status),
            },
        }
    }

    /// `GET /search/repositories?q=...&sort=stars&order=desc`.
    pub async fn search_repositories(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search/repositories", self.api_base);
        tracing::debug!("Searching repositories: q={}", query);

        let response = self
            .http
            .get(&url)
            .query(&[("q", query), ("sort", "stars"), ("order", "desc")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::ProcessingError {
                message: format!("repository search returned HTTP {}", status.as_u16()),
            });
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .items
            .into_iter()
            .map(|item| {
                let info = item.into_info();
                SearchHit {
                    full_name: info.full_name,
                    url: info.url,
                    stars: info.stars,
                    description: info.description,
                    updated: info.updated,
                }
            })
            .collect())
    }

    /// Plain GET against the repository page, like a browser would see it.
    pub async fn get_page(&self, repo: &str) -> PageProbe {
        let url = self.repo_page_url(repo);
        match self.http.get(&url).send().await {
            Ok(response) => Self::classify_page(response.status().as_u16()),
            Err(e) => PageProbe::Failed {
                status: e.status().map(|s| s.as_u16()),
                reason: e.to_string(),
            },
        }
    }

    /// Cheap HEAD probe, used for alternative-name patterns and verification.
    pub async fn head_page(&self, repo: &str) -> PageProbe {
        let url = self.repo_page_url(repo);
        match self.http.head(&url).send().await {
            Ok(response) => Self::classify_page(response.status().as_u16()),
            Err(e) => PageProbe::Failed {
                status: e.status().map(|s| s.as_u16()),
                reason: e.to_string(),
            },
        }
    }

    fn classify_page(status: u16) -> PageProbe {
        match status {
            200 => PageProbe::Exists,
            404 => PageProbe::Missing,
            other => PageProbe::Failed {
                status: Some(other),
                reason: format!("unexpected HTTP status {}", other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;

    fn client(server: &MockServer) -> GithubClient {
        GithubClient::new(&server.base_url(), &server.base_url(), 5).unwrap()
    }

    #[tokio::test]
    async fn test_repo_info_found() {
        let server = MockServer::start();
        let repo_mock = server.mock(|when, then| {
            when.method(GET).path("/repos/docker/hub-mcp");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "full_name": "docker/hub-mcp",
                    "html_url": "https://github.com/docker/hub-mcp",
                    "stargazers_count": 120,
                    "description": "Docker Hub MCP server",
                    "updated_at": "2026-07-01T12:00:00Z"
                }));
        });

        let outcome = client(&server).repo_info("docker/hub-mcp").await;

        repo_mock.assert();
        match outcome {
            ProbeOutcome::Found(info) => {
                assert_eq!(info.full_name, "docker/hub-mcp");
                assert_eq!(info.stars, 120);
                assert_eq!(info.updated, "2026-07-01T12:00:00Z");
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repo_info_missing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/telegram-mcp/server");
            then.status(404);
        });

        let outcome = client(&server).repo_info("telegram-mcp/server").await;
        assert_eq!(outcome, ProbeOutcome::Missing);
    }

    #[tokio::test]
    async fn test_repo_info_rate_limited_is_failed_not_missing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/aws/bedrock-mcp-server");
            then.status(403);
        });

        let outcome = client(&server).repo_info("aws/bedrock-mcp-server").await;
        match outcome {
            ProbeOutcome::Failed { status, .. } => assert_eq!(status, Some(403)),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_returns_hits_in_order() {
        let server = MockServer::start();
        let search_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search/repositories")
                .query_param("q", "discord bot mcp")
                .query_param("sort", "stars")
                .query_param("order", "desc");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "items": [
                        {
                            "full_name": "v-3/discordmcp",
                            "html_url": "https://github.com/v-3/discordmcp",
                            "stargazers_count": 170,
                            "description": "Discord MCP server",
                            "updated_at": "2026-06-20T00:00:00Z"
                        },
                        {
                            "full_name": "someone/discord-tools",
                            "html_url": "https://github.com/someone/discord-tools",
                            "stargazers_count": 12,
                            "description": null,
                            "updated_at": "2024-01-01T00:00:00Z"
                        }
                    ]
                }));
        });

        let hits = client(&server)
            .search_repositories("discord bot mcp")
            .await
            .unwrap();

        search_mock.assert();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].full_name, "v-3/discordmcp");
        assert_eq!(hits[1].description, "");
    }

    #[tokio::test]
    async fn test_search_failure_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search/repositories");
            then.status(403);
        });

        let result = client(&server).search_repositories("anything mcp").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_head_page_classification() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(HEAD).path("/idosal/git-mcp");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(HEAD).path("/idosalomon/gitmcp");
            then.status(404);
        });

        let github = client(&server);
        assert_eq!(github.head_page("idosal/git-mcp").await, PageProbe::Exists);
        assert_eq!(
            github.head_page("idosalomon/gitmcp").await,
            PageProbe::Missing
        );
    }
}
