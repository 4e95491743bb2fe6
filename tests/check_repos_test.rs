use httpmock::prelude::*;
use httpmock::Method::HEAD;
use shelf_audit::app::pipelines::check_pipeline::RepoCheckPipeline;
use shelf_audit::{AuditConfig, AuditEngine, LocalStorage};
use tempfile::TempDir;

fn test_config(server: &MockServer, output_path: &str) -> AuditConfig {
    let toml_content = format!(
        r#"
[audit]
name = "test-audit"
description = "test"
version = "1.0.0"

[site]
domain = "mymcpshelf.com"
listing_base_url = "https://mcp.so"

[github]
api_base = "{base}"
web_base = "{base}"
timeout_seconds = 5
pace_delay_ms = 0

[load]
output_path = "{out}"

[research]
[[research.targets]]
name = "idosal/git-mcp"

[[research.targets]]
name = "hangye/chrome"

[[research.targets]]
name = "gone/forever"

[[research.targets]]
name = "limited/repo"
"#,
        base = server.base_url(),
        out = output_path
    );
    AuditConfig::from_toml_str(&toml_content).unwrap()
}

#[tokio::test]
async fn test_direct_check_classifies_every_target() {
    let server = MockServer::start();

    // Alive.
    server.mock(|when, then| {
        when.method(GET).path("/idosal/git-mcp");
        then.status(200);
    });

    // 404, but one of the alternative name patterns resolves.
    server.mock(|when, then| {
        when.method(GET).path("/hangye/chrome");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method(HEAD).path("/hangye/chrome-server");
        then.status(404);
    });
    let alt_mock = server.mock(|when, then| {
        when.method(HEAD).path("/hangye/mcp-chrome");
        then.status(200);
    });

    // 404 with no alternatives at all.
    server.mock(|when, then| {
        when.method(GET).path("/gone/forever");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method(HEAD).path_contains("/gone/");
        then.status(404);
    });

    // Rate-limited: recorded as a failure, never as "missing".
    server.mock(|when, then| {
        when.method(GET).path("/limited/repo");
        then.status(429);
    });

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path().to_str().unwrap());
    let output = format!("{}/repo_check_results.json", dir.path().to_str().unwrap());

    let pipeline = RepoCheckPipeline::new(
        LocalStorage::new(".".to_string()),
        config.clone(),
        config.research_targets().to_vec(),
        output.clone(),
    )
    .unwrap();
    AuditEngine::new(pipeline).run().await.unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    let results: serde_json::Value = serde_json::from_str(&written).unwrap();

    // One entry per configured target.
    assert_eq!(results.as_object().unwrap().len(), 4);

    assert_eq!(results["idosal/git-mcp"]["status"], "found");
    assert!(results["idosal/git-mcp"]["url"]
        .as_str()
        .unwrap()
        .ends_with("/idosal/git-mcp"));

    assert_eq!(results["hangye/chrome"]["status"], "alternative");
    assert!(results["hangye/chrome"]["url"]
        .as_str()
        .unwrap()
        .ends_with("/hangye/mcp-chrome"));
    alt_mock.assert();

    assert_eq!(results["gone/forever"]["status"], "missing");

    assert_eq!(results["limited/repo"]["status"], "failed");
    assert_eq!(results["limited/repo"]["http_status"], 429);
}
