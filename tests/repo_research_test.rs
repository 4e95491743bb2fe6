use httpmock::prelude::*;
use httpmock::Method::HEAD;
use shelf_audit::app::pipelines::finalize_pipeline::FinalReplacementsPipeline;
use shelf_audit::app::pipelines::research_pipeline::ReplacementResearchPipeline;
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
search_count = 5
replacement_limit = 3

[[research.targets]]
name = "docker/hub-mcp"
category = "container"
keywords = ["docker", "container"]

[[research.targets]]
name = "hashicorp/terraform-mcp"
category = "infrastructure"
keywords = ["terraform", "iac"]

[[research.targets]]
name = "ghost/vanished-mcp"
category = "unknown"

[[research.targets]]
name = "aws/bedrock-mcp-server"
category = "aws"
keywords = ["aws", "bedrock", "ai"]
"#,
        base = server.base_url(),
        out = output_path
    );
    AuditConfig::from_toml_str(&toml_content).unwrap()
}

fn repo_json(full_name: &str, stars: u64, description: &str) -> serde_json::Value {
    serde_json::json!({
        "full_name": full_name,
        "html_url": format!("https://github.com/{}", full_name),
        "stargazers_count": stars,
        "description": description,
        "updated_at": "2026-07-01T00:00:00Z"
    })
}

fn empty_search(server: &MockServer, query: &str) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/search/repositories")
            .query_param("q", query);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"items": []}));
    });
}

fn mock_github(server: &MockServer) {
    // docker/hub-mcp still exists.
    server.mock(|when, then| {
        when.method(GET).path("/repos/docker/hub-mcp");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(repo_json("docker/hub-mcp", 120, "Docker Hub MCP server"));
    });

    // hashicorp renamed their repo; the scoped search finds the new name.
    server.mock(|when, then| {
        when.method(GET).path("/repos/hashicorp/terraform-mcp");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/search/repositories")
            .query_param("q", "user:hashicorp terraform-mcp in:name,description");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "items": [repo_json("hashicorp/terraform-mcp-server", 900, "Terraform MCP server")]
            }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/search/repositories")
            .query_param("q", "terraform iac mcp");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "items": [repo_json("community/terraform-helper", 100, "Terraform helper")]
            }));
    });

    // ghost/vanished-mcp has no traces left anywhere.
    server.mock(|when, then| {
        when.method(GET).path("/repos/ghost/vanished-mcp");
        then.status(404);
    });
    empty_search(server, "user:ghost vanished-mcp in:name,description");
    empty_search(server, "vanished mcp");

    // aws/bedrock-mcp-server rate-limits; the research falls back to search.
    server.mock(|when, then| {
        when.method(GET).path("/repos/aws/bedrock-mcp-server");
        then.status(403);
    });
    empty_search(server, "user:aws bedrock-mcp-server in:name,description");
    server.mock(|when, then| {
        when.method(GET)
            .path("/search/repositories")
            .query_param("q", "aws bedrock ai mcp");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "items": [repo_json("awslabs/mcp", 7900, "AWS MCP servers")]
            }));
    });
}

async fn run_research(server: &MockServer, dir: &TempDir) -> serde_json::Value {
    let config = test_config(server, dir.path().to_str().unwrap());
    let output = format!("{}/replacement_research.json", dir.path().to_str().unwrap());

    let pipeline = ReplacementResearchPipeline::new(
        LocalStorage::new(".".to_string()),
        config.clone(),
        config.research_targets().to_vec(),
        config.official_orgs(),
        config.search_count(),
        config.replacement_limit(),
        config.recent_days(),
        output.clone(),
    )
    .unwrap();
    AuditEngine::new(pipeline).run().await.unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    serde_json::from_str(&written).unwrap()
}

#[tokio::test]
async fn test_research_keys_match_configured_targets() {
    let server = MockServer::start();
    mock_github(&server);
    let dir = TempDir::new().unwrap();

    let research = run_research(&server, &dir).await;
    let keys: Vec<&String> = research.as_object().unwrap().keys().collect();

    // Exactly the configured list, no duplicates (object keys are unique).
    assert_eq!(
        keys,
        vec![
            "aws/bedrock-mcp-server",
            "docker/hub-mcp",
            "ghost/vanished-mcp",
            "hashicorp/terraform-mcp",
        ]
    );
}

#[tokio::test]
async fn test_research_classifies_each_target() {
    let server = MockServer::start();
    mock_github(&server);
    let dir = TempDir::new().unwrap();

    let research = run_research(&server, &dir).await;

    assert_eq!(research["docker/hub-mcp"]["status"], "found");
    assert_eq!(research["docker/hub-mcp"]["stars"], 120);

    let terraform = &research["hashicorp/terraform-mcp"];
    assert_eq!(terraform["status"], "needs_replacement");
    assert_eq!(terraform["type"], "infrastructure");
    // 900 × official-org × mcp-name outranks the 100-star community hit.
    assert_eq!(
        terraform["alternatives"][0]["full_name"],
        "hashicorp/terraform-mcp-server"
    );
    assert_eq!(terraform["alternatives"].as_array().unwrap().len(), 2);

    assert_eq!(research["ghost/vanished-mcp"]["status"], "needs_replacement");
    assert_eq!(
        research["ghost/vanished-mcp"]["alternatives"]
            .as_array()
            .unwrap()
            .len(),
        0
    );

    // A 403 is not a 404, but still ends in the replacement path.
    assert_eq!(
        research["aws/bedrock-mcp-server"]["alternatives"][0]["full_name"],
        "awslabs/mcp"
    );
}

#[tokio::test]
async fn test_finalize_derives_statuses_and_verifies() {
    let server = MockServer::start();
    mock_github(&server);

    let terraform_head = server.mock(|when, then| {
        when.method(HEAD).path("/hashicorp/terraform-mcp-server");
        then.status(200);
    });
    let awslabs_head = server.mock(|when, then| {
        when.method(HEAD).path("/awslabs/mcp");
        then.status(200);
    });

    let dir = TempDir::new().unwrap();
    run_research(&server, &dir).await;

    let config = test_config(&server, dir.path().to_str().unwrap());
    let research_output =
        format!("{}/replacement_research.json", dir.path().to_str().unwrap());
    let final_output = format!("{}/replacements_final.json", dir.path().to_str().unwrap());

    let pipeline = FinalReplacementsPipeline::new(
        LocalStorage::new(".".to_string()),
        config.clone(),
        research_output,
        final_output.clone(),
        config.official_orgs(),
        config.official_mono_repo().to_string(),
    )
    .unwrap();
    AuditEngine::new(pipeline).run().await.unwrap();

    let written = std::fs::read_to_string(&final_output).unwrap();
    let replacements: serde_json::Value = serde_json::from_str(&written).unwrap();

    assert_eq!(replacements["docker/hub-mcp"]["status"], "found");
    assert!(replacements["docker/hub-mcp"]["replacement"].is_null());

    assert_eq!(
        replacements["hashicorp/terraform-mcp"]["status"],
        "official_fix"
    );
    assert_eq!(
        replacements["hashicorp/terraform-mcp"]["replacement"],
        "hashicorp/terraform-mcp-server"
    );

    assert_eq!(
        replacements["ghost/vanished-mcp"]["status"],
        "no_suitable_replacement"
    );
    assert!(replacements["ghost/vanished-mcp"]["replacement"].is_null());

    assert_eq!(replacements["aws/bedrock-mcp-server"]["status"], "official");
    assert_eq!(
        replacements["aws/bedrock-mcp-server"]["replacement"],
        "awslabs/mcp"
    );

    // Every distinct replacement was verified with a HEAD probe.
    terraform_head.assert();
    awslabs_head.assert();
}
