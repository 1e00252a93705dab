//! Documentation lookup tests through the `Harvester` facade

use crate::common::{harvester, test_config};
use doc_harvest::DocumentationLookup;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_head(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

fn completion_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn test_lookup_without_completion_service_uses_top_hit() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    mount_head(&mock_server, "/devdocs/widgets/", 200).await;
    mount_head(&mock_server, "/rtd/widgets/", 404).await;

    let config = test_config(&mock_server.uri(), 10, output.path());
    let lookup = harvester(&config, None).find_documentation("Widgets").await;

    assert_eq!(
        lookup,
        DocumentationLookup::Found {
            framework: "Widgets".to_string(),
            official_docs: format!("{}/devdocs/widgets/", mock_server.uri()),
            confidence: 0.5,
            alternatives: Vec::new(),
            corrected_name: None,
            fallback: true,
        }
    );
}

#[tokio::test]
async fn test_lookup_follows_completion_choice() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    mount_head(&mock_server, "/devdocs/widgets/", 200).await;
    mount_head(&mock_server, "/rtd/widgets/", 200).await;

    let rtd = format!("{}/rtd/widgets/", mock_server.uri());
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion_reply(&rtd))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 10, output.path());
    let lookup = harvester(&config, Some("test-key"))
        .find_documentation("widgets")
        .await;

    match lookup {
        DocumentationLookup::Found {
            official_docs,
            confidence,
            alternatives,
            fallback,
            ..
        } => {
            assert_eq!(official_docs, rtd);
            assert_eq!(confidence, 0.8);
            assert_eq!(
                alternatives,
                vec![format!("{}/devdocs/widgets/", mock_server.uri())]
            );
            assert!(!fallback);
        }
        other => panic!("unexpected lookup: {:?}", other),
    }
}

#[tokio::test]
async fn test_lookup_with_no_hits_suggests_variations() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    let config = test_config(&mock_server.uri(), 10, output.path());
    let lookup = harvester(&config, None).find_documentation("reactt").await;

    assert_eq!(
        lookup,
        DocumentationLookup::NotFound {
            framework: "reactt".to_string(),
            error: "Could not determine documentation URL".to_string(),
            suggestions: vec![
                "React".to_string(),
                "ReactJS".to_string(),
                "React.js".to_string()
            ],
        }
    );
}

#[tokio::test]
async fn test_lookup_with_no_hits_uses_completion_suggestion() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion_reply(
            r#"{"url": "https://svelte.dev/docs", "corrected_name": "Svelte", "confidence": 0.9}"#,
        ))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 10, output.path());
    let lookup = harvester(&config, Some("test-key"))
        .find_documentation("svelt")
        .await;

    assert_eq!(
        lookup,
        DocumentationLookup::Found {
            framework: "svelt".to_string(),
            official_docs: "https://svelte.dev/docs".to_string(),
            confidence: 0.9,
            alternatives: Vec::new(),
            corrected_name: Some("Svelte".to_string()),
            fallback: false,
        }
    );
}
