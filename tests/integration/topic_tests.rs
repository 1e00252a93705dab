//! Topic discovery tests through the `Harvester` facade

use crate::common::{harvester, test_config};
use doc_harvest::state::TaskError;
use doc_harvest::{DiscoverRequest, HarvestError, ProgressEvent, TaskStatus};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LANDING: &str = r#"<html><head><title>Docs</title></head><body>
    <nav>
        <a href="/docs/getting-started">Getting Started</a>
        <a href="/docs/api">API Reference</a>
        <a href="/docs/config">Configuration</a>
    </nav>
    <main><p>Welcome to the Example documentation.</p></main>
</body></html>"#;

async fn mount_landing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LANDING, "text/html"))
        .mount(server)
        .await;
}

fn request(task_id: Option<&str>, url: String) -> DiscoverRequest {
    DiscoverRequest {
        task_id: task_id.map(str::to_string),
        url,
        framework: "Example".to_string(),
    }
}

#[tokio::test]
async fn test_topics_from_completion_service() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    mount_landing(&mock_server).await;

    let topics = json!([
        {
            "name": "Getting Started",
            "url": format!("{}/docs/getting-started", mock_server.uri()),
            "description": "Install and run a first project",
            "importance": "high",
            "category": "Getting Started"
        },
        {
            "name": "Configuration",
            "url": format!("{}/docs/config", mock_server.uri()),
            "importance": "low",
            "category": "Core Concepts"
        }
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": topics.to_string()}}]
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 10, output.path());
    let harvester = harvester(&config, Some("test-key"));
    let mut subscription = harvester.subscribe_progress("topics");

    let discovery = harvester
        .discover_topics(request(
            Some("topics"),
            format!("{}/docs/", mock_server.uri()),
        ))
        .await
        .unwrap();

    assert_eq!(discovery.topics.len(), 2);
    assert_eq!(discovery.topics[0].description, "Install and run a first project");
    assert_eq!(discovery.categories, vec!["Getting Started", "Core Concepts"]);

    let mut progress = Vec::new();
    while let Some(event) = subscription.try_recv() {
        if let ProgressEvent::TaskUpdate(update) = event {
            progress.push(update.progress);
        }
    }
    assert_eq!(progress, vec![10.0, 30.0, 50.0, 80.0, 100.0]);

    let task = harvester.get_task("topics").unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.message, "Discovered 2 topics in 2 categories");
}

#[tokio::test]
async fn test_topics_without_completion_service_use_navigation() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    mount_landing(&mock_server).await;

    let config = test_config(&mock_server.uri(), 10, output.path());
    let harvester = harvester(&config, None);

    let discovery = harvester
        .discover_topics(request(None, format!("{}/docs/", mock_server.uri())))
        .await
        .unwrap();

    let names: Vec<&str> = discovery.topics.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Getting Started", "API Reference", "Configuration"]);
    assert_eq!(
        discovery.categories,
        vec!["Getting Started", "API Reference", "Configuration"]
    );
}

#[tokio::test]
async fn test_unreachable_landing_page_fails_task() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    let config = test_config(&mock_server.uri(), 10, output.path());
    let harvester = harvester(&config, None);

    let result = harvester
        .discover_topics(request(
            Some("gone"),
            format!("{}/docs/", mock_server.uri()),
        ))
        .await;

    assert!(matches!(result, Err(HarvestError::Call(_))));
    let task = harvester.get_task("gone").unwrap();
    assert_eq!(task.status, TaskStatus::Error);
}

#[tokio::test]
async fn test_invalid_discovery_request_creates_no_task() {
    let output = tempfile::tempdir().unwrap();
    let config = test_config("http://127.0.0.1:9", 10, output.path());
    let harvester = harvester(&config, None);

    let result = harvester
        .discover_topics(request(Some("bad"), "mailto:docs@example.com".to_string()))
        .await;

    assert!(matches!(result, Err(HarvestError::Validation(_))));
    assert!(matches!(
        harvester.get_task("bad"),
        Err(TaskError::NotFound(_))
    ));
}
