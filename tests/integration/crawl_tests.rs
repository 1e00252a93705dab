//! End-to-end crawl tests through the `Harvester` facade

use crate::common::{collect_until_terminal, harvester, html, test_config};
use doc_harvest::state::TaskError;
use doc_harvest::{CrawlMode, HarvestError, StartRequest, TaskStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(html(title, body), "text/html")
}

async fn mount_page(server: &MockServer, route: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(page(title, body))
        .mount(server)
        .await;
}

/// Paths of all GET requests the server has seen, in arrival order
async fn fetched_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.to_string() == "GET")
        .map(|request| request.url.path().to_string())
        .collect()
}

fn basic_request(task_id: &str, seed_url: String) -> StartRequest {
    StartRequest {
        task_id: Some(task_id.to_string()),
        seed_url,
        framework: "Example".to_string(),
        mode: CrawlMode::Basic,
    }
}

#[tokio::test]
async fn test_page_budget_stops_after_seed() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/docs/",
        "Docs",
        r#"<p>Welcome to the docs</p>
           <a href="/docs/one">1</a><a href="/docs/two">2</a><a href="/docs/three">3</a>
           <a href="/docs/four">4</a><a href="/docs/five">5</a>"#,
    )
    .await;

    let config = test_config(&mock_server.uri(), 1, output.path());
    let harvester = harvester(&config, None);
    let mut subscription = harvester.subscribe_progress("budget");

    let task = harvester
        .start_crawl(basic_request("budget", format!("{}/docs/", mock_server.uri())))
        .unwrap();
    assert_eq!(task.status, TaskStatus::Queued);

    let updates = collect_until_terminal(&mut subscription).await;
    let last = updates.last().unwrap();
    assert_eq!(last.status, TaskStatus::Completed);
    assert_eq!(last.progress, 100.0);
    assert_eq!(last.pages_scraped, Some(1));
    assert_eq!(last.total_pages, Some(1));

    assert_eq!(fetched_paths(&mock_server).await, vec!["/docs/"]);

    let index = std::fs::read_to_string(output.path().join("example").join("index.json")).unwrap();
    let index: serde_json::Value = serde_json::from_str(&index).unwrap();
    assert_eq!(index.as_array().unwrap().len(), 1);
    assert_eq!(index[0]["title"], "Docs");
}

#[tokio::test]
async fn test_crawl_stays_within_site_documentation() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/docs/",
        "Home",
        r#"<a href="/docs/a">A</a>
           <a href="/docs/b">B</a>
           <a href="http://other.invalid/docs/x">Elsewhere</a>
           <a href="/blog/post">Blog</a>"#,
    )
    .await;
    mount_page(&mock_server, "/docs/a", "A", r#"<a href="/docs/b#usage">B</a>"#).await;
    mount_page(&mock_server, "/docs/b", "B", r#"<a href="/docs/">Home</a>"#).await;

    let config = test_config(&mock_server.uri(), 50, output.path());
    let harvester = harvester(&config, None);
    let mut subscription = harvester.subscribe_progress("scope");

    harvester
        .start_crawl(basic_request("scope", format!("{}/docs/", mock_server.uri())))
        .unwrap();
    let updates = collect_until_terminal(&mut subscription).await;

    assert!(updates
        .windows(2)
        .all(|pair| pair[0].progress <= pair[1].progress));

    let task = harvester.get_task("scope").unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.pages_scraped, Some(3));
    assert_eq!(
        fetched_paths(&mock_server).await,
        vec!["/docs/", "/docs/a", "/docs/b"]
    );

    let dir = output.path().join("example");
    assert!(dir.join("page_3.json").exists());
    assert!(!dir.join("page_4.json").exists());
}

#[tokio::test]
async fn test_every_observer_sees_the_whole_run() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    mount_page(&mock_server, "/docs/", "Home", r#"<a href="/docs/a">A</a>"#).await;
    mount_page(&mock_server, "/docs/a", "A", "<p>Alpha</p>").await;

    let config = test_config(&mock_server.uri(), 10, output.path());
    let harvester = harvester(&config, None);
    let mut first = harvester.subscribe_progress("shared");
    let mut second = harvester.subscribe_progress("shared");

    harvester
        .start_crawl(basic_request("shared", format!("{}/docs/", mock_server.uri())))
        .unwrap();
    let seen_by_first = collect_until_terminal(&mut first).await;
    let seen_by_second = collect_until_terminal(&mut second).await;

    assert_eq!(seen_by_first, seen_by_second);
    assert_eq!(seen_by_first.last().unwrap().status, TaskStatus::Completed);
    assert!(harvester.unsubscribe(&first));
    assert!(harvester.unsubscribe(&second));
    assert!(!harvester.unsubscribe(&second));
}

#[tokio::test]
async fn test_redirect_onto_queued_page_is_scraped_once() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/docs/",
        "Home",
        r#"<a href="/docs/old">Old</a><a href="/docs/b">B</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/docs/b", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/docs/b", "B", "<p>Bravo</p>").await;

    let config = test_config(&mock_server.uri(), 10, output.path());
    let harvester = harvester(&config, None);
    let mut subscription = harvester.subscribe_progress("moved");

    harvester
        .start_crawl(basic_request("moved", format!("{}/docs/", mock_server.uri())))
        .unwrap();
    let updates = collect_until_terminal(&mut subscription).await;

    assert_eq!(updates.last().unwrap().pages_scraped, Some(2));
    assert_eq!(
        fetched_paths(&mock_server).await,
        vec!["/docs/", "/docs/old", "/docs/b"]
    );

    let index = std::fs::read_to_string(output.path().join("example").join("index.json")).unwrap();
    let index: serde_json::Value = serde_json::from_str(&index).unwrap();
    let titles: Vec<&str> = index
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Home", "B"]);
}

#[tokio::test]
async fn test_unreachable_seed_fails_task() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();

    let config = test_config(&mock_server.uri(), 10, output.path());
    let harvester = harvester(&config, None);
    let mut subscription = harvester.subscribe_progress("missing");

    let seed = format!("{}/docs/", mock_server.uri());
    harvester
        .start_crawl(basic_request("missing", seed.clone()))
        .unwrap();
    let updates = collect_until_terminal(&mut subscription).await;

    let last = updates.last().unwrap();
    assert_eq!(last.status, TaskStatus::Error);
    assert_eq!(
        last.error.as_deref(),
        Some(format!("no pages could be scraped from {}", seed).as_str())
    );
    assert!(!output.path().join("example").exists());
}

#[tokio::test]
async fn test_invalid_requests_create_no_task() {
    let output = tempfile::tempdir().unwrap();
    let config = test_config("http://127.0.0.1:9", 10, output.path());
    let harvester = harvester(&config, None);

    let mut request = basic_request("invalid", "ftp://example.com/docs".to_string());
    assert!(matches!(
        harvester.start_crawl(request.clone()),
        Err(HarvestError::Validation(_))
    ));

    request.seed_url = "https://example.com/docs".to_string();
    request.framework = String::new();
    assert!(matches!(
        harvester.start_crawl(request),
        Err(HarvestError::Validation(_))
    ));

    assert!(matches!(
        harvester.get_task("invalid"),
        Err(TaskError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_task_id_is_rejected() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    mount_page(&mock_server, "/docs/", "Docs", "<p>Hello</p>").await;

    let config = test_config(&mock_server.uri(), 1, output.path());
    let harvester = harvester(&config, None);
    let seed = format!("{}/docs/", mock_server.uri());

    harvester
        .start_crawl(basic_request("twice", seed.clone()))
        .unwrap();
    let second = harvester.start_crawl(basic_request("twice", seed));

    assert!(matches!(
        second,
        Err(HarvestError::Task(TaskError::AlreadyExists(_)))
    ));
}

#[tokio::test]
async fn test_generated_task_ids_are_unique() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    mount_page(&mock_server, "/docs/", "Docs", "<p>Hello</p>").await;

    let config = test_config(&mock_server.uri(), 1, output.path());
    let harvester = harvester(&config, None);
    let seed = format!("{}/docs/", mock_server.uri());

    let mut request = basic_request("unused", seed);
    request.task_id = None;
    let first = harvester.start_crawl(request.clone()).unwrap();
    let second = harvester.start_crawl(request).unwrap();

    assert_ne!(first.id, second.id);
    assert!(uuid::Uuid::parse_str(&first.id).is_ok());
}
