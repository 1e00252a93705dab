use doc_harvest::config::{parse_config, Config};
use doc_harvest::crawler::HttpFetcher;
use doc_harvest::harvester::HarvesterParts;
use doc_harvest::output::JsonDirectoryPersister;
use doc_harvest::planner::ChatCompletionClient;
use doc_harvest::{Harvester, ProgressEvent, ProgressUpdate, Subscription};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Builds a validated configuration pointing every external service at `base_url`
pub fn test_config(base_url: &str, max_pages: usize, output_dir: &Path) -> Config {
    let toml = format!(
        r#"
[crawler]
max-pages = {max_pages}
rate-limit-ms = 0

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[resilience]
max-retries = 0
fetch-timeout-ms = 2000
completion-timeout-ms = 2000

[search]
strategy-timeout-ms = 2000
probe-retries = 0
devdocs-url = "{base_url}/devdocs"
readthedocs-template = "{base_url}/rtd/{{framework}}/"

[completion]
endpoint = "{base_url}/v1"
api-key-env = "DOC_HARVEST_TEST_KEY"

[output]
directory = "{output}"
"#,
        max_pages = max_pages,
        base_url = base_url,
        output = output_dir.display(),
    );

    parse_config(&toml).expect("test config should be valid")
}

/// Assembles a harvester; `api_key` enables the completion client
pub fn harvester(config: &Config, api_key: Option<&str>) -> Harvester {
    let parts = HarvesterParts {
        fetcher: Arc::new(HttpFetcher::new(&config.user_agent).expect("client should build")),
        completion: Arc::new(ChatCompletionClient::new(
            &config.completion,
            api_key.map(str::to_string),
        )),
        persister: Arc::new(JsonDirectoryPersister::new(&config.output.directory)),
    };
    Harvester::with_parts(config, parts)
}

/// Collects task updates until the task reaches a terminal status
pub async fn collect_until_terminal(subscription: &mut Subscription) -> Vec<ProgressUpdate> {
    let mut updates = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), subscription.recv())
            .await
            .expect("crawl should finish in time")
            .expect("subscription closed before the task finished");

        match event {
            ProgressEvent::TaskUpdate(update) => {
                let terminal = update.status.is_terminal();
                updates.push(update);
                if terminal {
                    return updates;
                }
            }
            ProgressEvent::Removed { .. } => panic!("task removed before finishing"),
        }
    }
}

pub fn html(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><main>{}</main></body></html>",
        title, body
    )
}
