//! Library facade wiring the components together
//!
//! A [`Harvester`] owns one instance of every shared component (task store,
//! broadcaster, resilient caller, fetcher, planner) and exposes the handful of
//! operations an outer surface needs: start a crawl, read a task, follow its
//! progress, look up a framework's documentation and list its topics.

use crate::config::Config;
use crate::crawler::{CrawlEngine, Fetcher, HttpFetcher};
use crate::output::{JsonDirectoryPersister, PagePersister};
use crate::planner::{
    ChatCompletionClient, CompletionClient, DocPlanner, DocumentationLookup, TopicDiscovery,
};
use crate::progress::{ProgressBroadcaster, Subscription};
use crate::resilience::ResilientCaller;
use crate::search::SearchAggregator;
use crate::state::{CrawlMode, NewTask, Task, TaskError, TaskStore};
use crate::{HarvestError, Result};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// Parameters for [`Harvester::start_crawl`]
#[derive(Debug, Clone)]
pub struct StartRequest {
    /// Caller-chosen identifier; a UUID v4 is generated when absent
    pub task_id: Option<String>,
    pub seed_url: String,
    pub framework: String,
    pub mode: CrawlMode,
}

/// Parameters for [`Harvester::discover_topics`]
#[derive(Debug, Clone)]
pub struct DiscoverRequest {
    /// Task to report progress under; no task is tracked when absent
    pub task_id: Option<String>,
    pub url: String,
    pub framework: String,
}

/// External collaborators a [`Harvester`] is assembled from
pub struct HarvesterParts {
    pub fetcher: Arc<dyn Fetcher>,
    pub completion: Arc<dyn CompletionClient>,
    pub persister: Arc<dyn PagePersister>,
}

#[derive(Clone)]
pub struct Harvester {
    tasks: TaskStore,
    engine: Arc<CrawlEngine>,
    search: Arc<SearchAggregator>,
    planner: Arc<DocPlanner>,
}

impl Harvester {
    /// Builds a harvester with the reqwest-backed fetcher, the chat completion
    /// client and the JSON directory persister
    pub fn from_config(config: &Config) -> Result<Self> {
        let parts = HarvesterParts {
            fetcher: Arc::new(HttpFetcher::new(&config.user_agent)?),
            completion: Arc::new(ChatCompletionClient::from_env(&config.completion)),
            persister: Arc::new(JsonDirectoryPersister::new(&config.output.directory)),
        };
        Ok(Self::with_parts(config, parts))
    }

    pub fn with_parts(config: &Config, parts: HarvesterParts) -> Self {
        let caller = Arc::new(ResilientCaller::new(
            &config.resilience,
            &config.circuit_breaker,
        ));
        let tasks = TaskStore::new(ProgressBroadcaster::new(), config.tasks.cleanup_delay());
        let planner = Arc::new(DocPlanner::new(parts.completion, caller.clone()));
        let search = Arc::new(SearchAggregator::new(
            &config.search,
            parts.fetcher.clone(),
            caller.clone(),
        ));
        let engine = Arc::new(CrawlEngine::new(
            parts.fetcher,
            caller,
            tasks.clone(),
            parts.persister,
            planner.clone(),
            config.crawler.clone(),
        ));

        Self {
            tasks,
            engine,
            search,
            planner,
        }
    }

    /// Validates `request`, creates its task and spawns the crawl run
    ///
    /// Returns the freshly created task without waiting for the run. Must be
    /// called from within a tokio runtime.
    pub fn start_crawl(&self, request: StartRequest) -> Result<Task> {
        validate(&request)?;

        let StartRequest {
            task_id,
            seed_url,
            framework,
            mode,
        } = request;
        let task_id = task_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let task = self.tasks.create(
            &task_id,
            NewTask {
                seed_url: seed_url.clone(),
                framework: framework.clone(),
                mode: mode.clone(),
            },
        )?;

        tracing::info!(
            "Created task {} for {} ({})",
            task.id,
            task.framework,
            task.seed_url
        );

        let engine = self.engine.clone();
        tokio::spawn(async move {
            engine.run(&task_id, &seed_url, &framework, &mode).await;
        });

        Ok(task)
    }

    pub fn get_task(&self, task_id: &str) -> std::result::Result<Task, TaskError> {
        self.tasks.get(task_id)
    }

    /// Adds a progress observer for `task_id`
    ///
    /// Every observer of a task receives every event published after it
    /// registered; observers never displace each other.
    pub fn subscribe_progress(&self, task_id: &str) -> Subscription {
        self.tasks.broadcaster().observe(task_id)
    }

    /// Removes `subscription`; false if it was already gone
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.tasks.broadcaster().unsubscribe(subscription)
    }

    /// Lists the documentation topics linked from `request.url`
    ///
    /// With a task id, a task is created and follows the discovery progress;
    /// it is cleaned up like any other finished task.
    pub async fn discover_topics(&self, request: DiscoverRequest) -> Result<TopicDiscovery> {
        validate_fields(&request.framework, &request.url, request.task_id.as_deref())?;

        if let Some(task_id) = &request.task_id {
            self.tasks.create(
                task_id,
                NewTask {
                    seed_url: request.url.clone(),
                    framework: request.framework.clone(),
                    mode: CrawlMode::Intelligent { topic: None },
                },
            )?;
        }

        self.engine
            .discover_topics(request.task_id.as_deref(), &request.url, &request.framework)
            .await
    }

    /// Runs every search strategy, then lets the planner pick the official site
    pub async fn find_documentation(&self, framework: &str) -> DocumentationLookup {
        let hits = self.search.search(framework).await;
        self.planner.select(framework, &hits).await
    }
}

fn validate(request: &StartRequest) -> Result<()> {
    validate_fields(
        &request.framework,
        &request.seed_url,
        request.task_id.as_deref(),
    )
}

fn validate_fields(framework: &str, seed_url: &str, task_id: Option<&str>) -> Result<()> {
    if framework.trim().is_empty() {
        return Err(HarvestError::Validation(
            "framework name must not be empty".to_string(),
        ));
    }

    let seed = Url::parse(seed_url.trim()).map_err(|e| {
        HarvestError::Validation(format!("invalid seed URL '{}': {}", seed_url, e))
    })?;
    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(HarvestError::Validation(format!(
            "seed URL must use http or https, got '{}'",
            seed.scheme()
        )));
    }

    if let Some(task_id) = task_id {
        if task_id.trim().is_empty() {
            return Err(HarvestError::Validation(
                "task id must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
